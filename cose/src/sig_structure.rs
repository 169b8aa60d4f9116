//! To-be-signed bytes.
//!
//! ```text
//! Sig_structure = [
//!     context : "Signature" / "Signature1" / "CounterSignature",
//!     body_protected : empty_or_serialized_map,
//!     ? sign_protected : empty_or_serialized_map,
//!     external_aad : bstr,
//!     payload : bstr
//! ]
//! ```
//!
//! <https://tools.ietf.org/html/rfc8152#section-4.4>
//!
//! Only the `Signature1` form (no `sign_protected`) is built here.

use crate::error::EncodeError;
use minicbor::{
    encode::{self, Write},
    Encoder,
};

/// Signing context tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// `COSE_Sign1`
    Signature1,
}

impl Context {
    /// The text written into the structure.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Context::Signature1 => "Signature1",
        }
    }
}

/// The four fields that get encoded and hashed.
///
/// Borrowed from the message for the duration of one signing or
/// verification; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigStructure<'a> {
    context: Context,
    protected: &'a [u8],
    external_aad: &'a [u8],
    payload: &'a [u8],
}

impl<'a> SigStructure<'a> {
    /// `protected` must be exactly the bytes the envelope carries for the
    /// protected bucket.
    ///
    /// A detached (`None`) payload stands in as an empty byte string.
    #[must_use]
    pub const fn new(
        context: Context,
        protected: &'a [u8],
        external_aad: &'a [u8],
        payload: Option<&'a [u8]>,
    ) -> Self {
        let payload = match payload {
            Some(payload) => payload,
            None => &[],
        };

        SigStructure {
            context,
            protected,
            external_aad,
            payload,
        }
    }

    /// Deterministic CBOR encoding of the structure.
    ///
    /// # Errors
    ///
    /// Encoding into memory does not fail in practice.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        minicbor::to_vec(self)
    }
}

impl<C> minicbor::Encode<C> for SigStructure<'_> {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(4)?
            .str(self.context.as_str())?
            .bytes(self.protected)?
            .bytes(self.external_aad)?
            .bytes(self.payload)?;
        Ok(())
    }
}

/// Build and encode `[context, protected, external_aad, payload]`.
///
/// # Errors
///
/// Encoding into memory does not fail in practice.
pub fn build(
    context: Context,
    protected: &[u8],
    payload: Option<&[u8]>,
    external_aad: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    SigStructure::new(context, protected, external_aad, payload).to_bytes()
}
