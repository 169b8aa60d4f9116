//! `COSE_Sign1` messages.
//!
//! ```text
//! COSE_Sign1 = [
//!     Headers,
//!     payload : bstr / nil,
//!     signature : bstr
//! ]
//! ```
//!
//! <https://tools.ietf.org/html/rfc8152#section-4.2>
//!
//! `Headers` expands to the protected bucket (a byte string wrapping a map)
//! followed by the unprotected map, so the array has four entries.

use crate::{
    algorithm::{Algorithm, Registry},
    error::{EncodeError, MalformedMessage, SignError, VerifyError},
    hash,
    header::{HeaderMap, Headers},
    sig_structure::{Context, SigStructure},
    signer::Signer,
    verifier::Verifier,
};
use minicbor::{
    data::{Tag, Type},
    encode::{self, Write},
    Decoder, Encoder,
};
use signature::rand_core::CryptoRngCore;

/// CBOR tag for `COSE_Sign1`.
pub const SIGN1_TAG: u64 = 18;

/// A single-signer message.
///
/// Built unsigned, populated by the application, then [`sign`](Self::sign)ed.
/// Changing the protected bucket or the payload after signing invalidates
/// the signature; nothing stops you from doing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sign1Message {
    /// Header buckets.
    pub headers: Headers,

    /// Payload. `None` is detached content.
    pub payload: Option<Vec<u8>>,

    /// Signature, once signed.
    pub signature: Option<Vec<u8>>,
}

impl Sign1Message {
    /// An empty, unsigned message.
    #[must_use]
    pub const fn new() -> Self {
        Sign1Message {
            headers: Headers::new(),
            payload: None,
            signature: None,
        }
    }

    /// Whether a signature is present.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The bytes that get hashed and signed.
    ///
    /// # Errors
    ///
    /// Encoding into memory does not fail in practice.
    pub fn sig_structure(&self, external_aad: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let protected = self.headers.encode_protected()?;
        SigStructure::new(
            Context::Signature1,
            &protected,
            external_aad,
            self.payload.as_deref(),
        )
        .to_bytes()
    }

    fn digest(&self, algorithm: Algorithm, external_aad: &[u8]) -> Result<Vec<u8>, DigestError> {
        let to_be_signed = self.sig_structure(external_aad)?;
        Ok(hash::digest(
            &to_be_signed,
            algorithm.hash(),
            algorithm.name(),
        )?)
    }

    /// Sign the message, filling in [`signature`](Self::signature).
    ///
    /// On any error the message is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`SignError::InvalidAlgorithm`] if the protected `alg` is missing or not acceptable
    /// - [`SignError::AlgorithmMismatch`] if `signer` is bound to another algorithm
    /// - [`SignError::UnsupportedHash`] if the algorithm's hash is unavailable
    /// - [`SignError::SigningFailure`] if the provider fails
    #[tracing::instrument(skip_all, fields(alg = tracing::field::Empty))]
    pub fn sign<S: Signer>(
        &mut self,
        rng: &mut impl CryptoRngCore,
        external_aad: &[u8],
        signer: &S,
    ) -> Result<(), SignError> {
        let algorithm = Registry::global().resolve(&self.headers).map_err(|e| {
            tracing::debug!(error = %e, "rejected declared algorithm");
            e
        })?;
        tracing::Span::current().record("alg", algorithm.name());

        let capability = signer.algorithm();
        if capability != algorithm {
            return Err(SignError::AlgorithmMismatch {
                capability: capability.name(),
                declared: algorithm.name(),
            });
        }

        let digest = self.digest(algorithm, external_aad)?;
        let signature = signer
            .sign(rng, &digest)
            .map_err(SignError::SigningFailure)?;

        tracing::debug!(len = signature.len(), "signature produced");
        self.signature = Some(signature);
        Ok(())
    }

    /// Check the signature against the current headers and payload.
    ///
    /// The Sig-Structure is rebuilt from scratch every time.
    ///
    /// # Errors
    ///
    /// - [`VerifyError::NotASign1Message`] if there is no signature
    /// - [`VerifyError::InvalidAlgorithm`] if the protected `alg` is missing or not acceptable
    /// - [`VerifyError::AlgorithmMismatch`] if `verifier` is bound to another algorithm
    /// - [`VerifyError::UnsupportedHash`] if the algorithm's hash is unavailable
    /// - [`VerifyError::VerificationFailure`] if the signature does not match
    #[tracing::instrument(skip_all, fields(alg = tracing::field::Empty))]
    pub fn verify<V: Verifier>(&self, external_aad: &[u8], verifier: &V) -> Result<(), VerifyError> {
        let signature = self
            .signature
            .as_deref()
            .ok_or(MalformedMessage::MissingSignature)?;

        let algorithm = Registry::global().resolve(&self.headers).map_err(|e| {
            tracing::debug!(error = %e, "rejected declared algorithm");
            e
        })?;
        tracing::Span::current().record("alg", algorithm.name());

        let capability = verifier.algorithm();
        if capability != algorithm {
            return Err(VerifyError::AlgorithmMismatch {
                capability: capability.name(),
                declared: algorithm.name(),
            });
        }

        let digest = self.digest(algorithm, external_aad)?;
        verifier.verify(&digest, signature).map_err(|e| {
            tracing::debug!("signature did not verify");
            VerifyError::VerificationFailure(e)
        })
    }

    /// Encode as a tagged `COSE_Sign1`.
    ///
    /// An unsigned message encodes with an empty signature.
    ///
    /// # Errors
    ///
    /// Encoding into memory does not fail in practice.
    pub fn to_cbor(&self) -> Result<Vec<u8>, EncodeError> {
        minicbor::to_vec(self)
    }

    /// Decode a tagged or untagged `COSE_Sign1`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedMessage`] if `bytes` is anything else, including a
    /// protected bucket that is not deterministically encoded.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MalformedMessage> {
        let mut d = Decoder::new(bytes);

        if d.datatype()? == Type::Tag {
            let tag = d.tag()?.as_u64();
            if tag != SIGN1_TAG {
                return Err(MalformedMessage::UnexpectedTag(tag));
            }
        }

        match d.datatype()? {
            Type::Array => {}
            Type::ArrayIndef => return Err(MalformedMessage::IndefiniteLength),
            _ => return Err(MalformedMessage::NotAnArray),
        }
        let len = d.array()?.ok_or(MalformedMessage::IndefiniteLength)?;
        if len != 4 {
            return Err(MalformedMessage::FieldCount(len));
        }

        expect_type(&mut d, Type::Bytes, "protected", "a byte string")?;
        let protected = decode_protected(d.bytes()?)?;

        expect_type(&mut d, Type::Map, "unprotected", "a map")?;
        let unprotected = HeaderMap::decode(&mut d)?;

        let payload = match d.datatype()? {
            Type::Null => {
                d.null()?;
                None
            }
            Type::Bytes => Some(d.bytes()?.to_vec()),
            _ => {
                return Err(MalformedMessage::FieldType {
                    field: "payload",
                    expected: "a byte string or null",
                })
            }
        };

        expect_type(&mut d, Type::Bytes, "signature", "a byte string")?;
        let signature = d.bytes()?.to_vec();

        if d.position() != bytes.len() {
            return Err(MalformedMessage::TrailingBytes);
        }

        Ok(Sign1Message {
            headers: Headers {
                protected,
                unprotected,
            },
            payload,
            signature: Some(signature),
        })
    }
}

fn expect_type(
    d: &mut Decoder<'_>,
    expected: Type,
    field: &'static str,
    description: &'static str,
) -> Result<(), MalformedMessage> {
    let found = d.datatype()?;
    if found == expected {
        return Ok(());
    }

    match found {
        Type::BytesIndef | Type::MapIndef => Err(MalformedMessage::IndefiniteLength),
        _ => Err(MalformedMessage::FieldType {
            field,
            expected: description,
        }),
    }
}

/// Decode the protected bucket and make sure re-encoding reproduces it.
fn decode_protected(bytes: &[u8]) -> Result<HeaderMap, MalformedMessage> {
    if bytes.is_empty() {
        return Ok(HeaderMap::new());
    }

    let mut d = Decoder::new(bytes);
    let map = HeaderMap::decode(&mut d)?;
    if d.position() != bytes.len() {
        return Err(MalformedMessage::TrailingBytes);
    }

    match map.to_cbor() {
        Ok(canonical) if canonical == bytes => Ok(map),
        _ => Err(MalformedMessage::NonCanonicalProtected),
    }
}

impl<C> minicbor::Encode<C> for Sign1Message {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        let protected = self
            .headers
            .encode_protected()
            .map_err(|_| encode::Error::message("unencodable protected header"))?;

        e.tag(Tag::new(SIGN1_TAG))?.array(4)?.bytes(&protected)?;
        self.headers.unprotected.encode(e, ctx)?;
        match &self.payload {
            Some(payload) => e.bytes(payload)?,
            None => e.null()?,
        };
        e.bytes(self.signature.as_deref().unwrap_or_default())?;
        Ok(())
    }
}

/// Whether `bytes` is shaped like a `COSE_Sign1`: optionally tagged 18,
/// then a four-element array ending in a byte string.
///
/// Only the outer shape is looked at. Header contents are not decoded and
/// nothing is verified, so a `true` here can still fail
/// [`Sign1Message::from_cbor`].
#[must_use]
pub fn is_sign1_message(bytes: &[u8]) -> bool {
    has_sign1_shape(&mut Decoder::new(bytes)).unwrap_or(false)
}

fn has_sign1_shape(d: &mut Decoder<'_>) -> Result<bool, minicbor::decode::Error> {
    if d.datatype()? == Type::Tag && d.tag()?.as_u64() != SIGN1_TAG {
        return Ok(false);
    }
    if d.datatype()? != Type::Array || d.array()? != Some(4) {
        return Ok(false);
    }
    for _ in 0..3 {
        d.skip()?;
    }
    Ok(d.datatype()? == Type::Bytes)
}

#[derive(Debug, thiserror::Error)]
enum DigestError {
    #[error(transparent)]
    Encoding(#[from] EncodeError),

    #[error(transparent)]
    UnsupportedHash(#[from] hash::UnsupportedHash),
}

impl From<DigestError> for SignError {
    fn from(e: DigestError) -> Self {
        match e {
            DigestError::Encoding(e) => SignError::Encoding(e),
            DigestError::UnsupportedHash(e) => SignError::UnsupportedHash(e),
        }
    }
}

impl From<DigestError> for VerifyError {
    fn from(e: DigestError) -> Self {
        match e {
            DigestError::Encoding(e) => VerifyError::Encoding(e),
            DigestError::UnsupportedHash(e) => VerifyError::UnsupportedHash(e),
        }
    }
}
