//! [COSE_Sign1] signing and verification.
//!
//! Builds the RFC 8152 Sig-Structure for single-signer messages, hashes it
//! with the algorithm the protected header declares, and hands the digest
//! to a pluggable [`Signer`] or [`Verifier`].
//!
//! [COSE_Sign1]: https://tools.ietf.org/html/rfc8152#section-4.2
//!
//! # Example
//!
//! ```rust
//! use cose::{algorithm::ES512, ecdsa::Es512Signer, header::Headers, sign1, verify1};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut rng = rand::thread_rng();
//! let signer = Es512Signer::random(&mut rng);
//! let verifier = signer.verifier();
//!
//! let bytes = sign1(
//!     Headers::with_algorithm(ES512),
//!     Some(vec![0x00, 0x01]),
//!     &[],
//!     &signer,
//!     &mut rng,
//! )?;
//!
//! let message = verify1(&bytes, &[], &verifier)?;
//! assert_eq!(message.payload, Some(vec![0x00, 0x01]));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod algorithm;
pub mod ecdsa;
pub mod error;
pub mod hash;
pub mod header;
pub mod message;
pub mod sig_structure;
pub mod signer;
pub mod verifier;

pub use algorithm::Algorithm;
pub use error::{MalformedMessage, SignError, VerifyError};
pub use header::{HeaderMap, Headers, Label, Value};
pub use message::{is_sign1_message, Sign1Message};
pub use signer::Signer;
pub use verifier::Verifier;

use signature::rand_core::CryptoRngCore;

/// Sign `payload` and return the tagged `COSE_Sign1` encoding.
///
/// A `None` payload is detached: it is signed as an empty byte string and
/// written as `null`.
///
/// # Errors
///
/// See [`Sign1Message::sign`].
pub fn sign1<S: Signer>(
    headers: Headers,
    payload: Option<Vec<u8>>,
    external_aad: &[u8],
    signer: &S,
    rng: &mut impl CryptoRngCore,
) -> Result<Vec<u8>, SignError> {
    let mut message = Sign1Message {
        headers,
        payload,
        signature: None,
    };
    message.sign(rng, external_aad, signer)?;
    Ok(message.to_cbor()?)
}

/// Decode a `COSE_Sign1` and verify it, returning the message on success.
///
/// # Errors
///
/// Returns [`VerifyError::NotASign1Message`] if `bytes` does not decode,
/// otherwise see [`Sign1Message::verify`].
pub fn verify1<V: Verifier>(
    bytes: &[u8],
    external_aad: &[u8],
    verifier: &V,
) -> Result<Sign1Message, VerifyError> {
    let message = Sign1Message::from_cbor(bytes)?;
    message.verify(external_aad, verifier)?;
    Ok(message)
}

/// Verify a `COSE_Sign1` whose payload travels separately.
///
/// `payload` is checked in place of whatever the envelope carries. A
/// detached envelope (payload `null`) only verifies against the empty
/// payload it was signed over.
///
/// # Errors
///
/// As for [`verify1`].
pub fn verify1_detached<V: Verifier>(
    bytes: &[u8],
    payload: &[u8],
    external_aad: &[u8],
    verifier: &V,
) -> Result<Sign1Message, VerifyError> {
    let mut message = Sign1Message::from_cbor(bytes)?;
    message.payload = Some(payload.to_vec());
    message.verify(external_aad, verifier)?;
    Ok(message)
}
