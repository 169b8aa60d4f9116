//! Error types for signing and verification operations.

use crate::{algorithm::InvalidAlgorithm, hash::UnsupportedHash, header::Label};
use std::convert::Infallible;
use thiserror::Error;

/// CBOR encoding into memory.
pub type EncodeError = minicbor::encode::Error<Infallible>;

/// Error type for signing operations.
#[derive(Debug, Error)]
pub enum SignError {
    /// The declared algorithm is missing or not acceptable.
    #[error(transparent)]
    InvalidAlgorithm(#[from] InvalidAlgorithm),

    /// The signer is bound to a different algorithm than the message declares.
    #[error("signer of type {capability} cannot generate a signature of type {declared}")]
    AlgorithmMismatch {
        /// Algorithm the signer is bound to.
        capability: &'static str,
        /// Algorithm the message declares.
        declared: &'static str,
    },

    /// Hash function unavailable.
    #[error(transparent)]
    UnsupportedHash(#[from] UnsupportedHash),

    /// Codec error.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodeError),

    /// Signing error from the provider.
    #[error("Signing error: {0}")]
    SigningFailure(signature::Error),
}

/// Error type for verification operations.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The input is not shaped like a `COSE_Sign1`.
    #[error("not a COSE_Sign1 message: {0}")]
    NotASign1Message(#[from] MalformedMessage),

    /// The declared algorithm is missing or not acceptable.
    #[error(transparent)]
    InvalidAlgorithm(#[from] InvalidAlgorithm),

    /// The verifier is bound to a different algorithm than the message declares.
    #[error("verifier of type {capability} cannot check a signature of type {declared}")]
    AlgorithmMismatch {
        /// Algorithm the verifier is bound to.
        capability: &'static str,
        /// Algorithm the message declares.
        declared: &'static str,
    },

    /// Hash function unavailable.
    #[error(transparent)]
    UnsupportedHash(#[from] UnsupportedHash),

    /// Codec error.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodeError),

    /// The signature does not check out.
    #[error("Verification error: {0}")]
    VerificationFailure(signature::Error),
}

impl VerifyError {
    /// Whether this is the ordinary "signature does not match" outcome
    /// rather than a malformed input or configuration problem.
    #[must_use]
    pub const fn is_bad_signature(&self) -> bool {
        matches!(self, VerifyError::VerificationFailure(_))
    }
}

/// Structural problems found while decoding a `COSE_Sign1`.
#[derive(Debug, Error)]
pub enum MalformedMessage {
    /// Tagged with something other than `COSE_Sign1` (18).
    #[error("unexpected CBOR tag {0}")]
    UnexpectedTag(u64),

    /// Top level is not an array.
    #[error("expected an array")]
    NotAnArray,

    /// Top-level array has the wrong number of fields.
    #[error("expected 4 fields, found {0}")]
    FieldCount(u64),

    /// A field has the wrong CBOR type.
    #[error("field {field} must be {expected}")]
    FieldType {
        /// Field name.
        field: &'static str,
        /// Expected CBOR type.
        expected: &'static str,
    },

    /// Indefinite-length items are not accepted.
    #[error("indefinite-length item")]
    IndefiniteLength,

    /// The protected bucket is not in deterministic encoding, so it cannot
    /// be reproduced for the Sig-Structure.
    #[error("protected header is not canonically encoded")]
    NonCanonicalProtected,

    /// A header label appears twice in one bucket.
    #[error("duplicate header label {0:?}")]
    DuplicateLabel(Label),

    /// A header label is neither an integer nor text.
    #[error("header label of type {0} is not allowed")]
    InvalidLabel(String),

    /// A header value of an unsupported type (floats, `undefined`, simple values).
    #[error("header value of type {0} is not supported")]
    UnsupportedValue(String),

    /// Header value nesting exceeds [`MAX_VALUE_DEPTH`](crate::header::MAX_VALUE_DEPTH).
    #[error("header value nested too deeply")]
    TooDeep,

    /// A message without a signature cannot be verified.
    #[error("missing signature")]
    MissingSignature,

    /// Bytes left after the message.
    #[error("trailing bytes after message")]
    TrailingBytes,

    /// Raw CBOR error.
    #[error(transparent)]
    Cbor(#[from] minicbor::decode::Error),
}
