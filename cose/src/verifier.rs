//! Verification capability.

use crate::algorithm::Algorithm;

/// Can check signatures over a digest for exactly one [`Algorithm`].
///
/// Implementations must be safe to share between concurrent verifications;
/// nothing about a verification is remembered.
pub trait Verifier {
    /// The algorithm this verifier is bound to.
    fn algorithm(&self) -> Algorithm;

    /// Check `signature` against `digest`.
    ///
    /// # Errors
    ///
    /// Returns `signature::Error` if the signature is malformed or does not
    /// match.
    fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<(), signature::Error>;
}
