//! Signing capability.

use crate::algorithm::Algorithm;
use signature::rand_core::CryptoRngCore;

/// Can produce signatures over a digest for exactly one [`Algorithm`].
///
/// Key material stays behind this trait; the message layer only checks
/// that [`algorithm`](Signer::algorithm) matches what the message declares
/// before handing over the digest. Implement it for in-memory keys,
/// hardware tokens, remote signing services and so on.
pub trait Signer {
    /// The algorithm this signer is bound to.
    fn algorithm(&self) -> Algorithm;

    /// Sign a digest produced with the algorithm's hash function.
    ///
    /// `rng` is available to providers that need per-signature randomness.
    ///
    /// # Errors
    ///
    /// Returns `signature::Error` if signing fails.
    fn sign(&self, rng: &mut impl CryptoRngCore, digest: &[u8])
        -> Result<Vec<u8>, signature::Error>;
}
