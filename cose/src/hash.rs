//! Hash functions used to digest the Sig-Structure.
//!
//! Each hash is compiled in behind its own feature flag (`sha2_256`,
//! `sha2_384`, `sha2_512`). Asking for one that was not compiled in is
//! reported as [`UnsupportedHash`] rather than silently falling back.

use thiserror::Error;

/// Hash function identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashAlgorithm {
    /// SHA2-256
    Sha2_256,

    /// SHA2-384
    Sha2_384,

    /// SHA2-512
    Sha2_512,
}

impl HashAlgorithm {
    /// Digest output size in bytes.
    #[must_use]
    pub const fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Sha2_256 => 32,
            HashAlgorithm::Sha2_384 => 48,
            HashAlgorithm::Sha2_512 => 64,
        }
    }

    /// Whether this hash function was compiled in.
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            HashAlgorithm::Sha2_256 => cfg!(feature = "sha2_256"),
            HashAlgorithm::Sha2_384 => cfg!(feature = "sha2_384"),
            HashAlgorithm::Sha2_512 => cfg!(feature = "sha2_512"),
        }
    }

    /// Hash `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedHash::Disabled`] if the matching feature is off.
    pub fn digest(self, bytes: &[u8]) -> Result<Vec<u8>, UnsupportedHash> {
        match self {
            #[cfg(feature = "sha2_256")]
            HashAlgorithm::Sha2_256 => Ok(sha2_digest::<sha2::Sha256>(bytes)),

            #[cfg(feature = "sha2_384")]
            HashAlgorithm::Sha2_384 => Ok(sha2_digest::<sha2::Sha384>(bytes)),

            #[cfg(feature = "sha2_512")]
            HashAlgorithm::Sha2_512 => Ok(sha2_digest::<sha2::Sha512>(bytes)),

            #[allow(unreachable_patterns)]
            other => Err(UnsupportedHash::Disabled(other)),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha2_256 => f.write_str("SHA-256"),
            HashAlgorithm::Sha2_384 => f.write_str("SHA-384"),
            HashAlgorithm::Sha2_512 => f.write_str("SHA-512"),
        }
    }
}

#[cfg(any(feature = "sha2_256", feature = "sha2_384", feature = "sha2_512"))]
fn sha2_digest<D: sha2::Digest>(bytes: &[u8]) -> Vec<u8> {
    D::digest(bytes).to_vec()
}

/// Digest `bytes` with `hash`.
///
/// `None` means the algorithm does not pre-hash its input (e.g. `EdDSA`),
/// which this layer cannot drive through a digest-based provider.
///
/// # Errors
///
/// Returns [`UnsupportedHash`] if there is no hash or it was not compiled in.
pub fn digest(
    bytes: &[u8],
    hash: Option<HashAlgorithm>,
    algorithm: &'static str,
) -> Result<Vec<u8>, UnsupportedHash> {
    hash.ok_or(UnsupportedHash::NoPrehash(algorithm))?
        .digest(bytes)
}

/// The hash function an algorithm needs is not available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnsupportedHash {
    /// The hash function's feature flag is disabled.
    #[error("hash function {0} is not enabled in this build")]
    Disabled(HashAlgorithm),

    /// The algorithm signs its input directly and has no digest.
    #[error("algorithm {0} does not use a pre-hash")]
    NoPrehash(&'static str),
}
