//! ECDSA providers (ES256, ES384, ES512).
//!
//! Signatures are the fixed-width `r || s` encoding COSE uses, not DER.

use crate::{algorithm::Algorithm, signer::Signer, verifier::Verifier};
use std::fmt;

#[cfg(feature = "es256")]
use crate::algorithm::ES256;
#[cfg(feature = "es384")]
use crate::algorithm::ES384;
#[cfg(feature = "es512")]
use crate::algorithm::ES512;
#[cfg(any(feature = "es256", feature = "es384", feature = "es512"))]
use signature::{hazmat::PrehashVerifier, rand_core::CryptoRngCore};
#[cfg(any(feature = "es256", feature = "es384", feature = "es512"))]
use signature::hazmat::RandomizedPrehashSigner;

/// ECDSA signing key bound to one algorithm.
pub struct EcdsaSigner<K> {
    algorithm: Algorithm,
    key: K,
}

impl<K> EcdsaSigner<K> {
    /// The underlying signing key.
    pub const fn key(&self) -> &K {
        &self.key
    }
}

impl<K> fmt::Debug for EcdsaSigner<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdsaSigner")
            .field("algorithm", &self.algorithm.name())
            .finish_non_exhaustive()
    }
}

/// ECDSA verifying key bound to one algorithm.
#[derive(Clone)]
pub struct EcdsaVerifier<K> {
    algorithm: Algorithm,
    key: K,
}

impl<K> EcdsaVerifier<K> {
    /// The underlying verifying key.
    pub const fn key(&self) -> &K {
        &self.key
    }
}

impl<K> fmt::Debug for EcdsaVerifier<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdsaVerifier")
            .field("algorithm", &self.algorithm.name())
            .finish_non_exhaustive()
    }
}

/// ES256 signer (P-256 with SHA-256).
#[cfg(feature = "es256")]
pub type Es256Signer = EcdsaSigner<p256::ecdsa::SigningKey>;

/// ES256 verifier (P-256 with SHA-256).
#[cfg(feature = "es256")]
pub type Es256Verifier = EcdsaVerifier<p256::ecdsa::VerifyingKey>;

#[cfg(feature = "es256")]
impl Es256Signer {
    /// Bind an existing key to ES256.
    #[must_use]
    pub const fn new(key: p256::ecdsa::SigningKey) -> Self {
        EcdsaSigner {
            algorithm: ES256,
            key,
        }
    }

    /// Generate a fresh key.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self::new(p256::ecdsa::SigningKey::random(rng))
    }

    /// The verifier paired with this signer.
    #[must_use]
    pub fn verifier(&self) -> Es256Verifier {
        Es256Verifier::new(self.key.verifying_key().to_owned())
    }
}

#[cfg(feature = "es256")]
impl Es256Verifier {
    /// Bind an existing public key to ES256.
    #[must_use]
    pub const fn new(key: p256::ecdsa::VerifyingKey) -> Self {
        EcdsaVerifier {
            algorithm: ES256,
            key,
        }
    }

    /// Import an uncompressed or compressed SEC1 public key.
    ///
    /// # Errors
    ///
    /// Returns `signature::Error` if the bytes are not a point on P-256.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, signature::Error> {
        Ok(Self::new(p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)?))
    }

    /// Uncompressed SEC1 encoding of the public key.
    #[must_use]
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.key.to_encoded_point(false).as_bytes().to_vec()
    }
}

#[cfg(feature = "es256")]
impl Signer for Es256Signer {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn sign(
        &self,
        rng: &mut impl CryptoRngCore,
        digest: &[u8],
    ) -> Result<Vec<u8>, signature::Error> {
        let sig: p256::ecdsa::Signature = self.key.sign_prehash_with_rng(rng, digest)?;
        Ok(sig.to_bytes().to_vec())
    }
}

#[cfg(feature = "es256")]
impl Verifier for Es256Verifier {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<(), signature::Error> {
        let sig = p256::ecdsa::Signature::from_slice(signature)?;
        self.key.verify_prehash(digest, &sig)
    }
}

/// ES384 signer (P-384 with SHA-384).
#[cfg(feature = "es384")]
pub type Es384Signer = EcdsaSigner<p384::ecdsa::SigningKey>;

/// ES384 verifier (P-384 with SHA-384).
#[cfg(feature = "es384")]
pub type Es384Verifier = EcdsaVerifier<p384::ecdsa::VerifyingKey>;

#[cfg(feature = "es384")]
impl Es384Signer {
    /// Bind an existing key to ES384.
    #[must_use]
    pub const fn new(key: p384::ecdsa::SigningKey) -> Self {
        EcdsaSigner {
            algorithm: ES384,
            key,
        }
    }

    /// Generate a fresh key.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self::new(p384::ecdsa::SigningKey::random(rng))
    }

    /// The verifier paired with this signer.
    #[must_use]
    pub fn verifier(&self) -> Es384Verifier {
        Es384Verifier::new(self.key.verifying_key().to_owned())
    }
}

#[cfg(feature = "es384")]
impl Es384Verifier {
    /// Bind an existing public key to ES384.
    #[must_use]
    pub const fn new(key: p384::ecdsa::VerifyingKey) -> Self {
        EcdsaVerifier {
            algorithm: ES384,
            key,
        }
    }

    /// Import an uncompressed or compressed SEC1 public key.
    ///
    /// # Errors
    ///
    /// Returns `signature::Error` if the bytes are not a point on P-384.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, signature::Error> {
        Ok(Self::new(p384::ecdsa::VerifyingKey::from_sec1_bytes(bytes)?))
    }

    /// Uncompressed SEC1 encoding of the public key.
    #[must_use]
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.key.to_encoded_point(false).as_bytes().to_vec()
    }
}

#[cfg(feature = "es384")]
impl Signer for Es384Signer {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn sign(
        &self,
        rng: &mut impl CryptoRngCore,
        digest: &[u8],
    ) -> Result<Vec<u8>, signature::Error> {
        let sig: p384::ecdsa::Signature = self.key.sign_prehash_with_rng(rng, digest)?;
        Ok(sig.to_bytes().to_vec())
    }
}

#[cfg(feature = "es384")]
impl Verifier for Es384Verifier {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<(), signature::Error> {
        let sig = p384::ecdsa::Signature::from_slice(signature)?;
        self.key.verify_prehash(digest, &sig)
    }
}

/// ES512 signer (P-521 with SHA-512).
#[cfg(feature = "es512")]
pub type Es512Signer = EcdsaSigner<p521::ecdsa::SigningKey>;

/// ES512 verifier (P-521 with SHA-512).
#[cfg(feature = "es512")]
pub type Es512Verifier = EcdsaVerifier<p521::ecdsa::VerifyingKey>;

#[cfg(feature = "es512")]
impl Es512Signer {
    /// Bind an existing key to ES512.
    #[must_use]
    pub const fn new(key: p521::ecdsa::SigningKey) -> Self {
        EcdsaSigner {
            algorithm: ES512,
            key,
        }
    }

    /// Generate a fresh key.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self::new(p521::ecdsa::SigningKey::random(rng))
    }

    /// The verifier paired with this signer.
    #[must_use]
    pub fn verifier(&self) -> Es512Verifier {
        Es512Verifier::new(p521::ecdsa::VerifyingKey::from(&self.key))
    }
}

#[cfg(feature = "es512")]
impl Es512Verifier {
    /// Bind an existing public key to ES512.
    #[must_use]
    pub const fn new(key: p521::ecdsa::VerifyingKey) -> Self {
        EcdsaVerifier {
            algorithm: ES512,
            key,
        }
    }

    /// Import an uncompressed or compressed SEC1 public key.
    ///
    /// # Errors
    ///
    /// Returns `signature::Error` if the bytes are not a point on P-521.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, signature::Error> {
        Ok(Self::new(p521::ecdsa::VerifyingKey::from_sec1_bytes(bytes)?))
    }

    /// Uncompressed SEC1 encoding of the public key.
    #[must_use]
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.key.to_encoded_point(false).as_bytes().to_vec()
    }
}

#[cfg(feature = "es512")]
impl Signer for Es512Signer {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn sign(
        &self,
        rng: &mut impl CryptoRngCore,
        digest: &[u8],
    ) -> Result<Vec<u8>, signature::Error> {
        let sig: p521::ecdsa::Signature = self.key.sign_prehash_with_rng(rng, digest)?;
        Ok(sig.to_bytes().to_vec())
    }
}

#[cfg(feature = "es512")]
impl Verifier for Es512Verifier {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<(), signature::Error> {
        let sig = p521::ecdsa::Signature::from_slice(signature)?;
        self.key.verify_prehash(digest, &sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use testresult::TestResult;

    #[cfg(feature = "es256")]
    #[test]
    fn es256_sign_then_verify() -> TestResult {
        let mut rng = rand::thread_rng();
        let signer = Es256Signer::random(&mut rng);
        let digest = ES256.hash().map_or(Ok(vec![]), |h| h.digest(b"hello"))?;

        let sig = signer.sign(&mut rng, &digest)?;
        assert_eq!(sig.len(), 64);
        signer.verifier().verify(&digest, &sig)?;
        Ok(())
    }

    #[cfg(feature = "es384")]
    #[test]
    fn es384_sign_then_verify() -> TestResult {
        let mut rng = rand::thread_rng();
        let signer = Es384Signer::random(&mut rng);
        let digest = ES384.hash().map_or(Ok(vec![]), |h| h.digest(b"hello"))?;

        let sig = signer.sign(&mut rng, &digest)?;
        assert_eq!(sig.len(), 96);
        signer.verifier().verify(&digest, &sig)?;
        Ok(())
    }

    #[cfg(feature = "es512")]
    #[test]
    fn es512_sign_then_verify() -> TestResult {
        let mut rng = rand::thread_rng();
        let signer = Es512Signer::random(&mut rng);
        let digest = ES512.hash().map_or(Ok(vec![]), |h| h.digest(b"hello"))?;

        let sig = signer.sign(&mut rng, &digest)?;
        assert_eq!(sig.len(), 132);
        signer.verifier().verify(&digest, &sig)?;
        Ok(())
    }

    #[cfg(feature = "es256")]
    #[test]
    fn wrong_key_is_rejected() -> TestResult {
        let mut rng = rand::thread_rng();
        let signer = Es256Signer::random(&mut rng);
        let other = Es256Signer::random(&mut rng).verifier();
        let digest = [7u8; 32];

        let sig = signer.sign(&mut rng, &digest)?;
        assert!(other.verify(&digest, &sig).is_err());
        Ok(())
    }

    #[cfg(feature = "es256")]
    #[test]
    fn truncated_signature_is_rejected() -> TestResult {
        let mut rng = rand::thread_rng();
        let signer = Es256Signer::random(&mut rng);
        let digest = [7u8; 32];

        let sig = signer.sign(&mut rng, &digest)?;
        assert!(signer.verifier().verify(&digest, &sig[..63]).is_err());
        Ok(())
    }

    #[cfg(feature = "es512")]
    #[test]
    fn sec1_import_matches() -> TestResult {
        let mut rng = rand::thread_rng();
        let signer = Es512Signer::random(&mut rng);
        let exported = signer.verifier().to_sec1_bytes();
        let imported = Es512Verifier::from_sec1_bytes(&exported)?;

        let digest = [1u8; 64];
        let sig = signer.sign(&mut rng, &digest)?;
        imported.verify(&digest, &sig)?;
        assert_eq!(imported.algorithm(), ES512);
        Ok(())
    }

    #[cfg(feature = "es512")]
    #[test]
    fn es512_nonce_comes_from_the_given_rng() -> TestResult {
        let signer = Es512Signer::random(&mut rand::thread_rng());
        let digest = [3u8; 64];

        let a = signer.sign(&mut StdRng::seed_from_u64(7), &digest)?;
        let b = signer.sign(&mut StdRng::seed_from_u64(7), &digest)?;
        let c = signer.sign(&mut StdRng::seed_from_u64(8), &digest)?;
        assert_eq!(a, b);
        assert_ne!(a, c);
        signer.verifier().verify(&digest, &c)?;
        Ok(())
    }

    #[cfg(feature = "es256")]
    #[test]
    fn es256_nonce_comes_from_the_given_rng() -> TestResult {
        let signer = Es256Signer::random(&mut rand::thread_rng());
        let digest = [3u8; 32];

        let a = signer.sign(&mut StdRng::seed_from_u64(7), &digest)?;
        let b = signer.sign(&mut StdRng::seed_from_u64(7), &digest)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[cfg(feature = "es256")]
    #[test]
    fn debug_hides_key_material() {
        let signer = Es256Signer::random(&mut rand::thread_rng());
        let rendered = format!("{signer:?}");
        assert!(rendered.contains("ES256"));
        assert!(rendered.contains(".."));
    }
}
