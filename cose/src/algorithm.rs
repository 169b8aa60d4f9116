//! Algorithm registry.
//!
//! The table is a `static`; nothing mutates it after start-up, so it can be
//! shared freely between threads. Identifiers come from the IANA COSE
//! Algorithms registry.
//!
//! Only negative identifiers are accepted as first-layer (message)
//! signature algorithms. Non-negative identifiers belong to other layers
//! (content encryption, MAC, recipients) and are rejected by
//! [`Registry::resolve`] even though the table knows them, which closes the
//! door on swapping a second-layer algorithm into a message header.

use crate::{
    hash::HashAlgorithm,
    header::{Headers, Label, Value},
};
use thiserror::Error;

/// What an algorithm does with its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// ECDSA over a NIST curve.
    Ecdsa,

    /// Edwards-curve DSA.
    EdDsa,

    /// RSASSA-PSS.
    RsaPss,

    /// Symmetric MAC.
    Mac,

    /// Authenticated content encryption.
    ContentEncryption,
}

/// An entry of the algorithm registry.
///
/// Values are only obtained from the registry (or the constants below);
/// two algorithms are the same iff their identifiers are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Algorithm {
    id: i64,
    name: &'static str,
    hash: Option<HashAlgorithm>,
    family: Family,
}

impl Algorithm {
    const fn new(
        id: i64,
        name: &'static str,
        hash: Option<HashAlgorithm>,
        family: Family,
    ) -> Self {
        Algorithm {
            id,
            name,
            hash,
            family,
        }
    }

    /// COSE identifier.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Registered name, e.g. `"ES512"`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Hash applied to the Sig-Structure before signing, if any.
    #[must_use]
    pub const fn hash(&self) -> Option<HashAlgorithm> {
        self.hash
    }

    /// Signature or MAC scheme the algorithm belongs to.
    #[must_use]
    pub const fn family(&self) -> Family {
        self.family
    }

    /// Whether the identifier is in the range reserved for message-layer
    /// signature algorithms.
    #[must_use]
    pub const fn is_first_layer(&self) -> bool {
        is_first_layer(self.id)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Whether `id` is in the range reserved for message-layer signature algorithms.
#[must_use]
pub const fn is_first_layer(id: i64) -> bool {
    id < 0
}

/// ECDSA w/ SHA-256
pub const ES256: Algorithm =
    Algorithm::new(-7, "ES256", Some(HashAlgorithm::Sha2_256), Family::Ecdsa);

/// ECDSA w/ SHA-384
pub const ES384: Algorithm =
    Algorithm::new(-35, "ES384", Some(HashAlgorithm::Sha2_384), Family::Ecdsa);

/// ECDSA w/ SHA-512
pub const ES512: Algorithm =
    Algorithm::new(-36, "ES512", Some(HashAlgorithm::Sha2_512), Family::Ecdsa);

/// `EdDSA`. Signs the Sig-Structure itself, so there is no digest to hand
/// to a provider.
pub const EDDSA: Algorithm = Algorithm::new(-8, "EdDSA", None, Family::EdDsa);

/// RSASSA-PSS w/ SHA-256
pub const PS256: Algorithm =
    Algorithm::new(-37, "PS256", Some(HashAlgorithm::Sha2_256), Family::RsaPss);

/// RSASSA-PSS w/ SHA-384
pub const PS384: Algorithm =
    Algorithm::new(-38, "PS384", Some(HashAlgorithm::Sha2_384), Family::RsaPss);

/// RSASSA-PSS w/ SHA-512
pub const PS512: Algorithm =
    Algorithm::new(-39, "PS512", Some(HashAlgorithm::Sha2_512), Family::RsaPss);

/// AES-GCM mode w/ 128-bit key
pub const A128GCM: Algorithm = Algorithm::new(1, "A128GCM", None, Family::ContentEncryption);

/// AES-GCM mode w/ 192-bit key
pub const A192GCM: Algorithm = Algorithm::new(2, "A192GCM", None, Family::ContentEncryption);

/// AES-GCM mode w/ 256-bit key
pub const A256GCM: Algorithm = Algorithm::new(3, "A256GCM", None, Family::ContentEncryption);

/// HMAC w/ SHA-256 truncated to 64 bits
pub const HMAC_256_64: Algorithm = Algorithm::new(
    4,
    "HMAC 256/64",
    Some(HashAlgorithm::Sha2_256),
    Family::Mac,
);

/// HMAC w/ SHA-256
pub const HMAC_256_256: Algorithm = Algorithm::new(
    5,
    "HMAC 256/256",
    Some(HashAlgorithm::Sha2_256),
    Family::Mac,
);

/// HMAC w/ SHA-384
pub const HMAC_384_384: Algorithm = Algorithm::new(
    6,
    "HMAC 384/384",
    Some(HashAlgorithm::Sha2_384),
    Family::Mac,
);

/// HMAC w/ SHA-512
pub const HMAC_512_512: Algorithm = Algorithm::new(
    7,
    "HMAC 512/512",
    Some(HashAlgorithm::Sha2_512),
    Family::Mac,
);

static REGISTRY: Registry = Registry {
    algorithms: &[
        ES256,
        ES384,
        ES512,
        EDDSA,
        PS256,
        PS384,
        PS512,
        A128GCM,
        A192GCM,
        A256GCM,
        HMAC_256_64,
        HMAC_256_256,
        HMAC_384_384,
        HMAC_512_512,
    ],
};

/// Read-only table of known algorithms.
#[derive(Debug)]
pub struct Registry {
    algorithms: &'static [Algorithm],
}

impl Registry {
    /// The process-wide table.
    #[must_use]
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    /// Look up an algorithm by identifier, whatever layer it belongs to.
    #[must_use]
    pub fn lookup(&self, id: i64) -> Option<Algorithm> {
        self.algorithms.iter().find(|alg| alg.id == id).copied()
    }

    /// Look up an algorithm by registered name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<Algorithm> {
        self.algorithms.iter().find(|alg| alg.name == name).copied()
    }

    /// All known algorithms.
    pub fn iter(&self) -> impl Iterator<Item = &Algorithm> {
        self.algorithms.iter()
    }

    /// Resolve the message-layer algorithm declared in `headers`.
    ///
    /// Only the protected bucket is consulted. The value may be the integer
    /// identifier or the registered name.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidAlgorithm`] if `alg` is missing from the protected
    /// bucket, is neither an integer nor text, is outside the first-layer
    /// range, or is not in the table.
    pub fn resolve(&self, headers: &Headers) -> Result<Algorithm, InvalidAlgorithm> {
        let id = match headers.protected.get(&Label::Algorithm) {
            Some(Value::Int(id)) => *id,
            Some(Value::Text(name)) => self
                .by_name(name)
                .ok_or_else(|| InvalidAlgorithm::UnknownName(name.clone()))?
                .id,
            Some(_) => return Err(InvalidAlgorithm::WrongType),
            None if headers.unprotected.contains(&Label::Algorithm) => {
                return Err(InvalidAlgorithm::Unprotected)
            }
            None => return Err(InvalidAlgorithm::Missing),
        };

        if !is_first_layer(id) {
            return Err(InvalidAlgorithm::OutOfRange(id));
        }

        self.lookup(id).ok_or(InvalidAlgorithm::Unknown(id))
    }
}

/// Look up an algorithm in the process-wide table.
#[must_use]
pub fn lookup(id: i64) -> Option<Algorithm> {
    Registry::global().lookup(id)
}

/// Why a declared algorithm was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAlgorithm {
    /// No `alg` parameter at all.
    #[error("no algorithm in protected headers")]
    Missing,

    /// `alg` only appears in the unprotected bucket, where it is not
    /// covered by the signature.
    #[error("algorithm must be a protected header")]
    Unprotected,

    /// `alg` is neither an integer nor text.
    #[error("algorithm must be an integer or text")]
    WrongType,

    /// The identifier is reserved for another layer.
    #[error("algorithm {0} is not a message-layer signature algorithm")]
    OutOfRange(i64),

    /// Identifier not in the table.
    #[error("unknown algorithm {0}")]
    Unknown(i64),

    /// Name not in the table.
    #[error("unknown algorithm {0:?}")]
    UnknownName(String),
}
