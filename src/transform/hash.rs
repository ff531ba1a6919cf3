//! Cryptographic hash transformers (non-reversible).
//!
//! Hashes cannot be inverted, so they only exist on the needle side: the
//! searcher pre-computes `hash(value)` and looks for the digest bytes (or
//! a further-encoded form of them) in the haystack.
//!
//! Trackers sometimes salt the value (`md5("prefix" + id)`) or truncate
//! the digest; both are supported through the constructors.

use async_trait::async_trait;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use super::Transformer;

/// The supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

/// A non-reversible hash transformer.
///
/// `encodings` yields exactly one buffer: the raw digest of
/// `prefix || value || suffix`, optionally truncated.
#[derive(Debug, Clone)]
pub struct HashTransformer {
    algorithm: HashAlgorithm,
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    truncate: Option<usize>,
}

impl HashTransformer {
    /// Creates a plain hash transformer for `algorithm`.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            prefix: Vec::new(),
            suffix: Vec::new(),
            truncate: None,
        }
    }

    /// Creates a salted variant: the digest is computed over
    /// `prefix || value || suffix`.
    pub fn with_affixes(algorithm: HashAlgorithm, prefix: Vec<u8>, suffix: Vec<u8>) -> Self {
        Self {
            algorithm,
            prefix,
            suffix,
            truncate: None,
        }
    }

    /// Creates a variant whose digest is truncated to `n_bytes`. The
    /// identity becomes `"<alg>/<n_bytes>"`.
    pub fn truncated(algorithm: HashAlgorithm, n_bytes: usize) -> Self {
        Self {
            algorithm,
            prefix: Vec::new(),
            suffix: Vec::new(),
            truncate: Some(n_bytes),
        }
    }

    fn digest_with<D: Digest>(&self, value: &[u8]) -> Vec<u8> {
        let mut hasher = D::new();
        hasher.update(&self.prefix);
        hasher.update(value);
        hasher.update(&self.suffix);
        hasher.finalize().to_vec()
    }

    fn digest(&self, value: &[u8]) -> Vec<u8> {
        let mut out = match self.algorithm {
            HashAlgorithm::Md5 => self.digest_with::<Md5>(value),
            HashAlgorithm::Sha1 => self.digest_with::<Sha1>(value),
            HashAlgorithm::Sha256 => self.digest_with::<Sha256>(value),
            HashAlgorithm::Sha512 => self.digest_with::<Sha512>(value),
        };
        if let Some(n) = self.truncate {
            out.truncate(n);
        }
        out
    }
}

#[async_trait]
impl Transformer for HashTransformer {
    fn id(&self) -> String {
        match self.truncate {
            Some(n) => format!("{}/{}", self.algorithm.name(), n),
            None => self.algorithm.name().to_string(),
        }
    }

    fn reversible(&self) -> bool {
        false
    }

    fn encodings(&self, value: &[u8]) -> Option<Vec<Vec<u8>>> {
        Some(vec![self.digest(value)])
    }
}
