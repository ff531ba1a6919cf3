//! The codec library for Anyfind.
//!
//! Every codec is a [`Transformer`]: a named capability set over byte
//! buffers. A transformer may expose any non-empty subset of:
//!
//! - `encodings`: candidate encoded forms of a value (needle side)
//! - `extract_decode`: candidate decoded forms extracted from sub-regions
//!   of a haystack (search side)
//! - `compressed_length`: a lower bound on the encoded size of a value,
//!   answered only by compressing codecs
//!
//! A transformer is *reversible* iff it exposes `extract_decode`. Hashes
//! are encoders only; JSON strings and multipart bodies are decoders only.
//!
//! Candidate sequences are finite and materialized. Consumers are free to
//! stop using them at any point; producers must not assume every candidate
//! is inspected.

use std::sync::Arc;

use async_trait::async_trait;

pub mod base64;
pub mod compress;
pub mod form_data;
pub mod hash;
pub mod hex;
pub mod html_entities;
pub mod json_string;
pub mod lz_string;
pub mod uri;

pub use self::base64::{Base64Dialect, Base64Transformer};
pub use self::compress::{CompressTransformer, CompressionFormat};
pub use self::form_data::FormDataTransformer;
pub use self::hash::{HashAlgorithm, HashTransformer};
pub use self::hex::HexTransformer;
pub use self::html_entities::HtmlEntitiesTransformer;
pub use self::json_string::JsonStringTransformer;
pub use self::lz_string::{LzStringTransformer, LzVariant};
pub use self::uri::UriTransformer;

/// A named codec over byte buffers.
///
/// Implementations return `None` from a capability method to signal that
/// the capability is absent, and `Some(vec![])` when the capability exists
/// but produces no candidates for this particular input. Malformed input
/// never surfaces as an error: it yields zero candidates.
#[async_trait]
pub trait Transformer: std::fmt::Debug + Send + Sync {
    /// Stable identity used in returned chains (e.g. `"base64"`, `"sha256"`).
    fn id(&self) -> String;

    /// Whether this transformer exposes `extract_decode`.
    fn reversible(&self) -> bool;

    /// Candidate encoded forms of `value`, or `None` if this codec has no
    /// encoder (JSON strings, multipart).
    fn encodings(&self, _value: &[u8]) -> Option<Vec<Vec<u8>>> {
        None
    }

    /// Candidate decoded buffers extracted from sub-regions of `haystack`,
    /// or `None` if this codec has no decoder (hashes).
    ///
    /// `min_len` is a heuristic lower bound on the encoded length of any
    /// interesting match; `0` means no bound. Codecs may reject shorter
    /// matches but must not reject matches that could decode to something
    /// longer.
    async fn extract_decode(&self, _haystack: &[u8], _min_len: usize) -> Option<Vec<Vec<u8>>> {
        None
    }

    /// The smallest size this codec could compress `value` to, or `None`
    /// if this codec is not a compressing decoder.
    fn compressed_length(&self, _value: &[u8]) -> Option<usize> {
        None
    }
}

/// The default transformer list, in race order: hashes first, then the
/// cheap textual codecs, then the expensive compressors.
pub fn default_transformers() -> Vec<Arc<dyn Transformer>> {
    vec![
        Arc::new(HashTransformer::new(HashAlgorithm::Md5)),
        Arc::new(HashTransformer::new(HashAlgorithm::Sha1)),
        Arc::new(HashTransformer::new(HashAlgorithm::Sha256)),
        Arc::new(HashTransformer::new(HashAlgorithm::Sha512)),
        Arc::new(Base64Transformer::new()),
        Arc::new(HexTransformer::new()),
        Arc::new(UriTransformer::new()),
        Arc::new(JsonStringTransformer::new()),
        Arc::new(HtmlEntitiesTransformer::new()),
        Arc::new(FormDataTransformer::new()),
        Arc::new(LzStringTransformer::new()),
        Arc::new(CompressTransformer::new()),
    ]
}
