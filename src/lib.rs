//! # Anyfind - Find anything in anything
//!
//! Anyfind answers one forensic question: does this opaque byte buffer
//! contain a known secret, even if the secret was encoded, compressed or
//! hashed on the way in?
//!
//! ## Overview
//!
//! Trackers rarely transmit an identifier verbatim. A device ID may be
//! hex-encoded, wrapped in base64, percent-escaped inside a query string,
//! gzipped inside a request body, or hashed before it ever leaves the
//! device. Anyfind detects all of these:
//!
//! - Secrets ("values") are **pre-encoded** through every configured encoder
//!   up to a recursion bound, producing a deduplicated set of **needles**
//! - A haystack is searched by **recursively decoding** candidate
//!   sub-regions, racing decoder branches until one exposes a needle
//! - The result is the **chain** of transformer identities (outermost
//!   first) that explains the match, or `None`
//!
//! Hashes are one-way, so they live on the needle side: `sha256(v)` becomes
//! a needle, and a haystack containing `hex(sha256(v))` is reported as
//! `["hex", "sha256"]`.
//!
//! ## Detection model
//!
//! - **Syntactic, not semantic**: a match means some chain of decodings
//!   exposes the value as a contiguous byte sequence. It does not prove the
//!   match was intentional.
//! - **Some chain, not the chain**: when several chains explain a match,
//!   whichever race branch resolves first wins.
//! - **Whole buffers only**: haystacks are not streamed.
//!
//! ## Example Usage
//!
//! ```rust
//! use anyfind::Searcher;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut searcher = Searcher::new();
//! searcher.add_value(b"some-device-id").unwrap();
//!
//! // "c29tZS1kZXZpY2UtaWQ=" is base64("some-device-id")
//! let haystack = b"uid=c29tZS1kZXZpY2UtaWQ=&os=android";
//! let chain = searcher.find_value_in(haystack).await.unwrap();
//!
//! assert_eq!(chain, Some(vec!["base64".to_string()]));
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`transform`]: The codec library (hashes, base64 dialects, hex, URI,
//!   JSON strings, HTML entities, multipart, LZ-String, zlib/brotli)
//! - [`needle`]: Needle representation and the deduplicated needle set
//! - [`searcher`]: The [`Searcher`] engine (add values, search haystacks)

/// Default number of encoding layers applied when pre-computing needles.
pub const DEFAULT_MAX_ENCODE_LAYERS: u32 = 2;

/// Default number of decoding layers attempted when searching a haystack.
pub const DEFAULT_MAX_DECODE_LAYERS: u32 = 10;

pub mod needle;
mod search;
pub mod searcher;
pub mod transform;

// Re-export commonly used types at the crate root
pub use needle::Needle;
pub use searcher::{AddConfig, FindConfig, Searcher, SearcherError};
pub use transform::{
    default_transformers, Base64Dialect, Base64Transformer, CompressTransformer,
    CompressionFormat, FormDataTransformer, HashAlgorithm, HashTransformer, HexTransformer,
    HtmlEntitiesTransformer, JsonStringTransformer, LzStringTransformer, LzVariant, Transformer,
    UriTransformer,
};
