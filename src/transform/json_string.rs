//! JSON string-literal transformer (decode-only).
//!
//! Request bodies are routinely JSON, and a secret inside a JSON document
//! is escaped (`\"`, `\uXXXX`, ...). This codec extracts every balanced
//! string literal from the haystack and yields its unescaped content.
//! There is no encoder: a JSON-encoded needle is just the value wrapped in
//! quotes, which the literal scan already covers via the decode side.

use async_trait::async_trait;
use regex::Regex;

use super::Transformer;

/// Decode-only JSON string-literal codec.
#[derive(Debug)]
pub struct JsonStringTransformer {
    matcher: Regex,
}

impl JsonStringTransformer {
    pub fn new() -> Self {
        // A balanced literal: any run of non-quote, non-backslash,
        // non-control characters or valid JSON escapes between quotes.
        let matcher = Regex::new(r#""(?:[^"\\\x00-\x1F]|\\(?:["\\/bfnrt]|u[0-9a-fA-F]{4}))*""#)
            .expect("pattern is well-formed");
        Self { matcher }
    }
}

impl Default for JsonStringTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transformer for JsonStringTransformer {
    fn id(&self) -> String {
        "json-string".to_string()
    }

    fn reversible(&self) -> bool {
        true
    }

    async fn extract_decode(&self, haystack: &[u8], min_len: usize) -> Option<Vec<Vec<u8>>> {
        let text = String::from_utf8_lossy(haystack);
        let mut out = Vec::new();
        for matched in self.matcher.find_iter(&text) {
            let token = matched.as_str();
            if token.len() < min_len {
                continue;
            }
            // serde_json settles the escape semantics (including surrogate
            // pairs); anything it rejects is skipped.
            match serde_json::from_str::<String>(token) {
                Ok(content) => out.push(content.into_bytes()),
                Err(_) => {}
            }
        }
        Some(out)
    }
}
