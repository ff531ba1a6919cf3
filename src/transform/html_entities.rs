//! HTML entity transformer.
//!
//! Tracking payloads embedded in HTML attributes arrive entity-encoded.
//! This codec works on whole buffers: the encoder emits the markup-escaped
//! rendering (plus a variant keeping quotes literal, which many template
//! engines produce), and the decoder resolves every named and numeric
//! entity in one pass. There is no substring extraction.

use async_trait::async_trait;

use super::Transformer;

/// Reversible HTML entity codec (whole-buffer, no substring extraction).
#[derive(Debug, Default)]
pub struct HtmlEntitiesTransformer;

impl HtmlEntitiesTransformer {
    pub fn new() -> Self {
        Self
    }
}

/// Escapes the five markup-significant characters.
fn encode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[async_trait]
impl Transformer for HtmlEntitiesTransformer {
    fn id(&self) -> String {
        "html-entities".to_string()
    }

    fn reversible(&self) -> bool {
        true
    }

    fn encodings(&self, value: &[u8]) -> Option<Vec<Vec<u8>>> {
        let Ok(text) = std::str::from_utf8(value) else {
            return Some(Vec::new());
        };

        let encoded = encode_entities(text);
        let mut out = vec![encoded.clone().into_bytes()];
        let quotes_kept = encoded.replace("&quot;", "\"").replace("&apos;", "'");
        if quotes_kept != encoded {
            out.push(quotes_kept.into_bytes());
        }
        Some(out)
    }

    async fn extract_decode(&self, haystack: &[u8], _min_len: usize) -> Option<Vec<Vec<u8>>> {
        let Ok(text) = std::str::from_utf8(haystack) else {
            return Some(Vec::new());
        };

        let decoded = html_escape::decode_html_entities(text);
        Some(vec![decoded.into_owned().into_bytes()])
    }
}
