//! URI-component transformer.
//!
//! Encoding mirrors `encodeURIComponent`: the UTF-8 rendering of the value
//! is percent-escaped (values that are not valid UTF-8 are skipped), and a
//! second form-encoded variant swaps `%20` for `+`. Extraction looks for
//! runs of URL code units and only decodes runs that actually contain an
//! escape, so plain words are left alone.

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use super::Transformer;

/// Everything `encodeURIComponent` escapes: all non-alphanumerics except
/// the unreserved marks.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Reversible URI-component codec.
#[derive(Debug)]
pub struct UriTransformer {
    matcher: Regex,
}

impl UriTransformer {
    pub fn new() -> Self {
        // URL code units minus the separators `/&=?`.
        let matcher = Regex::new(r"[A-Za-z0-9!$%'()*+,.:;@_~-]+").expect("pattern is well-formed");
        Self { matcher }
    }
}

impl Default for UriTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks the escapes in a match. Returns `None` when a `%` is not
/// followed by two hex digits (the match is skipped), otherwise whether
/// at least one `%HH` escape is present.
fn validate_escapes(token: &str) -> Option<bool> {
    let bytes = token.as_bytes();
    let mut has_escape = false;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 3 > bytes.len() {
                return None;
            }
            if !bytes[i + 1].is_ascii_hexdigit() || !bytes[i + 2].is_ascii_hexdigit() {
                return None;
            }
            has_escape = true;
            i += 3;
        } else {
            i += 1;
        }
    }
    Some(has_escape)
}

#[async_trait]
impl Transformer for UriTransformer {
    fn id(&self) -> String {
        "uri".to_string()
    }

    fn reversible(&self) -> bool {
        true
    }

    fn encodings(&self, value: &[u8]) -> Option<Vec<Vec<u8>>> {
        let Ok(text) = std::str::from_utf8(value) else {
            // Percent-encoding is defined over text here; binary values
            // have no URI rendering.
            return Some(Vec::new());
        };

        let encoded = utf8_percent_encode(text, URI_COMPONENT).to_string();
        let mut out = vec![encoded.clone().into_bytes()];
        let form_encoded = encoded.replace("%20", "+");
        if form_encoded != encoded {
            out.push(form_encoded.into_bytes());
        }
        Some(out)
    }

    async fn extract_decode(&self, haystack: &[u8], min_len: usize) -> Option<Vec<Vec<u8>>> {
        let text = String::from_utf8_lossy(haystack);
        let mut out = Vec::new();
        for matched in self.matcher.find_iter(&text) {
            let token = matched.as_str();
            if token.len() < min_len {
                continue;
            }
            let Some(has_escape) = validate_escapes(token) else {
                continue;
            };
            if !has_escape && !token.contains('+') {
                continue;
            }

            let spaced = token.replace('+', "%20");
            let decoded: Vec<u8> = percent_decode_str(&spaced).collect();
            out.push(decoded);
        }
        Some(out)
    }
}
