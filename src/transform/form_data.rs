//! multipart/form-data transformer (decode-only).
//!
//! If the first line of a buffer is a dash-dash boundary under the
//! RFC 2046 boundary grammar, the buffer is re-parsed as
//! `multipart/form-data` and every field's and file's raw content is
//! yielded as a candidate. Parse errors mid-body truncate the sequence
//! silently; `Content-Transfer-Encoding: quoted-printable` is not
//! supported (its content is passed through raw).

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;

use super::Transformer;

/// Decode-only multipart/form-data codec.
#[derive(Debug)]
pub struct FormDataTransformer {
    boundary_line: Regex,
}

impl FormDataTransformer {
    pub fn new() -> Self {
        // RFC 2046: 1-70 boundary characters, not ending in a space.
        let boundary_line = Regex::new(r"^--([0-9A-Za-z'()+_,./:=? -]{0,69}[0-9A-Za-z'()+_,./:=?-])\s*$")
            .expect("pattern is well-formed");
        Self { boundary_line }
    }
}

impl Default for FormDataTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transformer for FormDataTransformer {
    fn id(&self) -> String {
        "form-data".to_string()
    }

    fn reversible(&self) -> bool {
        true
    }

    async fn extract_decode(&self, haystack: &[u8], _min_len: usize) -> Option<Vec<Vec<u8>>> {
        let mut out = Vec::new();

        // Multipart requires CRLF line endings; a body whose first line is
        // not CRLF-terminated is not multipart.
        let Some(line_end) = memchr::memmem::find(haystack, b"\r\n") else {
            return Some(out);
        };
        let Ok(first_line) = std::str::from_utf8(&haystack[..line_end]) else {
            return Some(out);
        };
        let Some(captures) = self.boundary_line.captures(first_line) else {
            return Some(out);
        };
        let boundary = captures
            .get(1)
            .expect("boundary group always captures")
            .as_str()
            .to_string();

        let body = Bytes::copy_from_slice(haystack);
        let stream = futures::stream::once(async move {
            Ok::<Bytes, std::convert::Infallible>(body)
        });
        let mut multipart = multer::Multipart::new(stream, boundary);

        while let Ok(Some(field)) = multipart.next_field().await {
            match field.bytes().await {
                Ok(content) => out.push(content.to_vec()),
                Err(_) => break,
            }
        }
        Some(out)
    }
}
