//! LZ-String transformer.
//!
//! LZ-String is a JavaScript-native compressor that trackers use for
//! payloads stuffed into cookies and query strings. Its output is a
//! sequence of UTF-16 code units with several renderings: raw code units
//! ("ucs2"), the valid-UTF-16 variant ("utf16"), a byte-pair rendering
//! ("bytes"), and base64/URI-alphabet text renderings.
//!
//! The encoder compresses both interpretations of the value (UTF-8 text
//! and latin-1 widened bytes, identical for ASCII input). The decoder
//! tries the bytes/ucs2/utf16 variants directly; the base64 and uri
//! variants are reached by letting the base64 transformer peel its layer
//! first.

use async_trait::async_trait;

use super::Transformer;

/// The LZ-String output renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzVariant {
    /// Byte pairs (`compressToUint8Array`).
    Bytes,
    /// Raw UTF-16 code units rendered little-endian (`compress`).
    Ucs2,
    /// The valid-UTF-16 rendering (`compressToUTF16`).
    Utf16,
    /// Base64 text rendering (`compressToBase64`).
    Base64,
    /// URI-safe text rendering (`compressToEncodedURIComponent`).
    Uri,
}

/// Reversible LZ-String codec (whole-buffer, no substring extraction).
#[derive(Debug)]
pub struct LzStringTransformer {
    variants: Vec<LzVariant>,
}

impl LzStringTransformer {
    /// Creates a transformer over all five variants.
    pub fn new() -> Self {
        Self::with_variants(vec![
            LzVariant::Bytes,
            LzVariant::Ucs2,
            LzVariant::Utf16,
            LzVariant::Base64,
            LzVariant::Uri,
        ])
    }

    /// Creates a transformer over a subset of variants.
    pub fn with_variants(variants: Vec<LzVariant>) -> Self {
        Self { variants }
    }

    /// The value as UTF-16 code units, once per distinct interpretation:
    /// the UTF-8 text reading (when valid) and the latin-1 byte reading.
    fn interpretations(value: &[u8]) -> Vec<Vec<u16>> {
        let mut out: Vec<Vec<u16>> = Vec::with_capacity(2);
        if let Ok(text) = std::str::from_utf8(value) {
            out.push(text.encode_utf16().collect());
        }
        let widened: Vec<u16> = value.iter().map(|&b| b as u16).collect();
        if !out.contains(&widened) {
            out.push(widened);
        }
        out
    }

    /// Renders a decompressed code-unit sequence back to candidate byte
    /// buffers: the UTF-8 rendering (when the units form valid UTF-16)
    /// and the latin-1 rendering.
    fn renderings(units: &[u16]) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(2);
        if let Ok(text) = String::from_utf16(units) {
            out.push(text.into_bytes());
        }
        let latin1: Vec<u8> = units.iter().map(|&u| u as u8).collect();
        if !out.contains(&latin1) {
            out.push(latin1);
        }
        out
    }
}

impl Default for LzStringTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Little-endian byte rendering of raw code units.
fn units_to_le_bytes(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(units.len() * 2);
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Reads little-endian code units back out of a byte buffer. A trailing
/// odd byte cannot belong to any unit and is dropped.
fn le_bytes_to_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[async_trait]
impl Transformer for LzStringTransformer {
    fn id(&self) -> String {
        "lz-string".to_string()
    }

    fn reversible(&self) -> bool {
        true
    }

    fn encodings(&self, value: &[u8]) -> Option<Vec<Vec<u8>>> {
        let mut out: Vec<Vec<u8>> = Vec::new();
        for interpretation in Self::interpretations(value) {
            for variant in &self.variants {
                let encoded = match variant {
                    LzVariant::Bytes => lz_str::compress_to_uint8_array(interpretation.as_slice()),
                    LzVariant::Ucs2 => {
                        units_to_le_bytes(&lz_str::compress(interpretation.as_slice()))
                    }
                    LzVariant::Utf16 => {
                        lz_str::compress_to_utf16(interpretation.as_slice()).into_bytes()
                    }
                    LzVariant::Base64 => {
                        lz_str::compress_to_base64(interpretation.as_slice()).into_bytes()
                    }
                    LzVariant::Uri => {
                        lz_str::compress_to_encoded_uri_component(interpretation.as_slice())
                            .into_bytes()
                    }
                };
                if !out.contains(&encoded) {
                    out.push(encoded);
                }
            }
        }
        Some(out)
    }

    async fn extract_decode(&self, haystack: &[u8], _min_len: usize) -> Option<Vec<Vec<u8>>> {
        let mut out: Vec<Vec<u8>> = Vec::new();
        for variant in &self.variants {
            let units = match variant {
                LzVariant::Bytes => {
                    // Transports strip trailing zero bytes; pad back to an
                    // even length before decompressing.
                    let padded: Vec<u8> = if haystack.len() % 2 != 0 {
                        let mut padded = haystack.to_vec();
                        padded.push(0);
                        padded
                    } else {
                        haystack.to_vec()
                    };
                    lz_str::decompress_from_uint8_array(&padded)
                }
                LzVariant::Ucs2 => lz_str::decompress(le_bytes_to_units(haystack).as_slice()),
                LzVariant::Utf16 => match std::str::from_utf8(haystack) {
                    Ok(text) => lz_str::decompress_from_utf16(text),
                    Err(_) => None,
                },
                // The base64 and uri renderings are handled by the base64
                // transformer peeling its layer first.
                LzVariant::Base64 | LzVariant::Uri => None,
            };
            if let Some(units) = units {
                for rendering in Self::renderings(&units) {
                    if !out.contains(&rendering) {
                        out.push(rendering);
                    }
                }
            }
        }
        Some(out)
    }

    fn compressed_length(&self, value: &[u8]) -> Option<usize> {
        self.encodings(value)
            .unwrap_or_default()
            .iter()
            .map(Vec::len)
            .min()
    }
}
