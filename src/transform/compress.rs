//! Generic compression transformer.
//!
//! Covers the formats browsers and HTTP stacks actually emit: gzip, zlib
//! ("deflate" in HTTP naming), raw deflate and brotli. Decoding sniffs the
//! header instead of trying every format: the gzip magic or the zlib
//! mod-31 checksum picks the wrapped decoders, a reserved deflate block
//! type rules out raw deflate, and brotli (which has no magic) is the
//! fallback.
//!
//! Gzip embeds an operating-system byte at offset 9, so the same payload
//! compressed on another platform differs in one byte. The encoder emits
//! OS-byte rewrites for the common platforms to keep needle comparison
//! byte-exact.

use std::io::Read;

use async_trait::async_trait;
use flate2::read::{DeflateDecoder, DeflateEncoder, GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use super::Transformer;

/// Offset of the OS byte in a gzip header.
const GZIP_OS_OFFSET: usize = 9;

/// OS byte values emitted for cross-platform gzip needles.
const GZIP_OS_VARIANTS: [u8; 3] = [10, 3, 7];

/// The supported compression formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    /// zlib-wrapped deflate (the HTTP "deflate" encoding).
    Deflate,
    /// Raw deflate without a wrapper.
    DeflateRaw,
    Brotli,
}

/// Reversible generic-compression codec (whole-buffer, no substring
/// extraction).
#[derive(Debug)]
pub struct CompressTransformer {
    formats: Vec<CompressionFormat>,
}

impl CompressTransformer {
    /// Creates a transformer over all four formats.
    pub fn new() -> Self {
        Self::with_formats(vec![
            CompressionFormat::Gzip,
            CompressionFormat::Deflate,
            CompressionFormat::DeflateRaw,
            CompressionFormat::Brotli,
        ])
    }

    /// Creates a transformer over a subset of formats.
    pub fn with_formats(formats: Vec<CompressionFormat>) -> Self {
        Self { formats }
    }

    fn compress(format: CompressionFormat, value: &[u8]) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        match format {
            CompressionFormat::Gzip => {
                GzEncoder::new(value, Compression::default())
                    .read_to_end(&mut out)
                    .ok()?;
            }
            CompressionFormat::Deflate => {
                ZlibEncoder::new(value, Compression::default())
                    .read_to_end(&mut out)
                    .ok()?;
            }
            CompressionFormat::DeflateRaw => {
                DeflateEncoder::new(value, Compression::default())
                    .read_to_end(&mut out)
                    .ok()?;
            }
            CompressionFormat::Brotli => {
                brotli::CompressorReader::new(value, 4096, 11, 22)
                    .read_to_end(&mut out)
                    .ok()?;
            }
        }
        Some(out)
    }
}

impl Default for CompressTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transformer for CompressTransformer {
    fn id(&self) -> String {
        "compress".to_string()
    }

    fn reversible(&self) -> bool {
        true
    }

    fn encodings(&self, value: &[u8]) -> Option<Vec<Vec<u8>>> {
        let mut out: Vec<Vec<u8>> = Vec::new();
        for format in &self.formats {
            let Some(compressed) = Self::compress(*format, value) else {
                continue;
            };
            if *format == CompressionFormat::Gzip && compressed.len() > GZIP_OS_OFFSET {
                for os in GZIP_OS_VARIANTS {
                    let mut variant = compressed.clone();
                    variant[GZIP_OS_OFFSET] = os;
                    if !out.contains(&variant) {
                        out.push(variant);
                    }
                }
            }
            if !out.contains(&compressed) {
                out.push(compressed);
            }
        }
        Some(out)
    }

    async fn extract_decode(&self, haystack: &[u8], _min_len: usize) -> Option<Vec<Vec<u8>>> {
        let gzip = self.formats.contains(&CompressionFormat::Gzip);
        let deflate = self.formats.contains(&CompressionFormat::Deflate);
        let deflate_raw = self.formats.contains(&CompressionFormat::DeflateRaw);
        let brotli_enabled = self.formats.contains(&CompressionFormat::Brotli);

        if haystack.len() >= 2 {
            let is_gzip = haystack[0] == 0x1F && haystack[1] == 0x8B;
            let is_zlib = u16::from_be_bytes([haystack[0], haystack[1]]) % 31 == 0;
            if is_gzip && gzip {
                let mut out = Vec::new();
                if GzDecoder::new(haystack).read_to_end(&mut out).is_ok() && !out.is_empty() {
                    return Some(vec![out]);
                }
            } else if is_zlib && deflate {
                let mut out = Vec::new();
                if ZlibDecoder::new(haystack).read_to_end(&mut out).is_ok() && !out.is_empty() {
                    return Some(vec![out]);
                }
            }
        }

        // A first byte with both BTYPE bits set is a reserved deflate
        // block, so the buffer cannot be raw deflate.
        if deflate_raw && !haystack.is_empty() && haystack[0] & 0b110 != 0b110 {
            let mut out = Vec::new();
            if DeflateDecoder::new(haystack).read_to_end(&mut out).is_ok() && !out.is_empty() {
                return Some(vec![out]);
            }
        }

        if brotli_enabled {
            let mut out = Vec::new();
            if brotli::Decompressor::new(haystack, 4096)
                .read_to_end(&mut out)
                .is_ok()
                && !out.is_empty()
            {
                return Some(vec![out]);
            }
        }

        Some(Vec::new())
    }

    fn compressed_length(&self, value: &[u8]) -> Option<usize> {
        self.formats
            .iter()
            .filter_map(|format| Self::compress(*format, value))
            .map(|compressed| compressed.len())
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode_all(transformer: &CompressTransformer, haystack: &[u8]) -> Vec<Vec<u8>> {
        transformer.extract_decode(haystack, 0).await.unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip_all_formats() {
        let transformer = CompressTransformer::new();
        let value = b"a payload that compresses, a payload that compresses".to_vec();

        for encoded in transformer.encodings(&value).unwrap() {
            let decoded = decode_all(&transformer, &encoded).await;
            assert_eq!(decoded, vec![value.clone()]);
        }
    }

    #[tokio::test]
    async fn test_gzip_os_byte_variants_roundtrip() {
        let transformer = CompressTransformer::with_formats(vec![CompressionFormat::Gzip]);
        let value = b"cross platform payload".to_vec();

        let encodings = transformer.encodings(&value).unwrap();
        let os_bytes: Vec<u8> = encodings.iter().map(|e| e[GZIP_OS_OFFSET]).collect();
        for os in GZIP_OS_VARIANTS {
            assert!(os_bytes.contains(&os));
        }
        for encoded in &encodings {
            let decoded = decode_all(&transformer, encoded).await;
            assert_eq!(decoded, vec![value.clone()]);
        }
    }

    #[tokio::test]
    async fn test_zlib_header_sniffed() {
        let transformer = CompressTransformer::new();
        let value = b"deflate me, deflate me".to_vec();

        let encoded = compress(CompressionFormat::Deflate, &value);
        // zlib magic: big-endian first two bytes divide by 31.
        assert_eq!(
            u16::from_be_bytes([encoded[0], encoded[1]]) % 31,
            0,
            "zlib header sanity"
        );
        let decoded = decode_all(&transformer, &encoded).await;
        assert_eq!(decoded, vec![value]);
    }

    #[tokio::test]
    async fn test_raw_deflate_decoded() {
        let transformer = CompressTransformer::new();
        let value = b"value".repeat(100);

        let encoded = compress(CompressionFormat::DeflateRaw, &value);
        let decoded = decode_all(&transformer, &encoded).await;
        assert_eq!(decoded, vec![value]);
    }

    #[tokio::test]
    async fn test_brotli_fallback() {
        let transformer = CompressTransformer::new();
        let value = b"brotli payload brotli payload".to_vec();

        let encoded = compress(CompressionFormat::Brotli, &value);
        let decoded = decode_all(&transformer, &encoded).await;
        assert_eq!(decoded, vec![value]);
    }

    #[tokio::test]
    async fn test_garbage_yields_nothing() {
        let transformer = CompressTransformer::new();
        let decoded = decode_all(&transformer, &[0x07, 0xFF, 0x00, 0x01]).await;

        assert!(decoded.is_empty());
    }

    #[test]
    fn test_compressed_length_is_minimum() {
        let transformer = CompressTransformer::new();
        let value = b"value".to_vec();

        let min = transformer.compressed_length(&value).unwrap();
        for format in [
            CompressionFormat::Gzip,
            CompressionFormat::Deflate,
            CompressionFormat::DeflateRaw,
            CompressionFormat::Brotli,
        ] {
            let compressed = CompressTransformer::compress(format, &value).unwrap();
            assert!(min <= compressed.len());
        }
    }

    fn compress(format: CompressionFormat, value: &[u8]) -> Vec<u8> {
        CompressTransformer::compress(format, value).unwrap()
    }
}
