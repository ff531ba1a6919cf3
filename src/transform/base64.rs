//! Base64 transformer with dialect support.
//!
//! A dialect is the choice of the two non-alphanumeric digits plus an
//! optional padding character. Besides the RFC 4648 standard and URL-safe
//! alphabets, trackers ship LZ-String's URI-safe alphabet `(+,-)`, so the
//! dialect table is open-ended.
//!
//! Extraction is regex-driven: one pattern per dialect, anchored with
//! lookaround so a token is never carved out of the middle of a longer
//! digit run. Tokens whose length is not a multiple of four are repaired
//! before decoding: when the dropped low bits of the final digit are set
//! (LZ-String tails do this), an all-zero digit is appended so those bits
//! survive the decode.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use fancy_regex::Regex;

use super::Transformer;

/// A base64 dialect: the two non-alphanumeric digits and optional padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base64Dialect {
    /// The character encoding digit value 62 (`+` in the standard alphabet).
    pub digit62: char,
    /// The character encoding digit value 63 (`/` in the standard alphabet).
    pub digit63: char,
    /// The padding character, or `None` for unpadded output.
    pub padding: Option<char>,
}

impl Base64Dialect {
    /// RFC 4648 standard alphabet with `=` padding.
    pub const STANDARD: Self = Self {
        digit62: '+',
        digit63: '/',
        padding: Some('='),
    };

    /// Standard alphabet without padding.
    pub const STANDARD_UNPADDED: Self = Self {
        digit62: '+',
        digit63: '/',
        padding: None,
    };

    /// RFC 4648 URL-safe alphabet, unpadded.
    pub const URL_SAFE: Self = Self {
        digit62: '-',
        digit63: '_',
        padding: None,
    };

    /// The alphabet used by LZ-String's URI-safe output.
    pub const LZ_STRING_URI: Self = Self {
        digit62: '+',
        digit63: '-',
        padding: None,
    };

    fn is_standard_alphabet(&self) -> bool {
        self.digit62 == '+' && self.digit63 == '/'
    }

    fn is_url_safe_alphabet(&self) -> bool {
        self.digit62 == '-' && self.digit63 == '_'
    }

    fn same_digits(&self, other: &Self) -> bool {
        self.digit62 == other.digit62 && self.digit63 == other.digit63
    }

    /// The character class matching this dialect's digits.
    fn digit_class(&self) -> String {
        format!(
            "A-Za-z0-9{}{}",
            regex::escape(&self.digit62.to_string()),
            regex::escape(&self.digit63.to_string())
        )
    }
}

/// Reversible base64 codec over a set of dialects.
#[derive(Debug)]
pub struct Base64Transformer {
    dialects: Vec<Base64Dialect>,
    matchers: Vec<(Base64Dialect, Regex)>,
    skip_leading: bool,
}

impl Base64Transformer {
    /// Creates a transformer over the four preset dialects.
    pub fn new() -> Self {
        Self::with_dialects(vec![
            Base64Dialect::STANDARD,
            Base64Dialect::STANDARD_UNPADDED,
            Base64Dialect::URL_SAFE,
            Base64Dialect::LZ_STRING_URI,
        ])
    }

    /// Creates a transformer over a custom dialect set.
    pub fn with_dialects(dialects: Vec<Base64Dialect>) -> Self {
        let matchers = build_matchers(&dialects);
        Self {
            dialects,
            matchers,
            skip_leading: false,
        }
    }

    /// Enables the "try skip first 0..3 characters" mode, used to find
    /// values embedded in a base64 stream at a non-aligned byte offset.
    /// Only unpadded dialects participate. This inflates search cost
    /// noticeably, so it is off by default.
    pub fn with_skip_leading(mut self, skip_leading: bool) -> Self {
        self.skip_leading = skip_leading;
        self
    }
}

impl Default for Base64Transformer {
    fn default() -> Self {
        Self::new()
    }
}

/// One extraction regex per dialect. A padded dialect whose digits also
/// appear as an unpadded dialect is redundant (the unpadded pattern plus
/// tail repair already covers its tokens) and gets no matcher.
fn build_matchers(dialects: &[Base64Dialect]) -> Vec<(Base64Dialect, Regex)> {
    let mut matchers = Vec::new();
    for dialect in dialects {
        if dialect.padding.is_some()
            && dialects
                .iter()
                .any(|other| other.padding.is_none() && other.same_digits(dialect))
        {
            continue;
        }

        let digits = dialect.digit_class();
        let pattern = match dialect.padding {
            Some(pad) => {
                let pad = regex::escape(&pad.to_string());
                format!(
                    "(?<![{d}])(?:[{d}]{{4}})*(?:[{d}]{{4}}|[{d}]{{3}}{p}|[{d}]{{2}}{p}{{2}}|[{d}]{p}{{3}})(?![{d}{p}])",
                    d = digits,
                    p = pad
                )
            }
            None => format!("(?<![{d}])[{d}]+(?![{d}])", d = digits),
        };
        let regex = Regex::new(&pattern).expect("dialect pattern is well-formed");
        matchers.push((*dialect, regex));
    }
    matchers
}

/// Maps a digit character to its 6-bit value.
fn digit_value(c: char, url_safe: bool) -> Option<u8> {
    match c {
        'A'..='Z' => Some(c as u8 - b'A'),
        'a'..='z' => Some(c as u8 - b'a' + 26),
        '0'..='9' => Some(c as u8 - b'0' + 52),
        '+' if !url_safe => Some(62),
        '/' if !url_safe => Some(63),
        '-' if url_safe => Some(62),
        '_' if url_safe => Some(63),
        _ => None,
    }
}

/// Decodes a padding-stripped token in the standard or URL-safe alphabet,
/// repairing a ragged tail first.
///
/// For a token whose length is not a multiple of four, the final digit
/// carries `(len * 6) mod 8` bits that a plain decode would drop. If any
/// of those bits are set (or the token is a lone digit), an all-zero `A`
/// digit is appended so the bits land in an extra output byte.
fn repair_and_decode(token: &str, url_safe: bool) -> Option<Vec<u8>> {
    if token.is_empty() {
        return None;
    }

    let mut token = token.to_string();
    let rem = token.len() % 4;
    if rem != 0 {
        let bits_dropped = (token.len() * 6) % 8;
        let last = token.chars().last()?;
        let value = digit_value(last, url_safe)?;
        if rem == 1 || value & ((1u8 << bits_dropped) - 1) != 0 {
            token.push('A');
        }
    }

    let engine = if url_safe {
        &URL_SAFE_NO_PAD
    } else {
        &STANDARD_NO_PAD
    };
    engine.decode(token.as_bytes()).ok()
}

#[async_trait]
impl Transformer for Base64Transformer {
    fn id(&self) -> String {
        "base64".to_string()
    }

    fn reversible(&self) -> bool {
        true
    }

    fn encodings(&self, value: &[u8]) -> Option<Vec<Vec<u8>>> {
        let canonical = STANDARD.encode(value);
        let mut out: Vec<Vec<u8>> = Vec::with_capacity(self.dialects.len());
        for dialect in &self.dialects {
            let mut encoded = String::with_capacity(canonical.len());
            for c in canonical.chars() {
                match c {
                    '+' => encoded.push(dialect.digit62),
                    '/' => encoded.push(dialect.digit63),
                    '=' => match dialect.padding {
                        Some(pad) => encoded.push(pad),
                        None => {}
                    },
                    other => encoded.push(other),
                }
            }
            let encoded = encoded.into_bytes();
            if !out.contains(&encoded) {
                out.push(encoded);
            }
        }
        Some(out)
    }

    async fn extract_decode(&self, haystack: &[u8], min_len: usize) -> Option<Vec<Vec<u8>>> {
        // Base64 payloads are frequently wrapped; join the lines back up
        // before matching.
        let normalized: Vec<u8> = haystack
            .iter()
            .copied()
            .filter(|&b| b != b'\r' && b != b'\n')
            .collect();
        let text = String::from_utf8_lossy(&normalized);

        let mut out: Vec<Vec<u8>> = Vec::new();
        for (dialect, regex) in &self.matchers {
            let url_safe = dialect.is_url_safe_alphabet();
            for matched in regex.find_iter(&text).flatten() {
                let token = matched.as_str();
                if token.len() < min_len {
                    continue;
                }

                let token = match dialect.padding {
                    Some(pad) => token.trim_end_matches(pad),
                    None => token,
                };
                let token: String = if dialect.is_standard_alphabet() || url_safe {
                    token.to_string()
                } else {
                    token
                        .chars()
                        .map(|c| {
                            if c == dialect.digit62 {
                                '+'
                            } else if c == dialect.digit63 {
                                '/'
                            } else {
                                c
                            }
                        })
                        .collect()
                };

                let max_skip = if self.skip_leading && dialect.padding.is_none() {
                    3.min(token.len().saturating_sub(1))
                } else {
                    0
                };
                for offset in 0..=max_skip {
                    if let Some(decoded) = repair_and_decode(&token[offset..], url_safe) {
                        out.push(decoded);
                    }
                }
            }
        }
        Some(out)
    }
}
