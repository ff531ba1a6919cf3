//! Hex transformer.
//!
//! Hashed identifiers almost always travel as hex, so this codec matters
//! most one layer above a hash needle. Casing cannot mix within a single
//! match: "deadBEEF" is two broken halves, not one token.

use async_trait::async_trait;
use regex::Regex;

use super::Transformer;

/// Reversible hex codec over lowercase and/or uppercase variants.
#[derive(Debug)]
pub struct HexTransformer {
    lowercase: bool,
    uppercase: bool,
    lower_matcher: Regex,
    upper_matcher: Regex,
}

impl HexTransformer {
    /// Creates a transformer handling both casings.
    pub fn new() -> Self {
        Self::with_cases(true, true)
    }

    /// Creates a transformer handling only lowercase hex.
    pub fn lowercase_only() -> Self {
        Self::with_cases(true, false)
    }

    /// Creates a transformer handling only uppercase hex.
    pub fn uppercase_only() -> Self {
        Self::with_cases(false, true)
    }

    fn with_cases(lowercase: bool, uppercase: bool) -> Self {
        assert!(lowercase || uppercase, "at least one casing is required");
        Self {
            lowercase,
            uppercase,
            lower_matcher: Regex::new(r"\b(?:[a-f0-9]{2})+\b").expect("pattern is well-formed"),
            upper_matcher: Regex::new(r"\b(?:[A-F0-9]{2})+\b").expect("pattern is well-formed"),
        }
    }

    fn matchers(&self) -> impl Iterator<Item = &Regex> {
        self.lowercase
            .then_some(&self.lower_matcher)
            .into_iter()
            .chain(self.uppercase.then_some(&self.upper_matcher))
    }
}

impl Default for HexTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transformer for HexTransformer {
    fn id(&self) -> String {
        "hex".to_string()
    }

    fn reversible(&self) -> bool {
        true
    }

    fn encodings(&self, value: &[u8]) -> Option<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        if self.lowercase {
            out.push(hex::encode(value).into_bytes());
        }
        if self.uppercase {
            out.push(hex::encode_upper(value).into_bytes());
        }
        Some(out)
    }

    async fn extract_decode(&self, haystack: &[u8], min_len: usize) -> Option<Vec<Vec<u8>>> {
        let text = String::from_utf8_lossy(haystack);
        let mut out = Vec::new();
        for matcher in self.matchers() {
            for matched in matcher.find_iter(&text) {
                let token = matched.as_str();
                if token.len() < min_len {
                    continue;
                }
                if let Ok(decoded) = hex::decode(token) {
                    out.push(decoded);
                }
            }
        }
        Some(out)
    }
}
