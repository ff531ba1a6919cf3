//! The Anyfind searcher.
//!
//! This module orchestrates both sides of the engine:
//!
//! Adding a value:
//! 1. Append the value and its raw needle (deduplicated by fingerprint)
//! 2. Run every encoder over every needle up to `max_encode_layers`,
//!    deduplicating encoded forms per recursion budget
//! 3. Admit the forms allowed by the terminal-layer policy into the
//!    needle set and keep the minimum needle length current
//!
//! Searching a haystack:
//! 1. Compute the effective minimum encoded length from the needle set
//!    and the compressing decoders
//! 2. Recursively decode sub-regions, racing decoder branches, until some
//!    decoded buffer contains a needle literally
//!
//! A searcher is add-only: values and needles are never mutated or
//! removed. After all `add_value` calls have settled, any number of
//! `find_value_in` calls may run concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::needle::{Needle, NeedleSet};
use crate::search::{find_impl, SearchContext};
use crate::transform::{default_transformers, Transformer};
use crate::{DEFAULT_MAX_DECODE_LAYERS, DEFAULT_MAX_ENCODE_LAYERS};

/// Contract violations on the searcher API.
#[derive(Error, Debug)]
pub enum SearcherError {
    /// Values must be non-empty byte buffers.
    #[error("Empty value: a value must contain at least one byte")]
    EmptyValue,

    /// `find_value_in` requires at least one prior `add_value`.
    #[error("No values added: call add_value before find_value_in")]
    NoValuesAdded,
}

/// Configuration for adding a value.
#[derive(Debug, Clone)]
pub struct AddConfig {
    /// Maximum number of encoding layers applied to the value, including
    /// the outermost one. `0` admits only the raw value.
    pub max_encode_layers: u32,
    /// Encoders to apply; `None` uses the searcher's transformer list.
    pub encoders: Option<Vec<Arc<dyn Transformer>>>,
    /// When true, only encoded forms whose outermost layer is
    /// non-reversible become needles. Reversible outer layers are
    /// redundant: the search engine can peel them off the haystack
    /// itself.
    pub end_with_non_reversible_layer: bool,
    /// Whether to output verbose information.
    pub verbose: bool,
}

impl Default for AddConfig {
    fn default() -> Self {
        Self {
            max_encode_layers: DEFAULT_MAX_ENCODE_LAYERS,
            encoders: None,
            end_with_non_reversible_layer: true,
            verbose: false,
        }
    }
}

/// Configuration for searching a haystack.
#[derive(Debug, Clone)]
pub struct FindConfig {
    /// Maximum number of decoding layers applied to the haystack.
    pub max_decode_layers: u32,
    /// Decoders to apply; `None` uses the searcher's reversible
    /// transformers.
    pub decoders: Option<Vec<Arc<dyn Transformer>>>,
    /// Whether to output verbose information.
    pub verbose: bool,
}

impl Default for FindConfig {
    fn default() -> Self {
        Self {
            max_decode_layers: DEFAULT_MAX_DECODE_LAYERS,
            decoders: None,
            verbose: false,
        }
    }
}

/// The searcher: a set of secret values, their pre-computed needles, and
/// the transformer library used on both sides.
#[derive(Debug)]
pub struct Searcher {
    transformers: Vec<Arc<dyn Transformer>>,
    values: Vec<Vec<u8>>,
    value_fingerprints: HashSet<u32>,
    needles: NeedleSet,
}

impl Searcher {
    /// Creates an empty searcher with the default transformer list.
    pub fn new() -> Self {
        Self::with_transformers(default_transformers())
    }

    /// Creates an empty searcher with a custom transformer list. The list
    /// is fixed for the searcher's lifetime.
    pub fn with_transformers(transformers: Vec<Arc<dyn Transformer>>) -> Self {
        Self {
            transformers,
            values: Vec::new(),
            value_fingerprints: HashSet::new(),
            needles: NeedleSet::new(),
        }
    }

    /// Convenience constructor: a default searcher with every given value
    /// added under the default [`AddConfig`].
    pub fn from_values<I, V>(values: I) -> Result<Self, SearcherError>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let mut searcher = Self::new();
        for value in values {
            searcher.add_value(value.as_ref())?;
        }
        Ok(searcher)
    }

    /// Adds a secret value under the default configuration.
    pub fn add_value(&mut self, value: &[u8]) -> Result<(), SearcherError> {
        self.add_value_with_config(value, &AddConfig::default())
    }

    /// Adds a secret value, pre-computing its encoded needles.
    ///
    /// # Arguments
    /// * `value` - The secret bytes; must be non-empty
    /// * `config` - Encoding depth, encoder list and terminal-layer policy
    pub fn add_value_with_config(
        &mut self,
        value: &[u8],
        config: &AddConfig,
    ) -> Result<(), SearcherError> {
        if value.is_empty() {
            return Err(SearcherError::EmptyValue);
        }

        if self.value_fingerprints.insert(crc32fast::hash(value)) {
            self.values.push(value.to_vec());
        }

        let root = Needle::new(value.to_vec(), Vec::new());
        self.needles.insert(root.clone());

        if config.max_encode_layers > 0 {
            let encoders = match &config.encoders {
                Some(encoders) => encoders.clone(),
                None => self.transformers.clone(),
            };
            let mut seen_at_layer = HashMap::new();
            self.add_encodings(
                &encoders,
                config.end_with_non_reversible_layer,
                &root,
                config.max_encode_layers - 1,
                &mut seen_at_layer,
            );
        }

        if config.verbose {
            eprintln!(
                "Added value ({} bytes): {} needle(s) total, min needle length {}",
                value.len(),
                self.needles.len(),
                self.needles.min_length()
            );
        }
        Ok(())
    }

    /// Applies every encoder to `needle`, admitting each distinct encoded
    /// form once per recursion budget, and recurses while budget remains.
    fn add_encodings(
        &mut self,
        encoders: &[Arc<dyn Transformer>],
        end_with_non_reversible: bool,
        needle: &Needle,
        max_extra_layers: u32,
        seen_at_layer: &mut HashMap<u32, u32>,
    ) {
        let mut admitted: Vec<Needle> = Vec::new();

        for encoder in encoders {
            // Out of budget for anything on top: a reversible layer here
            // could never be the required non-reversible outermost one.
            if max_extra_layers == 0 && end_with_non_reversible && encoder.reversible() {
                continue;
            }
            let Some(candidates) = encoder.encodings(&needle.buffer) else {
                continue;
            };

            for buffer in candidates {
                let fingerprint = crc32fast::hash(&buffer);
                // A form seen before is only worth revisiting if we now
                // have strictly more budget to expand beneath it.
                match seen_at_layer.get(&fingerprint) {
                    Some(&explored) if explored >= max_extra_layers => continue,
                    _ => {}
                }
                seen_at_layer.insert(fingerprint, max_extra_layers);

                let mut chain = Vec::with_capacity(needle.chain.len() + 1);
                chain.push(encoder.id());
                chain.extend(needle.chain.iter().cloned());
                let child = Needle::new(buffer, chain);

                if !end_with_non_reversible || !encoder.reversible() {
                    self.needles.insert(child.clone());
                }
                admitted.push(child);
            }
        }

        if max_extra_layers > 0 {
            for child in &admitted {
                self.add_encodings(
                    encoders,
                    end_with_non_reversible,
                    child,
                    max_extra_layers - 1,
                    seen_at_layer,
                );
            }
        }
    }

    /// Searches a haystack under the default configuration.
    pub async fn find_value_in(
        &self,
        haystack: &[u8],
    ) -> Result<Option<Vec<String>>, SearcherError> {
        self.find_value_in_with_config(haystack, &FindConfig::default())
            .await
    }

    /// Searches a haystack for any added value through decoder layers.
    ///
    /// # Arguments
    /// * `haystack` - The buffer to inspect
    /// * `config` - Decoding depth and decoder list
    ///
    /// # Returns
    /// The decoder chain (outermost first) explaining the match, composed
    /// with the matched needle's encoder chain; `Some(vec![])` for a
    /// literal hit; `None` if nothing is found within the layer budget.
    pub async fn find_value_in_with_config(
        &self,
        haystack: &[u8],
        config: &FindConfig,
    ) -> Result<Option<Vec<String>>, SearcherError> {
        if self.needles.is_empty() {
            return Err(SearcherError::NoValuesAdded);
        }

        let decoders: Vec<Arc<dyn Transformer>> = match &config.decoders {
            Some(decoders) => decoders.clone(),
            None => self
                .transformers
                .iter()
                .filter(|transformer| transformer.reversible())
                .cloned()
                .collect(),
        };
        let min_len = self.min_encoded_length(&decoders);

        if config.verbose {
            eprintln!(
                "Searching {} bytes: {} needle(s), {} decoder(s), min encoded length {}",
                haystack.len(),
                self.needles.len(),
                decoders.len(),
                min_len
            );
        }

        let context = SearchContext {
            needles: self.needles.as_slice(),
            decoders: &decoders,
            min_len,
            seen_at_layer: Mutex::new(HashMap::new()),
            verbose: config.verbose,
        };
        Ok(find_impl(&context, haystack, config.max_decode_layers).await)
    }

    /// The heuristic lower bound handed to every decoder: no needle and no
    /// compressed form of a value can be shorter than this.
    fn min_encoded_length(&self, decoders: &[Arc<dyn Transformer>]) -> usize {
        let mut min_len = self.needles.min_length();
        for decoder in decoders {
            for value in &self.values {
                if let Some(compressed) = decoder.compressed_length(value) {
                    min_len = min_len.min(compressed);
                }
            }
        }
        min_len
    }

    /// The added values, in insertion order.
    pub fn values(&self) -> &[Vec<u8>] {
        &self.values
    }

    /// The pre-computed needles, in insertion order.
    pub fn needles(&self) -> &[Needle] {
        self.needles.as_slice()
    }

    /// The searcher's transformer list.
    pub fn transformers(&self) -> &[Arc<dyn Transformer>] {
        &self.transformers
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}
