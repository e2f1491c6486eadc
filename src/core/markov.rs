/// Second-order Markov chain: ingestion, generation, and serialization.
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::sanitize::sanitize;
use crate::core::tokenize::{make_key, split_sentences, split_tokens};
use crate::schema::corpus::{CorpusItem, Weight};

#[derive(Debug, Error)]
pub enum MarkovError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Fewest raw tokens a sentence needs to yield one key and one successor.
const MIN_SENTENCE_TOKENS: usize = 3;

/// Successors recorded for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEntry {
    /// First raw token seen for this key. Never overwritten.
    pub original: String,
    /// Raw successor tokens in observation order. Repeats encode frequency.
    #[serde(alias = "list")]
    pub successors: Vec<String>,
}

/// Key → entry mapping. Keys are two cleaned tokens joined by one space.
pub type TransitionTable = FxHashMap<String, TransitionEntry>;

/// A 2-gram word chain learned from chat messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkovChain {
    table: TransitionTable,
}

impl MarkovChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: TransitionTable) -> Self {
        Self { table }
    }

    /// Replace the whole table with one learned from `items`.
    pub fn ingest_bulk<I>(&mut self, items: I)
    where
        I: IntoIterator,
        I::Item: Into<CorpusItem>,
    {
        let mut fresh = MarkovChain::new();
        let mut count = 0usize;
        for item in items {
            let item = item.into();
            fresh.learn_weighted(item.text(), item.weight());
            count += 1;
        }
        tracing::debug!(items = count, keys = fresh.key_count(), "rebuilt transition table");
        *self = fresh;
    }

    /// Merge one message into the table, learning it `weight` times.
    ///
    /// Non-positive weights are treated as 1.
    pub fn ingest_one(&mut self, text: &str, weight: i64) {
        self.learn_weighted(text, Weight::new(weight));
    }

    fn learn_weighted(&mut self, text: &str, weight: Weight) {
        for _ in 0..weight.get() {
            self.learn_text(text);
        }
    }

    fn learn_text(&mut self, text: &str) {
        for sentence in split_sentences(text) {
            self.learn_sentence(sentence);
        }
    }

    fn learn_sentence(&mut self, sentence: &str) {
        let raw = split_tokens(sentence);
        if raw.len() < MIN_SENTENCE_TOKENS {
            return;
        }

        for window in raw.windows(MIN_SENTENCE_TOKENS) {
            let Some(key) = make_key(window[0], window[1]) else {
                continue;
            };
            let entry = self.table.entry(key).or_insert_with(|| TransitionEntry {
                original: window[0].to_string(),
                successors: Vec::new(),
            });
            entry.successors.push(window[2].to_string());
        }
    }

    /// Generate up to `max_tokens` words starting from a random key.
    ///
    /// Returns an empty string when the table is empty or `max_tokens < 2`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, max_tokens: usize) -> String {
        let Some(seed_key) = self.table.keys().choose(rng) else {
            return String::new();
        };
        self.walk(rng, seed_key, max_tokens)
    }

    /// Generate up to `max_tokens` words starting from `seed_key`.
    ///
    /// An unknown or malformed seed key yields an empty string.
    pub fn generate_from<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        seed_key: &str,
        max_tokens: usize,
    ) -> String {
        if !self.table.contains_key(seed_key) {
            return String::new();
        }
        self.walk(rng, seed_key, max_tokens)
    }

    fn walk<R: Rng + ?Sized>(&self, rng: &mut R, seed_key: &str, max_tokens: usize) -> String {
        if max_tokens < 2 {
            return String::new();
        }
        let Some((first, second)) = seed_key.split_once(' ') else {
            return String::new();
        };
        if first.is_empty() || second.is_empty() || second.contains(' ') {
            return String::new();
        }

        let mut generated: Vec<&str> = vec![first, second];
        for _ in 0..max_tokens - 2 {
            let state = format!("{} {}", generated[generated.len() - 2], generated[generated.len() - 1]);
            let next = match self.table.get(&state).and_then(|e| e.successors.choose(rng)) {
                Some(next) => next,
                None => break,
            };
            generated.push(next);
        }

        tracing::debug!(seed = seed_key, tokens = generated.len(), "walked chain");
        sanitize(&generated.join(" "))
    }

    pub fn key_count(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TransitionEntry> {
        self.table.get(key)
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn into_table(self) -> TransitionTable {
        self.table
    }

    /// Discard every entry.
    pub fn clear(&mut self) {
        self.table.clear();
    }
}

/// Save a MarkovChain to a RON file.
pub fn save_model(chain: &MarkovChain, path: &std::path::Path) -> Result<(), MarkovError> {
    let serialized = ron::ser::to_string_pretty(chain, ron::ser::PrettyConfig::default())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    std::fs::write(path, serialized)?;
    Ok(())
}

/// Load a MarkovChain from a RON file.
pub fn load_model(path: &std::path::Path) -> Result<MarkovChain, MarkovError> {
    let contents = std::fs::read_to_string(path)?;
    let chain: MarkovChain = ron::from_str(&contents)?;
    Ok(chain)
}
