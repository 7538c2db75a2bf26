use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::ModelError;

/// Index reserved for padding positions.
pub const PAD_INDEX: u32 = 0;

#[derive(Debug, Deserialize)]
struct TokenizerFile {
    word_index: HashMap<String, u32>,
    #[serde(default)]
    num_words: Option<usize>,
    #[serde(default)]
    oov_token: Option<String>,
}

/// Word-level tokenizer built from a fitted word index.
///
/// Only indices below `num_words` are emitted; anything else is out of
/// vocabulary and becomes the OOV index when one is configured.
#[derive(Debug, Clone)]
pub struct WordTokenizer {
    word_index: HashMap<String, u32>,
    num_words: Option<usize>,
    oov_index: Option<u32>,
}

impl WordTokenizer {
    pub fn new(
        word_index: HashMap<String, u32>,
        num_words: Option<usize>,
        oov_token: Option<&str>,
    ) -> Result<Self, ModelError> {
        if word_index.values().any(|&idx| idx == PAD_INDEX) {
            return Err(ModelError::Invalid(
                "word index must not use the padding index 0".into(),
            ));
        }

        let oov_index = match oov_token {
            Some(token) => Some(*word_index.get(token).ok_or_else(|| {
                ModelError::Invalid(format!("oov token {token:?} missing from word index"))
            })?),
            None => None,
        };

        Ok(Self {
            word_index,
            num_words,
            oov_index,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        let file: TokenizerFile = serde_json::from_str(&raw)?;
        Self::new(file.word_index, file.num_words, file.oov_token.as_deref())
    }

    pub fn vocab_limit(&self) -> Option<usize> {
        self.num_words
    }

    /// Tightens the vocabulary limit so no index can exceed `limit - 1`.
    pub(crate) fn clamp_vocab(&mut self, limit: usize) -> Result<(), ModelError> {
        if let Some(oov) = self.oov_index {
            if oov as usize >= limit {
                return Err(ModelError::Invalid(format!(
                    "oov index {oov} does not fit an embedding of {limit} rows"
                )));
            }
        }
        self.num_words = Some(self.num_words.map_or(limit, |n| n.min(limit)));
        Ok(())
    }

    fn lookup(&self, word: &str) -> Option<u32> {
        let in_vocab = self
            .word_index
            .get(word)
            .copied()
            .filter(|&idx| self.num_words.is_none_or(|limit| (idx as usize) < limit));
        in_vocab.or(self.oov_index)
    }

    /// Maps a cleaned string to its index sequence, without padding.
    pub fn texts_to_sequence(&self, cleaned: &str) -> Vec<u32> {
        cleaned
            .split_whitespace()
            .filter_map(|word| self.lookup(word))
            .collect()
    }

    /// Index sequence of exactly `max_len` entries: cut at the end, padded on the right.
    pub fn encode(&self, cleaned: &str, max_len: usize) -> Vec<u32> {
        pad_sequence(self.texts_to_sequence(cleaned), max_len)
    }
}

pub fn pad_sequence(mut seq: Vec<u32>, max_len: usize) -> Vec<u32> {
    seq.truncate(max_len);
    seq.resize(max_len, PAD_INDEX);
    seq
}
