// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Turns one raw utterance into normalised word tokens, and
// decides whether an utterance is in a script we train on.
//
// Steps for a field that passes the script filter:
//   1. Split into words and punctuation (BERT pre-tokenizer)
//   2. Lowercase each word
//   3. Unicode NFKC normalisation (full-width → ASCII etc.)
//
// Script filter:
//   Any character from an excluded script rejects the whole
//   field. The default exclusion list is Han, Hiragana and
//   Katakana. Control characters are always rejected.
//
// Reference: tokenizers crate (pre_tokenizers, NormalizedString)
//            Unicode Standard Annex #15 (Normalization Forms)

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::{NormalizedString, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

/// Unicode scripts that can be excluded from the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Han,
    Hiragana,
    Katakana,
}

impl Script {
    fn ranges(self) -> &'static [(u32, u32)] {
        match self {
            // CJK Unified Ideographs and extensions A–I
            Script::Han => &[
                (0x3400, 0x4DBF),
                (0x4E00, 0x9FFF),
                (0x20000, 0x2A6DF),
                (0x2A700, 0x2EBEF),
                (0x30000, 0x323AF),
            ],
            Script::Hiragana => &[
                (0x3040, 0x309F),
                (0x1B001, 0x1B11F),
                (0x1B150, 0x1B152),
            ],
            Script::Katakana => &[
                (0x30A0, 0x30FF),
                (0x31F0, 0x31FF),
                (0x32D0, 0x32FE),
                (0xFF66, 0xFF9F),
                (0x1AFF0, 0x1B000),
                (0x1B164, 0x1B167),
            ],
        }
    }

    pub fn contains(self, ch: char) -> bool {
        let cp = ch as u32;
        self.ranges().iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
    }
}

pub const DEFAULT_EXCLUDED_SCRIPTS: [Script; 3] = [Script::Han, Script::Hiragana, Script::Katakana];

pub struct Preprocessor {
    excluded: Vec<Script>,
    splitter: BertPreTokenizer,
}

impl Preprocessor {
    /// Preprocessor with the default exclusion list
    pub fn new() -> Self {
        Self::with_excluded_scripts(DEFAULT_EXCLUDED_SCRIPTS.to_vec())
    }

    pub fn with_excluded_scripts(excluded: Vec<Script>) -> Self {
        Self { excluded, splitter: BertPreTokenizer }
    }

    /// True when no character of `text` is a control character or
    /// belongs to an excluded script.
    pub fn is_target_script(&self, text: &str) -> bool {
        text.chars().all(|ch| {
            !ch.is_control() && !self.excluded.iter().any(|s| s.contains(ch))
        })
    }

    /// Split `text` into lowercased, NFKC-normalised word tokens.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let mut pretokenized = PreTokenizedString::from(text);
        self.splitter
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| anyhow!("Pre-tokenisation failed for '{text}': {e}"))?;

        let words = pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Char)
            .into_iter()
            .map(|(word, _, _)| normalize_word(word))
            .filter(|w| !w.is_empty())
            .collect();
        Ok(words)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_word(word: &str) -> String {
    let mut normalized = NormalizedString::from(word);
    normalized.lowercase().nfkc();
    normalized.get().to_string()
}
