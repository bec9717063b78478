// ============================================================
// Layer 3 — Utterance Domain Types
// ============================================================
// A conversation corpus is a list of (prompt, response) pairs.
// Two shapes exist during a run:
//
//   UtterancePair  — word tokens straight out of the tokenizer
//   EncodedCorpus  — the same pairs as vocabulary ids, stored
//                    as two index-aligned lists
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

/// Numeric id of a real vocabulary entry.
pub type TokenId = u32;

/// One tokenised prompt and the response that followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtterancePair {
    pub prompt:   Vec<String>,
    pub response: Vec<String>,
}

impl UtterancePair {
    pub fn new(prompt: Vec<String>, response: Vec<String>) -> Self {
        Self { prompt, response }
    }

    /// True when neither side is longer than `max_len` tokens.
    pub fn fits(&self, max_len: usize) -> bool {
        self.prompt.len() <= max_len && self.response.len() <= max_len
    }
}

/// Prompts and responses as id sequences.
///
/// Pair `i` is `(prompts[i], responses[i])`; both lists always
/// have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedCorpus {
    prompts:   Vec<Vec<TokenId>>,
    responses: Vec<Vec<TokenId>>,
}

impl EncodedCorpus {
    /// Build from two aligned lists. Returns `None` when the lengths differ.
    pub fn new(prompts: Vec<Vec<TokenId>>, responses: Vec<Vec<TokenId>>) -> Option<Self> {
        (prompts.len() == responses.len()).then_some(Self { prompts, responses })
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn prompts(&self) -> &[Vec<TokenId>] {
        &self.prompts
    }

    pub fn responses(&self) -> &[Vec<TokenId>] {
        &self.responses
    }
}

/// Collecting `(prompt, response)` id pairs keeps both lists aligned.
impl FromIterator<(Vec<TokenId>, Vec<TokenId>)> for EncodedCorpus {
    fn from_iter<I: IntoIterator<Item = (Vec<TokenId>, Vec<TokenId>)>>(pairs: I) -> Self {
        let (prompts, responses) = pairs.into_iter().unzip();
        Self { prompts, responses }
    }
}
