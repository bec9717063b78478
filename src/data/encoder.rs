// ============================================================
// Layer 4 — Corpus Encoder
// ============================================================
// Maps every word of every pair through the frozen vocabulary.
// Words the vocabulary doesn't know (pruned or never seen)
// become <unk>. Pure function: no state, no side effects.

use crate::domain::utterance::{EncodedCorpus, TokenId, UtterancePair};
use crate::domain::vocabulary::Vocabulary;

pub struct CorpusEncoder<'v> {
    vocab: &'v Vocabulary,
}

impl<'v> CorpusEncoder<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }

    pub fn encode_tokens(&self, tokens: &[String]) -> Vec<TokenId> {
        tokens.iter().map(|t| self.vocab.id_or_unk(t)).collect()
    }

    pub fn encode(&self, pairs: &[UtterancePair]) -> EncodedCorpus {
        pairs
            .iter()
            .map(|p| (self.encode_tokens(&p.prompt), self.encode_tokens(&p.response)))
            .collect()
    }
}
