// ============================================================
// Layer 3 — Vocabulary Domain Type
// ============================================================
// The frozen bidirectional mapping between word tokens and ids.
//
// Layout of the id space:
//   0 .. n-1   pruned corpus tokens
//   n          <start>
//   n+1        <eos>
//   n+2        <unk>
//   (none)     <pad>  — never a real slot; see `Slot::Pad`
//
// Once built the vocabulary is immutable: only read accessors
// are exposed. A new run that needs a different vocabulary
// builds a new value.
//
// Reference: Rust Book §8 (Hash Maps), §6 (Enums)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::utterance::TokenId;

pub const START_TOKEN: &str = "<start>";
pub const EOS_TOKEN:   &str = "<eos>";
pub const UNK_TOKEN:   &str = "<unk>";
pub const PAD_TOKEN:   &str = "<pad>";

/// Wire value of the pad slot in persisted and displayed id grids.
pub const PAD_RAW_ID: i64 = -1;

// ─── Slot ─────────────────────────────────────────────────────────────────────
/// One cell of a batch grid: either a real vocabulary id or padding.
///
/// Padding is its own variant instead of a magic `-1`, so it can never
/// be confused with a lookup miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Token(TokenId),
    Pad,
}

impl Slot {
    /// Integer form, with padding mapped to `PAD_RAW_ID`.
    pub fn raw(self) -> i64 {
        match self {
            Slot::Token(id) => id as i64,
            Slot::Pad => PAD_RAW_ID,
        }
    }

    pub fn is_pad(self) -> bool {
        matches!(self, Slot::Pad)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("vocabulary is missing control symbol '{0}'")]
    MissingControl(&'static str),

    #[error("token '{0}' appears more than once")]
    DuplicateToken(String),

    #[error("'<pad>' cannot occupy a real id")]
    PadHasId,
}

// ─── Vocabulary ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyFile", into = "VocabularyFile")]
pub struct Vocabulary {
    tokens: Vec<String>,
    index:  HashMap<String, TokenId>,
    start:  TokenId,
    eos:    TokenId,
    unk:    TokenId,
}

impl Vocabulary {
    /// Freeze a token list whose position is the id.
    /// The list must contain the three id-bearing control symbols
    /// and must not contain `<pad>`.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self, VocabularyError> {
        let mut index = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            if token == PAD_TOKEN {
                return Err(VocabularyError::PadHasId);
            }
            if index.insert(token.clone(), id as TokenId).is_some() {
                return Err(VocabularyError::DuplicateToken(token.clone()));
            }
        }

        let control = |name: &'static str| {
            index.get(name).copied().ok_or(VocabularyError::MissingControl(name))
        };
        let start = control(START_TOKEN)?;
        let eos   = control(EOS_TOKEN)?;
        let unk   = control(UNK_TOKEN)?;

        Ok(Self { tokens, index, start, eos, unk })
    }

    /// Look a token up. `<pad>` resolves to `Slot::Pad`.
    pub fn token_to_id(&self, token: &str) -> Option<Slot> {
        if token == PAD_TOKEN {
            return Some(Slot::Pad);
        }
        self.index.get(token).copied().map(Slot::Token)
    }

    pub fn id_to_token(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Integer id as persisted/displayed; `<pad>` gives `PAD_RAW_ID`.
    pub fn raw_id(&self, token: &str) -> Option<i64> {
        self.token_to_id(token).map(Slot::raw)
    }

    /// Id for `token`, falling back to `<unk>` for anything unknown.
    pub fn id_or_unk(&self, token: &str) -> TokenId {
        self.index.get(token).copied().unwrap_or(self.unk)
    }

    pub fn start_id(&self) -> TokenId { self.start }
    pub fn eos_id(&self)   -> TokenId { self.eos }
    pub fn unk_id(&self)   -> TokenId { self.unk }

    /// Number of real ids (control symbols included, `<pad>` excluded).
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

// On disk only the ordered token list is kept; the index is rebuilt.
#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    tokens: Vec<String>,
}

impl TryFrom<VocabularyFile> for Vocabulary {
    type Error = VocabularyError;

    fn try_from(file: VocabularyFile) -> Result<Self, Self::Error> {
        Vocabulary::from_tokens(file.tokens)
    }
}

impl From<Vocabulary> for VocabularyFile {
    fn from(vocab: Vocabulary) -> Self {
        VocabularyFile { tokens: vocab.tokens }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vocabulary {
        let tokens = ["hi", "friend", START_TOKEN, EOS_TOKEN, UNK_TOKEN]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Vocabulary::from_tokens(tokens).unwrap()
    }

    #[test]
    fn test_control_ids_and_pad() {
        let v = sample();
        assert_eq!(v.raw_id(START_TOKEN), Some(2));
        assert_eq!(v.raw_id(EOS_TOKEN), Some(3));
        assert_eq!(v.raw_id(UNK_TOKEN), Some(4));
        assert_eq!(v.raw_id(PAD_TOKEN), Some(-1));
        assert_eq!(v.token_to_id(PAD_TOKEN), Some(Slot::Pad));
    }

    #[test]
    fn test_unknown_token_falls_back_to_unk() {
        let v = sample();
        assert_eq!(v.token_to_id("stranger"), None);
        assert_eq!(v.id_or_unk("stranger"), v.unk_id());
        assert_eq!(v.id_or_unk("friend"), 1);
    }

    #[test]
    fn test_id_to_token() {
        let v = sample();
        assert_eq!(v.id_to_token(0), Some("hi"));
        assert_eq!(v.id_to_token(99), None);
    }

    #[test]
    fn test_missing_control_symbol_is_rejected() {
        let err = Vocabulary::from_tokens(vec!["a".into(), START_TOKEN.into()]).unwrap_err();
        assert_eq!(err, VocabularyError::MissingControl(EOS_TOKEN));
    }

    #[test]
    fn test_pad_cannot_take_an_id() {
        let tokens = vec![
            PAD_TOKEN.to_string(), START_TOKEN.into(), EOS_TOKEN.into(), UNK_TOKEN.into(),
        ];
        assert_eq!(Vocabulary::from_tokens(tokens).unwrap_err(), VocabularyError::PadHasId);
    }

    #[test]
    fn test_json_keeps_only_token_list() {
        let v    = sample();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"tokens":["hi","friend","<start>","<eos>","<unk>"]}"#);
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_slot_raw_values() {
        assert_eq!(Slot::Token(7).raw(), 7);
        assert_eq!(Slot::Pad.raw(), PAD_RAW_ID);
        assert!(Slot::Pad.is_pad());
    }
}
