// ============================================================
// Layer 6 — Corpus Store
// ============================================================
// Persists the vocabulary and the encoded corpus so later runs
// can skip tokenisation and vocabulary construction.
//
// Directory layout (three independent JSON artifacts):
//   corpus/
//     vocabulary.json   ← token list, position = id
//     prompts.json      ← [[id, ...], ...]
//     responses.json    ← [[id, ...], ...]
//
// Loading needs all three. If any is missing the load fails
// with MissingArtifact and nothing is repaired; the caller
// rebuilds from the raw dialogue file instead. Loaded data is
// trusted as-is, with no re-filtering or batch re-alignment.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io,
    path::PathBuf,
};
use thiserror::Error;

use crate::domain::utterance::{EncodedCorpus, TokenId};
use crate::domain::vocabulary::Vocabulary;

pub const VOCABULARY_FILE: &str = "vocabulary.json";
pub const PROMPTS_FILE:    &str = "prompts.json";
pub const RESPONSES_FILE:  &str = "responses.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("missing corpus artifact '{}'", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("cannot access '{}': {source}", .path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed corpus artifact '{}': {source}", .path.display())]
    Json {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored prompts ({prompts}) and responses ({responses}) differ in length")]
    Misaligned { prompts: usize, responses: usize },
}

/// Vocabulary plus encoded pairs, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCorpus {
    pub vocabulary: Vocabulary,
    pub corpus:     EncodedCorpus,
}

pub struct CorpusStore {
    dir: PathBuf,
}

impl CorpusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write all three artifacts, creating the directory if needed.
    pub fn save(&self, vocabulary: &Vocabulary, corpus: &EncodedCorpus) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        self.write_json(VOCABULARY_FILE, vocabulary)?;
        self.write_json(PROMPTS_FILE, corpus.prompts())?;
        self.write_json(RESPONSES_FILE, corpus.responses())?;

        tracing::info!("Saved {} encoded pairs to '{}'", corpus.len(), self.dir.display());
        Ok(())
    }

    /// Restore vocabulary and corpus. Fails with `MissingArtifact`
    /// before reading anything if one of the files is absent.
    pub fn load(&self) -> Result<StoredCorpus, StoreError> {
        for name in [VOCABULARY_FILE, PROMPTS_FILE, RESPONSES_FILE] {
            let path = self.dir.join(name);
            if !path.is_file() {
                return Err(StoreError::MissingArtifact { path });
            }
        }

        let vocabulary: Vocabulary        = self.read_json(VOCABULARY_FILE)?;
        let prompts:    Vec<Vec<TokenId>> = self.read_json(PROMPTS_FILE)?;
        let responses:  Vec<Vec<TokenId>> = self.read_json(RESPONSES_FILE)?;

        let (p, r) = (prompts.len(), responses.len());
        let corpus = EncodedCorpus::new(prompts, responses)
            .ok_or(StoreError::Misaligned { prompts: p, responses: r })?;

        tracing::info!("{} pairs loaded from '{}'", corpus.len(), self.dir.display());
        Ok(StoredCorpus { vocabulary, corpus })
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let json = serde_json::to_string(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StoreError::Io { path, source })
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.dir.join(name);
        let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StoreError::Json { path, source })
    }
}
