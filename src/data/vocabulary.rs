// ============================================================
// Layer 4 — Vocabulary Builder
// ============================================================
// Builds the frozen Vocabulary from every tokenised prompt and
// response (pooled; each utterance counts as one document).
//
// Id assignment while scanning:
//   tokens new to the dictionary get the next ids, in
//   lexicographic order within their document
//
// Pruning (document-frequency based):
//   keep   df >= no_below
//   keep   df <= no_above * number_of_documents
//   keep   only the keep_n most frequent (ties keep scan order)
//   then   compact ids, preserving the scan order
//
// Control symbols are appended after pruning:
//   <start>, <eos>, <unk>   → next sequential ids
//   <pad>                   → no id at all (Slot::Pad)
//
// Every step is deterministic for the same input order.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;

use crate::domain::utterance::UtterancePair;
use crate::domain::vocabulary::{Vocabulary, EOS_TOKEN, START_TOKEN, UNK_TOKEN};

#[derive(Debug, Clone)]
pub struct VocabularyBuilder {
    no_below: usize,
    no_above: f64,
    keep_n:   usize,
}

impl VocabularyBuilder {
    pub fn new(no_below: usize, no_above: f64, keep_n: usize) -> Self {
        Self { no_below, no_above, keep_n }
    }

    /// Defaults: present in ≥1 document, in ≤100% of documents,
    /// capped at `keep_n` tokens.
    pub fn with_cap(keep_n: usize) -> Self {
        Self::new(1, 1.0, keep_n)
    }

    pub fn build(&self, pairs: &[UtterancePair]) -> Result<Vocabulary> {
        let documents = pairs
            .iter()
            .map(|p| p.prompt.as_slice())
            .chain(pairs.iter().map(|p| p.response.as_slice()));
        self.build_from_documents(documents)
    }

    pub fn build_from_documents<'a, I>(&self, documents: I) -> Result<Vocabulary>
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        // ── Scan: first-appearance ids and document frequencies ──────────────
        let mut scan_order: Vec<&'a str>          = Vec::new();
        let mut ids:        HashMap<&'a str, usize> = HashMap::new();
        let mut dfs:        Vec<usize>            = Vec::new();
        let mut num_docs = 0usize;

        for doc in documents {
            num_docs += 1;
            let unique: BTreeSet<&'a str> = doc.iter().map(String::as_str).collect();
            for token in unique {
                let id = *ids.entry(token).or_insert_with(|| {
                    scan_order.push(token);
                    dfs.push(0);
                    scan_order.len() - 1
                });
                dfs[id] += 1;
            }
        }

        // ── Prune ─────────────────────────────────────────────────────────────
        let max_df = self.no_above * num_docs as f64;
        let mut kept: Vec<usize> = (0..scan_order.len())
            .filter(|&id| dfs[id] >= self.no_below && dfs[id] as f64 <= max_df)
            .collect();
        // sort_by is stable, so equal frequencies keep scan order
        kept.sort_by(|&a, &b| dfs[b].cmp(&dfs[a]));
        kept.truncate(self.keep_n);
        kept.sort_unstable();

        tracing::debug!(
            "Vocabulary pruning: {} distinct tokens over {} documents, {} kept",
            scan_order.len(),
            num_docs,
            kept.len(),
        );

        // ── Compact and append control symbols ───────────────────────────────
        let mut tokens: Vec<String> = kept.into_iter().map(|id| scan_order[id].to_string()).collect();
        for control in [START_TOKEN, EOS_TOKEN, UNK_TOKEN] {
            tokens.push(control.to_string());
        }

        let vocab = Vocabulary::from_tokens(tokens)?;
        tracing::info!("Vocabulary size (number of words): {}", vocab.len());
        Ok(vocab)
    }
}

impl Default for VocabularyBuilder {
    fn default() -> Self {
        Self::with_cap(10_000)
    }
}
