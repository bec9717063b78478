// ============================================================
// Layer 4 — Batch Builder
// ============================================================
// Turns the encoded corpus into padded, time-major grids for
// one train and one test partition.
//
// Per partition:
//   prompt   [w1 w2 w3]  → reverse, prefix <eos>, LEFT-pad
//            [pad pad <eos> w3 w2 w1]
//   response [v1 v2]     → suffix <eos>, RIGHT-pad
//            [v1 v2 <eos> pad pad]
//
// Each partition pads to its own longest prompt/response, so
// the test grid does not inherit the train grid's length.
//
// Reading the prompt backwards puts its first words closest to
// the decoder, and left padding lines every prompt's last token
// up on the same final encoder step.
//
// Reference: Sutskever et al. (2014) Sequence to Sequence Learning

use anyhow::{Context, Result};
use rand::Rng;

use crate::data::splitter::split_train_test;
use crate::domain::batch::TimeMajor;
use crate::domain::utterance::{EncodedCorpus, TokenId};
use crate::domain::vocabulary::Slot;

/// Prompt and response grids for one set of examples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub prompts:   TimeMajor,
    pub responses: TimeMajor,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.prompts.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Response sequences with padding removed, one per example.
    pub fn references(&self) -> Vec<Vec<Slot>> {
        self.responses
            .columns()
            .map(|col| col.into_iter().filter(|s| !s.is_pad()).collect())
            .collect()
    }
}

/// The fixed train/test split of one run.
#[derive(Debug, Clone)]
pub struct SplitCorpus {
    pub train: Partition,
    pub test:  Partition,
}

pub struct BatchBuilder {
    eos: TokenId,
}

impl BatchBuilder {
    pub fn new(eos: TokenId) -> Self {
        Self { eos }
    }

    /// `[pad.., <eos>, reversed prompt]`, `len` long.
    pub fn prompt_column(&self, prompt: &[TokenId], len: usize) -> Vec<Slot> {
        let body    = prompt.len() + 1;
        let mut col = vec![Slot::Pad; len.saturating_sub(body)];
        col.push(Slot::Token(self.eos));
        col.extend(prompt.iter().rev().map(|&id| Slot::Token(id)));
        col
    }

    /// `[response, <eos>, pad..]`, `len` long.
    pub fn response_column(&self, response: &[TokenId], len: usize) -> Vec<Slot> {
        let mut col: Vec<Slot> = response.iter().map(|&id| Slot::Token(id)).collect();
        col.push(Slot::Token(self.eos));
        col.resize(len.max(col.len()), Slot::Pad);
        col
    }

    /// Pad and stack the examples at `indices`, in that order.
    pub fn build_partition(&self, corpus: &EncodedCorpus, indices: &[usize]) -> Result<Partition> {
        let prompts   = corpus.prompts();
        let responses = corpus.responses();

        let max_prompt   = indices.iter().map(|&i| prompts[i].len() + 1).max().unwrap_or(0);
        let max_response = indices.iter().map(|&i| responses[i].len() + 1).max().unwrap_or(0);

        let prompt_cols: Vec<Vec<Slot>> = indices
            .iter()
            .map(|&i| self.prompt_column(&prompts[i], max_prompt))
            .collect();
        let response_cols: Vec<Vec<Slot>> = indices
            .iter()
            .map(|&i| self.response_column(&responses[i], max_response))
            .collect();

        Ok(Partition {
            prompts:   TimeMajor::from_columns(&prompt_cols).context("Ragged prompt columns")?,
            responses: TimeMajor::from_columns(&response_cols).context("Ragged response columns")?,
        })
    }

    /// Draw the random test/train split and build both partitions.
    pub fn split<R: Rng + ?Sized>(
        &self,
        corpus:    &EncodedCorpus,
        test_size: usize,
        rng:       &mut R,
    ) -> Result<SplitCorpus> {
        let (test_idx, train_idx) = split_train_test(corpus.len(), test_size, rng);
        let split = SplitCorpus {
            train: self.build_partition(corpus, &train_idx)?,
            test:  self.build_partition(corpus, &test_idx)?,
        };
        tracing::info!(
            "Batches ready: train {} examples ({}x{} / {}x{}), test {} examples",
            split.train.len(),
            split.train.prompts.steps(),
            split.train.len(),
            split.train.responses.steps(),
            split.train.len(),
            split.test.len(),
        );
        Ok(split)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EOS: TokenId = 3;

    fn corpus() -> EncodedCorpus {
        EncodedCorpus::new(
            vec![vec![10, 11, 12], vec![20], vec![30, 31]],
            vec![vec![40], vec![50, 51, 52], vec![60, 61]],
        )
        .unwrap()
    }

    fn t(id: TokenId) -> Slot {
        Slot::Token(id)
    }

    #[test]
    fn test_prompt_is_reversed_prefixed_and_left_padded() {
        let b = BatchBuilder::new(EOS);
        assert_eq!(b.prompt_column(&[1, 2], 5), vec![Slot::Pad, Slot::Pad, t(EOS), t(2), t(1)]);
    }

    #[test]
    fn test_response_is_suffixed_and_right_padded() {
        let b = BatchBuilder::new(EOS);
        assert_eq!(b.response_column(&[0, 1], 3), vec![t(0), t(1), t(EOS)]);
        assert_eq!(b.response_column(&[0], 4), vec![t(0), t(EOS), Slot::Pad, Slot::Pad]);
    }

    #[test]
    fn test_partition_shapes_use_partition_maxima() {
        let b = BatchBuilder::new(EOS);
        let p = b.build_partition(&corpus(), &[1, 2]).unwrap();
        // prompts: [20] and [30,31] → max 2 + eos
        assert_eq!(p.prompts.steps(), 3);
        // responses: [50,51,52] and [60,61] → max 3 + eos
        assert_eq!(p.responses.steps(), 4);
        assert_eq!(p.prompts.column(0), vec![Slot::Pad, t(EOS), t(20)]);
        assert_eq!(p.responses.column(1), vec![t(60), t(61), t(EOS), Slot::Pad]);
    }

    #[test]
    fn test_pad_appears_only_in_padding_positions() {
        let b      = BatchBuilder::new(EOS);
        let corpus = corpus();
        let p      = b.build_partition(&corpus, &[0, 1, 2]).unwrap();

        for (i, col) in p.prompts.columns().enumerate() {
            let real = corpus.prompts()[i].len() + 1;
            let pads = col.len() - real;
            assert!(col[..pads].iter().all(|s| s.is_pad()));
            assert!(col[pads..].iter().all(|s| !s.is_pad()));
        }
        for (i, col) in p.responses.columns().enumerate() {
            let real = corpus.responses()[i].len() + 1;
            assert!(col[..real].iter().all(|s| !s.is_pad()));
            assert!(col[real..].iter().all(|s| s.is_pad()));
        }
    }

    #[test]
    fn test_references_strip_padding() {
        let b = BatchBuilder::new(EOS);
        let p = b.build_partition(&corpus(), &[0, 1]).unwrap();
        assert_eq!(p.references(), vec![vec![t(40), t(EOS)], vec![t(50), t(51), t(52), t(EOS)]]);
    }

    #[test]
    fn test_split_sizes() {
        let b     = BatchBuilder::new(EOS);
        let split = b.split(&corpus(), 1, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.train.len(), 2);
        assert_eq!(split.test.references().len(), 1);
    }
}
