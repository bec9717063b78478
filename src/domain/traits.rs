// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the training pipeline and its collaborators:
//
//   PairSource    — anything that yields tokenised utterance pairs
//   Seq2SeqModel  — the encoder-decoder network plus its optimizer,
//                   driven one time step at a time
//   Prediction    — a per-step output distribution the loop can
//                   reduce to one token per example
//
// The training loop only ever talks to these traits, so it can be
// exercised with a scripted model and no GPU.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::ops::Add;
use std::path::Path;

use anyhow::Result;

use crate::domain::batch::TimeMajor;
use crate::domain::utterance::UtterancePair;
use crate::domain::vocabulary::Slot;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can produce tokenised (prompt, response) pairs.
///
/// Implementations:
///   - CorpusLoader → reads a tab-separated dialogue file
pub trait PairSource {
    fn load_pairs(&self) -> Result<Vec<UtterancePair>>;
}

// ─── Prediction ───────────────────────────────────────────────────────────────
/// Output of one decode step for a whole batch.
pub trait Prediction {
    /// Highest-scoring slot for each example in the batch.
    fn argmax(&self) -> Result<Vec<Slot>>;
}

// ─── Seq2SeqModel ─────────────────────────────────────────────────────────────
/// An encoder-decoder network and the optimizer that updates it.
///
/// Call order for one window of examples:
///
///   reset_state → encode → decode × steps → (apply_gradients)
///
/// `decode` is called once per time step with the previous token of
/// each example and the token it should produce; the loop decides what
/// "previous" means (ground truth or the model's own prediction).
pub trait Seq2SeqModel {
    /// A differentiable loss value; step losses are summed with `+`.
    type Loss: Clone + Add<Output = Self::Loss>;

    type Prediction: Prediction;

    /// Clear recurrent state before a new window.
    fn reset_state(&mut self);

    /// Run the encoder over a time-major prompt grid and keep the
    /// resulting context as the decoder's starting state.
    fn encode(&mut self, prompts: &TimeMajor) -> Result<()>;

    /// Advance the decoder by one step.
    fn decode(&mut self, previous: &[Slot], target: &[Slot])
        -> Result<(Self::Loss, Self::Prediction)>;

    /// Plain number for logging and metric history.
    fn loss_value(loss: &Self::Loss) -> f64;

    /// Backpropagate `loss` and take one optimizer step.
    fn apply_gradients(&mut self, loss: Self::Loss) -> Result<()>;

    /// Persist model parameters and optimizer state.
    fn save_checkpoint(&self, model_path: &Path, optimizer_path: &Path) -> Result<()>;
}
