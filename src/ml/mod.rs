// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// All Burn framework code lives in model.rs. The training loop
// only talks to the Seq2SeqModel trait, so it runs with a
// scripted model in tests.
//
//   model.rs    — embedding + LSTM encoder, embedding + LSTM
//                 decoder, linear output over vocab + pad,
//                 Adam with gradient-norm clipping
//
//   trainer.rs  — epoch loop: teacher-forced training,
//                 free-running evaluation, checkpoints and
//                 early stopping
//
//   scoring.rs  — corpus BLEU and word error rate
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning

/// Burn encoder-decoder network and optimiser
pub mod model;

/// Training loop with evaluation and checkpointing
pub mod trainer;

/// BLEU and WER over token sequences
pub mod scoring;
