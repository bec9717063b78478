// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Raw dialogue text all the way to padded time-major grids.
//
//   pair_corpus.txt
//       │
//       ▼
//   CorpusLoader       → matches prompt<TAB>response lines
//       │                 (Preprocessor filters scripts and
//       │                  tokenises + normalises words)
//       ▼
//   VocabularyBuilder  → frequency-pruned token ↔ id map
//       │
//       ▼
//   CorpusEncoder      → token lists to id lists, OOV → <unk>
//       │
//       ▼
//   BatchBuilder       → train/test split, reverse + pad + stack
//
// Each module is responsible for exactly one step.
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Reads tab-separated pairs from a dialogue file
pub mod loader;

/// Script filter, word splitting and normalisation
pub mod preprocessor;

/// Builds the pruned vocabulary
pub mod vocabulary;

/// Maps tokens to ids
pub mod encoder;

/// Random permutations and the test/train split
pub mod splitter;

/// Pads and stacks encoded sequences into grids
pub mod batcher;
