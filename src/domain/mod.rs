// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that name the core concepts:
// utterance pairs, the frozen vocabulary, time-major batch
// grids and the contract the training loop drives a model
// through.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Tokenised and encoded prompt/response pairs
pub mod utterance;

// Frozen token <-> id mapping and the pad slot
pub mod vocabulary;

// Fixed-shape time-major id grid
pub mod batch;

// Core abstractions (traits) that other layers implement
pub mod traits;
