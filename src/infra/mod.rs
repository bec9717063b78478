// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem:
//
//   corpus_store.rs — vocabulary + encoded corpus as three JSON
//                     artifacts; a missing artifact is reported
//                     as its own error so the caller can rebuild
//
//   checkpoint.rs   — per-epoch snapshot paths, the latest-epoch
//                     pointer and the config snapshot
//
//   metrics.rs      — per-epoch CSV rows and the final metric
//                     history JSON files
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Vocabulary and encoded corpus persistence
pub mod corpus_store;

/// Model checkpoint paths and config snapshot
pub mod checkpoint;

/// Training metrics CSV and history
pub mod metrics;
