// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Decides where per-epoch snapshots live and records which
// epoch was written last. The model itself serialises its
// parameters and optimizer state (see Seq2SeqModel).
//
// File naming convention:
//   data/
//     model_epoch_0.mpk.gz   ← weights after epoch 0
//     optim_epoch_0.mpk.gz   ← optimizer state after epoch 0
//     ...
//     latest_epoch.json      ← index of the newest snapshot
//     train_config.json      ← hyperparameters of the run
//
// A snapshot is written after every epoch.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::domain::traits::Seq2SeqModel;

pub const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
pub const CONFIG_FILE:       &str = "train_config.json";

/// Manages the checkpoint directory of one run.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory (like `mkdir -p`).
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Base path of the model snapshot for `epoch` (recorder adds the extension)
    pub fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    pub fn optimizer_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("optim_epoch_{epoch}"))
    }

    /// Persist model + optimizer for `epoch` and move the latest pointer.
    pub fn save_epoch<M: Seq2SeqModel>(&self, model: &M, epoch: usize) -> Result<()> {
        let model_path = self.model_path(epoch);
        let optim_path = self.optimizer_path(epoch);
        model
            .save_checkpoint(&model_path, &optim_path)
            .with_context(|| format!("Failed to save checkpoint for epoch {epoch}"))?;

        let latest_path = self.dir.join(LATEST_EPOCH_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        tracing::info!("Saved model and optimizer for epoch {}", epoch);
        Ok(())
    }

    /// Save the training configuration next to the snapshots.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}
