// ============================================================
// Layer 6 — Metrics History and Logger
// ============================================================
// Two outputs per run:
//
//   metrics.csv            one row appended after every epoch
//                          (survives a crash mid-run)
//
//   loss_train_data.json   ┐
//   loss_test_data.json    │ the full history as four separate
//   bleu_score_data.json   │ sequences, written once when the
//   wer_score_data.json    ┘ training loop exits
//
// Example CSV output:
//   epoch,train_loss,test_loss,bleu,wer
//   0,48.211034,4102.553100,0.000000,0.981200
//   1,41.730560,3890.017200,0.012400,0.941500
//
// How to read the metrics:
//   - test_loss climbing for many epochs → over-fitting
//     (this is what the early-stopping check looks for)
//   - bleu up and wer down → responses getting closer
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const TRAIN_LOSS_FILE: &str = "loss_train_data.json";
pub const TEST_LOSS_FILE:  &str = "loss_test_data.json";
pub const BLEU_FILE:       &str = "bleu_score_data.json";
pub const WER_FILE:        &str = "wer_score_data.json";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Zero-based epoch index, same as the checkpoint names
    pub epoch: usize,

    /// Mean accumulated loss per training window
    pub train_loss: f64,

    /// Summed step loss over the whole test pass
    pub test_loss: f64,

    /// Corpus BLEU of the free-running test hypotheses
    pub bleu: f64,

    /// Mean word error rate of the same hypotheses
    pub wer: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, test_loss: f64, bleu: f64, wer: f64) -> Self {
        Self { epoch, train_loss, test_loss, bleu, wer }
    }
}

// ─── MetricsHistory ───────────────────────────────────────────────────────────
/// Append-only per-epoch history of the four tracked values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    train_loss: Vec<f64>,
    test_loss:  Vec<f64>,
    bleu:       Vec<f64>,
    wer:        Vec<f64>,
}

impl MetricsHistory {
    pub fn push(&mut self, m: &EpochMetrics) {
        self.train_loss.push(m.train_loss);
        self.test_loss.push(m.test_loss);
        self.bleu.push(m.bleu);
        self.wer.push(m.wer);
    }

    pub fn len(&self) -> usize {
        self.test_loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_loss.is_empty()
    }

    pub fn train_loss(&self) -> &[f64] { &self.train_loss }
    pub fn test_loss(&self)  -> &[f64] { &self.test_loss }
    pub fn bleu(&self)       -> &[f64] { &self.bleu }
    pub fn wer(&self)        -> &[f64] { &self.wer }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// Writes epoch rows to CSV and the final history to JSON.
pub struct MetricsLogger {
    dir:      PathBuf,
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        // Header only for a new file, so reruns append
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,test_loss,bleu,wer")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { dir, csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.test_loss,
            m.bleu,
            m.wer,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, test_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.test_loss,
        );

        Ok(())
    }

    /// Write the four history sequences as separate JSON files.
    pub fn save_history(&self, history: &MetricsHistory) -> Result<()> {
        for (name, values) in [
            (TRAIN_LOSS_FILE, history.train_loss()),
            (TEST_LOSS_FILE,  history.test_loss()),
            (BLEU_FILE,       history.bleu()),
            (WER_FILE,        history.wer()),
        ] {
            let path = self.dir.join(name);
            fs::write(&path, serde_json::to_string(values)?)
                .with_context(|| format!("Cannot write '{}'", path.display()))?;
        }
        tracing::info!("Saved {} epochs of metric history to '{}'", history.len(), self.dir.display());
        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
