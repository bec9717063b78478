// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses flags with clap
// and delegates the run to Layer 2 (application).
//
// Exit status is 0 both when the epochs run out and when the
// early-stopping check ends the run.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::TrainArgs;

use crate::application::train_use_case::TrainUseCase;
use crate::ml::trainer::StopReason;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-chat",
    version = "0.1.0",
    about = "Train an encoder-decoder conversation model on a tab-separated dialogue corpus."
)]
pub struct Cli {
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        tracing::info!("Starting training on '{}'", self.train.data_file);

        let outcome = TrainUseCase::new(self.train.into()).execute()?;

        match outcome.stop {
            StopReason::EpochsExhausted => {
                println!("Training complete after {} epochs.", outcome.history.len());
            }
            StopReason::EarlyStopped { epoch } => {
                println!("Stopped early after epoch {epoch}: test loss kept rising.");
            }
        }
        Ok(())
    }
}
