// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// One flat set of flags, no subcommands. Every flag has a
// default so a bare invocation trains on data/pair_corpus.txt.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::Args;
use crate::application::train_use_case::TrainConfig;
use crate::data::preprocessor::{Script, DEFAULT_EXCLUDED_SCRIPTS};

/// All arguments of a training run.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Tab-separated dialogue file (prompt<TAB>response per line)
    #[arg(short, long = "data", default_value = "data/pair_corpus.txt")]
    pub data_file: String,

    /// Directory of the persisted vocabulary and encoded corpus
    #[arg(long, default_value = "data/corpus")]
    pub corpus_dir: String,

    /// Directory for checkpoints, the config snapshot and metrics
    #[arg(long, default_value = "data")]
    pub output_dir: String,

    /// Number of full passes through the training data
    #[arg(short, long = "epoch", default_value_t = 1)]
    pub epochs: usize,

    /// Embedding width
    #[arg(short, long, default_value_t = 1024)]
    pub feature_num: usize,

    /// LSTM hidden width
    #[arg(long, default_value_t = 1024)]
    pub hidden_num: usize,

    /// Examples per gradient update
    #[arg(short, long = "batchsize", default_value_t = 100)]
    pub batch_size: usize,

    /// Examples held out for evaluation
    #[arg(short, long = "testsize", default_value_t = 1000)]
    pub test_size: usize,

    /// Maximum tokens per side when --size-filter is set
    #[arg(long, default_value_t = 20)]
    pub max_length: usize,

    /// Drop pairs where either side exceeds --max-length
    #[arg(long)]
    pub size_filter: bool,

    /// Scripts whose characters reject an utterance (comma-separated)
    #[arg(long = "exclude-script", value_enum, value_delimiter = ',', default_values_t = DEFAULT_EXCLUDED_SCRIPTS)]
    pub excluded_scripts: Vec<Script>,

    /// Most frequent tokens kept in the vocabulary
    #[arg(long, default_value_t = 10_000)]
    pub vocab_cap: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Gradient norm clipping threshold
    #[arg(long, default_value_t = 5.0)]
    pub grad_clip: f32,

    /// Fix the random split and shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of recent test losses inspected for early stopping
    #[arg(long, default_value_t = 10)]
    pub early_stop_window: usize,

    /// Stop when more than this many of them increased
    #[arg(long, default_value_t = 8)]
    pub early_stop_threshold: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_file:            a.data_file,
            corpus_dir:           a.corpus_dir,
            output_dir:           a.output_dir,
            epochs:               a.epochs,
            feature_num:          a.feature_num,
            hidden_num:           a.hidden_num,
            batch_size:           a.batch_size,
            test_size:            a.test_size,
            max_length:           a.max_length,
            size_filter:          a.size_filter,
            excluded_scripts:     a.excluded_scripts,
            vocab_cap:            a.vocab_cap,
            lr:                   a.lr,
            grad_clip:            a.grad_clip,
            seed:                 a.seed,
            early_stop_window:    a.early_stop_window,
            early_stop_threshold: a.early_stop_threshold,
        }
    }
}
