// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the Init state of a training run, then hands
// over to the training loop:
//
//   Step 1: Load persisted corpus     (Layer 6 - infra)
//           or rebuild it from the raw dialogue file:
//             read + filter pairs     (Layer 4 - data)
//             build vocabulary        (Layer 4 - data)
//             encode + save           (Layer 4 / 6)
//   Step 2: Validate sizes
//   Step 3: Split train/test once     (Layer 4 - data)
//   Step 4: Save config               (Layer 6 - infra)
//   Step 5: Build model + optimizer   (Layer 5 - ml)
//   Step 6: Run training loop         (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::BatchBuilder,
    encoder::CorpusEncoder,
    loader::CorpusLoader,
    preprocessor::{Preprocessor, Script, DEFAULT_EXCLUDED_SCRIPTS},
    vocabulary::VocabularyBuilder,
};
use crate::domain::traits::PairSource;
use crate::domain::vocabulary::PAD_TOKEN;
use crate::infra::{
    checkpoint::CheckpointManager,
    corpus_store::{CorpusStore, StoreError, StoredCorpus},
    metrics::MetricsLogger,
};
use crate::ml::model::{with_adam, Seq2SeqConfig, TrainBackend};
use crate::ml::trainer::{run_training, TrainOutcome};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved next to the checkpoints
// so a run's hyperparameters can be recovered later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_file:            String,
    pub corpus_dir:           String,
    pub output_dir:           String,
    pub epochs:               usize,
    pub feature_num:          usize,
    pub hidden_num:           usize,
    pub batch_size:           usize,
    pub test_size:            usize,
    pub max_length:           usize,
    pub size_filter:          bool,
    pub excluded_scripts:     Vec<Script>,
    pub vocab_cap:            usize,
    pub lr:                   f64,
    pub grad_clip:            f32,
    pub seed:                 Option<u64>,
    pub early_stop_window:    usize,
    pub early_stop_threshold: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_file:            "data/pair_corpus.txt".to_string(),
            corpus_dir:           "data/corpus".to_string(),
            output_dir:           "data".to_string(),
            epochs:               1,
            feature_num:          1024,
            hidden_num:           1024,
            batch_size:           100,
            test_size:            1000,
            max_length:           20,
            size_filter:          false,
            excluded_scripts:     DEFAULT_EXCLUDED_SCRIPTS.to_vec(),
            vocab_cap:            10_000,
            lr:                   1e-3,
            grad_clip:            5.0,
            seed:                 None,
            early_stop_window:    10,
            early_stop_threshold: 8,
        }
    }
}

impl TrainConfig {
    /// Checks that need no data.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch size must be positive");
        ensure!(self.test_size > 0, "test size must be positive");
        Ok(())
    }

    /// The test partition must leave at least one training example.
    pub fn validate_pair_count(&self, pairs: usize) -> Result<()> {
        ensure!(
            self.test_size < pairs,
            "test size {} must be smaller than the {} available pairs",
            self.test_size,
            pairs,
        );
        Ok(())
    }

    fn max_length_filter(&self) -> Option<usize> {
        self.size_filter.then_some(self.max_length)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the whole pipeline on the GPU backend.
    pub fn execute(&self) -> Result<TrainOutcome> {
        let cfg = &self.config;
        cfg.validate()?;

        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // ── Step 1: Corpus ────────────────────────────────────────────────────
        let StoredCorpus { vocabulary, corpus } = load_or_build_corpus(cfg)?;
        tracing::info!(
            "Vocabulary: {} tokens (<start>={}, <eos>={}, <unk>={}, <pad>={:?}), corpus: {} pairs",
            vocabulary.len(),
            vocabulary.start_id(),
            vocabulary.eos_id(),
            vocabulary.unk_id(),
            vocabulary.raw_id(PAD_TOKEN),
            corpus.len(),
        );
        ensure!(!corpus.is_empty(), "no utterance pairs survived filtering");
        if let Some(first) = corpus.prompts().first() {
            let words: Vec<&str> = first.iter().filter_map(|&id| vocabulary.id_to_token(id)).collect();
            tracing::debug!("First prompt: {:?}", words);
        }

        // ── Step 2: Validate ──────────────────────────────────────────────────
        cfg.validate_pair_count(corpus.len())?;

        // ── Step 3: Fixed train/test split ────────────────────────────────────
        let split = BatchBuilder::new(vocabulary.eos_id()).split(&corpus, cfg.test_size, &mut rng)?;

        // ── Step 4: Config snapshot ───────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.output_dir)?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.output_dir)?;
        tracing::info!("Logging epoch metrics to '{}'", metrics.csv_path().display());

        // ── Step 5: Model + Adam ──────────────────────────────────────────────
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        let model_cfg = Seq2SeqConfig::new(vocabulary.len(), cfg.feature_num, cfg.hidden_num);
        let mut model = with_adam::<TrainBackend>(&model_cfg, cfg.lr, cfg.grad_clip, &device);
        tracing::info!(
            "Model ready: {} classes, feature_num={}, hidden_num={}",
            model_cfg.num_classes(),
            cfg.feature_num,
            cfg.hidden_num,
        );

        // ── Step 6: Training loop (Layer 5) ───────────────────────────────────
        run_training(
            cfg,
            &mut model,
            &split,
            vocabulary.start_id(),
            &ckpt_manager,
            &metrics,
            &mut rng,
        )
    }
}

/// Load the persisted corpus; rebuild and persist it from the raw
/// dialogue file when an artifact is missing. Any other store
/// failure is fatal.
pub fn load_or_build_corpus(cfg: &TrainConfig) -> Result<StoredCorpus> {
    let store = CorpusStore::new(&cfg.corpus_dir);
    match store.load() {
        Ok(stored) => Ok(stored),
        Err(StoreError::MissingArtifact { path }) => {
            tracing::info!(
                "'{}' not found, rebuilding corpus from '{}'",
                path.display(),
                cfg.data_file,
            );
            build_corpus(cfg, &store)
        }
        Err(e) => Err(anyhow::Error::new(e).context("Cannot load persisted corpus")),
    }
}

fn build_corpus(cfg: &TrainConfig, store: &CorpusStore) -> Result<StoredCorpus> {
    let loader = CorpusLoader::new(
        &cfg.data_file,
        Preprocessor::with_excluded_scripts(cfg.excluded_scripts.clone()),
        cfg.max_length_filter(),
        cfg.batch_size,
    )?;
    let pairs = loader.load_pairs()?;
    tracing::info!("Loaded {} utterance pairs", pairs.len());

    let vocabulary = VocabularyBuilder::with_cap(cfg.vocab_cap).build(&pairs)?;
    let corpus     = CorpusEncoder::new(&vocabulary).encode(&pairs);
    store.save(&vocabulary, &corpus)?;

    Ok(StoredCorpus { vocabulary, corpus })
}
