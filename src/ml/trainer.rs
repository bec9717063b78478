// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives any Seq2SeqModel through the epoch state machine:
//
//   Init ─► EpochTrain ─► EpochEval ─► Checkpoint ─┐
//             ▲                                    │
//             └──────────── next epoch ◄───────────┤
//                                                  ▼
//                                               Stopped
//
// EpochTrain — fresh permutation of the train partition, one
//   teacher-forced pass per batch window: step 0 is fed <start>,
//   step t is fed the ground-truth token of step t-1. Step losses
//   are summed and applied as one gradient update per window.
//
// EpochEval — same walk over the fixed test partition, but each
//   step is fed the model's own arg-max prediction. Predictions
//   form the hypotheses scored with BLEU and WER.
//
// Checkpoint — model + optimizer snapshot every epoch, then the
//   early-stopping check on the recent test losses.
//
// Stopped — epochs exhausted or early stop; the metric history
//   is written either way.
//
// Reference: Williams & Zipser (1989) teacher forcing
//            Prechelt (1998) Early Stopping — But When?

use anyhow::{ensure, Context, Result};
use rand::Rng;

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::{Partition, SplitCorpus};
use crate::data::splitter::permutation;
use crate::domain::batch::TimeMajor;
use crate::domain::traits::{Prediction, Seq2SeqModel};
use crate::domain::utterance::TokenId;
use crate::domain::vocabulary::Slot;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsHistory, MetricsLogger};
use crate::ml::scoring::{corpus_bleu, mean_word_error_rate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EpochsExhausted,
    /// Stopped after this (zero-based) epoch
    EarlyStopped { epoch: usize },
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub history: MetricsHistory,
    pub stop:    StopReason,
}

/// Loss and hypotheses of one free-running pass over the test set.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub loss:       f64,
    pub hypotheses: Vec<Vec<Slot>>,
}

pub fn run_training<M, R>(
    cfg:      &TrainConfig,
    model:    &mut M,
    split:    &SplitCorpus,
    start_id: TokenId,
    ckpt:     &CheckpointManager,
    metrics:  &MetricsLogger,
    rng:      &mut R,
) -> Result<TrainOutcome>
where
    M: Seq2SeqModel,
    R: Rng + ?Sized,
{
    ensure!(cfg.batch_size > 0, "batch size must be positive");
    ensure!(!split.train.is_empty(), "train partition has no examples");
    ensure!(!split.test.is_empty(), "test partition has no examples");

    let references  = split.test.references();
    let mut history = MetricsHistory::default();
    let mut stop    = StopReason::EpochsExhausted;

    for epoch in 0..cfg.epochs {
        // ── EpochTrain ────────────────────────────────────────────────────────
        let train_loss = train_epoch(model, &split.train, cfg.batch_size, start_id, epoch, rng)?;

        // ── EpochEval ─────────────────────────────────────────────────────────
        let eval = evaluate(model, &split.test, cfg.batch_size, start_id)?;
        let bleu = corpus_bleu(&references, &eval.hypotheses);
        let wer  = mean_word_error_rate(&references, &eval.hypotheses);

        // ── Checkpoint ────────────────────────────────────────────────────────
        ckpt.save_epoch(model, epoch)?;

        let record = EpochMetrics::new(epoch, train_loss, eval.loss, bleu, wer);
        metrics.log(&record)?;
        history.push(&record);

        println!(
            "Epoch {:>3}/{} | train_loss={:.2} | test_loss={:.2} | bleu={:.4} | wer={:.4}",
            epoch, cfg.epochs, train_loss, eval.loss, bleu, wer,
        );

        if should_stop(history.test_loss(), cfg.early_stop_window, cfg.early_stop_threshold) {
            tracing::warn!("Test loss keeps rising; probably over-fitting, stopping after epoch {}", epoch);
            stop = StopReason::EarlyStopped { epoch };
            break;
        }
    }

    // ── Stopped ───────────────────────────────────────────────────────────────
    if history.is_empty() {
        tracing::warn!("No epoch completed; metric history is empty");
    }
    metrics.save_history(&history)?;
    tracing::info!("Training finished: {:?} after {} epochs", stop, history.len());
    Ok(TrainOutcome { history, stop })
}

/// One shuffled pass over the train partition; returns the mean
/// window loss.
fn train_epoch<M, R>(
    model:      &mut M,
    train:      &Partition,
    batch_size: usize,
    start_id:   TokenId,
    epoch:      usize,
    rng:        &mut R,
) -> Result<f64>
where
    M: Seq2SeqModel,
    R: Rng + ?Sized,
{
    let order = permutation(train.len(), rng);
    let mut total   = 0.0f64;
    let mut batches = 0usize;

    for window in order.chunks(batch_size) {
        let prompts   = train.prompts.select_columns(window);
        let responses = train.responses.select_columns(window);

        let loss  = teacher_forced_pass(model, &prompts, &responses, start_id)?;
        let value = M::loss_value(&loss);
        model.apply_gradients(loss)?;

        total   += value;
        batches += 1;
        tracing::debug!("Epoch {} batch {} loss {:.2}", epoch, batches, value);
    }

    Ok(if batches > 0 { total / batches as f64 } else { f64::NAN })
}

/// Free-running pass over the test partition in fixed order.
pub fn evaluate<M: Seq2SeqModel>(
    model:      &mut M,
    test:       &Partition,
    batch_size: usize,
    start_id:   TokenId,
) -> Result<Evaluation> {
    ensure!(batch_size > 0, "batch size must be positive");

    let mut loss       = 0.0f64;
    let mut hypotheses = Vec::with_capacity(test.len());

    for begin in (0..test.len()).step_by(batch_size) {
        let end       = (begin + batch_size).min(test.len());
        let prompts   = test.prompts.column_range(begin..end);
        let responses = test.responses.column_range(begin..end);

        let (window_loss, window_hyps) = free_running_pass(model, &prompts, &responses, start_id)?;
        loss += M::loss_value(&window_loss);
        hypotheses.extend(window_hyps);
    }

    Ok(Evaluation { loss, hypotheses })
}

/// Decode feeding the ground-truth previous token at every step.
pub fn teacher_forced_pass<M: Seq2SeqModel>(
    model:     &mut M,
    prompts:   &TimeMajor,
    responses: &TimeMajor,
    start_id:  TokenId,
) -> Result<M::Loss> {
    model.reset_state();
    model.encode(prompts)?;

    let mut previous = vec![Slot::Token(start_id); responses.width()];
    let mut total: Option<M::Loss> = None;

    for target in responses.rows() {
        let (loss, _) = model.decode(&previous, target)?;
        total    = Some(accumulate(total, loss));
        previous = target.to_vec();
    }

    total.context("response grid has no time steps")
}

/// Decode feeding the model's own arg-max prediction at every step.
/// Returns the summed loss and one hypothesis per example.
pub fn free_running_pass<M: Seq2SeqModel>(
    model:     &mut M,
    prompts:   &TimeMajor,
    responses: &TimeMajor,
    start_id:  TokenId,
) -> Result<(M::Loss, Vec<Vec<Slot>>)> {
    model.reset_state();
    model.encode(prompts)?;

    let width        = responses.width();
    let mut previous = vec![Slot::Token(start_id); width];
    let mut total: Option<M::Loss> = None;
    let mut predicted: Vec<Vec<Slot>> = Vec::with_capacity(responses.steps());

    for target in responses.rows() {
        let (loss, prediction) = model.decode(&previous, target)?;
        total = Some(accumulate(total, loss));

        let next = prediction.argmax()?;
        ensure!(
            next.len() == width,
            "model predicted {} tokens for a batch of {}",
            next.len(),
            width,
        );
        predicted.push(next.clone());
        previous = next;
    }

    let total = total.context("response grid has no time steps")?;
    let hypotheses = (0..width)
        .map(|i| strip_trailing_pad(predicted.iter().map(|row| row[i]).collect()))
        .collect();
    Ok((total, hypotheses))
}

fn accumulate<L: std::ops::Add<Output = L>>(total: Option<L>, step: L) -> L {
    match total {
        Some(sum) => sum + step,
        None => step,
    }
}

pub fn strip_trailing_pad(mut tokens: Vec<Slot>) -> Vec<Slot> {
    while tokens.last() == Some(&Slot::Pad) {
        tokens.pop();
    }
    tokens
}

/// True when more than `threshold` of the consecutive pairs in the
/// last `window` test losses are increases.
pub fn should_stop(test_losses: &[f64], window: usize, threshold: usize) -> bool {
    let recent    = &test_losses[test_losses.len().saturating_sub(window)..];
    let increases = recent.windows(2).filter(|w| w[0] < w[1]).count();
    increases > threshold
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::BatchBuilder;
    use crate::domain::utterance::EncodedCorpus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use std::path::Path;

    const START: TokenId = 90;
    const EOS:   TokenId = 91;

    struct Echo(Vec<Slot>);

    impl Prediction for Echo {
        fn argmax(&self) -> Result<Vec<Slot>> {
            Ok(self.0.clone())
        }
    }

    /// Scripted model: predicts either the target (perfect) or a fixed
    /// token, and reports a loss that is constant or keeps rising.
    #[derive(Default)]
    struct ScriptedModel {
        fixed_prediction: Option<Slot>,
        rising_loss:      bool,
        encoded:          Option<usize>,
        encode_log:       Vec<Vec<Slot>>,
        decode_calls:     usize,
        previous_log:     Vec<Vec<Slot>>,
        updates:          Vec<f64>,
    }

    impl Seq2SeqModel for ScriptedModel {
        type Loss       = f64;
        type Prediction = Echo;

        fn reset_state(&mut self) {
            self.encoded = None;
        }

        fn encode(&mut self, prompts: &TimeMajor) -> Result<()> {
            self.encoded = Some(prompts.width());
            self.encode_log.push(prompts.row(prompts.steps() - 1).to_vec());
            Ok(())
        }

        fn decode(&mut self, previous: &[Slot], target: &[Slot]) -> Result<(f64, Echo)> {
            let width = self.encoded.context("decode before encode")?;
            assert_eq!(previous.len(), width);
            self.decode_calls += 1;
            self.previous_log.push(previous.to_vec());
            let loss = if self.rising_loss { self.decode_calls as f64 } else { 1.0 };
            let prediction = match self.fixed_prediction {
                Some(slot) => vec![slot; target.len()],
                None => target.to_vec(),
            };
            Ok((loss, Echo(prediction)))
        }

        fn loss_value(loss: &f64) -> f64 {
            *loss
        }

        fn apply_gradients(&mut self, loss: f64) -> Result<()> {
            self.updates.push(loss);
            Ok(())
        }

        fn save_checkpoint(&self, model_path: &Path, optimizer_path: &Path) -> Result<()> {
            fs::write(model_path, b"model")?;
            fs::write(optimizer_path, b"optim")?;
            Ok(())
        }
    }

    fn t(id: TokenId) -> Slot {
        Slot::Token(id)
    }

    fn grid(cols: &[Vec<Slot>]) -> TimeMajor {
        TimeMajor::from_columns(cols).unwrap()
    }

    fn split(pairs: usize, test_size: usize) -> SplitCorpus {
        let prompts   = (0..pairs).map(|i| vec![i as TokenId]).collect();
        let responses = (0..pairs).map(|i| vec![(i % 3) as TokenId; 1 + i % 2]).collect();
        let corpus    = EncodedCorpus::new(prompts, responses).unwrap();
        BatchBuilder::new(EOS)
            .split(&corpus, test_size, &mut StdRng::seed_from_u64(1))
            .unwrap()
    }

    fn config(epochs: usize, batch_size: usize) -> TrainConfig {
        TrainConfig { epochs, batch_size, ..TrainConfig::default() }
    }

    #[test]
    fn test_teacher_forcing_feeds_ground_truth() {
        let mut model = ScriptedModel { fixed_prediction: Some(t(7)), ..Default::default() };
        let prompts   = grid(&[vec![t(1)], vec![t(2)]]);
        let responses = grid(&[vec![t(10), t(11), t(EOS)], vec![t(20), t(EOS), Slot::Pad]]);

        let loss = teacher_forced_pass(&mut model, &prompts, &responses, START).unwrap();
        assert_eq!(loss, 3.0);
        assert_eq!(
            model.previous_log,
            vec![
                vec![t(START), t(START)],
                vec![t(10), t(20)],
                vec![t(11), t(EOS)],
            ]
        );
    }

    #[test]
    fn test_free_running_feeds_own_predictions() {
        let mut model = ScriptedModel { fixed_prediction: Some(t(7)), ..Default::default() };
        let prompts   = grid(&[vec![t(1)]]);
        let responses = grid(&[vec![t(10), t(11), t(EOS)]]);

        let (loss, hyps) = free_running_pass(&mut model, &prompts, &responses, START).unwrap();
        assert_eq!(loss, 3.0);
        assert_eq!(model.previous_log, vec![vec![t(START)], vec![t(7)], vec![t(7)]]);
        assert_eq!(hyps, vec![vec![t(7), t(7), t(7)]]);
    }

    #[test]
    fn test_hypotheses_drop_trailing_pad() {
        let mut model = ScriptedModel::default();
        let prompts   = grid(&[vec![t(1)], vec![t(2)]]);
        let responses = grid(&[vec![t(10), t(EOS), Slot::Pad], vec![t(20), t(21), t(EOS)]]);

        let (_, hyps) = free_running_pass(&mut model, &prompts, &responses, START).unwrap();
        assert_eq!(hyps, vec![vec![t(10), t(EOS)], vec![t(20), t(21), t(EOS)]]);
    }

    #[test]
    fn test_strip_trailing_pad_keeps_inner_pad() {
        let stripped = strip_trailing_pad(vec![t(1), Slot::Pad, t(2), Slot::Pad, Slot::Pad]);
        assert_eq!(stripped, vec![t(1), Slot::Pad, t(2)]);
    }

    #[test]
    fn test_one_update_per_window_with_accumulated_loss() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let split   = split(10, 4);
        let mut model = ScriptedModel::default();

        run_training(&config(1, 2), &mut model, &split, START, &ckpt, &metrics, &mut StdRng::seed_from_u64(5))
            .unwrap();

        // 6 train examples / 2 per window
        assert_eq!(model.updates.len(), 3);
        // every window sums one loss of 1.0 per response step
        let steps = split.train.responses.steps() as f64;
        assert!(model.updates.iter().all(|&l| l == steps));
    }

    #[test]
    fn test_perfect_model_scores_perfectly_and_checkpoints_every_epoch() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let split   = split(12, 3);
        let mut model = ScriptedModel::default();

        let outcome = run_training(
            &config(3, 4), &mut model, &split, START, &ckpt, &metrics, &mut StdRng::seed_from_u64(5),
        )
        .unwrap();

        assert_eq!(outcome.stop, StopReason::EpochsExhausted);
        assert_eq!(outcome.history.len(), 3);
        assert!(outcome.history.bleu().iter().all(|&b| (b - 1.0).abs() < 1e-9));
        assert!(outcome.history.wer().iter().all(|&w| w == 0.0));
        for epoch in 0..3 {
            assert!(ckpt.model_path(epoch).exists());
            assert!(ckpt.optimizer_path(epoch).exists());
        }
        assert!(dir.path().join(crate::infra::metrics::WER_FILE).exists());
        let latest = fs::read_to_string(dir.path().join(crate::infra::checkpoint::LATEST_EPOCH_FILE)).unwrap();
        assert_eq!(latest, "2");
    }

    #[test]
    fn test_rising_test_loss_stops_early() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let split   = split(6, 2);
        let mut model = ScriptedModel { rising_loss: true, ..Default::default() };

        let outcome = run_training(
            &config(30, 2), &mut model, &split, START, &ckpt, &metrics, &mut StdRng::seed_from_u64(5),
        )
        .unwrap();

        assert_eq!(outcome.stop, StopReason::EarlyStopped { epoch: 9 });
        assert_eq!(outcome.history.len(), 10);
        assert!(!ckpt.model_path(10).exists());

        // history is written on the early-stop exit too
        let path = dir.path().join(crate::infra::metrics::TEST_LOSS_FILE);
        assert!(path.exists());
        let test_losses: Vec<f64> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(test_losses.len(), 10);
    }

    #[test]
    fn test_flat_test_loss_runs_all_epochs() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let split   = split(6, 2);
        let mut model = ScriptedModel::default();

        let outcome = run_training(
            &config(12, 2), &mut model, &split, START, &ckpt, &metrics, &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
        assert_eq!(outcome.stop, StopReason::EpochsExhausted);
        assert_eq!(outcome.history.len(), 12);
    }

    #[test]
    fn test_each_epoch_draws_a_new_train_order() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        // 40 train examples in 20 windows, 2 test examples in 1 window
        let split   = split(42, 2);
        let mut model = ScriptedModel::default();

        run_training(&config(2, 2), &mut model, &split, START, &ckpt, &metrics, &mut StdRng::seed_from_u64(5))
            .unwrap();

        assert_eq!(model.encode_log.len(), 2 * 21);
        let epoch0: Vec<Slot> = model.encode_log[..20].concat();
        let epoch1: Vec<Slot> = model.encode_log[21..41].concat();
        assert_ne!(epoch0, epoch1);

        // both orders cover the same train examples
        let (mut sorted0, mut sorted1) = (epoch0.clone(), epoch1.clone());
        sorted0.sort_by_key(|s| s.raw());
        sorted1.sort_by_key(|s| s.raw());
        assert_eq!(sorted0, sorted1);
        assert_eq!(sorted0.len(), 40);

        // the test window is identical every epoch
        assert_eq!(model.encode_log[20], model.encode_log[41]);
    }

    #[test]
    fn test_empty_train_partition_is_rejected() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let split   = split(3, 3);
        let mut model = ScriptedModel::default();

        let result = run_training(&config(1, 2), &mut model, &split, START, &ckpt, &metrics, &mut StdRng::seed_from_u64(5));
        assert!(result.is_err());
        assert!(model.updates.is_empty());
    }

    #[test]
    fn test_zero_epochs_writes_empty_history() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let split   = split(6, 2);
        let mut model = ScriptedModel::default();

        let outcome = run_training(&config(0, 2), &mut model, &split, START, &ckpt, &metrics, &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert!(outcome.history.is_empty());
        let json = fs::read_to_string(dir.path().join(crate::infra::metrics::TEST_LOSS_FILE)).unwrap();
        assert_eq!(json, "[]");
    }

    #[test]
    fn test_should_stop_on_nine_increases() {
        let losses: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert!(should_stop(&losses, 10, 8));
    }

    #[test]
    fn test_should_not_stop_on_seven_increases() {
        let losses = [1.0, 2.0, 3.0, 2.0, 3.0, 4.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(losses.windows(2).filter(|w| w[0] < w[1]).count(), 7);
        assert!(!should_stop(&losses, 10, 8));
    }

    #[test]
    fn test_should_stop_only_looks_at_recent_window() {
        // old decreases fall outside the last ten values
        let mut losses = vec![9.0, 8.0, 7.0];
        losses.extend((0..10).map(|i| i as f64));
        assert!(should_stop(&losses, 10, 8));
        assert!(!should_stop(&losses[..9], 10, 8));
    }
}
