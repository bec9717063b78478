// ============================================================
// Layer 5 — Encoder-Decoder Network (Burn)
// ============================================================
// Two LSTMs with separate embeddings and an output projection:
//
//   prompt grid  [batch, steps]
//        │  encoder_embedding
//        ▼
//   encoder LSTM ──► (cell, hidden)  final state only
//                         │
//   previous token [batch]│
//        │  decoder_embedding
//        ▼                ▼
//   decoder LSTM (one step, carries state)
//        │
//        ▼  output Linear
//   logits [batch, vocab + 1]
//
// The extra class is the padding slot. Its index is `vocab_size`;
// the loss ignores targets of that class, and padded inputs embed
// to the zero vector.
//
// Optimiser: Adam with global gradient-norm clipping.
//
// Reference: Sutskever et al. (2014) Sequence to Sequence Learning
//            Hochreiter & Schmidhuber (1997) LSTM
//            Burn Book §3 (Building Blocks)

use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use burn::{
    grad_clipping::GradientClippingConfig,
    nn::{
        loss::{CrossEntropyLoss, CrossEntropyLossConfig},
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig, LstmState,
    },
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::{backend::AutodiffBackend, TensorData},
};

use crate::domain::batch::TimeMajor;
use crate::domain::traits::{Prediction, Seq2SeqModel};
use crate::domain::vocabulary::Slot;

/// Backend used for real training runs.
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    /// Real token ids, without the padding slot
    pub vocab_size:  usize,
    /// Embedding width
    pub feature_num: usize,
    /// LSTM hidden width
    pub hidden_num:  usize,
}

impl Seq2SeqConfig {
    /// Output classes: every real id plus the padding slot.
    pub fn num_classes(&self) -> usize {
        self.vocab_size + 1
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqNet<B> {
        let classes = self.num_classes();
        Seq2SeqNet {
            encoder_embedding: EmbeddingConfig::new(classes, self.feature_num).init(device),
            encoder:           LstmConfig::new(self.feature_num, self.hidden_num, true).init(device),
            decoder_embedding: EmbeddingConfig::new(classes, self.feature_num).init(device),
            decoder:           LstmConfig::new(self.feature_num, self.hidden_num, true).init(device),
            output:            LinearConfig::new(self.hidden_num, classes).init(device),
            pad_index:         self.vocab_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct Seq2SeqNet<B: Backend> {
    pub encoder_embedding: Embedding<B>,
    pub encoder:           Lstm<B>,
    pub decoder_embedding: Embedding<B>,
    pub decoder:           Lstm<B>,
    pub output:            Linear<B>,
    pub pad_index:         usize,
}

impl<B: Backend> Seq2SeqNet<B> {
    /// ids: [batch, seq] → embeddings [batch, seq, feature], zero at pad.
    fn embed(&self, embedding: &Embedding<B>, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let keep = ids
            .clone()
            .not_equal_elem(self.pad_index as i64)
            .float()
            .unsqueeze_dim::<3>(2);
        embedding.forward(ids) * keep
    }

    /// prompts: [batch, steps] → final encoder state.
    pub fn encode(&self, prompts: Tensor<B, 2, Int>) -> LstmState<B, 2> {
        let x = self.embed(&self.encoder_embedding, prompts);
        let (_, state) = self.encoder.forward(x, None);
        state
    }

    /// previous: [batch] → logits [batch, classes] and the next state.
    pub fn decode_step(
        &self,
        previous: Tensor<B, 1, Int>,
        state:    LstmState<B, 2>,
    ) -> (Tensor<B, 2>, LstmState<B, 2>) {
        let [batch] = previous.dims();
        let x = self.embed(&self.decoder_embedding, previous.reshape([batch, 1]));
        let (out, state) = self.decoder.forward(x, Some(state));
        let [_, _, hidden] = out.dims();
        (self.output.forward(out.reshape([batch, hidden])), state)
    }
}

// ─── Prediction ───────────────────────────────────────────────────────────────
/// Step logits for a whole batch.
pub struct Logits<B: Backend> {
    pub tensor: Tensor<B, 2>,
    pad_index:  usize,
}

impl<B: Backend> Prediction for Logits<B> {
    fn argmax(&self) -> Result<Vec<Slot>> {
        // argmax(1) returns [batch, 1]
        let ids = self.tensor.clone().argmax(1).flatten::<1>(0, 1).into_data();
        Ok(ids
            .iter::<i64>()
            .map(|id| {
                if id as usize == self.pad_index {
                    Slot::Pad
                } else {
                    Slot::Token(id as u32)
                }
            })
            .collect())
    }
}

// ─── BurnSeq2Seq ──────────────────────────────────────────────────────────────
/// Network, optimiser and decoder state behind the `Seq2SeqModel` seam.
pub struct BurnSeq2Seq<B: AutodiffBackend, O: Optimizer<Seq2SeqNet<B>, B>> {
    net:     Seq2SeqNet<B>,
    optim:   O,
    lr:      f64,
    state:   Option<LstmState<B, 2>>,
    loss_fn: CrossEntropyLoss<B>,
    device:  B::Device,
}

/// Fresh network with Adam and norm clipping at `grad_clip`.
pub fn with_adam<B: AutodiffBackend>(
    cfg:       &Seq2SeqConfig,
    lr:        f64,
    grad_clip: f32,
    device:    &B::Device,
) -> BurnSeq2Seq<B, impl Optimizer<Seq2SeqNet<B>, B>> {
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Norm(grad_clip)))
        .init::<B, Seq2SeqNet<B>>();
    BurnSeq2Seq::new(cfg.init(device), optim, lr, device.clone())
}

impl<B: AutodiffBackend, O: Optimizer<Seq2SeqNet<B>, B>> BurnSeq2Seq<B, O> {
    pub fn new(net: Seq2SeqNet<B>, optim: O, lr: f64, device: B::Device) -> Self {
        let loss_fn = CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![net.pad_index]))
            .init(&device);
        Self { net, optim, lr, state: None, loss_fn, device }
    }

    fn class_of(&self, slot: Slot) -> i64 {
        match slot {
            Slot::Token(id) => id as i64,
            Slot::Pad => self.net.pad_index as i64,
        }
    }

    fn ids_1d(&self, slots: &[Slot]) -> Tensor<B, 1, Int> {
        let values: Vec<i64> = slots.iter().map(|&s| self.class_of(s)).collect();
        Tensor::from_data(TensorData::new(values, [slots.len()]), &self.device)
    }
}

impl<B: AutodiffBackend, O: Optimizer<Seq2SeqNet<B>, B>> Seq2SeqModel for BurnSeq2Seq<B, O> {
    type Loss       = Tensor<B, 1>;
    type Prediction = Logits<B>;

    fn reset_state(&mut self) {
        self.state = None;
    }

    fn encode(&mut self, prompts: &TimeMajor) -> Result<()> {
        ensure!(prompts.steps() > 0 && prompts.width() > 0, "cannot encode an empty prompt grid");
        // batch-major for the LSTM: [width, steps]
        let values: Vec<i64> = prompts
            .columns()
            .flat_map(|col| col.into_iter().map(|s| self.class_of(s)).collect::<Vec<_>>())
            .collect();
        let ids = Tensor::from_data(
            TensorData::new(values, [prompts.width(), prompts.steps()]),
            &self.device,
        );
        self.state = Some(self.net.encode(ids));
        Ok(())
    }

    fn decode(&mut self, previous: &[Slot], target: &[Slot]) -> Result<(Tensor<B, 1>, Logits<B>)> {
        ensure!(
            previous.len() == target.len(),
            "previous ({}) and target ({}) batch widths differ",
            previous.len(),
            target.len(),
        );
        let state = self.state.take().context("decode called before encode")?;

        let (logits, state) = self.net.decode_step(self.ids_1d(previous), state);
        self.state = Some(state);

        let loss = self.loss_fn.forward(logits.clone(), self.ids_1d(target));
        Ok((loss, Logits { tensor: logits, pad_index: self.net.pad_index }))
    }

    fn loss_value(loss: &Tensor<B, 1>) -> f64 {
        loss.clone().into_scalar().elem::<f64>()
    }

    fn apply_gradients(&mut self, loss: Tensor<B, 1>) -> Result<()> {
        // Backward pass + Adam update
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.net);
        self.net  = self.optim.step(self.lr, self.net.clone(), grads);
        self.state = None;
        Ok(())
    }

    fn save_checkpoint(&self, model_path: &Path, optimizer_path: &Path) -> Result<()> {
        let recorder = CompactRecorder::new();
        Recorder::<B>::record(&recorder, self.net.clone().into_record(), model_path.to_path_buf())
            .map_err(|e| anyhow!("{e:?}"))
            .with_context(|| format!("Failed to save model to '{}'", model_path.display()))?;
        Recorder::<B>::record(&recorder, self.optim.to_record(), optimizer_path.to_path_buf())
            .map_err(|e| anyhow!("{e:?}"))
            .with_context(|| format!("Failed to save optimizer to '{}'", optimizer_path.display()))?;
        Ok(())
    }
}
