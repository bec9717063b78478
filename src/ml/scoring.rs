// ============================================================
// Layer 5 — Translation-Quality Scores
// ============================================================
// Two scores comparing decoded hypotheses with references.
//
// Corpus BLEU (Papineni et al. 2002), weights 0.25 × 1..4-grams:
//   p_n  = Σ clipped n-gram matches / Σ hypothesis n-grams
//   BP   = 1                 if c > r
//          exp(1 - r / c)    otherwise   (c, r = total lengths)
//   BLEU = BP · exp(Σ w_n · ln p_n)
//   Any p_n with zero matches makes BLEU 0. An n-gram order that
//   neither hypotheses nor references are long enough to contain
//   is left out and the remaining weights are renormalised.
//
// Word error rate:
//   WER = edit_distance(ref, hyp) / len(ref)
//   averaged arithmetically over examples.
//
// Scores work on any comparable token type.

use std::collections::HashMap;
use std::hash::Hash;

pub const BLEU_WEIGHTS: [f64; 4] = [0.25, 0.25, 0.25, 0.25];

fn ngram_counts<T: Eq + Hash>(tokens: &[T], n: usize) -> HashMap<&[T], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Corpus-level BLEU with one reference per hypothesis.
pub fn corpus_bleu<T: Eq + Hash>(references: &[Vec<T>], hypotheses: &[Vec<T>]) -> f64 {
    let orders = BLEU_WEIGHTS.len();
    let mut matches     = vec![0usize; orders];
    let mut hyp_ngrams  = vec![0usize; orders];
    let mut ref_ngrams  = vec![0usize; orders];
    let mut hyp_len = 0usize;
    let mut ref_len = 0usize;

    for (reference, hypothesis) in references.iter().zip(hypotheses) {
        hyp_len += hypothesis.len();
        ref_len += reference.len();

        for n in 1..=orders {
            let ref_counts = ngram_counts(reference, n);
            let hyp_counts = ngram_counts(hypothesis, n);
            matches[n - 1] += hyp_counts
                .iter()
                .map(|(gram, &count)| count.min(ref_counts.get(gram).copied().unwrap_or(0)))
                .sum::<usize>();
            hyp_ngrams[n - 1] += hypothesis.len().saturating_sub(n - 1);
            ref_ngrams[n - 1] += reference.len().saturating_sub(n - 1);
        }
    }

    if hyp_len == 0 {
        return 0.0;
    }

    let mut log_sum      = 0.0;
    let mut weight_total = 0.0;
    for (n, &weight) in BLEU_WEIGHTS.iter().enumerate() {
        if hyp_ngrams[n] == 0 && ref_ngrams[n] == 0 {
            continue;
        }
        if matches[n] == 0 {
            return 0.0;
        }
        let precision = matches[n] as f64 / hyp_ngrams[n].max(1) as f64;
        log_sum      += weight * precision.ln();
        weight_total += weight;
    }
    if weight_total == 0.0 {
        return 0.0;
    }

    let brevity = if hyp_len > ref_len {
        1.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    };
    brevity * (log_sum / weight_total).exp()
}

/// Levenshtein distance over tokens.
pub fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, x) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(x != y);
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Word error rate of one hypothesis. An empty reference counts as
/// length 1 so the rate stays finite.
pub fn word_error_rate<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> f64 {
    edit_distance(reference, hypothesis) as f64 / reference.len().max(1) as f64
}

/// Arithmetic mean of per-example WER (not length-weighted).
pub fn mean_word_error_rate<T: PartialEq>(references: &[Vec<T>], hypotheses: &[Vec<T>]) -> f64 {
    if references.is_empty() {
        return 0.0;
    }
    let total: f64 = references
        .iter()
        .zip(hypotheses)
        .map(|(r, h)| word_error_rate(r, h))
        .sum();
    total / references.len() as f64
}
