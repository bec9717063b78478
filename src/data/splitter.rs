// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Splits example indices into two sets:
//   - Test set:  exactly `test_size` examples, held out for
//                loss, BLEU and WER after every epoch
//   - Train set: everything else
//
// The split is drawn once per run from a random permutation,
// so it is not positional: the first lines of the corpus are
// not automatically the test set.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::seq::SliceRandom;
use rand::Rng;

/// A random permutation of `0..n`.
pub fn permutation<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices
}

/// Randomly split `0..n` into `(test, train)` index lists.
///
/// `test` has `min(test_size, n)` entries; `train` has the rest.
pub fn split_train_test<R: Rng + ?Sized>(
    n:         usize,
    test_size: usize,
    rng:       &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let mut indices = permutation(n, rng);
    let train       = indices.split_off(test_size.min(n));

    tracing::debug!("Corpus split: {} test, {} train", indices.len(), train.len());

    (indices, train)
}
