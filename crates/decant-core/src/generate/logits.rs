//! Logit post-processing and sampling for the generation loop.
//!
//! Every step applies the same pipeline to the last-position logits:
//! end-of-sequence suppression, top-k filtering, softmax, then one
//! weighted draw. All functions work on a plain `f32` slice so they can
//! be tested without an engine.

use rand::Rng;

/// Force the end-of-sequence logit to `-inf` while the sequence is
/// still shorter than the requested minimum.
pub(crate) fn suppress_eos(logits: &mut [f32], eos_id: i64, current_len: usize, min_length: usize) {
    if current_len >= min_length {
        return;
    }
    if let Ok(idx) = usize::try_from(eos_id) {
        if let Some(logit) = logits.get_mut(idx) {
            *logit = f32::NEG_INFINITY;
        }
    }
}

/// Keep only the `k` highest logits, setting the rest to `-inf`.
///
/// The cut is by value, not by position: every entry equal to the k-th
/// highest value survives, so ties at the boundary can leave more than
/// `k` candidates. `k` is clamped to `1..=len`, and `k >= len` leaves
/// the logits untouched.
pub(crate) fn top_k_filter(logits: &mut [f32], k: usize) {
    let k = k.clamp(1, logits.len().max(1));
    if k >= logits.len() {
        return;
    }

    let mut sorted = logits.to_vec();
    sorted.sort_unstable_by(|a, b| b.total_cmp(a));
    let threshold = sorted[k - 1];

    for logit in logits.iter_mut() {
        if *logit < threshold {
            *logit = f32::NEG_INFINITY;
        }
    }
}

/// Numerically stable softmax.
///
/// The row maximum is subtracted before exponentiating, so large logits
/// cannot overflow. `-inf` entries come out as exactly zero.
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut probs: Vec<f32> = logits.iter().map(|l| (l - max_logit).exp()).collect();
    let sum: f32 = probs.iter().sum();
    for p in &mut probs {
        *p /= sum;
    }
    probs
}

/// Draw one index from a probability distribution.
///
/// The draw lands on the first index whose cumulative mass strictly
/// exceeds the uniform sample. The comparison must be strict: a draw of
/// exactly 0.0 would otherwise select a leading entry that filtering
/// assigned zero probability.
pub(crate) fn sample_index<R: Rng + ?Sized>(probs: &[f32], rng: &mut R) -> usize {
    let r: f32 = rng.gen_range(0.0..1.0);
    let mut cumulative = 0.0f32;
    for (idx, &p) in probs.iter().enumerate() {
        cumulative += p;
        if cumulative > r {
            return idx;
        }
    }

    // Rounding can leave the total a hair under 1.0; fall back to the
    // most probable entry.
    let mut best = 0usize;
    let mut best_prob = f32::NEG_INFINITY;
    for (idx, &p) in probs.iter().enumerate() {
        if p > best_prob {
            best_prob = p;
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    use super::*;

    /// Emits only zero bits, so `gen_range(0.0..1.0)` returns exactly 0.0.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    #[test]
    fn test_suppress_eos_below_min_length() {
        let mut logits = vec![0.0, 1.0, 2.0];
        suppress_eos(&mut logits, 2, 3, 5);
        assert_eq!(logits[2], f32::NEG_INFINITY);
        assert_eq!(logits[0], 0.0);
    }

    #[test]
    fn test_suppress_eos_noop_at_min_length() {
        let mut logits = vec![0.0, 1.0, 2.0];
        suppress_eos(&mut logits, 2, 5, 5);
        assert_eq!(logits, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_suppress_eos_out_of_range_id() {
        let mut logits = vec![0.0, 1.0];
        suppress_eos(&mut logits, 99, 0, 5);
        assert_eq!(logits, vec![0.0, 1.0]);
    }

    #[test]
    fn test_top_k_keeps_k_best() {
        let mut logits = vec![1.0, 4.0, 2.0, 3.0];
        top_k_filter(&mut logits, 2);
        assert_eq!(
            logits,
            vec![f32::NEG_INFINITY, 4.0, f32::NEG_INFINITY, 3.0]
        );
    }

    #[test]
    fn test_top_k_retains_boundary_ties() {
        let mut logits = vec![5.0, 3.0, 3.0, 1.0];
        top_k_filter(&mut logits, 2);
        // The 2nd-highest value is 3.0 and both 3.0 entries survive.
        assert_eq!(logits, vec![5.0, 3.0, 3.0, f32::NEG_INFINITY]);
    }

    #[test]
    fn test_top_k_at_least_vocab_is_noop() {
        let original = vec![1.0, 2.0, 3.0];
        for k in [3, 4, 100] {
            let mut logits = original.clone();
            top_k_filter(&mut logits, k);
            assert_eq!(logits, original);
        }
    }

    #[test]
    fn test_top_k_zero_clamps_to_one() {
        let mut logits = vec![1.0, 4.0, 2.0];
        top_k_filter(&mut logits, 0);
        assert_eq!(logits, vec![f32::NEG_INFINITY, 4.0, f32::NEG_INFINITY]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[0.5, -1.0, 3.0, 2.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_softmax_zeroes_filtered_entries() {
        let probs = softmax(&[2.0, f32::NEG_INFINITY, 1.0]);
        assert_eq!(probs[1], 0.0);
        assert!(probs[0] > probs[2]);
    }

    #[test]
    fn test_sample_index_respects_mass() {
        // All mass on one entry: every draw picks it.
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            assert_eq!(sample_index(&[0.0, 1.0, 0.0], &mut rng), 1);
        }
    }

    #[test]
    fn test_sample_index_zero_draw_skips_zero_mass() {
        // A draw of exactly 0.0 must not land on entries with zero
        // probability ahead of the first carrier of mass.
        assert_eq!(sample_index(&[0.0, 0.0, 1.0], &mut ZeroRng), 2);
        assert_eq!(sample_index(&[0.0, 0.4, 0.6], &mut ZeroRng), 1);
        assert_eq!(sample_index(&[1.0, 0.0, 0.0], &mut ZeroRng), 0);
    }

    #[test]
    fn test_sample_index_is_seed_deterministic() {
        let probs = softmax(&[1.0, 1.1, 0.9, 1.2]);
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let draws_a: Vec<usize> = (0..16).map(|_| sample_index(&probs, &mut a)).collect();
        let draws_b: Vec<usize> = (0..16).map(|_| sample_index(&probs, &mut b)).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_top_k_one_then_sample_is_argmax() {
        let mut logits = vec![0.3, 2.5, 1.1, 2.4];
        top_k_filter(&mut logits, 1);
        let probs = softmax(&logits);
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..16 {
            assert_eq!(sample_index(&probs, &mut rng), 1);
        }
    }
}
