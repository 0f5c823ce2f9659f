//! C2: Chunked FFT Scorer.
//!
//! Evaluates, for every alignment position in a template strand, the
//! corrected positional inner product of spec.md §4.1 via block
//! convolution (spec.md §4.2), using `rustfft` in place of the reference
//! implementation's `scipy.fftpack`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::mapper;

/// Smallest power of two `>= n` (n >= 1).
fn next_pow2(n: usize) -> usize {
    let mut c = 1usize;
    while c < n {
        c <<= 1;
    }
    c
}

/// Smallest power of two strictly greater than `n`.
fn next_pow2_above(n: usize) -> usize {
    let c = next_pow2(n.max(1));
    if c > n {
        c
    } else {
        c << 1
    }
}

/// Chosen chunk size `C`: a power of two with `C >= 2*L`, minimized
/// subject to `t mod (C-L) <= C/2 + 1`, capped at `max_chunk_size`
/// (spec.md §4.2).
pub fn calculate_chunk_size(t_len: usize, p_len: usize, max_chunk_size: usize) -> usize {
    let min_chunk = next_pow2_above(2 * p_len);
    let mut chunk = if t_len <= max_chunk_size {
        let c = next_pow2(t_len.max(1));
        if t_len != 0 && c % t_len == 0 {
            return c.max(min_chunk);
        }
        c
    } else {
        max_chunk_size
    };
    chunk = chunk.max(min_chunk);

    let rem = |c: usize| -> usize {
        let stride = c - p_len;
        if stride == 0 {
            0
        } else {
            t_len % stride
        }
    };

    let mut r = rem(chunk);
    let mut max_rem = chunk / 2 + 1;
    while r > max_rem && chunk > min_chunk {
        chunk /= 2;
        r = rem(chunk);
        max_rem = chunk / 2 + 1;
    }
    chunk.max(min_chunk)
}

/// Precomputed forward FFTs of a primer's AT/GC channels, plus the FFT
/// plans needed to score any number of template chunks against it.
pub struct PrimerFft {
    pub chunk_size: usize,
    at: Vec<Complex64>,
    gc: Vec<Complex64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl PrimerFft {
    pub fn plan(pattern: &[u8], chunk_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(chunk_size);
        let inverse = planner.plan_fft_inverse(chunk_size);
        let (mut at, mut gc) = mapper::map_primer(pattern, chunk_size);
        forward.process(&mut at);
        forward.process(&mut gc);
        PrimerFft {
            chunk_size,
            at,
            gc,
            forward,
            inverse,
        }
    }
}

/// Score one chunk of a template strand against a precomputed primer FFT,
/// returning the corrected match-count score for the chunk's stride
/// (first `chunk_size - p_len` positions; the rest belongs to the next
/// chunk's overlap).
pub fn find_in_chunk(template_chunk: &[u8], primer: &PrimerFft, p_len: usize, chunk_stride: usize) -> Vec<f64> {
    let chunk_size = primer.chunk_size;
    let (mut t_at, mut t_gc) = mapper::map_template_chunk(template_chunk, chunk_size);
    t_at.reverse();
    t_gc.reverse();
    primer.forward.process(&mut t_at);
    primer.forward.process(&mut t_gc);
    for i in 0..chunk_size {
        t_at[i] *= primer.at[i];
        t_gc[i] *= primer.gc[i];
    }
    primer.inverse.process(&mut t_at);
    primer.inverse.process(&mut t_gc);

    let norm = 1.0 / chunk_size as f64;
    let l_over_3 = p_len as f64 / 3.0;
    let mut combined: Vec<f64> = (0..chunk_size)
        .map(|i| (t_at[i].re + t_gc[i].re) * norm)
        .collect();
    combined.reverse();
    combined.truncate(chunk_stride);
    for v in combined.iter_mut() {
        *v = *v + l_over_3 - *v / 3.0;
    }
    combined
}

/// Score an entire strand (forward or reverse-complement bytes) against a
/// primer, returning exactly `seq.len()` scores. Returns `None` if the
/// abort flag fires at a chunk boundary.
pub fn score_strand(
    seq: &[u8],
    primer: &PrimerFft,
    p_len: usize,
    chunk_stride: usize,
    abort: &AtomicBool,
) -> Option<Vec<f64>> {
    let t_len = seq.len();
    let mut scores = Vec::with_capacity(t_len + primer.chunk_size);
    let mut pos = 0usize;
    while pos < t_len {
        if abort.load(Ordering::Relaxed) {
            return None;
        }
        let front = (pos + primer.chunk_size).min(t_len);
        let chunk_scores = find_in_chunk(&seq[pos..front], primer, p_len, chunk_stride);
        scores.extend_from_slice(&chunk_scores);
        pos += chunk_stride;
    }
    scores.truncate(t_len);
    Some(scores)
}

/// Candidate positions (0-based) whose score clears the mismatch-budget
/// threshold of spec.md §4.2: `score >= max(1, L - k) - 0.5`.
pub fn threshold_positions(scores: &[f64], p_len: usize, t_len: usize, max_mismatches: usize) -> Vec<usize> {
    let threshold = (p_len as i64 - max_mismatches as i64).max(1) as f64 - 0.5;
    let usable = t_len.saturating_sub(p_len).saturating_add(1).min(scores.len());
    (0..usable).filter(|&i| scores[i] >= threshold).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Template;

    fn score_template(template: &[u8], primer: &[u8]) -> Vec<f64> {
        let p_len = primer.len();
        let chunk_size = calculate_chunk_size(template.len(), p_len, 1 << 12);
        let chunk_stride = chunk_size - p_len;
        let pfft = PrimerFft::plan(primer, chunk_size);
        let abort = AtomicBool::new(false);
        score_strand(template, &pfft, p_len, chunk_stride, &abort).unwrap()
    }

    #[test]
    fn exact_unambiguous_match_scores_full_length() {
        let primer = b"ACGTACGT";
        let template = Template::new("t", b"TTTTACGTACGTTTTT");
        let scores = score_template(template.forward(), primer);
        let pos = scores
            .iter()
            .position(|&s| (s - primer.len() as f64).abs() < 1e-6);
        assert!(pos.is_some());
        assert_eq!(pos.unwrap(), 4);
    }

    #[test]
    fn one_mismatch_scores_length_minus_one() {
        // "ACGTACGT" vs template containing "ACGTTCGT" (mismatch at idx 4)
        let primer = b"ACGTACGT";
        let template = Template::new("t", b"TTTTACGTTCGTTTTT");
        let scores = score_template(template.forward(), primer);
        let best = scores.iter().cloned().fold(f64::MIN, f64::max);
        assert!((best - 7.0).abs() < 1e-3);
    }

    #[test]
    fn chunk_size_is_power_of_two_and_at_least_2l() {
        for (t_len, p_len) in [(100usize, 10usize), (5000, 20), (2_000_000, 25)] {
            let c = calculate_chunk_size(t_len, p_len, 1 << 12);
            assert!(c.is_power_of_two());
            assert!(c >= 2 * p_len);
        }
    }

    #[test]
    fn threshold_accepts_exact_matches() {
        let scores = vec![20.0, 19.5, 10.0];
        let positions = threshold_positions(&scores, 20, 22, 0);
        assert_eq!(positions, vec![0, 1]);
    }
}
