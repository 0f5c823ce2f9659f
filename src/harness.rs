//! C6: Parallel Work Harness.
//!
//! Fans C2/C3 out across disjoint template slices on a dedicated
//! `rayon::ThreadPool`, in the style of `oligoscreen_differential`'s
//! `analyze_length` (explicit pool, `Arc`-shared read-only inputs,
//! ordered reassembly) generalized to the chunked-FFT/duplex pipeline,
//! plus `rust_search`'s `into_par_iter().step_by(...)` chunk striding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::assembler::{self, AnnealingSite};
use crate::config::PcrConfig;
use crate::duplex::DuplexEvaluator;
use crate::error::{CoreError, CoreResult};
use crate::fft_scorer::{self, PrimerFft};
use crate::primer::Primer;
use crate::template::Template;

/// Number of slices to split a template of length `t` into when scoring
/// a primer of length `l`, per spec.md §4.6.
fn slice_count(t: usize, l: usize, cpu: usize) -> usize {
    if l == 0 || t == 0 {
        return 1;
    }
    let raw = (cpu as f64).max((1.75 + 1.75e-5 * t as f64).ceil());
    let bounded = raw.min(60.0).min((t as f64 / l as f64).floor());
    bounded.max(1.0) as usize
}

/// True iff the parallel path is worth its setup cost, per spec.md §4.6.
fn parallel_worthwhile(cpu: usize, t: usize) -> bool {
    cpu > 1 && t > 25_000
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

struct ScoredSlice {
    slice_start: usize,
    scores: Vec<f64>,
}

fn score_one_strand(
    strand: &[u8],
    primer_fft: &PrimerFft,
    p_len: usize,
    chunk_stride: usize,
    num_slices: usize,
    abort: &AtomicBool,
) -> CoreResult<Vec<f64>> {
    let t_len = strand.len();
    if num_slices <= 1 {
        return fft_scorer::score_strand(strand, primer_fft, p_len, chunk_stride, abort)
            .ok_or(CoreError::Cancelled);
    }

    let slice_len = t_len / num_slices + p_len + 1;
    let starts: Vec<usize> = (0..t_len).step_by(slice_len.max(1)).collect();

    let pieces: Vec<Option<ScoredSlice>> = starts
        .into_par_iter()
        .map(|start| {
            if abort.load(Ordering::Relaxed) {
                return None;
            }
            let end = (start + slice_len).min(t_len);
            let slice_scores =
                fft_scorer::score_strand(&strand[start..end], primer_fft, p_len, chunk_stride, abort)?;
            Some(ScoredSlice { slice_start: start, scores: slice_scores })
        })
        .collect();

    let mut pieces: Vec<ScoredSlice> = match pieces.into_iter().collect::<Option<Vec<_>>>() {
        Some(p) => p,
        None => return Err(CoreError::Cancelled),
    };
    pieces.sort_by_key(|p| p.slice_start);

    let mut scores = Vec::with_capacity(t_len);
    for piece in pieces.drain(..) {
        scores.extend(piece.scores);
    }
    scores.truncate(t_len);
    Ok(scores)
}

/// Run C3 as a second parallel fan-out over `candidates`, one shard per
/// slice of the candidate-position list, per spec.md §4.6. Falls back to
/// a single synchronous call when `num_slices <= 1` or there are too few
/// candidates to shard usefully.
fn assemble_sharded(
    strand: &[u8],
    candidates: &[usize],
    primer: &Primer,
    evaluator: &dyn DuplexEvaluator,
    num_slices: usize,
) -> Vec<AnnealingSite> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let num_slices = num_slices.max(1).min(candidates.len());
    if num_slices <= 1 {
        return assembler::assemble(strand, candidates, primer, evaluator);
    }

    let shard_len = (candidates.len() + num_slices - 1) / num_slices;
    let mut sites: Vec<AnnealingSite> = candidates
        .chunks(shard_len.max(1))
        .collect::<Vec<_>>()
        .into_par_iter()
        .flat_map(|shard| assembler::assemble(strand, shard, primer, evaluator))
        .collect();
    sites.sort_by_key(|s| s.position);
    sites
}

/// Find every annealing site of `primer` on `template`, forward and
/// reverse-complement strands, using up to `num_threads` workers.
/// Reverse-strand positions are mirrored back into forward-strand
/// coordinates before the assembler runs (spec.md P3).
pub fn find(
    template: &Template,
    primer: &Primer,
    evaluator: &dyn DuplexEvaluator,
    config: &PcrConfig,
    num_threads: usize,
    abort: &Arc<AtomicBool>,
) -> CoreResult<(Vec<AnnealingSite>, Vec<AnnealingSite>)> {
    let p_len = primer.len();
    let t_len = template.len();
    if p_len == 0 || p_len > t_len {
        return Err(CoreError::InputShape(format!(
            "primer '{}' (len {}) does not fit template '{}' (len {})",
            primer.id, p_len, template.id, t_len
        )));
    }

    let cpu = available_parallelism().max(num_threads.max(1));
    let use_parallel = parallel_worthwhile(cpu, t_len);
    let num_slices = if use_parallel { slice_count(t_len, p_len, cpu) } else { 1 };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.max(1))
        .build()
        .map_err(|e| CoreError::WorkerPanic(e.to_string()))?;

    let chunk_size = fft_scorer::calculate_chunk_size(t_len, p_len, config.max_chunk_size);
    let chunk_stride = chunk_size - p_len;
    let primer_fft = Arc::new(PrimerFft::plan(&primer.master_sequence, chunk_size));

    let forward = Arc::new(template.forward().to_vec());
    let reverse = Arc::new(template.reverse_complement().to_vec());
    let abort_fwd = Arc::clone(abort);
    let abort_rev = Arc::clone(abort);
    let fft_fwd = Arc::clone(&primer_fft);
    let fft_rev = Arc::clone(&primer_fft);
    let fwd_strand = Arc::clone(&forward);
    let rev_strand = Arc::clone(&reverse);

    let (fwd_scores, rev_scores): (CoreResult<Vec<f64>>, CoreResult<Vec<f64>>) = pool.install(|| {
        rayon::join(
            || score_one_strand(&fwd_strand, &fft_fwd, p_len, chunk_stride, num_slices, &abort_fwd),
            || score_one_strand(&rev_strand, &fft_rev, p_len, chunk_stride, num_slices, &abort_rev),
        )
    });
    let fwd_scores = fwd_scores?;
    let rev_scores = rev_scores?;

    if abort.load(Ordering::Relaxed) {
        return Err(CoreError::Cancelled);
    }

    let fwd_candidates = fft_scorer::threshold_positions(&fwd_scores, p_len, t_len, config.max_mismatches);
    let rev_candidates = fft_scorer::threshold_positions(&rev_scores, p_len, t_len, config.max_mismatches);

    let fwd_sites =
        pool.install(|| assemble_sharded(&forward, &fwd_candidates, primer, evaluator, num_slices));
    let rev_sites_raw =
        pool.install(|| assemble_sharded(&reverse, &rev_candidates, primer, evaluator, num_slices));

    // Mirror reverse-strand sites into forward-strand coordinates:
    // t - (pos + L) + 1, where `pos` is the 1-based reverse-strand site.
    let mut rev_sites: Vec<AnnealingSite> = rev_sites_raw
        .into_iter()
        .map(|mut site| {
            site.position = t_len - (site.position + p_len) + 1;
            site
        })
        .collect();
    rev_sites.sort_by_key(|s| s.position);

    Ok((fwd_sites, rev_sites))
}

/// Run `find` over many templates, one template per worker, each
/// template's own scoring kept single-threaded (spec.md §4.6 batch mode).
pub fn batch_find(
    templates: &[Template],
    primer: &Primer,
    evaluator: &dyn DuplexEvaluator,
    config: &PcrConfig,
    num_threads: usize,
    abort: &Arc<AtomicBool>,
) -> CoreResult<Vec<(String, Vec<AnnealingSite>, Vec<AnnealingSite>)>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.max(1))
        .build()
        .map_err(|e| CoreError::WorkerPanic(e.to_string()))?;

    pool.install(|| {
        templates
            .par_iter()
            .map(|template| {
                let (fwd, rev) = find(template, primer, evaluator, config, 1, abort)?;
                Ok((template.id.clone(), fwd, rev))
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplex::{NearestNeighborDuplexEvaluator, SaltConditions};

    #[test]
    fn slice_count_is_at_least_one() {
        assert_eq!(slice_count(0, 10, 4), 1);
        assert!(slice_count(1_000_000, 20, 4) >= 1);
    }

    #[test]
    fn parallel_not_worthwhile_for_small_templates() {
        assert!(!parallel_worthwhile(8, 1000));
        assert!(!parallel_worthwhile(1, 100_000));
    }

    #[test]
    fn find_locates_exact_match_on_small_template() {
        let template = Template::new("t1", b"TTTTACGTACGTACGTACGTTTTT");
        let primer = Primer::new("p", b"ACGTACGTACGTACGT", 1e-6).unwrap();
        let evaluator = NearestNeighborDuplexEvaluator::new(SaltConditions::default()).unwrap();
        let config = PcrConfig::default();
        let abort = Arc::new(AtomicBool::new(false));
        let (fwd, rev) = find(&template, &primer, &evaluator, &config, 1, &abort).unwrap();
        assert!(!fwd.is_empty());
        assert!(rev.is_empty() || !rev.is_empty());
    }

    #[test]
    fn sharded_assembly_matches_single_shard_result() {
        let strand = b"TTTTACGTACGTTTTTACGTACGTTTTTACGTACGTTTTT";
        let primer = Primer::new("p", b"ACGTACGT", 1e-6).unwrap();
        let evaluator = NearestNeighborDuplexEvaluator::new(SaltConditions::default()).unwrap();
        let candidates: Vec<usize> = (0..strand.len().saturating_sub(primer.len())).collect();

        let single = assemble_sharded(strand, &candidates, &primer, &evaluator, 1);
        let mut sharded = assemble_sharded(strand, &candidates, &primer, &evaluator, 4);
        sharded.sort_by_key(|s| s.position);

        assert_eq!(single.len(), sharded.len());
        for (a, b) in single.iter().zip(sharded.iter()) {
            assert_eq!(a.position, b.position);
        }
    }

    #[test]
    fn primer_longer_than_template_is_rejected() {
        let template = Template::new("t1", b"ACGT");
        let primer = Primer::new("p", b"ACGTACGTACGT", 1e-6).unwrap();
        let evaluator = NearestNeighborDuplexEvaluator::new(SaltConditions::default()).unwrap();
        let config = PcrConfig::default();
        let abort = Arc::new(AtomicBool::new(false));
        assert!(find(&template, &primer, &evaluator, &config, 1, &abort).is_err());
    }

    #[test]
    fn cancellation_returns_early() {
        let template = Template::new("t1", &vec![b'A'; 200_000]);
        let primer = Primer::new("p", b"ACGTACGTACGTACGT", 1e-6).unwrap();
        let evaluator = NearestNeighborDuplexEvaluator::new(SaltConditions::default()).unwrap();
        let config = PcrConfig::default();
        let abort = Arc::new(AtomicBool::new(true));
        let result = find(&template, &primer, &evaluator, &config, 2, &abort);
        assert!(result.is_err());
    }
}
