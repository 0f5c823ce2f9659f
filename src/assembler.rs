//! C3: Match Assembler.
//!
//! Thresholds FFT scores to candidate positions (already done by
//! `fft_scorer::threshold_positions`), then invokes the Duplex Evaluator
//! (E1) on every unambiguous primer variant at each candidate, keeping
//! only the variants that actually form a duplex.

use crate::duplex::{Duplex, DuplexEvaluator};
use crate::primer::Primer;
use crate::template::reverse_complement_bytes;

/// One annealing site: a 1-based position on the strand being scanned,
/// plus every primer variant that forms a duplex there.
#[derive(Debug, Clone)]
pub struct AnnealingSite {
    pub position: usize,
    pub duplexes: Vec<(Duplex, String)>,
}

/// Evaluate every candidate position against every variant of `primer`,
/// keeping only sites with at least one surviving variant. `strand` is
/// the strand bytes (forward or reverse-complement) the candidates were
/// computed against. `candidates` holds 0-based offsets as produced by
/// `fft_scorer::threshold_positions`.
pub fn assemble(
    strand: &[u8],
    candidates: &[usize],
    primer: &Primer,
    evaluator: &dyn DuplexEvaluator,
) -> Vec<AnnealingSite> {
    let p_len = primer.len();
    let mut sites: Vec<AnnealingSite> = candidates
        .iter()
        .filter_map(|&offset| {
            let window = &strand[offset..offset + p_len];
            let window_revcomp = reverse_complement_bytes(window);
            let duplexes: Vec<(Duplex, String)> = primer
                .variants
                .iter()
                .filter_map(|variant| {
                    evaluator
                        .evaluate(&variant.seq, &window_revcomp)
                        .map(|d| (d, variant.id.clone()))
                })
                .collect();
            if duplexes.is_empty() {
                None
            } else {
                Some(AnnealingSite {
                    position: offset + 1,
                    duplexes,
                })
            }
        })
        .collect();
    sites.sort_by_key(|s| s.position);
    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplex::{NearestNeighborDuplexEvaluator, SaltConditions};

    #[test]
    fn exact_match_produces_one_site_with_one_variant() {
        let primer = Primer::new("f", b"ACGTACGT", 1e-6).unwrap();
        let evaluator = NearestNeighborDuplexEvaluator::new(SaltConditions::default()).unwrap();
        let strand = b"TTTTACGTACGTTTTT";
        let sites = assemble(strand, &[4], &primer, &evaluator);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].position, 5);
        assert_eq!(sites[0].duplexes.len(), 1);
    }

    #[test]
    fn degenerate_primer_can_surface_multiple_variants() {
        // N at the last position matches any template base, so all 4
        // variants should form a duplex against a fixed template window.
        let primer = Primer::new("f", b"ACGTACGN", 1e-6).unwrap();
        let evaluator = NearestNeighborDuplexEvaluator::new(SaltConditions::default()).unwrap();
        let strand = b"TTTTACGTACGTTTTT";
        let sites = assemble(strand, &[4], &primer, &evaluator);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].duplexes.len(), 4);
    }

    #[test]
    fn sites_are_sorted_by_position() {
        let primer = Primer::new("f", b"ACGT", 1e-6).unwrap();
        let evaluator = NearestNeighborDuplexEvaluator::new(SaltConditions::default()).unwrap();
        let strand = b"ACGTTTTTACGT";
        let sites = assemble(strand, &[8, 0], &primer, &evaluator);
        assert_eq!(sites.len(), 2);
        assert!(sites[0].position < sites[1].position);
    }
}
