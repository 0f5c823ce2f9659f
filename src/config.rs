//! Immutable configuration threaded through the matcher and simulator.
//!
//! Per the design note "Configuration": rather than mutating process-wide
//! thermodynamic constants, a single `PcrConfig` value is constructed once
//! and passed by reference into `assembler` and `kinetics`. It never
//! changes for the duration of one analysis.

/// Minimum equilibrium constant below which a potential binding is
/// discarded as thermodynamically uninteresting.
pub const K_MIN: f64 = 100.0;

/// Products with quantity less than `max_quantity * MIN_QUANTITY_FACTOR`
/// are dropped from the final report.
pub const MIN_QUANTITY_FACTOR: f64 = 1e-3;

/// Hard cap on the FFT chunk size used by the scorer (2^12).
pub const MAX_CHUNK_SIZE: usize = 1 << 12;

/// mol/(U*min) yield constant for polymerase throughput, per spec.md's
/// open question: this value is carried over from the source system
/// unchanged; it is unclear whether it is calibrated against a specific
/// enzyme or a placeholder. Do not "fix" it without new evidence.
pub const POLYMERASE_YIELD_CONSTANT: f64 = 1e-8;

/// Reference window, in minutes, against which polymerase throughput is
/// measured (elongation time is `max_amplicon / 1000` minutes, i.e.
/// polymerase is assumed to extend at 1 kb/min).
pub const POLYMERASE_REFERENCE_WINDOW_MIN: f64 = 30.0;

/// Gas constant, cal/(K*mol).
pub const GAS_CONSTANT: f64 = 1.9872;

/// Absolute zero, in degrees Celsius.
pub const ABSOLUTE_ZERO_C: f64 = -273.15;

/// Electrophoresis/histogram window, expressed as a fraction of the
/// longest product's length. Owned by the out-of-scope report formatter;
/// kept here only as the named constant spec.md assigns it.
pub const ELECTROPHORESIS_WINDOW_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcrConfig {
    /// Minimum amplicon length, inclusive.
    pub min_amplicon: usize,
    /// Maximum amplicon length, inclusive.
    pub max_amplicon: usize,
    /// Polymerase concentration, Units per liter.
    pub polymerase_activity: f64,
    /// Whether the polymerase has 3'-5' exonuclease (proofreading) activity.
    pub with_exonuclease: bool,
    /// Number of thermocycles to simulate.
    pub num_cycles: u32,
    /// Maximum mismatches tolerated by the approximate matcher.
    pub max_mismatches: usize,
    /// Total dNTP concentration (per-base), mol/L.
    pub c_dntp: f64,
    /// Bulk template DNA concentration presented to the equilibrium
    /// solver for each footprint, mol/L.
    pub c_dna: f64,
    /// Reaction temperature, degrees Celsius.
    pub pcr_temp_c: f64,
    /// Minimum equilibrium constant accepted by the product enumerator.
    pub k_min: f64,
    /// Quantity-based filtering factor.
    pub min_quantity_factor: f64,
    /// Chunk-size cap for the FFT scorer.
    pub max_chunk_size: usize,
}

impl Default for PcrConfig {
    fn default() -> Self {
        PcrConfig {
            min_amplicon: 1,
            max_amplicon: 3000,
            polymerase_activity: 0.01 * 1e6,
            with_exonuclease: false,
            num_cycles: 20,
            max_mismatches: 0,
            c_dntp: 0.2e-3,
            c_dna: 1e-10,
            pcr_temp_c: 60.0,
            k_min: K_MIN,
            min_quantity_factor: MIN_QUANTITY_FACTOR,
            max_chunk_size: MAX_CHUNK_SIZE,
        }
    }
}

impl PcrConfig {
    /// Elongation time, in minutes, at the assumed 1 kb/min polymerase speed.
    pub fn elongation_minutes(&self) -> f64 {
        self.max_amplicon as f64 / 1000.0
    }

    /// Reaction temperature in Kelvin.
    pub fn temp_kelvin(&self) -> f64 {
        self.pcr_temp_c - ABSOLUTE_ZERO_C
    }

    /// Maximum dNTP consumption the polymerase can sustain in one cycle,
    /// per spec.md §4.5: `polymerase_activity * 1e-8 * elongation_minutes / 30`.
    pub fn max_polymerase_consumption(&self) -> f64 {
        self.polymerase_activity * POLYMERASE_YIELD_CONSTANT * self.elongation_minutes()
            / POLYMERASE_REFERENCE_WINDOW_MIN
    }
}
