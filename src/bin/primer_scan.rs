//! CLI front-end wiring FASTA I/O, the matcher, and the kinetics engine
//! together, in the same shape as the teacher crate's `main_fullsalt`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use degen_pcr::config::PcrConfig;
use degen_pcr::duplex::{NearestNeighborDuplexEvaluator, SaltConditions};
use degen_pcr::equilibrium::FixedPointEquilibriumSolver;
use degen_pcr::io;

#[derive(Parser, Debug)]
#[command(name = "primer_scan", about = "Degenerate-primer PCR amplicon prediction")]
struct Args {
    /// FASTA file with the forward primer (first record used).
    #[arg(long)]
    fwd_primer: String,

    /// FASTA file with the reverse primer (first record used).
    #[arg(long)]
    rev_primer: String,

    /// FASTA file with one or more template sequences.
    #[arg(long)]
    templates: String,

    /// Forward primer concentration, mol/L.
    #[arg(long, default_value_t = 1e-7)]
    fwd_concentration: f64,

    /// Reverse primer concentration, mol/L.
    #[arg(long, default_value_t = 1e-7)]
    rev_concentration: f64,

    /// Maximum mismatches tolerated by the approximate matcher.
    #[arg(long, default_value_t = 0)]
    max_mismatches: usize,

    /// Minimum amplicon length, inclusive.
    #[arg(long, default_value_t = 1)]
    min_amplicon: usize,

    /// Maximum amplicon length, inclusive.
    #[arg(long, default_value_t = 3000)]
    max_amplicon: usize,

    /// Polymerase activity, U/L.
    #[arg(long, default_value_t = 0.01e6)]
    polymerase_activity: f64,

    /// Whether the polymerase has 3'-5' exonuclease activity.
    #[arg(long, default_value_t = false)]
    with_exonuclease: bool,

    /// Number of thermocycles to simulate.
    #[arg(long, default_value_t = 20)]
    num_cycles: u32,

    /// Reaction temperature, degrees Celsius.
    #[arg(long, default_value_t = 60.0)]
    pcr_temp_c: f64,

    /// Worker thread count for the matcher.
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let fwd_primer = io::load_primer(&args.fwd_primer, args.fwd_concentration, "fwd")
        .with_context(|| format!("loading forward primer from '{}'", args.fwd_primer))?;
    let rev_primer = io::load_primer(&args.rev_primer, args.rev_concentration, "rev")
        .with_context(|| format!("loading reverse primer from '{}'", args.rev_primer))?;
    let templates = io::load_templates(&args.templates)
        .with_context(|| format!("loading templates from '{}'", args.templates))?;

    let config = PcrConfig {
        min_amplicon: args.min_amplicon,
        max_amplicon: args.max_amplicon,
        polymerase_activity: args.polymerase_activity,
        with_exonuclease: args.with_exonuclease,
        num_cycles: args.num_cycles,
        max_mismatches: args.max_mismatches,
        pcr_temp_c: args.pcr_temp_c,
        ..PcrConfig::default()
    };

    let conditions = SaltConditions { temp_c: args.pcr_temp_c, ..SaltConditions::default() };
    let evaluator = NearestNeighborDuplexEvaluator::new(conditions)
        .context("constructing the nearest-neighbor duplex evaluator")?;
    let solver = FixedPointEquilibriumSolver::default();

    let threads = if args.threads == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        args.threads
    };
    let abort = Arc::new(AtomicBool::new(false));

    let result = degen_pcr::run(
        &fwd_primer,
        &rev_primer,
        &templates,
        &evaluator,
        &solver,
        &config,
        threads,
        &abort,
        &[],
        &std::collections::HashMap::new(),
    )
    .context("running the PCR simulation")?;

    for (template_id, products) in &result.products {
        for product in products.values() {
            println!(
                "{template_id}\t{}\t{}\t{:.3e}\t{}",
                product.start, product.end, product.quantity, product.cycles_active
            );
        }
    }
    log::info!("max equilibrium objective residual: {:.3e}", result.max_objective_value);

    Ok(())
}
