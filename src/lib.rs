//! Degenerate-primer annealing search and PCR kinetics simulation.
//!
//! Pipeline: `(fwd_primer, rev_primer, templates)` -> [`harness::find`]
//! (C1 mapper, C2 FFT scorer, C3 match assembler, parallelized by C6) ->
//! annealing sites -> [`product::enumerate_products`] (C4) -> candidate
//! products -> [`kinetics::simulate_template`] (C5, driven by an
//! [`equilibrium::EquilibriumSolver`]) -> products with per-cycle
//! quantities.

pub mod assembler;
pub mod config;
pub mod duplex;
pub mod equilibrium;
pub mod error;
pub mod fft_scorer;
pub mod harness;
pub mod io;
pub mod kinetics;
pub mod mapper;
pub mod primer;
pub mod product;
pub mod progress;
pub mod region;
pub mod template;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use duplex::DuplexEvaluator;
use equilibrium::{EquilibriumSolver, ReactantKey, Reaction};
use error::CoreResult;
use kinetics::ReactionEnd;
use primer::Primer;
use product::Product;
use template::Template;

/// Forward/reverse annealing sites for one primer against one template,
/// per spec.md §6's `find` output.
pub struct FindResult {
    pub fwd_sites: Vec<assembler::AnnealingSite>,
    pub rev_sites: Vec<assembler::AnnealingSite>,
}

/// `find(template, primer, k)`: locate every annealing site of `primer`
/// on `template` at up to `config.max_mismatches` mismatches.
pub fn find(
    template: &Template,
    primer: &Primer,
    evaluator: &dyn DuplexEvaluator,
    config: &config::PcrConfig,
    num_threads: usize,
    abort: &Arc<AtomicBool>,
) -> CoreResult<FindResult> {
    let (fwd_sites, rev_sites) = harness::find(template, primer, evaluator, config, num_threads, abort)?;
    Ok(FindResult { fwd_sites, rev_sites })
}

/// `batch_find(templates, primer, k)`: `find` fanned out one template
/// per worker.
pub fn batch_find(
    templates: &[Template],
    primer: &Primer,
    evaluator: &dyn DuplexEvaluator,
    config: &config::PcrConfig,
    num_threads: usize,
    abort: &Arc<AtomicBool>,
) -> CoreResult<HashMap<String, FindResult>> {
    let results = harness::batch_find(templates, primer, evaluator, config, num_threads, abort)?;
    Ok(results
        .into_iter()
        .map(|(id, fwd, rev)| (id, FindResult { fwd_sites: fwd, rev_sites: rev }))
        .collect())
}

/// Final output of a full analysis run, per spec.md §6.
pub struct PcrSimulationResult {
    pub products: HashMap<String, HashMap<(String, usize, usize), Product>>,
    pub reaction_ends: HashMap<String, ReactionEnd>,
    pub max_objective_value: f64,
}

/// Run the whole pipeline — matching, product enumeration, and cycle
/// kinetics — for one forward/reverse primer pair against every
/// template, mirroring `PCR_Simulation.run()`'s top-level entry point.
///
/// `side_reactions`/`side_concentrations` are pre-computed competing
/// equilibria (hairpins, self-dimers, cross-dimers) merged into every
/// template's system before its equilibrium solve, per spec.md §6; pass
/// empty slices/maps when there are none to contribute.
pub fn run(
    fwd_primer: &Primer,
    rev_primer: &Primer,
    templates: &[Template],
    evaluator: &dyn DuplexEvaluator,
    solver: &dyn EquilibriumSolver,
    config: &config::PcrConfig,
    num_threads: usize,
    abort: &Arc<AtomicBool>,
    side_reactions: &[Reaction],
    side_concentrations: &HashMap<ReactantKey, f64>,
) -> CoreResult<PcrSimulationResult> {
    let mut products_out: HashMap<String, HashMap<(String, usize, usize), Product>> = HashMap::new();
    let mut reaction_ends: HashMap<String, ReactionEnd> = HashMap::new();
    let mut max_objective_value = 0.0_f64;

    for template in templates {
        let (fwd_sites, _) = harness::find(template, fwd_primer, evaluator, config, num_threads, abort)?;
        let (_, rev_sites) = harness::find(template, rev_primer, evaluator, config, num_threads, abort)?;

        let candidates = product::enumerate_products(
            &template.id,
            &fwd_sites,
            &rev_sites,
            fwd_primer,
            rev_primer,
            config,
        );
        if candidates.is_empty() {
            continue;
        }

        if let Some((products, reaction_end, objective)) = kinetics::simulate_template(
            &template.id,
            candidates,
            fwd_primer,
            rev_primer,
            config,
            solver,
            side_reactions,
            side_concentrations,
        ) {
            max_objective_value = max_objective_value.max(objective);
            let mut by_key: HashMap<(String, usize, usize), Product> = HashMap::new();
            for product in products {
                by_key.insert((product.template_id.clone(), product.start, product.end), product);
            }
            products_out.insert(template.id.clone(), by_key);
            reaction_ends.insert(template.id.clone(), reaction_end);
        }
    }

    Ok(PcrSimulationResult { products: products_out, reaction_ends, max_objective_value })
}
