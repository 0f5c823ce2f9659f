//! E2: the Equilibrium Solver. spec.md treats this as an external,
//! non-parallelized service: given reactions and total concentrations, it
//! returns per-reaction product concentrations and an objective-function
//! residual. This module defines the trait C5 depends on plus one
//! concrete damped-iteration solver.

use std::collections::HashMap;

/// Stable identifier for a reactant: a hash of either a primer variant
/// sequence or a template footprint (Design Note "Cyclic structures").
pub type ReactantKey = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    /// A primer/template-footprint duplex.
    Duplex,
    /// A competing side equilibrium (hairpin, self-dimer, cross-dimer).
    Side,
}

/// A symbolic reaction `reactant_a + reactant_b <=> product`, with
/// equilibrium constant `k`.
#[derive(Debug, Clone, Copy)]
pub struct Reaction {
    pub k: f64,
    pub reactant_a: ReactantKey,
    pub reactant_b: ReactantKey,
    pub product: ReactantKey,
    pub kind: ReactionKind,
}

/// Solution of a coupled equilibrium system.
#[derive(Debug, Clone)]
pub struct EquilibriumSolution {
    product_concentration: HashMap<ReactantKey, f64>,
    /// Residual of the worst-converged reaction in this solve; spec.md's
    /// "objective-function residual" — lower is better.
    pub objective_value: f64,
}

impl EquilibriumSolution {
    pub fn get_product_concentration(&self, reaction_key: ReactantKey) -> f64 {
        self.product_concentration
            .get(&reaction_key)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn contains(&self, reaction_key: ReactantKey) -> bool {
        self.product_concentration.contains_key(&reaction_key)
    }
}

/// External collaborator interface: solve `prod([reactants]^nu) = K *
/// [product]` for every reaction simultaneously, subject to the given
/// total concentrations per reactant.
pub trait EquilibriumSolver {
    fn solve(&self, reactions: &[Reaction], totals: &HashMap<ReactantKey, f64>) -> EquilibriumSolution;
}

/// A damped successive-substitution solver. Not a claim about the
/// original system's internal solver (not present in the retrieved
/// source) — a pluggable default sufficient to drive the cycle kinetics
/// engine end to end.
pub struct FixedPointEquilibriumSolver {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub damping: f64,
}

impl Default for FixedPointEquilibriumSolver {
    fn default() -> Self {
        FixedPointEquilibriumSolver {
            max_iterations: 200,
            tolerance: 1e-15,
            damping: 0.5,
        }
    }
}

impl EquilibriumSolver for FixedPointEquilibriumSolver {
    fn solve(&self, reactions: &[Reaction], totals: &HashMap<ReactantKey, f64>) -> EquilibriumSolution {
        let mut free: HashMap<ReactantKey, f64> = totals.clone();
        let mut product: HashMap<ReactantKey, f64> = HashMap::with_capacity(reactions.len());
        let mut residual = f64::INFINITY;

        if reactions.is_empty() {
            return EquilibriumSolution {
                product_concentration: product,
                objective_value: 0.0,
            };
        }

        for _ in 0..self.max_iterations {
            let mut new_product: HashMap<ReactantKey, f64> = HashMap::with_capacity(reactions.len());
            for r in reactions {
                let a = *free.get(&r.reactant_a).unwrap_or(&0.0);
                let b = *free.get(&r.reactant_b).unwrap_or(&0.0);
                let total_a = *totals.get(&r.reactant_a).unwrap_or(&0.0);
                let total_b = *totals.get(&r.reactant_b).unwrap_or(&0.0);
                let cap = total_a.min(total_b).max(0.0);
                let p = (r.k * a * b).min(cap).max(0.0);
                new_product.insert(r.product, p);
            }

            let mut consumption: HashMap<ReactantKey, f64> = HashMap::new();
            for r in reactions {
                let p = new_product[&r.product];
                *consumption.entry(r.reactant_a).or_insert(0.0) += p;
                *consumption.entry(r.reactant_b).or_insert(0.0) += p;
            }

            let mut max_delta = 0.0_f64;
            let mut new_free = free.clone();
            for (&key, &total) in totals {
                let consumed = *consumption.get(&key).unwrap_or(&0.0);
                let candidate = (total - consumed).max(0.0);
                let prev = *free.get(&key).unwrap_or(&0.0);
                let damped = prev + self.damping * (candidate - prev);
                max_delta = max_delta.max((damped - prev).abs());
                new_free.insert(key, damped);
            }

            free = new_free;
            product = new_product;
            residual = max_delta;
            if residual < self.tolerance {
                break;
            }
        }

        EquilibriumSolution {
            product_concentration: product,
            objective_value: residual,
        }
    }
}
