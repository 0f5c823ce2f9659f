//! C5: Cycle Kinetics Engine.
//!
//! Drives the cycle-by-cycle amplification model of spec.md §4.5: a
//! deterministic closed-form initialization over cycles 1-3 built from
//! one Equilibrium Solver (E2) call, followed by a general step for
//! cycles 4..N enforcing primer/dNTP/polymerase conservation.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::config::PcrConfig;
use crate::equilibrium::{EquilibriumSolver, Reaction, ReactantKey, ReactionKind};
use crate::primer::Primer;
use crate::product::Product;

fn hash_key<T: Hash>(v: &T) -> ReactantKey {
    let mut h = DefaultHasher::new();
    v.hash(&mut h);
    h.finish()
}

fn primer_key(variant_id: &str) -> ReactantKey {
    hash_key(&("primer", variant_id))
}

fn footprint_key(template_id: &str, start: usize, end: usize) -> ReactantKey {
    hash_key(&("footprint", template_id, start, end))
}

fn pair_key(variant_id: &str, footprint: ReactantKey) -> ReactantKey {
    hash_key(&("pair", variant_id, footprint))
}

/// Diagnostics for one template's simulation, per spec.md §6.
#[derive(Debug, Clone, Default)]
pub struct ReactionEnd {
    pub last_cycle: u32,
    pub polymerase_shortage_ranges: Vec<(u32, u32)>,
    pub final_dntp: f64,
}

/// One `(fwd_variant, rev_variant)` pair driving a single product's
/// amplification, per spec.md §4.5's "variants" list.
struct VariantRow {
    fwd_variant_id: String,
    rev_variant_id: String,
    concentration: f64,
    product_index: usize,
    amplicon_length: f64,
}

/// Simulate one template's products through `config.num_cycles` thermal
/// cycles. Returns `None` (after logging a warning) if reagents are
/// already exhausted after the cycle-1-3 closed form, per spec.md §7(c).
///
/// `side_reactions`/`side_concentrations` are pre-computed competing
/// equilibria (hairpins, self-dimers, cross-dimers) supplied by the
/// caller; only side reactions with `k >= config.k_min` or kind
/// `ReactionKind::Duplex` (annealing) are folded into the per-template
/// system before the solve, per spec.md §6 and
/// `PCR_Simulation.add_side_reactions`.
pub fn simulate_template(
    template_id: &str,
    mut products: Vec<Product>,
    fwd_primer: &Primer,
    rev_primer: &Primer,
    config: &PcrConfig,
    solver: &dyn EquilibriumSolver,
    side_reactions: &[Reaction],
    side_concentrations: &HashMap<ReactantKey, f64>,
) -> Option<(Vec<Product>, ReactionEnd, f64)> {
    if products.is_empty() {
        return None;
    }

    let fwd_variant_total = fwd_primer.concentration / fwd_primer.variants.len().max(1) as f64;
    let rev_variant_total = rev_primer.concentration / rev_primer.variants.len().max(1) as f64;

    let mut reactions: Vec<Reaction> = Vec::new();
    let mut totals: HashMap<ReactantKey, f64> = HashMap::new();
    let mut variant_total: HashMap<String, f64> = HashMap::new();

    for product in &products {
        let fwd_fp = footprint_key(
            template_id,
            product.fwd_template_footprint.start,
            product.fwd_template_footprint.end,
        );
        totals.insert(fwd_fp, config.c_dna);
        for (duplex, vid) in &product.fwd_sites {
            let pkey = primer_key(vid);
            totals.insert(pkey, fwd_variant_total);
            variant_total.insert(vid.clone(), fwd_variant_total);
            reactions.push(Reaction {
                k: duplex.k,
                reactant_a: pkey,
                reactant_b: fwd_fp,
                product: pair_key(vid, fwd_fp),
                kind: ReactionKind::Duplex,
            });
        }

        let rev_fp = footprint_key(
            template_id,
            product.rev_template_footprint.start,
            product.rev_template_footprint.end,
        );
        totals.insert(rev_fp, config.c_dna);
        for (duplex, vid) in &product.rev_sites {
            let pkey = primer_key(vid);
            totals.insert(pkey, rev_variant_total);
            variant_total.insert(vid.clone(), rev_variant_total);
            reactions.push(Reaction {
                k: duplex.k,
                reactant_a: pkey,
                reactant_b: rev_fp,
                product: pair_key(vid, rev_fp),
                kind: ReactionKind::Duplex,
            });
        }
    }

    reactions.extend(
        side_reactions
            .iter()
            .filter(|r| r.k >= config.k_min || r.kind == ReactionKind::Duplex)
            .copied(),
    );
    for (&key, &conc) in side_concentrations {
        totals.insert(key, conc);
    }

    let solution = solver.solve(&reactions, &totals);
    let max_objective_value = solution.objective_value;

    // Cycle 1: each surviving variant consumes a first-strand quantity
    // equal to its duplex concentration; dNTP drops by consumed *
    // amplicon_length for every strand created.
    let mut dntp = config.c_dntp;
    let mut cycle1_bound: HashMap<String, f64> = HashMap::new();

    for product in &products {
        let fwd_fp = footprint_key(
            template_id,
            product.fwd_template_footprint.start,
            product.fwd_template_footprint.end,
        );
        let rev_fp = footprint_key(
            template_id,
            product.rev_template_footprint.start,
            product.rev_template_footprint.end,
        );
        let length = product.len() as f64;
        for (_, vid) in &product.fwd_sites {
            let q = solution.get_product_concentration(pair_key(vid, fwd_fp));
            *cycle1_bound.entry(vid.clone()).or_insert(0.0) += q;
            dntp -= q * length;
        }
        for (_, vid) in &product.rev_sites {
            let q = solution.get_product_concentration(pair_key(vid, rev_fp));
            *cycle1_bound.entry(vid.clone()).or_insert(0.0) += q;
            dntp -= q * length;
        }
    }

    let mut primers: HashMap<String, Option<f64>> = HashMap::new();
    for (vid, total) in &variant_total {
        let bound = cycle1_bound.get(vid).copied().unwrap_or(0.0);
        let free = (total - bound).max(0.0);
        primers.insert(vid.clone(), Some(free));
    }

    // Cycles 2 and 3: closed-form pairwise growth from the cycle-1
    // result, per spec.md §4.5. p1 is the free-primer fraction computed
    // above; q is the cycle-1 template-bound concentration.
    let mut rows: Vec<VariantRow> = Vec::new();
    for (product_index, product) in products.iter().enumerate() {
        let length = product.len() as f64;
        for (_, fwd_id) in &product.fwd_sites {
            for (_, rev_id) in &product.rev_sites {
                let p1_f = primers[fwd_id].unwrap_or(0.0) / variant_total[fwd_id];
                let p1_r = primers[rev_id].unwrap_or(0.0) / variant_total[rev_id];
                let q_r = cycle1_bound.get(rev_id).copied().unwrap_or(0.0);
                let q_f = cycle1_bound.get(fwd_id).copied().unwrap_or(0.0);
                let fwd_2 = p1_f * q_r;
                let rev_2 = p1_r * q_f;
                let cycle3_conc = 2.0 * (fwd_2 + rev_2);
                rows.push(VariantRow {
                    fwd_variant_id: fwd_id.clone(),
                    rev_variant_id: rev_id.clone(),
                    concentration: cycle3_conc,
                    product_index,
                    amplicon_length: length,
                });
            }
        }
    }

    let any_primer_depleted = primers.values().any(|v| v.map(|x| x <= 0.0).unwrap_or(true));
    if dntp <= 0.0 || any_primer_depleted {
        log::warn!("template '{template_id}' exhausted reagents during initialization; discarding");
        return None;
    }

    rows.sort_by(|a, b| a.concentration.partial_cmp(&b.concentration).unwrap());

    let mut reaction_end = ReactionEnd {
        last_cycle: 3,
        polymerase_shortage_ranges: Vec::new(),
        final_dntp: dntp,
    };

    let max_consumption = config.max_polymerase_consumption();

    'cycles: for cycle in 4..=config.num_cycles {
        let prev_dntp = dntp;
        let prev_primers = primers.clone();

        let eligible: Vec<usize> = (0..rows.len())
            .filter(|&i| {
                primers[&rows[i].fwd_variant_id].is_some() && primers[&rows[i].rev_variant_id].is_some()
            })
            .collect();

        if eligible.is_empty() {
            reaction_end.last_cycle = cycle - 1;
            break 'cycles;
        }

        let mut added: HashMap<usize, f64> = HashMap::new();
        for &i in &eligible {
            let prev_conc = rows[i].concentration;
            let fwd_id = rows[i].fwd_variant_id.clone();
            let rev_id = rows[i].rev_variant_id.clone();
            *primers.get_mut(&fwd_id).unwrap().as_mut().unwrap() -= prev_conc;
            *primers.get_mut(&rev_id).unwrap().as_mut().unwrap() -= prev_conc;
            dntp -= 2.0 * prev_conc * rows[i].amplicon_length;
            rows[i].concentration = prev_conc * 2.0;
            added.insert(i, prev_conc);
        }

        // Correction 1: primer depletion.
        let mut ratio: HashMap<String, f64> = HashMap::new();
        for (vid, val) in primers.iter() {
            if let Some(v) = val {
                if *v < 0.0 {
                    let prev = prev_primers[vid].unwrap();
                    ratio.insert(vid.clone(), (prev / (prev - v)).clamp(0.0, 1.0));
                }
            }
        }
        if !ratio.is_empty() {
            for &i in &eligible {
                let fwd_ratio = ratio.get(&rows[i].fwd_variant_id).copied().unwrap_or(1.0);
                let rev_ratio = ratio.get(&rows[i].rev_variant_id).copied().unwrap_or(1.0);
                let effective = fwd_ratio.min(rev_ratio);
                if effective >= 1.0 {
                    continue;
                }
                let old_added = added[&i];
                let fwd_id = rows[i].fwd_variant_id.clone();
                let rev_id = rows[i].rev_variant_id.clone();
                // Undo this cycle's step for this row.
                *primers.get_mut(&fwd_id).unwrap().as_mut().unwrap() += old_added;
                *primers.get_mut(&rev_id).unwrap().as_mut().unwrap() += old_added;
                dntp += 2.0 * old_added * rows[i].amplicon_length;
                rows[i].concentration -= old_added;
                // Reapply scaled by the worse of the two primers' ratios.
                let scaled = old_added * effective;
                *primers.get_mut(&fwd_id).unwrap().as_mut().unwrap() -= scaled;
                *primers.get_mut(&rev_id).unwrap().as_mut().unwrap() -= scaled;
                dntp -= 2.0 * scaled * rows[i].amplicon_length;
                rows[i].concentration += scaled;
                added.insert(i, scaled);
            }
            for val in primers.values_mut() {
                if let Some(v) = val {
                    if *v <= 0.0 {
                        *val = None;
                    }
                }
            }
        }

        // Correction 2: polymerase throughput / dNTP cap. Triggered either
        // by exceeding polymerase throughput or by dNTP having gone
        // negative this cycle even under throughput, matching
        // `_correct_cycle`'s `if dNTP_consumption > max_consumptioin or
        // cur_dNTP < 0`.
        let consumption: f64 = eligible.iter().map(|i| 2.0 * added[i] * rows[*i].amplicon_length).sum();
        if consumption > max_consumption {
            match reaction_end.polymerase_shortage_ranges.last_mut() {
                Some((_, end)) if *end + 1 == cycle => *end = cycle,
                _ => reaction_end.polymerase_shortage_ranges.push((cycle, cycle)),
            }
        }
        if (consumption > max_consumption || dntp < 0.0) && consumption > 0.0 {
            let scale = (max_consumption / consumption).min(prev_dntp / consumption);
            for &i in &eligible {
                let old_added = added[&i];
                let fwd_id = rows[i].fwd_variant_id.clone();
                let rev_id = rows[i].rev_variant_id.clone();
                *primers.get_mut(&fwd_id).unwrap().as_mut().unwrap() += old_added;
                *primers.get_mut(&rev_id).unwrap().as_mut().unwrap() += old_added;
                dntp += 2.0 * old_added * rows[i].amplicon_length;
                rows[i].concentration -= old_added;

                let scaled = old_added * scale;
                *primers.get_mut(&fwd_id).unwrap().as_mut().unwrap() -= scaled;
                *primers.get_mut(&rev_id).unwrap().as_mut().unwrap() -= scaled;
                dntp -= 2.0 * scaled * rows[i].amplicon_length;
                rows[i].concentration += scaled;
            }
            for val in primers.values_mut() {
                if let Some(v) = val {
                    if *v <= 0.0 {
                        *val = None;
                    }
                }
            }
        }

        for &i in &eligible {
            products[rows[i].product_index].cycles_active = cycle;
        }

        reaction_end.last_cycle = cycle;
        if dntp <= 0.0 {
            dntp = 0.0;
            reaction_end.final_dntp = dntp;
            break 'cycles;
        }
        reaction_end.final_dntp = dntp;
    }

    for product in products.iter_mut() {
        product.quantity = 0.0;
    }
    for row in &rows {
        products[row.product_index].quantity += row.concentration;
    }

    let max_quantity = products.iter().map(|p| p.quantity).fold(0.0_f64, f64::max);
    let floor = config.c_dna.max(max_quantity * config.min_quantity_factor);
    products.retain(|p| p.quantity > floor);

    if products.is_empty() {
        log::warn!("template '{template_id}' has no surviving products after filtering");
        return None;
    }

    Some((products, reaction_end, max_objective_value))
}
