//! C4: Product Enumerator.
//!
//! Pairs forward and reverse annealing sites into candidate PCR products,
//! subject to amplicon-length bounds and primer-validity filters, and
//! merges duplicate products (same `(template_id, start, end)`) by
//! unioning their surviving variants and extending footprints.

use std::collections::HashMap;

use crate::assembler::AnnealingSite;
use crate::config::PcrConfig;
use crate::duplex::Duplex;
use crate::primer::Primer;
use crate::region::{compact_regions, Region};

/// A candidate or confirmed PCR product, per spec.md §3.
#[derive(Debug, Clone)]
pub struct Product {
    pub template_id: String,
    pub start: usize,
    pub end: usize,
    pub fwd_sites: Vec<(Duplex, String)>,
    pub rev_sites: Vec<(Duplex, String)>,
    pub quantity: f64,
    pub cycles_active: u32,
    pub fwd_template_footprint: Region,
    pub rev_template_footprint: Region,
}

impl Product {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    fn key(&self) -> (String, usize, usize) {
        (self.template_id.clone(), self.start, self.end)
    }

    /// Union another product's variants into this one (they must share a
    /// key) and extend both footprints, per spec.md §4.4.
    fn merge_from(&mut self, other: Product) {
        for pair in other.fwd_sites {
            if !self.fwd_sites.iter().any(|(_, id)| *id == pair.1) {
                self.fwd_sites.push(pair);
            }
        }
        for pair in other.rev_sites {
            if !self.rev_sites.iter().any(|(_, id)| *id == pair.1) {
                self.rev_sites.push(pair);
            }
        }
        self.fwd_template_footprint += &other.fwd_template_footprint;
        self.rev_template_footprint += &other.rev_template_footprint;
    }
}

/// True iff at least one of `sites` has `K >= k_min` and, absent
/// exonuclease activity, no 3' mismatch.
fn has_viable_variant(sites: &[(Duplex, String)], k_min: f64, with_exonuclease: bool) -> bool {
    sites
        .iter()
        .any(|(d, _)| d.k >= k_min && (with_exonuclease || !d.has_3prime_mismatch))
}

/// Keep only the variants that are both thermodynamically viable and
/// belong to the supplied primer's variant set (guards against stray
/// duplexes from a mismatched primer pool, per spec.md §4.4).
fn filter_viable<'a>(
    sites: &'a [(Duplex, String)],
    primer: &Primer,
    k_min: f64,
    with_exonuclease: bool,
) -> Vec<(Duplex, String)> {
    sites
        .iter()
        .filter(|(d, id)| {
            d.k >= k_min
                && (with_exonuclease || !d.has_3prime_mismatch)
                && primer.variants.iter().any(|v| v.id == *id)
        })
        .cloned()
        .collect()
}

/// Enumerate products pairing `fwd_sites` (forward-strand annealing sites
/// of `fwd_primer`) with `rev_sites` (reverse-primer annealing sites,
/// already mirrored into forward-strand coordinates per spec.md §4.2/P3),
/// on one named template.
pub fn enumerate_products(
    template_id: &str,
    fwd_sites: &[AnnealingSite],
    rev_sites: &[AnnealingSite],
    fwd_primer: &Primer,
    rev_primer: &Primer,
    config: &PcrConfig,
) -> Vec<Product> {
    let fwd_len = fwd_primer.len();
    let rev_len = rev_primer.len();
    let mut by_key: HashMap<(String, usize, usize), Product> = HashMap::new();

    for fwd in fwd_sites {
        let fwd_viable = filter_viable(&fwd.duplexes, fwd_primer, config.k_min, config.with_exonuclease);
        if fwd_viable.is_empty() {
            continue;
        }
        for rev in rev_sites {
            let start = fwd.position + 1;
            if rev.position < 1 || rev.position - 1 < start {
                continue;
            }
            let end = rev.position - 1;
            let length = end - start + 1;
            if length < config.min_amplicon || length > config.max_amplicon {
                continue;
            }
            let rev_viable = filter_viable(&rev.duplexes, rev_primer, config.k_min, config.with_exonuclease);
            if rev_viable.is_empty() {
                continue;
            }

            let fwd_footprint = Region::new(template_id, fwd.position.saturating_sub(fwd_len) + 1, fwd.position);
            let rev_footprint = Region::new(template_id, rev.position, rev.position + rev_len - 1);

            let product = Product {
                template_id: template_id.to_string(),
                start,
                end,
                fwd_sites: fwd_viable,
                rev_sites: rev_viable,
                quantity: 0.0,
                cycles_active: 0,
                fwd_template_footprint: fwd_footprint,
                rev_template_footprint: rev_footprint,
            };

            by_key
                .entry(product.key())
                .and_modify(|existing| existing.merge_from(product.clone()))
                .or_insert(product);
        }
    }

    let mut products: Vec<Product> = by_key.into_values().collect();
    products.sort_by_key(|p| (p.start, p.end));
    products
}

/// Derive the compacted, non-overlapping, start-sorted footprint list
/// across all of a template's products (spec.md invariant (d)). Kept
/// separate from `enumerate_products` because the aggregate list, not
/// any single product's own footprint, is what the invariant applies to;
/// `kinetics` calls this when it needs the whole-template footprint set
/// as equilibrium-solver input.
pub fn template_footprints(products: &[Product]) -> (Vec<Region>, Vec<Region>) {
    let mut fwd: Vec<Region> = products.iter().map(|p| p.fwd_template_footprint.clone()).collect();
    let mut rev: Vec<Region> = products.iter().map(|p| p.rev_template_footprint.clone()).collect();
    compact_regions(&mut fwd);
    compact_regions(&mut rev);
    (fwd, rev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplex::Duplex;

    fn site(position: usize, k: f64) -> AnnealingSite {
        AnnealingSite {
            position,
            duplexes: vec![(
                Duplex { k, has_3prime_mismatch: false },
                "p.0".to_string(),
            )],
        }
    }

    fn config() -> PcrConfig {
        let mut c = PcrConfig::default();
        c.min_amplicon = 1;
        c.max_amplicon = 1000;
        c.k_min = 100.0;
        c
    }

    #[test]
    fn pairs_within_bounds_produce_one_product() {
        let fwd_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let rev_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let fwd = vec![site(5, 1000.0)];
        let rev = vec![site(30, 1000.0)];
        let products = enumerate_products("t1", &fwd, &rev, &fwd_primer, &rev_primer, &config());
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].start, 6);
        assert_eq!(products[0].end, 29);
    }

    #[test]
    fn out_of_bounds_amplicon_is_rejected() {
        let mut cfg = config();
        cfg.max_amplicon = 10;
        let fwd_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let rev_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let fwd = vec![site(5, 1000.0)];
        let rev = vec![site(30, 1000.0)];
        let products = enumerate_products("t1", &fwd, &rev, &fwd_primer, &rev_primer, &cfg);
        assert!(products.is_empty());
    }

    #[test]
    fn low_k_variant_is_excluded() {
        let fwd_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let rev_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let fwd = vec![site(5, 1.0)];
        let rev = vec![site(30, 1000.0)];
        let products = enumerate_products("t1", &fwd, &rev, &fwd_primer, &rev_primer, &config());
        assert!(products.is_empty());
    }

    #[test]
    fn duplicate_products_merge_variant_sets() {
        let fwd_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let rev_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let mut second_variant_site = site(5, 1000.0);
        second_variant_site.duplexes.push((
            Duplex { k: 500.0, has_3prime_mismatch: false },
            "p.1".to_string(),
        ));
        let fwd = vec![site(5, 1000.0), second_variant_site];
        let rev = vec![site(30, 1000.0)];
        let products = enumerate_products("t1", &fwd, &rev, &fwd_primer, &rev_primer, &config());
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].fwd_sites.len(), 2);
    }

    #[test]
    fn template_footprints_are_compacted_and_sorted() {
        let fwd_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let rev_primer = Primer::new("p", b"ACGT", 1e-6).unwrap();
        let fwd = vec![site(5, 1000.0), site(50, 1000.0)];
        let rev = vec![site(30, 1000.0), site(80, 1000.0)];
        let products = enumerate_products("t1", &fwd, &rev, &fwd_primer, &rev_primer, &config());
        let (fwd_regions, rev_regions) = template_footprints(&products);
        for pair in fwd_regions.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
        for pair in rev_regions.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }
}
