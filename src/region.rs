//! `Region`: a half-open... no, a 1-based *inclusive* span on one named
//! template, per spec.md §3. Ported from `PCR_Simulation.py`'s `Region`.

use std::ops::AddAssign;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    pub template_id: String,
    pub start: usize,
    pub end: usize,
}

impl Region {
    /// Construct a region. Panics are avoided in favor of clamping: the
    /// core never hands out degenerate regions, so callers passing
    /// `start > end` is a programmer error, not a data-driven one.
    pub fn new(template_id: impl Into<String>, start: usize, end: usize) -> Self {
        debug_assert!(start >= 1 && end >= 1, "region bounds are 1-based");
        debug_assert!(start <= end, "region start must not exceed its end");
        Region {
            template_id: template_id.into(),
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Usual interval overlap, restricted to the same template.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.template_id == other.template_id
            && self.start <= other.end
            && other.start <= self.end
    }
}

/// Merges two regions of the same template by taking the min start and
/// max end. A region for a different template is left untouched, mirroring
/// the Python `__iadd__`'s silent no-op.
impl AddAssign<&Region> for Region {
    fn add_assign(&mut self, other: &Region) {
        if self.template_id != other.template_id {
            return;
        }
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }
}

/// Sort a list of regions by start and merge overlapping ones in place,
/// per spec.md invariant (d): "the list of template footprints is
/// non-overlapping and sorted by start."
pub fn compact_regions(regions: &mut Vec<Region>) {
    if regions.is_empty() {
        return;
    }
    regions.sort_by_key(|r| r.start);
    let mut compacted: Vec<Region> = Vec::with_capacity(regions.len());
    for r in regions.drain(..) {
        if let Some(last) = compacted.last_mut() {
            if last.overlaps(&r) {
                *last += &r;
                continue;
            }
        }
        compacted.push(r);
    }
    *regions = compacted;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_same_template() {
        let mut a = Region::new("t1", 10, 20);
        let b = Region::new("t1", 15, 30);
        a += &b;
        assert_eq!(a, Region::new("t1", 10, 30));
    }

    #[test]
    fn merge_different_template_is_noop() {
        let mut a = Region::new("t1", 10, 20);
        let b = Region::new("t2", 15, 30);
        a += &b;
        assert_eq!(a, Region::new("t1", 10, 20));
    }

    #[test]
    fn overlap_same_template_only() {
        let a = Region::new("t1", 10, 20);
        let b = Region::new("t2", 10, 20);
        assert!(!a.overlaps(&b));
        let c = Region::new("t1", 20, 25);
        assert!(a.overlaps(&c));
        let d = Region::new("t1", 21, 25);
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn compact_merges_and_sorts() {
        let mut regions = vec![
            Region::new("t1", 50, 60),
            Region::new("t1", 1, 10),
            Region::new("t1", 5, 20),
        ];
        compact_regions(&mut regions);
        assert_eq!(
            regions,
            vec![Region::new("t1", 1, 20), Region::new("t1", 50, 60)]
        );
    }

    #[test]
    fn compact_is_idempotent() {
        let mut regions = vec![Region::new("t1", 1, 20), Region::new("t1", 1, 20)];
        compact_regions(&mut regions);
        let mut twice = regions.clone();
        compact_regions(&mut twice);
        assert_eq!(regions, twice);
    }
}
