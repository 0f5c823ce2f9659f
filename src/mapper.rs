//! C1: Sequence Mapper.
//!
//! Maps ATGC/IUPAC bytes to the AT/GC channels of complex cube roots of
//! unity described in spec.md §4.1, ported directly from
//! `SearchEngine.py`'s `_T_AT_mapping` / `_P_AT_mapping` tables (and their
//! GC counterparts).

use rustfft::num_complex::Complex64;

const W0: Complex64 = Complex64::new(1.0, 0.0);
// -1/2 + sqrt(3)/2 i
const SQRT3_2: f64 = 0.866_025_403_784_438_6;
const W1: Complex64 = Complex64::new(-0.5, SQRT3_2);
const W2: Complex64 = Complex64::new(-0.5, -SQRT3_2);

fn zero() -> Complex64 {
    Complex64::new(0.0, 0.0)
}

/// Template AT-channel mapping: only unambiguous template bytes matter,
/// anything else (including wildcards) contributes 0.
fn template_at(b: u8) -> Complex64 {
    match b {
        b'A' => W1,
        b'T' => W2,
        _ => zero(),
    }
}

fn template_gc(b: u8) -> Complex64 {
    match b {
        b'G' => W1,
        b'C' => W2,
        _ => zero(),
    }
}

/// Primer AT-channel mapping, covering the full IUPAC alphabet.
fn primer_at(code: u8) -> Complex64 {
    match code {
        b'A' => W2,
        b'T' => W1,
        b'G' => W0,
        b'C' => W0,
        b'R' => W2,
        b'Y' => W1,
        b'S' => W0,
        b'W' => W2 + W1,
        b'K' => W1,
        b'M' => W2,
        b'B' => W1,
        b'D' => W2 + W1,
        b'H' => W2 + W1,
        b'V' => W2,
        b'N' => W2 + W1,
        _ => zero(),
    }
}

fn primer_gc(code: u8) -> Complex64 {
    match code {
        b'A' => W0,
        b'T' => W0,
        b'G' => W2,
        b'C' => W1,
        b'R' => W2,
        b'Y' => W1,
        b'S' => W2 + W1,
        b'W' => W0,
        b'K' => W2,
        b'M' => W1,
        b'B' => W2 + W1,
        b'D' => W2,
        b'H' => W1,
        b'V' => W2 + W1,
        b'N' => W2 + W1,
        _ => zero(),
    }
}

/// Map a primer's master IUPAC sequence into AT/GC channel vectors of
/// exactly `map_len` entries, zero-padded. `map_len` is the chunk size
/// chosen by the scorer (a power of two), not the primer length.
pub fn map_primer(pattern: &[u8], map_len: usize) -> (Vec<Complex64>, Vec<Complex64>) {
    let mut at = vec![zero(); map_len];
    let mut gc = vec![zero(); map_len];
    for (i, &code) in pattern.iter().enumerate() {
        at[i] = primer_at(code);
        gc[i] = primer_gc(code);
    }
    (at, gc)
}

/// Map a template chunk into AT/GC channel vectors of exactly `map_len`
/// entries, zero-padded if the chunk is shorter (the final chunk of a
/// template almost always is).
pub fn map_template_chunk(chunk: &[u8], map_len: usize) -> (Vec<Complex64>, Vec<Complex64>) {
    let mut at = vec![zero(); map_len];
    let mut gc = vec![zero(); map_len];
    for (i, &b) in chunk.iter().enumerate() {
        at[i] = template_at(b);
        gc[i] = template_gc(b);
    }
    (at, gc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn w_are_cube_roots_of_unity() {
        assert!(approx_eq(W1 * W1 * W1, W0));
        assert!(approx_eq(W2 * W2 * W2, W0));
        assert!(approx_eq(W1 * W2, W0));
    }

    #[test]
    fn template_channels_are_disjoint_on_canonical_bases() {
        for &b in b"ATGC" {
            let at = template_at(b);
            let gc = template_gc(b);
            assert!(at == zero() || gc == zero());
        }
    }

    #[test]
    fn unambiguous_primer_positional_product_counts_matches() {
        // For an unambiguous primer letter matching the template letter,
        // P_AT[i]*T_AT[i] + P_GC[i]*T_GC[i] should equal a fixed real
        // constant independent of which base matched (contract of §4.1,
        // checked precisely by the scorer's P1 test); here we just check
        // it's real and identical across A/T/G/C self-matches.
        let mut values = Vec::new();
        for &b in b"ATGC" {
            let v = primer_at(b) * template_at(b) + primer_gc(b) * template_gc(b);
            values.push(v.re);
            assert!(v.im.abs() < 1e-9);
        }
        for w in values.windows(2) {
            assert!((w[0] - w[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn map_pads_with_zeros() {
        let (at, gc) = map_primer(b"AT", 8);
        assert_eq!(at.len(), 8);
        assert_eq!(gc.len(), 8);
        assert_eq!(at[2], zero());
        assert_eq!(gc[7], zero());
    }
}
