//! Pattern folds must be traceable by a forward-mode scalar: the tangents
//! they propagate have to match finite differences of the f64 fold.

use parafold::{Folded, Pattern};
use parafold_sens::Dual;

fn fold_tangents(pattern: &Pattern, v: &[f64], k: usize) -> Vec<f64> {
    let seeded: Vec<Dual<f64>> = v
        .iter()
        .enumerate()
        .map(|(i, &vi)| {
            if i == k {
                Dual::variable(vi)
            } else {
                Dual::constant(vi)
            }
        })
        .collect();
    let folded = pattern.fold(&seeded, true).unwrap();
    match folded {
        Folded::Array(arr) => arr.iter().map(|d| d.eps).collect(),
        Folded::Dict(_) => panic!("array-valued pattern expected"),
    }
}

fn fold_finite_difference(pattern: &Pattern, v: &[f64], k: usize, h: f64) -> Vec<f64> {
    let mut plus = v.to_vec();
    plus[k] += h;
    let mut minus = v.to_vec();
    minus[k] -= h;
    let fp = pattern.fold(&plus, true).unwrap();
    let fm = pattern.fold(&minus, true).unwrap();
    match (fp, fm) {
        (Folded::Array(p), Folded::Array(m)) => p
            .iter()
            .zip(m.iter())
            .map(|(a, b)| (a - b) / (2.0 * h))
            .collect(),
        _ => panic!("array-valued pattern expected"),
    }
}

fn check_pattern(pattern: Pattern, v: &[f64]) {
    assert_eq!(pattern.flat_length(true), v.len());
    for k in 0..v.len() {
        let ad = fold_tangents(&pattern, v, k);
        let fd = fold_finite_difference(&pattern, v, k, 1e-6);
        for (i, (a, b)) in ad.iter().zip(fd.iter()).enumerate() {
            assert!(
                (a - b).abs() < 1e-5,
                "entry {i}, direction {k}: AD {a} vs FD {b}"
            );
        }
    }
}

#[test]
fn psd_free_fold_propagates_tangents() {
    check_pattern(Pattern::psd_matrix(3), &[0.2, -0.4, 1.1, 0.0, 0.6, -0.9]);
}

#[test]
fn simplex_free_fold_propagates_tangents() {
    check_pattern(Pattern::simplex(4).unwrap(), &[0.5, -1.0, 0.25]);
}

#[test]
fn bounded_array_free_fold_propagates_tangents() {
    let pattern = Pattern::NumericArray(
        parafold::NumericArrayPattern::with_bounds(&[3], Some(-1.0), Some(2.0)).unwrap(),
    );
    check_pattern(pattern, &[0.3, -2.0, 1.4]);
}
