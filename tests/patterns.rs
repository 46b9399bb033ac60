use approx::assert_relative_eq;
use ndarray::{arr1, arr2, ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use num_traits::Float;

use parafold::{
    Folded, NumericArrayPattern, Pattern, PatternArray, PatternDict, PatternError,
    PsdSymmetricMatrixPattern,
};

fn assert_folded_close(a: &Folded<f64>, b: &Folded<f64>, tol: f64) {
    match (a, b) {
        (Folded::Array(x), Folded::Array(y)) => {
            assert_eq!(x.shape(), y.shape());
            for (u, v) in x.iter().zip(y.iter()) {
                assert_relative_eq!(*u, *v, max_relative = tol, epsilon = tol);
            }
        }
        (Folded::Dict(x), Folded::Dict(y)) => {
            assert_eq!(x.len(), y.len());
            for ((na, va), (nb, vb)) in x.iter().zip(y.iter()) {
                assert_eq!(na, nb);
                assert_folded_close(va, vb, tol);
            }
        }
        _ => panic!("folded kinds differ"),
    }
}

fn group_pattern() -> Pattern {
    // A typical model block: a 10x3 array of unconstrained coefficients plus
    // ten 3x3 covariance matrices.
    let mut dict = PatternDict::new();
    dict.insert("array", NumericArrayPattern::new(&[10, 3])).unwrap();
    dict.insert(
        "mats",
        PatternArray::new(&[10], PsdSymmetricMatrixPattern::new(3)).unwrap(),
    )
    .unwrap();
    Pattern::from(dict)
}

#[test]
fn nonfree_round_trip_is_exact() {
    let mut rng = StdRng::seed_from_u64(7);
    for pattern in [
        Pattern::numeric_array(&[4, 2]),
        Pattern::simplex(5).unwrap(),
        Pattern::psd_matrix(3),
        group_pattern(),
    ] {
        let x = pattern.random(&mut rng);
        let flat = pattern.flatten(&x, false).unwrap();
        assert_eq!(flat.len(), pattern.flat_length(false));
        let back = pattern.fold(&flat, false).unwrap();
        // No transform is applied, so the round trip is bit-exact.
        assert_eq!(back, x);
    }
}

#[test]
fn free_round_trip_within_tolerance() {
    let mut rng = StdRng::seed_from_u64(8);
    for pattern in [
        Pattern::NumericArray(NumericArrayPattern::with_bounds(&[3], Some(-1.0), Some(2.0)).unwrap()),
        Pattern::simplex(4).unwrap(),
        Pattern::psd_matrix(3),
        group_pattern(),
    ] {
        let x = pattern.random(&mut rng);
        let free = pattern.flatten(&x, true).unwrap();
        assert_eq!(free.len(), pattern.flat_length(true));
        let back = pattern.fold(&free, true).unwrap();
        assert_folded_close(&back, &x, 1e-8);
    }
}

#[test]
fn free_vector_round_trip() {
    // flatten(fold(v, free), free) == v for every finite free vector.
    let mut rng = StdRng::seed_from_u64(9);
    for pattern in [
        Pattern::NumericArray(NumericArrayPattern::with_bounds(&[4], Some(0.0), None).unwrap()),
        Pattern::simplex(5).unwrap(),
        Pattern::psd_matrix(3),
        group_pattern(),
    ] {
        let v: Vec<f64> = (0..pattern.flat_length(true))
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();
        let folded = pattern.fold(&v, true).unwrap();
        let back = pattern.flatten(&folded, true).unwrap();
        for (a, b) in back.iter().zip(v.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-8, epsilon = 1e-8);
        }
    }
}

#[test]
fn free_fold_is_total_for_psd() {
    // Any finite free vector must fold to a valid PSD matrix.
    let pat = Pattern::psd_matrix(3);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let v: Vec<f64> = (0..6).map(|_| rng.sample(StandardNormal)).collect();
        let folded = pat.fold(&v, true).unwrap();
        let (ok, msg) = pat.validate_folded(&folded);
        assert!(ok, "free fold produced an invalid matrix: {msg}");
        // The matrix is L·Lᵀ, so shifting the diagonal by 1e-8 must be
        // Cholesky-factorizable: all eigenvalues are at least -1e-8.
        let arr = folded.as_array().unwrap();
        let mut shifted = arr.clone();
        for i in 0..3 {
            shifted[[i, i]] += 1e-8;
        }
        let reflat = pat.flatten(&Folded::Array(shifted), true);
        assert!(reflat.is_ok(), "matrix has an eigenvalue below -1e-8");
    }
}

#[test]
fn free_fold_is_total_for_bounded_arrays() {
    let pat = Pattern::NumericArray(NumericArrayPattern::with_bounds(&[2], Some(0.0), Some(1.0)).unwrap());
    // Extreme free values must saturate, not overflow into NaN.
    let folded = pat.fold(&[1e4, -1e4], true).unwrap();
    let (ok, msg) = pat.validate_folded(&folded);
    assert!(ok, "{msg}");
    let arr = folded.as_array().unwrap();
    assert!(arr.iter().all(|x| x.is_finite()));
}

#[test]
fn length_mismatch_is_always_fatal() {
    let pat = Pattern::psd_matrix(3);
    // Expected non-free length is 9; 3 entries must fail even unchecked.
    let err = pat.fold_unchecked(&[1.0, 2.0, 3.0], false).unwrap_err();
    assert_eq!(
        err,
        PatternError::WrongLength {
            expected: 9,
            got: 3
        }
    );
    let err = pat.fold(&[0.0; 5], true).unwrap_err();
    assert_eq!(
        err,
        PatternError::WrongLength {
            expected: 6,
            got: 5
        }
    );
}

#[test]
fn validation_can_be_toggled() {
    let pat = Pattern::psd_matrix(3);
    let flat = [-1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

    let err = pat.fold(&flat, false).unwrap_err();
    match err {
        PatternError::Constraint(msg) => {
            assert!(
                msg.contains("diagonal") && msg.contains("lower bound"),
                "unexpected message: {msg}"
            );
        }
        other => panic!("expected a constraint error, got {other:?}"),
    }

    // Unchecked fold returns the matrix unmodified.
    let folded = pat.fold_unchecked(&flat, false).unwrap();
    let expected = arr2(&[[-1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]).into_dyn();
    assert_eq!(folded, Folded::Array(expected));
}

#[test]
fn validate_folded_reports_without_raising() {
    let pat = Pattern::simplex(3).unwrap();
    let bad = Folded::Array(arr1(&[0.5, 0.5, 0.5]).into_dyn());
    let (ok, msg) = pat.validate_folded(&bad);
    assert!(!ok);
    assert!(!msg.is_empty());

    let good = Folded::Array(arr1(&[0.25, 0.5, 0.25]).into_dyn());
    assert_eq!(pat.validate_folded(&good), (true, String::new()));
}

#[test]
fn psd_free_flatten_requires_positive_definite() {
    let pat = Pattern::psd_matrix(2);
    let singular = Folded::Array(arr2(&[[1.0, 1.0], [1.0, 1.0]]).into_dyn());
    let err = pat.flatten(&singular, true).unwrap_err();
    match err {
        PatternError::Constraint(msg) => assert!(msg.contains("positive definite")),
        other => panic!("expected a constraint error, got {other:?}"),
    }
    // The same matrix flattens fine in non-free mode.
    assert!(pat.flatten(&singular, false).is_ok());
}

#[test]
fn group_masks_partition_the_flat_vector() {
    // Marking group g in both the coefficient array and the matrix array
    // must select exactly group g's segment of the flat vector, and the
    // groups together must cover it with no duplicates and no gaps.
    let pattern = group_pattern();
    for &free in &[false, true] {
        let total = pattern.flat_length(free);
        let mut seen = vec![0usize; total];
        for g in 0..10 {
            let mut mask = pattern.empty_bool(false);
            if let Folded::Dict(entries) = &mut mask {
                for (name, value) in entries.iter_mut() {
                    let Folded::Array(arr) = value else {
                        panic!("array-valued entry expected")
                    };
                    match name.as_str() {
                        "array" => {
                            for j in 0..3 {
                                arr[[g, j]] = true;
                            }
                        }
                        "mats" => {
                            for i in 0..3 {
                                for j in 0..3 {
                                    arr[[g, i, j]] = true;
                                }
                            }
                        }
                        other => panic!("unexpected entry {other}"),
                    }
                }
            }
            let inds = pattern.flat_indices(&mask, free).unwrap();
            let expected_len = if free { 3 + 6 } else { 3 + 9 };
            assert_eq!(inds.len(), expected_len, "group {g}, free={free}");
            for i in inds {
                seen[i] += 1;
            }
        }
        assert!(
            seen.iter().all(|&c| c == 1),
            "free={free}: groups do not partition the flat vector: {seen:?}"
        );
    }
}

#[test]
fn coupled_free_transforms_select_whole_segment() {
    let pat = Pattern::psd_matrix(3);
    let mut mask = pat.empty_bool(false);
    if let Folded::Array(arr) = &mut mask {
        arr[[2, 1]] = true;
    }
    // One marked entry selects all six free coordinates...
    assert_eq!(pat.flat_indices(&mask, true).unwrap(), vec![0, 1, 2, 3, 4, 5]);
    // ...but only its own position in the direct layout.
    assert_eq!(pat.flat_indices(&mask, false).unwrap(), vec![7]);
}

#[test]
fn dict_fold_respects_insertion_order() {
    let mut dict = PatternDict::new();
    dict.insert("first", NumericArrayPattern::new(&[2])).unwrap();
    dict.insert("second", NumericArrayPattern::new(&[1])).unwrap();
    let pat = Pattern::from(dict);

    let folded = pat.fold(&[1.0, 2.0, 3.0], false).unwrap();
    let entries = folded.as_dict().unwrap();
    assert_eq!(entries[0].0, "first");
    assert_eq!(entries[1].0, "second");
    assert_eq!(
        folded.get("second").unwrap(),
        &Folded::Array(arr1(&[3.0]).into_dyn())
    );
}

#[test]
fn dict_rejects_missing_and_extra_entries() {
    let mut dict = PatternDict::new();
    dict.insert("a", NumericArrayPattern::new(&[1])).unwrap();
    let pat = Pattern::from(dict);

    let missing: Folded<f64> = Folded::Dict(vec![]);
    let (ok, msg) = pat.validate_folded(&missing);
    assert!(!ok);
    assert!(msg.contains("missing"), "{msg}");

    let extra = parafold::dict(vec![
        ("a", Folded::Array(arr1(&[0.0]).into_dyn())),
        ("b", Folded::Array(arr1(&[0.0]).into_dyn())),
    ]);
    let (ok, msg) = pat.validate_folded(&extra);
    assert!(!ok);
    assert!(msg.contains("unexpected"), "{msg}");
}

#[test]
fn pattern_array_layout_is_row_major_by_cell() {
    let pat = Pattern::Array(PatternArray::new(&[2], NumericArrayPattern::new(&[2])).unwrap());
    let folded = pat.fold(&[1.0, 2.0, 3.0, 4.0], false).unwrap();
    let arr = folded.as_array().unwrap();
    assert_eq!(arr.shape(), &[2, 2]);
    assert_eq!(arr[[0, 1]], 2.0);
    assert_eq!(arr[[1, 0]], 3.0);
}

#[test]
fn bounded_array_flatten_rejects_out_of_bounds() {
    let pat =
        Pattern::NumericArray(NumericArrayPattern::with_bounds(&[2], Some(0.0), Some(10.0)).unwrap());
    let bad = Folded::Array(arr1(&[-0.5, 3.0]).into_dyn());
    let err = pat.flatten(&bad, true).unwrap_err();
    match err {
        PatternError::Constraint(msg) => assert!(msg.contains("lower bound"), "{msg}"),
        other => panic!("expected a constraint error, got {other:?}"),
    }
}

#[test]
fn random_values_are_valid() {
    let mut rng = StdRng::seed_from_u64(123);
    let pattern = group_pattern();
    for _ in 0..10 {
        let x = pattern.random(&mut rng);
        let (ok, msg) = pattern.validate_folded(&x);
        assert!(ok, "{msg}");
    }
}

#[test]
fn scalar_pattern_via_empty_shape() {
    // A zero-dimensional array pattern behaves as a scalar.
    let pat = Pattern::numeric_array(&[]);
    assert_eq!(pat.flat_length(false), 1);
    let folded = pat.fold(&[2.5], false).unwrap();
    let arr = folded.as_array().unwrap();
    assert_eq!(arr.ndim(), 0);
    assert_eq!(arr[IxDyn(&[])], 2.5);
    let flat = pat.flatten(&folded, true).unwrap();
    assert_eq!(flat, vec![2.5]);
}

#[test]
fn mask_with_wrong_shape_is_rejected() {
    let pat = Pattern::numeric_array(&[2, 2]);
    let mask: Folded<bool> = Folded::Array(ArrayD::from_elem(IxDyn(&[3]), true));
    assert!(pat.flat_indices(&mask, false).is_err());
}
