//! Tests for the symbolic block analysis and the LDLᵀ drivers.

use nalgebra::{DMatrix, DVector};
use proxal::linalg::{
    blocks::SymbolicBlockMatrix, BlockLdlt, DenseLdlt, LdltDriver, UduLdlt,
};

/// KKT-shaped test matrix [[H, Jᵀ], [J, −I]] with H SPD.
fn kkt_like(n: usize, m: usize) -> DMatrix<f64> {
    let dim = n + m;
    let mut mat = DMatrix::zeros(dim, dim);
    for i in 0..n {
        mat[(i, i)] = 2.0 + i as f64;
        if i + 1 < n {
            mat[(i, i + 1)] = 0.5;
            mat[(i + 1, i)] = 0.5;
        }
    }
    for r in 0..m {
        for c in 0..n {
            let v = ((r + 2 * c) % 3) as f64 - 1.0;
            mat[(n + r, c)] = v;
            mat[(c, n + r)] = v;
        }
        mat[(n + r, n + r)] = -1.0;
    }
    mat
}

fn solve_residual(driver: &mut dyn LdltDriver, mat: &DMatrix<f64>, rhs: &DVector<f64>) -> f64 {
    driver.compute(mat).expect("factorization failed");
    let mut x = rhs.clone();
    driver.solve_in_place(&mut x);
    (mat * x - rhs).amax()
}

#[test]
fn test_drivers_agree_on_kkt_system() {
    let mat = kkt_like(5, 3);
    let rhs = DVector::from_fn(8, |i, _| (i as f64 + 1.0).sin());

    let mut dense = DenseLdlt::new(8);
    let mut blocked = BlockLdlt::from_structure(&[5], &[2, 1]);
    let mut udu = UduLdlt::new(8);

    assert!(solve_residual(&mut dense, &mat, &rhs) < 1e-10);
    assert!(solve_residual(&mut blocked, &mat, &rhs) < 1e-10);
    assert!(solve_residual(&mut udu, &mat, &rhs) < 1e-10);
}

#[test]
fn test_inertia_counts_match() {
    let mat = kkt_like(4, 3);
    let mut dense = DenseLdlt::new(7);
    dense.compute(&mat).unwrap();

    let d = dense.vector_d();
    let npos = d.iter().filter(|&&v| v > 0.0).count();
    let nneg = d.iter().filter(|&&v| v < 0.0).count();
    assert_eq!((npos, nneg), (4, 3));
}

#[test]
fn test_symbolic_nnz_upper_bounds_identity() {
    // for any factorizable structure, the brute-force search can never
    // do worse than the identity permutation
    let m = SymbolicBlockMatrix::kkt_structure(&[4], &[2, 3, 1]);
    let mut ident = m.clone();
    assert!(ident.llt_in_place());
    let (_, best_nnz) = m.brute_force_best_permutation().unwrap();
    assert!(best_nnz <= ident.count_nnz());
}

#[test]
fn test_block_permutation_beats_identity() {
    // three primal blocks against two dense-coupled dual blocks
    let m = SymbolicBlockMatrix::kkt_structure(&[2, 2, 2], &[3, 3]);
    let mut ident = m.clone();
    assert!(ident.llt_in_place());
    let nnz_ident = ident.count_nnz();

    let blocked = BlockLdlt::from_structure(&[2, 2, 2], &[3, 3]);
    assert!(blocked.symbolic_nnz() < nnz_ident);
}

#[test]
fn test_numerical_factor_respects_symbolic_fill() {
    // with the dual (diagonal) blocks eliminated first, the factor has
    // no fill between the two dual blocks
    let mat = kkt_like(2, 4);
    let mut blocked = BlockLdlt::from_structure(&[2], &[2, 2]);
    blocked.compute(&mat).unwrap();

    // dual blocks occupy the leading 4 permuted rows
    assert_eq!(blocked.permutation(), &[1, 2, 0]);
    let fact = blocked.matrix_ldlt();
    for r in 2..4 {
        for c in 0..2 {
            assert_eq!(fact[(r, c)], 0.0, "unexpected fill at ({}, {})", r, c);
        }
    }
}

#[test]
fn test_solve_into_matches_in_place() {
    let mat = kkt_like(3, 2);
    let rhs = DVector::from_fn(5, |i, _| i as f64 - 2.0);

    let mut dense = DenseLdlt::new(5);
    dense.compute(&mat).unwrap();

    let mut a = rhs.clone();
    dense.solve_in_place(&mut a);
    let mut b = DVector::zeros(5);
    dense.solve_into(&rhs, &mut b);
    assert_eq!(a, b);
}
