//! Property tests for the constraint sets.
//!
//! Every set must satisfy the Moreau decomposition
//! z = P_C(z) + P_{NC}(z) and projection idempotence
//! P_C(P_C(z)) = P_C(z) at arbitrary points.

use nalgebra::DVector;
use proxal::prelude::*;
use rand::Rng;

fn random_vector(dim: usize, scale: f64) -> DVector<f64> {
    let mut rng = rand::thread_rng();
    DVector::from_fn(dim, |_, _| rng.gen_range(-scale..scale))
}

fn check_moreau(set: &dyn ConstraintSet, z: &DVector<f64>) {
    let dim = z.len();
    let mut proj = DVector::zeros(dim);
    let mut ncp = DVector::zeros(dim);
    set.projection(z.rows(0, dim), proj.rows_mut(0, dim));
    set.normal_cone_projection(z.rows(0, dim), ncp.rows_mut(0, dim));

    let recomposed = &proj + &ncp;
    assert!(
        (recomposed - z).amax() < 1e-12,
        "Moreau decomposition violated"
    );

    let mut reproj = DVector::zeros(dim);
    set.projection(proj.rows(0, dim), reproj.rows_mut(0, dim));
    assert!(
        (reproj - &proj).amax() < 1e-12,
        "projection is not idempotent"
    );
}

#[test]
fn test_equality_set_properties() {
    let set = EqualitySet::new();
    for _ in 0..20 {
        check_moreau(&set, &random_vector(4, 5.0));
    }
}

#[test]
fn test_orthant_properties() {
    let nonneg = NonnegOrthant::new();
    let neg = NegativeOrthant::new();
    for _ in 0..20 {
        let z = random_vector(6, 3.0);
        check_moreau(&nonneg, &z);
        check_moreau(&neg, &z);
    }
}

#[test]
fn test_box_properties() {
    let set = BoxSet::new(
        DVector::from_vec(vec![-1.0, 0.0, -2.0]),
        DVector::from_vec(vec![1.0, 0.5, 3.0]),
    );
    for _ in 0..20 {
        check_moreau(&set, &random_vector(3, 4.0));
    }
}

#[test]
fn test_soc_properties() {
    for dim in [2usize, 3, 5] {
        let set = SecondOrderCone::new(dim);
        for _ in 0..20 {
            check_moreau(&set, &random_vector(dim, 2.0));
        }
    }
}

#[test]
fn test_projection_is_nonexpansive() {
    let set = SecondOrderCone::new(4);
    for _ in 0..20 {
        let z1 = random_vector(4, 2.0);
        let z2 = random_vector(4, 2.0);
        let mut p1 = DVector::zeros(4);
        let mut p2 = DVector::zeros(4);
        set.projection(z1.rows(0, 4), p1.rows_mut(0, 4));
        set.projection(z2.rows(0, 4), p2.rows_mut(0, 4));
        assert!((p1 - p2).norm() <= (z1 - z2).norm() + 1e-12);
    }
}

#[test]
fn test_active_set_masks() {
    let nonneg = NonnegOrthant::new();
    let z = DVector::from_vec(vec![1.0, -0.5, 0.0]);
    let mut mask = vec![false; 3];
    nonneg.compute_active_set(z.rows(0, 3), &mut mask);
    assert_eq!(mask, vec![false, true, true]);

    let soc = SecondOrderCone::new(3);
    let inside = DVector::from_vec(vec![5.0, 1.0, 1.0]);
    soc.compute_active_set(inside.rows(0, 3), &mut mask);
    assert!(mask.iter().all(|&m| !m));
    let outside = DVector::from_vec(vec![0.1, 1.0, 1.0]);
    soc.compute_active_set(outside.rows(0, 3), &mut mask);
    assert!(mask.iter().all(|&m| m));
}
