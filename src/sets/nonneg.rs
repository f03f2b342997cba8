//! Orthant sets.
//!
//! [`NonnegOrthant`] is ℝ₊ⁿ (constraints c(x) ≥ 0) and
//! [`NegativeOrthant`] is ℝ₋ⁿ (constraints c(x) ≤ 0). Projections are
//! componentwise clamps, so the normal-cone projection Jacobian is a
//! 0/1 diagonal selecting the active coordinates.

use std::cell::Cell;

use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut};

use super::ConstraintSet;

/// Nonnegative orthant ℝ₊ⁿ.
#[derive(Debug, Default)]
pub struct NonnegOrthant {
    mu: Cell<f64>,
}

impl NonnegOrthant {
    /// Create a nonnegative orthant set.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConstraintSet for NonnegOrthant {
    fn projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i].max(0.0);
        }
    }

    fn normal_cone_projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i].min(0.0);
        }
    }

    fn apply_normal_cone_jacobian(&self, z: DVectorView<f64>, mut jac: DMatrixViewMut<f64>) {
        debug_assert_eq!(z.len(), jac.nrows());
        for i in 0..z.len() {
            if z[i] > 0.0 {
                jac.row_mut(i).fill(0.0);
            }
        }
    }

    fn compute_active_set(&self, z: DVectorView<f64>, mask: &mut [bool]) {
        debug_assert_eq!(z.len(), mask.len());
        for i in 0..z.len() {
            mask[i] = z[i] <= 0.0;
        }
    }

    fn set_prox_parameter(&self, mu: f64) {
        self.mu.set(mu);
    }
}

/// Negative orthant ℝ₋ⁿ.
#[derive(Debug, Default)]
pub struct NegativeOrthant {
    mu: Cell<f64>,
}

impl NegativeOrthant {
    /// Create a negative orthant set.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConstraintSet for NegativeOrthant {
    fn projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i].min(0.0);
        }
    }

    fn normal_cone_projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i].max(0.0);
        }
    }

    fn apply_normal_cone_jacobian(&self, z: DVectorView<f64>, mut jac: DMatrixViewMut<f64>) {
        debug_assert_eq!(z.len(), jac.nrows());
        for i in 0..z.len() {
            if z[i] < 0.0 {
                jac.row_mut(i).fill(0.0);
            }
        }
    }

    fn compute_active_set(&self, z: DVectorView<f64>, mask: &mut [bool]) {
        debug_assert_eq!(z.len(), mask.len());
        for i in 0..z.len() {
            mask[i] = z[i] >= 0.0;
        }
    }

    fn set_prox_parameter(&self, mu: f64) {
        self.mu.set(mu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn test_nonneg_moreau_decomposition() {
        let set = NonnegOrthant::new();
        let z = DVector::from_vec(vec![1.5, -0.5, 0.0]);
        let mut proj = DVector::zeros(3);
        let mut ncp = DVector::zeros(3);

        set.projection(z.rows(0, 3), proj.rows_mut(0, 3));
        set.normal_cone_projection(z.rows(0, 3), ncp.rows_mut(0, 3));

        assert_eq!(&proj + &ncp, z);
        assert_eq!(proj, DVector::from_vec(vec![1.5, 0.0, 0.0]));
    }

    #[test]
    fn test_nonneg_projection_idempotent() {
        let set = NonnegOrthant::new();
        let z = DVector::from_vec(vec![2.0, -1.0]);
        let mut p1 = DVector::zeros(2);
        let mut p2 = DVector::zeros(2);
        set.projection(z.rows(0, 2), p1.rows_mut(0, 2));
        set.projection(p1.rows(0, 2), p2.rows_mut(0, 2));
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_nonneg_jacobian_masks_inactive_rows() {
        let set = NonnegOrthant::new();
        let z = DVector::from_vec(vec![1.0, -1.0]);
        let mut jac = DMatrix::from_element(2, 3, 1.0);
        set.apply_normal_cone_jacobian(z.rows(0, 2), jac.view_mut((0, 0), (2, 3)));
        assert_eq!(jac.row(0).sum(), 0.0);
        assert_eq!(jac.row(1).sum(), 3.0);
    }

    #[test]
    fn test_negative_orthant_mirrors_nonneg() {
        let nonneg = NonnegOrthant::new();
        let neg = NegativeOrthant::new();
        let z = DVector::from_vec(vec![1.5, -0.5]);
        let zm = -&z;

        let mut p_nonneg = DVector::zeros(2);
        let mut p_neg = DVector::zeros(2);
        nonneg.projection(z.rows(0, 2), p_nonneg.rows_mut(0, 2));
        neg.projection(zm.rows(0, 2), p_neg.rows_mut(0, 2));
        assert_eq!(p_neg, -p_nonneg);
    }
}
