//! Box set: componentwise interval [lb, ub].
//!
//! Projection is the componentwise clamp; the normal-cone projection
//! keeps the overshoot past either bound.

use std::cell::Cell;

use nalgebra::{DMatrixViewMut, DVector, DVectorView, DVectorViewMut};

use super::ConstraintSet;

/// Interval set Π_i [lb_i, ub_i].
#[derive(Debug)]
pub struct BoxSet {
    lower: DVector<f64>,
    upper: DVector<f64>,
    mu: Cell<f64>,
}

impl BoxSet {
    /// Build from bound vectors; requires `lb_i <= ub_i` componentwise.
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Self {
        assert_eq!(lower.len(), upper.len(), "bound vectors must have equal length");
        for i in 0..lower.len() {
            assert!(lower[i] <= upper[i], "lower bound {} exceeds upper bound", i);
        }
        Self {
            lower,
            upper,
            mu: Cell::new(0.0),
        }
    }

    /// Symmetric box [-r, r]ⁿ.
    pub fn symmetric(dim: usize, radius: f64) -> Self {
        assert!(radius >= 0.0);
        Self::new(
            DVector::from_element(dim, -radius),
            DVector::from_element(dim, radius),
        )
    }

    /// Dimension of the set.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }
}

impl ConstraintSet for BoxSet {
    fn projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        debug_assert_eq!(z.len(), self.dim());
        for i in 0..z.len() {
            out[i] = z[i].clamp(self.lower[i], self.upper[i]);
        }
    }

    fn normal_cone_projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i] - z[i].clamp(self.lower[i], self.upper[i]);
        }
    }

    fn apply_normal_cone_jacobian(&self, z: DVectorView<f64>, mut jac: DMatrixViewMut<f64>) {
        debug_assert_eq!(z.len(), jac.nrows());
        for i in 0..z.len() {
            if z[i] > self.lower[i] && z[i] < self.upper[i] {
                jac.row_mut(i).fill(0.0);
            }
        }
    }

    fn compute_active_set(&self, z: DVectorView<f64>, mask: &mut [bool]) {
        debug_assert_eq!(z.len(), mask.len());
        for i in 0..z.len() {
            mask[i] = z[i] <= self.lower[i] || z[i] >= self.upper[i];
        }
    }

    fn set_prox_parameter(&self, mu: f64) {
        self.mu.set(mu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn test_box_moreau_decomposition() {
        let set = BoxSet::symmetric(3, 1.0);
        let z = DVector::from_vec(vec![2.0, -3.0, 0.5]);
        let mut proj = DVector::zeros(3);
        let mut ncp = DVector::zeros(3);

        set.projection(z.rows(0, 3), proj.rows_mut(0, 3));
        set.normal_cone_projection(z.rows(0, 3), ncp.rows_mut(0, 3));

        assert_eq!(proj, DVector::from_vec(vec![1.0, -1.0, 0.5]));
        assert_eq!(&proj + &ncp, z);
    }

    #[test]
    fn test_box_active_set() {
        let set = BoxSet::new(
            DVector::from_vec(vec![0.0, -1.0]),
            DVector::from_vec(vec![1.0, 1.0]),
        );
        let z = DVector::from_vec(vec![1.5, 0.0]);
        let mut mask = vec![false; 2];
        set.compute_active_set(z.rows(0, 2), &mut mask);
        assert_eq!(mask, vec![true, false]);
    }

    #[test]
    fn test_box_jacobian_keeps_saturated_rows() {
        let set = BoxSet::symmetric(2, 1.0);
        let z = DVector::from_vec(vec![2.0, 0.0]);
        let mut jac = DMatrix::from_element(2, 2, 1.0);
        set.apply_normal_cone_jacobian(z.rows(0, 2), jac.view_mut((0, 0), (2, 2)));
        assert_eq!(jac.row(0).sum(), 2.0);
        assert_eq!(jac.row(1).sum(), 0.0);
    }
}
