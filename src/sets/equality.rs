//! Equality set: the singleton {0}.
//!
//! Represents equality constraints c(x) = 0. The projection collapses
//! everything to the origin, so the normal-cone projection is the
//! identity and every coordinate is always active.

use std::cell::Cell;

use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut};

use super::ConstraintSet;

/// The set {0}, for equality constraints.
#[derive(Debug, Default)]
pub struct EqualitySet {
    mu: Cell<f64>,
}

impl EqualitySet {
    /// Create an equality set.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConstraintSet for EqualitySet {
    fn projection(&self, _z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        out.fill(0.0);
    }

    fn normal_cone_projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        out.copy_from(&z);
    }

    fn apply_normal_cone_jacobian(&self, _z: DVectorView<f64>, _jac: DMatrixViewMut<f64>) {
        // derivative is the identity
    }

    fn compute_active_set(&self, z: DVectorView<f64>, mask: &mut [bool]) {
        debug_assert_eq!(z.len(), mask.len());
        mask.fill(true);
    }

    fn set_prox_parameter(&self, mu: f64) {
        self.mu.set(mu);
    }

    fn disable_gauss_newton(&self) -> bool {
        true
    }
}
