//! Constraint sets.
//!
//! Each constraint of the problem pairs a residual function c with a
//! closed convex set C. A set answers three questions:
//!
//! 1. the projection `P_C(z)`,
//! 2. the normal-cone projection `z − P_C(z)` (Moreau decomposition:
//!    `z = P_C(z) + P_{N C}(z)`),
//! 3. the generalized Jacobian of the normal-cone projection, applied in
//!    place to a Jacobian block to form the projected Jacobian used in
//!    the KKT system.
//!
//! Sets also report an active-set mask and carry the solver's proximal
//! parameter (written once per outer iteration, read by any set whose
//! operators depend on the scale).

mod boxset;
mod equality;
mod nonneg;
mod soc;

pub use boxset::BoxSet;
pub use equality::EqualitySet;
pub use nonneg::{NegativeOrthant, NonnegOrthant};
pub use soc::SecondOrderCone;

use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut};

/// Closed convex set with projection oracles.
///
/// All methods operate on contiguous views into the solver's flat
/// constraint-space vectors; the set is responsible for one block of
/// dimension `z.len()`.
pub trait ConstraintSet {
    /// Projection onto the set: `out = P_C(z)`.
    fn projection(&self, z: DVectorView<f64>, out: DVectorViewMut<f64>);

    /// Projection onto the normal cone: `out = z − P_C(z)`.
    fn normal_cone_projection(&self, z: DVectorView<f64>, out: DVectorViewMut<f64>);

    /// Multiply `jac` in place by the generalized derivative of the
    /// normal-cone projection at z.
    fn apply_normal_cone_jacobian(&self, z: DVectorView<f64>, jac: DMatrixViewMut<f64>);

    /// Mark the coordinates sitting at the active boundary of the set.
    fn compute_active_set(&self, z: DVectorView<f64>, mask: &mut [bool]);

    /// Store the solver's proximal parameter.
    ///
    /// Written by the solver at the top of each outer iteration, read
    /// only by the set itself (single-writer, single-reader).
    fn set_prox_parameter(&self, _mu: f64) {}

    /// True when the set's constraints never contribute a useful
    /// vector-Hessian term, so Gauss-Newton mode may skip it.
    fn disable_gauss_newton(&self) -> bool {
        false
    }
}
