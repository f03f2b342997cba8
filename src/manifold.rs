//! Manifold interface.
//!
//! The decision variable of the solver lives on a differentiable
//! manifold M with an embedding dimension `nx` and a tangent dimension
//! `ndx`. The solver only ever touches M through this trait:
//!
//! - `integrate(x, v)`: retraction, maps a tangent vector v ∈ T_xM onto
//!   the manifold;
//! - `difference(x, y)`: inverse retraction, the tangent vector from x
//!   to y;
//! - `jdifference(x, y, side)`: Jacobian of `difference` with respect to
//!   one of its arguments, an ndx × ndx matrix.
//!
//! # Invariants
//!
//! - `difference(x, integrate(x, v)) == v` for all admissible (x, v);
//! - `integrate(x, difference(x, y)) == y`.
//!
//! All methods write into caller-provided storage and are suitable for
//! allocation-free inner loops.

use nalgebra::{DMatrix, DVector};

/// Which argument of `difference` a Jacobian is taken with respect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSide {
    /// Differentiate w.r.t. the base point x.
    First,
    /// Differentiate w.r.t. the target point y.
    Second,
}

/// Differentiable manifold with a retraction and its inverse.
pub trait Manifold {
    /// Embedding (representation) dimension of a point.
    fn nx(&self) -> usize;

    /// Tangent space dimension.
    fn ndx(&self) -> usize;

    /// A canonical neutral point of the manifold.
    fn neutral(&self) -> DVector<f64>;

    /// Retraction: `out = x ⊕ v` with v ∈ T_xM.
    fn integrate(&self, x: &DVector<f64>, v: &DVector<f64>, out: &mut DVector<f64>);

    /// Inverse retraction: `out = y ⊖ x`, so that `integrate(x, out) = y`.
    fn difference(&self, x: &DVector<f64>, y: &DVector<f64>, out: &mut DVector<f64>);

    /// Jacobian of `difference(x, y)` w.r.t. the argument selected by
    /// `side`, written to the ndx × ndx matrix `jac`.
    fn jdifference(&self, x: &DVector<f64>, y: &DVector<f64>, jac: &mut DMatrix<f64>, side: ArgSide);
}

/// Flat vector space ℝⁿ: retraction is addition.
#[derive(Debug, Clone)]
pub struct VectorSpace {
    dim: usize,
}

impl VectorSpace {
    /// Create a Euclidean space of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Manifold for VectorSpace {
    fn nx(&self) -> usize {
        self.dim
    }

    fn ndx(&self) -> usize {
        self.dim
    }

    fn neutral(&self) -> DVector<f64> {
        DVector::zeros(self.dim)
    }

    fn integrate(&self, x: &DVector<f64>, v: &DVector<f64>, out: &mut DVector<f64>) {
        debug_assert_eq!(x.len(), self.dim);
        debug_assert_eq!(v.len(), self.dim);
        out.copy_from(x);
        *out += v;
    }

    fn difference(&self, x: &DVector<f64>, y: &DVector<f64>, out: &mut DVector<f64>) {
        out.copy_from(y);
        *out -= x;
    }

    fn jdifference(&self, _x: &DVector<f64>, _y: &DVector<f64>, jac: &mut DMatrix<f64>, side: ArgSide) {
        jac.fill(0.0);
        let sign = match side {
            ArgSide::First => -1.0,
            ArgSide::Second => 1.0,
        };
        for i in 0..self.dim {
            jac[(i, i)] = sign;
        }
    }
}

/// Rotation group SO(2), points stored as (cos θ, sin θ).
///
/// `nx = 2`, `ndx = 1`; the tangent coordinate is the rotation angle.
#[derive(Debug, Clone, Default)]
pub struct So2;

impl So2 {
    /// Point from an angle.
    pub fn point(theta: f64) -> DVector<f64> {
        DVector::from_vec(vec![theta.cos(), theta.sin()])
    }

    /// Angle of a point.
    pub fn angle(x: &DVector<f64>) -> f64 {
        x[1].atan2(x[0])
    }
}

impl Manifold for So2 {
    fn nx(&self) -> usize {
        2
    }

    fn ndx(&self) -> usize {
        1
    }

    fn neutral(&self) -> DVector<f64> {
        DVector::from_vec(vec![1.0, 0.0])
    }

    fn integrate(&self, x: &DVector<f64>, v: &DVector<f64>, out: &mut DVector<f64>) {
        debug_assert_eq!(x.len(), 2);
        debug_assert_eq!(v.len(), 1);
        let (c, s) = (v[0].cos(), v[0].sin());
        let (x0, x1) = (x[0], x[1]);
        out[0] = c * x0 - s * x1;
        out[1] = s * x0 + c * x1;
    }

    fn difference(&self, x: &DVector<f64>, y: &DVector<f64>, out: &mut DVector<f64>) {
        // angle of xᵀ·y, i.e. the relative rotation from x to y
        let c = x[0] * y[0] + x[1] * y[1];
        let s = x[0] * y[1] - x[1] * y[0];
        out[0] = s.atan2(c);
    }

    fn jdifference(&self, _x: &DVector<f64>, _y: &DVector<f64>, jac: &mut DMatrix<f64>, side: ArgSide) {
        jac[(0, 0)] = match side {
            ArgSide::First => -1.0,
            ArgSide::Second => 1.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_vector_space_round_trip() {
        let space = VectorSpace::new(3);
        let x = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let v = DVector::from_vec(vec![0.1, 0.2, -0.3]);
        let mut y = DVector::zeros(3);
        let mut back = DVector::zeros(3);

        space.integrate(&x, &v, &mut y);
        space.difference(&x, &y, &mut back);
        assert_abs_diff_eq!(back, v, epsilon = 1e-14);
    }

    #[test]
    fn test_so2_round_trip() {
        let space = So2;
        let x = So2::point(0.7);
        let v = DVector::from_vec(vec![-1.3]);
        let mut y = DVector::zeros(2);
        let mut back = DVector::zeros(1);

        space.integrate(&x, &v, &mut y);
        space.difference(&x, &y, &mut back);
        assert_abs_diff_eq!(back[0], v[0], epsilon = 1e-12);

        // integrate(x, difference(x, y)) == y
        let z = So2::point(2.9);
        space.difference(&x, &z, &mut back);
        let mut fwd = DVector::zeros(2);
        space.integrate(&x, &back, &mut fwd);
        assert_abs_diff_eq!(fwd, z, epsilon = 1e-12);
    }

    #[test]
    fn test_so2_neutral_is_identity() {
        let space = So2;
        let x = So2::point(1.1);
        let mut d = DVector::zeros(1);
        space.difference(&space.neutral(), &x, &mut d);
        assert_abs_diff_eq!(d[0], 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_jdifference_signs() {
        let space = VectorSpace::new(2);
        let x = DVector::zeros(2);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let mut jac = DMatrix::zeros(2, 2);

        space.jdifference(&x, &y, &mut jac, ArgSide::Second);
        assert_eq!(jac, DMatrix::identity(2, 2));
        space.jdifference(&x, &y, &mut jac, ArgSide::First);
        assert_eq!(jac, -DMatrix::identity(2, 2));
    }
}
