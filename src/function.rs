//! Differentiable residual functions M → ℝʳ.
//!
//! Constraint residuals are maps from the manifold into an ambient
//! vector space, layered by differentiability order: [`C0Function`]
//! evaluates, [`C1Function`] adds the Jacobian (an nr × ndx matrix in
//! tangent coordinates), [`C2Function`] adds the vector-Hessian product
//! λ ↦ Σ_k λ_k ∇²c_k(x) used in the Newton matrix.
//!
//! All output goes through caller-provided views into pre-sized storage.

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};

use crate::manifold::{ArgSide, Manifold};

/// Evaluatable residual.
pub trait C0Function {
    /// Embedding dimension of the input point.
    fn nx(&self) -> usize;
    /// Tangent dimension of the input space.
    fn ndx(&self) -> usize;
    /// Output (residual) dimension.
    fn nr(&self) -> usize;

    /// Evaluate the residual at x into `out` (length `nr`).
    fn call(&self, x: &DVector<f64>, out: DVectorViewMut<f64>);
}

/// Once-differentiable residual.
pub trait C1Function: C0Function {
    /// Jacobian of the residual at x into `jac` (`nr × ndx`).
    fn jacobian(&self, x: &DVector<f64>, jac: DMatrixViewMut<f64>);
}

/// Twice-differentiable residual.
pub trait C2Function: C1Function {
    /// Vector-Hessian product Σ_k λ_k ∇²c_k(x), written to the
    /// `ndx × ndx` matrix `out`.
    ///
    /// The default is the zero matrix, which is exact for residuals that
    /// are affine in tangent coordinates.
    fn vector_hessian_product(
        &self,
        _x: &DVector<f64>,
        _lam: DVectorView<f64>,
        mut out: DMatrixViewMut<f64>,
    ) {
        out.fill(0.0);
    }
}

/// Affine residual c(x) = A·x + b on a flat space.
#[derive(Debug, Clone)]
pub struct LinearFunction {
    mat: DMatrix<f64>,
    vec: DVector<f64>,
}

impl LinearFunction {
    /// Build from the matrix A and offset b; `A.nrows() == b.len()`.
    pub fn new(mat: DMatrix<f64>, vec: DVector<f64>) -> Self {
        assert_eq!(mat.nrows(), vec.len(), "row count of A must match b");
        Self { mat, vec }
    }

    /// Residual c(x) = A·x (zero offset).
    pub fn from_matrix(mat: DMatrix<f64>) -> Self {
        let nr = mat.nrows();
        Self::new(mat, DVector::zeros(nr))
    }
}

impl C0Function for LinearFunction {
    fn nx(&self) -> usize {
        self.mat.ncols()
    }

    fn ndx(&self) -> usize {
        self.mat.ncols()
    }

    fn nr(&self) -> usize {
        self.mat.nrows()
    }

    fn call(&self, x: &DVector<f64>, mut out: DVectorViewMut<f64>) {
        out.gemv(1.0, &self.mat, x, 0.0);
        out += &self.vec;
    }
}

impl C1Function for LinearFunction {
    fn jacobian(&self, _x: &DVector<f64>, mut jac: DMatrixViewMut<f64>) {
        jac.copy_from(&self.mat);
    }
}

impl C2Function for LinearFunction {}

/// Residual r(x) = x ⊖ target on an arbitrary manifold.
///
/// Vanishes exactly at `target`; its Jacobian is the `jdifference` of
/// the manifold w.r.t. the moving argument. The second derivative is
/// dropped (exact on flat spaces and one-dimensional groups).
pub struct ManifoldDifference {
    space: Rc<dyn Manifold>,
    target: DVector<f64>,
    diff: RefCell<DVector<f64>>,
    jac: RefCell<DMatrix<f64>>,
}

impl ManifoldDifference {
    /// Residual anchored at `target`.
    pub fn new(space: Rc<dyn Manifold>, target: DVector<f64>) -> Self {
        assert_eq!(target.len(), space.nx(), "target must be a point of the space");
        let ndx = space.ndx();
        Self {
            space,
            target,
            diff: RefCell::new(DVector::zeros(ndx)),
            jac: RefCell::new(DMatrix::zeros(ndx, ndx)),
        }
    }

    /// The anchor point.
    pub fn target(&self) -> &DVector<f64> {
        &self.target
    }
}

impl C0Function for ManifoldDifference {
    fn nx(&self) -> usize {
        self.space.nx()
    }

    fn ndx(&self) -> usize {
        self.space.ndx()
    }

    fn nr(&self) -> usize {
        self.space.ndx()
    }

    fn call(&self, x: &DVector<f64>, mut out: DVectorViewMut<f64>) {
        let mut diff = self.diff.borrow_mut();
        self.space.difference(&self.target, x, &mut diff);
        out.copy_from(&*diff);
    }
}

impl C1Function for ManifoldDifference {
    fn jacobian(&self, x: &DVector<f64>, mut jac: DMatrixViewMut<f64>) {
        let mut scratch = self.jac.borrow_mut();
        self.space.jdifference(&self.target, x, &mut scratch, ArgSide::Second);
        jac.copy_from(&*scratch);
    }
}

impl C2Function for ManifoldDifference {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::VectorSpace;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_function() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, -1.0, 1.0]);
        let b = DVector::from_vec(vec![0.5, -0.5]);
        let f = LinearFunction::new(a, b);
        assert_eq!(f.nr(), 2);

        let x = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        let mut out = DVector::zeros(2);
        f.call(&x, out.rows_mut(0, 2));
        assert_abs_diff_eq!(out[0], 3.5);
        assert_abs_diff_eq!(out[1], -0.5);
    }

    #[test]
    fn test_manifold_difference_vanishes_at_target() {
        let space = Rc::new(VectorSpace::new(2));
        let target = DVector::from_vec(vec![1.0, 2.0]);
        let res = ManifoldDifference::new(space, target.clone());

        let mut out = DVector::zeros(2);
        res.call(&target, out.rows_mut(0, 2));
        assert_abs_diff_eq!(out.norm(), 0.0);

        let x = DVector::from_vec(vec![2.0, 0.0]);
        res.call(&x, out.rows_mut(0, 2));
        assert_abs_diff_eq!(out[0], 1.0);
        assert_abs_diff_eq!(out[1], -2.0);
    }
}
