//! Augmented-Lagrangian merit function and proximal penalty.
//!
//! The primal-dual merit at (x, λ) with penalty μ and previous
//! multipliers λ_prev is
//!
//! ```text
//! φ(x, λ) = f(x) + 1/(2μ)·Σ_i [ ‖Π_{N Cᵢ}(zᵢ)‖² + ‖Π_{N Cᵢ}(zᵢ) − μλᵢ‖² ]
//! ```
//!
//! with zᵢ = cᵢ(x) + μ λ_prevᵢ the shifted residual. In terms of the
//! first-order multiplier estimate λ⁺ᵢ = Π_{N Cᵢ}(zᵢ)/μ this reads
//! φ = f + (μ/2)(‖λ⁺‖² + ‖λ⁺ − λ‖²); its gradients are
//!
//! ```text
//! ∇_x φ = ∇f + Jᵀ(2λ⁺ − λ),        ∇_λ φ = −μ(λ⁺ − λ),
//! ```
//!
//! the primal-dual multiplier combination and the negated dual proximal
//! error. The proximal term ρ/2·d_M(x, x_prev)² is kept separate so the
//! solver can skip it when ρ = 0.

use nalgebra::{DMatrix, DVector};

use crate::manifold::{ArgSide, Manifold};
use crate::problem::Problem;

/// Augmented-Lagrangian part of the merit function.
#[derive(Debug, Clone)]
pub struct AlMerit {
    mu: f64,
}

impl AlMerit {
    /// Merit with an initial penalty.
    pub fn new(mu: f64) -> Self {
        assert!(mu > 0.0, "penalty must be positive");
        Self { mu }
    }

    /// Update the penalty parameter.
    pub fn set_penalty(&mut self, mu: f64) {
        assert!(mu > 0.0, "penalty must be positive");
        self.mu = mu;
    }

    /// Current penalty.
    pub fn penalty(&self) -> f64 {
        self.mu
    }

    /// Merit value at (x, λ).
    ///
    /// Requires `lams_plus` evaluated at x (normal-cone projections of
    /// the shifted residuals, divided by μ).
    pub fn evaluate(
        &self,
        problem: &Problem,
        x: &DVector<f64>,
        lams: &DVector<f64>,
        lams_plus: &DVector<f64>,
    ) -> f64 {
        let value = problem.cost().call(x);
        let mut acc = 0.0;
        for k in 0..lams_plus.len() {
            let lp = lams_plus[k];
            let d = lp - lams[k];
            acc += lp * lp + d * d;
        }
        value + 0.5 * self.mu * acc
    }
}

/// Proximal penalty ρ/2·d_M(x, target)² with identity weights.
#[derive(Debug, Clone)]
pub struct ProxPenalty {
    target: DVector<f64>,
    rho: f64,
}

impl ProxPenalty {
    /// Penalty anchored at `target` with weight ρ.
    pub fn new(target: DVector<f64>, rho: f64) -> Self {
        Self { target, rho }
    }

    /// Move the anchor (called after each outer iteration).
    pub fn update_target(&mut self, x: &DVector<f64>) {
        self.target.copy_from(x);
    }

    /// Update the weight.
    pub fn set_weight(&mut self, rho: f64) {
        self.rho = rho;
    }

    /// Current weight.
    pub fn weight(&self) -> f64 {
        self.rho
    }

    /// Penalty value; `diff` receives x ⊖ target.
    pub fn value(&self, space: &dyn Manifold, x: &DVector<f64>, diff: &mut DVector<f64>) -> f64 {
        space.difference(&self.target, x, diff);
        0.5 * self.rho * diff.norm_squared()
    }

    /// Gradient ρ·Jᵀd into `out`.
    pub fn gradient(
        &self,
        space: &dyn Manifold,
        x: &DVector<f64>,
        out: &mut DVector<f64>,
        diff: &mut DVector<f64>,
        jac: &mut DMatrix<f64>,
    ) {
        space.difference(&self.target, x, diff);
        space.jdifference(&self.target, x, jac, ArgSide::Second);
        out.gemv_tr(self.rho, jac, diff, 0.0);
    }

    /// Gauss-Newton Hessian ρ·JᵀJ into `out`.
    pub fn hessian(
        &self,
        space: &dyn Manifold,
        x: &DVector<f64>,
        out: &mut DMatrix<f64>,
        jac: &mut DMatrix<f64>,
    ) {
        space.jdifference(&self.target, x, jac, ArgSide::Second);
        out.gemm_tr(self.rho, jac, jac, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::VectorSpace;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_prox_penalty_flat_space() {
        let space = VectorSpace::new(2);
        let target = DVector::from_vec(vec![1.0, 0.0]);
        let prox = ProxPenalty::new(target, 2.0);

        let x = DVector::from_vec(vec![2.0, 2.0]);
        let mut diff = DVector::zeros(2);
        // ρ/2·‖x − target‖² = 1.0·5.0
        assert_abs_diff_eq!(prox.value(&space, &x, &mut diff), 5.0);

        let mut grad = DVector::zeros(2);
        let mut jac = DMatrix::zeros(2, 2);
        prox.gradient(&space, &x, &mut grad, &mut diff, &mut jac);
        assert_abs_diff_eq!(grad, DVector::from_vec(vec![2.0, 4.0]), epsilon = 1e-14);

        let mut hess = DMatrix::zeros(2, 2);
        prox.hessian(&space, &x, &mut hess, &mut jac);
        assert_abs_diff_eq!(hess, DMatrix::identity(2, 2) * 2.0, epsilon = 1e-14);
    }
}
