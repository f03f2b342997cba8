//! Pre-sized scratch storage for the solve.
//!
//! Every buffer the hot path touches is allocated here, once, from the
//! problem dimensions; `solve` itself performs no allocation. Matrix
//! and vector views into this storage are borrowed by the inner loop
//! with lifetimes scoped to each step.

use nalgebra::{DMatrix, DVector, DVectorView};

use crate::linalg::ldlt::{allocate_ldlt_from_problem, LdltChoice, LdltDriver};
use crate::problem::Problem;

/// Scratch arena of the solver.
pub struct Workspace {
    /// Tangent dimension.
    pub ndx: usize,
    /// Total constraint dimension.
    pub nc: usize,
    /// KKT system dimension (ndx + nc).
    pub kkt_dim: usize,

    /// Previous outer iterate (prox anchor).
    pub x_prev: DVector<f64>,
    /// Line-search trial point.
    pub x_trial: DVector<f64>,
    /// Multipliers of the previous outer iteration.
    pub lams_prev: DVector<f64>,
    /// Line-search trial multipliers.
    pub lams_trial: DVector<f64>,

    /// Constraint residuals c(x), flat.
    pub cstr_values: DVector<f64>,
    /// Shifted residuals z = c(x) + μ·λ_prev.
    pub shift_cstr_values: DVector<f64>,
    /// Blockwise projections Π_C(z).
    pub proj_cstr_values: DVector<f64>,
    /// First-order multiplier estimates λ⁺ = Π_{NC}(z)/μ.
    pub lams_plus: DVector<f64>,
    /// Primal-dual estimates λ_pdal = 2λ⁺ − λ.
    pub lams_pdal: DVector<f64>,
    /// Dual proximal error μ(λ⁺ − λ).
    pub dual_prox_err: DVector<f64>,

    /// Stacked constraint Jacobians (nc × ndx).
    pub jacobians: DMatrix<f64>,
    /// Jacobians transformed by the normal-cone projection derivative.
    pub jacobians_proj: DMatrix<f64>,
    /// Per-constraint vector-Hessian products (each ndx × ndx).
    pub cstr_vhp: Vec<DMatrix<f64>>,

    /// Cost gradient.
    pub objective_gradient: DVector<f64>,
    /// Cost Hessian.
    pub objective_hessian: DMatrix<f64>,
    /// Proximal penalty gradient.
    pub prox_grad: DVector<f64>,
    /// Proximal penalty Hessian.
    pub prox_hess: DMatrix<f64>,
    /// Scratch for manifold differences in the prox term.
    pub prox_diff: DVector<f64>,
    /// Scratch for manifold Jacobians in the prox term.
    pub prox_jac: DMatrix<f64>,

    /// Merit gradient (cost + Jᵀλ_pdal + prox).
    pub merit_gradient: DVector<f64>,
    /// Dual residual ∇f + Jᵀλ.
    pub dual_residual: DVector<f64>,

    /// KKT matrix, (ndx + nc)².
    pub kkt_matrix: DMatrix<f64>,
    /// KKT right-hand side.
    pub kkt_rhs: DVector<f64>,
    /// Primal-dual Newton step.
    pub pd_step: DVector<f64>,
    /// Refinement residual K·step + rhs.
    pub kkt_resdl: DVector<f64>,
    /// Refinement correction.
    pub kkt_corr: DVector<f64>,
    /// Scaled primal step α·Δx fed to the retraction.
    pub dx_scaled: DVector<f64>,
    /// Sign pattern of D from the factorization.
    pub signature: Vec<i8>,

    /// Directional derivative of the merit along the step.
    pub dmerit_dir: f64,
    /// Step length accepted by the line search.
    pub alpha_opt: f64,

    /// LDLᵀ driver (owns its factor storage).
    pub ldlt: Box<dyn LdltDriver>,
}

impl Workspace {
    /// Allocate all buffers for `problem`, using the given LDLᵀ driver.
    pub fn with_ldlt(problem: &Problem, choice: LdltChoice) -> Self {
        let nx = problem.nx();
        let ndx = problem.ndx();
        let nc = problem.total_constraint_dim();
        let numc = problem.num_constraints();
        let kkt_dim = ndx + nc;
        Self {
            ndx,
            nc,
            kkt_dim,
            x_prev: DVector::zeros(nx),
            x_trial: DVector::zeros(nx),
            lams_prev: DVector::zeros(nc),
            lams_trial: DVector::zeros(nc),
            cstr_values: DVector::zeros(nc),
            shift_cstr_values: DVector::zeros(nc),
            proj_cstr_values: DVector::zeros(nc),
            lams_plus: DVector::zeros(nc),
            lams_pdal: DVector::zeros(nc),
            dual_prox_err: DVector::zeros(nc),
            jacobians: DMatrix::zeros(nc, ndx),
            jacobians_proj: DMatrix::zeros(nc, ndx),
            cstr_vhp: (0..numc).map(|_| DMatrix::zeros(ndx, ndx)).collect(),
            objective_gradient: DVector::zeros(ndx),
            objective_hessian: DMatrix::zeros(ndx, ndx),
            prox_grad: DVector::zeros(ndx),
            prox_hess: DMatrix::zeros(ndx, ndx),
            prox_diff: DVector::zeros(ndx),
            prox_jac: DMatrix::zeros(ndx, ndx),
            merit_gradient: DVector::zeros(ndx),
            dual_residual: DVector::zeros(ndx),
            kkt_matrix: DMatrix::zeros(kkt_dim, kkt_dim),
            kkt_rhs: DVector::zeros(kkt_dim),
            pd_step: DVector::zeros(kkt_dim),
            kkt_resdl: DVector::zeros(kkt_dim),
            kkt_corr: DVector::zeros(kkt_dim),
            dx_scaled: DVector::zeros(ndx),
            signature: vec![0; kkt_dim],
            dmerit_dir: 0.0,
            alpha_opt: 1.0,
            ldlt: allocate_ldlt_from_problem(problem, choice),
        }
    }

    /// Allocate with the default (dense) LDLᵀ driver.
    pub fn new(problem: &Problem) -> Self {
        Self::with_ldlt(problem, LdltChoice::default())
    }

    /// Primal part of the Newton step.
    pub fn prim_step(&self) -> DVectorView<f64> {
        self.pd_step.rows(0, self.ndx)
    }

    /// Dual part of the Newton step.
    pub fn dual_step(&self) -> DVectorView<f64> {
        self.pd_step.rows(self.ndx, self.nc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::QuadraticCost;
    use crate::function::LinearFunction;
    use crate::manifold::VectorSpace;
    use crate::problem::ConstraintObject;
    use crate::sets::EqualitySet;
    use std::rc::Rc;

    #[test]
    fn test_workspace_sizes() {
        let space = Rc::new(VectorSpace::new(4));
        let cost = QuadraticCost::new(DMatrix::identity(4, 4), DVector::zeros(4));
        let cstr = ConstraintObject::new(
            Box::new(LinearFunction::from_matrix(DMatrix::zeros(2, 4))),
            Box::new(EqualitySet::new()),
        );
        let prob = Problem::new(space, Box::new(cost), vec![cstr]);
        let ws = Workspace::new(&prob);

        assert_eq!(ws.kkt_dim, 6);
        assert_eq!(ws.kkt_matrix.nrows(), 6);
        assert_eq!(ws.jacobians.shape(), (2, 4));
        assert_eq!(ws.cstr_vhp.len(), 1);
        assert_eq!(ws.ldlt.dim(), 6);
    }
}
