//! Solve results and termination status.

use std::fmt;

use nalgebra::{DVector, DVectorView};

use crate::problem::Problem;

/// Termination status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceFlag {
    /// Primal and dual infeasibility both below the target tolerance.
    Success,
    /// Iteration limit reached before convergence.
    MaxItersReached,
    /// The solve was aborted on a numerical failure (NaN detected).
    NumericalFailure,
}

impl fmt::Display for ConvergenceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceFlag::Success => write!(f, "Success"),
            ConvergenceFlag::MaxItersReached => write!(f, "MaxItersReached"),
            ConvergenceFlag::NumericalFailure => write!(f, "NumericalFailure"),
        }
    }
}

/// Iterates and diagnostics of a solve.
///
/// Allocated once from the problem and refilled by each call to
/// `Solver::solve`.
#[derive(Debug, Clone)]
pub struct Results {
    /// Primal solution.
    pub x_opt: DVector<f64>,
    /// Flat multiplier vector (per-constraint blocks via
    /// [`multiplier_block`](Self::multiplier_block)).
    pub lams_opt: DVector<f64>,
    /// Termination status.
    pub converged: ConvergenceFlag,
    /// Cost value at the current iterate.
    pub value: f64,
    /// Merit value at the current iterate.
    pub merit: f64,
    /// Primal infeasibility (∞-norm over constraint violations).
    pub prim_infeas: f64,
    /// Dual infeasibility (∞-norm of the Lagrangian gradient).
    pub dual_infeas: f64,
    /// Penalty parameter of the current outer iteration.
    pub mu: f64,
    /// Proximal weight of the current outer iteration.
    pub rho: f64,
    /// Per-constraint violation ∞-norms.
    pub constraint_violations: DVector<f64>,
    /// Per-constraint active-set masks.
    pub active_set: Vec<Vec<bool>>,
    /// Total inner iterations performed.
    pub num_iters: usize,

    offsets: Vec<usize>,
    dims: Vec<usize>,
}

impl Results {
    /// Allocate results storage for a problem.
    pub fn new(problem: &Problem) -> Self {
        let numc = problem.num_constraints();
        let offsets = (0..numc).map(|i| problem.index(i)).collect();
        let dims: Vec<usize> = (0..numc).map(|i| problem.constraint_dim(i)).collect();
        Self {
            x_opt: problem.space().neutral(),
            lams_opt: DVector::zeros(problem.total_constraint_dim()),
            converged: ConvergenceFlag::MaxItersReached,
            value: 0.0,
            merit: 0.0,
            prim_infeas: 0.0,
            dual_infeas: 0.0,
            mu: 0.0,
            rho: 0.0,
            constraint_violations: DVector::zeros(numc),
            active_set: dims.iter().map(|&d| vec![false; d]).collect(),
            num_iters: 0,
            offsets,
            dims,
        }
    }

    /// Multiplier block of constraint i.
    pub fn multiplier_block(&self, i: usize) -> DVectorView<f64> {
        self.lams_opt.rows(self.offsets[i], self.dims[i])
    }

    /// Reset counters and status for a fresh solve.
    pub(crate) fn reset(&mut self) {
        self.converged = ConvergenceFlag::MaxItersReached;
        self.value = 0.0;
        self.merit = 0.0;
        self.prim_infeas = 0.0;
        self.dual_infeas = 0.0;
        self.num_iters = 0;
        self.constraint_violations.fill(0.0);
        for mask in &mut self.active_set {
            mask.fill(false);
        }
    }
}
