//! Proximal augmented-Lagrangian solver.
//!
//! The outer loop follows the BCL (bound-constrained Lagrangian) recipe:
//! run the inner semismooth Newton method to the current inner tolerance
//! ω, then either accept the multiplier estimates and tighten the
//! tolerances (primal infeasibility met η) or shrink the penalty μ and
//! loosen them again. The proximal weight ρ is rescaled unconditionally
//! at the end of every outer iteration.

pub mod inertia;
mod inner;
pub mod linesearch;
pub mod logger;

pub use linesearch::{LinesearchOptions, LinesearchStrategy};
pub use logger::{InnerLogger, LogRecord};

use nalgebra::DVector;

use crate::error::SolverError;
use crate::merit::{AlMerit, ProxPenalty};
use crate::problem::Problem;
use crate::results::{ConvergenceFlag, Results};
use crate::workspace::Workspace;

/// Callback invoked at the end of each inner iteration with read-only
/// access to the workspace and results.
pub type Callback = Box<dyn Fn(&Workspace, &Results)>;

/// Logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerboseLevel {
    /// No output.
    #[default]
    Quiet,
    /// Outer headers and the inner iteration table.
    Verbose,
    /// Everything above plus per-iteration diagnostics.
    VeryVerbose,
}

/// BCL penalty and tolerance schedule parameters.
#[derive(Debug, Clone, Copy)]
pub struct BclParams {
    /// Exponent of μ in the failure rule for the primal tolerance.
    pub prim_alpha: f64,
    /// Exponent of μ/μ_up in the success rule for the primal tolerance.
    pub prim_beta: f64,
    /// Exponent of μ in the failure rule for the inner tolerance.
    pub dual_alpha: f64,
    /// Exponent of μ/μ_up in the success rule for the inner tolerance.
    pub dual_beta: f64,
    /// Multiplicative penalty update (μ ← μ·factor on failure).
    pub mu_update_factor: f64,
    /// Multiplicative proximal weight update, applied every outer
    /// iteration.
    pub rho_update_factor: f64,
}

impl Default for BclParams {
    fn default() -> Self {
        Self {
            prim_alpha: 0.1,
            prim_beta: 0.9,
            dual_alpha: 1.0,
            dual_beta: 1.0,
            mu_update_factor: 0.1,
            rho_update_factor: 1.0,
        }
    }
}

/// Solver construction parameters.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Target tolerance on primal and dual infeasibility.
    pub target_tol: f64,
    /// Initial penalty μ.
    pub mu_init: f64,
    /// Initial proximal weight ρ.
    pub rho_init: f64,
    /// Logging verbosity.
    pub verbose: VerboseLevel,
    /// Penalty floor μ_min.
    pub mu_lower: f64,
    /// Reference penalty μ_up used by the success tolerance rule.
    pub mu_upper: f64,
    /// BCL schedule parameters.
    pub bcl: BclParams,
    /// Line-search strategy.
    pub ls_strategy: LinesearchStrategy,
    /// Line-search parameters.
    pub ls_options: LinesearchOptions,
    /// Cap on total inner iterations.
    pub max_iters: usize,
    /// Drop vector-Hessian terms for sets that opt out.
    pub use_gauss_newton: bool,
    /// Floor on the inner tolerance ω.
    pub inner_tol_min: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            target_tol: 1e-6,
            mu_init: 0.01,
            rho_init: 0.0,
            verbose: VerboseLevel::Quiet,
            mu_lower: 1e-9,
            mu_upper: 1.0,
            bcl: BclParams::default(),
            ls_strategy: LinesearchStrategy::default(),
            ls_options: LinesearchOptions::default(),
            max_iters: 100,
            use_gauss_newton: false,
            inner_tol_min: 1e-9,
        }
    }
}

/// Proximal augmented-Lagrangian solver.
///
/// Borrows the problem (and through it the cost, constraint functions
/// and sets) for its lifetime; the only mutation of shared state is the
/// per-outer-iteration write of μ into each constraint set.
pub struct Solver<'p> {
    problem: &'p Problem,
    merit: AlMerit,
    prox_penalty: ProxPenalty,

    pub(crate) verbose: VerboseLevel,
    pub(crate) use_gauss_newton: bool,
    bcl: BclParams,
    pub(crate) ls_strategy: LinesearchStrategy,
    pub(crate) ls_options: LinesearchOptions,

    target_tol: f64,
    mu_init: f64,
    rho_init: f64,
    mu_lower: f64,
    mu_upper: f64,
    inner_tol_min: f64,
    max_iters: usize,

    pub(crate) mu: f64,
    pub(crate) mu_inv: f64,
    pub(crate) rho: f64,
    pub(crate) inner_tol: f64,
    prim_tol: f64,
    inner_tol0: f64,
    prim_tol0: f64,

    pub(crate) logger: InnerLogger,
    callbacks: Vec<Callback>,
}

impl<'p> Solver<'p> {
    /// Build a solver for `problem`.
    pub fn new(problem: &'p Problem, options: SolverOptions) -> Self {
        assert!(options.target_tol > 0.0, "target tolerance must be positive");
        assert!(options.mu_init > 0.0, "initial penalty must be positive");
        assert!(options.mu_lower > 0.0, "penalty floor must be positive");
        assert!(options.rho_init >= 0.0, "proximal weight must be nonnegative");
        assert!(
            options.ls_options.armijo_c1 > 0.0 && options.ls_options.armijo_c1 < 1.0,
            "armijo constant must lie in (0, 1)"
        );
        assert!(options.ls_options.alpha_min > 0.0, "alpha_min must be positive");

        let mu = options.mu_init;
        Self {
            problem,
            merit: AlMerit::new(mu),
            prox_penalty: ProxPenalty::new(problem.space().neutral(), options.rho_init),
            verbose: options.verbose,
            use_gauss_newton: options.use_gauss_newton,
            bcl: options.bcl,
            ls_strategy: options.ls_strategy,
            ls_options: options.ls_options,
            target_tol: options.target_tol,
            mu_init: options.mu_init,
            rho_init: options.rho_init,
            mu_lower: options.mu_lower,
            mu_upper: options.mu_upper,
            inner_tol_min: options.inner_tol_min,
            max_iters: options.max_iters,
            mu,
            mu_inv: 1.0 / mu,
            rho: options.rho_init,
            inner_tol: 1.0,
            prim_tol: 1.0,
            inner_tol0: 1.0,
            prim_tol0: 1.0,
            logger: InnerLogger::default(),
            callbacks: Vec::new(),
        }
    }

    /// Solver with default options except for the target tolerance.
    pub fn with_tolerance(problem: &'p Problem, tol: f64) -> Self {
        Self::new(
            problem,
            SolverOptions {
                target_tol: tol,
                ..SolverOptions::default()
            },
        )
    }

    /// The problem being solved.
    pub fn problem(&self) -> &'p Problem {
        self.problem
    }

    /// Set the penalty μ (propagated to the merit and every set).
    pub fn set_penalty(&mut self, mu: f64) {
        assert!(mu > 0.0, "penalty must be positive");
        self.mu = mu;
        self.mu_inv = 1.0 / mu;
        self.merit.set_penalty(mu);
        for i in 0..self.problem.num_constraints() {
            self.problem.constraint(i).set.set_prox_parameter(mu);
        }
    }

    /// Current penalty μ.
    pub fn penalty(&self) -> f64 {
        self.mu
    }

    /// Set the proximal weight ρ.
    pub fn set_prox_param(&mut self, rho: f64) {
        assert!(rho >= 0.0, "proximal weight must be nonnegative");
        self.rho = rho;
        self.prox_penalty.set_weight(rho);
    }

    /// Current proximal weight ρ.
    pub fn prox_param(&self) -> f64 {
        self.rho
    }

    /// Set the target tolerance.
    pub fn set_tolerance(&mut self, tol: f64) {
        assert!(tol > 0.0, "tolerance must be positive");
        self.target_tol = tol;
    }

    /// Current target tolerance.
    pub fn tolerance(&self) -> f64 {
        self.target_tol
    }

    /// Set the cap on total inner iterations.
    pub fn set_max_iters(&mut self, n: usize) {
        self.max_iters = n;
    }

    /// Current iteration cap.
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Register an end-of-iteration callback.
    pub fn register_callback(&mut self, cb: Callback) {
        self.callbacks.push(cb);
    }

    /// Drop all registered callbacks.
    pub fn clear_callbacks(&mut self) {
        self.callbacks.clear();
    }

    /// Solve from `x0` with a flat multiplier warm start.
    pub fn solve(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        x0: &DVector<f64>,
        lams0: &DVector<f64>,
    ) -> Result<ConvergenceFlag, SolverError> {
        let nx = self.problem.nx();
        let nc = self.problem.total_constraint_dim();
        if x0.len() != nx {
            return Err(SolverError::DimensionMismatch {
                expected: nx,
                actual: x0.len(),
            });
        }
        if lams0.len() != nc {
            return Err(SolverError::DimensionMismatch {
                expected: nc,
                actual: lams0.len(),
            });
        }

        self.logger.active = self.verbose != VerboseLevel::Quiet;
        self.set_penalty(self.mu_init);
        self.set_prox_param(self.rho_init);

        results.reset();
        results.x_opt.copy_from(x0);
        workspace.x_prev.copy_from(x0);
        results.lams_opt.copy_from(lams0);
        workspace.lams_prev.copy_from(lams0);
        self.prox_penalty.update_target(x0);

        self.update_tolerance_failure();

        let mut outer_iter = 0usize;
        while results.num_iters < self.max_iters {
            results.mu = self.mu;
            results.rho = self.rho;
            if self.verbose != VerboseLevel::Quiet {
                eprintln!(
                    "[AL iter {:>2}] omega={:.3e}, eta={:.3e}, mu={:.4e}",
                    outer_iter, self.inner_tol, self.prim_tol, self.mu
                );
            }
            if results.num_iters == 0 {
                self.logger.start();
            }

            if let Err(err) = self.solve_inner(workspace, results) {
                results.converged = ConvergenceFlag::NumericalFailure;
                return Err(err);
            }

            if self.verbose == VerboseLevel::VeryVerbose {
                eprintln!(
                    "  value={:.6e} merit={:.6e} prim={:.3e} dual={:.3e}",
                    results.value, results.merit, results.prim_infeas, results.dual_infeas
                );
            }

            workspace.x_prev.copy_from(&results.x_opt);
            self.prox_penalty.update_target(&results.x_opt);

            if results.prim_infeas < self.prim_tol {
                // accept the first-order multiplier estimates
                workspace.lams_prev.copy_from(&workspace.lams_plus);
                if results.prim_infeas < self.target_tol && results.dual_infeas < self.target_tol {
                    results.converged = ConvergenceFlag::Success;
                    break;
                }
                self.update_tolerance_success();
            } else {
                self.update_penalty();
                self.update_tolerance_failure();
            }
            self.set_prox_param(self.rho * self.bcl.rho_update_factor);

            outer_iter += 1;
        }

        for cb in &self.callbacks {
            cb(workspace, results);
        }

        if self.verbose != VerboseLevel::Quiet {
            eprintln!("solver terminated: {} ({} iters)", results.converged, results.num_iters);
        }

        Ok(results.converged)
    }

    /// Solve with per-constraint multiplier blocks.
    pub fn solve_with_blocks(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        x0: &DVector<f64>,
        lams0: &[DVector<f64>],
    ) -> Result<ConvergenceFlag, SolverError> {
        let numc = self.problem.num_constraints();
        if lams0.len() != numc {
            return Err(SolverError::DimensionMismatch {
                expected: numc,
                actual: lams0.len(),
            });
        }
        let mut flat = DVector::zeros(self.problem.total_constraint_dim());
        for (i, block) in lams0.iter().enumerate() {
            let nr = self.problem.constraint_dim(i);
            if block.len() != nr {
                return Err(SolverError::DimensionMismatch {
                    expected: nr,
                    actual: block.len(),
                });
            }
            flat.rows_mut(self.problem.index(i), nr).copy_from(block);
        }
        self.solve(workspace, results, x0, &flat)
    }

    /// Solve with zero initial multipliers.
    pub fn solve_cold(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        x0: &DVector<f64>,
    ) -> Result<ConvergenceFlag, SolverError> {
        let lams0 = DVector::zeros(self.problem.total_constraint_dim());
        self.solve(workspace, results, x0, &lams0)
    }

    fn update_penalty(&mut self) {
        if self.mu == self.mu_lower {
            self.set_penalty(self.mu_init);
        } else {
            self.set_penalty((self.mu * self.bcl.mu_update_factor).max(self.mu_lower));
        }
        log::debug!("penalty update: mu = {:e}", self.mu);
    }

    fn update_tolerance_failure(&mut self) {
        self.prim_tol = self.prim_tol0 * self.mu.powf(self.bcl.prim_alpha);
        self.inner_tol = self.inner_tol0 * self.mu.powf(self.bcl.dual_alpha);
        self.tolerance_post_update();
    }

    fn update_tolerance_success(&mut self) {
        let ratio = self.mu / self.mu_upper;
        self.prim_tol *= ratio.powf(self.bcl.prim_beta);
        self.inner_tol *= ratio.powf(self.bcl.dual_beta);
        self.tolerance_post_update();
    }

    fn tolerance_post_update(&mut self) {
        self.inner_tol = self.inner_tol.max(self.inner_tol_min);
        self.prim_tol = self.prim_tol.max(self.target_tol);
    }
}
