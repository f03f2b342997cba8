//! Inner semismooth Newton loop.
//!
//! Each iteration evaluates the problem at the current iterate, forms
//! the primal-dual KKT system, corrects its inertia, refines the Newton
//! step and globalizes it with an Armijo search on the merit function.

use nalgebra::{DVector, Dim, Matrix, RawStorage};

use crate::error::SolverError;
use crate::problem::Problem;
use crate::results::{ConvergenceFlag, Results};
use crate::util::{has_nan, infty_norm};
use crate::workspace::Workspace;

use super::inertia::{self, check_inertia, signature_of, InertiaFlag};
use super::linesearch::{armijo_backtrack, LinesearchStrategy};
use super::logger::LogRecord;
use super::Solver;

const MAX_REFINEMENT_STEPS: usize = 5;
const REFINE_EPS: f64 = 1e-13;

fn check_nan<R, C, S>(m: &Matrix<f64, R, C, S>, name: &'static str) -> Result<(), SolverError>
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    if has_nan(m) {
        Err(SolverError::NumericalNaN(name))
    } else {
        Ok(())
    }
}

/// Shifted residuals and multiplier estimates at a point.
///
/// Computes z = c + μ·λ_prev, λ⁺ = Π_{NC}(z)/μ, the dual proximal error
/// μ(λ⁺ − λ) and the primal-dual combination λ_pdal = 2λ⁺ − λ.
#[allow(clippy::too_many_arguments)]
fn compute_multiplier_estimates(
    problem: &Problem,
    mu: f64,
    mu_inv: f64,
    cstr_values: &DVector<f64>,
    lams_prev: &DVector<f64>,
    lams: &DVector<f64>,
    shift_cstr: &mut DVector<f64>,
    lams_plus: &mut DVector<f64>,
    lams_pdal: &mut DVector<f64>,
    dual_prox_err: &mut DVector<f64>,
) {
    shift_cstr.copy_from(cstr_values);
    shift_cstr.axpy(mu, lams_prev, 1.0);
    for i in 0..problem.num_constraints() {
        let (idx, nr) = (problem.index(i), problem.constraint_dim(i));
        problem
            .constraint(i)
            .set
            .normal_cone_projection(shift_cstr.rows(idx, nr), lams_plus.rows_mut(idx, nr));
    }
    *lams_plus *= mu_inv;
    dual_prox_err.copy_from(lams_plus);
    dual_prox_err.axpy(-1.0, lams, 1.0);
    *dual_prox_err *= mu;
    lams_pdal.copy_from(lams_plus);
    *lams_pdal *= 2.0;
    lams_pdal.axpy(-1.0, lams, 1.0);
}

impl Solver<'_> {
    /// Run inner Newton iterations until the inner tolerance, the outer
    /// target or the iteration cap is hit.
    pub(crate) fn solve_inner(
        &mut self,
        ws: &mut Workspace,
        results: &mut Results,
    ) -> Result<(), SolverError> {
        let problem = self.problem;
        let ndx = problem.ndx();
        let nc = problem.total_constraint_dim();
        let numc = problem.num_constraints();

        // the inner dual iterate restarts from the accepted multipliers
        results.lams_opt.copy_from(&ws.lams_prev);

        // accepted shift of the previous iteration, seeds the schedule
        let mut delta_last = 0.0_f64;

        loop {
            results.value = problem.cost().call(&results.x_opt);

            problem.evaluate_constraints(&results.x_opt, &mut ws.cstr_values);
            compute_multiplier_estimates(
                problem,
                self.mu,
                self.mu_inv,
                &ws.cstr_values,
                &ws.lams_prev,
                &results.lams_opt,
                &mut ws.shift_cstr_values,
                &mut ws.lams_plus,
                &mut ws.lams_pdal,
                &mut ws.dual_prox_err,
            );

            problem.cost().gradient(&results.x_opt, &mut ws.objective_gradient);
            problem.cost().hessian(&results.x_opt, &mut ws.objective_hessian);
            problem.constraint_jacobians(&results.x_opt, &mut ws.jacobians);
            ws.jacobians_proj.copy_from(&ws.jacobians);
            for i in 0..numc {
                let (idx, nr) = (problem.index(i), problem.constraint_dim(i));
                let cstr = problem.constraint(i);
                cstr.set.apply_normal_cone_jacobian(
                    ws.shift_cstr_values.rows(idx, nr),
                    ws.jacobians_proj.view_mut((idx, 0), (nr, ndx)),
                );
                if !(self.use_gauss_newton && cstr.set.disable_gauss_newton()) {
                    cstr.func.vector_hessian_product(
                        &results.x_opt,
                        ws.lams_pdal.rows(idx, nr),
                        ws.cstr_vhp[i].view_mut((0, 0), (ndx, ndx)),
                    );
                }
            }

            results.merit =
                self.merit
                    .evaluate(problem, &results.x_opt, &results.lams_opt, &ws.lams_plus);
            if self.rho > 0.0 {
                results.merit += self.prox_penalty.value(
                    problem.space(),
                    &results.x_opt,
                    &mut ws.prox_diff,
                );
                self.prox_penalty.gradient(
                    problem.space(),
                    &results.x_opt,
                    &mut ws.prox_grad,
                    &mut ws.prox_diff,
                    &mut ws.prox_jac,
                );
                self.prox_penalty.hessian(
                    problem.space(),
                    &results.x_opt,
                    &mut ws.prox_hess,
                    &mut ws.prox_jac,
                );
            }
            check_nan(&ws.prox_grad, "prox_grad")?;

            // KKT right-hand side: Lagrangian gradient on top, dual
            // proximal error below
            ws.kkt_rhs.fill(0.0);
            {
                let mut head = ws.kkt_rhs.rows_mut(0, ndx);
                head.copy_from(&ws.objective_gradient);
                head.gemv_tr(1.0, &ws.jacobians, &results.lams_opt, 1.0);
                if self.rho > 0.0 {
                    head += &ws.prox_grad;
                }
            }
            ws.kkt_rhs.rows_mut(ndx, nc).copy_from(&ws.dual_prox_err);

            ws.merit_gradient.copy_from(&ws.objective_gradient);
            ws.merit_gradient.gemv_tr(1.0, &ws.jacobians, &ws.lams_pdal, 1.0);
            if self.rho > 0.0 {
                ws.merit_gradient += &ws.prox_grad;
            }

            for i in 0..numc {
                let (idx, nr) = (problem.index(i), problem.constraint_dim(i));
                problem
                    .constraint(i)
                    .set
                    .compute_active_set(ws.cstr_values.rows(idx, nr), &mut results.active_set[i]);
            }

            check_nan(&ws.kkt_rhs, "kkt_rhs")?;
            check_nan(&ws.kkt_matrix, "kkt_matrix")?;

            ws.dual_residual.copy_from(&ws.kkt_rhs.rows(0, ndx));
            if self.rho > 0.0 {
                ws.dual_residual -= &ws.prox_grad;
            }
            results.dual_infeas = infty_norm(&ws.dual_residual);

            // violation of constraint i is ‖c_i − Π_{C_i}(z_i)‖∞
            for i in 0..numc {
                let (idx, nr) = (problem.index(i), problem.constraint_dim(i));
                problem.constraint(i).set.projection(
                    ws.shift_cstr_values.rows(idx, nr),
                    ws.proj_cstr_values.rows_mut(idx, nr),
                );
                let mut viol = 0.0_f64;
                for k in idx..idx + nr {
                    viol = viol.max((ws.cstr_values[k] - ws.proj_cstr_values[k]).abs());
                }
                results.constraint_violations[i] = viol;
            }
            results.prim_infeas = infty_norm(&results.constraint_violations);
            let inner_crit = infty_norm(&ws.kkt_rhs);

            let outer_cond = results.prim_infeas <= self.target_tol
                && results.dual_infeas <= self.target_tol;
            if inner_crit <= self.inner_tol || outer_cond {
                return Ok(());
            }

            // assemble the KKT matrix
            ws.kkt_matrix.fill(0.0);
            ws.kkt_matrix
                .view_mut((0, 0), (ndx, ndx))
                .copy_from(&ws.objective_hessian);
            ws.kkt_matrix
                .view_mut((0, ndx), (ndx, nc))
                .tr_copy_from(&ws.jacobians_proj);
            ws.kkt_matrix
                .view_mut((ndx, 0), (nc, ndx))
                .copy_from(&ws.jacobians_proj);
            for k in 0..nc {
                ws.kkt_matrix[(ndx + k, ndx + k)] = -self.mu;
            }
            if self.rho > 0.0 {
                let mut tl = ws.kkt_matrix.view_mut((0, 0), (ndx, ndx));
                tl += &ws.prox_hess;
            }
            for i in 0..numc {
                let cstr = problem.constraint(i);
                if !(self.use_gauss_newton && cstr.set.disable_gauss_newton()) {
                    let mut tl = ws.kkt_matrix.view_mut((0, 0), (ndx, ndx));
                    tl += &ws.cstr_vhp[i];
                }
            }

            // inertia correction
            let mut delta = inertia::DELTA_INIT;
            let mut corrected = false;
            while delta <= inertia::DELTA_MAX {
                if delta > 0.0 {
                    for k in 0..ndx {
                        ws.kkt_matrix[(k, k)] += delta;
                    }
                }
                let factorization = ws.ldlt.compute(&ws.kkt_matrix);
                if delta > 0.0 {
                    for k in 0..ndx {
                        ws.kkt_matrix[(k, k)] -= delta;
                    }
                }
                let flag = match factorization {
                    Ok(()) => {
                        signature_of(ws.ldlt.vector_d(), &mut ws.signature);
                        check_inertia(&ws.signature, ndx, nc)
                    }
                    Err(_) => InertiaFlag::HasZeros,
                };
                if flag == InertiaFlag::Ok {
                    delta_last = delta;
                    corrected = true;
                    break;
                }
                if delta == 0.0 {
                    delta = if delta_last == 0.0 {
                        inertia::DELTA_NONZERO_INIT
                    } else {
                        (inertia::DEL_DEC_K * delta_last).max(inertia::DELTA_MIN)
                    };
                } else if delta_last == 0.0 {
                    delta *= inertia::DEL_INC_BIG;
                } else {
                    delta *= inertia::DEL_INC_K;
                }
            }
            if !corrected {
                log::warn!(
                    "inertia correction exhausted beyond delta = {:e}, continuing with the last factorization",
                    inertia::DELTA_MAX
                );
            }

            // Newton step with iterative refinement
            ws.pd_step.copy_from(&ws.kkt_rhs);
            ws.pd_step.neg_mut();
            ws.ldlt.solve_in_place(&mut ws.pd_step);
            check_nan(&ws.pd_step, "pd_step")?;

            for _ in 0..MAX_REFINEMENT_STEPS {
                ws.kkt_resdl.copy_from(&ws.kkt_rhs);
                ws.kkt_resdl.gemv(1.0, &ws.kkt_matrix, &ws.pd_step, 1.0);
                if infty_norm(&ws.kkt_resdl) < REFINE_EPS {
                    break;
                }
                ws.kkt_resdl.neg_mut();
                ws.ldlt.solve_into(&ws.kkt_resdl, &mut ws.kkt_corr);
                ws.pd_step += &ws.kkt_corr;
            }

            ws.dmerit_dir = ws.merit_gradient.dot(&ws.pd_step.rows(0, ndx))
                - ws.dual_prox_err.dot(&ws.pd_step.rows(ndx, nc));
            let dphi = ws.dmerit_dir;

            let phi0 = results.merit;
            let ls_options = self.ls_options;
            let (alpha, phi_new) = match self.ls_strategy {
                LinesearchStrategy::Armijo => armijo_backtrack(
                    |alpha| self.eval_merit_trial(alpha, ws, results),
                    phi0,
                    dphi,
                    &ls_options,
                ),
            };

            ws.alpha_opt = alpha;
            if alpha.is_nan() {
                return Err(SolverError::NumericalNaN("alpha_opt"));
            }
            if alpha <= self.ls_options.alpha_min && phi_new > phi0 {
                // not terminal: take the short step and let the
                // regularization grow at the next iterate
                log::debug!("line search failed, stepping with alpha_min = {:e}", alpha);
            }
            check_nan(&ws.x_trial, "x_trial")?;
            check_nan(&ws.lams_trial, "lams_trial")?;
            if phi_new.is_nan() {
                return Err(SolverError::NumericalNaN("merit"));
            }

            results.x_opt.copy_from(&ws.x_trial);
            results.lams_opt.copy_from(&ws.lams_trial);
            results.merit = phi_new;

            for cb in &self.callbacks {
                cb(ws, results);
            }

            self.logger.log(&LogRecord {
                iter: results.num_iters + 1,
                alpha,
                inner_crit,
                prim_infeas: results.prim_infeas,
                dual_infeas: results.dual_infeas,
                delta,
                dphi,
                merit: phi_new,
                dmerit: phi_new - phi0,
            });

            results.num_iters += 1;
            if results.num_iters >= self.max_iters {
                results.converged = ConvergenceFlag::MaxItersReached;
                return Ok(());
            }
        }
    }

    /// Merit value of the trial step (x ⊕ α·Δx, λ + α·Δλ).
    ///
    /// Overwrites the trial buffers, the residuals and the multiplier
    /// estimates; the caller re-evaluates everything at the committed
    /// point on the next iteration.
    fn eval_merit_trial(&self, alpha: f64, ws: &mut Workspace, results: &Results) -> f64 {
        let problem = self.problem;
        let space = problem.space();
        let ndx = problem.ndx();
        let nc = problem.total_constraint_dim();

        {
            let Workspace {
                pd_step,
                dx_scaled,
                x_trial,
                lams_trial,
                ..
            } = ws;
            dx_scaled.copy_from(&pd_step.rows(0, ndx));
            *dx_scaled *= alpha;
            space.integrate(&results.x_opt, dx_scaled, x_trial);
            lams_trial.copy_from(&results.lams_opt);
            lams_trial.axpy(alpha, &pd_step.rows(ndx, nc), 1.0);
        }

        problem.evaluate_constraints(&ws.x_trial, &mut ws.cstr_values);
        compute_multiplier_estimates(
            problem,
            self.mu,
            self.mu_inv,
            &ws.cstr_values,
            &ws.lams_prev,
            &ws.lams_trial,
            &mut ws.shift_cstr_values,
            &mut ws.lams_plus,
            &mut ws.lams_pdal,
            &mut ws.dual_prox_err,
        );
        let mut value = self
            .merit
            .evaluate(problem, &ws.x_trial, &ws.lams_trial, &ws.lams_plus);
        if self.rho > 0.0 {
            value += self.prox_penalty.value(space, &ws.x_trial, &mut ws.prox_diff);
        }
        value
    }
}
