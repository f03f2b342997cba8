//! Inner-iteration log table.

/// One row of the inner-iteration log.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord {
    /// Inner iteration counter (1-based).
    pub iter: usize,
    /// Accepted step length.
    pub alpha: f64,
    /// ∞-norm of the KKT right-hand side.
    pub inner_crit: f64,
    /// Primal infeasibility.
    pub prim_infeas: f64,
    /// Dual infeasibility.
    pub dual_infeas: f64,
    /// Regularization shift used by the factorization.
    pub delta: f64,
    /// Directional derivative of the merit along the step.
    pub dphi: f64,
    /// Merit value after the step.
    pub merit: f64,
    /// Merit change over the iteration.
    pub dmerit: f64,
}

/// Table writer for inner iterations; silent unless `active`.
#[derive(Debug, Clone, Default)]
pub struct InnerLogger {
    /// Whether rows are printed.
    pub active: bool,
}

impl InnerLogger {
    /// Print the column header.
    pub fn start(&self) {
        if !self.active {
            return;
        }
        eprintln!(
            "{:>5} {:>10} {:>10} {:>10} {:>10} {:>9} {:>10} {:>12} {:>10}",
            "iter", "alpha", "inner_crit", "prim_err", "dual_err", "delta", "dphi", "merit", "dM"
        );
    }

    /// Print one iteration row.
    pub fn log(&self, r: &LogRecord) {
        if !self.active {
            return;
        }
        eprintln!(
            "{:>5} {:>10.3e} {:>10.3e} {:>10.3e} {:>10.3e} {:>9.2e} {:>10.3e} {:>12.5e} {:>10.3e}",
            r.iter, r.alpha, r.inner_crit, r.prim_infeas, r.dual_infeas, r.delta, r.dphi, r.merit,
            r.dmerit
        );
    }
}
