//! Armijo backtracking line search on the merit function.

/// Available line-search strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinesearchStrategy {
    /// Armijo backtracking (halve α until sufficient decrease).
    #[default]
    Armijo,
}

/// Line-search parameters.
#[derive(Debug, Clone, Copy)]
pub struct LinesearchOptions {
    /// Sufficient-decrease constant c₁ ∈ (0, 1).
    pub armijo_c1: f64,
    /// Smallest step length tried before giving up.
    pub alpha_min: f64,
}

impl Default for LinesearchOptions {
    fn default() -> Self {
        Self {
            armijo_c1: 1e-4,
            alpha_min: 1e-7,
        }
    }
}

/// Backtrack from α = 1, halving until
/// `φ(α) ≤ φ₀ + c₁·α·dφ` or α reaches `alpha_min`.
///
/// Returns the accepted (α, φ(α)); on failure that is the `alpha_min`
/// step, which the caller takes anyway and lets the regularization grow
/// at the next iterate. A descent direction (dφ < 0) is expected but not
/// required.
pub fn armijo_backtrack(
    mut phi: impl FnMut(f64) -> f64,
    phi0: f64,
    dphi: f64,
    options: &LinesearchOptions,
) -> (f64, f64) {
    let mut alpha = 1.0_f64;
    loop {
        let value = phi(alpha);
        if value <= phi0 + options.armijo_c1 * alpha * dphi {
            return (alpha, value);
        }
        if alpha <= options.alpha_min {
            return (alpha, value);
        }
        alpha = (0.5 * alpha).max(options.alpha_min);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_full_step_accepted_on_quadratic() {
        // φ(α) = (1 − α)², φ₀ = 1, dφ = −2: Newton step is exact
        let phi = |a: f64| (1.0 - a) * (1.0 - a);
        let (alpha, value) = armijo_backtrack(phi, 1.0, -2.0, &LinesearchOptions::default());
        assert_abs_diff_eq!(alpha, 1.0);
        assert_abs_diff_eq!(value, 0.0);
    }

    #[test]
    fn test_backtracks_on_overshoot() {
        // steep quadratic: full step overshoots badly
        let phi = |a: f64| (1.0 - 8.0 * a) * (1.0 - 8.0 * a);
        let (alpha, _) = armijo_backtrack(phi, 1.0, -16.0, &LinesearchOptions::default());
        assert!(alpha < 1.0);
        assert!(alpha >= 1e-7);
    }

    #[test]
    fn test_failure_returns_alpha_min() {
        // increasing φ: Armijo can never hold
        let phi = |a: f64| 1.0 + a;
        let opts = LinesearchOptions::default();
        let (alpha, value) = armijo_backtrack(phi, 1.0, -1.0, &opts);
        assert_abs_diff_eq!(alpha, opts.alpha_min);
        assert_abs_diff_eq!(value, 1.0 + opts.alpha_min);
    }
}
