//! LDLᵀ driver trait and allocation helpers.
//!
//! The inner Newton loop talks to the factorization through
//! [`LdltDriver`]; three drivers are provided and selected by
//! [`LdltChoice`]:
//!
//! - [`DenseLdlt`](super::dense_ldlt::DenseLdlt): unpivoted in-place
//!   dense LDLᵀ, the default;
//! - [`BlockLdlt`](super::block_ldlt::BlockLdlt): computes the
//!   fill-minimizing block permutation symbolically and applies it
//!   around the dense kernel;
//! - [`UduLdlt`](super::udu_ldlt::UduLdlt): wrapper over nalgebra's
//!   `UDU` factorization.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::problem::Problem;

use super::block_ldlt::BlockLdlt;
use super::dense_ldlt::DenseLdlt;
use super::udu_ldlt::UduLdlt;

/// LDLᵀ factorization errors.
#[derive(Error, Debug)]
pub enum LdltError {
    /// A pivot vanished; the matrix has (numerically) a zero eigenvalue.
    #[error("zero pivot at column {0}")]
    ZeroPivot(usize),

    /// Matrix size does not match the driver.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
}

/// Numerical LDLᵀ factorization of a symmetric (indefinite) matrix.
///
/// The driver owns its factor storage; `compute` resets it. Solves are
/// only meaningful after a successful `compute`.
pub trait LdltDriver {
    /// Dimension of the factorized system.
    fn dim(&self) -> usize;

    /// Factorize the symmetric matrix `mat` (reads the lower triangle).
    fn compute(&mut self, mat: &DMatrix<f64>) -> Result<(), LdltError>;

    /// Solve `M x = rhs` in place.
    fn solve_in_place(&mut self, rhs: &mut DVector<f64>);

    /// Solve `M x = rhs` into `out`.
    fn solve_into(&mut self, rhs: &DVector<f64>, out: &mut DVector<f64>) {
        out.copy_from(rhs);
        self.solve_in_place(out);
    }

    /// Diagonal of D (eigenvalue signs carry the inertia).
    fn vector_d(&self) -> &DVector<f64>;

    /// Internal factor storage (layout is driver-specific).
    fn matrix_ldlt(&self) -> &DMatrix<f64>;

    /// Cheap reciprocal condition estimate from the D spectrum.
    fn rcond(&self) -> f64 {
        let d = self.vector_d();
        let mut dmin = f64::INFINITY;
        let mut dmax = 0.0_f64;
        for &v in d.iter() {
            let a = v.abs();
            dmin = dmin.min(a);
            dmax = dmax.max(a);
        }
        if dmax == 0.0 {
            0.0
        } else {
            dmin / dmax
        }
    }
}

/// Which LDLᵀ driver the workspace allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LdltChoice {
    /// In-house dense LDLᵀ.
    #[default]
    Dense,
    /// Block-permuted LDLᵀ driven by the symbolic structure.
    Blocked,
    /// nalgebra `UDU` wrapper.
    Udu,
}

/// Allocate a driver for a KKT system with the given primal and dual
/// block sizes.
pub fn allocate_ldlt(
    nprims: &[usize],
    nduals: &[usize],
    choice: LdltChoice,
) -> Box<dyn LdltDriver> {
    let dim: usize = nprims.iter().chain(nduals.iter()).sum();
    match choice {
        LdltChoice::Dense => Box::new(DenseLdlt::new(dim)),
        LdltChoice::Blocked => Box::new(BlockLdlt::from_structure(nprims, nduals)),
        LdltChoice::Udu => Box::new(UduLdlt::new(dim)),
    }
}

/// Allocate a driver sized for a problem's KKT system: one primal block
/// of size ndx and one dual block per constraint.
pub fn allocate_ldlt_from_problem(problem: &Problem, choice: LdltChoice) -> Box<dyn LdltDriver> {
    let nduals: Vec<usize> = (0..problem.num_constraints())
        .map(|i| problem.constraint_dim(i))
        .collect();
    allocate_ldlt(&[problem.ndx()], &nduals, choice)
}
