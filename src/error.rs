//! Solver error types.
//!
//! Hard failures surface as `Err`; transient numerical difficulties
//! (inertia stalls, failed line searches) are logged and tolerated, and
//! termination status travels in [`crate::results::ConvergenceFlag`].

use thiserror::Error;

/// Errors surfaced by solver construction and `solve`.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Input sizes disagree with the problem (x0 length, multiplier
    /// count or total multiplier dimension).
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A NaN was detected in a solver quantity; the solve is aborted.
    #[error("NaN detected in {0}")]
    NumericalNaN(&'static str),

    /// The configured line-search strategy is not recognized.
    #[error("unrecognized line-search strategy")]
    UnknownLinesearchStrategy,
}
