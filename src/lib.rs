//! Proxal: a proximal augmented-Lagrangian solver on manifolds
//!
//! This library solves smooth constrained nonlinear programs whose
//! decision variable lives on a differentiable manifold:
//!
//! ```text
//! minimize    f(x)            x ∈ M
//! subject to  c_i(x) ∈ C_i    i = 1..m
//! ```
//!
//! with f twice differentiable, each c_i a twice-differentiable map into
//! a vector space and each C_i a closed convex set (equality, orthant,
//! box, second-order cone, ...).
//!
//! # Algorithm
//!
//! The solver runs a **proximal augmented-Lagrangian outer loop** with
//! Bertsekas-style (BCL) penalty and tolerance updates around a
//! **primal-dual semismooth Newton inner loop**. Key ingredients:
//!
//! - first-order multiplier estimates through normal-cone projections of
//!   the shifted constraint residuals;
//! - Armijo backtracking on a primal-dual augmented-Lagrangian merit
//!   function;
//! - inertia-corrected block LDLᵀ KKT solves with iterative refinement;
//! - a symbolic block-sparsity layer that searches for the
//!   fill-minimizing block permutation of the KKT matrix.
//!
//! # Example
//!
//! ```ignore
//! use proxal::prelude::*;
//! use std::rc::Rc;
//!
//! // minimize ½‖x − p0‖² over the unit disk ‖x‖ ≤ 1
//! let space = Rc::new(VectorSpace::new(2));
//! let cost = QuadraticResidualCost::squared_distance(space.clone(), p0);
//! let disk = ConstraintObject::new(
//!     Box::new(disk_residual),          // 1 − ‖x‖², a C² function
//!     Box::new(NonnegOrthant::new()),
//! );
//! let problem = Problem::new(space, Box::new(cost), vec![disk]);
//!
//! let mut solver = Solver::with_tolerance(&problem, 1e-8);
//! let mut workspace = Workspace::new(&problem);
//! let mut results = Results::new(&problem);
//! let flag = solver.solve_cold(&mut workspace, &mut results, &x0)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // primal-dual updates take many buffers

pub mod cost;
pub mod error;
pub mod function;
pub mod linalg;
pub mod manifold;
pub mod merit;
pub mod problem;
pub mod results;
pub mod sets;
pub mod solver;
pub mod util;
pub mod workspace;

pub use error::SolverError;
pub use results::{ConvergenceFlag, Results};
pub use solver::{BclParams, Solver, SolverOptions, VerboseLevel};
pub use workspace::Workspace;

/// Convenience re-exports for building and solving problems.
pub mod prelude {
    pub use crate::cost::{CostFunction, CostSum, QuadraticCost, QuadraticResidualCost};
    pub use crate::function::{C0Function, C1Function, C2Function, LinearFunction, ManifoldDifference};
    pub use crate::linalg::{LdltChoice, LdltDriver};
    pub use crate::manifold::{ArgSide, Manifold, So2, VectorSpace};
    pub use crate::problem::{ConstraintObject, Problem};
    pub use crate::results::{ConvergenceFlag, Results};
    pub use crate::sets::{
        BoxSet, ConstraintSet, EqualitySet, NegativeOrthant, NonnegOrthant, SecondOrderCone,
    };
    pub use crate::solver::{
        BclParams, LinesearchOptions, LinesearchStrategy, Solver, SolverOptions, VerboseLevel,
    };
    pub use crate::workspace::Workspace;
}
