//! Linear algebra: symbolic block analysis and LDLᵀ drivers.

pub mod block_ldlt;
pub mod blocks;
pub mod dense_ldlt;
pub mod ldlt;
pub mod udu_ldlt;

pub use block_ldlt::BlockLdlt;
pub use blocks::{BlockKind, SymbolicBlockMatrix};
pub use dense_ldlt::DenseLdlt;
pub use ldlt::{allocate_ldlt, allocate_ldlt_from_problem, LdltChoice, LdltDriver, LdltError};
pub use udu_ldlt::UduLdlt;
