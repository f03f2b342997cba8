//! Block-permuted LDLᵀ.
//!
//! Runs the symbolic analysis of [`super::blocks`] once at construction
//! to find the fill-minimizing block permutation, then applies that
//! permutation around the dense numerical kernel: factor P·M·Pᵀ, solve
//! by permuting the right-hand side in and the solution out.

use nalgebra::{DMatrix, DVector};

use super::blocks::SymbolicBlockMatrix;
use super::dense_ldlt::DenseLdlt;
use super::ldlt::{LdltDriver, LdltError};

/// LDLᵀ driver using the symbolic block structure of the KKT system.
pub struct BlockLdlt {
    n: usize,
    structure: SymbolicBlockMatrix,
    /// Block-level permutation minimizing symbolic fill.
    perm: Vec<usize>,
    /// Scalar-level index map: permuted row r ← original row map[r].
    map: Vec<usize>,
    /// Symbolic nonzero count of the permuted factor.
    nnz: usize,
    permuted: DMatrix<f64>,
    work: DVector<f64>,
    inner: DenseLdlt,
}

impl BlockLdlt {
    /// Build from the default KKT block structure (dense primal grid,
    /// diagonal dual blocks, dense couplings).
    pub fn from_structure(nprims: &[usize], nduals: &[usize]) -> Self {
        let structure = SymbolicBlockMatrix::kkt_structure(nprims, nduals);
        Self::with_structure(structure)
    }

    /// Build from an explicit symbolic structure, searching all block
    /// permutations for the one with the least symbolic fill.
    pub fn with_structure(structure: SymbolicBlockMatrix) -> Self {
        let (perm, nnz) = structure
            .brute_force_best_permutation()
            .unwrap_or_else(|| ((0..structure.nsegments()).collect(), usize::MAX));
        Self::with_permutation(structure, perm, nnz)
    }

    /// Build with a caller-chosen block ordering (e.g. from an external
    /// fill-reducing heuristic) instead of the brute-force search.
    pub fn with_permutation(structure: SymbolicBlockMatrix, perm: Vec<usize>, nnz: usize) -> Self {
        assert_eq!(perm.len(), structure.nsegments());
        let n = structure.total_dim();
        let map = structure.scalar_permutation(&perm);
        Self {
            n,
            structure,
            perm,
            map,
            nnz,
            permuted: DMatrix::zeros(n, n),
            work: DVector::zeros(n),
            inner: DenseLdlt::new(n),
        }
    }

    /// The selected block permutation.
    pub fn permutation(&self) -> &[usize] {
        &self.perm
    }

    /// Symbolic nonzero count under the selected permutation.
    pub fn symbolic_nnz(&self) -> usize {
        self.nnz
    }

    /// The symbolic structure the permutation was derived from.
    pub fn structure(&self) -> &SymbolicBlockMatrix {
        &self.structure
    }
}

impl LdltDriver for BlockLdlt {
    fn dim(&self) -> usize {
        self.n
    }

    fn compute(&mut self, mat: &DMatrix<f64>) -> Result<(), LdltError> {
        if mat.nrows() != self.n {
            return Err(LdltError::DimensionMismatch {
                expected: self.n,
                actual: mat.nrows(),
            });
        }
        for i in 0..self.n {
            let pi = self.map[i];
            for j in 0..self.n {
                self.permuted[(i, j)] = mat[(pi, self.map[j])];
            }
        }
        self.inner.compute(&self.permuted)
    }

    fn solve_in_place(&mut self, rhs: &mut DVector<f64>) {
        debug_assert_eq!(rhs.len(), self.n);
        // gather into permuted coordinates, solve, scatter back
        for i in 0..self.n {
            self.work[i] = rhs[self.map[i]];
        }
        self.inner.solve_in_place(&mut self.work);
        for i in 0..self.n {
            rhs[self.map[i]] = self.work[i];
        }
    }

    fn vector_d(&self) -> &DVector<f64> {
        self.inner.vector_d()
    }

    fn matrix_ldlt(&self) -> &DMatrix<f64> {
        self.inner.matrix_ldlt()
    }
}
