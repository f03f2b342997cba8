//! Symbolic block sparsity analysis for the KKT matrix.
//!
//! The KKT matrix has a natural block partition: one primal block of
//! size ndx plus one dual block per constraint. Each block is classified
//! by a [`BlockKind`] and block Cholesky is simulated symbolically to
//! predict fill-in. Enumerating block permutations (block counts are
//! small, so n! is affordable) and keeping the one with the fewest
//! symbolic nonzeros yields the permutation applied around the numerical
//! factorization.

use std::fmt;

/// Symbolic classification of a matrix block.
///
/// The ordering is meaningful: `add` of two kinds without special-case
/// interaction is their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockKind {
    /// All-zero block.
    Zero,
    /// Diagonal block.
    Diag,
    /// Lower-triangular block.
    TriL,
    /// Upper-triangular block.
    TriU,
    /// Unstructured block.
    Dense,
}

/// Kind of the transpose of a block.
pub fn trans(a: BlockKind) -> BlockKind {
    match a {
        BlockKind::TriL => BlockKind::TriU,
        BlockKind::TriU => BlockKind::TriL,
        other => other,
    }
}

/// Kind of the sum of two blocks.
pub fn add(a: BlockKind, b: BlockKind) -> BlockKind {
    use BlockKind::*;
    if a == Dense || b == Dense || matches!((a, b), (TriL, TriU) | (TriU, TriL)) {
        return Dense;
    }
    a.max(b)
}

/// Kind of the product of two blocks.
pub fn mul(a: BlockKind, b: BlockKind) -> BlockKind {
    if a == BlockKind::Zero || b == BlockKind::Zero {
        return BlockKind::Zero;
    }
    add(a, b)
}

/// Symmetric block matrix with symbolic entries.
#[derive(Debug, Clone)]
pub struct SymbolicBlockMatrix {
    kinds: Vec<BlockKind>,
    segment_lens: Vec<usize>,
    n: usize,
}

impl SymbolicBlockMatrix {
    /// All-zero symbolic matrix over the given block sizes.
    pub fn zeros(segment_lens: Vec<usize>) -> Self {
        let n = segment_lens.len();
        Self {
            kinds: vec![BlockKind::Zero; n * n],
            segment_lens,
            n,
        }
    }

    /// Default KKT structure: `nprims` leading blocks forming a dense
    /// primal grid, one dual block per entry of `nduals` with diagonal
    /// dual blocks, dense primal/dual couplings and zero dual/dual
    /// off-diagonals.
    pub fn kkt_structure(nprims: &[usize], nduals: &[usize]) -> Self {
        let nprim = nprims.len();
        let mut lens = nprims.to_vec();
        lens.extend_from_slice(nduals);
        let n = lens.len();
        let mut out = Self::zeros(lens);
        for i in 0..nprim {
            for j in 0..nprim {
                out[(i, j)] = BlockKind::Dense;
            }
        }
        for i in nprim..n {
            for j in 0..nprim {
                out[(i, j)] = BlockKind::Dense;
                out[(j, i)] = BlockKind::Dense;
            }
            out[(i, i)] = BlockKind::Diag;
        }
        out
    }

    /// Number of block segments.
    pub fn nsegments(&self) -> usize {
        self.n
    }

    /// Block sizes.
    pub fn segment_lens(&self) -> &[usize] {
        &self.segment_lens
    }

    /// Total scalar dimension.
    pub fn total_dim(&self) -> usize {
        self.segment_lens.iter().sum()
    }

    /// Overwrite `self` with `other` under a block permutation:
    /// `self(i, j) = other(perm[i], perm[j])`.
    pub fn copy_permuted_from(&mut self, other: &SymbolicBlockMatrix, perm: &[usize]) {
        debug_assert_eq!(self.n, other.n);
        debug_assert_eq!(perm.len(), self.n);
        for i in 0..self.n {
            self.segment_lens[i] = other.segment_lens[perm[i]];
        }
        for i in 0..self.n {
            for j in 0..self.n {
                self[(i, j)] = other[(perm[i], perm[j])];
            }
        }
    }

    /// Simulate block Cholesky in place.
    ///
    /// Returns false when a leading block cannot act as a pivot (zero or
    /// triangular diagonal block). On success the lower triangle holds
    /// the symbolic factor.
    pub fn llt_in_place(&mut self) -> bool {
        let n = self.n;
        for k in 0..n {
            // strictly-upper part of the pivot row is consumed
            for j in (k + 1)..n {
                self[(k, j)] = BlockKind::Zero;
            }

            match self[(k, k)] {
                BlockKind::Zero | BlockKind::TriL | BlockKind::TriU => return false,
                BlockKind::Dense => {
                    self[(k, k)] = BlockKind::TriL;
                    // column below the pivot picks up L_kk^{-T}
                    for i in (k + 1)..n {
                        self[(i, k)] = mul(self[(i, k)], BlockKind::TriU);
                    }
                }
                BlockKind::Diag => {
                    // diagonal pivot leaves the column kinds unchanged
                }
            }

            for i in (k + 1)..n {
                self[(i, i)] = add(self[(i, i)], mul(self[(i, k)], trans(self[(i, k)])));
                for j in (i + 1)..n {
                    self[(i, j)] = add(self[(i, j)], mul(self[(i, k)], trans(self[(j, k)])));
                    self[(j, i)] = trans(self[(i, j)]);
                }
            }
        }
        true
    }

    /// Symbolic nonzero count of the current entries.
    pub fn count_nnz(&self) -> usize {
        let mut nnz = 0;
        for i in 0..self.n {
            for j in 0..self.n {
                nnz += match self[(i, j)] {
                    BlockKind::Zero => 0,
                    BlockKind::Diag => self.segment_lens[i],
                    BlockKind::TriL | BlockKind::TriU => {
                        let k = self.segment_lens[i];
                        k * (k + 1) / 2
                    }
                    BlockKind::Dense => self.segment_lens[i] * self.segment_lens[j],
                };
            }
        }
        nnz
    }

    /// Enumerate all block permutations, run symbolic Cholesky on each
    /// and return the permutation minimizing the symbolic nonzero count
    /// together with that count. Returns None if some permutation does
    /// not factorize symbolically.
    pub fn brute_force_best_permutation(&self) -> Option<(Vec<usize>, usize)> {
        let n = self.n;
        let mut perm: Vec<usize> = (0..n).collect();
        let mut work = self.clone();
        let mut best: Option<(Vec<usize>, usize)> = None;

        loop {
            work.copy_permuted_from(self, &perm);
            if !work.llt_in_place() {
                return None;
            }
            let nnz = work.count_nnz();
            match &best {
                Some((_, best_nnz)) if nnz >= *best_nnz => {}
                _ => best = Some((perm.clone(), nnz)),
            }
            if !next_permutation(&mut perm) {
                break;
            }
        }
        best
    }

    /// Scalar-level index map of a block permutation: entry `r` of the
    /// permuted order comes from scalar row `map[r]` of the original.
    pub fn scalar_permutation(&self, perm: &[usize]) -> Vec<usize> {
        let mut starts = Vec::with_capacity(self.n);
        let mut acc = 0;
        for &len in &self.segment_lens {
            starts.push(acc);
            acc += len;
        }
        let mut map = Vec::with_capacity(acc);
        for &b in perm {
            for t in 0..self.segment_lens[b] {
                map.push(starts[b] + t);
            }
        }
        map
    }
}

impl std::ops::Index<(usize, usize)> for SymbolicBlockMatrix {
    type Output = BlockKind;

    fn index(&self, (i, j): (usize, usize)) -> &BlockKind {
        &self.kinds[i * self.n + j]
    }
}

impl std::ops::IndexMut<(usize, usize)> for SymbolicBlockMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut BlockKind {
        &mut self.kinds[i * self.n + j]
    }
}

impl fmt::Display for SymbolicBlockMatrix {
    /// Scalar-level sparsity pattern, one text row per matrix row.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.n {
            for ii in 0..self.segment_lens[i] {
                for j in 0..self.n {
                    for jj in 0..self.segment_lens[j] {
                        let filled = match self[(i, j)] {
                            BlockKind::Zero => false,
                            BlockKind::Diag => ii == jj,
                            BlockKind::TriL => jj <= ii,
                            BlockKind::TriU => jj >= ii,
                            BlockKind::Dense => true,
                        };
                        write!(f, "{}", if filled { '█' } else { '░' })?;
                    }
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Advance `p` to the next lexicographic permutation; false at the last.
fn next_permutation(p: &mut [usize]) -> bool {
    if p.len() < 2 {
        return false;
    }
    let mut i = p.len() - 1;
    while i > 0 && p[i - 1] >= p[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = p.len() - 1;
    while p[j] <= p[i - 1] {
        j -= 1;
    }
    p.swap(i - 1, j);
    p[i..].reverse();
    true
}
