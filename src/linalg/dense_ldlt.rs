//! Unpivoted dense LDLᵀ.
//!
//! Factors a symmetric matrix as L·D·Lᵀ with L unit lower triangular
//! and D diagonal (possibly indefinite). No pivoting: the KKT systems
//! this sees are quasi-definite once the inertia-correction loop has
//! settled the regularization shift, which is exactly the regime where
//! the unpivoted factorization is stable.

use nalgebra::{DMatrix, DVector};

use super::ldlt::{LdltDriver, LdltError};

/// In-place dense LDLᵀ driver.
#[derive(Debug, Clone)]
pub struct DenseLdlt {
    n: usize,
    /// Unit lower-triangular factor (strict lower part; diagonal implied).
    fact: DMatrix<f64>,
    d: DVector<f64>,
}

impl DenseLdlt {
    /// Driver for systems of the given dimension.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            fact: DMatrix::zeros(n, n),
            d: DVector::zeros(n),
        }
    }
}

impl LdltDriver for DenseLdlt {
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
        self.fact.copy_from(mat);
        let n = self.n;
        for j in 0..n {
            let mut dj = self.fact[(j, j)];
            for k in 0..j {
                let ljk = self.fact[(j, k)];
                dj -= ljk * ljk * self.d[k];
            }
            if dj == 0.0 || !dj.is_finite() {
                self.d[j] = 0.0;
                return Err(LdltError::ZeroPivot(j));
            }
            self.d[j] = dj;
            for i in (j + 1)..n {
                let mut v = self.fact[(i, j)];
                for k in 0..j {
                    v -= self.fact[(i, k)] * self.fact[(j, k)] * self.d[k];
                }
                self.fact[(i, j)] = v / dj;
            }
        }
        Ok(())
    }

    fn solve_in_place(&mut self, rhs: &mut DVector<f64>) {
        let n = self.n;
        debug_assert_eq!(rhs.len(), n);
        // forward substitution with unit L
        for i in 0..n {
            let mut v = rhs[i];
            for k in 0..i {
                v -= self.fact[(i, k)] * rhs[k];
            }
            rhs[i] = v;
        }
        for i in 0..n {
            rhs[i] /= self.d[i];
        }
        // back substitution with Lᵀ
        for i in (0..n).rev() {
            let mut v = rhs[i];
            for k in (i + 1)..n {
                v -= self.fact[(k, i)] * rhs[k];
            }
            rhs[i] = v;
        }
    }

    fn vector_d(&self) -> &DVector<f64> {
        &self.d
    }

    fn matrix_ldlt(&self) -> &DMatrix<f64> {
        &self.fact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_spd_solve() {
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let mut ldlt = DenseLdlt::new(2);
        ldlt.compute(&m).unwrap();

        let mut rhs = DVector::from_vec(vec![3.0, 4.0]);
        ldlt.solve_in_place(&mut rhs);
        assert_abs_diff_eq!(rhs[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rhs[1], 5.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quasi_definite_signature() {
        // [I, a; aᵀ, -1] has two positive and one negative eigenvalue
        let m = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, -1.0],
        );
        let mut ldlt = DenseLdlt::new(3);
        ldlt.compute(&m).unwrap();

        let d = ldlt.vector_d();
        let npos = d.iter().filter(|&&v| v > 0.0).count();
        let nneg = d.iter().filter(|&&v| v < 0.0).count();
        assert_eq!((npos, nneg), (2, 1));

        // residual check
        let mut x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let b = x.clone();
        ldlt.solve_in_place(&mut x);
        let r = &m * &x - b;
        assert_abs_diff_eq!(r.norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_zero_pivot_detected() {
        let m = DMatrix::zeros(2, 2);
        let mut ldlt = DenseLdlt::new(2);
        assert!(matches!(ldlt.compute(&m), Err(LdltError::ZeroPivot(0))));
    }

    #[test]
    fn test_rcond_of_scaled_identity() {
        let m = DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 1.0, 2.0]));
        let mut ldlt = DenseLdlt::new(3);
        ldlt.compute(&m).unwrap();
        assert_abs_diff_eq!(ldlt.rcond(), 0.25, epsilon = 1e-14);
    }
}
