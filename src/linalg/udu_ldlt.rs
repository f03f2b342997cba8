//! nalgebra `UDU` wrapper.
//!
//! Factors the symmetric system as U·D·Uᵀ with U unit upper triangular
//! using nalgebra's `UDU` decomposition, and adapts it to the
//! [`LdltDriver`] interface (the inertia of D is the same whether the
//! triangular factor sits on the left or the right).

use nalgebra::linalg::UDU;
use nalgebra::{DMatrix, DVector, Dyn};

use super::ldlt::{LdltDriver, LdltError};

/// External-factorization driver backed by nalgebra's `UDU`.
pub struct UduLdlt {
    n: usize,
    fact: Option<UDU<f64, Dyn>>,
    d: DVector<f64>,
    /// Matrix storage recycled into the next factorization.
    spare: DMatrix<f64>,
}

impl UduLdlt {
    /// Driver for systems of the given dimension.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            fact: None,
            d: DVector::zeros(n),
            spare: DMatrix::zeros(n, n),
        }
    }
}

impl LdltDriver for UduLdlt {
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
        // UDU consumes its input; recycle the previous factor's storage
        // so steady-state computes do not allocate.
        let mut m = std::mem::replace(&mut self.spare, DMatrix::zeros(0, 0));
        if m.nrows() != self.n {
            m = DMatrix::zeros(self.n, self.n);
        }
        m.copy_from(mat);
        match UDU::new(m) {
            Some(udu) => {
                self.d.copy_from(&udu.d);
                if let Some(prev) = self.fact.take() {
                    self.spare = prev.u;
                }
                self.fact = Some(udu);
                Ok(())
            }
            None => {
                self.d.fill(0.0);
                Err(LdltError::ZeroPivot(0))
            }
        }
    }

    fn solve_in_place(&mut self, rhs: &mut DVector<f64>) {
        let Some(fact) = self.fact.as_ref() else {
            return;
        };
        // U·w = rhs, w ← D⁻¹ w, Uᵀ·x = w
        let _ = fact.u.solve_upper_triangular_mut(rhs);
        for i in 0..self.n {
            rhs[i] /= fact.d[i];
        }
        let _ = fact.u.tr_solve_upper_triangular_mut(rhs);
    }

    fn vector_d(&self) -> &DVector<f64> {
        &self.d
    }

    fn matrix_ldlt(&self) -> &DMatrix<f64> {
        match self.fact.as_ref() {
            Some(fact) => &fact.u,
            None => &self.spare,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_udu_matches_dense_driver() {
        use super::super::dense_ldlt::DenseLdlt;

        let m = DMatrix::from_row_slice(
            3,
            3,
            &[4.0, 1.0, 0.5, 1.0, 3.0, -0.5, 0.5, -0.5, -2.0],
        );
        let b = DVector::from_vec(vec![1.0, -2.0, 0.5]);

        let mut udu = UduLdlt::new(3);
        udu.compute(&m).unwrap();
        let mut x1 = b.clone();
        udu.solve_in_place(&mut x1);

        let mut dense = DenseLdlt::new(3);
        dense.compute(&m).unwrap();
        let mut x2 = b.clone();
        dense.solve_in_place(&mut x2);

        assert_abs_diff_eq!(x1, x2, epsilon = 1e-10);
        assert_abs_diff_eq!((&m * &x1 - &b).norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_udu_inertia() {
        let m = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, -3.0, 1.0]));
        let mut udu = UduLdlt::new(3);
        udu.compute(&m).unwrap();
        let d = udu.vector_d();
        let nneg = d.iter().filter(|&&v| v < 0.0).count();
        assert_eq!(nneg, 1);
    }
}
