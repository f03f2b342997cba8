//! Numerical helpers shared across the solver.

use nalgebra::{Dim, Matrix, RawStorage};

/// Infinity norm (largest absolute entry) of a matrix or vector.
#[inline]
pub fn infty_norm<R, C, S>(m: &Matrix<f64, R, C, S>) -> f64
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    m.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()))
}

/// True if any entry is NaN.
#[inline]
pub fn has_nan<R, C, S>(m: &Matrix<f64, R, C, S>) -> bool
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    m.iter().any(|v| v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    #[test]
    fn test_infty_norm() {
        let v = DVector::from_vec(vec![1.0, -3.0, 2.0]);
        assert_eq!(infty_norm(&v), 3.0);
        let empty = DVector::<f64>::zeros(0);
        assert_eq!(infty_norm(&empty), 0.0);
    }

    #[test]
    fn test_has_nan() {
        let v = DVector::from_vec(vec![1.0, f64::NAN]);
        assert!(has_nan(&v));
        let w = DVector::from_vec(vec![1.0, f64::INFINITY]);
        assert!(!has_nan(&w));
    }
}
