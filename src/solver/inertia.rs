//! Inertia bookkeeping for the regularized KKT factorization.
//!
//! The KKT matrix must factor with exactly ndx positive, nc negative and
//! zero null eigenvalues. When the signature of D disagrees, the primal
//! diagonal receives a shift δ grown geometrically until the inertia is
//! restored (or `DELTA_MAX` is exceeded).

use nalgebra::DVector;

/// First shift attempted each inner iteration.
pub const DELTA_INIT: f64 = 1e-8;
/// Smallest admissible nonzero shift.
pub const DELTA_MIN: f64 = 1e-14;
/// Shift used when a zero shift just failed.
pub const DELTA_NONZERO_INIT: f64 = 1e-4;
/// Largest shift before the correction loop gives up.
pub const DELTA_MAX: f64 = 1e2;
/// Geometric growth factor.
pub const DEL_INC_K: f64 = 10.0;
/// Growth factor used when the previous accepted shift was zero.
pub const DEL_INC_BIG: f64 = 100.0;
/// Decrease factor applied to the previously accepted shift.
pub const DEL_DEC_K: f64 = 1.0 / 3.0;

/// Outcome of an inertia check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InertiaFlag {
    /// Signature is (+ndx, −nc, 0).
    Ok,
    /// D has zero entries.
    HasZeros,
    /// Wrong sign counts.
    Bad,
}

/// Record the sign pattern of D into `signature`.
pub fn signature_of(d: &DVector<f64>, signature: &mut [i8]) {
    debug_assert_eq!(d.len(), signature.len());
    for (s, &v) in signature.iter_mut().zip(d.iter()) {
        *s = if v > 0.0 {
            1
        } else if v < 0.0 {
            -1
        } else {
            0
        };
    }
}

/// Check a signature against the required KKT inertia.
pub fn check_inertia(signature: &[i8], ndx: usize, nc: usize) -> InertiaFlag {
    let mut numpos = 0;
    let mut numneg = 0;
    let mut numzer = 0;
    for &s in signature {
        match s {
            1 => numpos += 1,
            -1 => numneg += 1,
            _ => numzer += 1,
        }
    }
    if numpos == ndx && numneg == nc && numzer == 0 {
        InertiaFlag::Ok
    } else if numzer > 0 {
        InertiaFlag::HasZeros
    } else {
        InertiaFlag::Bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_and_check() {
        let d = DVector::from_vec(vec![2.0, 0.5, -1.0, 0.0]);
        let mut sig = [0i8; 4];
        signature_of(&d, &mut sig);
        assert_eq!(sig, [1, 1, -1, 0]);

        assert_eq!(check_inertia(&sig, 2, 2), InertiaFlag::HasZeros);
        assert_eq!(check_inertia(&[1, 1, -1, -1], 2, 2), InertiaFlag::Ok);
        assert_eq!(check_inertia(&[1, 1, 1, -1], 2, 2), InertiaFlag::Bad);
    }
}
