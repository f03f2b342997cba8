//! Second-order (Lorentz) cone.
//!
//! K = {(t, x̄) : t ≥ ‖x̄‖₂}, dimension ≥ 2. The projection has the
//! classic three-branch closed form:
//!
//! - ‖x̄‖ ≤ t: z is inside, P(z) = z;
//! - ‖x̄‖ ≤ −t: z is in the polar cone, P(z) = 0;
//! - otherwise: P(z) = ½ (1 + t/‖x̄‖) (‖x̄‖, x̄).
//!
//! On the middle region the projection (and hence the normal-cone
//! projection z − P(z)) is differentiable, with the standard boundary
//! Jacobian used below.

use std::cell::{Cell, RefCell};

use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};

use super::ConstraintSet;

/// Second-order cone of the given dimension.
#[derive(Debug)]
pub struct SecondOrderCone {
    dim: usize,
    mu: Cell<f64>,
    scratch: RefCell<SocScratch>,
}

#[derive(Debug)]
struct SocScratch {
    jac: DMatrix<f64>,
    u: DVector<f64>,
}

impl SecondOrderCone {
    /// Create a second-order cone; `dim >= 2`.
    pub fn new(dim: usize) -> Self {
        assert!(dim >= 2, "SOC must have dimension >= 2");
        Self {
            dim,
            mu: Cell::new(0.0),
            scratch: RefCell::new(SocScratch {
                jac: DMatrix::zeros(dim, 0),
                u: DVector::zeros(0),
            }),
        }
    }

    /// Dimension of the cone.
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn tail_norm(z: &DVectorView<f64>) -> f64 {
        let mut acc = 0.0;
        for i in 1..z.len() {
            acc += z[i] * z[i];
        }
        acc.sqrt()
    }
}

impl ConstraintSet for SecondOrderCone {
    fn projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        debug_assert_eq!(z.len(), self.dim);
        let t = z[0];
        let nx = Self::tail_norm(&z);
        if nx <= t {
            out.copy_from(&z);
        } else if nx <= -t {
            out.fill(0.0);
        } else {
            let coef = 0.5 * (1.0 + t / nx);
            out[0] = coef * nx;
            for i in 1..z.len() {
                out[i] = coef * z[i];
            }
        }
    }

    fn normal_cone_projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        let t = z[0];
        let nx = Self::tail_norm(&z);
        if nx <= t {
            out.fill(0.0);
        } else if nx <= -t {
            out.copy_from(&z);
        } else {
            let coef = 0.5 * (1.0 + t / nx);
            out[0] = t - coef * nx;
            for i in 1..z.len() {
                out[i] = (1.0 - coef) * z[i];
            }
        }
    }

    fn apply_normal_cone_jacobian(&self, z: DVectorView<f64>, mut jac: DMatrixViewMut<f64>) {
        debug_assert_eq!(z.len(), self.dim);
        debug_assert_eq!(jac.nrows(), self.dim);
        let t = z[0];
        let nx = Self::tail_norm(&z);
        if nx <= t {
            // interior: the normal-cone projection is identically zero
            jac.fill(0.0);
            return;
        }
        if nx <= -t {
            // polar cone: the normal-cone projection is the identity
            return;
        }

        let s = &mut *self.scratch.borrow_mut();
        let ncols = jac.ncols();
        if s.jac.ncols() != ncols {
            s.jac = DMatrix::zeros(self.dim, ncols);
            s.u = DVector::zeros(ncols);
        }
        s.jac.copy_from(&jac);

        // u = x̄ᵀ · J_x̄ (row combination of the tail rows)
        let jx = s.jac.rows(1, self.dim - 1);
        let xs = z.rows(1, self.dim - 1);
        s.u.gemv_tr(1.0, &jx, &xs, 0.0);

        // (I − ∂P)·J on the boundary region
        let half_over_nx = 0.5 / nx;
        let tail_coef = 0.5 * (1.0 - t / nx);
        let curv = t / (2.0 * nx * nx * nx);
        for c in 0..ncols {
            let jt_c = s.jac[(0, c)];
            let u_c = s.u[c];
            jac[(0, c)] = 0.5 * jt_c - half_over_nx * u_c;
            for r in 1..self.dim {
                let xr = z[r];
                jac[(r, c)] =
                    tail_coef * s.jac[(r, c)] - half_over_nx * xr * jt_c + curv * xr * u_c;
            }
        }
    }

    fn compute_active_set(&self, z: DVectorView<f64>, mask: &mut [bool]) {
        debug_assert_eq!(z.len(), mask.len());
        let active = Self::tail_norm(&z) >= z[0];
        mask.fill(active);
    }

    fn set_prox_parameter(&self, mu: f64) {
        self.mu.set(mu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn proj(set: &SecondOrderCone, z: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(z.len());
        set.projection(z.rows(0, z.len()), out.rows_mut(0, z.len()));
        out
    }

    #[test]
    fn test_soc_interior_untouched() {
        let set = SecondOrderCone::new(3);
        let z = DVector::from_vec(vec![2.0, 1.0, 0.5]);
        assert_eq!(proj(&set, &z), z);
    }

    #[test]
    fn test_soc_polar_maps_to_zero() {
        let set = SecondOrderCone::new(3);
        let z = DVector::from_vec(vec![-2.0, 1.0, 0.5]);
        assert_eq!(proj(&set, &z), DVector::zeros(3));
    }

    #[test]
    fn test_soc_boundary_projection_and_moreau() {
        let set = SecondOrderCone::new(3);
        let z = DVector::from_vec(vec![0.5, 3.0, 4.0]);
        let p = proj(&set, &z);

        // projected point sits on the boundary
        let nx = (p[1] * p[1] + p[2] * p[2]).sqrt();
        assert_abs_diff_eq!(p[0], nx, epsilon = 1e-12);

        // Moreau: z = P(z) + P_N(z)
        let mut ncp = DVector::zeros(3);
        set.normal_cone_projection(z.rows(0, 3), ncp.rows_mut(0, 3));
        assert_abs_diff_eq!(&p + &ncp, z, epsilon = 1e-12);

        // idempotence
        assert_abs_diff_eq!(proj(&set, &p), p, epsilon = 1e-12);
    }

    #[test]
    fn test_soc_jacobian_matches_finite_differences() {
        let set = SecondOrderCone::new(3);
        let z = DVector::from_vec(vec![0.5, 3.0, 4.0]);

        // apply to the identity to materialize ∂(z − P(z))
        let mut jac = DMatrix::identity(3, 3);
        set.apply_normal_cone_jacobian(z.rows(0, 3), jac.view_mut((0, 0), (3, 3)));

        let eps = 1e-7;
        for j in 0..3 {
            let mut zp = z.clone();
            zp[j] += eps;
            let mut zm = z.clone();
            zm[j] -= eps;
            let mut fp = DVector::zeros(3);
            let mut fm = DVector::zeros(3);
            set.normal_cone_projection(zp.rows(0, 3), fp.rows_mut(0, 3));
            set.normal_cone_projection(zm.rows(0, 3), fm.rows_mut(0, 3));
            for i in 0..3 {
                let fd = (fp[i] - fm[i]) / (2.0 * eps);
                assert_abs_diff_eq!(jac[(i, j)], fd, epsilon = 1e-5);
            }
        }
    }
}
