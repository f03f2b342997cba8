//! Cost abstractions.
//!
//! A cost is a twice-differentiable scalar function on the manifold.
//! [`QuadraticCost`] covers the flat-space QP objective ½ xᵀH x + gᵀx,
//! [`QuadraticResidualCost`] the Gauss-Newton-friendly ½ r(x)ᵀW r(x)
//! over any C² residual, and [`CostSum`] weighted sums of shared cost
//! components with `+`/`*` composition.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign};
use std::rc::Rc;

use nalgebra::{DMatrix, DVector};

use crate::function::C2Function;

/// Twice-differentiable scalar cost on the manifold.
pub trait CostFunction {
    /// Embedding dimension of the input point.
    fn nx(&self) -> usize;
    /// Tangent dimension of the input space.
    fn ndx(&self) -> usize;

    /// Cost value at x.
    fn call(&self, x: &DVector<f64>) -> f64;

    /// Gradient (in tangent coordinates) at x, written to `out`.
    fn gradient(&self, x: &DVector<f64>, out: &mut DVector<f64>);

    /// Hessian (ndx × ndx, tangent coordinates) at x, written to `out`.
    fn hessian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>);
}

/// Quadratic cost ½ xᵀH x + gᵀx on a flat space.
#[derive(Debug, Clone)]
pub struct QuadraticCost {
    hess: DMatrix<f64>,
    grad: DVector<f64>,
    scratch: RefCell<DVector<f64>>,
}

impl QuadraticCost {
    /// Build from a symmetric H and linear term g.
    pub fn new(hess: DMatrix<f64>, grad: DVector<f64>) -> Self {
        assert_eq!(hess.nrows(), hess.ncols(), "H must be square");
        assert_eq!(hess.nrows(), grad.len(), "H and g sizes must agree");
        let n = grad.len();
        Self {
            hess,
            grad,
            scratch: RefCell::new(DVector::zeros(n)),
        }
    }
}

impl CostFunction for QuadraticCost {
    fn nx(&self) -> usize {
        self.grad.len()
    }

    fn ndx(&self) -> usize {
        self.grad.len()
    }

    fn call(&self, x: &DVector<f64>) -> f64 {
        let mut hx = self.scratch.borrow_mut();
        hx.gemv(1.0, &self.hess, x, 0.0);
        0.5 * x.dot(&hx) + self.grad.dot(x)
    }

    fn gradient(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
        out.gemv(1.0, &self.hess, x, 0.0);
        *out += &self.grad;
    }

    fn hessian(&self, _x: &DVector<f64>, out: &mut DMatrix<f64>) {
        out.copy_from(&self.hess);
    }
}

/// Weighted least-squares cost ½ r(x)ᵀ W r(x) over a C² residual.
///
/// The Hessian is JᵀW J plus the residual's vector-Hessian product
/// against W·r, which vanishes for affine residuals.
pub struct QuadraticResidualCost {
    residual: Rc<dyn C2Function>,
    weights: DMatrix<f64>,
    scratch: RefCell<ResidualScratch>,
}

struct ResidualScratch {
    r: DVector<f64>,
    wr: DVector<f64>,
    jac: DMatrix<f64>,
    wjac: DMatrix<f64>,
    vhp: DMatrix<f64>,
}

impl QuadraticResidualCost {
    /// Build from a residual and a symmetric weight matrix (`nr × nr`).
    pub fn new(residual: Rc<dyn C2Function>, weights: DMatrix<f64>) -> Self {
        let (nr, ndx) = (residual.nr(), residual.ndx());
        assert_eq!(weights.nrows(), nr, "weight matrix must be nr × nr");
        assert_eq!(weights.ncols(), nr, "weight matrix must be nr × nr");
        Self {
            residual,
            weights,
            scratch: RefCell::new(ResidualScratch {
                r: DVector::zeros(nr),
                wr: DVector::zeros(nr),
                jac: DMatrix::zeros(nr, ndx),
                wjac: DMatrix::zeros(nr, ndx),
                vhp: DMatrix::zeros(ndx, ndx),
            }),
        }
    }

    /// Squared-distance-to-target cost ½ ‖x ⊖ target‖² over a manifold.
    pub fn squared_distance(
        space: Rc<dyn crate::manifold::Manifold>,
        target: DVector<f64>,
    ) -> Self {
        let ndx = space.ndx();
        let residual = Rc::new(crate::function::ManifoldDifference::new(space, target));
        Self::new(residual, DMatrix::identity(ndx, ndx))
    }
}

impl CostFunction for QuadraticResidualCost {
    fn nx(&self) -> usize {
        self.residual.nx()
    }

    fn ndx(&self) -> usize {
        self.residual.ndx()
    }

    fn call(&self, x: &DVector<f64>) -> f64 {
        let s = &mut *self.scratch.borrow_mut();
        let nr = s.r.len();
        self.residual.call(x, s.r.rows_mut(0, nr));
        s.wr.gemv(1.0, &self.weights, &s.r, 0.0);
        0.5 * s.r.dot(&s.wr)
    }

    fn gradient(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
        let s = &mut *self.scratch.borrow_mut();
        let (nr, ndx) = (s.r.len(), out.len());
        self.residual.call(x, s.r.rows_mut(0, nr));
        self.residual.jacobian(x, s.jac.view_mut((0, 0), (nr, ndx)));
        s.wr.gemv(1.0, &self.weights, &s.r, 0.0);
        out.gemv_tr(1.0, &s.jac, &s.wr, 0.0);
    }

    fn hessian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>) {
        let s = &mut *self.scratch.borrow_mut();
        let (nr, ndx) = (s.r.len(), out.nrows());
        self.residual.call(x, s.r.rows_mut(0, nr));
        self.residual.jacobian(x, s.jac.view_mut((0, 0), (nr, ndx)));
        s.wr.gemv(1.0, &self.weights, &s.r, 0.0);
        s.wjac.gemm(1.0, &self.weights, &s.jac, 0.0);
        out.gemm_tr(1.0, &s.jac, &s.wjac, 0.0);
        self.residual
            .vector_hessian_product(x, s.wr.rows(0, nr), s.vhp.view_mut((0, 0), (ndx, ndx)));
        *out += &s.vhp;
    }
}

/// Weighted sum of cost components.
///
/// Components are shared (`Rc`); merging two sums clones the handles,
/// so a component added to several sums is the same object in all of
/// them, and summand identity is not duplicated by composition.
#[derive(Clone)]
pub struct CostSum {
    nx: usize,
    ndx: usize,
    components: Vec<Rc<dyn CostFunction>>,
    weights: Vec<f64>,
    scratch: RefCell<SumScratch>,
}

#[derive(Clone)]
struct SumScratch {
    grad: DVector<f64>,
    hess: DMatrix<f64>,
}

impl CostSum {
    /// Empty sum over a space of the given dimensions.
    pub fn new(nx: usize, ndx: usize) -> Self {
        Self {
            nx,
            ndx,
            components: Vec::new(),
            weights: Vec::new(),
            scratch: RefCell::new(SumScratch {
                grad: DVector::zeros(ndx),
                hess: DMatrix::zeros(ndx, ndx),
            }),
        }
    }

    /// Sum with a predefined set of components and weights.
    pub fn with_components(
        nx: usize,
        ndx: usize,
        components: Vec<Rc<dyn CostFunction>>,
        weights: Vec<f64>,
    ) -> Self {
        assert_eq!(components.len(), weights.len());
        let mut out = Self::new(nx, ndx);
        out.components = components;
        out.weights = weights;
        out
    }

    /// Number of summands.
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// Append a component with the given weight.
    pub fn add_component(&mut self, component: Rc<dyn CostFunction>, weight: f64) {
        assert_eq!(component.nx(), self.nx, "component input space mismatch");
        assert_eq!(component.ndx(), self.ndx, "component input space mismatch");
        self.components.push(component);
        self.weights.push(weight);
    }
}

impl CostFunction for CostSum {
    fn nx(&self) -> usize {
        self.nx
    }

    fn ndx(&self) -> usize {
        self.ndx
    }

    fn call(&self, x: &DVector<f64>) -> f64 {
        self.components
            .iter()
            .zip(&self.weights)
            .map(|(c, w)| w * c.call(x))
            .sum()
    }

    fn gradient(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
        let s = &mut *self.scratch.borrow_mut();
        out.fill(0.0);
        for (c, w) in self.components.iter().zip(&self.weights) {
            c.gradient(x, &mut s.grad);
            out.axpy(*w, &s.grad, 1.0);
        }
    }

    fn hessian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>) {
        let s = &mut *self.scratch.borrow_mut();
        out.fill(0.0);
        for (c, w) in self.components.iter().zip(&self.weights) {
            c.hessian(x, &mut s.hess);
            *out += &s.hess * *w;
        }
    }
}

impl AddAssign<CostSum> for CostSum {
    fn add_assign(&mut self, rhs: CostSum) {
        self.components.extend(rhs.components);
        self.weights.extend(rhs.weights);
    }
}

impl Add for CostSum {
    type Output = CostSum;

    fn add(mut self, rhs: CostSum) -> CostSum {
        self += rhs;
        self
    }
}

impl MulAssign<f64> for CostSum {
    fn mul_assign(&mut self, rhs: f64) {
        for w in &mut self.weights {
            *w *= rhs;
        }
    }
}

impl Mul<f64> for CostSum {
    type Output = CostSum;

    fn mul(mut self, rhs: f64) -> CostSum {
        self *= rhs;
        self
    }
}

impl Mul<CostSum> for f64 {
    type Output = CostSum;

    fn mul(self, rhs: CostSum) -> CostSum {
        rhs * self
    }
}

impl fmt::Display for CostSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CostSum(num_components={}, weights=(", self.num_components())?;
        for (i, w) in self.weights.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", w)?;
        }
        write!(f, "))")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_quadratic_cost() {
        let h = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let g = DVector::from_vec(vec![1.0, -1.0]);
        let cost = QuadraticCost::new(h, g);

        let x = DVector::from_vec(vec![1.0, 1.0]);
        assert_abs_diff_eq!(cost.call(&x), 3.0);

        let mut grad = DVector::zeros(2);
        cost.gradient(&x, &mut grad);
        assert_abs_diff_eq!(grad[0], 3.0);
        assert_abs_diff_eq!(grad[1], 3.0);
    }

    #[test]
    fn test_cost_sum_merge_and_scale() {
        let h = DMatrix::identity(2, 2);
        let g = DVector::zeros(2);
        let quad: Rc<dyn CostFunction> = Rc::new(QuadraticCost::new(h, g));

        let mut a = CostSum::new(2, 2);
        a.add_component(quad.clone(), 1.0);
        let mut b = CostSum::new(2, 2);
        b.add_component(quad, 3.0);

        let sum = (a + b) * 2.0;
        assert_eq!(sum.num_components(), 2);

        let x = DVector::from_vec(vec![1.0, 0.0]);
        // (1·½ + 3·½) · 2 = 4
        assert_abs_diff_eq!(sum.call(&x), 4.0);

        let mut grad = DVector::zeros(2);
        sum.gradient(&x, &mut grad);
        assert_abs_diff_eq!(grad[0], 4.0);
    }

    #[test]
    fn test_cost_sum_display() {
        let sum = CostSum::new(2, 2);
        assert_eq!(format!("{}", sum), "CostSum(num_components=0, weights=())");
    }
}
