//! Problem definition: cost plus an ordered list of constraints.

use std::rc::Rc;

use nalgebra::{DMatrix, DVector};

use crate::cost::CostFunction;
use crate::function::C2Function;
use crate::manifold::Manifold;
use crate::sets::ConstraintSet;

/// One constraint: a residual function paired with the set its values
/// must belong to.
pub struct ConstraintObject {
    /// Residual c_i : M → ℝ^{n_i}.
    pub func: Box<dyn C2Function>,
    /// Target set C_i.
    pub set: Box<dyn ConstraintSet>,
}

impl ConstraintObject {
    /// Pair a residual with a set.
    pub fn new(func: Box<dyn C2Function>, set: Box<dyn ConstraintSet>) -> Self {
        Self { func, set }
    }

    /// Ambient dimension of the constraint.
    pub fn dim(&self) -> usize {
        self.func.nr()
    }
}

/// Optimization problem on a manifold.
///
/// Built once, immutable during a solve. Derived quantities (total
/// constraint dimension, per-constraint offsets into the flat
/// multiplier vector) are precomputed at construction.
pub struct Problem {
    space: Rc<dyn Manifold>,
    cost: Box<dyn CostFunction>,
    constraints: Vec<ConstraintObject>,
    offsets: Vec<usize>,
    nc_total: usize,
}

impl Problem {
    /// Assemble a problem; all constraint residuals must live on the
    /// same space as the cost.
    pub fn new(
        space: Rc<dyn Manifold>,
        cost: Box<dyn CostFunction>,
        constraints: Vec<ConstraintObject>,
    ) -> Self {
        assert_eq!(cost.nx(), space.nx(), "cost input space mismatch");
        assert_eq!(cost.ndx(), space.ndx(), "cost input space mismatch");
        let mut offsets = Vec::with_capacity(constraints.len());
        let mut nc_total = 0;
        for (i, cstr) in constraints.iter().enumerate() {
            assert_eq!(cstr.func.nx(), space.nx(), "constraint {} input space mismatch", i);
            assert_eq!(cstr.func.ndx(), space.ndx(), "constraint {} input space mismatch", i);
            offsets.push(nc_total);
            nc_total += cstr.dim();
        }
        Self {
            space,
            cost,
            constraints,
            offsets,
            nc_total,
        }
    }

    /// Unconstrained problem.
    pub fn unconstrained(space: Rc<dyn Manifold>, cost: Box<dyn CostFunction>) -> Self {
        Self::new(space, cost, Vec::new())
    }

    /// The manifold the decision variable lives on.
    pub fn space(&self) -> &dyn Manifold {
        &*self.space
    }

    /// Shared handle to the manifold.
    pub fn space_rc(&self) -> Rc<dyn Manifold> {
        self.space.clone()
    }

    /// The cost function.
    pub fn cost(&self) -> &dyn CostFunction {
        &*self.cost
    }

    /// Embedding dimension of a point.
    pub fn nx(&self) -> usize {
        self.space.nx()
    }

    /// Tangent dimension.
    pub fn ndx(&self) -> usize {
        self.space.ndx()
    }

    /// Number of constraint blocks.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Total constraint dimension Σ n_i.
    pub fn total_constraint_dim(&self) -> usize {
        self.nc_total
    }

    /// Dimension of constraint block i.
    pub fn constraint_dim(&self, i: usize) -> usize {
        self.constraints[i].dim()
    }

    /// Offset of constraint block i in the flat constraint space.
    pub fn index(&self, i: usize) -> usize {
        self.offsets[i]
    }

    /// Constraint block i.
    pub fn constraint(&self, i: usize) -> &ConstraintObject {
        &self.constraints[i]
    }

    /// Evaluate all constraint residuals at x into the flat vector
    /// `values` (length `total_constraint_dim`).
    pub fn evaluate_constraints(&self, x: &DVector<f64>, values: &mut DVector<f64>) {
        debug_assert_eq!(values.len(), self.nc_total);
        for (i, cstr) in self.constraints.iter().enumerate() {
            let nr = cstr.dim();
            cstr.func.call(x, values.rows_mut(self.offsets[i], nr));
        }
    }

    /// Evaluate all constraint Jacobians at x into the stacked
    /// `nc_total × ndx` matrix `jac`.
    pub fn constraint_jacobians(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) {
        debug_assert_eq!(jac.nrows(), self.nc_total);
        debug_assert_eq!(jac.ncols(), self.ndx());
        let ndx = self.ndx();
        for (i, cstr) in self.constraints.iter().enumerate() {
            let nr = cstr.dim();
            cstr.func
                .jacobian(x, jac.view_mut((self.offsets[i], 0), (nr, ndx)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::QuadraticCost;
    use crate::function::LinearFunction;
    use crate::manifold::VectorSpace;
    use crate::sets::EqualitySet;

    fn toy_problem() -> Problem {
        let space = Rc::new(VectorSpace::new(3));
        let cost = QuadraticCost::new(DMatrix::identity(3, 3), DVector::zeros(3));
        let c1 = ConstraintObject::new(
            Box::new(LinearFunction::from_matrix(DMatrix::from_row_slice(
                2,
                3,
                &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            ))),
            Box::new(EqualitySet::new()),
        );
        let c2 = ConstraintObject::new(
            Box::new(LinearFunction::from_matrix(DMatrix::from_row_slice(
                1,
                3,
                &[0.0, 0.0, 1.0],
            ))),
            Box::new(EqualitySet::new()),
        );
        Problem::new(space, Box::new(cost), vec![c1, c2])
    }

    #[test]
    fn test_dims_and_offsets() {
        let prob = toy_problem();
        assert_eq!(prob.num_constraints(), 2);
        assert_eq!(prob.total_constraint_dim(), 3);
        assert_eq!(prob.index(0), 0);
        assert_eq!(prob.index(1), 2);
        assert_eq!(prob.constraint_dim(0), 2);
    }

    #[test]
    fn test_evaluate_constraints() {
        let prob = toy_problem();
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let mut vals = DVector::zeros(3);
        prob.evaluate_constraints(&x, &mut vals);
        assert_eq!(vals, DVector::from_vec(vec![1.0, 2.0, 3.0]));
    }
}
