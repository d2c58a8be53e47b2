//! Contract between equation-contributing entities and the solver boundary.

use nalgebra::DMatrix;

use crate::units::VariableSpec;

/// An entity that contributes residual equations to the network.
///
/// Each entity evaluates against a snapshot of its local variables, gathered
/// by the assembly layer from the global unknown vector and the entity's
/// fixed inputs; entities never mutate one another. Variable order is fixed
/// per entity kind and matches the order reported by [`variables`].
///
/// [`variables`]: ImplicitEquations::variables
pub trait ImplicitEquations {
    /// Declare the entity's local variables with their units and roles, in
    /// local slot order.
    fn variables(&self) -> Vec<VariableSpec>;

    /// Number of residual equations the entity contributes.
    fn equation_count(&self) -> usize;

    /// Number of local variables the entity evaluates against.
    fn variable_count(&self) -> usize;

    /// Evaluate the residual vector for the given local values.
    ///
    /// `out` has length [`equation_count`](ImplicitEquations::equation_count)
    /// and every entry is written.
    fn residual(&self, values: &[f64], out: &mut [f64]);

    /// Evaluate the local Jacobian block, rows indexed by equation and
    /// columns by local variable. The caller supplies a zeroed matrix.
    fn jacobian(&self, values: &[f64], out: &mut DMatrix<f64>);

    /// Closed-form update of any directly solvable unknowns, used by the
    /// solver's relaxation sweeps. The default does nothing.
    fn solve_direct(&self, _values: &mut [f64]) {}
}
