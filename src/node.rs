//! Pin joint contributing force-balance and pass-through equations.

use nalgebra::DMatrix;
use num::complex::Complex64;

use crate::diff::complex_step_jacobian;
use crate::entity::ImplicitEquations;
use crate::errors::ArityError;
use crate::units::{Unit, VariableRole, VariableSpec};

/// Arity configuration of a [`Node`], fixed at construction.
///
/// A node owns `n_loads + n_reactions` indexed load lines. The first two
/// line indices are the primary directions determined purely by the balance
/// equations; every further line is chained to its feed-in by a pass-through
/// equation. Reaction lines carry no feed-in, so they must all fall within
/// the primary indices whenever pass-through lines exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeArity {
    /// Number of load lines fed by connected members or constraints.
    pub n_loads: usize,
    /// Number of reaction lines.
    pub n_reactions: usize,
    /// Number of known external forces applied to the joint.
    pub n_external_forces: usize,
}

impl NodeArity {
    /// Create an arity configuration.
    #[must_use]
    pub fn new(n_loads: usize, n_reactions: usize, n_external_forces: usize) -> Self {
        Self {
            n_loads,
            n_reactions,
            n_external_forces,
        }
    }

    /// Total number of load lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.n_loads + self.n_reactions
    }

    /// Number of pass-through equations, clamped at zero for nodes with
    /// fewer than two load lines.
    #[must_use]
    pub fn pass_through_count(&self) -> usize {
        self.line_count().saturating_sub(2)
    }

    /// Number of residual equations: two balance equations plus one
    /// pass-through per load line beyond the primary pair.
    #[must_use]
    pub fn equation_count(&self) -> usize {
        2 + self.pass_through_count()
    }

    /// Reject configurations whose pass-through lines have no feed-in.
    fn validate(&self) -> Result<(), ArityError> {
        if self.line_count() > 2 && self.n_reactions > 2 {
            return Err(ArityError::MissingFeedIn {
                n_loads: self.n_loads,
                n_reactions: self.n_reactions,
            });
        }
        Ok(())
    }

    /// First line index that carries a feed-in.
    pub(crate) fn first_feed_in(&self) -> usize {
        self.n_reactions
    }

    /// Local slot of `load_out[line]`.
    pub(crate) fn load_out_slot(&self, line: usize) -> usize {
        line
    }

    /// Local slot of `direction[line]`.
    pub(crate) fn direction_slot(&self, line: usize) -> usize {
        self.line_count() + line
    }

    /// Local slot of `load_in[line]`, valid for lines in
    /// `first_feed_in()..line_count()`.
    pub(crate) fn load_in_slot(&self, line: usize) -> usize {
        2 * self.line_count() + line - self.n_reactions
    }

    /// Local slot of `force_ext[index]`.
    pub(crate) fn force_ext_slot(&self, index: usize) -> usize {
        2 * self.line_count() + self.n_loads + 2 * index
    }

    /// Local slot of `direction_ext[index]`.
    pub(crate) fn direction_ext_slot(&self, index: usize) -> usize {
        self.force_ext_slot(index) + 1
    }

    /// Total number of local variables.
    pub(crate) fn variable_count(&self) -> usize {
        2 * self.line_count() + self.n_loads + 2 * self.n_external_forces
    }
}

/// One truss joint.
///
/// The joint imposes a force magnitude on each of its load lines and
/// balances the horizontal and vertical components of every line and
/// external force. Directions, feed-in constraints and external forces are
/// held as configured values; the load-line outputs are unknowns solved by
/// the network.
#[derive(Clone, Debug)]
pub struct Node {
    /// Immutable arity configuration.
    arity: NodeArity,
    /// Angle at which each load line leaves the joint, in radians.
    pub(crate) directions: Vec<f64>,
    /// Constraint values for feed-in lines not connected to a member.
    pub(crate) feed_in: Vec<f64>,
    /// Known external force magnitudes in newtons.
    pub(crate) external_forces: Vec<f64>,
    /// Angles of the external forces, in radians.
    pub(crate) external_directions: Vec<f64>,
}

impl Node {
    /// Create a joint with the given arity.
    ///
    /// # Errors
    ///
    /// Returns [`ArityError::MissingFeedIn`] when the configuration leaves a
    /// pass-through line without a feed-in.
    pub fn new(arity: NodeArity) -> Result<Self, ArityError> {
        arity.validate()?;
        Ok(Self {
            arity,
            directions: vec![0.0; arity.line_count()],
            feed_in: vec![0.0; arity.n_loads],
            external_forces: vec![0.0; arity.n_external_forces],
            external_directions: vec![0.0; arity.n_external_forces],
        })
    }

    /// The joint's arity configuration.
    #[must_use]
    pub fn arity(&self) -> NodeArity {
        self.arity
    }

    /// Direction of a load line in radians.
    pub(crate) fn direction(&self, line: usize) -> f64 {
        self.directions[line]
    }

    /// Constraint value for a feed-in line, indexed by logical line number.
    pub(crate) fn feed_in_value(&self, line: usize) -> f64 {
        self.feed_in[line - self.arity.n_reactions]
    }

    /// Evaluate the residuals in complex arithmetic.
    ///
    /// This is the single residual definition for the joint; the real path
    /// reads back the real parts and the Jacobian path perturbs along the
    /// imaginary axis.
    fn residual_complex(&self, values: &[Complex64], out: &mut [Complex64]) {
        let arity = self.arity;
        let lines = arity.line_count();

        let mut horizontal = Complex64::new(0.0, 0.0);
        let mut vertical = Complex64::new(0.0, 0.0);
        for line in 0..lines {
            let load = values[arity.load_out_slot(line)];
            let angle = values[arity.direction_slot(line)];
            horizontal += load * angle.cos();
            vertical += load * angle.sin();
        }
        for index in 0..arity.n_external_forces {
            let force = values[arity.force_ext_slot(index)];
            let angle = values[arity.direction_ext_slot(index)];
            horizontal += force * angle.cos();
            vertical += force * angle.sin();
        }
        out[0] = horizontal;
        out[1] = vertical;

        for line in 2..lines {
            out[line] = values[arity.load_out_slot(line)] - values[arity.load_in_slot(line)];
        }
    }
}

impl ImplicitEquations for Node {
    fn variables(&self) -> Vec<VariableSpec> {
        let arity = self.arity;
        let mut specs = Vec::with_capacity(arity.variable_count());
        for line in 0..arity.line_count() {
            specs.push(VariableSpec::new(
                format!("load{line}_out"),
                Unit::Newton,
                VariableRole::Unknown,
            ));
        }
        for line in 0..arity.line_count() {
            specs.push(VariableSpec::new(
                format!("direction{line}"),
                Unit::Radian,
                VariableRole::Input,
            ));
        }
        for line in arity.first_feed_in()..arity.line_count() {
            specs.push(VariableSpec::new(
                format!("load{line}_in"),
                Unit::Newton,
                VariableRole::Input,
            ));
        }
        for index in 0..arity.n_external_forces {
            specs.push(VariableSpec::new(
                format!("force{index}_ext"),
                Unit::Newton,
                VariableRole::Input,
            ));
            specs.push(VariableSpec::new(
                format!("direction{index}_ext"),
                Unit::Radian,
                VariableRole::Input,
            ));
        }
        specs
    }

    fn equation_count(&self) -> usize {
        self.arity.equation_count()
    }

    fn variable_count(&self) -> usize {
        self.arity.variable_count()
    }

    fn residual(&self, values: &[f64], out: &mut [f64]) {
        let promoted: Vec<Complex64> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        let mut complex_out = vec![Complex64::new(0.0, 0.0); out.len()];
        self.residual_complex(&promoted, &mut complex_out);
        for (real, complex) in out.iter_mut().zip(&complex_out) {
            *real = complex.re;
        }
    }

    fn jacobian(&self, values: &[f64], out: &mut DMatrix<f64>) {
        complex_step_jacobian(
            values,
            self.equation_count(),
            |z, r| self.residual_complex(z, r),
            out,
        );
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn node(n_loads: usize, n_reactions: usize, n_external_forces: usize) -> Node {
        Node::new(NodeArity::new(n_loads, n_reactions, n_external_forces))
            .expect("arity is consistent")
    }

    #[test]
    fn equation_count_clamps_for_small_nodes() {
        assert_eq!(node(0, 0, 0).equation_count(), 2);
        assert_eq!(node(1, 0, 0).equation_count(), 2);
        assert_eq!(node(2, 0, 0).equation_count(), 2);
        assert_eq!(node(3, 1, 0).equation_count(), 4);
    }

    #[test]
    fn rejects_pass_through_lines_without_feed_in() {
        let error = Node::new(NodeArity::new(1, 3, 0)).expect_err("inconsistent arity rejected");
        assert_eq!(
            error,
            ArityError::MissingFeedIn {
                n_loads: 1,
                n_reactions: 3,
            }
        );
        // Up to two reactions always leave the pass-through range covered.
        assert!(Node::new(NodeArity::new(2, 2, 0)).is_ok());
        // Reactions alone are fine while no pass-through lines exist.
        assert!(Node::new(NodeArity::new(0, 2, 1)).is_ok());
    }

    #[test]
    fn empty_node_balances_trivially() {
        let node = node(0, 0, 0);
        assert_eq!(node.variable_count(), 0);
        let mut residual = [f64::NAN; 2];
        node.residual(&[], &mut residual);
        assert_eq!(residual, [0.0, 0.0]);
    }

    #[test]
    fn balance_sums_components_of_lines_and_external_forces() {
        // Two lines plus one external force; variables laid out as
        // [out0, out1, dir0, dir1, in0, in1, force0_ext, dir0_ext].
        let node = node(2, 0, 1);
        let values = [
            30.0,
            40.0,
            0.25,
            2.0,
            0.0,
            0.0,
            15.0,
            -1.0,
        ];
        let mut residual = [f64::NAN; 2];
        node.residual(&values, &mut residual);

        let horizontal = 30.0 * 0.25_f64.cos() + 40.0 * 2.0_f64.cos() + 15.0 * (-1.0_f64).cos();
        let vertical = 30.0 * 0.25_f64.sin() + 40.0 * 2.0_f64.sin() + 15.0 * (-1.0_f64).sin();
        assert_relative_eq!(residual[0], horizontal, max_relative = 1.0e-14);
        assert_relative_eq!(residual[1], vertical, max_relative = 1.0e-14);
    }

    #[test]
    fn pass_through_ties_outputs_to_feed_ins() {
        // Three loads, one reaction: lines 2 and 3 get pass-through
        // equations chained to load2_in and load3_in.
        let node = node(3, 1, 0);
        let arity = node.arity();
        let mut values = vec![0.0; node.variable_count()];
        values[arity.load_out_slot(2)] = 55.0;
        values[arity.load_in_slot(2)] = 55.0;
        values[arity.load_out_slot(3)] = 10.0;
        values[arity.load_in_slot(3)] = 4.0;

        let mut residual = vec![f64::NAN; node.equation_count()];
        node.residual(&values, &mut residual);
        assert_relative_eq!(residual[2], 0.0, epsilon = 1.0e-14);
        assert_relative_eq!(residual[3], 6.0, epsilon = 1.0e-14);
    }

    #[test]
    fn complex_step_jacobian_matches_hand_derived_partials() {
        let node = node(3, 1, 0);
        let arity = node.arity();
        let mut values = vec![0.0; node.variable_count()];
        for line in 0..arity.line_count() {
            values[arity.load_out_slot(line)] = 10.0 + line as f64;
            values[arity.direction_slot(line)] = 0.3 * (line as f64 + 1.0);
        }
        for line in arity.first_feed_in()..arity.line_count() {
            values[arity.load_in_slot(line)] = 5.0;
        }

        let mut jacobian = DMatrix::zeros(node.equation_count(), node.variable_count());
        node.jacobian(&values, &mut jacobian);

        for line in 0..arity.line_count() {
            let load = values[arity.load_out_slot(line)];
            let angle = values[arity.direction_slot(line)];
            assert_relative_eq!(
                jacobian[(0, arity.load_out_slot(line))],
                angle.cos(),
                max_relative = 1.0e-12
            );
            assert_relative_eq!(
                jacobian[(0, arity.direction_slot(line))],
                -load * angle.sin(),
                max_relative = 1.0e-12
            );
            assert_relative_eq!(
                jacobian[(1, arity.load_out_slot(line))],
                angle.sin(),
                max_relative = 1.0e-12
            );
            assert_relative_eq!(
                jacobian[(1, arity.direction_slot(line))],
                load * angle.cos(),
                max_relative = 1.0e-12
            );
        }
        for line in 2..arity.line_count() {
            assert_relative_eq!(
                jacobian[(line, arity.load_out_slot(line))],
                1.0,
                max_relative = 1.0e-12
            );
            assert_relative_eq!(
                jacobian[(line, arity.load_in_slot(line))],
                -1.0,
                max_relative = 1.0e-12
            );
        }
    }

    #[test]
    fn registers_variables_in_layout_order() {
        let node = node(2, 1, 1);
        let specs = node.variables();
        assert_eq!(specs.len(), node.variable_count());
        let names: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "load0_out",
                "load1_out",
                "load2_out",
                "direction0",
                "direction1",
                "direction2",
                "load1_in",
                "load2_in",
                "force0_ext",
                "direction0_ext",
            ]
        );
        assert_eq!(specs[0].role, VariableRole::Unknown);
        assert_eq!(specs[3].unit, Unit::Radian);
    }
}
