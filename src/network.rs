//! The equation network: truss topology, assembly and the equilibrium solve.
//!
//! Joints and members live in a graph; a member attached between two joints
//! declares which load line it occupies at each end. Attachment implies the
//! value-sharing relations of the truss: the member's end forces alias the
//! joints' load-line outputs, and a joint's feed-in aliases the member's
//! internal force wherever the line carries one. The relations are resolved
//! into global slot indices at assembly time; no entity holds a pointer to
//! another.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};

use crate::beam::Beam;
use crate::entity::ImplicitEquations;
use crate::errors::{NetworkEditError, SolveError};
use crate::node::Node;
use crate::solver::{NewtonSolver, ResidualSystem, SolveSummary, SolverConfig};
use crate::units::VariableSpec;

/// Graph payload for one joint.
#[derive(Clone, Debug)]
struct JointEntry {
    /// The joint's equation entity.
    node: Node,
    /// Member occupying each load line, if any.
    lines: Vec<Option<EdgeIndex>>,
    /// Solved load-line outputs in newtons.
    load_out: Vec<f64>,
}

impl JointEntry {
    /// Wrap a joint with empty occupancy and zeroed results.
    fn new(node: Node) -> Self {
        let lines = node.arity().line_count();
        Self {
            node,
            lines: vec![None; lines],
            load_out: vec![0.0; lines],
        }
    }
}

/// Graph payload for one member.
#[derive(Clone, Debug)]
struct MemberEntry {
    /// The member's equation entity.
    beam: Beam,
    /// Load line occupied at the start joint.
    start_line: usize,
    /// Load line occupied at the end joint.
    end_line: usize,
    /// Solved internal axial force in newtons.
    beam_force: f64,
    /// Solved axial stress in megapascals.
    sigma: f64,
}

/// Tag identifying which entity a block of equations belongs to.
#[derive(Clone, Copy, Debug)]
enum EntityKey {
    /// Equations contributed by a joint.
    Joint(NodeIndex),
    /// Equations contributed by a member.
    Member(EdgeIndex),
}

/// Resolution of one local variable.
#[derive(Clone, Copy, Debug)]
enum Binding {
    /// Aliased to a slot of the global unknown vector.
    Slot(usize),
    /// Held at a fixed configured value.
    Fixed(f64),
}

/// One entity's share of the global system.
#[derive(Clone, Debug)]
struct Block {
    /// Owning entity.
    key: EntityKey,
    /// First global equation row.
    eq_offset: usize,
    /// Number of equation rows.
    eq_count: usize,
    /// Resolution of each local variable, in local slot order.
    bindings: Vec<Binding>,
}

/// Slot map for the assembled system.
#[derive(Clone, Debug)]
struct Layout {
    /// Number of global unknowns (and equations).
    dimension: usize,
    /// First `load_out` slot of each joint.
    joint_base: HashMap<NodeIndex, usize>,
    /// `beam_force` slot of each member; `sigma` follows it.
    member_base: HashMap<EdgeIndex, usize>,
    /// Per-entity equation blocks.
    blocks: Vec<Block>,
}

/// A pin-jointed truss expressed as a network of implicit equations.
#[derive(Debug, Default)]
pub struct EquationNetwork {
    /// Underlying graph storage for joints and members.
    graph: Graph<JointEntry, MemberEntry>,
    /// Summary of the last solve and the configuration it ran under,
    /// cleared by any edit.
    summary: Option<(SolverConfig, SolveSummary)>,
}

impl EquationNetwork {
    /// Create an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            summary: None,
        }
    }

    /// Return the number of joints in the network.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of members in the network.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over all joint indices.
    pub fn joint_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Iterate over all member indices.
    pub fn member_indices(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    /// Add a joint to the network.
    pub fn add_joint(&mut self, node: Node) -> NodeIndex {
        self.invalidate();
        self.graph.add_node(JointEntry::new(node))
    }

    /// Remove a joint and every member attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownJoint`] when `joint` is not part of
    /// this network.
    pub fn remove_joint(&mut self, joint: NodeIndex) -> Result<(), NetworkEditError> {
        if self.graph.node_weight(joint).is_none() {
            return Err(NetworkEditError::UnknownJoint(joint));
        }
        self.invalidate();
        self.graph.remove_node(joint);
        self.rebuild_line_occupancy();
        Ok(())
    }

    /// Attach a member between two joints.
    ///
    /// `start_line` and `end_line` pick the load line the member occupies at
    /// each joint; the member's end forces alias those lines' outputs and
    /// the lines' feed-ins alias the member's internal force.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownJoint`] for a missing joint,
    /// [`NetworkEditError::NonPositiveArea`] for a degenerate cross-section,
    /// and a line error when the chosen load line is missing, reserved for a
    /// reaction, or already occupied.
    pub fn add_member(
        &mut self,
        start: NodeIndex,
        end: NodeIndex,
        area: f64,
        start_line: usize,
        end_line: usize,
    ) -> Result<EdgeIndex, NetworkEditError> {
        if self.graph.node_weight(start).is_none() {
            return Err(NetworkEditError::UnknownJoint(start));
        }
        if self.graph.node_weight(end).is_none() {
            return Err(NetworkEditError::UnknownJoint(end));
        }
        if area <= 0.0 {
            return Err(NetworkEditError::NonPositiveArea { area });
        }
        self.check_attachable_line(start, start_line)?;
        self.check_attachable_line(end, end_line)?;
        if start == end && start_line == end_line {
            return Err(NetworkEditError::LineOccupied {
                joint: start,
                line: start_line,
            });
        }

        self.invalidate();
        let member = self.graph.add_edge(
            start,
            end,
            MemberEntry {
                beam: Beam::new(area),
                start_line,
                end_line,
                beam_force: 0.0,
                sigma: 0.0,
            },
        );
        self.graph[start].lines[start_line] = Some(member);
        self.graph[end].lines[end_line] = Some(member);
        Ok(member)
    }

    /// Remove a member from the network.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownMember`] when `member` is not part
    /// of this network.
    pub fn remove_member(&mut self, member: EdgeIndex) -> Result<(), NetworkEditError> {
        if self.graph.edge_weight(member).is_none() {
            return Err(NetworkEditError::UnknownMember(member));
        }
        self.invalidate();
        self.graph.remove_edge(member);
        self.rebuild_line_occupancy();
        Ok(())
    }

    /// Set the direction of a load line in radians.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownJoint`] or
    /// [`NetworkEditError::LineOutOfRange`] for invalid indices.
    pub fn set_line_direction(
        &mut self,
        joint: NodeIndex,
        line: usize,
        angle: f64,
    ) -> Result<(), NetworkEditError> {
        let entry = self
            .graph
            .node_weight(joint)
            .ok_or(NetworkEditError::UnknownJoint(joint))?;
        let lines = entry.node.arity().line_count();
        if line >= lines {
            return Err(NetworkEditError::LineOutOfRange { joint, line, lines });
        }
        self.invalidate();
        self.graph[joint].node.directions[line] = angle;
        Ok(())
    }

    /// Set the constraint value fed into an unconnected load line, in
    /// newtons.
    ///
    /// The value is ignored while a member occupies the line, since the
    /// member's internal force takes its place.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownJoint`],
    /// [`NetworkEditError::LineOutOfRange`] or
    /// [`NetworkEditError::ReservedLine`] for invalid indices.
    pub fn set_feed_in(
        &mut self,
        joint: NodeIndex,
        line: usize,
        value: f64,
    ) -> Result<(), NetworkEditError> {
        self.check_feed_in_line(joint, line)?;
        self.invalidate();
        let first = self.graph[joint].node.arity().first_feed_in();
        self.graph[joint].node.feed_in[line - first] = value;
        Ok(())
    }

    /// Set a known external force on a joint: magnitude in newtons and
    /// direction in radians.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownJoint`] or
    /// [`NetworkEditError::ExternalForceOutOfRange`] for invalid indices.
    pub fn set_external_force(
        &mut self,
        joint: NodeIndex,
        index: usize,
        magnitude: f64,
        angle: f64,
    ) -> Result<(), NetworkEditError> {
        let entry = self
            .graph
            .node_weight(joint)
            .ok_or(NetworkEditError::UnknownJoint(joint))?;
        let count = entry.node.arity().n_external_forces;
        if index >= count {
            return Err(NetworkEditError::ExternalForceOutOfRange {
                joint,
                index,
                count,
            });
        }
        self.invalidate();
        let node = &mut self.graph[joint].node;
        node.external_forces[index] = magnitude;
        node.external_directions[index] = angle;
        Ok(())
    }

    /// Retrieve the cross-sectional area of a member, in square metres.
    #[must_use]
    pub fn member_area(&self, member: EdgeIndex) -> Option<f64> {
        self.graph.edge_weight(member).map(|entry| entry.beam.area())
    }

    /// Retrieve the solved internal force of a member, in newtons.
    #[must_use]
    pub fn member_force(&self, member: EdgeIndex) -> Option<f64> {
        self.graph.edge_weight(member).map(|entry| entry.beam_force)
    }

    /// Retrieve the solved axial stress of a member, in megapascals.
    #[must_use]
    pub fn member_stress(&self, member: EdgeIndex) -> Option<f64> {
        self.graph.edge_weight(member).map(|entry| entry.sigma)
    }

    /// Retrieve the solved load-line outputs of a joint, in newtons.
    #[must_use]
    pub fn joint_load_out(&self, joint: NodeIndex) -> Option<&[f64]> {
        self.graph
            .node_weight(joint)
            .map(|entry| entry.load_out.as_slice())
    }

    /// Summary of the last solve, if results are current.
    #[must_use]
    pub fn summary(&self) -> Option<&SolveSummary> {
        self.summary.as_ref().map(|(_, summary)| summary)
    }

    /// Register every entity variable with its declared unit and role,
    /// names qualified by the owning joint or member.
    #[must_use]
    pub fn variables(&self) -> Vec<VariableSpec> {
        let mut specs = Vec::new();
        for joint in self.graph.node_indices() {
            let prefix = format!("joint{}", joint.index());
            for spec in self.graph[joint].node.variables() {
                specs.push(spec.prefixed(&prefix));
            }
        }
        for member in self.graph.edge_indices() {
            let prefix = format!("member{}", member.index());
            for spec in self.graph[member].beam.variables() {
                specs.push(spec.prefixed(&prefix));
            }
        }
        specs
    }

    /// Resolve connections and slot indices into an assembled system ready
    /// for the Newton driver.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::UnbalancedSystem`] when the equation and
    /// unknown counts differ.
    pub fn assemble(&self) -> Result<AssembledSystem<'_>, SolveError> {
        let layout = self.layout()?;
        Ok(AssembledSystem {
            network: self,
            layout,
        })
    }

    /// Solve the network to equilibrium and store the results.
    ///
    /// Results are cached per configuration; editing the network or solving
    /// with a different configuration triggers a fresh solve. All unknowns
    /// are seeded at 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError`] when the system is unbalanced, produces
    /// non-finite values, cannot be factorized, or fails to converge.
    pub fn solve(&mut self, config: &SolverConfig) -> Result<SolveSummary, SolveError> {
        if let Some((cached_config, summary)) = &self.summary {
            if cached_config == config {
                return Ok(summary.clone());
            }
        }
        let (summary, x, layout) = {
            let system = self.assemble()?;
            let mut x = system.initial_guess();
            let summary = NewtonSolver::new(*config).solve(&system, &mut x)?;
            let AssembledSystem { layout, .. } = system;
            (summary, x, layout)
        };
        self.store_results(&layout, &x);
        self.summary = Some((*config, summary.clone()));
        Ok(summary)
    }

    /// Reject member attachment to a missing, reserved or occupied line.
    fn check_attachable_line(
        &self,
        joint: NodeIndex,
        line: usize,
    ) -> Result<(), NetworkEditError> {
        self.check_feed_in_line(joint, line)?;
        if self.graph[joint].lines[line].is_some() {
            return Err(NetworkEditError::LineOccupied { joint, line });
        }
        Ok(())
    }

    /// Reject line indices that do not carry a feed-in.
    fn check_feed_in_line(&self, joint: NodeIndex, line: usize) -> Result<(), NetworkEditError> {
        let entry = self
            .graph
            .node_weight(joint)
            .ok_or(NetworkEditError::UnknownJoint(joint))?;
        let arity = entry.node.arity();
        let lines = arity.line_count();
        if line >= lines {
            return Err(NetworkEditError::LineOutOfRange { joint, line, lines });
        }
        if line < arity.first_feed_in() {
            return Err(NetworkEditError::ReservedLine { joint, line });
        }
        Ok(())
    }

    /// Reset cached results when the topology or configuration changes.
    fn invalidate(&mut self) {
        if self.summary.is_some() {
            self.summary = None;
            for entry in self.graph.node_weights_mut() {
                entry.load_out.iter_mut().for_each(|value| *value = 0.0);
            }
            for entry in self.graph.edge_weights_mut() {
                entry.beam_force = 0.0;
                entry.sigma = 0.0;
            }
        }
    }

    /// Recompute line occupancy from scratch after a removal, since
    /// `petgraph` renumbers indices on removal.
    fn rebuild_line_occupancy(&mut self) {
        for entry in self.graph.node_weights_mut() {
            entry.lines.iter_mut().for_each(|line| *line = None);
        }
        let members: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for member in members {
            let (start, end) = self.graph.edge_endpoints(member).expect("valid member");
            let (start_line, end_line) = {
                let entry = &self.graph[member];
                (entry.start_line, entry.end_line)
            };
            self.graph[start].lines[start_line] = Some(member);
            self.graph[end].lines[end_line] = Some(member);
        }
    }

    /// Assign global slots and resolve every local variable to a slot or a
    /// fixed value.
    fn layout(&self) -> Result<Layout, SolveError> {
        let mut joint_base = HashMap::new();
        let mut unknowns = 0;
        let mut equations = 0;
        for joint in self.graph.node_indices() {
            joint_base.insert(joint, unknowns);
            let node = &self.graph[joint].node;
            unknowns += node.arity().line_count();
            equations += node.equation_count();
        }
        let mut member_base = HashMap::new();
        for member in self.graph.edge_indices() {
            member_base.insert(member, unknowns);
            unknowns += 2;
            equations += 2;
        }
        if equations != unknowns {
            return Err(SolveError::UnbalancedSystem {
                equations,
                unknowns,
            });
        }

        let mut blocks = Vec::new();
        let mut eq_offset = 0;
        for joint in self.graph.node_indices() {
            let entry = &self.graph[joint];
            let node = &entry.node;
            let arity = node.arity();
            let base = joint_base[&joint];

            let mut bindings = Vec::with_capacity(node.variable_count());
            for line in 0..arity.line_count() {
                bindings.push(Binding::Slot(base + line));
            }
            for line in 0..arity.line_count() {
                bindings.push(Binding::Fixed(node.direction(line)));
            }
            for line in arity.first_feed_in()..arity.line_count() {
                match entry.lines[line] {
                    Some(member) => bindings.push(Binding::Slot(member_base[&member])),
                    None => bindings.push(Binding::Fixed(node.feed_in_value(line))),
                }
            }
            for index in 0..arity.n_external_forces {
                bindings.push(Binding::Fixed(node.external_forces[index]));
                bindings.push(Binding::Fixed(node.external_directions[index]));
            }

            let eq_count = node.equation_count();
            blocks.push(Block {
                key: EntityKey::Joint(joint),
                eq_offset,
                eq_count,
                bindings,
            });
            eq_offset += eq_count;
        }
        for member in self.graph.edge_indices() {
            let entry = &self.graph[member];
            let (start, end) = self.graph.edge_endpoints(member).expect("valid member");
            let base = member_base[&member];
            let bindings = vec![
                Binding::Slot(joint_base[&start] + entry.start_line),
                Binding::Slot(joint_base[&end] + entry.end_line),
                Binding::Fixed(entry.beam.area()),
                Binding::Slot(base),
                Binding::Slot(base + 1),
            ];
            blocks.push(Block {
                key: EntityKey::Member(member),
                eq_offset,
                eq_count: 2,
                bindings,
            });
            eq_offset += 2;
        }

        Ok(Layout {
            dimension: unknowns,
            joint_base,
            member_base,
            blocks,
        })
    }

    /// Persist solved unknowns back into the graph entries.
    fn store_results(&mut self, layout: &Layout, x: &DVector<f64>) {
        let joints: Vec<NodeIndex> = self.graph.node_indices().collect();
        for joint in joints {
            let base = layout.joint_base[&joint];
            let entry = self.graph.node_weight_mut(joint).expect("valid joint");
            for (line, value) in entry.load_out.iter_mut().enumerate() {
                *value = x[base + line];
            }
        }
        let members: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for member in members {
            let base = layout.member_base[&member];
            let entry = self.graph.edge_weight_mut(member).expect("valid member");
            entry.beam_force = x[base];
            entry.sigma = x[base + 1];
        }
    }
}

/// Connection-resolved view of a network, ready for Newton iteration.
///
/// The view borrows the network immutably; entities are read-only
/// evaluators against snapshots of the unknown vector.
#[derive(Debug)]
pub struct AssembledSystem<'a> {
    /// Source network.
    network: &'a EquationNetwork,
    /// Slot map resolved at assembly time.
    layout: Layout,
}

impl AssembledSystem<'_> {
    /// Initial iterate with every unknown seeded at 1.0.
    #[must_use]
    pub fn initial_guess(&self) -> DVector<f64> {
        DVector::from_element(self.layout.dimension, 1.0)
    }

    /// Look up the entity behind a block.
    fn entity(&self, key: EntityKey) -> &dyn ImplicitEquations {
        match key {
            EntityKey::Joint(joint) => &self.network.graph[joint].node,
            EntityKey::Member(member) => &self.network.graph[member].beam,
        }
    }

    /// Gather a block's local values from the global vector and its fixed
    /// inputs.
    fn gather(&self, block: &Block, x: &DVector<f64>) -> Vec<f64> {
        block
            .bindings
            .iter()
            .map(|binding| match binding {
                Binding::Slot(slot) => x[*slot],
                Binding::Fixed(value) => *value,
            })
            .collect()
    }
}

impl ResidualSystem for AssembledSystem<'_> {
    fn dimension(&self) -> usize {
        self.layout.dimension
    }

    fn residual(&self, x: &DVector<f64>, residual: &mut DVector<f64>) {
        for block in &self.layout.blocks {
            let locals = self.gather(block, x);
            let entity = self.entity(block.key);
            let rows = block.eq_offset..block.eq_offset + block.eq_count;
            entity.residual(&locals, &mut residual.as_mut_slice()[rows]);
        }
    }

    fn jacobian(&self, x: &DVector<f64>, jacobian: &mut DMatrix<f64>) {
        for block in &self.layout.blocks {
            let locals = self.gather(block, x);
            let entity = self.entity(block.key);
            let mut local_block = DMatrix::zeros(block.eq_count, block.bindings.len());
            entity.jacobian(&locals, &mut local_block);
            for (column, binding) in block.bindings.iter().enumerate() {
                if let Binding::Slot(slot) = binding {
                    for row in 0..block.eq_count {
                        jacobian[(block.eq_offset + row, *slot)] += local_block[(row, column)];
                    }
                }
            }
        }
    }

    fn relax(&self, x: &mut DVector<f64>) {
        for block in &self.layout.blocks {
            let mut locals = self.gather(block, x);
            self.entity(block.key).solve_direct(&mut locals);
            for (column, binding) in block.bindings.iter().enumerate() {
                if let Binding::Slot(slot) = binding {
                    x[*slot] = locals[column];
                }
            }
        }
    }
}
