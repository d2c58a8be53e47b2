//! End-to-end solve of a two-bar hanger.
//!
//! Two anchors sit on a wall; bars run down at thirty degrees from each to a
//! shared apex carrying a 100 N downward load. Symmetry puts 100 N of tension
//! in each bar, and the known reactions follow from resolving that tension at
//! the anchors.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_6};

use approx::assert_relative_eq;
use petgraph::graph::{EdgeIndex, NodeIndex};
use trussolve::{EquationNetwork, NewtonSolver, Node, NodeArity, SolverConfig};

const AREA: f64 = 1.0e-5;
const LOAD: f64 = 100.0;

struct Hanger {
    network: EquationNetwork,
    left: NodeIndex,
    right: NodeIndex,
    apex: NodeIndex,
    bar_left: EdgeIndex,
    bar_right: EdgeIndex,
}

fn two_bar_hanger() -> Hanger {
    let mut network = EquationNetwork::new();

    let anchor_arity = NodeArity::new(1, 2, 0);
    let left = network.add_joint(Node::new(anchor_arity).expect("valid arity"));
    let right = network.add_joint(Node::new(anchor_arity).expect("valid arity"));
    let apex = network.add_joint(Node::new(NodeArity::new(2, 0, 1)).expect("valid arity"));

    let bar_left = network
        .add_member(left, apex, AREA, 2, 0)
        .expect("line available");
    let bar_right = network
        .add_member(right, apex, AREA, 2, 1)
        .expect("line available");

    network.set_line_direction(left, 0, 0.0).expect("line exists");
    network
        .set_line_direction(left, 1, FRAC_PI_2)
        .expect("line exists");
    network
        .set_line_direction(left, 2, -FRAC_PI_6)
        .expect("line exists");
    network.set_line_direction(right, 0, 0.0).expect("line exists");
    network
        .set_line_direction(right, 1, FRAC_PI_2)
        .expect("line exists");
    network
        .set_line_direction(right, 2, -5.0 * FRAC_PI_6)
        .expect("line exists");
    network
        .set_line_direction(apex, 0, 5.0 * FRAC_PI_6)
        .expect("line exists");
    network
        .set_line_direction(apex, 1, FRAC_PI_6)
        .expect("line exists");
    network
        .set_external_force(apex, 0, LOAD, -FRAC_PI_2)
        .expect("force exists");

    Hanger {
        network,
        left,
        right,
        apex,
        bar_left,
        bar_right,
    }
}

#[test]
fn both_bars_carry_the_full_load() {
    let mut hanger = two_bar_hanger();
    hanger
        .network
        .solve(&SolverConfig::default())
        .expect("solve converges");

    let force_left = hanger
        .network
        .member_force(hanger.bar_left)
        .expect("member exists");
    let force_right = hanger
        .network
        .member_force(hanger.bar_right)
        .expect("member exists");
    assert_relative_eq!(force_left, LOAD, max_relative = 1.0e-9);
    assert_relative_eq!(force_right, LOAD, max_relative = 1.0e-9);

    // sigma = beam_force / (1e6 * A) with A = 1e-5 m^2.
    let stress = hanger
        .network
        .member_stress(hanger.bar_left)
        .expect("member exists");
    assert_relative_eq!(stress, 10.0, max_relative = 1.0e-9);
}

#[test]
fn anchor_reactions_balance_the_bar_tension() {
    let mut hanger = two_bar_hanger();
    hanger
        .network
        .solve(&SolverConfig::default())
        .expect("solve converges");

    let left = hanger
        .network
        .joint_load_out(hanger.left)
        .expect("joint exists");
    // Horizontal reaction opposes the bar's pull; vertical carries half the
    // hung load; the bar line itself reports the member force.
    assert_relative_eq!(left[0], -LOAD * FRAC_PI_6.cos(), max_relative = 1.0e-9);
    assert_relative_eq!(left[1], LOAD / 2.0, max_relative = 1.0e-9);
    assert_relative_eq!(left[2], LOAD, max_relative = 1.0e-9);

    let right = hanger
        .network
        .joint_load_out(hanger.right)
        .expect("joint exists");
    assert_relative_eq!(right[0], LOAD * FRAC_PI_6.cos(), max_relative = 1.0e-9);
    assert_relative_eq!(right[1], LOAD / 2.0, max_relative = 1.0e-9);

    let apex = hanger
        .network
        .joint_load_out(hanger.apex)
        .expect("joint exists");
    assert_relative_eq!(apex[0], LOAD, max_relative = 1.0e-9);
    assert_relative_eq!(apex[1], LOAD, max_relative = 1.0e-9);
}

#[test]
fn linear_configuration_converges_in_one_newton_step() {
    let mut hanger = two_bar_hanger();
    let summary = hanger
        .network
        .solve(&SolverConfig::default())
        .expect("solve converges");

    // Directions and areas are held fixed, so the assembled residual is
    // linear in the unknowns and a single step lands on the root.
    assert_eq!(summary.iterations, 1);
    assert!(summary.residual_norm <= 1.0e-10);
    assert_eq!(summary.residual_history.len(), 2);
}

#[test]
fn resolving_a_cached_network_reuses_the_stored_summary() {
    let mut hanger = two_bar_hanger();
    let first = hanger
        .network
        .solve(&SolverConfig::default())
        .expect("solve converges");
    let second = hanger
        .network
        .solve(&SolverConfig::default())
        .expect("cached result returned");
    assert_eq!(first, second);
}

#[test]
fn converged_state_is_a_fixed_point_of_the_iteration() {
    let hanger = two_bar_hanger();
    let system = hanger.network.assemble().expect("system is square");
    let solver = NewtonSolver::new(SolverConfig::default());

    let mut x = system.initial_guess();
    solver.solve(&system, &mut x).expect("solve converges");
    let again = solver
        .solve(&system, &mut x)
        .expect("fixed point is stable");
    assert_eq!(again.iterations, 0);
}

#[test]
fn editing_after_a_solve_forces_a_fresh_solution() {
    let mut hanger = two_bar_hanger();
    hanger
        .network
        .solve(&SolverConfig::default())
        .expect("solve converges");

    // Doubling the hung load doubles every member force.
    hanger
        .network
        .set_external_force(hanger.apex, 0, 2.0 * LOAD, -FRAC_PI_2)
        .expect("force exists");
    assert!(hanger.network.summary().is_none());

    hanger
        .network
        .solve(&SolverConfig::default())
        .expect("solve converges");
    let force = hanger
        .network
        .member_force(hanger.bar_left)
        .expect("member exists");
    assert_relative_eq!(force, 2.0 * LOAD, max_relative = 1.0e-9);
}
