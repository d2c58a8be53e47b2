//! Command-line demonstration: two bars hanging a 100 N load.

use std::error::Error;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_6};

use trussolve::{
    render_report, EquationNetwork, EquilibriumReport, Node, NodeArity, SolverConfig,
};

/// Build the two-bar hanger: two wall anchors at the top, one loaded apex
/// below, bars at thirty degrees from horizontal.
fn two_bar_hanger() -> Result<EquationNetwork, Box<dyn Error>> {
    let mut network = EquationNetwork::new();

    let left = network.add_joint(Node::new(NodeArity::new(1, 2, 0))?);
    let right = network.add_joint(Node::new(NodeArity::new(1, 2, 0))?);
    let apex = network.add_joint(Node::new(NodeArity::new(2, 0, 1))?);

    let area = 1.0e-5;
    network.add_member(left, apex, area, 2, 0)?;
    network.add_member(right, apex, area, 2, 1)?;

    network.set_line_direction(left, 0, 0.0)?;
    network.set_line_direction(left, 1, FRAC_PI_2)?;
    network.set_line_direction(left, 2, -FRAC_PI_6)?;
    network.set_line_direction(right, 0, 0.0)?;
    network.set_line_direction(right, 1, FRAC_PI_2)?;
    network.set_line_direction(right, 2, -5.0 * FRAC_PI_6)?;
    network.set_line_direction(apex, 0, 5.0 * FRAC_PI_6)?;
    network.set_line_direction(apex, 1, FRAC_PI_6)?;
    network.set_external_force(apex, 0, 100.0, -FRAC_PI_2)?;

    Ok(network)
}

fn main() -> Result<(), Box<dyn Error>> {
    let json = std::env::args().any(|argument| argument == "--json");

    let mut network = two_bar_hanger()?;
    network.solve(&SolverConfig::default())?;

    let report =
        EquilibriumReport::from_network(&network).ok_or("solved network has no results")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}
