//! Snapshot and rendering of solved equilibrium results.

use std::fmt::Write;

use serde::Serialize;

use crate::network::EquationNetwork;
use crate::solver::SolveSummary;

/// Solved state of one member.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberResult {
    /// Member index within the network.
    pub index: usize,
    /// Cross-sectional area in square metres.
    pub area: f64,
    /// Internal axial force in newtons.
    pub force: f64,
    /// Axial stress in megapascals.
    pub stress: f64,
}

/// Solved state of one joint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JointResult {
    /// Joint index within the network.
    pub index: usize,
    /// Solved load-line outputs in newtons, in line order.
    pub load_out: Vec<f64>,
}

/// Full snapshot of a solved network, suitable for rendering or
/// serialization.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EquilibriumReport {
    /// Per-joint results in index order.
    pub joints: Vec<JointResult>,
    /// Per-member results in index order.
    pub members: Vec<MemberResult>,
    /// Convergence record of the solve.
    pub summary: SolveSummary,
}

impl EquilibriumReport {
    /// Capture the solved state of a network.
    ///
    /// Returns `None` while the network has no current results, either
    /// because it was never solved or because an edit invalidated them.
    #[must_use]
    pub fn from_network(network: &EquationNetwork) -> Option<Self> {
        let summary = network.summary()?.clone();
        let joints = network
            .joint_indices()
            .map(|joint| JointResult {
                index: joint.index(),
                load_out: network
                    .joint_load_out(joint)
                    .map(<[f64]>::to_vec)
                    .unwrap_or_default(),
            })
            .collect();
        let members = network
            .member_indices()
            .map(|member| MemberResult {
                index: member.index(),
                area: network.member_area(member).unwrap_or_default(),
                force: network.member_force(member).unwrap_or_default(),
                stress: network.member_stress(member).unwrap_or_default(),
            })
            .collect();
        Some(Self {
            joints,
            members,
            summary,
        })
    }
}

/// Render a textual summary of a solved network.
#[must_use]
pub fn render_report(report: &EquilibriumReport) -> String {
    let mut output = String::new();

    writeln!(
        &mut output,
        "Equilibrium reached after {} Newton iteration(s), residual norm {:.3e}",
        report.summary.iterations, report.summary.residual_norm
    )
    .expect("writing to string cannot fail");

    for member in &report.members {
        writeln!(
            &mut output,
            "Member {}: axial force = {:+.3} N, stress = {:+.3} MPa (A = {:.3e} m^2)",
            member.index, member.force, member.stress, member.area
        )
        .expect("writing to string cannot fail");
    }

    for joint in &report.joints {
        // Scientific notation keeps near-zero reaction components readable.
        let loads: Vec<String> = joint
            .load_out
            .iter()
            .map(|load| format!("{load:+.3e}"))
            .collect();
        writeln!(
            &mut output,
            "Joint {}: load lines [{}] N",
            joint.index,
            loads.join(", ")
        )
        .expect("writing to string cannot fail");
    }

    output
}
