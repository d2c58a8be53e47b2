#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

mod beam;
mod diff;
mod entity;
mod errors;
mod network;
mod node;
mod report;
mod solver;
mod units;

pub use beam::Beam;
pub use diff::{complex_step_jacobian, COMPLEX_STEP};
pub use entity::ImplicitEquations;
pub use errors::{ArityError, NetworkEditError, SolveError};
pub use network::{AssembledSystem, EquationNetwork};
pub use node::{Node, NodeArity};
pub use report::{render_report, EquilibriumReport, JointResult, MemberResult};
pub use solver::{NewtonSolver, ResidualSystem, SolveSummary, SolverConfig};
pub use units::{Unit, VariableRole, VariableSpec, PASCALS_PER_MEGAPASCAL};
