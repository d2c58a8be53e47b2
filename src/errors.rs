//! Error types produced while building or solving equilibrium networks.

use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;

/// Error returned when a [`Node`](crate::Node) is configured with an
/// inconsistent arity.
///
/// Load-line counts are unsigned, so negative configurations are rejected by
/// the type system; the remaining inconsistency is a pass-through line with
/// no feed-in to chain to.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ArityError {
    /// Returned when load lines beyond the two primary directions exist but
    /// some of them fall on reaction lines, which carry no feed-in.
    #[error(
        "{n_reactions} reactions with {n_loads} loads leave pass-through lines without a feed-in \
         (at most two reactions are allowed when extra load lines exist)"
    )]
    MissingFeedIn {
        /// Configured number of loads.
        n_loads: usize,
        /// Configured number of reactions.
        n_reactions: usize,
    },
}

/// Error returned when editing an [`EquationNetwork`](crate::EquationNetwork)
/// with invalid indices or values.
#[derive(Debug, Error, PartialEq)]
pub enum NetworkEditError {
    /// Returned when a joint cannot be found in the network.
    #[error("joint {0:?} does not exist in this network")]
    UnknownJoint(NodeIndex),
    /// Returned when a member cannot be found in the network.
    #[error("member {0:?} does not exist in this network")]
    UnknownMember(EdgeIndex),
    /// Returned when a member cross-sectional area is zero or negative.
    #[error("member area must be positive (received {area})")]
    NonPositiveArea {
        /// Rejected cross-sectional area in square metres.
        area: f64,
    },
    /// Returned when a load-line index exceeds the joint's line count.
    #[error("load line {line} is out of range for joint {joint:?} ({lines} lines)")]
    LineOutOfRange {
        /// Joint being edited.
        joint: NodeIndex,
        /// Offending line index.
        line: usize,
        /// Number of load lines the joint owns.
        lines: usize,
    },
    /// Returned when a member or feed-in targets a reaction line.
    #[error("load line {line} on joint {joint:?} is reserved for a reaction")]
    ReservedLine {
        /// Joint being edited.
        joint: NodeIndex,
        /// Offending line index.
        line: usize,
    },
    /// Returned when a member is attached to a line already feeding another
    /// member.
    #[error("load line {line} on joint {joint:?} is already occupied")]
    LineOccupied {
        /// Joint being edited.
        joint: NodeIndex,
        /// Offending line index.
        line: usize,
    },
    /// Returned when an external-force index exceeds the configured count.
    #[error("external force {index} is out of range for joint {joint:?} ({count} declared)")]
    ExternalForceOutOfRange {
        /// Joint being edited.
        joint: NodeIndex,
        /// Offending external-force index.
        index: usize,
        /// Number of external forces the joint declares.
        count: usize,
    },
}

/// Error returned when an equilibrium solve fails.
#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    /// Returned when the assembled system is not square.
    #[error("system is not square: {equations} equations for {unknowns} unknowns")]
    UnbalancedSystem {
        /// Number of assembled equations.
        equations: usize,
        /// Number of global unknowns.
        unknowns: usize,
    },
    /// Returned when a residual entry evaluates to NaN or infinity.
    #[error("residual for equation {equation} is not finite")]
    NonFiniteResidual {
        /// Global index of the offending equation.
        equation: usize,
    },
    /// Returned when a Jacobian entry evaluates to NaN or infinity.
    #[error("jacobian entry for equation {equation}, unknown {variable} is not finite")]
    NonFiniteJacobian {
        /// Global row of the offending entry.
        equation: usize,
        /// Global column of the offending entry.
        variable: usize,
    },
    /// Returned when the global Jacobian cannot be factorized.
    #[error("jacobian is singular; check connectivity, directions and reactions")]
    SingularJacobian,
    /// Returned when the iteration cap is reached without convergence.
    #[error("solver exceeded {iterations} iterations (residual norm {residual_norm:.3e})")]
    Diverged {
        /// Number of Newton steps taken before giving up.
        iterations: usize,
        /// Residual norm at the final iterate.
        residual_norm: f64,
    },
}
