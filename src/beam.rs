//! Axial truss member contributing force-balance and stress equations.

use nalgebra::DMatrix;

use crate::entity::ImplicitEquations;
use crate::units::{Unit, VariableRole, VariableSpec, PASCALS_PER_MEGAPASCAL};

/// Local slot of the force applied at the member's start.
pub(crate) const FORCE0: usize = 0;
/// Local slot of the force applied at the member's end.
pub(crate) const FORCE1: usize = 1;
/// Local slot of the cross-sectional area.
pub(crate) const AREA: usize = 2;
/// Local slot of the internal axial force unknown.
pub(crate) const BEAM_FORCE: usize = 3;
/// Local slot of the axial stress unknown.
pub(crate) const SIGMA: usize = 4;
/// Number of local variables.
const VARIABLES: usize = 5;

/// One truss member.
///
/// The member carries two equations: the forces applied at its ends must
/// balance, and its stress must equal the internal axial force divided by
/// the cross-sectional area (reported in megapascals). The area must be
/// strictly positive; the network rejects non-positive areas when the
/// member is attached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Beam {
    /// Cross-sectional area in square metres.
    area: f64,
}

impl Beam {
    /// Create a member with the given cross-sectional area in square metres.
    #[must_use]
    pub fn new(area: f64) -> Self {
        Self { area }
    }

    /// Cross-sectional area in square metres.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }
}

impl ImplicitEquations for Beam {
    fn variables(&self) -> Vec<VariableSpec> {
        vec![
            VariableSpec::new("force0", Unit::Newton, VariableRole::Input),
            VariableSpec::new("force1", Unit::Newton, VariableRole::Input),
            VariableSpec::new("A", Unit::SquareMetre, VariableRole::Input),
            VariableSpec::new("beam_force", Unit::Newton, VariableRole::Unknown),
            VariableSpec::new("sigma", Unit::Megapascal, VariableRole::Unknown),
        ]
    }

    fn equation_count(&self) -> usize {
        2
    }

    fn variable_count(&self) -> usize {
        VARIABLES
    }

    fn residual(&self, values: &[f64], out: &mut [f64]) {
        out[0] = values[FORCE0] - values[FORCE1];
        out[1] = values[SIGMA] - values[BEAM_FORCE] / (PASCALS_PER_MEGAPASCAL * values[AREA]);
    }

    fn jacobian(&self, values: &[f64], out: &mut DMatrix<f64>) {
        let area = values[AREA];
        out[(0, FORCE0)] = 1.0;
        out[(0, FORCE1)] = -1.0;
        out[(1, AREA)] = values[BEAM_FORCE] / (PASCALS_PER_MEGAPASCAL * area * area);
        out[(1, BEAM_FORCE)] = -1.0 / (PASCALS_PER_MEGAPASCAL * area);
        out[(1, SIGMA)] = 1.0;
    }

    fn solve_direct(&self, values: &mut [f64]) {
        values[SIGMA] = values[BEAM_FORCE] / (PASCALS_PER_MEGAPASCAL * values[AREA]);
    }
}
