//! Unit metadata attached to every registered variable.
//!
//! The solver works on plain `f64` values; the units declared here document
//! the physical meaning of each variable so an external driver can check its
//! wiring. The single conversion applied by the core is
//! [`PASCALS_PER_MEGAPASCAL`], used in the beam stress equation.

use serde::Serialize;
use std::fmt;

/// Conversion factor between pascals and megapascals.
///
/// Member stress is reported in megapascals while forces and areas stay in
/// base SI units, so the stress residual divides by this factor exactly once.
pub const PASCALS_PER_MEGAPASCAL: f64 = 1.0e6;

/// Physical unit of a registered variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Unit {
    /// Force in newtons.
    Newton,
    /// Area in square metres.
    SquareMetre,
    /// Stress in megapascals.
    Megapascal,
    /// Angle in radians.
    Radian,
}

impl Unit {
    /// Conventional symbol for the unit.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Newton => "N",
            Unit::SquareMetre => "m^2",
            Unit::Megapascal => "MPa",
            Unit::Radian => "rad",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How a variable participates in the equation system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VariableRole {
    /// Solved by the network; owns a slot in the global unknown vector.
    Unknown,
    /// Supplied from outside the entity, either as a fixed value or by a
    /// connection to another entity's unknown.
    Input,
}

/// Declaration of one named entity variable with its unit and role.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariableSpec {
    /// Variable name, unique within its entity.
    pub name: String,
    /// Declared physical unit.
    pub unit: Unit,
    /// Whether the variable is solved for or supplied.
    pub role: VariableRole,
}

impl VariableSpec {
    /// Create a variable declaration.
    pub fn new(name: impl Into<String>, unit: Unit, role: VariableRole) -> Self {
        Self {
            name: name.into(),
            unit,
            role,
        }
    }

    /// Return a copy of this declaration with the name qualified by an
    /// entity label, for network-level registration.
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            name: format!("{prefix}.{}", self.name),
            unit: self.unit,
            role: self.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_render_through_display() {
        assert_eq!(Unit::Newton.to_string(), "N");
        assert_eq!(Unit::SquareMetre.to_string(), "m^2");
        assert_eq!(Unit::Megapascal.to_string(), "MPa");
        assert_eq!(Unit::Radian.to_string(), "rad");
    }

    #[test]
    fn prefixing_qualifies_the_name_only() {
        let spec = VariableSpec::new("beam_force", Unit::Newton, VariableRole::Unknown);
        let qualified = spec.prefixed("member3");
        assert_eq!(qualified.name, "member3.beam_force");
        assert_eq!(qualified.unit, Unit::Newton);
        assert_eq!(qualified.role, VariableRole::Unknown);
    }
}
