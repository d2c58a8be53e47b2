//! Newton driver for assembled residual systems.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::errors::SolveError;

/// Configuration for the Newton iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverConfig {
    /// Iteration cap; exceeding it reports [`SolveError::Diverged`].
    pub max_iterations: usize,
    /// Convergence tolerance on the residual 2-norm.
    pub tolerance: f64,
    /// Number of fixed-point relaxation sweeps run before each Newton
    /// linearization. Each sweep re-evaluates the closed-form updates of
    /// every sub-block while the rest of the state is held fixed.
    pub relaxation_sweeps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1.0e-10,
            relaxation_sweeps: 1,
        }
    }
}

/// A square residual system the Newton driver can iterate on.
///
/// The network's assembled form implements this; standalone systems can too,
/// which keeps the driver testable in isolation.
pub trait ResidualSystem {
    /// Number of unknowns, equal to the number of equations.
    fn dimension(&self) -> usize;

    /// Evaluate the residual vector at `x`, writing every entry.
    fn residual(&self, x: &DVector<f64>, residual: &mut DVector<f64>);

    /// Accumulate the Jacobian at `x` into `jacobian`, which the caller
    /// supplies zeroed.
    fn jacobian(&self, x: &DVector<f64>, jacobian: &mut DMatrix<f64>);

    /// Apply one fixed-point relaxation sweep to `x`. The default does
    /// nothing.
    fn relax(&self, _x: &mut DVector<f64>) {}
}

/// Outcome of a converged solve.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolveSummary {
    /// Number of Newton steps applied before convergence.
    pub iterations: usize,
    /// Residual norm at the converged iterate.
    pub residual_norm: f64,
    /// Residual norm recorded at every iterate, starting with the initial
    /// guess.
    pub residual_history: Vec<f64>,
}

/// Newton iteration over a [`ResidualSystem`].
///
/// Each iteration runs the configured relaxation sweeps, assembles the
/// residual and Jacobian, solves `J * dx = -r` by LU factorization and
/// applies the step. A running solve either converges, fails, or hits the
/// iteration cap; there is no partial result.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewtonSolver {
    /// Iteration parameters.
    config: SolverConfig,
}

impl NewtonSolver {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Drive `x` to a root of the system's residual.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::NonFiniteResidual`] or
    /// [`SolveError::NonFiniteJacobian`] when an evaluation produces NaN or
    /// infinity, [`SolveError::SingularJacobian`] when the factorization
    /// fails, and [`SolveError::Diverged`] when the iteration cap is reached
    /// with the residual still above tolerance.
    pub fn solve<S: ResidualSystem>(
        &self,
        system: &S,
        x: &mut DVector<f64>,
    ) -> Result<SolveSummary, SolveError> {
        let dimension = system.dimension();
        let mut residual = DVector::zeros(dimension);
        let mut jacobian = DMatrix::zeros(dimension, dimension);
        let mut history = Vec::new();
        let mut norm = f64::INFINITY;

        for iteration in 0..=self.config.max_iterations {
            for _ in 0..self.config.relaxation_sweeps {
                system.relax(x);
            }

            system.residual(x, &mut residual);
            if let Some(equation) = residual.iter().position(|value| !value.is_finite()) {
                return Err(SolveError::NonFiniteResidual { equation });
            }
            norm = residual.norm();
            history.push(norm);
            if norm <= self.config.tolerance {
                return Ok(SolveSummary {
                    iterations: iteration,
                    residual_norm: norm,
                    residual_history: history,
                });
            }
            if iteration == self.config.max_iterations {
                break;
            }

            jacobian.fill(0.0);
            system.jacobian(x, &mut jacobian);
            if let Some(index) = jacobian.iter().position(|value| !value.is_finite()) {
                return Err(SolveError::NonFiniteJacobian {
                    equation: index % dimension,
                    variable: index / dimension,
                });
            }

            let step = jacobian
                .clone()
                .lu()
                .solve(&(-&residual))
                .ok_or(SolveError::SingularJacobian)?;
            *x += step;
        }

        Err(SolveError::Diverged {
            iterations: self.config.max_iterations,
            residual_norm: norm,
        })
    }
}
