//! Complex-step differentiation.
//!
//! Perturbing an input along the imaginary axis and reading the derivative
//! from the imaginary part of the output avoids the subtractive cancellation
//! of ordinary finite differencing, so the step can be taken far below the
//! floating-point noise floor and the result is exact to machine precision.

use nalgebra::DMatrix;
use num::complex::Complex64;

/// Imaginary step applied to each perturbed variable.
pub const COMPLEX_STEP: f64 = 1.0e-30;

/// Approximate the Jacobian of `residual` at `values` by complex-step
/// differentiation.
///
/// `residual` must evaluate the same equations as the real-valued residual,
/// promoted to complex arithmetic, writing all `equation_count` entries of
/// its output slice. `out` must be an `equation_count` by `values.len()`
/// matrix; every entry is overwritten.
pub fn complex_step_jacobian<F>(
    values: &[f64],
    equation_count: usize,
    mut residual: F,
    out: &mut DMatrix<f64>,
) where
    F: FnMut(&[Complex64], &mut [Complex64]),
{
    debug_assert_eq!(out.nrows(), equation_count);
    debug_assert_eq!(out.ncols(), values.len());

    let mut perturbed: Vec<Complex64> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let mut result = vec![Complex64::new(0.0, 0.0); equation_count];
    for column in 0..values.len() {
        perturbed[column].im = COMPLEX_STEP;
        residual(&perturbed, &mut result);
        for row in 0..equation_count {
            out[(row, column)] = result[row].im / COMPLEX_STEP;
        }
        perturbed[column].im = 0.0;
    }
}
