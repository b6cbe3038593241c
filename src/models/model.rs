//! Evaluation of `y = a · Π_k x_k^{b_k}`.
//!
//! The fitter relies on three primitive operations:
//! - build a log-space design row (for the OLS seed / `LogLinear` form)
//! - fill a Jacobian row of the direct form (for Levenberg–Marquardt)
//! - predict `y` given coefficients (for residuals)
//!
//! Coefficients are ordered `[a, b_1, .., b_k]`; predictors for one row are
//! `[x_1, .., x_k]`.

/// Predict `a · Π x_k^{b_k}`.
pub fn predict(coeffs: &[f64], xs: &[f64]) -> f64 {
    xs.iter()
        .zip(&coeffs[1..])
        .fold(coeffs[0], |acc, (x, b)| acc * x.powf(*b))
}

/// Fill the design row `[1, ln x_1, .., ln x_k]` for `ln y = ln a + Σ b_k ln x_k`.
///
/// # Panics
/// Panics if `out.len() != xs.len() + 1`.
pub fn fill_design_row(xs: &[f64], out: &mut [f64]) {
    out[0] = 1.0;
    for (o, x) in out[1..].iter_mut().zip(xs) {
        *o = x.ln();
    }
}

/// Fill the Jacobian row `[∂y/∂a, ∂y/∂b_1, ..]` and return the prediction.
///
/// `∂y/∂a = Π x_k^{b_k}` and `∂y/∂b_k = y · ln x_k`.
///
/// # Panics
/// Panics if `out.len() != coeffs.len()`.
pub fn fill_jacobian_row(coeffs: &[f64], xs: &[f64], out: &mut [f64]) -> f64 {
    let basis: f64 = xs.iter().zip(&coeffs[1..]).map(|(x, b)| x.powf(*b)).product();
    let y = coeffs[0] * basis;
    out[0] = basis;
    for (o, x) in out[1..].iter_mut().zip(xs) {
        *o = y * x.ln();
    }
    y
}
