//! Linear least squares helpers.
//!
//! Power laws become linear in log space:
//!
//! ```text
//! ln R = ln a + b ln x1 (+ c ln x2)
//! ```
//!
//! so an ordinary least squares solve gives both the `LogLinear` fit and the
//! starting point for the direct nonlinear refinement.
//!
//! Implementation choices:
//! - SVD solve, because the design matrix is tall (rows ≫ columns) and
//!   nalgebra's `QR::solve` is intended for square systems.
//! - Covariance via the inverse of the normal matrix `XᵀX`, which is tiny
//!   (2×2 or 3×3).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// `(XᵀX)⁻¹`, or `None` if the normal matrix is singular.
pub fn normal_inverse(x: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let xtx = x.tr_mul(x);
    let inv = xtx.try_inverse()?;
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}

/// Parameter covariance `s² (XᵀX)⁻¹` with `s² = SSE / (n - p)`.
///
/// With no residual degrees of freedom, or a singular normal matrix, every
/// entry is `+inf` (the parameters are not statistically constrained).
pub fn scaled_covariance(x: &DMatrix<f64>, sse: f64) -> DMatrix<f64> {
    let (n, p) = x.shape();
    let inf = DMatrix::from_element(p, p, f64::INFINITY);
    if n <= p {
        return inf;
    }
    match normal_inverse(x) {
        Some(inv) => inv * (sse / (n - p) as f64),
        None => inf,
    }
}
