//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ r_i(β)²` given a callback that returns the residual vector
//! `r = f(β) - y` and its Jacobian `∂r/∂β` at a point. Each iteration solves
//!
//! ```text
//! (JᵀJ + λ diag(JᵀJ)) δ = -Jᵀr
//! ```
//!
//! by Cholesky, accepting the step when it lowers the SSE (and shrinking λ),
//! otherwise growing λ and retrying from the same point.

use nalgebra::{DMatrix, DVector};

/// Initial damping.
const LAMBDA_INIT: f64 = 1e-3;
/// Once λ grows past this without an accepted step, no descent direction is
/// left at working precision.
const LAMBDA_MAX: f64 = 1e16;
/// Floor for the Marquardt diagonal scaling.
const DIAG_FLOOR: f64 = 1e-12;

/// Termination settings.
#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    /// Maximum number of Jacobian evaluations.
    pub max_iterations: usize,
    /// Relative tolerance on the SSE reduction and on the step size.
    pub tolerance: f64,
}

/// Outcome of a solve.
#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: DVector<f64>,
    /// Jacobian at `params` (used for the covariance).
    pub jacobian: DMatrix<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Run Levenberg–Marquardt from `x0`.
///
/// `eval` returns `(residuals, jacobian)`; a non-finite SSE at a trial point
/// is treated as a rejected step.
pub fn levenberg_marquardt<F>(eval: F, x0: DVector<f64>, opts: LmOptions) -> LmSolution
where
    F: Fn(&DVector<f64>) -> (DVector<f64>, DMatrix<f64>),
{
    let mut x = x0;
    let (mut r, mut j) = eval(&x);
    let mut sse = r.norm_squared();
    let mut lambda = LAMBDA_INIT;

    let finish = |params: DVector<f64>,
                  jacobian: DMatrix<f64>,
                  sse: f64,
                  iterations: usize,
                  converged: bool| LmSolution {
        params,
        jacobian,
        sse,
        iterations,
        converged,
    };

    if !sse.is_finite() {
        return finish(x, j, sse, 0, false);
    }
    if sse == 0.0 {
        return finish(x, j, sse, 0, true);
    }

    let mut iterations = 0;
    while iterations < opts.max_iterations {
        iterations += 1;

        let jtj = j.tr_mul(&j);
        let grad = j.tr_mul(&r);

        let mut a = jtj.clone();
        for i in 0..a.nrows() {
            a[(i, i)] += lambda * jtj[(i, i)].max(DIAG_FLOOR);
        }

        let Some(chol) = a.cholesky() else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return finish(x, j, sse, iterations, true);
            }
            continue;
        };
        let step = chol.solve(&(-grad));
        let x_new = &x + &step;
        let (r_new, j_new) = eval(&x_new);
        let sse_new = r_new.norm_squared();

        if sse_new.is_finite() && sse_new < sse {
            let rel_drop = (sse - sse_new) / sse;
            let small_step = step.norm() <= opts.tolerance * (x.norm() + opts.tolerance);

            x = x_new;
            r = r_new;
            j = j_new;
            sse = sse_new;
            lambda = (lambda / 10.0).max(1e-12);

            if sse == 0.0 || rel_drop <= opts.tolerance || small_step {
                return finish(x, j, sse, iterations, true);
            }
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return finish(x, j, sse, iterations, true);
            }
        }
    }

    finish(x, j, sse, iterations, false)
}
