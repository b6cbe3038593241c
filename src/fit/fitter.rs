//! Power-law fitting for a single relationship.
//!
//! Given predictor columns `x_k` and targets `y` (all strictly positive):
//!
//! 1. solve `ln y = ln a + Σ b_k ln x_k` by OLS (the seed)
//! 2. for `FitForm::Direct`, refine `y = a Π x_k^{b_k}` by Levenberg–Marquardt
//!    on linear-space residuals
//! 3. report the coefficient covariance `s² (JᵀJ)⁻¹`
//!
//! Failures are explicit: too few rows is `InsufficientData`, an exhausted
//! iteration budget or non-finite solution is `NonConvergence`.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FitForm, PowerLawFit, Relationship};
use crate::error::DsdError;
use crate::math::{LmOptions, levenberg_marquardt, scaled_covariance, solve_least_squares};
use crate::models::{fill_design_row, fill_jacobian_row, predict};

/// Options that affect how each relationship is solved.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub form: FitForm,
    /// Iteration budget for the direct solve; `None` means `200 · (p + 1)`.
    pub max_iterations: Option<usize>,
    /// Relative tolerance on the SSE reduction and step size.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            form: FitForm::Direct,
            max_iterations: None,
            tolerance: 1e-10,
        }
    }
}

/// Fit `relationship` to predictor columns and targets.
///
/// `predictors` holds one column per predictor, each the same length as
/// `target`. Rows are expected to be pre-filtered to positive, finite values.
pub fn fit_power_law(
    relationship: Relationship,
    predictors: &[Vec<f64>],
    target: &[f64],
    opts: &FitOptions,
) -> Result<PowerLawFit, DsdError> {
    let p = relationship.param_count();
    if predictors.len() != relationship.predictor_count() {
        return Err(DsdError::ShapeMismatch {
            what: "predictor columns",
            expected: relationship.predictor_count(),
            found: predictors.len(),
        });
    }

    let n = target.len();
    for col in predictors {
        if col.len() != n {
            return Err(DsdError::ShapeMismatch {
                what: "predictor",
                expected: n,
                found: col.len(),
            });
        }
    }
    if n < p {
        return Err(DsdError::InsufficientData {
            relationship,
            rows: n,
            params: p,
        });
    }

    // Row-major view: rows[i] = [x_1, .., x_k] at observation i.
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| predictors.iter().map(|col| col[i]).collect())
        .collect();

    let Some((design, log_beta)) = seed_log_linear(&rows, target, p) else {
        return Err(DsdError::NonConvergence {
            relationship,
            iterations: 0,
        });
    };

    let (coefficients, covariance, iterations) = match opts.form {
        FitForm::LogLinear => {
            let log_sse: f64 = rows
                .iter()
                .zip(target)
                .map(|(xs, y)| {
                    let mut row = vec![0.0; p];
                    fill_design_row(xs, &mut row);
                    let fit: f64 = row.iter().zip(log_beta.iter()).map(|(r, b)| r * b).sum();
                    (y.ln() - fit).powi(2)
                })
                .sum();
            let cov_log = scaled_covariance(&design, log_sse);

            // Delta method for a = exp(ln a): scale row/column 0 by a.
            let a = log_beta[0].exp();
            let mut coeffs: Vec<f64> = log_beta.iter().copied().collect();
            coeffs[0] = a;
            let mut cov = cov_log;
            for k in 0..p {
                cov[(0, k)] *= a;
                cov[(k, 0)] *= a;
            }
            (coeffs, cov, 0)
        }
        FitForm::Direct => {
            let mut seed = log_beta;
            seed[0] = seed[0].exp();
            refine_direct(relationship, &rows, target, seed, opts)?
        }
    };

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(DsdError::NonConvergence {
            relationship,
            iterations,
        });
    }

    let sse: f64 = rows
        .iter()
        .zip(target)
        .map(|(xs, y)| (predict(&coefficients, xs) - y).powi(2))
        .sum();
    let rmse = (sse / n as f64).sqrt();

    if n == p {
        tracing::warn!(
            relationship = relationship.display_name(),
            rows = n,
            "no residual degrees of freedom; covariance is undefined"
        );
    }
    tracing::debug!(
        relationship = relationship.display_name(),
        rows = n,
        ?coefficients,
        sse,
        iterations,
        "power-law fit"
    );

    Ok(PowerLawFit {
        relationship,
        coefficients,
        covariance: (0..p)
            .map(|i| (0..p).map(|j| covariance[(i, j)]).collect())
            .collect(),
        n_used: n,
        sse,
        rmse,
        iterations,
    })
}

/// Log-space OLS: returns the design matrix and `[ln a, b_1, ..]`.
fn seed_log_linear(
    rows: &[Vec<f64>],
    target: &[f64],
    p: usize,
) -> Option<(DMatrix<f64>, DVector<f64>)> {
    let n = rows.len();
    let mut design = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];

    for i in 0..n {
        fill_design_row(&rows[i], &mut row);
        for j in 0..p {
            design[(i, j)] = row[j];
        }
        y[i] = target[i].ln();
    }

    if design.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let beta = solve_least_squares(&design, &y)?;
    Some((design, beta))
}

/// Levenberg–Marquardt on `a Π x_k^{b_k} - y` starting from `seed`.
fn refine_direct(
    relationship: Relationship,
    rows: &[Vec<f64>],
    target: &[f64],
    seed: DVector<f64>,
    opts: &FitOptions,
) -> Result<(Vec<f64>, DMatrix<f64>, usize), DsdError> {
    let p = seed.len();
    let n = rows.len();
    let lm_opts = LmOptions {
        max_iterations: opts.max_iterations.unwrap_or(200 * (p + 1)),
        tolerance: opts.tolerance,
    };

    let eval = |beta: &DVector<f64>| {
        let coeffs = beta.as_slice();
        let mut r = DVector::<f64>::zeros(n);
        let mut jac = DMatrix::<f64>::zeros(n, p);
        let mut row = vec![0.0; p];
        for i in 0..n {
            let y_fit = fill_jacobian_row(coeffs, &rows[i], &mut row);
            r[i] = y_fit - target[i];
            for j in 0..p {
                jac[(i, j)] = row[j];
            }
        }
        (r, jac)
    };

    let sol = levenberg_marquardt(eval, seed, lm_opts);
    if !sol.converged {
        return Err(DsdError::NonConvergence {
            relationship,
            iterations: sol.iterations,
        });
    }

    let covariance = scaled_covariance(&sol.jacobian, sol.sse);
    Ok((sol.params.iter().copied().collect(), covariance, sol.iterations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(n: usize, lo: f64, hi: f64) -> Vec<f64> {
        (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n as f64 - 1.0))
            .collect()
    }

    #[test]
    fn recovers_single_power_law() {
        let x = grid(30, 0.1, 5.0);
        let y: Vec<f64> = x.iter().map(|x| 40.0 * x.powf(0.8)).collect();
        let fit = fit_power_law(Relationship::RKdp, &[x], &y, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.coefficients[0], 40.0, max_relative = 1e-8);
        assert_relative_eq!(fit.coefficients[1], 0.8, max_relative = 1e-8);
        assert_eq!(fit.n_used, 30);
        assert!(fit.sse < 1e-12);
    }

    #[test]
    fn recovers_two_predictor_law_with_noise() {
        // R = 2 · x1^0.5 · x2^0.3 with a small deterministic perturbation.
        let mut x1 = Vec::new();
        let mut x2 = Vec::new();
        let mut y = Vec::new();
        for i in 0..12 {
            for j in 0..12 {
                let a = 1.0 + 3.0 * i as f64;
                let b = 0.5 + 0.7 * j as f64;
                let noise = 1.0 + 1e-4 * ((i * 7 + j * 3) % 5) as f64 - 2e-4;
                x1.push(a);
                x2.push(b);
                y.push(2.0 * a.powf(0.5) * b.powf(0.3) * noise);
            }
        }
        let fit = fit_power_law(Relationship::RZhZdr, &[x1, x2], &y, &FitOptions::default()).unwrap();
        let expected = [2.0, 0.5, 0.3];
        for (got, want) in fit.coefficients.iter().zip(expected) {
            assert!(
                ((got - want) / want).abs() < 0.05,
                "coefficient {got} not within 5% of {want}"
            );
        }
        assert_eq!(fit.covariance.len(), 3);
        assert!(fit.covariance.iter().all(|row| row.len() == 3));
        assert!(fit.std_errors().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn log_linear_form_matches_on_exact_data() {
        let x = grid(10, 1.0, 10.0);
        let y: Vec<f64> = x.iter().map(|x| 0.02 * x.powf(0.65)).collect();
        let opts = FitOptions {
            form: FitForm::LogLinear,
            ..FitOptions::default()
        };
        let fit = fit_power_law(Relationship::RZh, &[x], &y, &opts).unwrap();
        assert_relative_eq!(fit.coefficients[0], 0.02, max_relative = 1e-9);
        assert_relative_eq!(fit.coefficients[1], 0.65, max_relative = 1e-9);
        assert_eq!(fit.iterations, 0);
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let err = fit_power_law(
            Relationship::RZhKdp,
            &[vec![1.0, 2.0], vec![3.0, 4.0]],
            &[1.0, 2.0],
            &FitOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DsdError::InsufficientData {
                relationship: Relationship::RZhKdp,
                rows: 2,
                params: 3
            }
        );
    }

    #[test]
    fn exactly_determined_fit_has_infinite_covariance() {
        let fit = fit_power_law(
            Relationship::RKdp,
            &[vec![1.0, 4.0]],
            &[3.0, 6.0],
            &FitOptions::default(),
        )
        .unwrap();
        assert_relative_eq!(fit.coefficients[0], 3.0, max_relative = 1e-9);
        assert_relative_eq!(fit.coefficients[1], 0.5, max_relative = 1e-9);
        assert!(fit.covariance.iter().flatten().all(|v| v.is_infinite()));
    }

    #[test]
    fn exhausted_budget_is_non_convergence() {
        let x = grid(20, 0.5, 8.0);
        // Data far from any power law so the seed is not already optimal.
        let y: Vec<f64> = x.iter().map(|x| 1.0 + (3.0 * x).sin().abs() * 10.0).collect();
        let opts = FitOptions {
            max_iterations: Some(0),
            ..FitOptions::default()
        };
        let err = fit_power_law(Relationship::RKdp, &[x], &y, &opts).unwrap_err();
        assert!(matches!(
            err,
            DsdError::NonConvergence {
                relationship: Relationship::RKdp,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let err = fit_power_law(
            Relationship::RKdp,
            &[vec![1.0, 2.0, 3.0]],
            &[1.0, 2.0],
            &FitOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DsdError::ShapeMismatch { what: "predictor", .. }));
    }
}
