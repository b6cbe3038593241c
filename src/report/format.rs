//! Terminal formatting for run reports.
//!
//! Kept apart from the computation so output changes stay localized.

use crate::report::{FieldSummary, FitOutcome, RunReport};

/// Format the full run summary (settings, field statistics, fitted laws).
pub fn format_run_summary(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("=== dsd - DSD parameterization and radar rain relations ===\n");
    out.push_str(&format!(
        "Series: n={} (empty={}) | seed={}\n",
        report.steps, report.empty_timesteps, report.seed
    ));
    out.push_str(&format!(
        "Radar: {} band ({:.2} mm) | shape={:?} | Nw={:?} | fit={:?}\n",
        report.band.display_name(),
        report.wavelength_mm,
        report.shape,
        report.nw_method,
        report.form,
    ));

    out.push_str("\nDerived fields:\n");
    out.push_str(&format_summary_table(&report.summaries));

    out.push_str("\nRelationships:\n");
    out.push_str(&format_fits(&report.fits));

    out
}

fn format_summary_table(rows: &[FieldSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<6} {:<12} {:>6} {:>12} {:>12} {:>12}\n",
        "field", "unit", "n", "min", "mean", "max"
    ));
    out.push_str(&format!(
        "{:-<6} {:-<12} {:-<6} {:-<12} {:-<12} {:-<12}\n",
        "", "", "", "", "", ""
    ));
    for s in rows {
        out.push_str(&format!(
            "{:<6} {:<12} {:>6} {:>12} {:>12} {:>12}\n",
            s.name,
            s.unit,
            s.n,
            fmt_num(s.min),
            fmt_num(s.mean),
            fmt_num(s.max),
        ));
    }
    out
}

/// One line per relationship family: the fitted law or the failure.
pub fn format_fits(fits: &[FitOutcome]) -> String {
    let mut out = String::new();
    for outcome in fits {
        let name = outcome.relationship().display_name();
        match outcome {
            FitOutcome::Fitted { fit, std_errors } => {
                out.push_str(&format!(
                    "  {:<11} R = {} | n={} rmse={:.3} mm/h iters={}\n",
                    name,
                    fmt_law(&fit.coefficients, predictor_names(name)),
                    fit.n_used,
                    fit.rmse,
                    fit.iterations,
                ));
                out.push_str(&format!("  {:<11} ± {}\n", "", fmt_vec(std_errors)));
            }
            FitOutcome::Failed { error, .. } => {
                out.push_str(&format!("  {name:<11} failed: {error}\n"));
            }
        }
    }
    out
}

fn predictor_names(display_name: &str) -> Vec<&str> {
    display_name
        .trim_start_matches("R(")
        .trim_end_matches(')')
        .split(',')
        .collect()
}

fn fmt_law(coefficients: &[f64], names: Vec<&str>) -> String {
    let mut s = fmt_num(coefficients[0]);
    for (b, name) in coefficients[1..].iter().zip(names) {
        s.push_str(&format!(" {name}^{b:.4}"));
    }
    s
}

fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e5).contains(&a) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| fmt_num(*x)).collect();
    format!("[{}]", parts.join(", "))
}
