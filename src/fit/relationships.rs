//! Row selection for the five rain-rate relationship families.
//!
//! Filters are applied jointly: a row survives only if every named quantity
//! is strictly positive. Nothing is clamped. Zh and Zdr are converted from dB
//! to linear units after filtering; Kdp is used as-is.
//!
//! | family       | filter                      | predictors            |
//! |--------------|-----------------------------|-----------------------|
//! | `R(Kdp)`     | Kdp > 0, R > 0              | Kdp                   |
//! | `R(Zh)`      | R > 0                       | idb(Zh)               |
//! | `R(Zh,Zdr)`  | R > 0, Zdr > 0, Kdp > 0     | idb(Zh), idb(Zdr)     |
//! | `R(Zh,Kdp)`  | R > 0, Zdr > 0, Kdp > 0     | idb(Zh), Kdp          |
//! | `R(Zdr,Kdp)` | R > 0, Zdr > 0, Kdp > 0     | idb(Zdr), Kdp         |

use crate::domain::{PowerLawFit, RadarParameters, Relationship};
use crate::error::DsdError;
use crate::fit::fitter::{FitOptions, fit_power_law};
use crate::math::idb;

/// Rows that survived filtering, ready for `fit_power_law`.
#[derive(Debug, Clone)]
pub struct FitRows {
    /// One column per predictor, already in linear units.
    pub predictors: Vec<Vec<f64>>,
    pub target: Vec<f64>,
    /// Timestep index of each surviving row.
    pub timesteps: Vec<usize>,
}

/// Apply the family's filter and unit conversion.
pub fn select_rows(
    relationship: Relationship,
    radar: &RadarParameters,
    rain_rate: &[f64],
) -> Result<FitRows, DsdError> {
    let t = rain_rate.len();
    for (what, col) in [
        ("zh", &radar.zh),
        ("zdr", &radar.zdr),
        ("kdp", &radar.kdp),
    ] {
        if col.len() != t {
            return Err(DsdError::ShapeMismatch {
                what,
                expected: t,
                found: col.len(),
            });
        }
    }

    let k = relationship.predictor_count();
    let mut out = FitRows {
        predictors: vec![Vec::new(); k],
        target: Vec::new(),
        timesteps: Vec::new(),
    };

    for i in 0..t {
        let (r, zh, zdr, kdp) = (rain_rate[i], radar.zh[i], radar.zdr[i], radar.kdp[i]);
        let keep = match relationship {
            Relationship::RKdp => kdp > 0.0 && r > 0.0,
            Relationship::RZh => r > 0.0,
            Relationship::RZhZdr | Relationship::RZhKdp | Relationship::RZdrKdp => {
                r > 0.0 && zdr > 0.0 && kdp > 0.0
            }
        };
        if !keep {
            continue;
        }

        let xs: [f64; 2] = match relationship {
            Relationship::RKdp => [kdp, f64::NAN],
            Relationship::RZh => [idb(zh), f64::NAN],
            Relationship::RZhZdr => [idb(zh), idb(zdr)],
            Relationship::RZhKdp => [idb(zh), kdp],
            Relationship::RZdrKdp => [idb(zdr), kdp],
        };
        // A -inf/NaN dB value has no usable linear counterpart.
        if !r.is_finite() || xs[..k].iter().any(|x| !(x.is_finite() && *x > 0.0)) {
            continue;
        }

        for (col, x) in out.predictors.iter_mut().zip(&xs[..k]) {
            col.push(*x);
        }
        out.target.push(r);
        out.timesteps.push(i);
    }

    tracing::debug!(
        relationship = relationship.display_name(),
        total = t,
        kept = out.target.len(),
        "filtered fit rows"
    );
    Ok(out)
}

/// Filter, convert and fit one relationship family.
pub fn fit_relationship(
    relationship: Relationship,
    radar: &RadarParameters,
    rain_rate: &[f64],
    opts: &FitOptions,
) -> Result<PowerLawFit, DsdError> {
    let rows = select_rows(relationship, radar, rain_rate)?;
    fit_power_law(relationship, &rows.predictors, &rows.target, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::db;
    use approx::assert_relative_eq;

    fn radar(zh: Vec<f64>, zdr: Vec<f64>, kdp: Vec<f64>) -> RadarParameters {
        let n = zh.len();
        RadarParameters {
            zh,
            zdr,
            kdp,
            ai: vec![0.0; n],
        }
    }

    #[test]
    fn kdp_filter_keeps_only_jointly_positive_rows() {
        let kdp = vec![0.5, -0.1, 0.0, 1.2, 2.0, 0.3, 0.8];
        let rr = vec![10.0, 5.0, 3.0, 0.0, 30.0, -1.0, 15.0];
        let expected = kdp.iter().zip(&rr).filter(|(k, r)| **k > 0.0 && **r > 0.0).count();
        let params = radar(vec![30.0; 7], vec![1.0; 7], kdp);

        let rows = select_rows(Relationship::RKdp, &params, &rr).unwrap();
        assert_eq!(rows.target.len(), expected);
        assert_eq!(rows.timesteps, vec![0, 4, 6]);
        assert_eq!(rows.predictors[0], vec![0.5, 2.0, 0.8]);

        let fit = fit_relationship(Relationship::RKdp, &params, &rr, &FitOptions::default()).unwrap();
        assert_eq!(fit.n_used, expected);
    }

    #[test]
    fn zh_is_converted_to_linear() {
        let rows = select_rows(
            Relationship::RZh,
            &radar(vec![20.0, 30.0, 40.0], vec![0.0; 3], vec![0.0; 3]),
            &[1.0, 0.0, 2.0],
        )
        .unwrap();
        assert_eq!(rows.timesteps, vec![0, 2]);
        assert_relative_eq!(rows.predictors[0][0], 100.0, max_relative = 1e-12);
        assert_relative_eq!(rows.predictors[0][1], 10_000.0, max_relative = 1e-12);
    }

    #[test]
    fn dual_families_share_filter_but_not_predictors() {
        let params = radar(
            vec![30.0, 35.0, 40.0, 45.0],
            vec![0.5, -0.2, 1.0, 2.0],
            vec![0.1, 0.4, 0.0, 1.5],
        );
        let rr = [4.0, 8.0, 12.0, 40.0];

        let zh_zdr = select_rows(Relationship::RZhZdr, &params, &rr).unwrap();
        let zh_kdp = select_rows(Relationship::RZhKdp, &params, &rr).unwrap();
        let zdr_kdp = select_rows(Relationship::RZdrKdp, &params, &rr).unwrap();
        for rows in [&zh_zdr, &zh_kdp, &zdr_kdp] {
            assert_eq!(rows.timesteps, vec![0, 3]);
            assert_eq!(rows.predictors.len(), 2);
        }

        assert_relative_eq!(zh_zdr.predictors[1][1], idb(2.0), max_relative = 1e-12);
        // Kdp is never dB-converted.
        assert_eq!(zh_kdp.predictors[1], vec![0.1, 1.5]);
        assert_eq!(zdr_kdp.predictors[1], vec![0.1, 1.5]);
        assert_relative_eq!(zdr_kdp.predictors[0][0], idb(0.5), max_relative = 1e-12);
    }

    #[test]
    fn non_finite_reflectivity_rows_are_dropped() {
        let rows = select_rows(
            Relationship::RZh,
            &radar(vec![db(0.0), f64::NAN, 30.0], vec![0.0; 3], vec![0.0; 3]),
            &[1.0, 1.0, 1.0],
        )
        .unwrap();
        assert_eq!(rows.timesteps, vec![2]);
    }

    #[test]
    fn all_filtered_is_insufficient_data() {
        let params = radar(vec![30.0; 3], vec![1.0; 3], vec![0.0; 3]);
        let err = fit_relationship(Relationship::RKdp, &params, &[1.0; 3], &FitOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            DsdError::InsufficientData {
                relationship: Relationship::RKdp,
                rows: 0,
                params: 2
            }
        );
    }

    #[test]
    fn radar_length_must_match_rain_rate() {
        let params = radar(vec![30.0; 3], vec![1.0; 3], vec![1.0; 2]);
        let err = select_rows(Relationship::RKdp, &params, &[1.0; 3]).unwrap_err();
        assert!(matches!(err, DsdError::ShapeMismatch { what: "kdp", .. }));
    }
}
