//! Orientation-averaged Rayleigh scattering table on a fixed diameter grid.
//!
//! Each raindrop is an oblate spheroid in the Rayleigh regime. Its
//! polarizability along axis `j` is
//!
//! ```text
//! α_j = (D³/24) (ε-1) / (1 + L_j (ε-1))       [mm³]
//! ```
//!
//! with `L_j` the depolarization factor. The symmetry axis is canted by `β`
//! from vertical in the polarization plane, so
//!
//! ```text
//! α_hh = α_b cos²β + α_a sin²β
//! α_vv = α_a cos²β + α_b sin²β
//! ```
//!
//! (`a` = symmetry axis, `b` = equatorial axis). Backscatter cross sections
//! `σ = 4π k⁴ ⟨|α|²⟩` and forward amplitudes `f = k² ⟨α⟩` are averaged over a
//! Gaussian canting distribution and tabulated together with their running
//! integrals over `D`, so integrating a binned PSD is O(bins).

use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

use num_complex::Complex64;

use crate::error::DsdError;
use crate::scattering::{PsdIntegrator, RadarObservables};
use crate::scattering::dielectric::water_permittivity;
use crate::scattering::shape::DropShape;

/// Settings for building a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringConfig {
    /// Water temperature (°C).
    pub temperature_c: f64,
    /// Standard deviation of the Gaussian canting distribution (degrees).
    pub canting_std_deg: f64,
    /// Reference dielectric factor used in the radar equation.
    pub kw_sqr: f64,
    /// Largest tabulated diameter (mm).
    pub d_max_mm: f64,
    /// Number of grid points on `[0, d_max_mm]`.
    pub grid_points: usize,
}

impl Default for ScatteringConfig {
    fn default() -> Self {
        Self {
            temperature_c: 10.0,
            canting_std_deg: 20.0,
            kw_sqr: 0.93,
            d_max_mm: 10.0,
            grid_points: 1024,
        }
    }
}

/// Orientation moments `⟨cos²β⟩`, `⟨sin²β⟩`, `⟨cos⁴β⟩`, `⟨sin⁴β⟩`,
/// `⟨sin²β cos²β⟩` of the canting distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CantingMoments {
    pub c2: f64,
    pub s2: f64,
    pub c4: f64,
    pub s4: f64,
    pub s2c2: f64,
}

impl CantingMoments {
    /// All drops aligned with the vertical.
    pub fn aligned() -> Self {
        Self {
            c2: 1.0,
            s2: 0.0,
            c4: 1.0,
            s4: 0.0,
            s2c2: 0.0,
        }
    }

    /// Zero-mean Gaussian truncated to ±90°, evaluated on a 0.1° quadrature.
    pub fn gaussian(std_deg: f64) -> Self {
        if std_deg <= 0.0 {
            return Self::aligned();
        }

        let mut acc = [0.0_f64; 6];
        for i in 0..=1800 {
            let beta_deg = -90.0 + 0.1 * i as f64;
            let w = (-0.5 * (beta_deg / std_deg).powi(2)).exp();
            let (s, c) = beta_deg.to_radians().sin_cos();
            let (s2, c2) = (s * s, c * c);
            acc[0] += w;
            acc[1] += w * c2;
            acc[2] += w * s2;
            acc[3] += w * c2 * c2;
            acc[4] += w * s2 * s2;
            acc[5] += w * s2 * c2;
        }
        let norm = acc[0];
        Self {
            c2: acc[1] / norm,
            s2: acc[2] / norm,
            c4: acc[3] / norm,
            s4: acc[4] / norm,
            s2c2: acc[5] / norm,
        }
    }
}

/// Depolarization factors `(L_a, L_b)` of a spheroid with axis ratio
/// `r = a/b` (symmetry over equatorial semi-axis).
pub fn depolarization_factors(r: f64) -> (f64, f64) {
    if (r - 1.0).abs() < 1e-6 {
        return (1.0 / 3.0, 1.0 / 3.0);
    }
    let l_a = if r < 1.0 {
        // Oblate.
        let f = (1.0 / (r * r) - 1.0).sqrt();
        let f2 = f * f;
        (1.0 + f2) / f2 * (1.0 - f.atan() / f)
    } else {
        // Prolate.
        let e = (1.0 - 1.0 / (r * r)).sqrt();
        let e2 = e * e;
        (1.0 - e2) / e2 * (((1.0 + e) / (1.0 - e)).ln() / (2.0 * e) - 1.0)
    };
    (l_a, 0.5 * (1.0 - l_a))
}

/// Values on the diameter grid together with their running integral.
#[derive(Debug, Clone)]
struct Tabulated<T> {
    values: Vec<T>,
    cumulative: Vec<T>,
}

impl<T> Tabulated<T>
where
    T: Copy + Default + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>,
{
    fn new(grid: &[f64], values: Vec<T>) -> Self {
        let mut cumulative = Vec::with_capacity(values.len());
        let mut acc = T::default();
        cumulative.push(acc);
        for k in 1..values.len() {
            acc = acc + (values[k - 1] + values[k]) * (0.5 * (grid[k] - grid[k - 1]));
            cumulative.push(acc);
        }
        Self { values, cumulative }
    }

    /// Trapezoidal `∫ v dD` from `grid[0]` to `x`, clamped to the grid.
    fn integral_to(&self, grid: &[f64], x: f64) -> T {
        let last = grid.len() - 1;
        if !(x > grid[0]) {
            return T::default();
        }
        if x >= grid[last] {
            return self.cumulative[last];
        }
        let k = grid.partition_point(|g| *g <= x) - 1;
        let frac = (x - grid[k]) / (grid[k + 1] - grid[k]);
        let v_x = self.values[k] + (self.values[k + 1] - self.values[k]) * frac;
        self.cumulative[k] + (self.values[k] + v_x) * (0.5 * (x - grid[k]))
    }

    fn integral(&self, grid: &[f64], lo: f64, hi: f64) -> T {
        self.integral_to(grid, hi) - self.integral_to(grid, lo)
    }
}

/// Per-diameter scattering quantities for one wavelength and shape model.
#[derive(Debug, Clone)]
pub struct ScatteringTable {
    wavelength_mm: f64,
    kw_sqr: f64,
    diameters: Vec<f64>,
    sigma_hh: Tabulated<f64>,
    sigma_vv: Tabulated<f64>,
    fwd_hh: Tabulated<Complex64>,
    fwd_vv: Tabulated<Complex64>,
}

impl ScatteringTable {
    /// Tabulate `shape` at `wavelength_mm`.
    pub fn build<S: DropShape + ?Sized>(wavelength_mm: f64, shape: &S, config: &ScatteringConfig) -> Self {
        let n = config.grid_points.max(2);
        let diameters: Vec<f64> = (0..n)
            .map(|i| config.d_max_mm * i as f64 / (n - 1) as f64)
            .collect();

        let eps = water_permittivity(wavelength_mm, config.temperature_c);
        let k = 2.0 * PI / wavelength_mm;
        let cant = CantingMoments::gaussian(config.canting_std_deg);

        let mut sigma_hh = Vec::with_capacity(n);
        let mut sigma_vv = Vec::with_capacity(n);
        let mut fwd_hh = Vec::with_capacity(n);
        let mut fwd_vv = Vec::with_capacity(n);

        for &d in &diameters {
            let r = shape.axis_ratio(d).max(0.05);
            let (l_a, l_b) = depolarization_factors(r);
            let vol = d.powi(3) / 24.0;
            let alpha_a = (eps - 1.0) / ((eps - 1.0) * l_a + 1.0) * vol;
            let alpha_b = (eps - 1.0) / ((eps - 1.0) * l_b + 1.0) * vol;

            let cross = 2.0 * (alpha_a * alpha_b.conj()).re * cant.s2c2;
            let mean_sq_hh = alpha_b.norm_sqr() * cant.c4 + alpha_a.norm_sqr() * cant.s4 + cross;
            let mean_sq_vv = alpha_a.norm_sqr() * cant.c4 + alpha_b.norm_sqr() * cant.s4 + cross;

            sigma_hh.push(4.0 * PI * k.powi(4) * mean_sq_hh);
            sigma_vv.push(4.0 * PI * k.powi(4) * mean_sq_vv);
            fwd_hh.push((alpha_b * cant.c2 + alpha_a * cant.s2) * (k * k));
            fwd_vv.push((alpha_a * cant.c2 + alpha_b * cant.s2) * (k * k));
        }

        Self {
            wavelength_mm,
            kw_sqr: config.kw_sqr,
            sigma_hh: Tabulated::new(&diameters, sigma_hh),
            sigma_vv: Tabulated::new(&diameters, sigma_vv),
            fwd_hh: Tabulated::new(&diameters, fwd_hh),
            fwd_vv: Tabulated::new(&diameters, fwd_vv),
            diameters,
        }
    }

    /// Integrate a binned PSD (`Nd[i]` constant on `(edges[i], edges[i+1]]`)
    /// against the table. Diameters beyond the grid contribute nothing.
    pub fn integrate_bins(&self, bin_edges: &[f64], nd_row: &[f64]) -> RadarObservables {
        let grid = &self.diameters;
        let mut hh = 0.0;
        let mut vv = 0.0;
        let mut f_hh = Complex64::default();
        let mut f_vv = Complex64::default();

        for (i, &n) in nd_row.iter().enumerate() {
            if n == 0.0 {
                continue;
            }
            let (lo, hi) = (bin_edges[i], bin_edges[i + 1]);
            hh += n * self.sigma_hh.integral(grid, lo, hi);
            vv += n * self.sigma_vv.integral(grid, lo, hi);
            f_hh = f_hh + self.fwd_hh.integral(grid, lo, hi) * n;
            f_vv = f_vv + self.fwd_vv.integral(grid, lo, hi) * n;
        }

        let wl = self.wavelength_mm;
        RadarObservables {
            zh: wl.powi(4) / (PI.powi(5) * self.kw_sqr) * hh,
            // 0/0 for an empty distribution stays NaN.
            zdr: hh / vv,
            kdp: 1e-3 * (180.0 / PI) * wl * (f_hh - f_vv).re,
            ai: 8.686e-3 * wl * f_hh.im,
        }
    }
}

impl PsdIntegrator for ScatteringTable {
    fn integrate(&self, bin_edges: &[f64], nd_row: &[f64]) -> Result<RadarObservables, DsdError> {
        check_edges(bin_edges, nd_row)?;
        Ok(self.integrate_bins(bin_edges, nd_row))
    }
}

/// One more edge than bins.
pub(crate) fn check_edges(bin_edges: &[f64], nd_row: &[f64]) -> Result<(), DsdError> {
    if bin_edges.len() != nd_row.len() + 1 {
        return Err(DsdError::ShapeMismatch {
            what: "bin_edges",
            expected: nd_row.len() + 1,
            found: bin_edges.len(),
        });
    }
    Ok(())
}
