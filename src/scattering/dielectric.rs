//! Complex permittivity of liquid water.
//!
//! Meissner & Wentz (2004) double-Debye model for fresh water. The imaginary
//! part is positive (absorbing medium, `exp(-iωt)` convention).

use num_complex::Complex64;

/// Speed of light in mm·GHz.
pub const C_MM_GHZ: f64 = 299.792458;

/// Radar frequency (GHz) for a wavelength in mm.
pub fn frequency_ghz(wavelength_mm: f64) -> f64 {
    C_MM_GHZ / wavelength_mm
}

/// Relative permittivity of fresh water at `wavelength_mm` and `temp_c` (°C).
pub fn water_permittivity(wavelength_mm: f64, temp_c: f64) -> Complex64 {
    let t = temp_c;
    let f = frequency_ghz(wavelength_mm);

    let e0 = (3.70886e4 - 8.2168e1 * t) / (4.21854e2 + t);
    let e1 = 5.7230 + 2.2379e-2 * t - 7.1237e-4 * t * t;
    let n1 = (45.0 + t) / (5.0478 - 7.0315e-2 * t + 6.0059e-4 * t * t);
    let e2 = 3.6143 + 2.8841e-2 * t;
    let n2 = (45.0 + t) / (1.3652e-1 + 1.4825e-3 * t + 2.4166e-4 * t * t);

    let one = Complex64::new(1.0, 0.0);
    (e0 - e1) / (one - Complex64::new(0.0, f / n1))
        + (e1 - e2) / (one - Complex64::new(0.0, f / n2))
        + e2
}

/// Dielectric factor `|K|² = |(ε-1)/(ε+2)|²`.
pub fn dielectric_factor(eps: Complex64) -> f64 {
    ((eps - 1.0) / (eps + 2.0)).norm_sqr()
}
