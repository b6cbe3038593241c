//! Raindrop shape (axis ratio) models.
//!
//! Axis ratio is vertical over horizontal dimension as a function of the
//! volume-equivalent diameter `D` (mm); values below 1 are oblate.

use crate::domain::ShapeKind;

/// Axis ratio as a function of equivolume diameter (mm).
///
/// Implemented for `ShapeKind` and for any `Fn(f64) -> f64`.
pub trait DropShape: Send + Sync {
    fn axis_ratio(&self, d_mm: f64) -> f64;
}

impl<F> DropShape for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn axis_ratio(&self, d_mm: f64) -> f64 {
        self(d_mm)
    }
}

impl DropShape for ShapeKind {
    fn axis_ratio(&self, d_mm: f64) -> f64 {
        match self {
            ShapeKind::BeardChuang => beard_chuang(d_mm),
            ShapeKind::PruppacherBeard => pruppacher_beard(d_mm),
            ShapeKind::Thurai => thurai(d_mm),
            ShapeKind::Brandes => brandes(d_mm),
            ShapeKind::Spherical => 1.0,
        }
    }
}

/// Beard & Chuang (1987) equilibrium shape, polynomial fit.
pub fn beard_chuang(d: f64) -> f64 {
    1.0048 + 5.7e-4 * d - 2.628e-2 * d.powi(2) + 3.682e-3 * d.powi(3) - 1.677e-4 * d.powi(4)
}

/// Pruppacher & Beard (1970) linear fit, spherical below ~0.5 mm.
pub fn pruppacher_beard(d: f64) -> f64 {
    (1.03 - 0.062 * d).min(1.0)
}

/// Thurai et al. (2007) wind-tunnel fit.
pub fn thurai(d: f64) -> f64 {
    if d < 0.7 {
        1.0
    } else if d < 1.5 {
        1.173 - 0.5165 * d + 0.4698 * d.powi(2) - 0.1317 * d.powi(3) - 8.5e-3 * d.powi(4)
    } else {
        1.065 - 6.25e-2 * d - 3.99e-3 * d.powi(2) + 7.66e-4 * d.powi(3) - 4.095e-5 * d.powi(4)
    }
}

/// Brandes et al. (2002) fit.
pub fn brandes(d: f64) -> f64 {
    0.9951 + 0.02510 * d - 0.03644 * d.powi(2) + 0.005303 * d.powi(3) - 0.0002492 * d.powi(4)
}
