//! Capsule shape (cylinder with hemispherical caps).
//!
//! Like the sphere, the capsule carries no explicit skin: its margin is its
//! radius and its convex core is the segment between the cap centres, aligned
//! with the local Z-axis.

use nalgebra::{Matrix3, Point3, Vector3};
use sim_types::{Result, SimError};

/// Capsule centred at the local origin, axis along local Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    half_length: f64,
    radius: f64,
}

impl Capsule {
    /// Create a capsule with the given segment half-length and radius.
    #[must_use]
    pub fn new(half_length: f64, radius: f64) -> Self {
        debug_assert!(
            Self::check(half_length, radius).is_ok(),
            "capsule half-length and radius must be positive and finite, got {half_length} / {radius}"
        );
        Self {
            half_length,
            radius,
        }
    }

    /// Create a capsule from untrusted data.
    pub fn try_new(half_length: f64, radius: f64) -> Result<Self> {
        Self::check(half_length, radius)?;
        Ok(Self {
            half_length,
            radius,
        })
    }

    fn check(half_length: f64, radius: f64) -> Result<()> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SimError::invalid_shape(format!(
                "capsule radius must be positive and finite, got {radius}"
            )));
        }
        if !(half_length > 0.0 && half_length.is_finite()) {
            return Err(SimError::invalid_shape(format!(
                "capsule half-length must be positive and finite, got {half_length}"
            )));
        }
        Ok(())
    }

    /// Half-length of the core segment.
    #[must_use]
    pub fn half_length(&self) -> f64 {
        self.half_length
    }

    /// Capsule radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Margin of the capsule (equal to its radius).
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.radius
    }

    /// Segment endpoint farthest along `direction`; `z == 0` picks the top cap.
    #[must_use]
    pub fn local_support_point_without_margin(&self, direction: &Vector3<f64>) -> Point3<f64> {
        if direction.z >= 0.0 {
            Point3::new(0.0, 0.0, self.half_length)
        } else {
            Point3::new(0.0, 0.0, -self.half_length)
        }
    }

    /// Local bounds including the hemispherical caps.
    #[must_use]
    pub fn local_bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let r = self.radius;
        let h = self.half_length + r;
        (Point3::new(-r, -r, -h), Point3::new(r, r, h))
    }

    /// Inertia tensor of a solid capsule (cylinder plus two hemispheres).
    ///
    /// Mass is split between the cylinder and the caps in proportion to the
    /// `2r : 3·height` weights used by the reference formula.
    #[must_use]
    pub fn local_inertia_tensor(&self, mass: f64) -> Matrix3<f64> {
        let r = self.radius;
        let height = 2.0 * self.half_length;
        let radius_sq = r * r;
        let height_sq = height * height;
        let radius_sq_double = radius_sq + radius_sq;
        let factor1 = 2.0 * r / (4.0 * r + 3.0 * height);
        let factor2 = 3.0 * height / (4.0 * r + 3.0 * height);
        let sum1 = 0.4 * radius_sq_double;
        let sum2 = 0.75 * height * r + 0.5 * height_sq;
        let sum3 = 0.25 * radius_sq + height_sq / 12.0;

        let transverse = factor1 * mass * (sum1 + sum2) + factor2 * mass * sum3;
        let axial = factor1 * mass * sum1 + factor2 * mass * 0.25 * radius_sq_double;
        Matrix3::from_diagonal(&Vector3::new(transverse, transverse, axial))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_core_support_picks_cap() {
        let c = Capsule::new(1.0, 0.5);
        assert_eq!(
            c.local_support_point_without_margin(&Vector3::new(0.3, 0.2, 1.0)),
            Point3::new(0.0, 0.0, 1.0)
        );
        assert_eq!(
            c.local_support_point_without_margin(&Vector3::new(0.3, 0.2, -1.0)),
            Point3::new(0.0, 0.0, -1.0)
        );
        assert_eq!(
            c.local_support_point_without_margin(&Vector3::zeros()),
            Point3::new(0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn test_local_bounds() {
        let (min, max) = Capsule::new(1.0, 0.5).local_bounds();
        assert_eq!(min, Point3::new(-0.5, -0.5, -1.5));
        assert_eq!(max, Point3::new(0.5, 0.5, 1.5));
    }

    #[test]
    fn test_inertia_short_capsule_approaches_sphere() {
        let c = Capsule::new(1e-9, 0.5);
        let tensor = c.local_inertia_tensor(2.0);
        let sphere = 0.4 * 2.0 * 0.25;
        assert_relative_eq!(tensor[(0, 0)], sphere, epsilon = 1e-6);
        assert_relative_eq!(tensor[(2, 2)], sphere, epsilon = 1e-6);
    }

    #[test]
    fn test_inertia_long_capsule_is_harder_to_tumble() {
        let tensor = Capsule::new(2.0, 0.25).local_inertia_tensor(1.0);
        assert!(tensor[(0, 0)] > tensor[(2, 2)]);
        assert_eq!(tensor[(0, 0)], tensor[(1, 1)]);
    }

    #[test]
    fn test_try_new() {
        assert!(Capsule::try_new(1.0, 0.5).is_ok());
        assert!(Capsule::try_new(0.0, 0.5).is_err());
        assert!(Capsule::try_new(1.0, -0.5).is_err());
    }
}
