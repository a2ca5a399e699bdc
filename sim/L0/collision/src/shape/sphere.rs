//! Sphere shape.
//!
//! A sphere has no convex core: it is all margin. Its margin is its radius,
//! so the margin-exclusive support point is always the local origin.

use nalgebra::{Matrix3, Point3, Vector3};
use sim_types::{Result, SimError};

/// Sphere centred at the local origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    radius: f64,
}

impl Sphere {
    /// Create a sphere with the given radius.
    ///
    /// A non-positive radius is a contract violation, checked in debug builds.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        debug_assert!(
            radius > 0.0 && radius.is_finite(),
            "sphere radius must be positive and finite, got {radius}"
        );
        Self { radius }
    }

    /// Create a sphere from untrusted data.
    pub fn try_new(radius: f64) -> Result<Self> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SimError::invalid_shape(format!(
                "sphere radius must be positive and finite, got {radius}"
            )));
        }
        Ok(Self { radius })
    }

    /// Sphere radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Margin of the sphere (equal to its radius).
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.radius
    }

    /// Support point of the core: the centre.
    #[must_use]
    pub fn local_support_point_without_margin(&self, _direction: &Vector3<f64>) -> Point3<f64> {
        Point3::origin()
    }

    /// Local bounds: `±radius` on every axis.
    #[must_use]
    pub fn local_bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let r = self.radius;
        (Point3::new(-r, -r, -r), Point3::new(r, r, r))
    }

    /// Inertia tensor of a solid sphere: `0.4 * m * r²` on the diagonal.
    #[must_use]
    pub fn local_inertia_tensor(&self, mass: f64) -> Matrix3<f64> {
        let diag = 0.4 * mass * self.radius * self.radius;
        Matrix3::from_diagonal_element(diag)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_core_support_is_origin() {
        let sphere = Sphere::new(2.0);
        for dir in [Vector3::x(), -Vector3::z(), Vector3::new(3.0, -1.0, 0.5)] {
            assert_eq!(
                sphere.local_support_point_without_margin(&dir),
                Point3::origin()
            );
        }
    }

    #[test]
    fn test_margin_equals_radius() {
        let sphere = Sphere::new(0.75);
        assert_eq!(sphere.margin(), sphere.radius());
    }

    #[test]
    fn test_local_bounds() {
        let (min, max) = Sphere::new(1.5).local_bounds();
        assert_eq!(min, Point3::new(-1.5, -1.5, -1.5));
        assert_eq!(max, Point3::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn test_try_new_rejects_bad_radius() {
        assert!(Sphere::try_new(1.0).is_ok());
        assert!(Sphere::try_new(0.0).unwrap_err().is_shape_error());
        assert!(Sphere::try_new(-1.0).is_err());
        assert!(Sphere::try_new(f64::INFINITY).is_err());
        assert!(Sphere::try_new(f64::NAN).is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "sphere radius must be positive")]
    fn test_new_rejects_zero_radius_in_debug() {
        let _ = Sphere::new(0.0);
    }
}
