//! Box shape.
//!
//! The box's full half extents include its margin. The convex core is the box
//! shrunk by the margin on every axis; the margin-inclusive support mapping
//! adds a spherical skin around that core, which rounds the edges and corners
//! by at most `margin`.

use nalgebra::{Matrix3, Point3, Vector3};
use sim_types::{Result, SimError};

/// Box centred at the local origin, aligned with the local axes.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    half_extents: Vector3<f64>,
    core_half_extents: Vector3<f64>,
    margin: f64,
    axes: [Vector3<f64>; 3],
}

impl BoxShape {
    /// Create a box with the given half extents and margin.
    ///
    /// Every half extent must be strictly larger than the margin, and the
    /// margin must be positive (debug-checked contract).
    #[must_use]
    pub fn new(half_extents: Vector3<f64>, margin: f64) -> Self {
        debug_assert!(
            Self::check(&half_extents, margin).is_ok(),
            "box half extents must exceed a positive margin, got {half_extents:?} / {margin}"
        );
        Self::build(half_extents, margin)
    }

    /// Create a box from untrusted data.
    pub fn try_new(half_extents: Vector3<f64>, margin: f64) -> Result<Self> {
        Self::check(&half_extents, margin)?;
        Ok(Self::build(half_extents, margin))
    }

    fn check(half_extents: &Vector3<f64>, margin: f64) -> Result<()> {
        if !(margin > 0.0 && margin.is_finite()) {
            return Err(SimError::invalid_shape(format!(
                "box margin must be positive and finite, got {margin}"
            )));
        }
        if half_extents.iter().any(|e| !e.is_finite() || *e <= margin) {
            return Err(SimError::invalid_shape(format!(
                "box half extents must be finite and larger than the margin {margin}, got {half_extents:?}"
            )));
        }
        Ok(())
    }

    fn build(half_extents: Vector3<f64>, margin: f64) -> Self {
        Self {
            half_extents,
            core_half_extents: half_extents.add_scalar(-margin),
            margin,
            axes: [Vector3::x(), Vector3::y(), Vector3::z()],
        }
    }

    /// Half extents including the margin.
    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        self.half_extents
    }

    /// Half extents of the convex core (excluding the margin).
    #[must_use]
    pub fn core_half_extents(&self) -> Vector3<f64> {
        self.core_half_extents
    }

    /// Skin margin.
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Face normals (and edge directions) of the box in local space.
    #[must_use]
    pub fn axes(&self) -> &[Vector3<f64>] {
        &self.axes
    }

    /// Corner of the core box farthest along `direction`.
    ///
    /// Zero components select the positive side.
    #[must_use]
    pub fn local_support_point_without_margin(&self, direction: &Vector3<f64>) -> Point3<f64> {
        let e = &self.core_half_extents;
        Point3::new(
            if direction.x < 0.0 { -e.x } else { e.x },
            if direction.y < 0.0 { -e.y } else { e.y },
            if direction.z < 0.0 { -e.z } else { e.z },
        )
    }

    /// Local bounds: `±half_extents` (margin already included).
    #[must_use]
    pub fn local_bounds(&self) -> (Point3<f64>, Point3<f64>) {
        (
            Point3::from(-self.half_extents),
            Point3::from(self.half_extents),
        )
    }

    /// Inertia tensor of a solid box.
    #[must_use]
    pub fn local_inertia_tensor(&self, mass: f64) -> Matrix3<f64> {
        let factor = mass / 3.0;
        let sq = self.half_extents.component_mul(&self.half_extents);
        Matrix3::from_diagonal(&Vector3::new(
            factor * (sq.y + sq.z),
            factor * (sq.x + sq.z),
            factor * (sq.x + sq.y),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_core_support() {
        let b = BoxShape::new(Vector3::new(1.0, 2.0, 3.0), 0.1);
        let p = b.local_support_point_without_margin(&Vector3::new(1.0, -1.0, 1.0));
        assert_relative_eq!(p.coords, Vector3::new(0.9, -1.9, 2.9), epsilon = 1e-12);

        // Zero direction picks the positive corner deterministically
        let p = b.local_support_point_without_margin(&Vector3::zeros());
        assert_relative_eq!(p.coords, Vector3::new(0.9, 1.9, 2.9), epsilon = 1e-12);
    }

    #[test]
    fn test_bounds_include_margin() {
        let b = BoxShape::new(Vector3::new(1.0, 0.5, 0.25), 0.04);
        let (min, max) = b.local_bounds();
        assert_eq!(max, Point3::new(1.0, 0.5, 0.25));
        assert_eq!(min, Point3::new(-1.0, -0.5, -0.25));
    }

    #[test]
    fn test_inertia_cube() {
        // Unit cube (side 1): I = m/6 on each axis
        let b = BoxShape::new(Vector3::new(0.5, 0.5, 0.5), 0.04);
        let tensor = b.local_inertia_tensor(6.0);
        assert_relative_eq!(tensor[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(tensor[(1, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(tensor[(2, 2)], 1.0, epsilon = 1e-12);
        assert_eq!(tensor[(0, 1)], 0.0);
    }

    #[test]
    fn test_try_new_rejects_margin_larger_than_extent() {
        assert!(BoxShape::try_new(Vector3::new(1.0, 1.0, 1.0), 0.04).is_ok());
        assert!(BoxShape::try_new(Vector3::new(1.0, 0.03, 1.0), 0.04).is_err());
        assert!(BoxShape::try_new(Vector3::new(1.0, 1.0, 1.0), 0.0).is_err());
        assert!(BoxShape::try_new(Vector3::new(1.0, f64::NAN, 1.0), 0.04).is_err());
    }
}
