//! Collision shapes and their support mappings.
//!
//! [`CollisionShape`] is a closed set of convex primitives. Every shape is a
//! convex *core* inflated by a uniform *margin*:
//!
//! | Shape | Core | Margin |
//! |-------|------|--------|
//! | [`Sphere`] | centre point | radius |
//! | [`Capsule`] | segment along local Z | radius |
//! | [`BoxShape`] | box shrunk by the margin | explicit skin |
//! | [`ConvexMesh`] | hull vertices | explicit skin |
//!
//! The margin-exclusive support mapping describes the core alone; the
//! margin-inclusive mapping adds `normalize(d) * margin`. GJK measures core
//! distance with the former and only inflates by the margins at the end,
//! which keeps it away from the exact-touching singularity.
//!
//! Shapes are immutable once built and are shared read-only between
//! concurrent narrow-phase tests. Copies are made only through `clone()`.

mod capsule;
mod convex_mesh;
mod cuboid;
mod sphere;

pub use capsule::Capsule;
pub use convex_mesh::ConvexMesh;
pub use cuboid::BoxShape;
pub use sphere::Sphere;

use nalgebra::{Matrix3, Point3, Vector3};
use sim_types::Pose;

use crate::aabb::Aabb;

/// Skin thickness given to boxes and convex meshes built without an explicit margin.
pub const DEFAULT_MARGIN: f64 = 0.04;

/// Squared length below which a support direction is treated as zero.
pub(crate) const DEGENERATE_DIRECTION_SQ: f64 = f64::EPSILON * f64::EPSILON;

/// Tag identifying the variant of a [`CollisionShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    /// [`Sphere`].
    Sphere,
    /// [`BoxShape`].
    Box,
    /// [`Capsule`].
    Capsule,
    /// [`ConvexMesh`].
    ConvexMesh,
}

impl ShapeKind {
    /// Number of shape kinds.
    pub const COUNT: usize = 4;

    /// Get all shape kinds in table order.
    #[must_use]
    pub const fn all() -> [Self; Self::COUNT] {
        [Self::Sphere, Self::Box, Self::Capsule, Self::ConvexMesh]
    }

    /// Row/column of this kind in dispatch tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Sphere => 0,
            Self::Box => 1,
            Self::Capsule => 2,
            Self::ConvexMesh => 3,
        }
    }

    /// Whether shapes of this kind expose face normals and edge directions.
    #[must_use]
    pub const fn is_polyhedral(self) -> bool {
        matches!(self, Self::Box | Self::ConvexMesh)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Box => "box",
            Self::Capsule => "capsule",
            Self::ConvexMesh => "convex_mesh",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Face normals and edge directions of a polyhedral shape, in local space.
#[derive(Debug, Clone, Copy)]
pub struct PolyhedronFeatures<'a> {
    /// Unit face normals.
    pub face_normals: &'a [Vector3<f64>],
    /// Unit edge directions, one per parallel class.
    pub edge_directions: &'a [Vector3<f64>],
}

/// Convex collision shape.
///
/// # Example
///
/// ```
/// use sim_collision::CollisionShape;
/// use nalgebra::{Point3, Vector3};
///
/// let sphere = CollisionShape::sphere(0.5);
/// let p = sphere.local_support_point_with_margin(&Vector3::new(0.0, 0.0, 2.0));
/// assert_eq!(p, Point3::new(0.0, 0.0, 0.5));
///
/// // Zero directions fall back to a fixed boundary point
/// let p = sphere.local_support_point_with_margin(&Vector3::zeros());
/// assert_eq!(p, Point3::new(0.0, 0.5, 0.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionShape {
    /// Sphere.
    Sphere(Sphere),
    /// Box.
    Box(BoxShape),
    /// Capsule along local Z.
    Capsule(Capsule),
    /// Convex polyhedron.
    ConvexMesh(ConvexMesh),
}

impl CollisionShape {
    /// Create a sphere shape.
    #[must_use]
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere(Sphere::new(radius))
    }

    /// Create a box shape with [`DEFAULT_MARGIN`].
    #[must_use]
    pub fn box_shape(half_extents: Vector3<f64>) -> Self {
        Self::Box(BoxShape::new(half_extents, DEFAULT_MARGIN))
    }

    /// Create a box shape with an explicit margin.
    #[must_use]
    pub fn box_with_margin(half_extents: Vector3<f64>, margin: f64) -> Self {
        Self::Box(BoxShape::new(half_extents, margin))
    }

    /// Create a capsule shape.
    #[must_use]
    pub fn capsule(half_length: f64, radius: f64) -> Self {
        Self::Capsule(Capsule::new(half_length, radius))
    }

    /// Create a convex mesh shape with [`DEFAULT_MARGIN`].
    #[must_use]
    pub fn convex_mesh(vertices: Vec<Point3<f64>>, faces: Vec<Vec<usize>>) -> Self {
        Self::ConvexMesh(ConvexMesh::new(vertices, faces, DEFAULT_MARGIN))
    }

    /// Create a regular tetrahedron mesh with [`DEFAULT_MARGIN`].
    #[must_use]
    pub fn tetrahedron(h: f64) -> Self {
        Self::ConvexMesh(ConvexMesh::tetrahedron(h, DEFAULT_MARGIN))
    }

    /// Variant tag.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Sphere(_) => ShapeKind::Sphere,
            Self::Box(_) => ShapeKind::Box,
            Self::Capsule(_) => ShapeKind::Capsule,
            Self::ConvexMesh(_) => ShapeKind::ConvexMesh,
        }
    }

    /// Skin margin (always strictly positive).
    #[must_use]
    pub fn margin(&self) -> f64 {
        match self {
            Self::Sphere(s) => s.margin(),
            Self::Box(b) => b.margin(),
            Self::Capsule(c) => c.margin(),
            Self::ConvexMesh(m) => m.margin(),
        }
    }

    /// Farthest point of the margin-inflated shape along a local direction.
    ///
    /// A direction shorter than machine epsilon is degenerate: the result is
    /// the core's zero-direction support offset by `(0, margin, 0)`, a fixed
    /// boundary point, so iterative callers never divide by zero.
    #[must_use]
    pub fn local_support_point_with_margin(&self, direction: &Vector3<f64>) -> Point3<f64> {
        let core = self.local_support_point_without_margin(direction);
        let margin = self.margin();
        if direction.norm_squared() >= DEGENERATE_DIRECTION_SQ {
            core + direction.normalize() * margin
        } else {
            core + Vector3::new(0.0, margin, 0.0)
        }
    }

    /// Farthest point of the convex core (margin excluded) along a local direction.
    #[must_use]
    pub fn local_support_point_without_margin(&self, direction: &Vector3<f64>) -> Point3<f64> {
        match self {
            Self::Sphere(s) => s.local_support_point_without_margin(direction),
            Self::Box(b) => b.local_support_point_without_margin(direction),
            Self::Capsule(c) => c.local_support_point_without_margin(direction),
            Self::ConvexMesh(m) => m.local_support_point_without_margin(direction),
        }
    }

    /// World-space support point (margin included) along a world direction.
    #[must_use]
    pub fn support_point_with_margin(&self, pose: &Pose, direction: &Vector3<f64>) -> Point3<f64> {
        let local_dir = pose.inverse_transform_vector(direction);
        pose.transform_point(&self.local_support_point_with_margin(&local_dir))
    }

    /// World-space support point of the core along a world direction.
    #[must_use]
    pub fn support_point_without_margin(
        &self,
        pose: &Pose,
        direction: &Vector3<f64>,
    ) -> Point3<f64> {
        let local_dir = pose.inverse_transform_vector(direction);
        pose.transform_point(&self.local_support_point_without_margin(&local_dir))
    }

    /// Local extents `(min, max)` of the shape.
    ///
    /// Spheres, capsules and boxes already include their margin; convex mesh
    /// bounds cover the hull vertices only (see [`Self::residual_margin`]).
    #[must_use]
    pub fn local_bounds(&self) -> (Point3<f64>, Point3<f64>) {
        match self {
            Self::Sphere(s) => s.local_bounds(),
            Self::Box(b) => b.local_bounds(),
            Self::Capsule(c) => c.local_bounds(),
            Self::ConvexMesh(m) => m.local_bounds(),
        }
    }

    /// Part of the margin not already covered by [`Self::local_bounds`].
    #[must_use]
    pub fn residual_margin(&self) -> f64 {
        match self {
            Self::Sphere(_) | Self::Box(_) | Self::Capsule(_) => 0.0,
            Self::ConvexMesh(m) => m.margin(),
        }
    }

    /// World-space bounding box of the shape at `pose`.
    #[must_use]
    pub fn update_aabb(&self, pose: &Pose) -> Aabb {
        if let Self::Sphere(s) = self {
            // Rotation invariant
            return Aabb::from_center(pose.position, Vector3::repeat(s.radius()));
        }

        let (min, max) = self.local_bounds();
        let local_center = nalgebra::center(&min, &max);
        let half_extents = (max - min) * 0.5;
        let world_half_extents = pose.rotation_matrix().abs() * half_extents;

        Aabb::from_center(pose.transform_point(&local_center), world_half_extents)
            .expanded(self.residual_margin())
    }

    /// Inertia tensor about the local origin for the given mass.
    #[must_use]
    pub fn compute_local_inertia_tensor(&self, mass: f64) -> Matrix3<f64> {
        match self {
            Self::Sphere(s) => s.local_inertia_tensor(mass),
            Self::Box(b) => b.local_inertia_tensor(mass),
            Self::Capsule(c) => c.local_inertia_tensor(mass),
            Self::ConvexMesh(m) => m.local_inertia_tensor(mass),
        }
    }

    /// Value equality: same variant and identical defining parameters.
    ///
    /// Shapes of different kinds are never equal.
    #[must_use]
    pub fn is_equal_to(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Sphere(a), Self::Sphere(b)) => a == b,
            (Self::Box(a), Self::Box(b)) => a == b,
            (Self::Capsule(a), Self::Capsule(b)) => a == b,
            (Self::ConvexMesh(a), Self::ConvexMesh(b)) => a == b,
            _ => false,
        }
    }

    /// Face normals and edge directions, for polyhedral shapes only.
    #[must_use]
    pub fn polyhedron_features(&self) -> Option<PolyhedronFeatures<'_>> {
        match self {
            Self::Box(b) => Some(PolyhedronFeatures {
                face_normals: b.axes(),
                edge_directions: b.axes(),
            }),
            Self::ConvexMesh(m) => Some(PolyhedronFeatures {
                face_normals: m.face_normals(),
                edge_directions: m.edge_directions(),
            }),
            Self::Sphere(_) | Self::Capsule(_) => None,
        }
    }
}

impl From<Sphere> for CollisionShape {
    fn from(shape: Sphere) -> Self {
        Self::Sphere(shape)
    }
}

impl From<BoxShape> for CollisionShape {
    fn from(shape: BoxShape) -> Self {
        Self::Box(shape)
    }
}

impl From<Capsule> for CollisionShape {
    fn from(shape: Capsule) -> Self {
        Self::Capsule(shape)
    }
}

impl From<ConvexMesh> for CollisionShape {
    fn from(shape: ConvexMesh) -> Self {
        Self::ConvexMesh(shape)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn all_shapes() -> Vec<CollisionShape> {
        vec![
            CollisionShape::sphere(0.5),
            CollisionShape::box_shape(Vector3::new(0.5, 1.0, 1.5)),
            CollisionShape::capsule(1.0, 0.25),
            CollisionShape::tetrahedron(0.5),
        ]
    }

    #[test]
    fn test_sphere_support_with_margin_is_scaled_direction() {
        let r = 1.25;
        let sphere = CollisionShape::sphere(r);
        for dir in [
            Vector3::x(),
            Vector3::new(1.0, 2.0, -3.0),
            Vector3::new(-1e-6, 4e-6, 0.0),
        ] {
            let p = sphere.local_support_point_with_margin(&dir);
            assert_eq!(p.coords, dir.normalize() * r);
        }
    }

    #[test]
    fn test_zero_direction_fallback_is_exact() {
        let sphere = CollisionShape::sphere(0.8);
        assert_eq!(
            sphere.local_support_point_with_margin(&Vector3::zeros()),
            Point3::new(0.0, 0.8, 0.0)
        );
        // Below machine epsilon counts as zero
        let tiny = Vector3::new(f64::EPSILON * 0.5, 0.0, 0.0);
        assert_eq!(
            sphere.local_support_point_with_margin(&tiny),
            Point3::new(0.0, 0.8, 0.0)
        );
    }

    #[test]
    fn test_support_with_margin_is_core_plus_skin() {
        let dir = Vector3::new(0.3, -0.4, 1.2);
        for shape in all_shapes() {
            let core = shape.local_support_point_without_margin(&dir);
            let full = shape.local_support_point_with_margin(&dir);
            assert_relative_eq!(
                full - core,
                dir.normalize() * shape.margin(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_world_support_respects_rotation() {
        let shape = CollisionShape::capsule(1.0, 0.5);
        // Rotate local Z onto world X
        let pose = Pose::from_position_rotation(
            Point3::new(2.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, std::f64::consts::FRAC_PI_2, 0.0),
        );
        let p = shape.support_point_with_margin(&pose, &Vector3::x());
        assert_relative_eq!(p.coords, Vector3::new(3.5, 0.0, 0.0), epsilon = 1e-12);
        let core = shape.support_point_without_margin(&pose, &Vector3::x());
        assert_relative_eq!(core.coords, Vector3::new(3.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_aabb() {
        let shape = CollisionShape::sphere(0.5);
        let pose = Pose::from_position_rotation(
            Point3::new(1.0, -2.0, 3.0),
            UnitQuaternion::from_euler_angles(0.4, 0.5, 0.6),
        );
        let aabb = shape.update_aabb(&pose);
        assert_eq!(aabb.min, Point3::new(0.5, -2.5, 2.5));
        assert_eq!(aabb.max, Point3::new(1.5, -1.5, 3.5));
    }

    #[test]
    fn test_rotated_box_aabb() {
        let shape = CollisionShape::box_shape(Vector3::new(1.0, 0.5, 0.5));
        let pose = Pose::from_position_rotation(
            Point3::origin(),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );
        let aabb = shape.update_aabb(&pose);
        assert_relative_eq!(aabb.max.coords, Vector3::new(0.5, 1.0, 0.5), epsilon = 1e-12);
        assert_relative_eq!(aabb.min.coords, Vector3::new(-0.5, -1.0, -0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_mesh_aabb_widened_by_margin() {
        let shape = CollisionShape::ConvexMesh(ConvexMesh::tetrahedron(0.5, 0.1));
        let aabb = shape.update_aabb(&Pose::from_position(Point3::new(1.0, 0.0, 0.0)));
        assert_relative_eq!(aabb.min.coords, Vector3::new(0.4, -0.6, -0.6), epsilon = 1e-12);
        assert_relative_eq!(aabb.max.coords, Vector3::new(1.6, 0.6, 0.6), epsilon = 1e-12);
    }

    #[test]
    fn test_aabb_contains_support_points() {
        let pose = Pose::from_position_rotation(
            Point3::new(-1.0, 0.5, 2.0),
            UnitQuaternion::from_euler_angles(0.3, -1.1, 0.7),
        );
        for shape in all_shapes() {
            let aabb = shape.update_aabb(&pose);
            for i in 0..64 {
                let t = f64::from(i) * 0.37;
                let dir = Vector3::new(t.cos(), (1.3 * t).sin(), (0.7 * t).cos());
                let p = shape.support_point_with_margin(&pose, &dir);
                assert!(
                    aabb.expanded(1e-9).contains_point(&p),
                    "{} support {p:?} outside {aabb:?}",
                    shape.kind()
                );
            }
        }
    }

    #[test]
    fn test_sphere_inertia() {
        let tensor = CollisionShape::sphere(2.0).compute_local_inertia_tensor(3.0);
        let diag = 0.4 * 3.0 * 4.0;
        for i in 0..3 {
            for j in 0..3 {
                let want = if i == j { diag } else { 0.0 };
                assert_eq!(tensor[(i, j)], want);
            }
        }
    }

    #[test]
    fn test_inertia_symmetric_positive_definite() {
        for shape in all_shapes() {
            let tensor = shape.compute_local_inertia_tensor(2.5);
            assert_eq!(tensor, tensor.transpose());
            assert!(tensor.symmetric_eigenvalues().iter().all(|&e| e > 0.0));
        }
    }

    #[test]
    fn test_clone_is_equal_and_independent() {
        for shape in all_shapes() {
            let copy = shape.clone();
            assert!(copy.is_equal_to(&shape));
            drop(copy);
            assert!(shape.margin() > 0.0);
        }

        let mesh = ConvexMesh::tetrahedron(0.5, 0.02);
        let copy = mesh.clone();
        assert_ne!(mesh.vertices().as_ptr(), copy.vertices().as_ptr());
    }

    #[test]
    fn test_is_equal_to() {
        let a = CollisionShape::sphere(1.0);
        assert!(a.is_equal_to(&CollisionShape::sphere(1.0)));
        assert!(!a.is_equal_to(&CollisionShape::sphere(1.5)));
        // Cross-variant comparison is false, never an error
        assert!(!a.is_equal_to(&CollisionShape::capsule(1.0, 1.0)));
        assert!(!CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0))
            .is_equal_to(&CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), 0.1)));
    }

    #[test]
    fn test_kind_table_order() {
        for (i, kind) in ShapeKind::all().into_iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert_eq!(ShapeKind::ConvexMesh.to_string(), "convex_mesh");
        assert!(ShapeKind::Box.is_polyhedral());
        assert!(!ShapeKind::Capsule.is_polyhedral());
    }

    #[test]
    fn test_polyhedron_features() {
        assert!(CollisionShape::sphere(1.0).polyhedron_features().is_none());
        let shape = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));
        let features = shape.polyhedron_features().unwrap();
        assert_eq!(features.face_normals.len(), 3);
        assert_eq!(features.edge_directions.len(), 3);
    }
}
