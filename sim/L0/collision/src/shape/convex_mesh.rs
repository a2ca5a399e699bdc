//! Convex polyhedron shape.
//!
//! The mesh vertices describe the convex core; the margin is a skin added
//! around it by the margin-inclusive support mapping. Face normals and
//! deduplicated edge directions are derived once at construction and feed the
//! separating-axis test.

use nalgebra::{Matrix3, Point3, Vector3};
use sim_types::{Result, SimError};

/// Minimum length for a derived normal or edge direction to be kept.
const FEATURE_EPSILON: f64 = 1e-12;

/// Convex polyhedron described by its hull vertices and faces.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexMesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<Vec<usize>>,
    face_normals: Vec<Vector3<f64>>,
    edge_directions: Vec<Vector3<f64>>,
    local_min: Point3<f64>,
    local_max: Point3<f64>,
    margin: f64,
}

impl ConvexMesh {
    /// Create a convex mesh from hull vertices and face index loops.
    ///
    /// Faces may be wound either way; normals are oriented away from the
    /// vertex centroid. The input must describe a convex polyhedron with at
    /// least four vertices and four faces (debug-checked contract).
    #[must_use]
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<Vec<usize>>, margin: f64) -> Self {
        debug_assert!(
            Self::check(&vertices, &faces, margin).is_ok(),
            "invalid convex mesh: {:?}",
            Self::check(&vertices, &faces, margin).err()
        );
        Self::build(vertices, faces, margin)
    }

    /// Create a convex mesh from untrusted data.
    pub fn try_new(vertices: Vec<Point3<f64>>, faces: Vec<Vec<usize>>, margin: f64) -> Result<Self> {
        Self::check(&vertices, &faces, margin)?;
        Ok(Self::build(vertices, faces, margin))
    }

    /// Axis-aligned cuboid as a convex mesh (eight vertices, six quads).
    #[must_use]
    pub fn cuboid(half_extents: Vector3<f64>, margin: f64) -> Self {
        let (x, y, z) = (half_extents.x, half_extents.y, half_extents.z);
        let vertices = vec![
            Point3::new(-x, -y, -z),
            Point3::new(x, -y, -z),
            Point3::new(x, y, -z),
            Point3::new(-x, y, -z),
            Point3::new(-x, -y, z),
            Point3::new(x, -y, z),
            Point3::new(x, y, z),
            Point3::new(-x, y, z),
        ];
        let faces = vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![3, 7, 6, 2],
            vec![0, 4, 7, 3],
            vec![1, 2, 6, 5],
        ];
        Self::new(vertices, faces, margin)
    }

    /// Regular tetrahedron on alternating corners of the cube `[-h, h]³`.
    #[must_use]
    pub fn tetrahedron(h: f64, margin: f64) -> Self {
        let vertices = vec![
            Point3::new(h, h, h),
            Point3::new(h, -h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
        ];
        let faces = vec![vec![0, 1, 2], vec![0, 3, 1], vec![0, 2, 3], vec![1, 3, 2]];
        Self::new(vertices, faces, margin)
    }

    fn check(vertices: &[Point3<f64>], faces: &[Vec<usize>], margin: f64) -> Result<()> {
        if !(margin > 0.0 && margin.is_finite()) {
            return Err(SimError::invalid_shape(format!(
                "convex mesh margin must be positive and finite, got {margin}"
            )));
        }
        if vertices.len() < 4 {
            return Err(SimError::invalid_shape(format!(
                "convex mesh needs at least 4 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices
            .iter()
            .any(|v| v.coords.iter().any(|c| !c.is_finite()))
        {
            return Err(SimError::invalid_shape("convex mesh has non-finite vertices"));
        }
        if faces.len() < 4 {
            return Err(SimError::invalid_shape(format!(
                "convex mesh needs at least 4 faces, got {}",
                faces.len()
            )));
        }
        for (i, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(SimError::invalid_shape(format!(
                    "face {i} has {} vertices, need at least 3",
                    face.len()
                )));
            }
            if let Some(&bad) = face.iter().find(|&&idx| idx >= vertices.len()) {
                return Err(SimError::invalid_shape(format!(
                    "face {i} references vertex {bad}, mesh has {}",
                    vertices.len()
                )));
            }
            if polygon_normal(vertices, face).norm() < FEATURE_EPSILON {
                return Err(SimError::invalid_shape(format!("face {i} is degenerate")));
            }
        }
        Ok(())
    }

    fn build(vertices: Vec<Point3<f64>>, faces: Vec<Vec<usize>>, margin: f64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let centroid = vertices
            .iter()
            .map(|v| v.coords)
            .sum::<Vector3<f64>>()
            / vertices.len().max(1) as f64;

        let face_normals = faces
            .iter()
            .map(|face| {
                let normal = polygon_normal(&vertices, face);
                let norm = normal.norm();
                if norm < FEATURE_EPSILON {
                    return Vector3::zeros();
                }
                let normal = normal / norm;
                let anchor = face
                    .first()
                    .and_then(|&i| vertices.get(i))
                    .map_or(centroid, |p| p.coords);
                if normal.dot(&(anchor - centroid)) < 0.0 {
                    -normal
                } else {
                    normal
                }
            })
            .collect();

        let mut edge_directions: Vec<Vector3<f64>> = Vec::new();
        for face in &faces {
            for (k, &i) in face.iter().enumerate() {
                let j = face[(k + 1) % face.len()];
                let (Some(a), Some(b)) = (vertices.get(i), vertices.get(j)) else {
                    continue;
                };
                let Some(dir) = canonical_direction(b - a) else {
                    continue;
                };
                if edge_directions
                    .iter()
                    .all(|e| e.cross(&dir).norm() > 1e-9)
                {
                    edge_directions.push(dir);
                }
            }
        }

        let (local_min, local_max) = vertices.iter().fold(
            (
                Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
                Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            ),
            |(min, max), v| (min.inf(v), max.sup(v)),
        );

        Self {
            vertices,
            faces,
            face_normals,
            edge_directions,
            local_min,
            local_max,
            margin,
        }
    }

    /// Hull vertices in local coordinates.
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Face index loops.
    #[must_use]
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Outward unit face normals, one per face, in face order.
    #[must_use]
    pub fn face_normals(&self) -> &[Vector3<f64>] {
        &self.face_normals
    }

    /// Unique edge directions (unit, sign-canonicalised) in first-seen order.
    #[must_use]
    pub fn edge_directions(&self) -> &[Vector3<f64>] {
        &self.edge_directions
    }

    /// Skin margin.
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Vertex farthest along `direction`; ties resolve to the lowest index.
    #[must_use]
    pub fn local_support_point_without_margin(&self, direction: &Vector3<f64>) -> Point3<f64> {
        let mut max_dot = f64::NEG_INFINITY;
        let mut best_vertex = Point3::origin();

        for vertex in &self.vertices {
            let dot = vertex.coords.dot(direction);
            if dot > max_dot {
                max_dot = dot;
                best_vertex = *vertex;
            }
        }

        best_vertex
    }

    /// Local bounds of the hull vertices (margin not included).
    #[must_use]
    pub fn local_bounds(&self) -> (Point3<f64>, Point3<f64>) {
        (self.local_min, self.local_max)
    }

    /// Inertia tensor about the local origin, approximated by the
    /// margin-inflated bounding box.
    ///
    /// The box tensor is taken about the box centre and moved to the origin
    /// with the parallel-axis theorem.
    #[must_use]
    pub fn local_inertia_tensor(&self, mass: f64) -> Matrix3<f64> {
        let factor = mass / 3.0;
        let extent = (self.local_max - self.local_min) * 0.5;
        let extent = extent.add_scalar(self.margin);
        let sq = extent.component_mul(&extent);
        let about_center = Matrix3::from_diagonal(&Vector3::new(
            factor * (sq.y + sq.z),
            factor * (sq.x + sq.z),
            factor * (sq.x + sq.y),
        ));

        let c = (self.local_min.coords + self.local_max.coords) * 0.5;
        let shift = Matrix3::identity() * c.norm_squared() - c * c.transpose();
        about_center + shift * mass
    }
}

/// Area-weighted normal of a polygon (zero for degenerate or invalid loops).
fn polygon_normal(vertices: &[Point3<f64>], face: &[usize]) -> Vector3<f64> {
    let Some(origin) = face.first().and_then(|&i| vertices.get(i)) else {
        return Vector3::zeros();
    };
    let mut normal = Vector3::zeros();
    for k in 1..face.len().saturating_sub(1) {
        let (Some(b), Some(c)) = (vertices.get(face[k]), vertices.get(face[k + 1])) else {
            return Vector3::zeros();
        };
        normal += (b - origin).cross(&(c - origin));
    }
    normal
}

/// Normalise an edge vector and flip it so its first significant component is positive.
fn canonical_direction(edge: Vector3<f64>) -> Option<Vector3<f64>> {
    let norm = edge.norm();
    if norm < FEATURE_EPSILON {
        return None;
    }
    let dir = edge / norm;
    let leading = dir.iter().copied().find(|c| c.abs() > FEATURE_EPSILON)?;
    Some(if leading < 0.0 { -dir } else { dir })
}
