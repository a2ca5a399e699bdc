//! EPA (Expanding Polytope Algorithm).
//!
//! Once GJK has found the convex cores overlapping, EPA grows the GJK
//! simplex into a polytope whose boundary converges to the boundary of the
//! core difference `A - B`. Every core is a point, a segment or a polytope,
//! so that difference is polyhedral and the expansion terminates on an
//! exact face. The face closest to the origin gives the core penetration,
//! the contact normal and, through its barycentric coordinates, the witness
//! points on both cores. The caller adds the margins.

use nalgebra::{Point3, Vector3};
use sim_types::NarrowPhaseConfig;
use tracing::debug;

use super::simplex::{MinkowskiPoint, ShapePair, Simplex};
use crate::contact::ContactGeometry;

/// Tolerance for degenerate faces and seed points.
const EPSILON: f64 = 1e-10;

/// Iteration and size bounds for one EPA run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EpaLimits {
    pub max_iterations: usize,
    pub max_faces: usize,
    pub tolerance: f64,
}

impl EpaLimits {
    pub(crate) fn from_config(config: &NarrowPhaseConfig) -> Self {
        Self {
            max_iterations: config.epa_max_iterations,
            max_faces: config.epa_max_faces,
            tolerance: config.epa_tolerance,
        }
    }
}

/// A triangle of the polytope, wound counter-clockwise seen from outside.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EpaFace {
    vertices: [usize; 3],
    /// Outward unit normal.
    normal: Vector3<f64>,
    /// Distance from the origin to the face plane.
    distance: f64,
}

/// Polytope buffers, owned by the contact arena and reused between runs.
#[derive(Debug, Default)]
pub(crate) struct EpaScratch {
    vertices: Vec<MinkowskiPoint>,
    faces: Vec<EpaFace>,
    edges: Vec<(usize, usize)>,
}

impl EpaScratch {
    pub(crate) fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.edges.clear();
    }
}

/// Penetration of two overlapping cores.
///
/// `simplex` is the simplex left by the core distance query. The returned
/// depth is the core penetration, witness points lie on the cores.
///
/// A core difference without volume (a sphere centre on a capsule axis,
/// coaxial or crossing capsules, concentric spheres) holds the origin in a
/// flat set: the depth is zero and the normal is perpendicular to that set.
/// If the polytope outgrows `limits` the closest face found so far is used.
pub(crate) fn penetration(
    shapes: &ShapePair<'_>,
    simplex: &Simplex,
    limits: &EpaLimits,
    scratch: &mut EpaScratch,
) -> Option<ContactGeometry> {
    scratch.clear();
    let EpaScratch {
        vertices,
        faces,
        edges,
    } = scratch;

    seed_vertices(shapes, simplex, vertices);
    if vertices.len() < 4 {
        let offset = shapes.pose_b.position - shapes.pose_a.position;
        let (point_on_a, point_on_b) = simplex.witness_points();
        return Some(ContactGeometry {
            normal: flat_normal(vertices, &offset),
            point_on_a,
            point_on_b,
            penetration_depth: 0.0,
        });
    }

    let interior = Point3::from(
        vertices
            .iter()
            .map(|v| v.point.coords)
            .sum::<Vector3<f64>>()
            / 4.0,
    );

    for indices in [[0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2]] {
        match create_face(vertices, indices, &interior) {
            Some(face) => faces.push(face),
            None => {
                debug!("EPA seed tetrahedron has a degenerate face");
                return None;
            }
        }
    }

    for _ in 0..limits.max_iterations {
        let closest_idx = find_closest_face(faces)?;
        let closest = faces[closest_idx];

        let new_point = shapes.support(&closest.normal);
        let new_distance = new_point.point.coords.dot(&closest.normal);
        if new_distance - closest.distance < limits.tolerance {
            return Some(face_contact(vertices, &closest));
        }

        let new_index = vertices.len();
        vertices.push(new_point);

        // Remove every face that sees the new point, keeping its horizon
        edges.clear();
        let mut i = 0;
        while i < faces.len() {
            let face = faces[i];
            let to_new = new_point.point - vertices[face.vertices[0]].point;
            if face.normal.dot(&to_new) > 0.0 {
                let [a, b, c] = face.vertices;
                add_edge(edges, a, b);
                add_edge(edges, b, c);
                add_edge(edges, c, a);
                faces.swap_remove(i);
            } else {
                i += 1;
            }
        }

        if edges.is_empty() {
            // Numerically no face sees the point: the polytope cannot grow
            return Some(face_contact(vertices, &closest));
        }

        for &(a, b) in edges.iter() {
            if let Some(face) = create_face(vertices, [new_index, a, b], &interior) {
                faces.push(face);
            }
        }

        if faces.len() > limits.max_faces {
            break;
        }
    }

    let closest_idx = find_closest_face(faces)?;
    let closest = faces[closest_idx];
    debug!(
        faces = faces.len(),
        max_faces = limits.max_faces,
        max_iterations = limits.max_iterations,
        distance = closest.distance,
        "EPA ran out of budget, using the closest face"
    );
    Some(face_contact(vertices, &closest))
}

/// Copy the GJK simplex and grow it to a full-dimensional tetrahedron.
///
/// Stops short of four points when the core difference is flat.
fn seed_vertices(shapes: &ShapePair<'_>, simplex: &Simplex, vertices: &mut Vec<MinkowskiPoint>) {
    vertices.extend_from_slice(simplex.points());
    if simplex.len() == 4 && tetrahedron_volume(vertices).abs() > EPSILON {
        return;
    }

    // Rebuild from the points that raise the affine dimension
    let candidates: Vec<MinkowskiPoint> = vertices.drain(..).collect();
    let search_dirs = [
        Vector3::x(),
        Vector3::y(),
        Vector3::z(),
        -Vector3::x(),
        -Vector3::y(),
        -Vector3::z(),
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(-1.0, -1.0, -1.0),
    ];
    let extra = search_dirs.iter().map(|dir| shapes.support(dir));

    for point in candidates.into_iter().chain(extra) {
        if vertices.len() == 4 {
            break;
        }
        if raises_dimension(vertices, &point.point) {
            vertices.push(point);
        }
    }

    // Search straight off the current hull: a segment needs two more
    // points, a triangle one
    for _ in 0..2 {
        let Some(dirs) = off_hull_directions(vertices) else {
            break;
        };
        for dir in &dirs {
            if vertices.len() == 4 {
                break;
            }
            let point = shapes.support(dir);
            if raises_dimension(vertices, &point.point) {
                vertices.push(point);
            }
        }
    }
}

/// Directions orthogonal to the affine hull of a segment or triangle.
fn off_hull_directions(vertices: &[MinkowskiPoint]) -> Option<[Vector3<f64>; 4]> {
    match vertices {
        [a, b] => {
            let axis = (b.point - a.point).normalize();
            let side = perpendicular(&axis);
            let up = axis.cross(&side);
            Some([side, -side, up, -up])
        }
        [a, b, c] => {
            let normal = (b.point - a.point).cross(&(c.point - a.point));
            Some([normal, -normal, normal, -normal])
        }
        _ => None,
    }
}

/// A unit vector perpendicular to the unit vector `axis`.
fn perpendicular(axis: &Vector3<f64>) -> Vector3<f64> {
    // Cross with the coordinate axis least aligned with `axis`
    let mut least = 0;
    for i in 1..3 {
        if axis[i].abs() < axis[least].abs() {
            least = i;
        }
    }
    let mut helper = Vector3::zeros();
    helper[least] = 1.0;
    axis.cross(&helper).normalize()
}

/// Normal for a core difference with fewer than three dimensions.
///
/// A plane uses its normal, a line the component of `offset` across it (or
/// any perpendicular), a point `offset` itself. The result points along
/// `offset` where that is defined, and falls back to `+Y`.
fn flat_normal(vertices: &[MinkowskiPoint], offset: &Vector3<f64>) -> Vector3<f64> {
    let candidate = match vertices {
        [a, b, c, ..] => (b.point - a.point).cross(&(c.point - a.point)),
        [a, b] => {
            let axis = (b.point - a.point).normalize();
            let across = offset - axis * axis.dot(offset);
            if across.norm() > EPSILON {
                across
            } else {
                perpendicular(&axis)
            }
        }
        _ => *offset,
    };

    let norm = candidate.norm();
    if norm < EPSILON {
        return Vector3::y();
    }
    let normal = candidate / norm;
    if normal.dot(offset) < 0.0 {
        -normal
    } else {
        normal
    }
}

fn raises_dimension(vertices: &[MinkowskiPoint], p: &Point3<f64>) -> bool {
    match vertices {
        [] => true,
        [a] => (p - a.point).norm() > EPSILON,
        [a, b] => (b.point - a.point).cross(&(p - a.point)).norm() > EPSILON,
        [a, b, c] => {
            let normal = (b.point - a.point).cross(&(c.point - a.point));
            normal.dot(&(p - a.point)).abs() > EPSILON
        }
        _ => false,
    }
}

fn tetrahedron_volume(vertices: &[MinkowskiPoint]) -> f64 {
    let a = vertices[0].point;
    let ab = vertices[1].point - a;
    let ac = vertices[2].point - a;
    let ad = vertices[3].point - a;
    ab.cross(&ac).dot(&ad)
}

/// Build a face, oriented so its normal points away from `interior`.
fn create_face(
    vertices: &[MinkowskiPoint],
    mut indices: [usize; 3],
    interior: &Point3<f64>,
) -> Option<EpaFace> {
    let a = vertices[indices[0]].point;
    let b = vertices[indices[1]].point;
    let c = vertices[indices[2]].point;

    let mut normal = (b - a).cross(&(c - a));
    let norm = normal.norm();
    if norm < EPSILON {
        return None;
    }
    normal /= norm;

    if normal.dot(&(a - interior)) < 0.0 {
        normal = -normal;
        indices.swap(1, 2);
    }

    Some(EpaFace {
        vertices: indices,
        normal,
        distance: a.coords.dot(&normal),
    })
}

/// Index of the face closest to the origin; ties keep the earliest face.
fn find_closest_face(faces: &[EpaFace]) -> Option<usize> {
    faces
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.distance.abs().total_cmp(&b.distance.abs()))
        .map(|(i, _)| i)
}

/// Add a horizon edge, cancelling it if the opposite face already added it.
fn add_edge(edges: &mut Vec<(usize, usize)>, v1: usize, v2: usize) {
    let existing = edges
        .iter()
        .position(|&(a, b)| (a == v2 && b == v1) || (a == v1 && b == v2));

    if let Some(idx) = existing {
        edges.swap_remove(idx);
    } else {
        edges.push((v1, v2));
    }
}

/// Contact geometry from the closest face.
fn face_contact(vertices: &[MinkowskiPoint], face: &EpaFace) -> ContactGeometry {
    let [ia, ib, ic] = face.vertices;
    let (a, b, c) = (vertices[ia], vertices[ib], vertices[ic]);

    let projection = Point3::from(face.normal * face.distance);
    let [u, v, w] = barycentric(&projection, &a.point, &b.point, &c.point);

    let point_on_a = Point3::from(
        a.support_a.coords * u + b.support_a.coords * v + c.support_a.coords * w,
    );
    let point_on_b = Point3::from(
        a.support_b.coords * u + b.support_b.coords * v + c.support_b.coords * w,
    );

    ContactGeometry {
        normal: face.normal,
        point_on_a,
        point_on_b,
        penetration_depth: face.distance.max(0.0),
    }
}

/// Barycentric coordinates of `p` in triangle `abc`.
fn barycentric(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> [f64; 3] {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < EPSILON * EPSILON {
        return [1.0, 0.0, 0.0];
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    [1.0 - v - w, v, w]
}
