//! Minkowski-difference simplices shared by GJK and EPA.

use nalgebra::{Matrix3, Point3, Vector3};
use sim_types::Pose;

use crate::shape::CollisionShape;

/// A point of the Minkowski difference `A - B` with the support points that
/// produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct MinkowskiPoint {
    /// `support_a - support_b`.
    pub point: Point3<f64>,
    /// Support point on shape A, world space.
    pub support_a: Point3<f64>,
    /// Support point on shape B, world space.
    pub support_b: Point3<f64>,
}

impl MinkowskiPoint {
    pub(crate) fn new(support_a: Point3<f64>, support_b: Point3<f64>) -> Self {
        Self {
            point: Point3::from(support_a - support_b),
            support_a,
            support_b,
        }
    }
}

/// The two shapes of a query and their poses.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShapePair<'a> {
    pub shape_a: &'a CollisionShape,
    pub pose_a: &'a Pose,
    pub shape_b: &'a CollisionShape,
    pub pose_b: &'a Pose,
}

impl ShapePair<'_> {
    /// Support point of the core difference `A - B` along `direction`.
    pub(crate) fn support(&self, direction: &Vector3<f64>) -> MinkowskiPoint {
        MinkowskiPoint::new(
            self.shape_a.support_point_without_margin(self.pose_a, direction),
            self.shape_b.support_point_without_margin(self.pose_b, &-direction),
        )
    }

    /// Direction from A's origin toward B's origin, `+X` when they coincide.
    pub(crate) fn center_direction(&self) -> Vector3<f64> {
        let d = self.pose_b.position - self.pose_a.position;
        if d.norm_squared() > f64::EPSILON {
            d.normalize()
        } else {
            Vector3::x()
        }
    }
}

/// A simplex of up to four Minkowski points with barycentric weights.
///
/// Point 0 is the most recently added one.
#[derive(Debug, Clone, Default)]
pub(crate) struct Simplex {
    points: [MinkowskiPoint; 4],
    weights: [f64; 4],
    size: usize,
}

impl Simplex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.size = 0;
    }

    /// Push a point to the front, dropping the oldest one if full.
    pub(crate) fn push(&mut self, point: MinkowskiPoint) {
        for i in (1..=self.size.min(3)).rev() {
            self.points[i] = self.points[i - 1];
            self.weights[i] = self.weights[i - 1];
        }
        self.points[0] = point;
        self.weights[0] = 0.0;
        self.size = (self.size + 1).min(4);
    }

    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn points(&self) -> &[MinkowskiPoint] {
        &self.points[..self.size]
    }

    /// Replace the simplex with the given points, with unit total weight on the first.
    pub(crate) fn set(&mut self, points: &[MinkowskiPoint]) {
        self.size = points.len().min(4);
        for (i, p) in points.iter().take(4).enumerate() {
            self.points[i] = *p;
            self.weights[i] = if i == 0 { 1.0 } else { 0.0 };
        }
    }

    /// Check if a Minkowski point already is a vertex of the simplex.
    pub(crate) fn contains(&self, point: &Point3<f64>) -> bool {
        self.points()
            .iter()
            .any(|p| (p.point - point).norm_squared() <= DUPLICATE_VERTEX_SQ)
    }

    /// Witness points on A and B for the current weights.
    pub(crate) fn witness_points(&self) -> (Point3<f64>, Point3<f64>) {
        let mut a = Vector3::zeros();
        let mut b = Vector3::zeros();
        for (p, w) in self.points().iter().zip(&self.weights) {
            a += p.support_a.coords * *w;
            b += p.support_b.coords * *w;
        }
        (Point3::from(a), Point3::from(b))
    }

    /// Reduce the simplex to the sub-simplex closest to the origin and
    /// return that closest point.
    ///
    /// Returns `None` when the simplex is a tetrahedron enclosing the
    /// origin. The weights then locate the origin inside it.
    pub(crate) fn reduce_to_closest(&mut self) -> Option<Vector3<f64>> {
        let reduced = match self.size {
            1 => Reduced::single(0),
            2 => closest_on_segment(&self.points[0].point, &self.points[1].point),
            3 => closest_on_triangle(
                &self.points[0].point,
                &self.points[1].point,
                &self.points[2].point,
            ),
            4 => match self.closest_on_tetrahedron() {
                Some(face) => face,
                None => {
                    self.locate_origin();
                    return None;
                }
            },
            _ => return Some(Vector3::zeros()),
        };

        let old = self.points;
        self.size = reduced.len;
        let mut closest = Vector3::zeros();
        for i in 0..reduced.len {
            self.points[i] = old[reduced.indices[i]];
            self.weights[i] = reduced.weights[i];
            closest += self.points[i].point.coords * reduced.weights[i];
        }
        Some(closest)
    }

    /// Set the weights to the barycentric coordinates of the origin in the
    /// tetrahedron. Leaves them untouched if the tetrahedron is singular.
    fn locate_origin(&mut self) {
        let a = self.points[0].point;
        let edges = Matrix3::from_columns(&[
            self.points[1].point - a,
            self.points[2].point - a,
            self.points[3].point - a,
        ]);
        if let Some(inverse) = edges.try_inverse() {
            let t = inverse * -a.coords;
            self.weights = [1.0 - t.x - t.y - t.z, t.x, t.y, t.z];
        }
    }

    fn closest_on_tetrahedron(&self) -> Option<Reduced> {
        const FACES: [[usize; 4]; 4] = [[0, 1, 2, 3], [0, 2, 3, 1], [0, 3, 1, 2], [1, 3, 2, 0]];

        let mut best: Option<(f64, Reduced)> = None;
        for [i, j, k, opposite] in FACES {
            let a = self.points[i].point;
            let b = self.points[j].point;
            let c = self.points[k].point;
            let d = self.points[opposite].point;

            let normal = (b - a).cross(&(c - a));
            let sign_origin = normal.dot(&-a.coords);
            let sign_opposite = normal.dot(&(d - a));

            // Flat tetrahedra never enclose anything: test every face.
            let degenerate = sign_opposite.abs() <= f64::EPSILON * normal.norm();
            if !degenerate && sign_origin * sign_opposite >= 0.0 {
                continue;
            }

            let mut face = closest_on_triangle(&a, &b, &c);
            let map = [i, j, k];
            for index in &mut face.indices[..face.len] {
                *index = map[*index];
            }
            let distance_sq = face.closest(&self.points).norm_squared();
            if best.as_ref().map_or(true, |(d, _)| distance_sq < *d) {
                best = Some((distance_sq, face));
            }
        }

        best.map(|(_, face)| face)
    }
}

/// Squared distance under which two Minkowski points are the same vertex.
const DUPLICATE_VERTEX_SQ: f64 = 1e-24;

/// Vertices (by index) and barycentric weights of a sub-simplex.
#[derive(Debug, Clone, Copy)]
struct Reduced {
    indices: [usize; 3],
    weights: [f64; 3],
    len: usize,
}

impl Reduced {
    fn single(index: usize) -> Self {
        Self {
            indices: [index, 0, 0],
            weights: [1.0, 0.0, 0.0],
            len: 1,
        }
    }

    fn pair(i: usize, j: usize, t: f64) -> Self {
        Self {
            indices: [i, j, 0],
            weights: [1.0 - t, t, 0.0],
            len: 2,
        }
    }

    fn closest(&self, points: &[MinkowskiPoint; 4]) -> Vector3<f64> {
        (0..self.len)
            .map(|i| points[self.indices[i]].point.coords * self.weights[i])
            .sum()
    }
}

fn closest_on_segment(a: &Point3<f64>, b: &Point3<f64>) -> Reduced {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON * f64::EPSILON {
        return Reduced::single(0);
    }
    let t = -a.coords.dot(&ab) / len_sq;
    if t <= 0.0 {
        Reduced::single(0)
    } else if t >= 1.0 {
        Reduced::single(1)
    } else {
        Reduced::pair(0, 1, t)
    }
}

/// Closest point of triangle `abc` to the origin, by Voronoi region.
fn closest_on_triangle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Reduced {
    let ab = b - a;
    let ac = c - a;

    let ap = -a.coords;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return Reduced::single(0);
    }

    let bp = -b.coords;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return Reduced::single(1);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return Reduced::pair(0, 1, d1 / (d1 - d3));
    }

    let cp = -c.coords;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return Reduced::single(2);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return Reduced::pair(0, 2, d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return Reduced::pair(1, 2, (d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let sum = va + vb + vc;
    if sum.abs() <= f64::EPSILON {
        // Collinear: the closest point lies on one of the edges
        return [(0, 1), (0, 2), (1, 2)]
            .into_iter()
            .map(|(i, j)| {
                let p = [a, b, c];
                let mut r = closest_on_segment(p[i], p[j]);
                let pick = [i, j];
                for index in &mut r.indices[..r.len] {
                    *index = pick[*index];
                }
                let closest: Vector3<f64> = (0..r.len)
                    .map(|k| p[r.indices[k]].coords * r.weights[k])
                    .sum();
                (closest.norm_squared(), r)
            })
            .min_by(|x, y| x.0.total_cmp(&y.0))
            .map_or(Reduced::single(0), |(_, r)| r);
    }

    let v = vb / sum;
    let w = vc / sum;
    Reduced {
        indices: [0, 1, 2],
        weights: [1.0 - v - w, v, w],
        len: 3,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(x: f64, y: f64, z: f64) -> MinkowskiPoint {
        MinkowskiPoint::new(Point3::new(x, y, z), Point3::origin())
    }

    #[test]
    fn test_push_keeps_newest_first() {
        let mut simplex = Simplex::new();
        simplex.push(point(1.0, 0.0, 0.0));
        simplex.push(point(0.0, 1.0, 0.0));
        assert_eq!(simplex.len(), 2);
        assert_eq!(simplex.points()[0].point, Point3::new(0.0, 1.0, 0.0));
        assert!(simplex.contains(&Point3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_segment_interior() {
        let mut simplex = Simplex::new();
        simplex.push(point(1.0, -1.0, 0.0));
        simplex.push(point(1.0, 1.0, 0.0));

        let closest = simplex.reduce_to_closest().unwrap();
        assert_relative_eq!(closest, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(simplex.len(), 2);
    }

    #[test]
    fn test_triangle_drops_far_vertex() {
        let mut simplex = Simplex::new();
        simplex.push(point(1.0, 0.0, 0.0));
        simplex.push(point(2.0, 1.0, 0.0));
        simplex.push(point(2.0, -1.0, 0.0));

        let closest = simplex.reduce_to_closest().unwrap();
        assert_relative_eq!(closest, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(simplex.len(), 1);
    }

    #[test]
    fn test_triangle_face_region() {
        let mut simplex = Simplex::new();
        simplex.push(point(-1.0, -1.0, 1.0));
        simplex.push(point(1.0, -1.0, 1.0));
        simplex.push(point(0.0, 1.0, 1.0));

        let closest = simplex.reduce_to_closest().unwrap();
        assert_relative_eq!(closest, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
        assert_eq!(simplex.len(), 3);
    }

    #[test]
    fn test_tetrahedron_enclosing_origin() {
        let mut simplex = Simplex::new();
        simplex.push(point(1.0, 1.0, 1.0));
        simplex.push(point(-1.0, -1.0, 1.0));
        simplex.push(point(-1.0, 1.0, -1.0));
        simplex.push(point(1.0, -1.0, -1.0));

        assert!(simplex.reduce_to_closest().is_none());
        assert_eq!(simplex.len(), 4);

        // Regular tetrahedron around the origin: equal weights
        let (a, _) = simplex.witness_points();
        assert_relative_eq!(a, Point3::origin(), epsilon = 1e-12);
    }

    #[test]
    fn test_witness_points_follow_weights() {
        let mut simplex = Simplex::new();
        simplex.push(MinkowskiPoint::new(
            Point3::new(2.0, -1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ));
        simplex.push(MinkowskiPoint::new(
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ));
        simplex.reduce_to_closest().unwrap();

        let (a, b) = simplex.witness_points();
        assert_relative_eq!(a, Point3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(b, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }
}
