//! Separating-axis test for polyhedral pairs (boxes and convex meshes).
//!
//! Candidate axes are tried in a fixed order: the face normals of A, the
//! face normals of B, then the cross products of every edge direction of A
//! with every edge direction of B. Intervals are projected from the
//! margin-exclusive cores and widened by the margins, which is exact on
//! every axis.
//!
//! The axis of minimum overlap wins. A later axis only replaces the current
//! best when its overlap is strictly smaller, and an edge-edge axis must
//! also beat the best by the configured edge preference, since edge
//! contacts are less stable than face contacts.
//!
//! When some axis separates the cores, the shapes can only meet through
//! their rounded edges and corners, whose normals are not among the
//! candidates. The core distance then decides, as it does for GJK.

use nalgebra::{Point3, Vector3};
use sim_types::{NarrowPhaseConfig, Pose};
use tracing::debug;

use super::gjk::{self, CoreDistance};
use super::simplex::{ShapePair, Simplex};
use super::NarrowPhaseAlgorithm;
use crate::arena::{ContactArena, ContactId};
use crate::contact::{ContactGeometry, ContactPointInfo};
use crate::pair::OverlappingPair;
use crate::shape::{CollisionShape, PolyhedronFeatures};

/// Cross products shorter than this come from parallel edges and are skipped.
const PARALLEL_EPSILON: f64 = 1e-10;

/// Which feature produced the best axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisSource {
    FaceA,
    FaceB,
    Edges,
}

/// Best axis found so far.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    /// Unit axis, pointing from A toward B.
    axis: Vector3<f64>,
    /// Overlap of the full shapes, margins included.
    overlap: f64,
    source: AxisSource,
}

/// Result of a search over every candidate axis.
#[derive(Debug, Clone, Copy)]
struct AxisSearch {
    best: Candidate,
    /// Smallest overlap over all axes, edge preference ignored.
    min_overlap: f64,
}

/// Separating-axis narrow-phase algorithm.
#[derive(Debug)]
pub struct SatAlgorithm {
    pair: Option<OverlappingPair>,
    edge_preference: f64,
    simplex: Simplex,
    gjk_max_iterations: usize,
    gjk_relative_tolerance: f64,
}

impl SatAlgorithm {
    /// Create the algorithm with the edge preference and GJK bounds of `config`.
    #[must_use]
    pub fn new(config: &NarrowPhaseConfig) -> Self {
        debug_assert!(
            config.validate().is_ok(),
            "SAT built from an invalid config: {config:?}"
        );
        Self {
            pair: None,
            edge_preference: config.sat_edge_preference,
            simplex: Simplex::new(),
            gjk_max_iterations: config.gjk_max_iterations,
            gjk_relative_tolerance: config.gjk_relative_tolerance,
        }
    }

    /// Find the axis of minimum overlap, or `None` if some axis separates the shapes.
    fn min_overlap_axis(
        &self,
        shape_a: &CollisionShape,
        pose_a: &Pose,
        features_a: &PolyhedronFeatures<'_>,
        shape_b: &CollisionShape,
        pose_b: &Pose,
        features_b: &PolyhedronFeatures<'_>,
    ) -> Option<AxisSearch> {
        let project = |axis: &Vector3<f64>| project_overlap(shape_a, pose_a, shape_b, pose_b, axis);
        let mut best: Option<Candidate> = None;
        let mut min_overlap = f64::INFINITY;

        let faces_a = features_a
            .face_normals
            .iter()
            .map(|n| (pose_a.transform_vector(n), AxisSource::FaceA));
        let faces_b = features_b
            .face_normals
            .iter()
            .map(|n| (pose_b.transform_vector(n), AxisSource::FaceB));

        for (axis, source) in faces_a.chain(faces_b) {
            let candidate = project(&axis)?;
            min_overlap = min_overlap.min(candidate.overlap);
            if best.map_or(true, |b| candidate.overlap < b.overlap) {
                best = Some(Candidate { source, ..candidate });
            }
        }

        for edge_a in features_a.edge_directions {
            let world_a = pose_a.transform_vector(edge_a);
            for edge_b in features_b.edge_directions {
                let axis = world_a.cross(&pose_b.transform_vector(edge_b));
                let len = axis.norm();
                if len < PARALLEL_EPSILON {
                    continue;
                }

                let candidate = project(&(axis / len))?;
                min_overlap = min_overlap.min(candidate.overlap);
                let threshold = best.map_or(f64::INFINITY, |b| b.overlap * self.edge_preference);
                if candidate.overlap < threshold {
                    best = Some(Candidate {
                        source: AxisSource::Edges,
                        ..candidate
                    });
                }
            }
        }

        best.map(|best| AxisSearch { best, min_overlap })
    }

    /// Contact for shapes whose cores some axis separates.
    ///
    /// Apart cores meet only through the margins and the core distance
    /// gives the contact. Cores that merely touch keep `best`.
    fn rounded_contact(
        &mut self,
        shapes: &ShapePair<'_>,
        best: &Candidate,
    ) -> Option<ContactGeometry> {
        let margin_a = shapes.shape_a.margin();
        let margin_b = shapes.shape_b.margin();

        match gjk::core_distance(
            shapes,
            &mut self.simplex,
            self.gjk_max_iterations,
            self.gjk_relative_tolerance,
        ) {
            CoreDistance::Separated {
                distance,
                normal,
                witness_a,
                witness_b,
            } => {
                if distance > margin_a + margin_b {
                    return None;
                }
                Some(gjk::inflate_core_contact(
                    normal, witness_a, witness_b, -distance, margin_a, margin_b,
                ))
            }
            CoreDistance::Overlapping => Some(axis_contact(shapes, best)),
            CoreDistance::NotConverged => {
                debug!(
                    shape_a = %shapes.shape_a.kind(),
                    shape_b = %shapes.shape_b.kind(),
                    max_iterations = self.gjk_max_iterations,
                    "SAT core distance query did not converge"
                );
                None
            }
        }
    }
}

/// Overlap of the projections of A and B on `axis`, with the axis flipped
/// to point from A toward B. Returns `None` on a negative overlap.
///
/// The cores are projected and each interval is widened by its margin.
fn project_overlap(
    shape_a: &CollisionShape,
    pose_a: &Pose,
    shape_b: &CollisionShape,
    pose_b: &Pose,
    axis: &Vector3<f64>,
) -> Option<Candidate> {
    let max_a = shape_a.support_point_without_margin(pose_a, axis).coords.dot(axis);
    let min_a = shape_a.support_point_without_margin(pose_a, &-axis).coords.dot(axis);
    let max_b = shape_b.support_point_without_margin(pose_b, axis).coords.dot(axis);
    let min_b = shape_b.support_point_without_margin(pose_b, &-axis).coords.dot(axis);
    let margin_sum = shape_a.margin() + shape_b.margin();

    // B on the positive side pushes through A's max, and vice versa
    let forward = max_a - min_b;
    let backward = max_b - min_a;
    let overlap = margin_sum + forward.min(backward);
    if overlap < 0.0 {
        return None;
    }

    let axis = if forward < backward {
        *axis
    } else if backward < forward {
        -axis
    } else if (pose_b.position - pose_a.position).dot(axis) >= 0.0 {
        *axis
    } else {
        -axis
    };

    Some(Candidate {
        axis,
        overlap,
        source: AxisSource::FaceA,
    })
}

/// Contact geometry for the winning axis.
///
/// For a face of A the incident shape is B and the witness is B's deepest
/// point, for a face of B it is A's deepest point. Edge axes use B's
/// deepest point.
fn axis_contact(shapes: &ShapePair<'_>, best: &Candidate) -> ContactGeometry {
    let normal = best.axis;
    let depth = best.overlap;

    let (point_on_a, point_on_b): (Point3<f64>, Point3<f64>) = match best.source {
        AxisSource::FaceB => {
            let on_a = shapes.shape_a.support_point_with_margin(shapes.pose_a, &normal);
            (on_a, on_a - normal * depth)
        }
        AxisSource::FaceA | AxisSource::Edges => {
            let on_b = shapes.shape_b.support_point_with_margin(shapes.pose_b, &-normal);
            (on_b + normal * depth, on_b)
        }
    };

    ContactGeometry {
        normal,
        point_on_a,
        point_on_b,
        penetration_depth: depth,
    }
}

impl NarrowPhaseAlgorithm for SatAlgorithm {
    fn bind_overlapping_pair(&mut self, pair: OverlappingPair) {
        self.pair = Some(pair);
        self.simplex.clear();
    }

    fn current_pair(&self) -> Option<OverlappingPair> {
        self.pair
    }

    fn test_collision(
        &mut self,
        shape_a: &CollisionShape,
        pose_a: &Pose,
        shape_b: &CollisionShape,
        pose_b: &Pose,
        arena: &mut ContactArena,
    ) -> Option<ContactId> {
        debug_assert!(
            self.pair.is_some(),
            "test_collision called without a bound overlapping pair"
        );
        let pair = self.pair?;

        let (Some(features_a), Some(features_b)) =
            (shape_a.polyhedron_features(), shape_b.polyhedron_features())
        else {
            debug_assert!(
                false,
                "SAT given non-polyhedral {}-{} pair",
                shape_a.kind(),
                shape_b.kind()
            );
            return None;
        };

        let search =
            self.min_overlap_axis(shape_a, pose_a, &features_a, shape_b, pose_b, &features_b)?;

        let shapes = ShapePair {
            shape_a,
            pose_a,
            shape_b,
            pose_b,
        };
        let geometry = if search.min_overlap < shape_a.margin() + shape_b.margin() {
            self.rounded_contact(&shapes, &search.best)?
        } else {
            axis_contact(&shapes, &search.best)
        };

        Some(arena.allocate(ContactPointInfo::new(
            pair,
            shape_a.kind(),
            pose_a,
            shape_b.kind(),
            pose_b,
            &geometry,
        )))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::narrow::gjk::GjkAlgorithm;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use sim_types::BodyId;
    use std::f64::consts::{FRAC_PI_4, SQRT_2};

    fn pose_at(x: f64, y: f64, z: f64) -> Pose {
        Pose::from_position(Point3::new(x, y, z))
    }

    fn collide(
        shape_a: &CollisionShape,
        pose_a: &Pose,
        shape_b: &CollisionShape,
        pose_b: &Pose,
    ) -> Option<ContactPointInfo> {
        let mut sat = SatAlgorithm::new(&NarrowPhaseConfig::default());
        sat.bind_overlapping_pair(OverlappingPair::new(BodyId::new(0), BodyId::new(1)));
        let mut arena = ContactArena::new();
        let id = sat.test_collision(shape_a, pose_a, shape_b, pose_b, &mut arena)?;
        arena.get(id).copied()
    }

    #[test]
    fn test_axis_aligned_boxes() {
        let a = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));
        let b = CollisionShape::box_shape(Vector3::new(0.5, 0.5, 0.5));

        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(0.2, 1.3, 0.1)).unwrap();
        assert_relative_eq!(contact.penetration_depth, 0.2, epsilon = 1e-12);
        assert_relative_eq!(contact.normal, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_normal_points_from_a_to_b() {
        let a = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));
        let b = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));

        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(-1.9, 0.0, 0.0)).unwrap();
        assert_relative_eq!(contact.normal, -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(contact.penetration_depth, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_separated_boxes() {
        let a = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));
        let b = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));
        assert!(collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(0.0, 0.0, 2.01)).is_none());
    }

    #[test]
    fn test_box_against_equivalent_mesh() {
        let a = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), 0.05);
        let b = CollisionShape::box_with_margin(Vector3::new(0.5, 0.5, 0.5), 0.05);
        let mesh = CollisionShape::ConvexMesh(crate::shape::ConvexMesh::cuboid(
            Vector3::new(0.45, 0.45, 0.45),
            0.05,
        ));
        let pose_b = Pose::from_position_rotation(
            Point3::new(0.1, 0.0, 1.4),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.3),
        );

        let from_box = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_b).unwrap();
        let from_mesh = collide(&a, &pose_at(0.0, 0.0, 0.0), &mesh, &pose_b).unwrap();
        assert_relative_eq!(from_box.penetration_depth, 0.1, epsilon = 1e-9);
        assert_relative_eq!(
            from_box.penetration_depth,
            from_mesh.penetration_depth,
            epsilon = 1e-9
        );
        assert_relative_eq!(from_box.normal, from_mesh.normal, epsilon = 1e-9);
    }

    #[test]
    fn test_crossed_edges_use_edge_axis() {
        let margin = 0.01;
        let a = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), margin);
        let b = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), margin);

        // A shows an edge along X upward, B an edge along Y downward
        let pose_a = Pose::from_position_rotation(
            Point3::origin(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_4),
        );
        let height = 2.0 * SQRT_2 - 0.1;
        let pose_b = Pose::from_position_rotation(
            Point3::new(0.0, 0.0, height),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_4),
        );

        let contact = collide(&a, &pose_a, &b, &pose_b).unwrap();
        let edge_height = (1.0 - margin) * SQRT_2 + margin;
        assert_relative_eq!(
            contact.penetration_depth,
            2.0 * edge_height - height,
            epsilon = 1e-9
        );
        assert_relative_eq!(contact.normal, Vector3::z(), epsilon = 1e-9);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "SAT built from an invalid config")]
    fn test_invalid_edge_preference_rejected_in_debug() {
        let _ = SatAlgorithm::new(&NarrowPhaseConfig::default().sat_edge_preference(0.0));
    }

    #[test]
    fn test_tie_keeps_earliest_axis() {
        // Equal overlap on X and Y: the X face normal of A comes first
        let a = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));
        let b = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));

        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(1.5, 1.5, 0.0)).unwrap();
        assert_relative_eq!(contact.normal, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(contact.penetration_depth, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rounded_corners_match_gjk() {
        let margin = 0.4;
        let a = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), margin);
        let b = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), margin);
        let origin = pose_at(0.0, 0.0, 0.0);
        let mut gjk = GjkAlgorithm::new(&NarrowPhaseConfig::default());
        gjk.bind_overlapping_pair(OverlappingPair::new(BodyId::new(0), BodyId::new(1)));

        // Core corners at 0.6 and c - 0.6 on every axis
        for c in [1.5, 1.6, 1.7, 1.8, 1.9] {
            let pose_b = pose_at(c, c, c);
            let core_gap = 3.0_f64.sqrt() * (c - 1.2);
            let from_sat = collide(&a, &origin, &b, &pose_b);

            let mut arena = ContactArena::new();
            let from_gjk = gjk
                .test_collision(&a, &origin, &b, &pose_b, &mut arena)
                .and_then(|id| arena.get(id).copied());

            if core_gap > 2.0 * margin {
                assert!(from_sat.is_none(), "rounded corners apart at c = {c}");
                assert!(from_gjk.is_none());
                continue;
            }
            let sat_contact = from_sat.unwrap();
            let gjk_contact = from_gjk.unwrap();
            assert_relative_eq!(
                sat_contact.penetration_depth,
                2.0 * margin - core_gap,
                epsilon = 1e-9
            );
            assert_relative_eq!(
                sat_contact.penetration_depth,
                gjk_contact.penetration_depth,
                epsilon = 1e-9
            );
            assert_relative_eq!(
                sat_contact.normal,
                Vector3::new(1.0, 1.0, 1.0).normalize(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_rounded_edges_apart() {
        // Cores are 0.25 apart along a diagonal in XY, margins reach 0.2,
        // yet every face axis still overlaps
        let a = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), 0.1);
        let b = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), 0.1);
        let offset = 1.8 + 0.25 / 2.0_f64.sqrt();
        assert!(collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(offset, offset, 0.0)).is_none());

        // Nudged inside the margin band the edges touch
        let closer = 1.8 + 0.1 / 2.0_f64.sqrt();
        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(closer, closer, 0.0)).unwrap();
        assert_relative_eq!(contact.penetration_depth, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_face_contact_witness_lies_on_incident_shape() {
        let a = CollisionShape::box_shape(Vector3::new(2.0, 2.0, 0.5));
        let b = CollisionShape::box_shape(Vector3::new(0.5, 0.5, 0.5));
        let pose_b = pose_at(0.0, 0.0, 0.9);

        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_b).unwrap();
        assert_relative_eq!(contact.penetration_depth, 0.1, epsilon = 1e-12);
        let on_b = contact.world_point_b(&pose_b);
        assert_relative_eq!(on_b.z, 0.4, epsilon = 1e-12);
    }
}
