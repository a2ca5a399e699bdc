//! Shape-level properties: support mappings, bounds, inertia and value semantics.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use approx::assert_relative_eq;
use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_collision::{CollisionShape, ConvexMesh, ShapeKind};
use sim_types::Pose;

fn random_direction(rng: &mut StdRng) -> Vector3<f64> {
    loop {
        let d = Vector3::new(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        );
        if d.norm() > 1e-3 {
            return d;
        }
    }
}

fn sample_shapes() -> Vec<CollisionShape> {
    vec![
        CollisionShape::sphere(0.7),
        CollisionShape::box_with_margin(Vector3::new(0.5, 1.0, 1.5), 0.05),
        CollisionShape::capsule(0.8, 0.3),
        CollisionShape::ConvexMesh(ConvexMesh::tetrahedron(0.6, 0.02)),
    ]
}

// ============================================================================
// Sphere
// ============================================================================

#[test]
fn sphere_support_is_scaled_direction() {
    let mut rng = StdRng::seed_from_u64(7);
    for radius in [0.01, 0.5, 3.0] {
        let sphere = CollisionShape::sphere(radius);
        for _ in 0..100 {
            let d = random_direction(&mut rng);
            let p = sphere.local_support_point_with_margin(&d);
            assert_relative_eq!(p.coords, d.normalize() * radius, epsilon = 1e-12);
        }
    }
}

#[test]
fn sphere_zero_direction_fallback_is_exact() {
    for radius in [0.25, 1.0, 4.5] {
        let sphere = CollisionShape::sphere(radius);
        let p = sphere.local_support_point_with_margin(&Vector3::zeros());
        assert_eq!(p, Point3::new(0.0, radius, 0.0));
    }
}

#[test]
fn sphere_aabb_follows_position_only() {
    let sphere = CollisionShape::sphere(0.5);
    let pose = Pose::from_position_rotation(
        Point3::new(1.0, -2.0, 3.0),
        UnitQuaternion::from_euler_angles(0.4, 1.2, -0.7),
    );

    let aabb = sphere.update_aabb(&pose);
    assert_eq!(aabb.min, Point3::new(0.5, -2.5, 2.5));
    assert_eq!(aabb.max, Point3::new(1.5, -1.5, 3.5));
}

#[test]
fn sphere_inertia_is_diagonal() {
    let sphere = CollisionShape::sphere(2.0);
    let inertia = sphere.compute_local_inertia_tensor(3.0);

    let expected = 0.4 * 3.0 * 4.0;
    assert_eq!(inertia, Matrix3::from_diagonal_element(expected));
}

// ============================================================================
// All shapes
// ============================================================================

#[test]
fn support_with_margin_adds_margin_along_direction() {
    let mut rng = StdRng::seed_from_u64(11);
    for shape in sample_shapes() {
        for _ in 0..50 {
            let d = random_direction(&mut rng);
            let with = shape.local_support_point_with_margin(&d);
            let without = shape.local_support_point_without_margin(&d);
            assert_relative_eq!(
                with - without,
                d.normalize() * shape.margin(),
                epsilon = 1e-12
            );
        }
    }
}

#[test]
fn support_point_maximises_projection() {
    let mut rng = StdRng::seed_from_u64(13);
    for shape in sample_shapes() {
        for _ in 0..50 {
            let d = random_direction(&mut rng);
            let best = shape.local_support_point_with_margin(&d).coords.dot(&d);
            for _ in 0..10 {
                let other = shape
                    .local_support_point_with_margin(&random_direction(&mut rng))
                    .coords
                    .dot(&d);
                assert!(other <= best + 1e-9, "{} support not extremal", shape.kind());
            }
        }
    }
}

#[test]
fn world_aabb_contains_world_supports() {
    let mut rng = StdRng::seed_from_u64(17);
    let pose = Pose::from_position_rotation(
        Point3::new(0.3, 2.0, -1.0),
        UnitQuaternion::from_euler_angles(0.9, -0.2, 2.4),
    );

    for shape in sample_shapes() {
        let aabb = shape.update_aabb(&pose).expanded(1e-9);
        for _ in 0..100 {
            let p = shape.support_point_with_margin(&pose, &random_direction(&mut rng));
            assert!(aabb.contains_point(&p), "{} escapes its AABB", shape.kind());
        }
    }
}

#[test]
fn inertia_is_symmetric_positive_definite() {
    for shape in sample_shapes() {
        let inertia = shape.compute_local_inertia_tensor(2.5);
        assert_relative_eq!(inertia, inertia.transpose(), epsilon = 1e-12);
        let eigen = inertia.symmetric_eigenvalues();
        assert!(eigen.iter().all(|&e| e > 0.0), "{} inertia not SPD", shape.kind());
    }
}

#[test]
fn clone_is_equal_and_independent() {
    for shape in sample_shapes() {
        let copy = shape.clone();
        assert!(copy.is_equal_to(&shape));
        drop(shape);
        assert!(copy.margin() > 0.0);
    }
}

#[test]
fn cross_variant_comparison_is_false() {
    let shapes = sample_shapes();
    for (i, a) in shapes.iter().enumerate() {
        for (j, b) in shapes.iter().enumerate() {
            assert_eq!(a.is_equal_to(b), i == j);
        }
    }

    // Same kind, different parameters
    assert!(!CollisionShape::sphere(1.0).is_equal_to(&CollisionShape::sphere(1.5)));
}

#[test]
fn kinds_match_variants() {
    let kinds: Vec<ShapeKind> = sample_shapes().iter().map(CollisionShape::kind).collect();
    assert_eq!(kinds, ShapeKind::all().to_vec());
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "sphere radius")]
fn non_positive_radius_is_a_contract_error() {
    let _ = CollisionShape::sphere(0.0);
}

#[test]
fn fallible_constructors_report_invalid_shapes() {
    let err = sim_collision::Sphere::try_new(-1.0).unwrap_err();
    assert!(err.is_shape_error());

    let err = ConvexMesh::try_new(vec![Point3::origin(); 4], vec![vec![0, 1, 9]], 0.04).unwrap_err();
    assert!(err.is_shape_error());
}
