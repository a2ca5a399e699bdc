//! Benchmarks for narrow-phase collision detection.
//!
//! Run with: cargo bench -p sim-collision

#![allow(
    missing_docs,
    clippy::cast_precision_loss,
    clippy::unwrap_used,
    clippy::expect_used
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::Rng;

use sim_collision::{
    CollisionShape, ContactArena, NarrowPhase, NarrowPhaseAlgorithm, OverlappingPair, PairQuery,
    SphereVsSphereAlgorithm,
};
use sim_types::{BodyId, NarrowPhaseConfig, Pose};

fn random_pose(rng: &mut impl Rng, spread: f64) -> Pose {
    Pose::from_position_rotation(
        Point3::new(
            rng.gen_range(-spread..spread),
            rng.gen_range(-spread..spread),
            rng.gen_range(-spread..spread),
        ),
        UnitQuaternion::from_euler_angles(
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-1.5..1.5),
            rng.gen_range(-3.0..3.0),
        ),
    )
}

fn random_shapes(rng: &mut impl Rng, count: usize) -> Vec<CollisionShape> {
    (0..count)
        .map(|i| match i % 4 {
            0 => CollisionShape::sphere(rng.gen_range(0.2..0.6)),
            1 => CollisionShape::box_shape(Vector3::new(0.4, 0.3, 0.5)),
            2 => CollisionShape::capsule(0.4, 0.2),
            _ => CollisionShape::tetrahedron(0.5),
        })
        .collect()
}

fn bench_sphere_sphere(c: &mut Criterion) {
    let a = CollisionShape::sphere(1.0);
    let b = CollisionShape::sphere(0.5);
    let pose_a = Pose::identity();
    let pose_b = Pose::from_position(Point3::new(1.2, 0.3, 0.0));
    let mut algorithm = SphereVsSphereAlgorithm::new();
    algorithm.bind_overlapping_pair(OverlappingPair::new(BodyId::new(0), BodyId::new(1)));
    let mut arena = ContactArena::with_capacity(1);

    c.bench_function("sphere_sphere", |bench| {
        bench.iter(|| {
            arena.reset_all();
            black_box(algorithm.test_collision(
                black_box(&a),
                &pose_a,
                black_box(&b),
                &pose_b,
                &mut arena,
            ))
        });
    });
}

fn bench_pair_kinds(c: &mut Criterion) {
    let narrow_phase = NarrowPhase::new(NarrowPhaseConfig::default()).unwrap();
    let cube = CollisionShape::box_shape(Vector3::new(0.5, 0.5, 0.5));
    let ball = CollisionShape::sphere(0.5);
    let capsule = CollisionShape::capsule(0.5, 0.25);
    let tetra = CollisionShape::tetrahedron(0.5);
    let tilted = UnitQuaternion::from_euler_angles(0.3, 0.2, 0.1);

    let cases = [
        ("box_box_sat", &cube, &cube, 0.95),
        ("box_sphere_margin", &cube, &ball, 0.97),
        ("box_sphere_deep", &cube, &ball, 0.6),
        ("capsule_tetra", &capsule, &tetra, 0.9),
    ];

    let mut group = c.benchmark_group("pair_kinds");
    for (name, a, b, offset) in cases {
        let queries = [PairQuery::new(
            OverlappingPair::new(BodyId::new(0), BodyId::new(1)),
            a,
            Pose::identity(),
            b,
            Pose::from_position_rotation(Point3::new(0.0, 0.0, offset), tilted),
        )];
        let mut arena = ContactArena::new();

        group.bench_function(name, |bench| {
            bench.iter(|| {
                arena.reset_all();
                black_box(narrow_phase.process(black_box(&queries), &mut arena))
            });
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let narrow_phase = NarrowPhase::new(NarrowPhaseConfig::default()).unwrap();
    let mut rng = rand::thread_rng();

    let mut group = c.benchmark_group("batch");
    for count in [64, 256, 1024] {
        let shapes = random_shapes(&mut rng, count);
        let poses: Vec<Pose> = (0..count).map(|_| random_pose(&mut rng, 1.0)).collect();
        let queries: Vec<PairQuery<'_>> = (0..count)
            .map(|i| {
                let j = (i + 1) % count;
                PairQuery::new(
                    OverlappingPair::new(BodyId::new(i as u64), BodyId::new(j as u64)),
                    &shapes[i],
                    poses[i],
                    &shapes[j],
                    poses[j],
                )
            })
            .collect();
        let mut arena = ContactArena::with_capacity(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("sequential", count), &queries, |bench, q| {
            bench.iter(|| {
                arena.reset_all();
                black_box(narrow_phase.process(q, &mut arena))
            });
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), &queries, |bench, q| {
            bench.iter(|| {
                arena.reset_all();
                black_box(narrow_phase.process_parallel(q, &mut arena))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sphere_sphere, bench_pair_kinds, bench_batch);
criterion_main!(benches);
