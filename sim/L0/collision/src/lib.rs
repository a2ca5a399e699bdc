//! Narrow-phase collision detection for convex rigid bodies.
//!
//! The broad phase hands over pairs of bodies whose bounding boxes overlap.
//! This crate decides whether the shapes really intersect and, when they
//! do, computes an exact contact: world point, unit normal from the first
//! shape toward the second, and penetration depth.
//!
//! # Shapes
//!
//! [`CollisionShape`] is a closed set of convex primitives (sphere, box,
//! capsule, convex mesh). Every shape is a convex *core* inflated by a
//! collision *margin*; the support mapping can be queried with or without
//! that margin. Shapes are immutable and pose-free: the pose comes with
//! every query.
//!
//! # Algorithms
//!
//! | pair | algorithm |
//! |------|-----------|
//! | sphere-sphere | closed form |
//! | box/mesh-box/mesh | separating-axis test |
//! | anything else | GJK distance on the cores, EPA when the cores overlap |
//!
//! The table is a [`CollisionDispatch`] and can be overridden per pair.
//!
//! # Memory
//!
//! Contacts are allocated from a [`ContactArena`] owned by the caller for
//! one simulation step and released in bulk with
//! [`ContactArena::reset_all`]. EPA scratch buffers live in the same arena.
//!
//! # Determinism
//!
//! Identical inputs always give bit-identical contacts.
//! [`NarrowPhase::process_parallel`] returns exactly what
//! [`NarrowPhase::process`] returns, whatever the thread count.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use sim_collision::{
//!     CollisionShape, ContactArena, NarrowPhase, OverlappingPair, PairQuery,
//! };
//! use sim_types::{BodyId, NarrowPhaseConfig, Pose};
//!
//! let narrow_phase = NarrowPhase::new(NarrowPhaseConfig::default()).unwrap();
//! let ground = CollisionShape::box_shape(Vector3::new(10.0, 10.0, 0.5));
//! let ball = CollisionShape::sphere(0.5);
//!
//! let queries = [PairQuery::new(
//!     OverlappingPair::new(BodyId::new(0), BodyId::new(1)),
//!     &ground,
//!     Pose::identity(),
//!     &ball,
//!     Pose::from_position(Point3::new(0.0, 0.0, 0.9)),
//! )];
//!
//! let mut arena = ContactArena::new();
//! let contacts = narrow_phase.process(&queries, &mut arena);
//! let contact = arena.get(contacts[0]).unwrap();
//! assert!((contact.penetration_depth - 0.1).abs() < 1e-6);
//! assert!((contact.normal.z - 1.0).abs() < 1e-6);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-collision/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

pub mod aabb;
pub mod arena;
pub mod contact;
pub mod narrow;
pub mod narrow_phase;
pub mod pair;
pub mod shape;

pub use aabb::Aabb;
pub use arena::{ContactArena, ContactId};
pub use contact::{ContactGeometry, ContactPointInfo};
pub use narrow::{
    AlgorithmKind, CollisionDispatch, GjkAlgorithm, NarrowPhaseAlgorithm, NarrowPhaseWorker,
    SatAlgorithm, SphereVsSphereAlgorithm,
};
pub use narrow_phase::NarrowPhase;
pub use pair::{OverlappingPair, PairQuery};
pub use shape::{
    BoxShape, Capsule, CollisionShape, ConvexMesh, PolyhedronFeatures, ShapeKind, Sphere,
    DEFAULT_MARGIN,
};

// Re-export the value types every query needs
pub use sim_types::{BodyId, NarrowPhaseConfig, Pose, SimError};
