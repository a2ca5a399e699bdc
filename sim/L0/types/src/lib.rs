//! Core data types for narrow-phase collision detection.
//!
//! This crate provides the foundational value types shared by the collision
//! crates:
//!
//! - [`Pose`] - Rigid transform (position + orientation) of a shape
//! - [`BodyId`] - Opaque reference to the rigid body owning a shape
//! - [`NarrowPhaseConfig`] - Iteration bounds and tolerances
//! - [`SimError`] - Errors for invalid data handed in from outside
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no collision logic. Poses are
//! supplied per query by the caller and are never owned by a shape.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero engine dependencies**. It can be used
//! in headless simulation loops, tools, or other engines.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: up (the degenerate-direction fallback axis of support mappings)
//! - Z: forward; capsules are aligned with local Z
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use sim_types::{Pose, NarrowPhaseConfig};
//! use nalgebra::Point3;
//!
//! let pose = Pose::from_position(Point3::new(0.0, 0.0, 1.0));
//! assert_eq!(pose.position.z, 1.0);
//!
//! let config = NarrowPhaseConfig::default();
//! assert!(config.validate().is_ok());
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod body;
mod config;
mod error;

pub use body::{BodyId, Pose};
pub use config::NarrowPhaseConfig;
pub use error::SimError;

// Re-export math types for convenience
pub use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

/// Result type for collision setup operations.
pub type Result<T> = std::result::Result<T, SimError>;
