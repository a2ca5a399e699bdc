//! Error types for collision setup.
//!
//! Only data that crosses the program boundary (shape parameters loaded from
//! assets, configuration, dispatch overrides) produces these errors. Numerical
//! edge cases inside a collision test are expected inputs and are handled with
//! deterministic fallbacks instead.

use thiserror::Error;

/// Errors that can occur while building shapes or configuring the narrow phase.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Shape parameters violate the shape's invariants.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of the violated invariant.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// A narrow-phase algorithm was assigned to a shape pair it cannot handle.
    #[error("algorithm {algorithm} cannot handle {shape_a}-{shape_b} pairs")]
    UnsupportedAlgorithm {
        /// Name of the algorithm.
        algorithm: String,
        /// Name of the first shape kind.
        shape_a: String,
        /// Name of the second shape kind.
        shape_b: String,
    },
}

impl SimError {
    /// Create an invalid shape error.
    #[must_use]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an unsupported algorithm error.
    #[must_use]
    pub fn unsupported_algorithm(
        algorithm: impl Into<String>,
        shape_a: impl Into<String>,
        shape_b: impl Into<String>,
    ) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
            shape_a: shape_a.into(),
            shape_b: shape_b.into(),
        }
    }

    /// Check if this is a shape error.
    #[must_use]
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Self::InvalidShape { .. })
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}
