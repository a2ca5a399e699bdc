//! Configuration for the narrow phase.
//!
//! Iteration bounds and tolerances for the iterative algorithms (GJK, EPA)
//! and the separating-axis edge preference.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning parameters shared by every narrow-phase algorithm.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NarrowPhaseConfig {
    /// Maximum GJK iterations before the query reports no definitive contact.
    pub gjk_max_iterations: usize,
    /// Relative squared-distance improvement below which GJK has converged.
    pub gjk_relative_tolerance: f64,
    /// Maximum EPA expansion steps before the query reports no definitive contact.
    pub epa_max_iterations: usize,
    /// Maximum number of faces the EPA polytope may grow to.
    pub epa_max_faces: usize,
    /// EPA convergence tolerance (absolute distance along the face normal).
    pub epa_tolerance: f64,
    /// An edge-edge SAT axis replaces the best face axis only when its
    /// overlap is below `best * sat_edge_preference`.
    pub sat_edge_preference: f64,
}

impl Default for NarrowPhaseConfig {
    fn default() -> Self {
        Self {
            gjk_max_iterations: 64,
            gjk_relative_tolerance: 1e-6,
            epa_max_iterations: 64,
            epa_max_faces: 128,
            epa_tolerance: 1e-6,
            sat_edge_preference: 0.95,
        }
    }
}

impl NarrowPhaseConfig {
    /// Configuration with tighter tolerances and larger iteration budgets.
    #[must_use]
    pub fn precise() -> Self {
        Self {
            gjk_max_iterations: 128,
            gjk_relative_tolerance: 1e-10,
            epa_max_iterations: 128,
            epa_max_faces: 256,
            epa_tolerance: 1e-9,
            ..Default::default()
        }
    }

    /// Configuration trading accuracy for speed.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            gjk_max_iterations: 32,
            gjk_relative_tolerance: 1e-4,
            epa_max_iterations: 32,
            epa_max_faces: 64,
            epa_tolerance: 1e-4,
            ..Default::default()
        }
    }

    /// Set the GJK iteration bound.
    #[must_use]
    pub fn gjk_max_iterations(mut self, iterations: usize) -> Self {
        self.gjk_max_iterations = iterations;
        self
    }

    /// Set the relative GJK convergence tolerance.
    #[must_use]
    pub fn gjk_relative_tolerance(mut self, tolerance: f64) -> Self {
        self.gjk_relative_tolerance = tolerance;
        self
    }

    /// Set the EPA iteration bound.
    #[must_use]
    pub fn epa_max_iterations(mut self, iterations: usize) -> Self {
        self.epa_max_iterations = iterations;
        self
    }

    /// Set the maximum number of EPA polytope faces.
    #[must_use]
    pub fn epa_max_faces(mut self, faces: usize) -> Self {
        self.epa_max_faces = faces;
        self
    }

    /// Set the EPA convergence tolerance.
    #[must_use]
    pub fn epa_tolerance(mut self, tolerance: f64) -> Self {
        self.epa_tolerance = tolerance;
        self
    }

    /// Set the SAT edge-axis preference factor.
    #[must_use]
    pub fn sat_edge_preference(mut self, factor: f64) -> Self {
        self.sat_edge_preference = factor;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if self.gjk_max_iterations == 0 {
            return Err(crate::SimError::invalid_config(
                "gjk_max_iterations must be at least 1",
            ));
        }
        if self.epa_max_iterations == 0 {
            return Err(crate::SimError::invalid_config(
                "epa_max_iterations must be at least 1",
            ));
        }
        // The initial tetrahedron already has four faces.
        if self.epa_max_faces < 4 {
            return Err(crate::SimError::invalid_config(format!(
                "epa_max_faces must be at least 4, got {}",
                self.epa_max_faces
            )));
        }
        for (name, value) in [
            ("gjk_relative_tolerance", self.gjk_relative_tolerance),
            ("epa_tolerance", self.epa_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(crate::SimError::invalid_config(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !(self.sat_edge_preference > 0.0 && self.sat_edge_preference <= 1.0) {
            return Err(crate::SimError::invalid_config(format!(
                "sat_edge_preference must be in (0, 1], got {}",
                self.sat_edge_preference
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NarrowPhaseConfig::default();
        assert_eq!(config.gjk_max_iterations, 64);
        assert_eq!(config.sat_edge_preference, 0.95);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(NarrowPhaseConfig::precise().validate().is_ok());
        assert!(NarrowPhaseConfig::fast().validate().is_ok());
        assert!(
            NarrowPhaseConfig::precise().epa_tolerance < NarrowPhaseConfig::fast().epa_tolerance
        );
    }

    #[test]
    fn test_builder() {
        let config = NarrowPhaseConfig::default()
            .gjk_max_iterations(10)
            .gjk_relative_tolerance(1e-8)
            .epa_max_iterations(20)
            .epa_max_faces(48)
            .epa_tolerance(1e-3)
            .sat_edge_preference(1.0);
        assert_eq!(config.gjk_max_iterations, 10);
        assert_eq!(config.gjk_relative_tolerance, 1e-8);
        assert_eq!(config.epa_max_iterations, 20);
        assert_eq!(config.epa_max_faces, 48);
        assert_eq!(config.epa_tolerance, 1e-3);
        assert_eq!(config.sat_edge_preference, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = NarrowPhaseConfig::default().gjk_max_iterations(0);
        assert!(config.validate().unwrap_err().is_config_error());

        let config = NarrowPhaseConfig::default().epa_max_iterations(0);
        assert!(config.validate().is_err());

        let config = NarrowPhaseConfig::default().epa_max_faces(3);
        assert!(config.validate().is_err());

        let config = NarrowPhaseConfig::default().epa_tolerance(0.0);
        assert!(config.validate().is_err());

        let config = NarrowPhaseConfig::default().gjk_relative_tolerance(f64::NAN);
        assert!(config.validate().is_err());

        let config = NarrowPhaseConfig::default().sat_edge_preference(1.5);
        assert!(config.validate().is_err());
    }
}
