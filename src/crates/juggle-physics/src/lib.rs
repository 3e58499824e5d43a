//! Ballistic solver for juggling throws
//!
//! This crate answers one question: given where a prop leaves a hand, where
//! it has to arrive, and how long it may be in the air, what launch velocity
//! gets it there?
//! - Closed-form launch velocity for plain parabolic flights
//! - Single-bounce flights via a cubic in the bounce time (Halley + deflation)
//! - Multi-bounce flights via safeguarded Newton with bisection fallback
//! - Analytic trajectory evaluation for rendering and verification

pub mod calculator;
pub mod trajectory;
pub mod vector;

pub use calculator::{
    calc_init_vel, calc_init_vel_multi_bounce, calc_init_vel_with_bounces, solve_cubic,
    BounceParams, BounceSolution,
};
pub use trajectory::Trajectory;
pub use vector::Vec3;

use serde::{Deserialize, Serialize};

/// Standard gravity in metres per second squared.
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Solver failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    #[error("{method} did not converge after {iterations} iterations")]
    NoConvergence {
        method: &'static str,
        iterations: usize,
    },

    #[error("No trajectory satisfies the constraints: {reason}")]
    NoSolution { reason: String },

    #[error("Invalid solver input: {reason}")]
    InvalidInput { reason: String },
}

impl SolverError {
    pub fn no_solution(reason: impl Into<String>) -> Self {
        SolverError::NoSolution {
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        SolverError::InvalidInput {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Physical environment a pattern is performed in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Physics {
    /// Acceleration vector; the vertical axis is `y`
    pub gravity: Vec3,
    /// Fraction of vertical speed kept after each floor bounce
    pub restitution: f64,
    /// Height of the floor plane
    pub floor: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -STANDARD_GRAVITY, 0.0),
            restitution: 0.8,
            floor: 0.0,
        }
    }
}

impl Physics {
    /// Downward gravity magnitude along the vertical axis
    pub fn g(&self) -> f64 {
        -self.gravity.y
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gravity.is_finite() {
            return Err(SolverError::invalid("gravity must be finite"));
        }
        if !(self.restitution > 0.0 && self.restitution <= 1.0) {
            return Err(SolverError::invalid(format!(
                "restitution {} outside (0, 1]",
                self.restitution
            )));
        }
        if !self.floor.is_finite() {
            return Err(SolverError::invalid("floor height must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_physics() {
        let physics = Physics::default();
        assert_eq!(physics.g(), STANDARD_GRAVITY);
        assert!(physics.validate().is_ok());
    }

    #[test]
    fn test_invalid_restitution() {
        let physics = Physics {
            restitution: 1.5,
            ..Physics::default()
        };
        assert!(matches!(
            physics.validate(),
            Err(SolverError::InvalidInput { .. })
        ));
    }
}
