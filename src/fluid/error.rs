//! Error types for the fluid engine.
//!
//! Only configuration misuse is reported as an error. Numerical divergence
//! during a tick is healed per particle and surfaces in
//! [`StepReport`](super::simulation::StepReport) instead.

use std::fmt;

use bevy::prelude::*;

/// Errors that can occur while configuring a [`FluidSimulation`](super::simulation::FluidSimulation).
#[derive(Debug, Clone, PartialEq)]
pub enum FluidError {
    /// A scalar parameter is out of its valid range.
    InvalidParameter {
        /// Field name in [`FluidParams`](super::params::FluidParams).
        name: &'static str,
        /// Offending value.
        value: f32,
    },
    /// The container box is empty or inverted on at least one axis.
    InvalidBounds { min: Vec3, max: Vec3 },
    /// A particle index does not exist in the simulation.
    ParticleIndex { index: usize, count: usize },
}

impl fmt::Display for FluidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FluidError::InvalidParameter { name, value } => {
                write!(f, "Invalid fluid parameter `{}`: {}", name, value)
            }
            FluidError::InvalidBounds { min, max } => write!(
                f,
                "Invalid container bounds: min {} must be strictly below max {} on every axis",
                min, max
            ),
            FluidError::ParticleIndex { index, count } => write!(
                f,
                "Particle index {} out of range for {} particles",
                index, count
            ),
        }
    }
}

impl std::error::Error for FluidError {}
