//! Particle storage.
//!
//! Particles live in parallel arrays (structure of arrays). A particle's
//! identity is its index, which never changes: the core neither spawns nor
//! removes particles after initialization.

use bevy::prelude::*;
use rand::Rng;

/// External velocity drive layered on top of a particle's simulated motion.
///
/// Each tick the integrator blends the particle velocity toward
/// `target_velocity` by `min(1, dt * responsiveness)`.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct Drive {
    pub target_velocity: Vec3,
    pub responsiveness: f32,
}

impl Drive {
    pub fn new(target_velocity: Vec3) -> Self {
        Self {
            target_velocity,
            responsiveness: 3.0,
        }
    }

    pub fn with_responsiveness(mut self, responsiveness: f32) -> Self {
        self.responsiveness = responsiveness;
        self
    }
}

/// Structure-of-arrays particle state.
#[derive(Clone, Debug, Default)]
pub struct ParticleSet {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    /// Recomputed every tick by the force pass.
    pub accelerations: Vec<Vec3>,
    /// Cached every tick by the density pass.
    pub densities: Vec<f32>,
    pub drives: Vec<Option<Drive>>,
}

impl ParticleSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            velocities: Vec::with_capacity(capacity),
            accelerations: Vec::with_capacity(capacity),
            densities: Vec::with_capacity(capacity),
            drives: Vec::with_capacity(capacity),
        }
    }

    /// Particles at rest at the given positions.
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        let n = positions.len();
        Self {
            positions,
            velocities: vec![Vec3::ZERO; n],
            accelerations: vec![Vec3::ZERO; n],
            densities: vec![0.0; n],
            drives: vec![None; n],
        }
    }

    /// `count` particles at rest, uniformly scattered inside `[min, max]`.
    pub fn scattered<R: Rng>(count: usize, min: Vec3, max: Vec3, rng: &mut R) -> Self {
        let positions = (0..count)
            .map(|_| {
                Vec3::new(
                    rng.random_range(min.x..=max.x),
                    rng.random_range(min.y..=max.y),
                    rng.random_range(min.z..=max.z),
                )
            })
            .collect();
        Self::from_positions(positions)
    }

    pub fn push(&mut self, position: Vec3, velocity: Vec3) {
        self.positions.push(position);
        self.velocities.push(velocity);
        self.accelerations.push(Vec3::ZERO);
        self.densities.push(0.0);
        self.drives.push(None);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Zero position, velocity and acceleration of one particle.
    pub fn reset(&mut self, index: usize) {
        self.positions[index] = Vec3::ZERO;
        self.velocities[index] = Vec3::ZERO;
        self.accelerations[index] = Vec3::ZERO;
    }
}
