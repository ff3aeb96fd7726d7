//! Collision resolution: the rigid obstacle first, then particle pairs.
//!
//! A particle pushed out of an obstacle this tick skips pair correction in
//! the same tick.

use bevy::prelude::*;
use rand::Rng;

use super::params::FluidParams;
use super::particle::ParticleSet;
use super::solver::COINCIDENT_EPSILON;
use super::spatial::{Neighbor, SpatialHash};

/// Spherical rigid body that particles cannot enter.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct Obstacle {
    pub center: Vec3,
    pub radius: f32,
}

impl Obstacle {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Depth of `point` inside the sphere, or `None` when it is outside.
    pub fn penetration(&self, point: Vec3) -> Option<f32> {
        let dist = point.distance(self.center);
        (dist < self.radius).then(|| self.radius - dist)
    }
}

/// Uniform random vector in the cube `[-scale, scale]^3`.
fn random_offset<R: Rng>(rng: &mut R, scale: f32) -> Vec3 {
    if scale <= 0.0 {
        return Vec3::ZERO;
    }
    Vec3::new(
        rng.random_range(-scale..=scale),
        rng.random_range(-scale..=scale),
        rng.random_range(-scale..=scale),
    )
}

/// Reusable buffers for the collision passes.
#[derive(Clone, Debug, Default)]
pub struct CollisionResolver {
    hit: Vec<bool>,
    neighbors: Vec<Neighbor>,
}

impl CollisionResolver {
    pub fn new(particle_count: usize, neighbor_capacity: usize) -> Self {
        Self {
            hit: vec![false; particle_count],
            neighbors: Vec::with_capacity(neighbor_capacity),
        }
    }

    /// Whether particle `index` was pushed by an obstacle in the last pass.
    pub fn was_hit(&self, index: usize) -> bool {
        self.hit.get(index).copied().unwrap_or(false)
    }

    /// Run both passes. Returns the number of particles pushed by an
    /// obstacle.
    pub fn resolve<R: Rng>(
        &mut self,
        particles: &mut ParticleSet,
        index: &SpatialHash,
        obstacles: &[Obstacle],
        params: &FluidParams,
        dt: f32,
        rng: &mut R,
    ) -> usize {
        let hits = self.resolve_obstacles(particles, obstacles, params);
        self.resolve_pairs(particles, index, params, dt, rng);
        hits
    }

    /// Push particles out of every obstacle along center->particle and add
    /// an outward velocity kick proportional to the penetration.
    pub fn resolve_obstacles(
        &mut self,
        particles: &mut ParticleSet,
        obstacles: &[Obstacle],
        params: &FluidParams,
    ) -> usize {
        self.hit.clear();
        self.hit.resize(particles.len(), false);

        for obstacle in obstacles {
            for i in 0..particles.len() {
                let Some(penetration) = obstacle.penetration(particles.positions[i]) else {
                    continue;
                };
                // A particle exactly at the center has no outward direction.
                let Some(dir) = (particles.positions[i] - obstacle.center).try_normalize() else {
                    continue;
                };
                particles.positions[i] += dir * penetration;
                particles.velocities[i] += dir * penetration * params.obstacle_gain;
                self.hit[i] = true;
            }
        }

        self.hit.iter().filter(|hit| **hit).count()
    }

    /// Separate overlapping pairs within `collision_radius`.
    ///
    /// Candidates come from the index; overlap is measured on current
    /// positions. Each pair is handled once, by its lower index.
    pub fn resolve_pairs<R: Rng>(
        &mut self,
        particles: &mut ParticleSet,
        index: &SpatialHash,
        params: &FluidParams,
        dt: f32,
        rng: &mut R,
    ) {
        let radius = params.collision_radius;
        if radius <= 0.0 {
            return;
        }
        let relax = (dt * params.collision_relaxation).clamp(0.0, 1.0);
        let n = particles.len();

        for i in 0..n {
            if self.was_hit(i) {
                continue;
            }
            index.query(particles.positions[i], radius, &mut self.neighbors);

            for neighbor in &self.neighbors {
                let j = neighbor.index;
                if j <= i || j >= n || self.was_hit(j) {
                    continue;
                }

                let offset = particles.positions[i] - particles.positions[j];
                let dist = offset.length();
                if dist >= radius {
                    continue;
                }

                if dist <= COINCIDENT_EPSILON {
                    let nudge = random_offset(rng, radius * 0.5);
                    particles.positions[i] += nudge;
                    particles.positions[j] -= nudge;
                    continue;
                }

                let dir = offset / dist;
                let correction = dir * (radius - dist) * params.collision_separation * 0.5;
                particles.positions[i] += correction;
                particles.positions[j] -= correction;

                let approach = (particles.velocities[i] - particles.velocities[j]).dot(dir);
                if approach < 0.0 {
                    let cancel = dir * approach * 0.5 * relax;
                    particles.velocities[i] -= cancel;
                    particles.velocities[j] += cancel;
                }

                particles.velocities[i] += random_offset(rng, params.collision_jitter);
                particles.velocities[j] += random_offset(rng, params.collision_jitter);
            }
        }
    }
}
