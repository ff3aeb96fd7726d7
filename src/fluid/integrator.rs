//! Semi-implicit Euler integration with stability guards.

use bevy::prelude::*;

use super::params::FluidParams;
use super::particle::ParticleSet;

/// Advance every particle by `dt`. Returns the number of particles whose
/// state diverged and was reset.
///
/// A particle whose candidate position is not finite is zeroed (position,
/// velocity and acceleration) without moving; the rest of the set is
/// untouched.
pub fn integrate(particles: &mut ParticleSet, params: &FluidParams, dt: f32) -> usize {
    let mut diverged = 0;

    for i in 0..particles.len() {
        let mut velocity = particles.velocities[i] + particles.accelerations[i] * dt;
        if let Some(drive) = particles.drives[i] {
            let blend = (dt * drive.responsiveness).clamp(0.0, 1.0);
            velocity = velocity.lerp(drive.target_velocity, blend);
        }

        let candidate = particles.positions[i] + velocity * dt;
        if !candidate.is_finite() {
            particles.reset(i);
            diverged += 1;
            continue;
        }
        particles.positions[i] = candidate;

        velocity *= params.damping;
        if !velocity.is_finite() {
            particles.velocities[i] = Vec3::ZERO;
            particles.accelerations[i] = Vec3::ZERO;
            diverged += 1;
            continue;
        }

        particles.velocities[i] = velocity.clamp_length_max(params.max_velocity);
    }

    diverged
}
