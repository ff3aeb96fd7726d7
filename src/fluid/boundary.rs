//! Container boundary handling.
//!
//! The container is an axis-aligned box. Containment clamps positions into
//! the box and reflects outward velocity; edge repulsion keeps particles from
//! lingering on the walls. Both operations are idempotent.

use bevy::prelude::*;

use super::params::FluidParams;
use super::particle::ParticleSet;

/// Axis-aligned container with soft edge repulsion.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct BoundaryPolicy {
    /// Minimum corner of the box.
    pub min: Vec3,
    /// Maximum corner of the box.
    pub max: Vec3,
    /// Distance from a face inside which edge repulsion applies.
    pub edge_threshold: f32,
    /// Minimum inward speed near a face.
    pub edge_push: f32,
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        Self::from_params(&FluidParams::default())
    }
}

impl BoundaryPolicy {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            edge_threshold: 0.0,
            edge_push: 0.0,
        }
    }

    pub fn from_params(params: &FluidParams) -> Self {
        Self {
            min: params.bounds_min,
            max: params.bounds_max,
            edge_threshold: params.edge_threshold,
            edge_push: params.edge_push,
        }
    }

    pub fn with_edge_repulsion(mut self, threshold: f32, push: f32) -> Self {
        self.edge_threshold = threshold;
        self.edge_push = push;
        self
    }

    /// Check if a point is inside the box (faces included).
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Clamp `position` into the box. A velocity component pointing out of
    /// a face the particle was clamped against is reflected inward.
    ///
    /// Returns whether the particle touched a face.
    pub fn contain(&self, position: &mut Vec3, velocity: &mut Vec3) -> bool {
        let mut touched = false;

        for axis in 0..3 {
            if position[axis] < self.min[axis] {
                position[axis] = self.min[axis];
                velocity[axis] = velocity[axis].abs();
                touched = true;
            } else if position[axis] > self.max[axis] {
                position[axis] = self.max[axis];
                velocity[axis] = -velocity[axis].abs();
                touched = true;
            }
        }

        touched
    }

    /// Within `edge_threshold` of a face, raise the inward velocity
    /// component to at least `edge_push`.
    pub fn repel_edges(&self, position: Vec3, velocity: &mut Vec3) {
        if self.edge_threshold <= 0.0 {
            return;
        }

        for axis in 0..3 {
            if position[axis] - self.min[axis] < self.edge_threshold {
                velocity[axis] = velocity[axis].max(self.edge_push);
            }
            if self.max[axis] - position[axis] < self.edge_threshold {
                velocity[axis] = velocity[axis].min(-self.edge_push);
            }
        }
    }

    /// Apply containment then edge repulsion to every particle.
    pub fn apply(&self, particles: &mut ParticleSet) {
        for (position, velocity) in particles
            .positions
            .iter_mut()
            .zip(particles.velocities.iter_mut())
        {
            self.contain(position, velocity);
            self.repel_edges(*position, velocity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundaryPolicy {
        BoundaryPolicy::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_contains() {
        let boundary = unit_box();

        assert!(boundary.contains(Vec3::splat(0.5)));
        assert!(boundary.contains(Vec3::ONE));
        assert!(!boundary.contains(Vec3::new(1.5, 0.5, 0.5)));
    }

    #[test]
    fn test_contain_clamps_and_reflects() {
        let boundary = unit_box();

        let mut pos = Vec3::new(-0.1, 0.5, 1.2);
        let mut vel = Vec3::new(-1.0, 0.3, 2.0);

        assert!(boundary.contain(&mut pos, &mut vel));
        assert_eq!(pos, Vec3::new(0.0, 0.5, 1.0));
        assert_eq!(vel, Vec3::new(1.0, 0.3, -2.0));
    }

    #[test]
    fn test_contain_twice_equals_once() {
        let boundary = unit_box();

        let mut pos = Vec3::new(2.0, -3.0, 0.5);
        let mut vel = Vec3::new(0.5, -0.5, 0.1);
        boundary.contain(&mut pos, &mut vel);
        let once = (pos, vel);

        assert!(!boundary.contain(&mut pos, &mut vel));
        assert_eq!((pos, vel), once);
    }

    #[test]
    fn test_edge_repulsion_raises_inward_speed() {
        let boundary = unit_box().with_edge_repulsion(0.2, 0.1);

        let mut vel = Vec3::new(-0.5, 0.5, 0.0);
        boundary.repel_edges(Vec3::new(0.05, 0.5, 0.95), &mut vel);

        // Near min x: pushed inward; y away from faces: unchanged; near max z:
        // pushed toward -z.
        assert_eq!(vel, Vec3::new(0.1, 0.5, -0.1));

        let mut again = vel;
        boundary.repel_edges(Vec3::new(0.05, 0.5, 0.95), &mut again);
        assert_eq!(again, vel);
    }

    #[test]
    fn test_fast_inward_velocity_is_kept() {
        let boundary = unit_box().with_edge_repulsion(0.2, 0.1);

        let mut vel = Vec3::new(3.0, 0.0, 0.0);
        boundary.repel_edges(Vec3::new(0.05, 0.5, 0.5), &mut vel);

        assert_eq!(vel.x, 3.0);
    }
}
