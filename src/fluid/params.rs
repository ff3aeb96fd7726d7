//! Fluid simulation parameters.
//!
//! These parameters control the behavior of the air simulation. They are
//! validated once when a [`FluidSimulation`](super::simulation::FluidSimulation)
//! is created and stay fixed for its lifetime.

use bevy::prelude::*;

use super::error::FluidError;
use super::kernel::SmoothingKernel;

/// Parameters controlling the fluid simulation behavior.
///
/// Defaults are tuned for a few hundred particles in a 10-unit cube of air.
#[derive(Clone, Debug, Reflect)]
pub struct FluidParams {
    /// Number of particles placed at initialization.
    pub particle_count: usize,

    /// Container volume (min corner).
    pub bounds_min: Vec3,

    /// Container volume (max corner).
    pub bounds_max: Vec3,

    /// Edge length of a spatial index cell.
    /// Usually equal to the smoothing radius so a query scans 3x3x3 cells.
    pub cell_size: f32,

    /// Smoothing kernel radius (h).
    pub smoothing_radius: f32,

    /// Mass of every particle.
    pub particle_mass: f32,

    /// Rest density the pressure term pushes the field toward.
    pub target_density: f32,

    /// Pressure stiffness: pressure = (density - target) * multiplier.
    pub pressure_multiplier: f32,

    /// Pressures with a magnitude below this are treated as zero.
    pub pressure_deadband: f32,

    /// Density floor. Keeps every division by density well defined.
    pub min_density: f32,

    /// Density diffusion coefficient (0 disables the term).
    pub diffusion: f32,

    /// Distance below which the inverse-square repulsion kicks in.
    /// Must be smaller than the smoothing radius.
    pub repulsion_radius: f32,

    /// Strength of the short-range inverse-square repulsion.
    pub repulsion_strength: f32,

    /// Aerodynamic drag coefficient.
    pub drag_coefficient: f32,

    /// Aerodynamic lift coefficient.
    pub lift_coefficient: f32,

    /// Density of the surrounding medium used by drag and lift.
    pub fluid_density: f32,

    /// Cross-sectional area of a particle used by drag and lift.
    pub cross_section_area: f32,

    /// Reference axis for lift: lift acts along `velocity x lift_axis`.
    pub lift_axis: Vec3,

    /// Minimum distance maintained between particles.
    pub collision_radius: f32,

    /// Fraction of the overlap removed per collision (0..=1).
    pub collision_separation: f32,

    /// Rate (1/s) at which approaching velocity is blended out on contact.
    pub collision_relaxation: f32,

    /// Bound of the random velocity jitter added on contact.
    pub collision_jitter: f32,

    /// Velocity gain applied along the push-out direction of an obstacle hit.
    pub obstacle_gain: f32,

    /// Per-tick velocity multiplier emulating dissipation (0 < damping <= 1).
    pub damping: f32,

    /// Hard speed limit.
    pub max_velocity: f32,

    /// Distance from a container face where edge repulsion applies.
    pub edge_threshold: f32,

    /// Minimum inward speed enforced near a container face.
    pub edge_push: f32,

    /// Simulated seconds between spatial index rebuilds (0 = every tick).
    pub rebuild_interval: f32,

    /// Magnitude of the jitter substituted for pressure on isolated particles.
    pub jitter_strength: f32,

    /// Expected upper bound of neighbors per query, used to presize buffers.
    pub expected_neighbors: usize,

    /// Seed for placement and jitter.
    pub seed: u64,

    /// Timestep used by the plugin. `None` uses the frame delta.
    pub fixed_timestep: Option<f32>,
}

impl Default for FluidParams {
    fn default() -> Self {
        Self {
            particle_count: 216,
            bounds_min: Vec3::splat(-5.0),
            bounds_max: Vec3::splat(5.0),
            cell_size: 1.5,
            smoothing_radius: 1.5,
            particle_mass: 1.0,
            target_density: 0.2,
            pressure_multiplier: 5.0,
            pressure_deadband: 0.0,
            min_density: 1e-3,
            diffusion: 0.05,
            repulsion_radius: 0.3,
            repulsion_strength: 0.02,
            drag_coefficient: 0.47,
            lift_coefficient: 0.1,
            fluid_density: 1.2,
            cross_section_area: 0.05,
            lift_axis: Vec3::Z,
            collision_radius: 0.1,
            collision_separation: 1.0,
            collision_relaxation: 10.0,
            collision_jitter: 0.01,
            obstacle_gain: 5.0,
            damping: 0.98,
            max_velocity: 8.0,
            edge_threshold: 0.2,
            edge_push: 0.1,
            rebuild_interval: 0.3,
            jitter_strength: 0.01,
            expected_neighbors: 64,
            seed: 0x5eed,
            fixed_timestep: None,
        }
    }
}

impl FluidParams {
    /// Default air cloud.
    pub fn air() -> Self {
        Self::default()
    }

    /// Heavily damped air that settles quickly.
    pub fn calm() -> Self {
        Self {
            damping: 0.9,
            max_velocity: 3.0,
            lift_coefficient: 0.0,
            jitter_strength: 0.0,
            ..Self::default()
        }
    }

    /// Lively air with little dissipation.
    pub fn turbulent() -> Self {
        Self {
            damping: 0.995,
            diffusion: 0.0,
            lift_coefficient: 0.3,
            jitter_strength: 0.05,
            max_velocity: 12.0,
            ..Self::default()
        }
    }

    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_bounds(mut self, min: Vec3, max: Vec3) -> Self {
        self.bounds_min = min;
        self.bounds_max = max;
        self
    }

    /// Set the smoothing radius and match the cell size to it.
    pub fn with_smoothing_radius(mut self, radius: f32) -> Self {
        self.smoothing_radius = radius;
        self.cell_size = radius;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_pressure(mut self, target_density: f32, multiplier: f32) -> Self {
        self.target_density = target_density;
        self.pressure_multiplier = multiplier;
        self
    }

    pub fn with_collision_radius(mut self, radius: f32) -> Self {
        self.collision_radius = radius;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_max_velocity(mut self, max_velocity: f32) -> Self {
        self.max_velocity = max_velocity;
        self
    }

    pub fn with_rebuild_interval(mut self, interval: f32) -> Self {
        self.rebuild_interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_fixed_timestep(mut self, dt: f32) -> Self {
        self.fixed_timestep = Some(dt);
        self
    }

    /// Kernel for the configured smoothing radius.
    pub fn kernel(&self) -> SmoothingKernel {
        SmoothingKernel::new(self.smoothing_radius)
    }

    /// Check every parameter. Kernel denominators and cell lookups are
    /// undefined for non-positive radii, so those are rejected here.
    pub fn validate(&self) -> Result<(), FluidError> {
        positive("cell_size", self.cell_size)?;
        positive("smoothing_radius", self.smoothing_radius)?;
        positive("particle_mass", self.particle_mass)?;
        positive("min_density", self.min_density)?;
        positive("collision_radius", self.collision_radius)?;
        positive("max_velocity", self.max_velocity)?;

        finite("target_density", self.target_density)?;
        finite("pressure_multiplier", self.pressure_multiplier)?;
        non_negative("pressure_deadband", self.pressure_deadband)?;
        non_negative("diffusion", self.diffusion)?;
        non_negative("repulsion_radius", self.repulsion_radius)?;
        non_negative("repulsion_strength", self.repulsion_strength)?;
        non_negative("drag_coefficient", self.drag_coefficient)?;
        non_negative("lift_coefficient", self.lift_coefficient)?;
        non_negative("fluid_density", self.fluid_density)?;
        non_negative("cross_section_area", self.cross_section_area)?;
        non_negative("collision_relaxation", self.collision_relaxation)?;
        non_negative("collision_jitter", self.collision_jitter)?;
        non_negative("obstacle_gain", self.obstacle_gain)?;
        non_negative("edge_threshold", self.edge_threshold)?;
        non_negative("edge_push", self.edge_push)?;
        non_negative("rebuild_interval", self.rebuild_interval)?;
        non_negative("jitter_strength", self.jitter_strength)?;

        if self.repulsion_radius >= self.smoothing_radius {
            return Err(FluidError::InvalidParameter {
                name: "repulsion_radius",
                value: self.repulsion_radius,
            });
        }
        if !(0.0..=1.0).contains(&self.collision_separation) {
            return Err(FluidError::InvalidParameter {
                name: "collision_separation",
                value: self.collision_separation,
            });
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(FluidError::InvalidParameter {
                name: "damping",
                value: self.damping,
            });
        }
        if !self.lift_axis.is_finite() {
            return Err(FluidError::InvalidParameter {
                name: "lift_axis",
                value: self.lift_axis.length(),
            });
        }
        if let Some(dt) = self.fixed_timestep {
            positive("fixed_timestep", dt)?;
        }

        let min = self.bounds_min;
        let max = self.bounds_max;
        if !min.is_finite() || !max.is_finite() || min.cmpge(max).any() {
            return Err(FluidError::InvalidBounds { min, max });
        }

        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), FluidError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FluidError::InvalidParameter { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), FluidError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FluidError::InvalidParameter { name, value })
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), FluidError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FluidError::InvalidParameter { name, value })
    }
}
