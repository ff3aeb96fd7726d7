//! SPH air simulation module for Bevy.
//!
//! Air is modeled as a cloud of particles whose density is estimated with a
//! smoothing kernel. Each tick computes densities, turns them into pressure
//! and aerodynamic forces, integrates, and resolves collisions against a
//! rigid obstacle, other particles and the container.
//!
//! # Architecture
//!
//! - [`params`]: Simulation parameters and presets
//! - [`error`]: Configuration errors
//! - [`kernel`]: Smoothing kernel and its derivative
//! - [`particle`]: Structure-of-arrays particle storage
//! - [`spatial`]: Spatial hashing for neighbor search
//! - [`density`]: Kernel-weighted density estimation
//! - [`solver`]: Pressure, diffusion, repulsion, drag, lift and field forces
//! - [`field`]: Vortex, vacuum and wake field sources
//! - [`integrator`]: Semi-implicit Euler with divergence guards
//! - [`collision`]: Obstacle and particle-particle collisions
//! - [`boundary`]: Container handling
//! - [`simulation`]: The tick pipeline
//! - [`plugin`]: Bevy plugin for easy integration
//!
//! # Example
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use airflow::fluid::prelude::*;
//!
//! let mut simulation = FluidSimulation::new(FluidParams::air()).unwrap();
//! let obstacle = Obstacle::new(Vec3::ZERO, 1.0);
//! let sources = [FieldSource::vortex(Vec3::new(2.0, 0.0, 0.0), Vec3::Z, 2.0, 4.0)];
//!
//! for _ in 0..60 {
//!     simulation.step(1.0 / 60.0, &[obstacle], &sources);
//! }
//! println!("density at origin: {}", simulation.density_at(Vec3::ZERO));
//! ```

pub mod boundary;
pub mod collision;
pub mod density;
pub mod error;
pub mod field;
pub mod integrator;
pub mod kernel;
pub mod params;
pub mod particle;
pub mod plugin;
pub mod simulation;
pub mod solver;
pub mod spatial;

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::boundary::*;
    pub use super::collision::*;
    pub use super::error::*;
    pub use super::field::*;
    pub use super::kernel::*;
    pub use super::params::*;
    pub use super::particle::*;
    pub use super::plugin::*;
    pub use super::simulation::*;
}
