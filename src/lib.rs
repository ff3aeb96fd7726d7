//! Airflow - real-time SPH air simulation for Bevy
//!
//! This library simulates air as a cloud of smoothed particles that flows
//! around a moving rigid body, reacts to vortex, vacuum and wake field
//! sources, and stays inside an axis-aligned container.
//!
//! # Features
//!
//! - **SPH Density and Pressure**: Kernel density estimate with a linear equation of state
//! - **Aerodynamics**: Quadratic drag and lift per particle
//! - **Field Sources**: Vortices, vacuum zones, wakes and vortex trails
//! - **Stability Guards**: Non-finite particles are reset without touching the rest
//! - **Parallel Passes**: Density and force passes run on `rayon`
//! - **Easy Integration**: Simple Bevy plugin interface, or drive [`fluid::simulation::FluidSimulation`] directly
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use airflow::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(FluidPlugin::default().with_params(FluidParams::air()))
//!         .add_systems(Startup, setup)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands) {
//!     // A sphere the air has to flow around
//!     commands.spawn(FluidObstacle::new(Vec3::ZERO, 1.0));
//!
//!     // Vortices shed behind a moving emitter
//!     commands.spawn(VortexTrail::new(Vec3::new(-3.0, 0.0, 0.0)));
//! }
//! ```

pub mod fluid;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::fluid::prelude::*;
}
