//! Fluid simulation core.
//!
//! Owns the particle set, the spatial index and every scratch buffer, and
//! advances them one tick at a time:
//!
//! 1. refresh the spatial index when `rebuild_interval` has elapsed
//! 2. density pass (parallel)
//! 3. force pass (parallel)
//! 4. integration
//! 5. obstacle and particle-particle collisions
//! 6. container boundary

use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::boundary::BoundaryPolicy;
use super::collision::{CollisionResolver, Obstacle};
use super::density::DensityField;
use super::error::FluidError;
use super::field::FieldSource;
use super::integrator::integrate;
use super::kernel::SmoothingKernel;
use super::params::FluidParams;
use super::particle::{Drive, ParticleSet};
use super::solver::{ForceSolver, JitterPool};
use super::spatial::{neighbor_buffers, Neighbor, SpatialHash};

/// Outcome of one [`FluidSimulation::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Particles whose state went non-finite and was reset.
    pub diverged: usize,
    /// Particles pushed out of an obstacle.
    pub obstacle_hits: usize,
    /// Whether the spatial index was rebuilt at the start of the tick.
    pub rebuilt_index: bool,
}

/// Main fluid simulation resource.
#[derive(Resource)]
pub struct FluidSimulation {
    params: FluidParams,
    kernel: SmoothingKernel,
    boundary: BoundaryPolicy,
    particles: ParticleSet,
    index: SpatialHash,
    /// Seconds since the index was last rebuilt.
    since_rebuild: f32,
    tick: u64,
    jitter: JitterPool,
    /// One neighbor buffer per parallel chunk.
    scratch: Vec<Vec<Neighbor>>,
    collisions: CollisionResolver,
    rng: SmallRng,
}

impl FluidSimulation {
    /// Scatter `params.particle_count` particles at rest inside the container.
    pub fn new(params: FluidParams) -> Result<Self, FluidError> {
        params.validate()?;
        let mut rng = SmallRng::seed_from_u64(params.seed);
        let particles =
            ParticleSet::scattered(params.particle_count, params.bounds_min, params.bounds_max, &mut rng);
        Ok(Self::build(params, particles, rng))
    }

    /// Place particles at rest at explicit positions. `params.particle_count`
    /// is overwritten with the number of positions.
    pub fn from_positions(mut params: FluidParams, positions: Vec<Vec3>) -> Result<Self, FluidError> {
        params.validate()?;
        params.particle_count = positions.len();
        let rng = SmallRng::seed_from_u64(params.seed);
        Ok(Self::build(params, ParticleSet::from_positions(positions), rng))
    }

    fn build(params: FluidParams, particles: ParticleSet, mut rng: SmallRng) -> Self {
        let count = particles.len();
        let mut index = SpatialHash::new(params.cell_size);
        index.rebuild(&particles.positions);

        let mut simulation = Self {
            kernel: params.kernel(),
            boundary: BoundaryPolicy::from_params(&params),
            jitter: JitterPool::new(params.jitter_strength, &mut rng),
            scratch: neighbor_buffers(count, params.expected_neighbors),
            collisions: CollisionResolver::new(count, params.expected_neighbors),
            since_rebuild: 0.0,
            tick: 0,
            particles,
            index,
            params,
            rng,
        };
        simulation.compute_densities();

        info!(
            "Initialized fluid simulation: {} particles, smoothing radius {}, cell size {}",
            count, simulation.params.smoothing_radius, simulation.params.cell_size
        );

        simulation
    }

    /// Runs one simulation step.
    ///
    /// A non-positive or non-finite `dt` leaves the state untouched.
    pub fn step(&mut self, dt: f32, obstacles: &[Obstacle], sources: &[FieldSource]) -> StepReport {
        let mut report = StepReport::default();
        if !(dt.is_finite() && dt > 0.0) {
            return report;
        }

        self.since_rebuild += dt;
        if self.since_rebuild >= self.params.rebuild_interval {
            self.index.rebuild(&self.particles.positions);
            self.since_rebuild = 0.0;
            report.rebuilt_index = true;
            debug!(
                "Rebuilt spatial index at tick {}: {} particles in {} cells",
                self.tick,
                self.index.len(),
                self.index.occupied_cells()
            );
        }

        self.compute_densities();
        self.compute_accelerations(sources);

        report.diverged = integrate(&mut self.particles, &self.params, dt);
        if report.diverged > 0 {
            debug!(
                "Reset {} diverged particles at tick {}",
                report.diverged, self.tick
            );
        }

        report.obstacle_hits = self.collisions.resolve(
            &mut self.particles,
            &self.index,
            obstacles,
            &self.params,
            dt,
            &mut self.rng,
        );
        self.boundary.apply(&mut self.particles);

        self.tick += 1;
        report
    }

    fn compute_densities(&mut self) {
        let field = DensityField {
            kernel: &self.kernel,
            index: &self.index,
            positions: &self.particles.positions,
            mass: self.params.particle_mass,
            min_density: self.params.min_density,
        };
        field.compute_all(&mut self.particles.densities, &mut self.scratch);
    }

    fn compute_accelerations(&mut self, sources: &[FieldSource]) {
        let solver = ForceSolver {
            params: &self.params,
            kernel: &self.kernel,
            index: &self.index,
            positions: &self.particles.positions,
            velocities: &self.particles.velocities,
            densities: &self.particles.densities,
            sources,
            jitter: &self.jitter,
            tick: self.tick,
        };
        solver.compute_all(&mut self.particles.accelerations, &mut self.scratch);
    }

    /// Density at an arbitrary point, never below `min_density`.
    pub fn density_at(&self, point: Vec3) -> f32 {
        let field = DensityField {
            kernel: &self.kernel,
            index: &self.index,
            positions: &self.particles.positions,
            mass: self.params.particle_mass,
            min_density: self.params.min_density,
        };
        let mut neighbors = Vec::with_capacity(self.params.expected_neighbors);
        field.density_at(point, &mut neighbors)
    }

    /// Attach or clear an external velocity drive on one particle.
    pub fn set_drive(&mut self, index: usize, drive: Option<Drive>) -> Result<(), FluidError> {
        let count = self.particles.len();
        let slot = self
            .particles
            .drives
            .get_mut(index)
            .ok_or(FluidError::ParticleIndex { index, count })?;
        *slot = drive;
        Ok(())
    }

    /// Copy of all positions, indexed by particle.
    pub fn positions_snapshot(&self) -> Vec<Vec3> {
        self.particles.positions.clone()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.particles.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.particles.velocities
    }

    /// Densities cached by the last density pass.
    pub fn densities(&self) -> &[f32] {
        &self.particles.densities
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Mean absolute deviation of the cached densities from the target.
    pub fn average_density_error(&self) -> f32 {
        if self.particles.is_empty() {
            return 0.0;
        }
        let target = self.params.target_density;
        let total: f32 = self
            .particles
            .densities
            .iter()
            .map(|density| (density - target).abs())
            .sum();
        total / self.particles.len() as f32
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn params(&self) -> &FluidParams {
        &self.params
    }

    pub fn boundary(&self) -> &BoundaryPolicy {
        &self.boundary
    }
}
