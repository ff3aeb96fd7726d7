//! Force evaluation.
//!
//! Converts cached densities into pressure and sums, per particle, the
//! symmetric pairwise pressure force, density diffusion, short-range
//! repulsion, aerodynamic drag and lift, and external field sources.

use bevy::prelude::*;
use rand::Rng;
use rayon::prelude::*;

use super::field::FieldSource;
use super::kernel::SmoothingKernel;
use super::params::FluidParams;
use super::spatial::{Neighbor, SpatialHash, PASS_CHUNK};

/// Distances below this are treated as coincident: no direction exists.
pub const COINCIDENT_EPSILON: f32 = 1e-6;

/// Lower bound on the squared distance used by the inverse-square repulsion.
const MIN_REPULSION_DIST_SQ: f32 = 1e-4;

/// Small precomputed vectors handed to particles that have no neighbors, so
/// isolated particles keep drifting instead of stranding in empty cells.
#[derive(Clone, Debug, Default)]
pub struct JitterPool {
    vectors: Vec<Vec3>,
}

impl JitterPool {
    pub const SIZE: usize = 64;

    pub fn new<R: Rng>(strength: f32, rng: &mut R) -> Self {
        let vectors = (0..Self::SIZE)
            .map(|_| {
                Vec3::new(
                    rng.random_range(-1.0..=1.0),
                    rng.random_range(-1.0..=1.0),
                    rng.random_range(-1.0..=1.0),
                ) * strength
            })
            .collect();
        Self { vectors }
    }

    /// Deterministic pick for a particle on a given tick.
    pub fn get(&self, index: usize, tick: u64) -> Vec3 {
        if self.vectors.is_empty() {
            return Vec3::ZERO;
        }
        let slot = (index as u64).wrapping_add(tick) % self.vectors.len() as u64;
        self.vectors[slot as usize]
    }
}

/// Read-only view of everything the force pass needs for one tick.
pub struct ForceSolver<'a> {
    pub params: &'a FluidParams,
    pub kernel: &'a SmoothingKernel,
    pub index: &'a SpatialHash,
    pub positions: &'a [Vec3],
    pub velocities: &'a [Vec3],
    pub densities: &'a [f32],
    pub sources: &'a [FieldSource],
    pub jitter: &'a JitterPool,
    pub tick: u64,
}

impl ForceSolver<'_> {
    /// Equation of state with an optional dead band around zero.
    #[inline]
    pub fn pressure(&self, density: f32) -> f32 {
        let pressure = (density - self.params.target_density) * self.params.pressure_multiplier;
        if pressure.abs() < self.params.pressure_deadband {
            0.0
        } else {
            pressure
        }
    }

    /// Pressure force neighbor `j` exerts on particle `i`, or `None` when the
    /// pair is coincident or out of range.
    pub fn pressure_force(&self, i: usize, j: usize) -> Option<Vec3> {
        let offset = self.positions[j] - self.positions[i];
        let dist = offset.length();
        if dist <= COINCIDENT_EPSILON || dist >= self.kernel.radius() {
            return None;
        }
        Some(self.pair_pressure(i, j, offset / dist, dist))
    }

    /// `toward` is the unit vector from `i` to `j`. The kernel slope is
    /// negative, so positive shared pressure pushes `i` away from `j`.
    #[inline]
    fn pair_pressure(&self, i: usize, j: usize, toward: Vec3, dist: f32) -> Vec3 {
        let shared = 0.5 * (self.pressure(self.densities[i]) + self.pressure(self.densities[j]));
        let neighbor_density = self.densities[j].max(self.params.min_density);
        toward * shared * self.kernel.derivative(dist) * self.params.particle_mass / neighbor_density
    }

    fn aerodynamic_scale(&self, velocity: Vec3) -> f32 {
        let p = self.params;
        0.5 * p.fluid_density * velocity.length_squared() * p.cross_section_area / p.particle_mass
    }

    pub fn drag(&self, velocity: Vec3) -> Vec3 {
        -velocity.normalize_or_zero() * self.params.drag_coefficient * self.aerodynamic_scale(velocity)
    }

    pub fn lift(&self, velocity: Vec3) -> Vec3 {
        velocity.cross(self.params.lift_axis).normalize_or_zero()
            * self.params.lift_coefficient
            * self.aerodynamic_scale(velocity)
    }

    pub fn field_acceleration(&self, position: Vec3, velocity: Vec3) -> Vec3 {
        self.sources
            .iter()
            .map(|source| source.acceleration_at(position, velocity))
            .sum()
    }

    /// Total acceleration of particle `i`.
    pub fn acceleration_for(&self, i: usize, neighbors: &mut Vec<Neighbor>) -> Vec3 {
        let p = self.params;
        let position = self.positions[i];
        let velocity = self.velocities[i];
        let local_density = self.densities[i].max(p.min_density);

        self.index.query(position, self.kernel.radius(), neighbors);

        let mut pressure = Vec3::ZERO;
        let mut diffusion = Vec3::ZERO;
        let mut repulsion = Vec3::ZERO;
        let mut neighbor_count = 0usize;

        for neighbor in neighbors.iter() {
            let j = neighbor.index;
            if j == i || j >= self.positions.len() {
                continue;
            }
            let offset = position - self.positions[j];
            let dist = offset.length();
            // The index may be stale; recheck against current positions.
            if dist >= self.kernel.radius() {
                continue;
            }
            neighbor_count += 1;
            if dist <= COINCIDENT_EPSILON {
                continue;
            }
            let away = offset / dist;

            pressure += self.pair_pressure(i, j, -away, dist);
            diffusion += away * (local_density - self.densities[j]);
            if dist < p.repulsion_radius {
                repulsion += away * p.repulsion_strength / (dist * dist).max(MIN_REPULSION_DIST_SQ);
            }
        }

        let pressure_acceleration = if neighbor_count == 0 {
            self.jitter.get(i, self.tick)
        } else {
            pressure / local_density
        };

        pressure_acceleration
            + diffusion * p.diffusion
            + repulsion
            + self.drag(velocity)
            + self.lift(velocity)
            + self.field_acceleration(position, velocity)
    }

    /// Fill `accelerations[i]` for every particle, in parallel over
    /// [`PASS_CHUNK`]-sized chunks.
    pub fn compute_all(&self, accelerations: &mut [Vec3], scratch: &mut [Vec<Neighbor>]) {
        accelerations
            .par_chunks_mut(PASS_CHUNK)
            .zip(scratch.par_iter_mut())
            .enumerate()
            .for_each(|(chunk, (out, neighbors))| {
                let start = chunk * PASS_CHUNK;
                for (offset, acceleration) in out.iter_mut().enumerate() {
                    *acceleration = self.acceleration_for(start + offset, neighbors);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    struct Fixture {
        params: FluidParams,
        kernel: SmoothingKernel,
        index: SpatialHash,
        positions: Vec<Vec3>,
        velocities: Vec<Vec3>,
        densities: Vec<f32>,
        jitter: JitterPool,
    }

    impl Fixture {
        fn new(params: FluidParams, positions: Vec<Vec3>, densities: Vec<f32>) -> Self {
            let mut index = SpatialHash::new(params.cell_size);
            index.rebuild(&positions);
            let mut rng = SmallRng::seed_from_u64(params.seed);
            Self {
                kernel: params.kernel(),
                jitter: JitterPool::new(params.jitter_strength, &mut rng),
                velocities: vec![Vec3::ZERO; positions.len()],
                params,
                index,
                positions,
                densities,
            }
        }

        fn solver<'a>(&'a self, sources: &'a [FieldSource]) -> ForceSolver<'a> {
            ForceSolver {
                params: &self.params,
                kernel: &self.kernel,
                index: &self.index,
                positions: &self.positions,
                velocities: &self.velocities,
                densities: &self.densities,
                sources,
                jitter: &self.jitter,
                tick: 3,
            }
        }
    }

    fn quiet_params() -> FluidParams {
        FluidParams {
            diffusion: 0.0,
            repulsion_strength: 0.0,
            drag_coefficient: 0.0,
            lift_coefficient: 0.0,
            ..FluidParams::default()
        }
        .with_smoothing_radius(1.0)
        .with_pressure(0.2, 5.0)
    }

    #[test]
    fn test_pair_pressure_is_anti_symmetric() {
        let fixture = Fixture::new(
            quiet_params(),
            vec![Vec3::ZERO, Vec3::new(0.4, 0.1, -0.2)],
            vec![0.9, 0.9],
        );
        let solver = fixture.solver(&[]);

        let on_a = solver.pressure_force(0, 1).expect("in range");
        let on_b = solver.pressure_force(1, 0).expect("in range");

        assert!((on_a + on_b).length() < 1e-6);
        // Compressed pair pushes apart.
        assert!(on_a.dot(fixture.positions[1] - fixture.positions[0]) < 0.0);
    }

    #[test]
    fn test_coincident_pair_has_no_pressure_force() {
        let fixture = Fixture::new(quiet_params(), vec![Vec3::ONE, Vec3::ONE], vec![1.0, 1.0]);
        let solver = fixture.solver(&[]);

        assert!(solver.pressure_force(0, 1).is_none());
        let mut buf = Vec::new();
        assert!(solver.acceleration_for(0, &mut buf).is_finite());
    }

    #[test]
    fn test_pressure_dead_band() {
        let mut params = quiet_params();
        params.pressure_deadband = 0.5;
        let fixture = Fixture::new(params, vec![Vec3::ZERO], vec![0.0]);
        let solver = fixture.solver(&[]);

        assert_eq!(solver.pressure(0.25), 0.0);
        assert!((solver.pressure(1.2) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_isolated_particle_gets_pool_jitter() {
        let fixture = Fixture::new(quiet_params(), vec![Vec3::ZERO, Vec3::splat(4.0)], vec![0.3, 0.3]);
        let solver = fixture.solver(&[]);

        let mut buf = Vec::new();
        let accel = solver.acceleration_for(0, &mut buf);
        assert_eq!(accel, fixture.jitter.get(0, 3));
        assert_ne!(accel, Vec3::ZERO);
    }

    #[test]
    fn test_drag_opposes_and_lift_is_perpendicular() {
        let params = FluidParams {
            drag_coefficient: 0.5,
            lift_coefficient: 0.5,
            ..quiet_params()
        };
        let fixture = Fixture::new(params, vec![Vec3::ZERO], vec![0.2]);
        let solver = fixture.solver(&[]);
        let velocity = Vec3::new(2.0, 1.0, 0.0);

        let drag = solver.drag(velocity);
        let lift = solver.lift(velocity);
        assert!(drag.dot(velocity) < 0.0);
        assert!(lift.dot(velocity).abs() < 1e-5);
        assert!(lift.dot(Vec3::Z).abs() < 1e-5);
        assert_eq!(solver.drag(Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_diffusion_follows_the_density_difference() {
        let params = FluidParams {
            diffusion: 0.5,
            pressure_multiplier: 0.0,
            ..quiet_params()
        };
        // Dense particle at the origin, sparse neighbor on +x.
        let fixture = Fixture::new(
            params.clone(),
            vec![Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)],
            vec![1.0, 0.2],
        );
        let solver = fixture.solver(&[]);

        let mut buf = Vec::new();
        let on_dense = solver.acceleration_for(0, &mut buf);
        let on_sparse = solver.acceleration_for(1, &mut buf);

        // unit(self - other) * (self - other density) * diffusion: the dense
        // particle moves off the sparse one and the sparse one follows.
        assert!((on_dense - Vec3::new(-0.4, 0.0, 0.0)).length() < 1e-5);
        assert!((on_sparse - Vec3::new(-0.4, 0.0, 0.0)).length() < 1e-5);

        let equal = Fixture::new(params, vec![Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)], vec![0.6, 0.6]);
        assert!(equal.solver(&[]).acceleration_for(0, &mut buf).length() < 1e-6);
    }

    #[test]
    fn test_repulsion_pushes_close_neighbors_apart() {
        let params = FluidParams {
            repulsion_strength: 0.1,
            pressure_multiplier: 0.0,
            ..quiet_params()
        };
        let fixture = Fixture::new(params, vec![Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0)], vec![1.0, 1.0]);
        let solver = fixture.solver(&[]);

        let mut buf = Vec::new();
        let accel = solver.acceleration_for(0, &mut buf);
        assert!(accel.x < 0.0);
    }

    #[test]
    fn test_field_sources_are_summed() {
        let fixture = Fixture::new(quiet_params(), vec![Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)], vec![0.2, 0.2]);
        let sources = [
            FieldSource::vacuum(Vec3::new(1.0, 0.0, 0.0), 2.0, 1.0),
            FieldSource::vacuum(Vec3::new(-1.0, 0.0, 0.0), 2.0, 1.0),
            FieldSource::vacuum(Vec3::new(0.0, 1.0, 0.0), 2.0, 2.0),
        ];
        let solver = fixture.solver(&sources);

        let field = solver.field_acceleration(Vec3::ZERO, Vec3::ZERO);
        assert!(field.x.abs() < 1e-6);
        assert!((field.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_pass_matches_single_queries() {
        let positions: Vec<Vec3> = (0..130)
            .map(|i| {
                let i = i as f32;
                Vec3::new((i * 0.7).sin(), (i * 0.3).cos(), (i * 0.05).sin()) * 1.5
            })
            .collect();
        let densities = (0..130).map(|i| 0.1 + i as f32 * 0.01).collect();
        let fixture = Fixture::new(FluidParams::default(), positions, densities);
        let solver = fixture.solver(&[]);

        let mut accelerations = vec![Vec3::ZERO; fixture.positions.len()];
        let mut scratch = crate::fluid::spatial::neighbor_buffers(fixture.positions.len(), 32);
        solver.compute_all(&mut accelerations, &mut scratch);

        let mut buf = Vec::new();
        for (i, accel) in accelerations.iter().enumerate() {
            assert_eq!(*accel, solver.acceleration_for(i, &mut buf));
        }
    }
}
