//! Bevy plugin for the air simulation.

use bevy::prelude::*;

use super::collision::Obstacle;
use super::field::{FieldSources, VortexTrail};
use super::params::FluidParams;
use super::simulation::{FluidSimulation, StepReport};

/// Largest step taken from a frame delta.
const MAX_FRAME_DT: f32 = 1.0 / 30.0;

/// Plugin that adds the SPH air simulation to a Bevy app.
///
/// # Example
///
/// ```rust,ignore
/// use bevy::prelude::*;
/// use airflow::fluid::prelude::*;
///
/// fn main() {
///     App::new()
///         .add_plugins(MinimalPlugins)
///         .add_plugins(FluidPlugin::default().with_params(FluidParams::calm()))
///         .run();
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct FluidPlugin {
    pub params: FluidParams,
}

impl FluidPlugin {
    pub fn with_params(mut self, params: FluidParams) -> Self {
        self.params = params;
        self
    }
}

/// Spherical rigid body the air flows around.
#[derive(Component, Clone, Copy, Debug, Reflect)]
#[reflect(Component)]
pub struct FluidObstacle {
    pub center: Vec3,
    pub radius: f32,
}

impl FluidObstacle {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// The plugin's chained `Update` systems. Systems that feed
/// [`FieldSources`] or move [`FluidObstacle`]s for the current frame run
/// `.before(FluidSystems)`.
#[derive(SystemSet, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FluidSystems;

/// Running totals of the simulation, refreshed every frame.
#[derive(Resource, Clone, Debug, Default, Reflect)]
#[reflect(Resource)]
pub struct FluidStats {
    pub ticks: u64,
    pub particle_count: usize,
    pub average_density_error: f32,
    pub active_sources: usize,
    /// Diverged particle resets since startup.
    pub diverged_total: usize,
    pub last_obstacle_hits: usize,
    pub index_rebuilds: u64,
}

/// Report of the most recent tick, handed from the simulation system to the
/// stats system.
#[derive(Resource, Clone, Copy, Debug, Default)]
struct LastStep(StepReport);

impl Plugin for FluidPlugin {
    fn build(&self, app: &mut App) {
        let simulation = match FluidSimulation::new(self.params.clone()) {
            Ok(simulation) => simulation,
            Err(err) => {
                error!("Failed to create fluid simulation: {}", err);
                return;
            }
        };

        app.register_type::<FluidParams>()
            .register_type::<FluidObstacle>()
            .register_type::<VortexTrail>()
            .register_type::<FluidStats>();

        app.insert_resource(simulation)
            .init_resource::<FieldSources>()
            .init_resource::<FluidStats>()
            .init_resource::<LastStep>();

        app.add_systems(
            Update,
            (
                advance_vortex_trails,
                run_simulation,
                decay_field_sources,
                update_stats,
            )
                .chain()
                .in_set(FluidSystems),
        );
    }
}

/// Step size for this frame: the fixed timestep when set, otherwise the
/// clamped frame delta.
fn frame_dt(params: &FluidParams, time: &Time) -> f32 {
    params
        .fixed_timestep
        .unwrap_or_else(|| time.delta_secs().min(MAX_FRAME_DT))
}

/// System that lets every vortex trail emit into the field sources.
fn advance_vortex_trails(
    time: Res<Time>,
    simulation: Res<FluidSimulation>,
    mut sources: ResMut<FieldSources>,
    mut trails: Query<&mut VortexTrail>,
) {
    let dt = frame_dt(simulation.params(), &time);
    for mut trail in &mut trails {
        if let Some(vortex) = trail.advance(dt) {
            sources.push(vortex);
        }
    }
}

/// System to run the fluid simulation.
fn run_simulation(
    time: Res<Time>,
    mut simulation: ResMut<FluidSimulation>,
    sources: Res<FieldSources>,
    obstacles: Query<&FluidObstacle>,
    mut last: ResMut<LastStep>,
) {
    let dt = frame_dt(simulation.params(), &time);
    if dt <= 0.0 {
        return;
    }

    let obstacles: Vec<Obstacle> = obstacles
        .iter()
        .map(|o| Obstacle::new(o.center, o.radius))
        .collect();

    last.0 = simulation.step(dt, &obstacles, sources.as_slice());
}

/// System that ages transient field sources.
fn decay_field_sources(
    time: Res<Time>,
    simulation: Res<FluidSimulation>,
    mut sources: ResMut<FieldSources>,
) {
    sources.decay(frame_dt(simulation.params(), &time));
}

fn update_stats(
    simulation: Res<FluidSimulation>,
    sources: Res<FieldSources>,
    last: Res<LastStep>,
    mut stats: ResMut<FluidStats>,
) {
    stats.ticks = simulation.tick_count();
    stats.particle_count = simulation.particle_count();
    stats.average_density_error = simulation.average_density_error();
    stats.active_sources = sources.len();
    stats.last_obstacle_hits = last.0.obstacle_hits;
    if last.is_changed() {
        stats.diverged_total += last.0.diverged;
        if last.0.rebuilt_index {
            stats.index_rebuilds += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fluid::field::FieldSource;

    fn app(params: FluidParams) -> App {
        let mut app = App::new();
        app.init_resource::<Time>();
        app.add_plugins(FluidPlugin::default().with_params(params));
        app
    }

    fn fixed() -> FluidParams {
        FluidParams::default()
            .with_particle_count(32)
            .with_fixed_timestep(0.02)
    }

    #[test]
    fn test_plugin_steps_every_update() {
        let mut app = app(fixed());

        app.update();
        app.update();
        app.update();

        let simulation = app.world().resource::<FluidSimulation>();
        assert_eq!(simulation.tick_count(), 3);
        let stats = app.world().resource::<FluidStats>();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.particle_count, 32);
    }

    #[test]
    fn test_invalid_params_insert_nothing() {
        let mut app = app(fixed().with_damping(0.0));
        app.update();

        assert!(app.world().get_resource::<FluidSimulation>().is_none());
    }

    #[test]
    fn test_vortex_trail_feeds_and_expires_sources() {
        let mut app = app(fixed());
        app.world_mut().spawn(
            VortexTrail::new(Vec3::ZERO)
                .with_interval(0.05)
                .with_swirl(4.0, 2.0, 0.1),
        );

        for _ in 0..3 {
            app.update();
        }
        assert!(!app.world().resource::<FieldSources>().is_empty());

        // Stop spawning and let the remaining vortices run out.
        let world = app.world_mut();
        let mut trails = world.query::<&mut VortexTrail>();
        trails.single_mut(world).expect("one trail").interval = f32::MAX;
        for _ in 0..10 {
            app.update();
        }
        assert!(app.world().resource::<FieldSources>().is_empty());
    }

    fn push_single_frame_vortex(mut sources: ResMut<FieldSources>) {
        sources.push(FieldSource::vortex(Vec3::ZERO, Vec3::Z, 20.0, 50.0).with_lifetime(0.0));
    }

    #[test]
    fn test_single_frame_sources_reach_the_step() {
        let mut plain = app(fixed());
        let mut swirled = app(fixed());
        swirled.add_systems(Update, push_single_frame_vortex.before(FluidSystems));

        plain.update();
        swirled.update();

        // Decayed by the end of the frame, but only after the step used it.
        assert!(swirled.world().resource::<FieldSources>().is_empty());
        let plain = plain.world().resource::<FluidSimulation>().positions_snapshot();
        let swirled = swirled.world().resource::<FluidSimulation>().positions_snapshot();
        assert_ne!(plain, swirled);
    }

    #[test]
    fn test_obstacle_entities_are_collided() {
        let mut app = app(fixed().with_particle_count(400).with_collision_radius(0.01));
        app.world_mut().spawn(FluidObstacle::new(Vec3::ZERO, 2.0));

        app.update();

        // Pair correction may nudge particles next to the sphere by at most
        // half a collision radius per pair.
        let simulation = app.world().resource::<FluidSimulation>();
        assert!(simulation
            .positions()
            .iter()
            .all(|p| p.length() >= 1.9));
    }
}
