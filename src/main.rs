//! Airflow - headless demo
//!
//! A sphere orbits through a box of air, shedding vortices and dragging a
//! wake behind it, while one particle is steered along the orbit axis.

use std::f32::consts::TAU;

use airflow::prelude::*;
use bevy::log::LogPlugin;
use bevy::prelude::*;

const FRAMES: usize = 600;
const ORBIT_RADIUS: f32 = 3.0;
const ORBIT_PERIOD: f32 = 4.0;

fn main() {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins,
        LogPlugin::default(),
        FluidPlugin::default().with_params(
            FluidParams::air()
                .with_particle_count(1_000)
                .with_fixed_timestep(1.0 / 60.0),
        ),
    ))
    .init_resource::<Orbit>()
    .add_systems(Startup, setup_scene)
    .add_systems(
        Update,
        (
            orbit_obstacle.before(FluidSystems),
            report_stats.after(FluidSystems),
        ),
    );

    app.finish();
    app.cleanup();
    for _ in 0..FRAMES {
        app.update();
    }
}

/// Elapsed simulated time of the orbiting sphere.
#[derive(Resource, Default)]
struct Orbit {
    time: f32,
}

/// Marker for the orbiting sphere.
#[derive(Component)]
struct Orbiter;

fn setup_scene(mut commands: Commands, simulation: Option<ResMut<FluidSimulation>>) {
    let start = Vec3::new(ORBIT_RADIUS, 0.0, 0.0);
    commands.spawn((
        FluidObstacle::new(start, 0.8),
        VortexTrail::new(start).with_swirl(6.0, 2.0, 2.0),
        Orbiter,
    ));

    let Some(mut simulation) = simulation else {
        return;
    };
    if let Err(err) = simulation.set_drive(0, Some(Drive::new(Vec3::Z).with_responsiveness(2.0))) {
        warn!("No particle to steer: {}", err);
    }
}

fn orbit_obstacle(
    mut orbit: ResMut<Orbit>,
    simulation: Option<Res<FluidSimulation>>,
    mut sources: Option<ResMut<FieldSources>>,
    mut orbiters: Query<(&mut FluidObstacle, &mut VortexTrail), With<Orbiter>>,
) {
    let Some(simulation) = simulation else {
        return;
    };
    let dt = simulation.params().fixed_timestep.unwrap_or(1.0 / 60.0);
    orbit.time += dt;

    let angle = orbit.time / ORBIT_PERIOD * TAU;
    let center = Vec3::new(angle.cos(), angle.sin(), 0.0) * ORBIT_RADIUS;
    let velocity = Vec3::new(-angle.sin(), angle.cos(), 0.0) * ORBIT_RADIUS * TAU / ORBIT_PERIOD;

    for (mut obstacle, mut trail) in &mut orbiters {
        obstacle.center = center;
        trail.position = center;
        trail.velocity = velocity;

        // Single-frame sources: expire on the next decay.
        if let Some(sources) = sources.as_mut() {
            sources.push(FieldSource::vacuum_behind(center, velocity, 1.5, 2.0).with_lifetime(0.0));
            sources.push(FieldSource::wake(center, velocity, obstacle.radius * 2.0, 1.0).with_lifetime(0.0));
        }
    }
}

fn report_stats(stats: Option<Res<FluidStats>>) {
    let Some(stats) = stats else {
        return;
    };
    if stats.ticks == 0 || stats.ticks % 60 != 0 {
        return;
    }
    info!(
        "tick {}: {} particles, density error {:.4}, {} sources, {} resets, {} index rebuilds",
        stats.ticks,
        stats.particle_count,
        stats.average_density_error,
        stats.active_sources,
        stats.diverged_total,
        stats.index_rebuilds
    );
}
