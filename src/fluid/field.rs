//! External field sources: vortex swirl, vacuum pull and obstacle wake.
//!
//! Sources are owned by the host and handed to the engine as a read-only
//! slice each tick. Transient sources carry a lifetime that the host decays
//! with [`FieldSources::decay`].

use bevy::prelude::*;

/// What a field source does to particles inside its radius.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub enum FieldSourceKind {
    /// Tangential swirl around `axis` through the source position.
    /// The sign of the strength selects the swirl direction.
    Vortex { axis: Vec3 },
    /// Pull toward the source position. With a `heading`, only particles
    /// behind `body` (against the unit heading) are pulled.
    Vacuum { body: Vec3, heading: Option<Vec3> },
    /// Drag particles along with `velocity` (the wake of a moving body).
    Wake { velocity: Vec3 },
}

/// A radius-gated acceleration source with linear falloff.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct FieldSource {
    pub position: Vec3,
    pub radius: f32,
    pub strength: f32,
    pub kind: FieldSourceKind,
    /// Remaining lifetime in seconds. `None` never expires.
    pub lifetime: Option<f32>,
}

impl FieldSource {
    pub fn vortex(position: Vec3, axis: Vec3, radius: f32, strength: f32) -> Self {
        Self {
            position,
            radius,
            strength,
            kind: FieldSourceKind::Vortex {
                axis: axis.normalize_or_zero(),
            },
            lifetime: None,
        }
    }

    pub fn vacuum(position: Vec3, radius: f32, strength: f32) -> Self {
        Self {
            position,
            radius,
            strength,
            kind: FieldSourceKind::Vacuum {
                body: position,
                heading: None,
            },
            lifetime: None,
        }
    }

    /// Low-pressure zone one unit behind a body at `position` moving with
    /// `velocity`. Particles level with or ahead of the body are not pulled,
    /// so a body at rest pulls nothing.
    pub fn vacuum_behind(position: Vec3, velocity: Vec3, radius: f32, strength: f32) -> Self {
        let heading = velocity.normalize_or_zero();
        Self {
            kind: FieldSourceKind::Vacuum {
                body: position,
                heading: Some(heading),
            },
            ..Self::vacuum(position - heading, radius, strength)
        }
    }

    pub fn wake(center: Vec3, velocity: Vec3, radius: f32, strength: f32) -> Self {
        Self {
            position: center,
            radius,
            strength,
            kind: FieldSourceKind::Wake { velocity },
            lifetime: None,
        }
    }

    pub fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime.is_some_and(|t| t <= 0.0)
    }

    /// Acceleration this source applies to a particle at `position` moving
    /// with `velocity`. Zero outside the radius.
    pub fn acceleration_at(&self, position: Vec3, velocity: Vec3) -> Vec3 {
        if self.radius <= 0.0 {
            return Vec3::ZERO;
        }
        let offset = position - self.position;
        let dist = offset.length();
        if dist >= self.radius {
            return Vec3::ZERO;
        }
        let falloff = 1.0 - dist / self.radius;

        let direction = match self.kind {
            FieldSourceKind::Vortex { axis } => axis.cross(offset).normalize_or_zero(),
            FieldSourceKind::Vacuum { body, heading } => {
                if heading.is_some_and(|h| (position - body).dot(-h) <= 0.0) {
                    return Vec3::ZERO;
                }
                (-offset).normalize_or_zero()
            }
            FieldSourceKind::Wake { velocity: wake } => wake - velocity,
        };

        direction * self.strength * falloff
    }
}

/// Host-side collection of active field sources.
#[derive(Resource, Clone, Debug, Default)]
pub struct FieldSources {
    pub sources: Vec<FieldSource>,
}

impl FieldSources {
    pub fn push(&mut self, source: FieldSource) {
        self.sources.push(source);
    }

    pub fn as_slice(&self) -> &[FieldSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Age transient sources by `dt` and drop the expired ones.
    pub fn decay(&mut self, dt: f32) {
        for source in &mut self.sources {
            if let Some(lifetime) = source.lifetime.as_mut() {
                *lifetime -= dt;
            }
        }
        self.sources.retain(|source| !source.is_expired());
    }
}

/// Emits short-lived vortices behind a moving body, alternating the swirl
/// direction on every spawn.
#[derive(Component, Clone, Debug, Reflect)]
pub struct VortexTrail {
    /// Position of the emitting body.
    pub position: Vec3,
    /// Velocity of the emitting body.
    pub velocity: Vec3,
    /// Seconds between spawns.
    pub interval: f32,
    /// Swirl strength before the alternating sign is applied.
    pub swirl_strength: f32,
    pub vortex_radius: f32,
    pub vortex_lifetime: f32,
    /// Distance behind the body at which vortices appear.
    pub offset: f32,
    pub axis: Vec3,
    timer: f32,
    sign: f32,
}

impl Default for VortexTrail {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            interval: 0.3,
            swirl_strength: 8.0,
            vortex_radius: 2.0,
            vortex_lifetime: 3.0,
            offset: 1.0,
            axis: Vec3::Z,
            timer: 0.0,
            sign: 1.0,
        }
    }
}

impl VortexTrail {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..default()
        }
    }

    pub fn with_interval(mut self, interval: f32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_swirl(mut self, strength: f32, radius: f32, lifetime: f32) -> Self {
        self.swirl_strength = strength;
        self.vortex_radius = radius;
        self.vortex_lifetime = lifetime;
        self
    }

    /// Advance the spawn timer. Returns a new vortex when the interval elapses.
    pub fn advance(&mut self, dt: f32) -> Option<FieldSource> {
        self.timer += dt;
        if self.timer < self.interval {
            return None;
        }
        self.timer = 0.0;

        let spawn = self.position - self.velocity.normalize_or_zero() * self.offset;
        let strength = self.swirl_strength * self.sign;
        self.sign = -self.sign;

        Some(
            FieldSource::vortex(spawn, self.axis, self.vortex_radius, strength)
                .with_lifetime(self.vortex_lifetime),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_outside_radius() {
        let source = FieldSource::vacuum(Vec3::ZERO, 1.0, 2.0);
        assert_eq!(source.acceleration_at(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO), Vec3::ZERO);
        assert_eq!(source.acceleration_at(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_vacuum_pulls_with_linear_falloff() {
        let source = FieldSource::vacuum(Vec3::ZERO, 2.0, 4.0);
        let accel = source.acceleration_at(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        assert!((accel - Vec3::new(-2.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_vacuum_behind_pulls_only_trailing_particles() {
        // Body at the origin moving +x: the pull center sits at x = -1.
        let source = FieldSource::vacuum_behind(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), 4.0, 1.0);
        assert_eq!(source.position, Vec3::new(-1.0, 0.0, 0.0));

        let behind = source.acceleration_at(Vec3::new(-2.0, 0.5, 0.0), Vec3::ZERO);
        assert!(behind.x > 0.0);
        assert!(behind.y < 0.0);

        // Inside the radius but ahead of, or level with, the body.
        let ahead = Vec3::new(0.5, 0.0, 0.0);
        let level = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(source.acceleration_at(ahead, Vec3::ZERO), Vec3::ZERO);
        assert_eq!(source.acceleration_at(level, Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_vacuum_behind_resting_body_pulls_nothing() {
        let source = FieldSource::vacuum_behind(Vec3::ZERO, Vec3::ZERO, 4.0, 1.0);
        assert_eq!(source.acceleration_at(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO), Vec3::ZERO);
        assert_eq!(source.acceleration_at(Vec3::new(-1.0, 0.0, 0.0), Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_vortex_is_tangential_and_signed() {
        let ccw = FieldSource::vortex(Vec3::ZERO, Vec3::Z, 2.0, 1.0);
        let cw = FieldSource::vortex(Vec3::ZERO, Vec3::Z, 2.0, -1.0);
        let p = Vec3::new(1.0, 0.0, 0.0);

        let a = ccw.acceleration_at(p, Vec3::ZERO);
        assert!(a.dot(p).abs() < 1e-6);
        assert!(a.y > 0.0);
        assert_eq!(cw.acceleration_at(p, Vec3::ZERO), -a);
    }

    #[test]
    fn test_wake_drags_toward_body_velocity() {
        let source = FieldSource::wake(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 1.0, 1.0);
        let accel = source.acceleration_at(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(accel, Vec3::new(2.0, 0.0, 0.0));

        let moving_along = source.acceleration_at(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(moving_along, Vec3::ZERO);
    }

    #[test]
    fn test_decay_removes_expired_and_keeps_permanent() {
        let mut sources = FieldSources::default();
        sources.push(FieldSource::vacuum(Vec3::ZERO, 1.0, 1.0));
        sources.push(FieldSource::vacuum(Vec3::ZERO, 1.0, 1.0).with_lifetime(0.5));
        sources.push(FieldSource::vacuum(Vec3::ZERO, 1.0, 1.0).with_lifetime(2.0));

        sources.decay(0.5);

        assert_eq!(sources.len(), 2);
        assert_eq!(sources.sources[1].lifetime, Some(1.5));
    }

    #[test]
    fn test_trail_spawns_on_interval_with_alternating_sign() {
        let mut trail = VortexTrail::new(Vec3::ZERO).with_interval(0.3);
        trail.velocity = Vec3::new(1.0, 0.0, 0.0);

        assert!(trail.advance(0.2).is_none());
        let first = trail.advance(0.2).expect("interval elapsed");
        assert!(trail.advance(0.1).is_none());
        let second = trail.advance(0.25).expect("interval elapsed");

        assert_eq!(first.position, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(first.strength, -second.strength);
        assert_eq!(first.lifetime, Some(3.0));
    }
}
