//! Projectile ballistics and impact resolution.

use serde::{Deserialize, Serialize};

use crate::avatar::Avatar;
use crate::layout::{Side, WINDOW_HEIGHT};
use crate::match_state::Role;
use crate::math::Vec2;
use crate::terrain::Terrain;

/// Projectile length along its flight direction.
pub const PROJECTILE_WIDTH: f32 = 20.0;
/// Projectile thickness.
pub const PROJECTILE_HEIGHT: f32 = 10.0;
/// Upward speed lost per tick.
pub const PROJECTILE_GRAVITY: f32 = 4.81;
/// Launch speed per unit of shot power.
pub const VELOCITY_MULTIPLIER: f32 = 7.0;
/// Ticks after launch during which nothing is hit.
pub const GRACE_TICKS: u32 = 1;

/// How a projectile's flight ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactOutcome {
    /// The opposing avatar was hit; the shooter wins.
    AvatarHit {
        /// Avatar that was hit.
        target: Role,
    },
    /// A terrain point was hit and cratered.
    TerrainHit {
        /// Island that was hit.
        side: Side,
        /// Index of the point that registered the hit.
        index: usize,
    },
    /// The projectile left the bottom of the playfield.
    OutOfBounds,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Centre of the projectile.
    pub position: Vec2,
    /// Horizontal speed (x, rightwards) and vertical speed (y, upwards).
    pub velocity: Vec2,
    /// Flight angle, `atan2(velocity.y, velocity.x)`.
    pub angle: f32,
    /// `1.0` for shots travelling right, `-1.0` for shots travelling left.
    pub direction: f32,
    /// Avatar that fired the projectile.
    pub owner: Role,
    grace: u32,
}

impl Projectile {
    /// Launch a projectile from `origin`.
    #[must_use]
    pub fn launch(owner: Role, origin: Vec2, angle: f32, power: f32, direction: f32) -> Self {
        let velocity = Vec2::new(
            power * angle.cos() * VELOCITY_MULTIPLIER * direction,
            power * angle.sin() * VELOCITY_MULTIPLIER,
        );
        Self {
            position: origin,
            velocity,
            angle: velocity.y.atan2(velocity.x),
            direction,
            owner,
            grace: GRACE_TICKS,
        }
    }

    /// Advance the flight by one tick.
    ///
    /// Returns `false` while the projectile is still inside its grace window
    /// and must not be tested for collisions.
    pub fn step(&mut self, dt: f32) -> bool {
        self.velocity.y -= PROJECTILE_GRAVITY;
        self.position.x += self.velocity.x * dt;
        self.position.y -= self.velocity.y * dt;
        self.angle = self.velocity.y.atan2(self.velocity.x);

        if self.grace > 0 {
            self.grace -= 1;
            return false;
        }
        true
    }

    /// Leading point of the projectile along its flight direction.
    #[must_use]
    pub fn nose(&self) -> Vec2 {
        self.position + Vec2::from_angle(self.angle) * (PROJECTILE_WIDTH / 2.0)
    }
}

/// Test a nose position against the target and both islands.
///
/// The first matching test wins: the target avatar's box grown by half the
/// projectile size, then every point of the left island, then every point of
/// the right island, then the bottom of the playfield. Terrain hits crater
/// the island in place.
pub fn resolve_impact(
    nose: Vec2,
    target: &Avatar,
    target_role: Role,
    terrains: &mut [Terrain; 2],
) -> Option<ImpactOutcome> {
    let margin = Vec2::new(PROJECTILE_WIDTH / 2.0, PROJECTILE_HEIGHT / 2.0);
    if target.contains(nose, margin) {
        return Some(ImpactOutcome::AvatarHit {
            target: target_role,
        });
    }

    for side in Side::ALL {
        let terrain = &mut terrains[side.index()];
        for index in 0..terrain.len() {
            if terrain.hit_poll(index, nose) {
                return Some(ImpactOutcome::TerrainHit { side, index });
            }
        }
    }

    if nose.y >= WINDOW_HEIGHT + PROJECTILE_HEIGHT {
        return Some(ImpactOutcome::OutOfBounds);
    }

    None
}
