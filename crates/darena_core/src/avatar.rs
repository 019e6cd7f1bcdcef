//! Avatar physics shared by the local player and the replayed opponent.
//!
//! Both avatars run through [`follow_ground`], so a turn replayed from its
//! log goes through exactly the same steps as the live turn that produced it.

use serde::{Deserialize, Serialize};

use crate::layout::{Side, WINDOW_HEIGHT};
use crate::math::Vec2;
use crate::terrain::Terrain;

/// Width and height of an avatar.
pub const AVATAR_SIZE: f32 = 20.0;
/// Horizontal speed while a movement intent is held.
pub const MOVE_SPEED: f32 = 100.0;
/// Fall acceleration.
pub const GRAVITY: f32 = 4.91;
/// Cap on the per-tick fall distance.
pub const MAX_FALL_SPEED: f32 = 1000.0;
/// Horizontal deceleration once movement stops.
pub const DECELERATION: f32 = 500.0;
/// How far an avatar sinks into the ground it stands on.
pub const GROUND_SINK: f32 = 5.0;
/// Lowest cannon angle.
pub const MIN_SHOT_ANGLE: f32 = 0.0;
/// Highest cannon angle.
pub const MAX_SHOT_ANGLE: f32 = std::f32::consts::FRAC_PI_2;
/// Cannon angle at spawn.
pub const INITIAL_SHOT_ANGLE: f32 = std::f32::consts::FRAC_PI_4;
/// Cannon rotation speed, radians per second.
pub const AIM_SPEED: f32 = 3.0;
/// Shot power gained per second while charging.
pub const CHARGE_SPEED: f32 = 35.0;
/// Upper bound on shot power.
pub const MAX_SHOT_POWER: f32 = 100.0;

/// Shot sub-state of an avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShotState {
    /// Free to move and aim.
    #[default]
    Idle,
    /// Power is building up; movement and aim are frozen.
    Charging,
    /// The shot was released and should be fired this tick.
    Shoot,
    /// Not this avatar's turn.
    Disabled,
}

/// One of the two duelling avatars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    /// Island the avatar stands on.
    pub side: Side,
    /// Centre of the avatar.
    pub position: Vec2,
    /// Horizontal speed (x) and per-tick fall speed (y).
    pub velocity: Vec2,
    /// Body tilt following the ground slope, in radians.
    pub tilt: f32,
    /// Cannon angle, in radians, measured upwards from the horizon.
    pub shot_angle: f32,
    /// Charged power.
    pub shot_power: f32,
    /// Shot sub-state.
    pub shot_state: ShotState,
    /// Whether the avatar had no ground under it after the last step.
    pub falling: bool,
}

impl Avatar {
    /// Create an avatar at its side's spawn point, in the air.
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            position: side.spawn_position(),
            velocity: Vec2::ZERO,
            tilt: 0.0,
            shot_angle: INITIAL_SHOT_ANGLE,
            shot_power: 0.0,
            shot_state: ShotState::Disabled,
            falling: true,
        }
    }

    /// Reset the shot for a fresh turn.
    pub fn begin_turn(&mut self) {
        self.shot_state = ShotState::Idle;
        self.shot_power = 0.0;
        self.velocity.x = 0.0;
    }

    /// Advance the shot sub-state on a shoot press.
    ///
    /// `Idle` starts charging and `Charging` releases the shot; other states
    /// ignore the press. A falling avatar cannot shoot.
    pub fn press_shoot(&mut self) -> ShotState {
        if self.falling {
            return self.shot_state;
        }
        self.shot_state = match self.shot_state {
            ShotState::Idle => ShotState::Charging,
            ShotState::Charging => ShotState::Shoot,
            other => other,
        };
        self.shot_state
    }

    /// Build up shot power while charging on solid ground.
    pub fn charge(&mut self, dt: f32) {
        if self.shot_state == ShotState::Charging && !self.falling {
            self.shot_power = (self.shot_power + CHARGE_SPEED * dt).min(MAX_SHOT_POWER);
        }
    }

    /// Whether a live tick of this avatar should be written to the turn log.
    #[must_use]
    pub fn records_intents(&self) -> bool {
        self.shot_state == ShotState::Idle && !self.falling
    }

    /// Whether the avatar dropped below the playfield.
    #[must_use]
    pub fn fell_off(&self) -> bool {
        self.position.y - AVATAR_SIZE / 2.0 > WINDOW_HEIGHT
    }

    /// Whether `point` lies inside the avatar box grown by `margin`.
    #[must_use]
    pub fn contains(&self, point: Vec2, margin: Vec2) -> bool {
        let half = AVATAR_SIZE / 2.0;
        (point.x - self.position.x).abs() <= half + margin.x
            && (point.y - self.position.y).abs() <= half + margin.y
    }
}

/// Advance an avatar by one tick on its island.
///
/// `movement` and `aim` are intents in `-1..=1`. An avatar that started the
/// tick falling ignores both. Horizontal movement and aiming only apply in
/// [`ShotState::Idle`].
pub fn follow_ground(avatar: &mut Avatar, terrain: &Terrain, movement: i8, aim: i8, dt: f32) {
    let was_falling = avatar.falling;
    let (movement, aim) = if was_falling {
        (0, 0)
    } else {
        (movement.signum(), aim.signum())
    };

    if was_falling {
        avatar.velocity.y = (avatar.velocity.y + GRAVITY * dt).min(MAX_FALL_SPEED);
        avatar.position.y += avatar.velocity.y;
    }

    let half = AVATAR_SIZE / 2.0;
    let y = avatar.position.y;
    let ground = terrain
        .ground_at(avatar.position.x)
        .filter(|g| y + half >= g.y && y - half <= g.y);

    match ground {
        Some(ground) => {
            avatar.falling = false;
            avatar.velocity.y = 0.0;
            avatar.tilt = ground.slope.atan() / 2.0;
            avatar.position.y = ground.y.round() - half + GROUND_SINK;
        }
        None => {
            avatar.falling = true;
            avatar.tilt = 0.0;
        }
    }

    if movement != 0 {
        avatar.velocity.x = f32::from(movement) * MOVE_SPEED;
    } else {
        let slowdown = DECELERATION * dt;
        avatar.velocity.x = if avatar.velocity.x.abs() <= slowdown {
            0.0
        } else {
            avatar.velocity.x - avatar.velocity.x.signum() * slowdown
        };
    }

    if avatar.shot_state == ShotState::Idle {
        avatar.position.x += avatar.velocity.x * dt;
        avatar.shot_angle += f32::from(aim) * AIM_SPEED * dt;
    }
    avatar.shot_angle = avatar.shot_angle.clamp(MIN_SHOT_ANGLE, MAX_SHOT_ANGLE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FIXED_TIMESTEP, POINTS_PER_ISLAND, POINT_SPACING};
    use crate::terrain::TerrainPoint;

    fn flat(side: Side, height: f32) -> Terrain {
        let origin = side.island_origin();
        let points = (0..POINTS_PER_ISLAND)
            .map(|i| TerrainPoint::new(origin.x + (i as u32 * POINT_SPACING) as f32, origin.y + height))
            .collect();
        Terrain::from_points(origin, points).unwrap()
    }

    fn settle(avatar: &mut Avatar, terrain: &Terrain) {
        for _ in 0..600 {
            follow_ground(avatar, terrain, 0, 0, FIXED_TIMESTEP);
            if !avatar.falling {
                return;
            }
        }
        panic!("avatar never landed");
    }

    #[test]
    fn test_avatar_lands_on_ground() {
        let terrain = flat(Side::Left, 50.0);
        let mut avatar = Avatar::new(Side::Left);
        assert!(avatar.falling);

        settle(&mut avatar, &terrain);

        assert_eq!(avatar.position.y, 370.0 - 10.0 + GROUND_SINK);
        assert_eq!(avatar.velocity.y, 0.0);
        assert_eq!(avatar.tilt, 0.0);
    }

    #[test]
    fn test_movement_only_in_idle() {
        let terrain = flat(Side::Left, 50.0);
        let mut avatar = Avatar::new(Side::Left);
        settle(&mut avatar, &terrain);

        let x = avatar.position.x;
        avatar.shot_state = ShotState::Charging;
        follow_ground(&mut avatar, &terrain, 1, 1, FIXED_TIMESTEP);
        assert_eq!(avatar.position.x, x);
        assert_eq!(avatar.shot_angle, INITIAL_SHOT_ANGLE);

        avatar.begin_turn();
        follow_ground(&mut avatar, &terrain, 1, 1, FIXED_TIMESTEP);
        assert!(avatar.position.x > x);
        assert!(avatar.shot_angle > INITIAL_SHOT_ANGLE);
    }

    #[test]
    fn test_deceleration_reaches_zero() {
        let terrain = flat(Side::Left, 50.0);
        let mut avatar = Avatar::new(Side::Left);
        settle(&mut avatar, &terrain);
        avatar.begin_turn();

        follow_ground(&mut avatar, &terrain, -1, 0, FIXED_TIMESTEP);
        assert_eq!(avatar.velocity.x, -MOVE_SPEED);

        for _ in 0..30 {
            follow_ground(&mut avatar, &terrain, 0, 0, FIXED_TIMESTEP);
        }
        assert_eq!(avatar.velocity.x, 0.0);
    }

    #[test]
    fn test_falling_ignores_intents() {
        let terrain = flat(Side::Left, 50.0);
        let mut avatar = Avatar::new(Side::Left);
        avatar.begin_turn();

        let x = avatar.position.x;
        follow_ground(&mut avatar, &terrain, 1, 1, FIXED_TIMESTEP);
        assert_eq!(avatar.position.x, x);
        assert_eq!(avatar.shot_angle, INITIAL_SHOT_ANGLE);
        assert!(avatar.velocity.y > 0.0);
    }

    #[test]
    fn test_shot_angle_clamped() {
        let terrain = flat(Side::Left, 50.0);
        let mut avatar = Avatar::new(Side::Left);
        settle(&mut avatar, &terrain);
        avatar.begin_turn();

        for _ in 0..120 {
            follow_ground(&mut avatar, &terrain, 0, 1, FIXED_TIMESTEP);
        }
        assert_eq!(avatar.shot_angle, MAX_SHOT_ANGLE);

        for _ in 0..120 {
            follow_ground(&mut avatar, &terrain, 0, -1, FIXED_TIMESTEP);
        }
        assert_eq!(avatar.shot_angle, MIN_SHOT_ANGLE);
    }

    #[test]
    fn test_walking_off_the_edge_falls_off() {
        let terrain = flat(Side::Left, 50.0);
        let mut avatar = Avatar::new(Side::Left);
        settle(&mut avatar, &terrain);
        avatar.begin_turn();

        let mut ticks = 0;
        while !avatar.fell_off() {
            follow_ground(&mut avatar, &terrain, -1, 0, FIXED_TIMESTEP);
            ticks += 1;
            assert!(ticks < 10_000, "avatar never fell off");
        }
        assert!(avatar.position.x < terrain.origin().x);
    }

    #[test]
    fn test_shot_state_cycle_and_charge() {
        let mut avatar = Avatar::new(Side::Right);
        avatar.begin_turn();
        assert!(!avatar.records_intents());
        avatar.falling = false;
        assert!(avatar.records_intents());

        avatar.charge(1.0);
        assert_eq!(avatar.shot_power, 0.0);

        assert_eq!(avatar.press_shoot(), ShotState::Charging);
        avatar.charge(1.0);
        assert_eq!(avatar.shot_power, CHARGE_SPEED);
        avatar.charge(10.0);
        assert_eq!(avatar.shot_power, MAX_SHOT_POWER);

        assert_eq!(avatar.press_shoot(), ShotState::Shoot);
        assert_eq!(avatar.press_shoot(), ShotState::Shoot);
    }

    #[test]
    fn test_falling_avatar_cannot_shoot() {
        let terrain = flat(Side::Left, 50.0);
        let mut avatar = Avatar::new(Side::Left);
        settle(&mut avatar, &terrain);
        avatar.begin_turn();

        while !avatar.falling {
            follow_ground(&mut avatar, &terrain, -1, 0, FIXED_TIMESTEP);
        }
        assert_eq!(avatar.press_shoot(), ShotState::Idle);
        assert_eq!(avatar.press_shoot(), ShotState::Idle);

        // A charge started on the ground stalls once the ground is gone
        avatar.shot_state = ShotState::Charging;
        avatar.charge(1.0);
        assert_eq!(avatar.shot_power, 0.0);
        assert_eq!(avatar.press_shoot(), ShotState::Charging);
    }

    #[test]
    fn test_contains_with_margin() {
        let avatar = Avatar::new(Side::Left);
        let p = avatar.position;
        assert!(avatar.contains(p, Vec2::ZERO));
        assert!(!avatar.contains(Vec2::new(p.x + 15.0, p.y), Vec2::ZERO));
        assert!(avatar.contains(Vec2::new(p.x + 15.0, p.y), Vec2::new(10.0, 5.0)));
    }
}
