//! Owned state of one match as seen by one client.
//!
//! Holds both islands, both avatars and the projectile in flight. The client
//! passes it by reference into its update, network and replay code; nothing
//! in the model is global.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::avatar::{follow_ground, Avatar, ShotState};
use crate::error::{GameError, Result};
use crate::layout::{Side, MAX_CLIENTS};
use crate::math::Vec2;
use crate::projectile::{resolve_impact, ImpactOutcome, Projectile};
use crate::terrain::{Terrain, TerrainPoint};
use crate::turn_log::{ReplayStep, TurnLog};

/// Distance a replayed avatar may drift from the reported firing position
/// before it is logged as a desync.
pub const DESYNC_TOLERANCE: f32 = 7.0;

/// Seat of a client in a match: 0 plays first on the left island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u8);

impl PlayerId {
    /// First seat, left island, moves first.
    pub const FIRST: Self = Self(0);
    /// Second seat, right island.
    pub const SECOND: Self = Self(1);

    /// Validate a raw id received over the wire.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidPlayerId`] for ids outside the two seats.
    pub fn new(id: u8) -> Result<Self> {
        if usize::from(id) < MAX_CLIENTS {
            Ok(Self(id))
        } else {
            Err(GameError::InvalidPlayerId(id))
        }
    }

    /// Raw id.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Island of this seat.
    #[must_use]
    pub const fn side(self) -> Side {
        if self.0 == 0 {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// The opponent's seat.
    #[must_use]
    pub const fn other(self) -> Self {
        Self(1 - self.0)
    }

    /// Whether this seat takes the first turn.
    #[must_use]
    pub const fn moves_first(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u8> for PlayerId {
    type Error = GameError;

    fn try_from(id: u8) -> Result<Self> {
        Self::new(id)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which avatar, from the local client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The locally controlled avatar.
    Player,
    /// The avatar replayed from the opponent's turn logs.
    Enemy,
}

impl Role {
    /// The other avatar.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// Everything one client simulates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    /// Left and right islands, indexed by [`Side::index`].
    pub terrains: [Terrain; 2],
    /// Locally controlled avatar.
    pub player: Avatar,
    /// Opponent avatar.
    pub enemy: Avatar,
    /// Projectile in flight, if any.
    pub projectile: Option<Projectile>,
    local_id: PlayerId,
    tick: u64,
}

impl MatchState {
    /// Create a match with the local player on its own seat's island.
    #[must_use]
    pub fn new(local_id: PlayerId, terrains: [Terrain; 2]) -> Self {
        let side = local_id.side();
        Self {
            terrains,
            player: Avatar::new(side),
            enemy: Avatar::new(side.opposite()),
            projectile: None,
            local_id,
            tick: 0,
        }
    }

    /// Build a match from the heightmaps distributed by the server.
    ///
    /// # Errors
    /// Returns an error when either heightmap is empty.
    pub fn from_heightmaps(local_id: PlayerId, heightmaps: [Vec<TerrainPoint>; 2]) -> Result<Self> {
        let [left, right] = heightmaps;
        let terrains = [
            Terrain::from_points(Side::Left.island_origin(), left)?,
            Terrain::from_points(Side::Right.island_origin(), right)?,
        ];
        Ok(Self::new(local_id, terrains))
    }

    /// Seat of the local client.
    #[must_use]
    pub const fn local_id(&self) -> PlayerId {
        self.local_id
    }

    /// Ticks simulated so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Island on `side`.
    #[must_use]
    pub fn terrain(&self, side: Side) -> &Terrain {
        &self.terrains[side.index()]
    }

    /// Avatar for `role`.
    #[must_use]
    pub const fn avatar(&self, role: Role) -> &Avatar {
        match role {
            Role::Player => &self.player,
            Role::Enemy => &self.enemy,
        }
    }

    /// Mutable avatar for `role`.
    pub fn avatar_mut(&mut self, role: Role) -> &mut Avatar {
        match role {
            Role::Player => &mut self.player,
            Role::Enemy => &mut self.enemy,
        }
    }

    /// Step one avatar on its own island.
    pub fn step_avatar(&mut self, role: Role, movement: i8, aim: i8, dt: f32) {
        let avatar = match role {
            Role::Player => &mut self.player,
            Role::Enemy => &mut self.enemy,
        };
        let terrain = &self.terrains[avatar.side.index()];
        follow_ground(avatar, terrain, movement, aim, dt);
    }

    /// Fire `role`'s cannon with its current angle and power.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] when a projectile is already in
    /// flight.
    pub fn fire(&mut self, role: Role) -> Result<()> {
        if self.projectile.is_some() {
            return Err(GameError::InvalidState(
                "projectile already in flight".to_string(),
            ));
        }

        let avatar = self.avatar_mut(role);
        avatar.shot_state = ShotState::Disabled;
        let projectile = Projectile::launch(
            role,
            avatar.position,
            avatar.shot_angle,
            avatar.shot_power,
            avatar.side.shot_direction(),
        );
        tracing::debug!(
            ?role,
            angle = avatar.shot_angle,
            power = avatar.shot_power,
            "projectile fired"
        );
        self.projectile = Some(projectile);
        Ok(())
    }

    /// Advance the projectile in flight and resolve impacts.
    ///
    /// Returns the outcome once the flight ends; the projectile is removed
    /// at that point.
    pub fn step_projectile(&mut self, dt: f32) -> Option<ImpactOutcome> {
        let projectile = self.projectile.as_mut()?;
        if !projectile.step(dt) {
            return None;
        }

        let nose = projectile.nose();
        let target_role = projectile.owner.other();
        let target = match target_role {
            Role::Player => &self.player,
            Role::Enemy => &self.enemy,
        };
        let outcome = resolve_impact(nose, target, target_role, &mut self.terrains)?;

        tracing::debug!(?outcome, tick = self.tick, "projectile resolved");
        self.projectile = None;
        Some(outcome)
    }

    /// Place `role` at `position`, clearing any motion.
    pub fn place_avatar(&mut self, role: Role, position: Vec2) {
        let avatar = self.avatar_mut(role);
        avatar.position = position;
        avatar.velocity = Vec2::ZERO;
    }

    /// Compare a reported firing position with where `role` stands locally.
    ///
    /// Returns the distance between the two.
    ///
    /// # Errors
    /// Returns [`GameError::DesyncDetected`] when they are further apart
    /// than [`DESYNC_TOLERANCE`].
    pub fn verify_position(&self, role: Role, reported: Vec2) -> Result<f32> {
        let local = self.avatar(role).position;
        let drift = local.distance(reported);
        if drift > DESYNC_TOLERANCE {
            return Err(GameError::DesyncDetected {
                tick: self.tick,
                local_hash: position_hash(local),
                remote_hash: position_hash(reported),
            });
        }
        Ok(drift)
    }

    /// Apply one replay step to `role`.
    ///
    /// Movement and aim steps run one tick of ground-following. The fire
    /// step snaps the avatar to the reported position, loads the reported
    /// angle and power and fires.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] when firing while a projectile
    /// is already in flight.
    pub fn apply_replay_step(&mut self, role: Role, step: ReplayStep, dt: f32) -> Result<()> {
        match step {
            ReplayStep::Move(movement) => self.step_avatar(role, movement, 0, dt),
            ReplayStep::Aim(aim) => self.step_avatar(role, 0, aim, dt),
            ReplayStep::Fire {
                angle,
                power,
                position,
            } => {
                if let Err(desync) = self.verify_position(role, position) {
                    tracing::warn!(%desync, "replayed position diverged, snapping");
                }

                self.place_avatar(role, position);
                let avatar = self.avatar_mut(role);
                avatar.shot_angle = angle;
                avatar.shot_power = power;
                self.fire(role)?;
            }
        }
        Ok(())
    }

    /// Replay the movement and aim intents of `log` on `role`, stopping
    /// short of the shot.
    ///
    /// Runs the same tick sequence a client runs: while the avatar is
    /// falling it steps with no intents and no step is consumed. Returns
    /// `false` if the avatar fell off.
    pub fn replay_intents(&mut self, role: Role, log: &TurnLog, dt: f32) -> bool {
        self.avatar_mut(role).begin_turn();

        for step in log.steps() {
            let (movement, aim) = match step {
                ReplayStep::Move(movement) => (movement, 0),
                ReplayStep::Aim(aim) => (0, aim),
                ReplayStep::Fire { .. } => break,
            };
            if !self.fall_until_grounded(role, dt) {
                return false;
            }
            self.step_avatar(role, movement, aim, dt);
            self.advance_tick();
        }

        self.fall_until_grounded(role, dt)
    }

    /// Replay a whole turn log on `role` without a render loop.
    ///
    /// Returns `false` if the avatar fell off before the shot.
    ///
    /// # Errors
    /// Propagates errors from [`MatchState::apply_replay_step`].
    pub fn replay_turn(&mut self, role: Role, log: &TurnLog, dt: f32) -> Result<bool> {
        if !self.replay_intents(role, log, dt) {
            return Ok(false);
        }

        let fire = ReplayStep::Fire {
            angle: log.final_shot_angle,
            power: log.final_shot_power,
            position: log.final_position,
        };
        self.apply_replay_step(role, fire, dt)?;
        self.advance_tick();
        Ok(true)
    }

    /// Step a falling avatar with no intents until it lands. Returns
    /// `false` once it drops below the playfield.
    fn fall_until_grounded(&mut self, role: Role, dt: f32) -> bool {
        while self.avatar(role).falling {
            if self.avatar(role).fell_off() {
                return false;
            }
            self.step_avatar(role, 0, 0, dt);
            self.advance_tick();
        }
        true
    }

    /// Count one simulated tick.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Hash of everything both peers should agree on.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        // Terrain in index order
        for terrain in &self.terrains {
            terrain.len().hash(&mut hasher);
            for point in terrain.points() {
                point.position.x.to_bits().hash(&mut hasher);
                point.position.y.to_bits().hash(&mut hasher);
                point.strength.hash(&mut hasher);
            }
        }

        // Avatars by island, so both clients hash the same layout
        let mut avatars = [&self.player, &self.enemy];
        avatars.sort_by_key(|a| a.side.index());
        for avatar in avatars {
            avatar.position.x.to_bits().hash(&mut hasher);
            avatar.position.y.to_bits().hash(&mut hasher);
            avatar.shot_angle.to_bits().hash(&mut hasher);
            avatar.shot_power.to_bits().hash(&mut hasher);
            avatar.falling.hash(&mut hasher);
        }

        if let Some(ref projectile) = self.projectile {
            projectile.position.x.to_bits().hash(&mut hasher);
            projectile.position.y.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }
}

fn position_hash(position: Vec2) -> u64 {
    let mut hasher = DefaultHasher::new();
    position.x.to_bits().hash(&mut hasher);
    position.y.to_bits().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FIXED_TIMESTEP, POINTS_PER_ISLAND};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn generated(local: PlayerId) -> MatchState {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let terrains = Side::ALL.map(|side| {
            Terrain::generate(side.island_origin(), POINTS_PER_ISLAND, &mut rng)
        });
        MatchState::new(local, terrains)
    }

    #[test]
    fn test_player_id_validation() {
        assert_eq!(PlayerId::new(0).unwrap(), PlayerId::FIRST);
        assert_eq!(PlayerId::try_from(1).unwrap(), PlayerId::SECOND);
        assert!(matches!(PlayerId::new(2), Err(GameError::InvalidPlayerId(2))));
        assert_eq!(PlayerId::FIRST.other(), PlayerId::SECOND);
        assert!(PlayerId::FIRST.moves_first());
    }

    #[test]
    fn test_sides_follow_seat() {
        let first = generated(PlayerId::FIRST);
        assert_eq!(first.player.side, Side::Left);
        assert_eq!(first.enemy.side, Side::Right);

        let second = generated(PlayerId::SECOND);
        assert_eq!(second.player.side, Side::Right);
        assert_eq!(second.enemy.side, Side::Left);
    }

    #[test]
    fn test_from_heightmaps_rejects_empty() {
        let result = MatchState::from_heightmaps(PlayerId::FIRST, [Vec::new(), Vec::new()]);
        assert!(matches!(result, Err(GameError::EmptyTerrain)));
    }

    #[test]
    fn test_fire_twice_is_rejected() {
        let mut state = generated(PlayerId::FIRST);
        state.player.shot_power = 50.0;
        state.fire(Role::Player).unwrap();
        assert_eq!(state.player.shot_state, ShotState::Disabled);
        assert!(matches!(
            state.fire(Role::Enemy),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_projectile_eventually_resolves() {
        let mut state = generated(PlayerId::FIRST);
        state.player.shot_power = 60.0;
        state.fire(Role::Player).unwrap();

        let mut outcome = None;
        for _ in 0..2_000 {
            outcome = state.step_projectile(FIXED_TIMESTEP);
            if outcome.is_some() {
                break;
            }
        }
        assert!(outcome.is_some());
        assert!(state.projectile.is_none());
        assert!(state.step_projectile(FIXED_TIMESTEP).is_none());
    }

    #[test]
    fn test_replay_fires_recorded_shot() {
        let mut state = generated(PlayerId::SECOND);
        let mut log = TurnLog::new(0);
        log.movements = vec![1, 1, 0, 0, 0, -1];
        log.aim_deltas = vec![1, -1];
        let target = Vec2::new(245.0, 340.0);
        log.finalize(0.7, 80.0, target);

        assert!(state.replay_turn(Role::Enemy, &log, FIXED_TIMESTEP).unwrap());

        assert_eq!(state.enemy.position, target);
        assert_eq!(state.enemy.shot_angle, 0.7);
        assert_eq!(state.enemy.shot_power, 80.0);
        let projectile = state.projectile.as_ref().unwrap();
        assert_eq!(projectile.owner, Role::Enemy);
        assert!(projectile.direction > 0.0);
    }

    #[test]
    fn test_verify_position_flags_drift() {
        let state = generated(PlayerId::FIRST);
        let here = state.enemy.position;

        assert_eq!(state.verify_position(Role::Enemy, here).unwrap(), 0.0);
        let near = Vec2::new(here.x + DESYNC_TOLERANCE, here.y);
        assert!(state.verify_position(Role::Enemy, near).is_ok());
        let far = Vec2::new(here.x + DESYNC_TOLERANCE + 1.0, here.y);
        assert!(matches!(
            state.verify_position(Role::Enemy, far),
            Err(GameError::DesyncDetected { tick: 0, .. })
        ));
    }

    #[test]
    fn test_replay_stops_when_avatar_falls_off() {
        let mut state = generated(PlayerId::SECOND);
        let mut log = TurnLog::new(0);
        log.movements = vec![-1; 400];

        assert!(!state.replay_turn(Role::Enemy, &log, FIXED_TIMESTEP).unwrap());
        assert!(state.enemy.fell_off());
        assert!(state.projectile.is_none());
    }

    #[test]
    fn test_state_hash_is_seat_independent() {
        let mut a = generated(PlayerId::FIRST);
        let mut b = generated(PlayerId::SECOND);
        assert_eq!(a.state_hash(), b.state_hash());

        a.step_avatar(Role::Player, 0, 0, FIXED_TIMESTEP);
        assert_ne!(a.state_hash(), b.state_hash());

        b.step_avatar(Role::Enemy, 0, 0, FIXED_TIMESTEP);
        assert_eq!(a.state_hash(), b.state_hash());
    }
}
