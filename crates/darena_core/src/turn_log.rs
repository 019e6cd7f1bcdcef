//! Turn logs: the compact record of one player's turn.
//!
//! Instead of streaming positions, a client records one movement intent and
//! one aim intent per simulation tick, plus the final shot. The opponent
//! replays the intents through the same physics and then fires the recorded
//! shot from the recorded position.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Longest run of consecutive zero entries kept after trimming.
pub const MAX_ZERO_RUN: usize = 3;

/// One tick of an opponent replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayStep {
    /// Step the avatar with this movement intent.
    Move(i8),
    /// Step the avatar with this aim intent.
    Aim(i8),
    /// Snap to the recorded position and fire the recorded shot.
    Fire {
        /// Cannon angle.
        angle: f32,
        /// Shot power.
        power: f32,
        /// Position the shot was fired from.
        position: Vec2,
    },
}

/// One player's turn, as sent to the opponent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TurnLog {
    /// Player id of the author.
    pub owner_id: u8,
    /// Per-tick horizontal intent: -1 left, 0 none, 1 right.
    pub movements: Vec<i8>,
    /// Per-tick aim intent: -1 lower, 0 none, 1 raise.
    pub aim_deltas: Vec<i8>,
    /// Cannon angle at the moment of firing, in radians.
    pub final_shot_angle: f32,
    /// Charged shot power at the moment of firing.
    pub final_shot_power: f32,
    /// Avatar position at the moment of firing.
    pub final_position: Vec2,
}

impl TurnLog {
    /// Start an empty log for `owner_id`.
    #[must_use]
    pub fn new(owner_id: u8) -> Self {
        Self {
            owner_id,
            ..Default::default()
        }
    }

    /// Append one tick of intents. Values are reduced to their sign.
    pub fn record_tick(&mut self, movement: i8, aim: i8) {
        self.movements.push(movement.signum());
        self.aim_deltas.push(aim.signum());
    }

    /// Store the shot that ends the turn.
    pub fn finalize(&mut self, angle: f32, power: f32, position: Vec2) {
        self.final_shot_angle = angle;
        self.final_shot_power = power;
        self.final_position = position;
    }

    /// Collapse zero runs longer than [`MAX_ZERO_RUN`] in both sequences.
    ///
    /// Non-zero entries keep their order. Trimming twice is the same as
    /// trimming once.
    pub fn trim(&mut self) {
        trim_zero_runs(&mut self.movements, MAX_ZERO_RUN);
        trim_zero_runs(&mut self.aim_deltas, MAX_ZERO_RUN);
    }

    /// Consume `self` and return the trimmed log.
    #[must_use]
    pub fn trimmed(mut self) -> Self {
        self.trim();
        self
    }

    /// Number of replay steps this log produces, including the final shot.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.movements.len() + self.aim_deltas.len() + 1
    }

    /// Replay order: every movement, then every aim delta, then the shot.
    pub fn steps(&self) -> impl Iterator<Item = ReplayStep> + '_ {
        let fire = ReplayStep::Fire {
            angle: self.final_shot_angle,
            power: self.final_shot_power,
            position: self.final_position,
        };
        self.movements
            .iter()
            .map(|&m| ReplayStep::Move(m.signum()))
            .chain(self.aim_deltas.iter().map(|&a| ReplayStep::Aim(a.signum())))
            .chain(std::iter::once(fire))
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.movements.is_empty() && self.aim_deltas.is_empty()
    }
}

/// Cap every run of zeros in `values` at `max_run` entries, in place.
pub fn trim_zero_runs(values: &mut Vec<i8>, max_run: usize) {
    let mut run = 0;
    values.retain(|&v| {
        if v == 0 {
            run += 1;
            run <= max_run
        } else {
            run = 0;
            true
        }
    });
}
