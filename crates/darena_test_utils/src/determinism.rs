//! Determinism testing utilities.
//!
//! Replays one turn log on several fresh matches and checks that every
//! replay ends the same way in the same state.
//!
//! # Testing Strategy
//!
//! The opponent never sends positions during a turn, only intents. Both
//! clients must therefore step the same physics in the same order. Sources
//! of divergence include:
//!
//! - **Float evaluation order**: every peer runs the same `f32` operations
//!   in the same order; there is no parallel reduction in the model.
//!
//! - **Falling ticks**: intents are only recorded and consumed while the
//!   avatar stands on ground.
//!
//! - **System randomness**: terrain is generated once by the server from a
//!   seeded `ChaCha8Rng` and shipped as data.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: terrain, avatar and projectile steps in isolation
//! 2. **Property tests**: random turn logs still replay deterministically
//! 3. **Integration tests**: full send / relay / replay over TCP
//! 4. **Parallel tests**: N replays on separate threads all match

use std::thread;

use darena_core::layout::FIXED_TIMESTEP;
use darena_core::match_state::{MatchState, Role};
use darena_core::projectile::ImpactOutcome;
use darena_core::turn_log::TurnLog;

/// Upper bound on projectile ticks before a flight counts as stuck.
pub const MAX_FLIGHT_TICKS: u32 = 10_000;

/// One replay of a turn log: how the shot ended and the resulting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayRun {
    /// `None` when the avatar fell off or the flight never resolved.
    pub outcome: Option<ImpactOutcome>,
    /// [`MatchState::state_hash`] once the shot resolved.
    pub state_hash: u64,
}

/// Every replay of the same turn log on the same islands.
#[derive(Debug, Clone)]
pub struct ReplayComparison {
    /// Each replay, in run order.
    pub runs: Vec<ReplayRun>,
    /// Replay steps in the log, the shot included.
    pub steps: usize,
}

impl ReplayComparison {
    /// Whether every replay ended the same way in the same state.
    #[must_use]
    pub fn agrees(&self) -> bool {
        self.runs.windows(2).all(|w| w[0] == w[1])
    }

    /// Final state hashes, in run order.
    #[must_use]
    pub fn state_hashes(&self) -> Vec<u64> {
        self.runs.iter().map(|run| run.state_hash).collect()
    }

    /// Fail the test when two replays disagree.
    ///
    /// # Panics
    ///
    /// Panics listing each run when two replays disagree.
    pub fn assert_agrees(&self) {
        if self.agrees() {
            return;
        }
        let report: Vec<String> = self
            .runs
            .iter()
            .enumerate()
            .map(|(i, run)| format!("  replay {i}: {:?} -> {:#018x}", run.outcome, run.state_hash))
            .collect();
        panic!(
            "turn log of {} steps replayed {} different ways:\n{}",
            self.steps,
            self.runs.len(),
            report.join("\n")
        );
    }
}

/// Step the projectile in flight until it resolves.
///
/// Returns `None` if nothing is in flight or the flight outlasts
/// [`MAX_FLIGHT_TICKS`].
pub fn resolve_flight(state: &mut MatchState) -> Option<ImpactOutcome> {
    state.projectile.as_ref()?;
    for _ in 0..MAX_FLIGHT_TICKS {
        state.advance_tick();
        if let Some(outcome) = state.step_projectile(FIXED_TIMESTEP) {
            return Some(outcome);
        }
    }
    None
}

/// Replay `log` on the enemy avatar and resolve the shot.
///
/// # Panics
///
/// Panics if the replay itself fails.
pub fn replay_run(mut state: MatchState, log: &TurnLog) -> ReplayRun {
    let fired = state
        .replay_turn(Role::Enemy, log, FIXED_TIMESTEP)
        .expect("replay failed");
    let outcome = if fired {
        resolve_flight(&mut state)
    } else {
        None
    };
    ReplayRun {
        outcome,
        state_hash: state.state_hash(),
    }
}

/// Replay the same log on `runs` fresh matches built by `setup_fn`.
pub fn compare_replays<F>(setup_fn: F, log: &TurnLog, runs: usize) -> ReplayComparison
where
    F: Fn() -> MatchState,
{
    ReplayComparison {
        runs: (0..runs).map(|_| replay_run(setup_fn(), log)).collect(),
        steps: log.step_count(),
    }
}

/// Like [`compare_replays`], with each replay on its own scoped thread.
pub fn compare_threaded_replays<F>(setup_fn: F, log: &TurnLog, threads: usize) -> ReplayComparison
where
    F: Fn() -> MatchState + Sync,
{
    let runs = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| replay_run(setup_fn(), log)))
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ReplayComparison {
        runs,
        steps: log.step_count(),
    }
}

/// Proptest strategies for turn logs and terrain.
pub mod strategies {
    use darena_core::avatar::{MAX_SHOT_ANGLE, MAX_SHOT_POWER};
    use darena_core::math::Vec2;
    use darena_core::turn_log::TurnLog;
    use proptest::prelude::*;

    /// Generate an intent sequence where zeros dominate, so long zero runs
    /// appear often.
    pub fn arb_zero_heavy_intents(max_len: usize) -> impl Strategy<Value = Vec<i8>> {
        let intent = prop_oneof![
            6 => Just(0i8),
            1 => Just(1i8),
            1 => Just(-1i8),
        ];
        proptest::collection::vec(intent, 0..max_len)
    }

    /// Generate a legal cannon angle.
    pub fn arb_shot_angle() -> impl Strategy<Value = f32> {
        0.0f32..=MAX_SHOT_ANGLE
    }

    /// Generate a legal shot power.
    pub fn arb_shot_power() -> impl Strategy<Value = f32> {
        0.0f32..=MAX_SHOT_POWER
    }

    /// Generate a terrain seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate a complete turn log for `owner_id`.
    pub fn arb_turn_log(owner_id: u8, max_len: usize) -> impl Strategy<Value = TurnLog> {
        (
            arb_zero_heavy_intents(max_len),
            arb_zero_heavy_intents(max_len),
            arb_shot_angle(),
            arb_shot_power(),
            (0.0f32..960.0f32, 0.0f32..540.0f32),
        )
            .prop_map(move |(movements, aim_deltas, angle, power, (x, y))| TurnLog {
                owner_id,
                movements,
                aim_deltas,
                final_shot_angle: angle,
                final_shot_power: power,
                final_position: Vec2::new(x, y),
            })
    }
}
