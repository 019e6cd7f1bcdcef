//! Turns recorded live on one match and replayed on another.

use darena_core::avatar::ShotState;
use darena_core::layout::FIXED_TIMESTEP;
use darena_core::match_state::{MatchState, PlayerId, Role, DESYNC_TOLERANCE};
use darena_core::turn_log::{TurnLog, MAX_ZERO_RUN};
use darena_test_utils::fixtures::settled_match;

/// Play a turn on `state` the way the client loop does: one `(movement,
/// aim)` entry per tick, recorded while the avatar may record, then charge
/// for `charge_ticks` and release.
fn record_turn(state: &mut MatchState, script: &[(i8, i8)], charge_ticks: u32) -> TurnLog {
    let mut log = TurnLog::new(state.local_id().get());
    state.player.begin_turn();

    for &(movement, aim) in script {
        if state.player.records_intents() {
            log.record_tick(movement, aim);
        }
        state.step_avatar(Role::Player, movement, aim, FIXED_TIMESTEP);
        state.advance_tick();
    }

    assert_eq!(state.player.press_shoot(), ShotState::Charging);
    for _ in 0..charge_ticks {
        state.step_avatar(Role::Player, 0, 0, FIXED_TIMESTEP);
        state.player.charge(FIXED_TIMESTEP);
        state.advance_tick();
    }
    assert_eq!(state.player.press_shoot(), ShotState::Shoot);

    log.finalize(
        state.player.shot_angle,
        state.player.shot_power,
        state.player.position,
    );
    log
}

fn walk_pause_aim() -> Vec<(i8, i8)> {
    let mut script = vec![(1, 0); 20];
    script.extend(vec![(0, 0); 30]);
    script.extend(vec![(0, 1); 5]);
    script
}

#[test]
fn trimmed_pause_replays_to_the_firing_position() {
    let mut live = settled_match(PlayerId::FIRST, 50.0);
    let start = live.player.position;
    let recorded = record_turn(&mut live, &walk_pause_aim(), 40);
    assert!(live.player.position.x > start.x + 30.0);

    let log = recorded.clone().trimmed();
    assert_eq!(recorded.movements.len(), 55);
    assert_eq!(log.movements.len(), 20 + MAX_ZERO_RUN);
    assert_eq!(log.aim_deltas, vec![0, 0, 0, 1, 1, 1, 1, 1]);

    let mut replayed = settled_match(PlayerId::SECOND, 50.0);
    assert_eq!(replayed.enemy.position, start);
    assert!(replayed.replay_intents(Role::Enemy, &log, FIXED_TIMESTEP));

    // Before the shot snaps it, the replayed avatar already stands where
    // the shot was fired from
    let drift = replayed
        .verify_position(Role::Enemy, log.final_position)
        .unwrap();
    assert!(drift < 0.5, "replayed avatar is {drift} px off");
    assert!(drift <= DESYNC_TOLERANCE);
    assert!((replayed.enemy.shot_angle - log.final_shot_angle).abs() < 1e-5);
}

#[test]
fn replayed_shot_matches_the_live_shot() {
    let mut live = settled_match(PlayerId::FIRST, 50.0);
    let log = record_turn(&mut live, &walk_pause_aim(), 40).trimmed();
    live.fire(Role::Player).unwrap();

    let mut replayed = settled_match(PlayerId::SECOND, 50.0);
    assert!(replayed
        .replay_turn(Role::Enemy, &log, FIXED_TIMESTEP)
        .unwrap());

    let shot = live.projectile.as_ref().unwrap();
    let echo = replayed.projectile.as_ref().unwrap();
    assert_eq!(echo.position, shot.position);
    assert_eq!(echo.velocity, shot.velocity);
    assert_eq!(echo.direction, shot.direction);
    assert_eq!(replayed.enemy.shot_power, live.player.shot_power);
}
