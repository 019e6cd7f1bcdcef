//! Scripted player for the headless client.
//!
//! Plays the same turn every time: wait for solid ground, walk, aim,
//! charge and release.

use crate::config::AutopilotConfig;
use crate::game::Game;
use crate::input::{InputEvent, InputIntent};
use crate::state::ClientState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Landing,
    Walking(u32),
    Aiming(u32),
    Charging(u32),
    Done,
}

/// Drives a [`Game`] through its own turns.
#[derive(Debug, Clone)]
pub struct Autopilot {
    config: AutopilotConfig,
    phase: Phase,
}

impl Autopilot {
    /// Create an autopilot playing `config`'s turn.
    #[must_use]
    pub const fn new(config: AutopilotConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
        }
    }

    /// Feed `game` the input for its next tick.
    pub fn drive(&mut self, game: &mut Game) {
        let grounded = game
            .match_state()
            .is_some_and(|state| !state.player.falling);
        for event in self.next_inputs(game.state(), grounded) {
            game.handle_input(event);
        }
    }

    /// Input events for one tick, given the state and whether the player
    /// stands on ground.
    pub fn next_inputs(&mut self, state: ClientState, grounded: bool) -> Vec<InputEvent> {
        if state != ClientState::PlayTurn {
            self.phase = Phase::Idle;
            return Vec::new();
        }
        if self.phase == Phase::Idle {
            self.phase = Phase::Landing;
        }

        let walk = direction_intent(
            self.config.walk_direction,
            InputIntent::MoveLeft,
            InputIntent::MoveRight,
        );
        let aim = direction_intent(
            self.config.aim_direction,
            InputIntent::AimDown,
            InputIntent::AimUp,
        );

        let mut events = Vec::new();
        loop {
            match self.phase {
                Phase::Landing if grounded => {
                    self.phase = Phase::Walking(0);
                }
                Phase::Landing => return events,
                Phase::Walking(n) if n < self.config.walk_ticks => {
                    if n == 0 {
                        events.extend(walk.map(InputEvent::press));
                    }
                    self.phase = Phase::Walking(n + 1);
                    return events;
                }
                Phase::Walking(_) => {
                    events.extend(walk.map(InputEvent::release));
                    self.phase = Phase::Aiming(0);
                }
                Phase::Aiming(n) if n < self.config.aim_ticks => {
                    if n == 0 {
                        events.extend(aim.map(InputEvent::press));
                    }
                    self.phase = Phase::Aiming(n + 1);
                    return events;
                }
                Phase::Aiming(_) => {
                    events.extend(aim.map(InputEvent::release));
                    events.push(InputEvent::press(InputIntent::Shoot));
                    events.push(InputEvent::release(InputIntent::Shoot));
                    self.phase = Phase::Charging(0);
                    return events;
                }
                Phase::Charging(n) if n < self.config.charge_ticks => {
                    self.phase = Phase::Charging(n + 1);
                    return events;
                }
                Phase::Charging(_) => {
                    events.push(InputEvent::press(InputIntent::Shoot));
                    events.push(InputEvent::release(InputIntent::Shoot));
                    self.phase = Phase::Done;
                    return events;
                }
                Phase::Idle | Phase::Done => return events,
            }
        }
    }
}

fn direction_intent(direction: i8, negative: InputIntent, positive: InputIntent) -> Option<InputIntent> {
    match direction.signum() {
        -1 => Some(negative),
        1 => Some(positive),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> AutopilotConfig {
        AutopilotConfig {
            walk_ticks: 2,
            walk_direction: 1,
            aim_ticks: 1,
            aim_direction: 1,
            charge_ticks: 3,
        }
    }

    #[test]
    fn test_waits_for_ground() {
        let mut pilot = Autopilot::new(script());
        assert!(pilot.next_inputs(ClientState::PlayTurn, false).is_empty());
        assert_eq!(
            pilot.next_inputs(ClientState::PlayTurn, true),
            vec![InputEvent::press(InputIntent::MoveRight)]
        );
    }

    #[test]
    fn test_full_turn_script() {
        let mut pilot = Autopilot::new(script());
        let mut ticks = Vec::new();
        for _ in 0..9 {
            ticks.push(pilot.next_inputs(ClientState::PlayTurn, true));
        }

        assert_eq!(ticks[0], vec![InputEvent::press(InputIntent::MoveRight)]);
        assert!(ticks[1].is_empty());
        assert_eq!(
            ticks[2],
            vec![
                InputEvent::release(InputIntent::MoveRight),
                InputEvent::press(InputIntent::AimUp),
            ]
        );
        assert_eq!(
            ticks[3],
            vec![
                InputEvent::release(InputIntent::AimUp),
                InputEvent::press(InputIntent::Shoot),
                InputEvent::release(InputIntent::Shoot),
            ]
        );
        assert!(ticks[4..7].iter().all(Vec::is_empty));
        assert_eq!(
            ticks[7],
            vec![
                InputEvent::press(InputIntent::Shoot),
                InputEvent::release(InputIntent::Shoot),
            ]
        );
        assert!(ticks[8].is_empty());
    }

    #[test]
    fn test_idle_outside_own_turn() {
        let mut pilot = Autopilot::new(script());
        assert!(pilot.next_inputs(ClientState::WaitTurn, true).is_empty());
        assert!(pilot.next_inputs(ClientState::Won, true).is_empty());
    }
}
