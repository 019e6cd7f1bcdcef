//! Input routing.
//!
//! Key mapping is left to the embedding UI: it reports intents as they are
//! pressed and released, and the game samples them once per tick.

/// A player intent the UI can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputIntent {
    /// Walk left.
    MoveLeft,
    /// Walk right.
    MoveRight,
    /// Raise the cannon.
    AimUp,
    /// Lower the cannon.
    AimDown,
    /// Start charging, then release the shot.
    Shoot,
}

/// An intent changing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Which intent.
    pub intent: InputIntent,
    /// `true` on press, `false` on release.
    pub pressed: bool,
}

impl InputEvent {
    /// A press of `intent`.
    #[must_use]
    pub const fn press(intent: InputIntent) -> Self {
        Self {
            intent,
            pressed: true,
        }
    }

    /// A release of `intent`.
    #[must_use]
    pub const fn release(intent: InputIntent) -> Self {
        Self {
            intent,
            pressed: false,
        }
    }
}

/// Held intents plus an unconsumed shoot press.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    shoot_held: bool,
    shoot_pressed: bool,
}

impl InputState {
    /// Apply one event.
    pub fn apply(&mut self, event: InputEvent) {
        let InputEvent { intent, pressed } = event;
        match intent {
            InputIntent::MoveLeft => self.left = pressed,
            InputIntent::MoveRight => self.right = pressed,
            InputIntent::AimUp => self.up = pressed,
            InputIntent::AimDown => self.down = pressed,
            InputIntent::Shoot => {
                // Only the press edge counts; key repeat does not
                if pressed && !self.shoot_held {
                    self.shoot_pressed = true;
                }
                self.shoot_held = pressed;
            }
        }
    }

    /// Horizontal intent: -1, 0 or 1.
    #[must_use]
    pub fn movement(&self) -> i8 {
        i8::from(self.right) - i8::from(self.left)
    }

    /// Aim intent: -1, 0 or 1.
    #[must_use]
    pub fn aim(&self) -> i8 {
        i8::from(self.up) - i8::from(self.down)
    }

    /// Consume the pending shoot press, if any.
    pub fn take_shoot(&mut self) -> bool {
        std::mem::take(&mut self.shoot_pressed)
    }

    /// Forget everything held.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
