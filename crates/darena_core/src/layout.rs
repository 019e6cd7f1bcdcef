//! Playfield layout shared by the server and both clients.
//!
//! Every peer derives island origins and point spacing from these constants,
//! so they are part of the protocol just as much as the message shapes.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Default TCP port of the relay server.
pub const DEFAULT_PORT: u16 = 50325;

/// Default server host a client connects to.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default player name shown before the user types one.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Poll interval for blocking waits, in milliseconds.
pub const CONNECTION_AWAIT_MS: u64 = 250;

/// Number of seats in a match.
pub const MAX_CLIENTS: usize = 2;

/// Playfield width.
pub const WINDOW_WIDTH: f32 = 960.0;

/// Playfield height.
pub const WINDOW_HEIGHT: f32 = 540.0;

/// Simulation ticks per second.
pub const TICK_RATE: u32 = 60;

/// Length of one simulation tick, in seconds.
pub const FIXED_TIMESTEP: f32 = 1.0 / TICK_RATE as f32;

/// Horizontal distance from the playfield edge to an island.
pub const ISLAND_X_OFFSET: f32 = 80.0;

/// Y coordinate of every island origin.
pub const ISLAND_Y_OFFSET: f32 = 320.0;

/// Depth of an island: terrain can never sink below `origin.y + ISLAND_DEPTH`.
pub const ISLAND_DEPTH: f32 = 100.0;

/// Horizontal extent of an island.
pub const ISLAND_WIDTH: u32 = 322;

/// Horizontal spacing between two terrain points.
pub const POINT_SPACING: u32 = 7;

/// Number of points in an island heightmap.
pub const POINTS_PER_ISLAND: usize = (ISLAND_WIDTH / POINT_SPACING) as usize;

/// Which island a terrain or avatar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Left island, owned by player 0.
    Left,
    /// Right island, owned by player 1.
    Right,
}

impl Side {
    /// Both sides in wire order.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// Index of this side in two-element arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// The opposite island.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Horizontal sign of a shot fired from this side: towards the opponent.
    #[must_use]
    pub const fn shot_direction(self) -> f32 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }

    /// Origin (first point position before heights) of this side's island.
    #[must_use]
    pub fn island_origin(self) -> Vec2 {
        match self {
            Self::Left => Vec2::new(ISLAND_X_OFFSET, ISLAND_Y_OFFSET),
            Self::Right => Vec2::new(
                WINDOW_WIDTH - ISLAND_X_OFFSET - ISLAND_WIDTH as f32,
                ISLAND_Y_OFFSET,
            ),
        }
    }

    /// Spawn position of the avatar standing on this side.
    ///
    /// Avatars spawn above the middle point of their island and fall onto it.
    #[must_use]
    pub fn spawn_position(self) -> Vec2 {
        let origin = self.island_origin();
        let middle = (POINTS_PER_ISLAND / 2) as f32 * POINT_SPACING as f32;
        Vec2::new(origin.x + middle, origin.y - 70.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_island_layout() {
        assert_eq!(POINTS_PER_ISLAND, 46);
        assert_eq!(Side::Left.island_origin(), Vec2::new(80.0, 320.0));
        assert_eq!(Side::Right.island_origin(), Vec2::new(558.0, 320.0));
    }

    #[test]
    fn test_side_helpers() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.index(), 1);
        assert!(Side::Left.shot_direction() > 0.0);
        assert!(Side::Right.shot_direction() < 0.0);
    }

    #[test]
    fn test_spawn_above_island() {
        for side in Side::ALL {
            let spawn = side.spawn_position();
            assert!(spawn.y < ISLAND_Y_OFFSET);
            assert!(spawn.x > side.island_origin().x);
        }
    }
}
