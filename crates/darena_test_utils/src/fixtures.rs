//! Test fixtures and helpers.
//!
//! Pre-built islands, matches and turn logs for consistent testing.

use darena_core::layout::{Side, FIXED_TIMESTEP, POINTS_PER_ISLAND, POINT_SPACING};
use darena_core::match_state::{MatchState, PlayerId, Role};
use darena_core::math::Vec2;
use darena_core::terrain::{Terrain, TerrainPoint};
use darena_core::turn_log::TurnLog;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seed used by fixtures that need generated terrain.
pub const FIXTURE_SEED: u64 = 0x00D1_5EA5;

/// A level island on `side`, every point `height` below the origin.
#[must_use]
pub fn flat_terrain(side: Side, height: f32) -> Terrain {
    let origin = side.island_origin();
    let points = (0..POINTS_PER_ISLAND)
        .map(|i| {
            TerrainPoint::new(
                origin.x + (i as u32 * POINT_SPACING) as f32,
                origin.y + height,
            )
        })
        .collect();
    Terrain::from_points(origin, points).expect("fixture heightmap is not empty")
}

/// Both islands level at `height`.
#[must_use]
pub fn flat_terrains(height: f32) -> [Terrain; 2] {
    Side::ALL.map(|side| flat_terrain(side, height))
}

/// Both islands generated from `seed`, left first.
#[must_use]
pub fn generated_terrains(seed: u64) -> [Terrain; 2] {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Side::ALL.map(|side| Terrain::generate(side.island_origin(), POINTS_PER_ISLAND, &mut rng))
}

/// A match on level islands with both avatars already standing.
#[must_use]
pub fn settled_match(local_id: PlayerId, height: f32) -> MatchState {
    let mut state = MatchState::new(local_id, flat_terrains(height));
    settle(&mut state);
    state
}

/// Step both avatars with no intents until neither is falling.
///
/// Gives up after ten simulated seconds.
pub fn settle(state: &mut MatchState) {
    for _ in 0..600 {
        if !state.player.falling && !state.enemy.falling {
            return;
        }
        state.step_avatar(Role::Player, 0, 0, FIXED_TIMESTEP);
        state.step_avatar(Role::Enemy, 0, 0, FIXED_TIMESTEP);
    }
}

/// The reference turn: a short walk, two aim taps and a 0.7 rad / 80 shot.
#[must_use]
pub fn sample_turn_log(owner_id: u8) -> TurnLog {
    TurnLog {
        owner_id,
        movements: vec![1, 1, 0, 0, 0, 0, -1],
        aim_deltas: vec![1, -1],
        final_shot_angle: 0.7,
        final_shot_power: 80.0,
        final_position: Vec2::new(243.0, 365.0),
    }
}
