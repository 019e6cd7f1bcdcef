//! Destructible island terrain.
//!
//! An island is an ordered heightmap of points spaced [`POINT_SPACING`]
//! apart. Impacts push points down towards the island floor; a point that
//! reaches the floor is a gap and no longer counts as ground.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::layout::{ISLAND_DEPTH, POINT_SPACING};
use crate::math::Vec2;

/// Strength assigned to freshly generated points.
pub const DEFAULT_STRENGTH: i32 = 1;

/// Lowest generated height offset below the origin.
pub const MIN_HEIGHT: i32 = 25;

/// Highest generated height offset below the origin.
pub const MAX_HEIGHT: i32 = 75;

/// Number of neighbours on each side moved by an impact.
pub const CRATER_RADIUS: usize = 4;

/// Height added at the centre of a crater.
pub const CRATER_PEAK: f32 = 20.0;

/// Half the point spacing: how far from a point its column extends.
pub const HALF_SPACING: f32 = POINT_SPACING as f32 / 2.0;

/// A single heightmap sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainPoint {
    /// Screen position of the surface at this sample.
    pub position: Vec2,
    /// Material strength. Carried on the wire; cratering ignores it.
    pub strength: i32,
}

impl TerrainPoint {
    /// Create a point with the default strength.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            strength: DEFAULT_STRENGTH,
        }
    }
}

/// Result of a nearest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// Index of the point with the smallest horizontal distance.
    pub index: usize,
    /// Neighbour on the same side of `x` as the query, or `index` itself.
    pub second_index: usize,
    /// `x - points[index].x`.
    pub offset: f32,
}

/// Ground under an x coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ground {
    /// Interpolated surface height.
    pub y: f32,
    /// Slope between the closest and second-closest point.
    pub slope: f32,
}

/// One island's heightmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    origin: Vec2,
    points: Vec<TerrainPoint>,
}

/// Generate height offsets with the island random walk.
///
/// The walk starts around 50, moves by at most 5 per point and is clamped
/// to `[MIN_HEIGHT, MAX_HEIGHT]`.
pub fn generate_heights<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<i32> {
    let mut height = (50.0 + (rng.gen::<f64>() - 0.5) * 50.0) as i32;
    let mut heights = Vec::with_capacity(count);

    for _ in 0..count {
        height = (f64::from(height) + (rng.gen::<f64>() - 0.5) * 10.0) as i32;
        height = height.clamp(MIN_HEIGHT, MAX_HEIGHT);
        heights.push(height);
    }

    heights
}

impl Terrain {
    /// Generate a new island with `count` points starting at `origin`.
    pub fn generate<R: Rng + ?Sized>(origin: Vec2, count: usize, rng: &mut R) -> Self {
        let points = generate_heights(count, rng)
            .into_iter()
            .enumerate()
            .map(|(i, height)| {
                TerrainPoint::new(
                    origin.x + (i as u32 * POINT_SPACING) as f32,
                    origin.y + height as f32,
                )
            })
            .collect();

        Self { origin, points }
    }

    /// Build a terrain from points received over the wire.
    ///
    /// # Errors
    /// Returns [`GameError::EmptyTerrain`] when `points` is empty.
    pub fn from_points(origin: Vec2, points: Vec<TerrainPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(GameError::EmptyTerrain);
        }
        Ok(Self { origin, points })
    }

    /// Island origin.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// All points, left to right.
    #[must_use]
    pub fn points(&self) -> &[TerrainPoint] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the terrain has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Y coordinate of the island floor.
    #[must_use]
    pub fn floor(&self) -> f32 {
        self.origin.y + ISLAND_DEPTH
    }

    /// Whether the point at `index` has been pushed down to the floor.
    #[must_use]
    pub fn is_gap(&self, index: usize) -> bool {
        self.points
            .get(index)
            .is_some_and(|p| p.position.y >= self.floor())
    }

    /// Push points around `index` towards the floor.
    ///
    /// Each neighbour within `radius` moves down by
    /// `max(1, peak * (1 - |offset| / (radius + 1)))`, never past the floor.
    /// Neighbours outside the heightmap are skipped. Returns how many points
    /// actually moved.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidTerrainIndex`] when `index` itself is out
    /// of range.
    pub fn apply_crater(&mut self, index: usize, radius: usize, peak: f32) -> Result<usize> {
        let len = self.points.len();
        if index >= len {
            return Err(GameError::InvalidTerrainIndex { index, len });
        }
        Ok(self.crater(index, radius, peak))
    }

    /// Crater around an `index` known to be in range.
    fn crater(&mut self, index: usize, radius: usize, peak: f32) -> usize {
        let floor = self.floor();
        let start = index.saturating_sub(radius);
        let end = (index + radius).min(self.points.len() - 1);
        let mut moved = 0;

        for i in start..=end {
            let distance = i.abs_diff(index) as f32;
            let factor = 1.0 - distance / (radius as f32 + 1.0);
            let point = &mut self.points[i];
            let lowered = (point.position.y + (peak * factor).max(1.0)).min(floor);
            if lowered > point.position.y {
                point.position.y = lowered;
                moved += 1;
            }
        }

        tracing::trace!(index, moved, "crater applied");
        moved
    }

    /// Whether a projectile nose at `nose` hits the point at `index`.
    ///
    /// A hit craters the terrain around `index`. Gap points never register
    /// a hit.
    pub fn hit_poll(&mut self, index: usize, nose: Vec2) -> bool {
        let Some(point) = self.points.get(index) else {
            return false;
        };
        if point.position.y >= self.floor() {
            return false;
        }

        let hit = nose.y >= point.position.y && (nose.x - point.position.x).abs() <= HALF_SPACING;
        if hit {
            self.crater(index, CRATER_RADIUS, CRATER_PEAK);
        }
        hit
    }

    /// Find the point horizontally closest to `x`.
    ///
    /// On ties the leftmost candidate wins. The second point is the
    /// neighbour towards `x`; at the ends of the heightmap, or when `x` is
    /// exactly on a point, it is the closest point itself.
    #[must_use]
    pub fn closest_point(&self, x: f32) -> Option<ClosestPoint> {
        let mut best: Option<(usize, f32)> = None;
        for (i, point) in self.points.iter().enumerate() {
            let offset = x - point.position.x;
            match best {
                Some((_, best_offset)) if offset.abs() >= best_offset.abs() => {}
                _ => best = Some((i, offset)),
            }
        }

        let (index, offset) = best?;
        let second_index = if offset < 0.0 && index > 0 {
            index - 1
        } else if offset > 0.0 && index + 1 < self.points.len() {
            index + 1
        } else {
            index
        };

        Some(ClosestPoint {
            index,
            second_index,
            offset,
        })
    }

    /// Ground surface under `x`, if any.
    ///
    /// There is no ground when `x` is more than half a spacing away from
    /// every point or when the closest point is a gap.
    #[must_use]
    pub fn ground_at(&self, x: f32) -> Option<Ground> {
        let closest = self.closest_point(x)?;
        if closest.offset.abs() > HALF_SPACING || self.is_gap(closest.index) {
            return None;
        }

        let a = self.points[closest.index].position;
        let b = self.points[closest.second_index].position;
        if closest.index == closest.second_index {
            return Some(Ground { y: a.y, slope: 0.0 });
        }

        let slope = (b.y - a.y) / (b.x - a.x);
        Some(Ground {
            y: a.y + slope * (x - a.x),
            slope,
        })
    }

    /// Split the heightmap into maximal runs of non-gap points.
    ///
    /// Returned ranges index into [`Terrain::points`].
    #[must_use]
    pub fn segments(&self) -> Vec<std::ops::Range<usize>> {
        let mut segments = Vec::new();
        let mut start = None;

        for i in 0..self.points.len() {
            match (self.is_gap(i), start) {
                (false, None) => start = Some(i),
                (true, Some(s)) => {
                    segments.push(s..i);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            segments.push(s..self.points.len());
        }

        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Side, POINTS_PER_ISLAND};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn flat_terrain(height: f32) -> Terrain {
        let origin = Side::Left.island_origin();
        let points = (0..POINTS_PER_ISLAND)
            .map(|i| TerrainPoint::new(origin.x + (i as u32 * POINT_SPACING) as f32, origin.y + height))
            .collect();
        Terrain::from_points(origin, points).unwrap()
    }

    #[test]
    fn test_generate_bounds_and_spacing() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let origin = Side::Right.island_origin();
        let terrain = Terrain::generate(origin, POINTS_PER_ISLAND, &mut rng);

        assert_eq!(terrain.len(), POINTS_PER_ISLAND);
        for (i, point) in terrain.points().iter().enumerate() {
            let offset = point.position.y - origin.y;
            assert!((25.0..=75.0).contains(&offset), "offset {offset} out of range");
            assert_eq!(point.position.x, origin.x + (i * 7) as f32);
            assert_eq!(point.strength, DEFAULT_STRENGTH);
        }
    }

    #[test]
    fn test_generate_is_seeded() {
        let a = Terrain::generate(Vec2::ZERO, 46, &mut ChaCha8Rng::seed_from_u64(99));
        let b = Terrain::generate(Vec2::ZERO, 46, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_points_rejects_empty() {
        assert!(matches!(
            Terrain::from_points(Vec2::ZERO, Vec::new()),
            Err(GameError::EmptyTerrain)
        ));
    }

    #[test]
    fn test_crater_profile() {
        let mut terrain = flat_terrain(50.0);
        let base = terrain.points()[20].position.y;

        let moved = terrain.apply_crater(20, 4, 20.0).unwrap();
        assert_eq!(moved, 9);

        assert!((terrain.points()[20].position.y - (base + 20.0)).abs() < 1e-4);
        assert!((terrain.points()[21].position.y - (base + 16.0)).abs() < 1e-4);
        assert!((terrain.points()[24].position.y - (base + 4.0)).abs() < 1e-4);
        assert_eq!(terrain.points()[25].position.y, base);
        assert_eq!(terrain.points()[15].position.y, base);
    }

    #[test]
    fn test_crater_at_edge_skips_missing_neighbours() {
        let mut terrain = flat_terrain(50.0);
        let moved = terrain.apply_crater(0, 4, 20.0).unwrap();
        assert_eq!(moved, 5);

        let last = terrain.len() - 1;
        let moved = terrain.apply_crater(last, 4, 20.0).unwrap();
        assert_eq!(moved, 5);
    }

    #[test]
    fn test_crater_invalid_index() {
        let mut terrain = flat_terrain(50.0);
        let err = terrain.apply_crater(46, 4, 20.0).unwrap_err();
        assert!(matches!(
            err,
            GameError::InvalidTerrainIndex { index: 46, len: 46 }
        ));
    }

    #[test]
    fn test_crater_clamps_to_floor_and_saturates() {
        let mut terrain = flat_terrain(95.0);
        terrain.apply_crater(10, 4, 20.0).unwrap();

        for point in terrain.points() {
            assert!(point.position.y <= terrain.floor());
        }
        assert!(terrain.is_gap(10));

        let snapshot = terrain.clone();
        for _ in 0..10 {
            terrain.apply_crater(10, 4, 20.0).unwrap();
        }
        let after_many = terrain.clone();
        terrain.apply_crater(10, 4, 20.0).unwrap();
        assert_eq!(terrain, after_many);
        assert_ne!(snapshot, after_many);
    }

    #[test]
    fn test_hit_poll_hits_and_craters() {
        let mut terrain = flat_terrain(50.0);
        let point = terrain.points()[12].position;

        assert!(terrain.hit_poll(12, Vec2::new(point.x + 3.0, point.y + 1.0)));
        assert!(terrain.points()[12].position.y > point.y);
    }

    #[test]
    fn test_hit_poll_uses_impact_crater() {
        let mut polled = flat_terrain(50.0);
        let mut applied = flat_terrain(50.0);
        let point = polled.points()[1].position;

        assert!(polled.hit_poll(1, point));
        assert_eq!(applied.apply_crater(1, CRATER_RADIUS, CRATER_PEAK).unwrap(), 6);
        assert_eq!(polled, applied);

        // Peak at the hit, one point per step of falloff, nothing past the radius
        let depth = |i: usize| polled.points()[i].position.y - point.y;
        assert!((depth(1) - CRATER_PEAK).abs() < 1e-4);
        assert!((depth(0) - 16.0).abs() < 1e-4);
        assert!((depth(5) - 4.0).abs() < 1e-4);
        assert_eq!(depth(6), 0.0);
    }

    #[test]
    fn test_hit_poll_misses() {
        let mut terrain = flat_terrain(50.0);
        let point = terrain.points()[12].position;

        // Above the surface.
        assert!(!terrain.hit_poll(12, Vec2::new(point.x, point.y - 1.0)));
        // Outside the column.
        assert!(!terrain.hit_poll(12, Vec2::new(point.x + 4.0, point.y + 1.0)));
        // Out of range.
        assert!(!terrain.hit_poll(100, point));
        assert_eq!(terrain.points()[12].position.y, point.y);
    }

    #[test]
    fn test_hit_poll_ignores_gap_points() {
        let mut terrain = flat_terrain(100.0);
        let point = terrain.points()[5].position;
        assert!(terrain.is_gap(5));
        assert!(!terrain.hit_poll(5, point));
    }

    #[test]
    fn test_closest_point_before_first() {
        let terrain = flat_terrain(50.0);
        let closest = terrain.closest_point(0.0).unwrap();
        assert_eq!(closest.index, 0);
        assert_eq!(closest.second_index, 0);
        assert!(closest.offset < 0.0);
    }

    #[test]
    fn test_closest_point_neighbours() {
        let terrain = flat_terrain(50.0);
        let x = terrain.points()[10].position.x;

        let right = terrain.closest_point(x + 2.0).unwrap();
        assert_eq!((right.index, right.second_index), (10, 11));

        let left = terrain.closest_point(x - 2.0).unwrap();
        assert_eq!((left.index, left.second_index), (10, 9));

        let exact = terrain.closest_point(x).unwrap();
        assert_eq!((exact.index, exact.second_index), (10, 10));

        // Exactly between two points: the left one wins.
        let tie = terrain.closest_point(x + 3.5).unwrap();
        assert_eq!(tie.index, 10);
    }

    #[test]
    fn test_closest_point_empty() {
        let terrain = Terrain {
            origin: Vec2::ZERO,
            points: Vec::new(),
        };
        assert!(terrain.closest_point(10.0).is_none());
        assert!(terrain.ground_at(10.0).is_none());
    }

    #[test]
    fn test_ground_interpolates_slope() {
        let origin = Vec2::new(0.0, 0.0);
        let points = vec![
            TerrainPoint::new(0.0, 50.0),
            TerrainPoint::new(7.0, 57.0),
            TerrainPoint::new(14.0, 57.0),
        ];
        let terrain = Terrain::from_points(origin, points).unwrap();

        let ground = terrain.ground_at(2.0).unwrap();
        assert!((ground.slope - 1.0).abs() < 1e-4);
        assert!((ground.y - 52.0).abs() < 1e-4);

        assert!(terrain.ground_at(-4.0).is_none());
        assert!(terrain.ground_at(18.0).is_none());
    }

    #[test]
    fn test_ground_missing_over_gap() {
        let mut terrain = flat_terrain(90.0);
        terrain.apply_crater(20, 4, 20.0).unwrap();
        let x = terrain.points()[20].position.x;
        assert!(terrain.ground_at(x).is_none());
    }

    #[test]
    fn test_segments_split_on_gaps() {
        let mut terrain = flat_terrain(90.0);
        assert_eq!(terrain.segments(), vec![0..46]);

        // 10 + max(1, 20 * (1 - d / 5)) reaches the floor for d <= 2.
        terrain.apply_crater(20, 4, 20.0).unwrap();
        assert_eq!(terrain.segments(), vec![0..18, 23..46]);
    }
}
