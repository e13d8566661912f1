//! Tile-granular collision probes
//!
//! Every probe is a linear scan over the tiles the streaming window exports,
//! which is capped at five segments, so running each probe for every live
//! actor every tick stays cheap. A position outside every materialized
//! segment simply has no tiles near it and reports no collision.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::segment::Tile;

/// Axis-aligned box, y grows downward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: DVec2,
    pub size: DVec2,
}

impl Rect {
    pub fn new(min: DVec2, size: DVec2) -> Self {
        Self { min, size }
    }

    #[inline]
    pub fn max(&self) -> DVec2 {
        self.min + self.size
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.min.y + self.size.y
    }

    /// Strict overlap: boxes that only share an edge do not collide
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x
            && a_max.x > other.min.x
            && self.min.y < b_max.y
            && a_max.y > other.min.y
    }

    #[inline]
    pub fn shifted(&self, delta: DVec2) -> Rect {
        Rect::new(self.min + delta, self.size)
    }
}

/// Check whether moving `body` by `delta` runs into a tile.
///
/// Tiles the body already overlaps are its own footprint and are ignored,
/// so an actor wedged into geometry is not pinned in place forever.
pub fn probe<'a, I>(body: &Rect, delta: DVec2, tiles: I) -> bool
where
    I: IntoIterator<Item = &'a Tile>,
{
    let moved = body.shifted(delta);
    tiles.into_iter().any(|tile| {
        let rect = tile.rect();
        moved.overlaps(&rect) && !body.overlaps(&rect)
    })
}

/// One step in the direction of travel hits a tile
pub fn blocked_ahead<'a, I>(body: &Rect, direction: f64, step: f64, tiles: I) -> bool
where
    I: IntoIterator<Item = &'a Tile>,
{
    probe(body, DVec2::new(direction.signum() * step, 0.0), tiles)
}

/// One step below the body hits a tile
pub fn supported<'a, I>(body: &Rect, step: f64, tiles: I) -> bool
where
    I: IntoIterator<Item = &'a Tile>,
{
    probe(body, DVec2::new(0.0, step), tiles)
}

/// One step above the body hits a tile
pub fn ceiling_above<'a, I>(body: &Rect, step: f64, tiles: I) -> bool
where
    I: IntoIterator<Item = &'a Tile>,
{
    probe(body, DVec2::new(0.0, -step), tiles)
}

/// Any tile overlaps the body as it stands
pub fn overlaps_any<'a, I>(body: &Rect, tiles: I) -> bool
where
    I: IntoIterator<Item = &'a Tile>,
{
    tiles.into_iter().any(|t| body.overlaps(&t.rect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::segment::TileKind;

    fn floor() -> Vec<Tile> {
        (0..4)
            .map(|i| Tile::new((i * 32, 448), TileKind::Surface))
            .chain(std::iter::once(Tile::new((96, 416), TileKind::Metal)))
            .collect()
    }

    fn body_at(x: f64, y: f64) -> Rect {
        Rect::new(DVec2::new(x, y), DVec2::splat(32.0))
    }

    #[test]
    fn test_rect_edges_do_not_overlap() {
        let a = body_at(0.0, 0.0);
        let b = body_at(32.0, 0.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&b.shifted(DVec2::new(-1.0, 0.0))));
    }

    #[test]
    fn test_supported_on_floor() {
        let tiles = floor();
        assert!(supported(&body_at(10.0, 416.0), 1.0, &tiles));
        assert!(!supported(&body_at(10.0, 400.0), 1.0, &tiles));
    }

    #[test]
    fn test_blocked_ahead_by_wall() {
        let tiles = floor();
        // Standing on the floor just left of the metal block
        let body = body_at(64.0, 416.0);
        assert!(blocked_ahead(&body, 1.0, 1.0, &tiles));
        assert!(!blocked_ahead(&body, -1.0, 1.0, &tiles));
    }

    #[test]
    fn test_own_footprint_discounted() {
        let tiles = floor();
        // Sunk 4 units into the floor: the floor tiles are footprint, not support
        let body = body_at(10.0, 420.0);
        assert!(overlaps_any(&body, &tiles));
        assert!(!supported(&body, 1.0, &tiles));
    }

    #[test]
    fn test_probe_without_tiles_is_miss() {
        let body = body_at(5000.0, 0.0);
        let none: Vec<Tile> = Vec::new();
        assert!(!probe(&body, DVec2::new(1.0, 0.0), &none));
    }
}
