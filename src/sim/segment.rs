//! Segment and tile data
//!
//! A segment is one fixed-width slice of authored level geometry. Tile
//! positions are always absolute: `origin_x` plus the tile's local offset.
//! Translating a segment moves the origin and every tile together.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::consts::{LANDMARK_OFFSET, LANDMARK_SIZE, TILE_SIZE};

/// Tile material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Underground,
    Surface,
    Hazardless,
    Metal,
}

impl TileKind {
    /// Decode the integer used by authored records
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TileKind::Underground),
            1 => Some(TileKind::Surface),
            2 => Some(TileKind::Hazardless),
            3 => Some(TileKind::Metal),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            TileKind::Underground => 0,
            TileKind::Surface => 1,
            TileKind::Hazardless => 2,
            TileKind::Metal => 3,
        }
    }
}

/// One square tile, owned by its segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Offset from the segment origin (world units)
    pub offset: (i32, i32),
    /// Absolute top-left corner
    pub pos: DVec2,
    pub kind: TileKind,
    /// Only mutable field after authoring
    pub broken: bool,
}

impl Tile {
    pub fn new(offset: (i32, i32), kind: TileKind) -> Self {
        Self {
            offset,
            pos: DVec2::new(offset.0 as f64, offset.1 as f64),
            kind,
            broken: false,
        }
    }

    /// Collision box of this tile
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, DVec2::splat(TILE_SIZE as f64))
    }
}

/// A vertical band `[lo, hi]` through which an actor may pass between segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Opening {
    pub lo: i32,
    pub hi: i32,
}

impl Opening {
    pub const fn new(lo: i32, hi: i32) -> Self {
        Self { lo, hi }
    }

    /// Shrink both ends by `margin` (actor half-height clearance)
    pub fn shrink(self, margin: i32) -> Self {
        Self {
            lo: self.lo + margin,
            hi: self.hi - margin,
        }
    }

    /// Non-degenerate overlap: touching bands do not connect
    pub fn overlaps(self, other: Opening) -> bool {
        self.lo < other.hi && self.hi > other.lo
    }
}

impl From<[i32; 2]> for Opening {
    fn from([lo, hi]: [i32; 2]) -> Self {
        Self { lo, hi }
    }
}

impl From<Opening> for [i32; 2] {
    fn from(o: Opening) -> Self {
        [o.lo, o.hi]
    }
}

/// Where the terminal landmark sits inside the end segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPlacement {
    pub offset: DVec2,
    pub size: DVec2,
}

impl LandmarkPlacement {
    /// Landmark used by the fixed end segment
    pub fn terminal() -> Self {
        Self {
            offset: DVec2::new(LANDMARK_OFFSET.0, LANDMARK_OFFSET.1),
            size: DVec2::new(LANDMARK_SIZE.0, LANDMARK_SIZE.1),
        }
    }
}

/// One authored slice of level geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Store key the segment was loaded from
    pub id: String,
    /// Absolute x of the segment's left edge
    pub origin_x: f64,
    pub tiles: Vec<Tile>,
    pub entry_intervals: Vec<Opening>,
    pub exit_intervals: Vec<Opening>,
    pub is_tunnel_variant: bool,
    pub is_terminal: bool,
    /// Set once, when the segment is appended to a route as its end
    #[serde(default)]
    pub landmark: Option<LandmarkPlacement>,
}

impl Segment {
    pub fn new(
        id: impl Into<String>,
        tiles: Vec<Tile>,
        entry_intervals: Vec<Opening>,
        exit_intervals: Vec<Opening>,
        is_tunnel_variant: bool,
    ) -> Self {
        Self {
            id: id.into(),
            origin_x: 0.0,
            tiles,
            entry_intervals,
            exit_intervals,
            is_tunnel_variant,
            is_terminal: false,
            landmark: None,
        }
    }

    /// Rebase so the left edge sits at absolute `x`.
    ///
    /// Tile positions are recomputed from their offsets, never accumulated.
    pub fn place_at(&mut self, x: f64) {
        self.origin_x = x;
        for tile in &mut self.tiles {
            tile.pos.x = x + tile.offset.0 as f64;
        }
    }

    /// Absolute landmark box, if this is the terminal segment
    pub fn landmark_rect(&self) -> Option<Rect> {
        self.landmark.map(|l| {
            Rect::new(DVec2::new(self.origin_x + l.offset.x, l.offset.y), l.size)
        })
    }

    /// Highest tile top in the column containing absolute `x`
    pub fn surface_at(&self, x: f64) -> Option<f64> {
        let size = TILE_SIZE as f64;
        self.tiles
            .iter()
            .filter(|t| x >= t.pos.x && x < t.pos.x + size)
            .map(|t| t.pos.y)
            .min_by(|a, b| a.total_cmp(b))
    }
}
