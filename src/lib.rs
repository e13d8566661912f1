//! Echo Runner - simulation core of a side-scrolling echolocation platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (level assembly, streaming, actors, tick)
//! - `store`: Authored segment records and the segment library
//! - `settings`: Data-driven session configuration
//! - `error`: Error taxonomy shared by the modules above

pub mod error;
pub mod settings;
pub mod sim;
pub mod store;

pub use error::{FsmError, GenerationError, SessionError, StoreError, WindowError};
pub use settings::{Difficulty, Settings};
pub use store::{SegmentLibrary, SegmentRecord};

/// Game configuration constants
pub mod consts {
    /// Side length of one square tile (world units)
    pub const TILE_SIZE: i32 = 32;
    /// Tiles across one segment
    pub const SEGMENT_TILES: i32 = 16;
    /// Width of one segment (world units)
    pub const SEGMENT_WIDTH: f64 = (TILE_SIZE * SEGMENT_TILES) as f64;

    /// Streaming window capacity (cursor-2 ..= cursor+2)
    pub const WINDOW_SLOTS: usize = 5;
    /// Index of the cursor slot inside the window
    pub const WINDOW_CENTER: usize = 2;

    /// Half-height clearance subtracted from every entry opening
    pub const CLEARANCE_MARGIN: i32 = 32;
    /// Seconds of play represented by one segment
    pub const SECONDS_PER_SEGMENT: u32 = 8;

    /// Default viewport
    pub const SCREEN_WIDTH: f64 = 1024.0;
    pub const SCREEN_HEIGHT: f64 = 640.0;

    /// Terminal landmark placement inside the end segment
    pub const LANDMARK_OFFSET: (f64, f64) = (128.0, 448.0 - 180.0);
    pub const LANDMARK_SIZE: (f64, f64) = (160.0, 180.0);

    /// Player body
    pub const PLAYER_SIZE: f64 = 32.0;
    pub const PLAYER_SCREEN_X: f64 = 96.0;
    /// Fraction of the jump already spent after a stomp rebound
    pub const STOMP_REBOUND: f64 = 0.7;

    /// Ground walker attack reach (horizontal, vertical)
    pub const ATTACK_REACH: (f64, f64) = (128.0, 32.0);
}

/// Index of the segment containing a route-space x coordinate
#[inline]
pub fn segment_index_at(route_x: f64) -> i64 {
    (route_x / consts::SEGMENT_WIDTH).floor() as i64
}

/// Route-space origin of the segment at `index`
#[inline]
pub fn segment_origin(index: usize) -> f64 {
    index as f64 * consts::SEGMENT_WIDTH
}
