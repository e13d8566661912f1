//! Streaming window over the route
//!
//! Five slots, logically indexed -2..=+2 around `cursor` (the route index of
//! the segment the player occupies). Slot `i` always holds route position
//! `cursor - 2 + i` when that position exists and is empty otherwise.
//!
//! Materialized segments live in screen space: route position `p` sits at
//! `p * SEGMENT_WIDTH - camera_offset`. Materialization places a fresh copy
//! at that absolute position rather than accumulating offsets, so scrolling
//! and paging commute within a tick and an advance/retreat pair restores the
//! window exactly.

use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::generator::Route;
use super::segment::{Segment, Tile};
use crate::consts::{WINDOW_CENTER, WINDOW_SLOTS};
use crate::error::WindowError;
use crate::segment_origin;

/// A route segment instantiated for collision and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placed {
    /// Route position this copy was taken from
    pub index: usize,
    pub segment: Segment,
}

/// Outcome of one paging step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageChange {
    /// Segment that left the window
    pub evicted: Option<Placed>,
    /// Route position that entered the window
    pub added: Option<usize>,
}

impl PageChange {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_none() && self.added.is_none()
    }
}

/// Sliding buffer of materialized segments
#[derive(Debug, Clone)]
pub struct StreamWindow {
    route: Route,
    cursor: usize,
    /// Cumulative horizontal scroll
    camera_offset: f64,
    slots: [Option<Placed>; WINDOW_SLOTS],
    started: bool,
}

impl StreamWindow {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            cursor: 0,
            camera_offset: 0.0,
            slots: Default::default(),
            started: false,
        }
    }

    /// Materialize the first three route segments into slots 2..=4
    pub fn start(&mut self) {
        self.cursor = 0;
        self.slots = Default::default();
        for index in 0..=WINDOW_CENTER {
            self.slots[WINDOW_CENTER + index] = self.materialize(index);
        }
        self.started = true;
        log::info!("Window started on a route of {} segments", self.route.len());
    }

    /// Step the cursor one segment forward
    pub fn try_advance(&mut self) -> Result<PageChange, WindowError> {
        if !self.started {
            return Err(WindowError::NotStarted);
        }
        if self.cursor + 1 >= self.route.len() {
            return Err(WindowError::PastEnd {
                cursor: self.cursor,
                length: self.route.len(),
            });
        }

        self.cursor += 1;
        let incoming = self.cursor + WINDOW_CENTER;

        self.slots.rotate_left(1);
        let evicted = self.slots[WINDOW_SLOTS - 1].take();
        let placed = self.materialize(incoming);
        let added = placed.as_ref().map(|p| p.index);
        if let Some(p) = &placed {
            if p.segment.is_terminal {
                log::info!("Terminal segment {} entered the window", p.index);
            }
        }
        self.slots[WINDOW_SLOTS - 1] = placed;

        log::debug!("Advanced to segment {}", self.cursor);
        Ok(PageChange { evicted, added })
    }

    /// Step the cursor one segment back
    pub fn try_retreat(&mut self) -> Result<PageChange, WindowError> {
        if !self.started {
            return Err(WindowError::NotStarted);
        }
        if self.cursor == 0 {
            return Err(WindowError::BeforeStart);
        }

        self.cursor -= 1;

        self.slots.rotate_right(1);
        let evicted = self.slots[0].take();
        let placed = self
            .cursor
            .checked_sub(WINDOW_CENTER)
            .and_then(|index| self.materialize(index));
        let added = placed.as_ref().map(|p| p.index);
        self.slots[0] = placed;

        log::debug!("Retreated to segment {}", self.cursor);
        Ok(PageChange { evicted, added })
    }

    /// Like [`try_advance`](Self::try_advance), but paging past the end is a no-op
    pub fn advance(&mut self) -> PageChange {
        self.try_advance().unwrap_or_else(|err| {
            log::debug!("Advance ignored: {err}");
            PageChange::default()
        })
    }

    /// Like [`try_retreat`](Self::try_retreat), but paging before the start is a no-op
    pub fn retreat(&mut self) -> PageChange {
        self.try_retreat().unwrap_or_else(|err| {
            log::debug!("Retreat ignored: {err}");
            PageChange::default()
        })
    }

    /// Scroll the camera by `dx`; every materialized segment moves by `-dx`
    pub fn apply_camera_delta(&mut self, dx: f64) {
        self.camera_offset += dx;
        let camera = self.camera_offset;
        for placed in self.slots.iter_mut().flatten() {
            placed
                .segment
                .place_at(segment_origin(placed.index) - camera);
        }
    }

    /// Tiles of every materialized segment, in absolute positions
    pub fn blocks(&self) -> impl Iterator<Item = &Tile> {
        self.slots
            .iter()
            .flatten()
            .flat_map(|placed| placed.segment.tiles.iter())
    }

    /// Terminal landmark box, if its segment is materialized
    pub fn landmark(&self) -> Option<Rect> {
        self.slots
            .iter()
            .flatten()
            .find_map(|placed| placed.segment.landmark_rect())
    }

    /// Materialized copy of route position `index`, if it is in the window
    pub fn placed(&self, index: usize) -> Option<&Placed> {
        self.slots.iter().flatten().find(|p| p.index == index)
    }

    pub fn slots(&self) -> &[Option<Placed>; WINDOW_SLOTS] {
        &self.slots
    }

    /// Route positions currently materialized, slot order
    pub fn indices(&self) -> Vec<Option<usize>> {
        self.slots.iter().map(|s| s.as_ref().map(|p| p.index)).collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn camera_offset(&self) -> f64 {
        self.camera_offset
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Fresh copy of `Route[index]` placed in screen space
    fn materialize(&self, index: usize) -> Option<Placed> {
        let mut segment = self.route.get(index)?.clone();
        segment.place_at(segment_origin(index) - self.camera_offset);
        Some(Placed { index, segment })
    }
}
