//! The player body
//!
//! The player keeps a fixed screen x; horizontal intent scrolls the camera
//! instead. Vertically it runs a fixed-step arc: rise one unit per tick
//! while the jump counter fills (half a step per tick), then fall one unit
//! per tick until a tile is underneath.

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{Rect, blocked_ahead, ceiling_above, supported};
use super::effects::{Cue, EffectsBus, PLAYER_ID, Wave};
use super::segment::Tile;
use crate::consts::{PLAYER_SCREEN_X, PLAYER_SIZE, STOMP_REBOUND};

/// One discrete movement intent per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Intent {
    MoveLeft,
    MoveRight,
    Jump,
    #[default]
    None,
}

/// Odds of a footstep echo on a running tick
const RUN_ECHO_CHANCE: f64 = 1.0 / 21.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner, screen space
    pub pos: DVec2,
    pub size: DVec2,
    /// +1 right, -1 left
    pub direction: f64,
    /// Camera scroll per running tick
    pub speed: f64,
    pub jump_limit: f64,
    pub jump_progress: f64,
    pub jumping: bool,
    pub falling: bool,
    /// Jump is only re-armed after the intent is released on the ground
    pub jump_armed: bool,
    pub running: bool,
    pub dead: bool,
    pub won: bool,
}

impl Player {
    pub fn new(y: f64, speed: f64, jump_limit: f64) -> Self {
        Self {
            pos: DVec2::new(PLAYER_SCREEN_X, y),
            size: DVec2::splat(PLAYER_SIZE),
            direction: 1.0,
            speed,
            jump_limit,
            jump_progress: 0.0,
            jumping: false,
            falling: false,
            jump_armed: true,
            running: false,
            dead: false,
            won: false,
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }

    /// Feet position, where echoes start
    fn feet(&self) -> DVec2 {
        DVec2::new(self.pos.x + self.size.x / 2.0, self.pos.y + self.size.y)
    }

    pub fn is_grounded(&self) -> bool {
        !self.jumping && !self.falling
    }

    /// Begin a jump; a rebound skips most of the counter
    pub fn start_jump(&mut self, rebound: bool) {
        self.jumping = true;
        self.falling = false;
        self.jump_armed = false;
        self.jump_progress = if rebound {
            (self.jump_limit * STOMP_REBOUND).floor()
        } else {
            0.0
        };
    }

    /// Resolve `intent` into the camera scroll for this tick.
    ///
    /// Returns zero when the step ahead is walled off.
    pub fn scroll_intent<R: Rng + ?Sized>(
        &mut self,
        intent: Intent,
        tiles: &[&Tile],
        effects: &mut EffectsBus,
        rng: &mut R,
    ) -> f64 {
        self.running = false;
        match intent {
            Intent::MoveLeft | Intent::MoveRight => {
                self.direction = if intent == Intent::MoveLeft { -1.0 } else { 1.0 };
                if self.is_grounded() {
                    self.jump_armed = true;
                }
                if blocked_ahead(&self.rect(), self.direction, self.speed, tiles.iter().copied()) {
                    return 0.0;
                }
                self.running = true;
                if self.is_grounded() && rng.random_bool(RUN_ECHO_CHANCE) {
                    let growth = rng.random_range(6..=10) as f64;
                    effects.spawn_wave(Wave::new(self.feet(), growth, 12.0));
                }
                self.direction * self.speed
            }
            Intent::Jump => {
                if self.is_grounded() && self.jump_armed && self.jump_progress < self.jump_limit {
                    self.start_jump(false);
                    let growth = rng.random_range(4..=6) as f64;
                    effects.spawn_wave(Wave::new(self.feet(), growth, 9.0));
                }
                0.0
            }
            Intent::None => {
                if self.is_grounded() {
                    self.jump_armed = true;
                }
                0.0
            }
        }
    }

    /// Advance the vertical arc by one tick
    pub fn step_vertical(&mut self, tiles: &[&Tile], effects: &mut EffectsBus) {
        if self.jumping && self.jump_progress >= self.jump_limit {
            self.jumping = false;
            self.falling = true;
        }

        if self.jumping {
            if ceiling_above(&self.rect(), 1.0, tiles.iter().copied()) {
                self.jumping = false;
                self.falling = true;
            } else {
                self.pos.y -= 1.0;
                self.jump_progress += 0.5;
            }
        } else if self.falling {
            if supported(&self.rect(), 1.0, tiles.iter().copied()) {
                self.falling = false;
                self.jump_progress = 0.0;
                effects.emit_with_wave(PLAYER_ID, Cue::Land, Wave::new(self.feet(), 4.0, 9.0));
            } else {
                self.pos.y += 1.0;
            }
        } else if !supported(&self.rect(), 1.0, tiles.iter().copied()) {
            self.falling = true;
        }
    }

    /// Death by falling off the bottom of the screen
    pub fn check_bounds(&mut self, screen_height: f64) {
        if self.pos.y > screen_height && !self.dead {
            log::info!("Player fell out of the world");
            self.dead = true;
        }
    }

    /// Win on touching the terminal landmark
    pub fn check_landmark(&mut self, landmark: Option<Rect>) {
        if let Some(rect) = landmark {
            if self.rect().overlaps(&rect) && !self.won {
                log::info!("Player reached the landmark");
                self.won = true;
            }
        }
    }
}
