//! Session settings
//!
//! Read from a JSON file by the binary; every field has a default so a
//! partial file is enough.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{CLEARANCE_MARGIN, SCREEN_HEIGHT, SCREEN_WIDTH, SECONDS_PER_SEGMENT};
use crate::error::StoreError;
use crate::sim::generator::GeneratorConfig;

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "medium" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Multiplier on every actor kind's attack probability
    pub fn attack_scale(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 2.0,
        }
    }

    /// Actors placed on each newly materialized segment
    pub fn actors_per_segment(&self) -> usize {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
        }
    }
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed for generation and every in-tick roll
    pub seed: u64,
    pub difficulty: Difficulty,
    /// Session length; one segment per 8 seconds
    pub time_limit_minutes: u32,

    // === Viewport ===
    pub screen_width: f64,
    pub screen_height: f64,

    // === Generator ===
    /// Clearance subtracted from both ends of each entry opening
    pub clearance_margin: i32,
    /// Odds of staying in the tunnel pool after a tunnel segment
    pub tunnel_continue_chance: f64,

    // === Player ===
    /// Camera scroll per running tick
    pub player_speed: f64,
    /// Jump counter ceiling (the counter fills half a step per tick)
    pub player_jump_limit: f64,

    // === Actors ===
    /// Overrides the difficulty's actors-per-segment when set
    pub actors_per_segment: Option<usize>,
    /// Spawn the stationary rear-guard at session start
    pub rear_guard: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0,
            difficulty: Difficulty::Normal,
            time_limit_minutes: 5,

            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,

            clearance_margin: CLEARANCE_MARGIN,
            tunnel_continue_chance: 10.0 / 11.0,

            player_speed: 2.0,
            player_jump_limit: 60.0,

            actors_per_segment: None,
            rear_guard: true,
        }
    }
}

impl Settings {
    /// Default settings at a difficulty
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Number of segments in the route (never below start + end)
    pub fn route_length(&self) -> usize {
        let segments = self.time_limit_minutes.saturating_mul(60) / SECONDS_PER_SEGMENT;
        (segments as usize).max(2)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            margin: self.clearance_margin,
            tunnel_continue_chance: self.tunnel_continue_chance.clamp(0.0, 1.0),
        }
    }

    pub fn actors_per_segment(&self) -> usize {
        self.actors_per_segment
            .unwrap_or_else(|| self.difficulty.actors_per_segment())
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&json).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
