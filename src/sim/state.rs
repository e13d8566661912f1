//! Game state and the views handed to collaborators
//!
//! Everything a session needs lives in [`GameState`]: the streaming window
//! (which owns the route), the player, live actors, the effects bus, the
//! spawner and the seeded RNG. No state is process-wide.

use glam::DVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actor::{Actor, ActorKind, ActorTables, Spawner};
use super::behavior::PlayerProbe;
use super::collision::Rect;
use super::effects::{ActorId, EffectsBus, Projectile, SoundEvent, Wave};
use super::generator::generate;
use super::player::Player;
use super::segment::{Tile, TileKind};
use super::window::StreamWindow;
use crate::consts::{PLAYER_SCREEN_X, PLAYER_SIZE};
use crate::error::SessionError;
use crate::segment_origin;
use crate::settings::Settings;
use crate::store::SegmentLibrary;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    Paused,
    /// Player touched the landmark
    Won,
    /// Player died
    Lost,
}

/// A visible tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileView {
    pub pos: DVec2,
    pub kind: TileKind,
    pub broken: bool,
}

/// A live actor as the renderer sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorView {
    pub id: ActorId,
    pub kind: ActorKind,
    pub position: DVec2,
    pub size: DVec2,
    pub direction: f64,
    pub state: &'static str,
    pub attacking: bool,
    pub dying: bool,
}

/// Everything the render collaborator needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameView {
    pub phase: GamePhase,
    pub cursor: usize,
    pub camera_offset: f64,
    pub tiles: Vec<TileView>,
    pub actors: Vec<ActorView>,
    pub waves: Vec<Wave>,
    pub projectiles: Vec<Projectile>,
    pub landmark: Option<Rect>,
    pub player: Rect,
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    pub seed: u64,
    pub settings: Settings,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub window: StreamWindow,
    pub player: Player,
    /// Live actors (sorted by id for determinism)
    pub actors: Vec<Actor>,
    pub effects: EffectsBus,
    pub(crate) spawner: Spawner,
    pub(crate) rng: Pcg32,
}

impl GameState {
    /// Generate a route and start a session on it.
    ///
    /// Fails only when the route cannot be generated or an actor table is
    /// malformed; a session never starts on a partial route.
    pub fn new(settings: &Settings, library: &SegmentLibrary) -> Result<Self, SessionError> {
        let seed = settings.seed;
        let mut rng = Pcg32::seed_from_u64(seed);
        let tables = ActorTables::new()?;

        let route = generate(
            &library.pool(),
            settings.route_length(),
            &library.plain,
            &library.plain,
            &settings.generator_config(),
            &mut rng,
        )?;

        let mut window = StreamWindow::new(route);
        window.start();

        let x = PLAYER_SCREEN_X + PLAYER_SIZE / 2.0;
        let ground = window
            .placed(0)
            .and_then(|p| p.segment.surface_at(x))
            .unwrap_or(PLAYER_SIZE);
        let player = Player::new(
            ground - PLAYER_SIZE,
            settings.player_speed,
            settings.player_jump_limit,
        );

        let mut state = Self {
            seed,
            settings: settings.clone(),
            phase: GamePhase::Playing,
            time_ticks: 0,
            window,
            player,
            actors: Vec::new(),
            effects: EffectsBus::new(),
            spawner: Spawner::new(&tables, settings.difficulty.attack_scale()),
            rng,
        };

        if settings.rear_guard {
            let whale = state.spawner.spawn_whale(settings.screen_width);
            state.actors.push(whale);
        }
        // The start segment stays clear
        for index in 1..state.window.route().len().min(3) {
            state.populate(index);
        }

        log::info!(
            "Session started: seed {}, {} segments, difficulty {}",
            seed,
            state.window.route().len(),
            settings.difficulty.as_str()
        );
        Ok(state)
    }

    /// Tiles of every materialized segment
    pub fn tiles(&self) -> Vec<&Tile> {
        self.window.blocks().collect()
    }

    /// Spawn actors onto the materialized copy of route position `index`
    pub fn populate(&mut self, index: usize) {
        let count = self.settings.actors_per_segment();
        let Some(placed) = self.window.placed(index) else {
            return;
        };
        let tiles: Vec<&Tile> = self.window.blocks().collect();
        let spawned = self
            .spawner
            .populate(&placed.segment, count, &tiles, &mut self.rng);
        self.actors.extend(spawned);
        self.normalize_order();
    }

    /// What controllers see of the player this tick
    pub fn player_probe(&self) -> PlayerProbe {
        PlayerProbe {
            rect: self.player.rect(),
            descending: self.player.falling,
        }
    }

    /// Box actors must stay inside, screen space.
    ///
    /// Spans the viewport and every materialized segment to its right, so
    /// actors waiting off-screen ahead of the player stay alive.
    pub fn world_bounds(&self) -> DVec2 {
        let right = self
            .window
            .indices()
            .into_iter()
            .flatten()
            .max()
            .map(|last| segment_origin(last + 1) - self.window.camera_offset())
            .unwrap_or(0.0);
        DVec2::new(
            right.max(self.settings.screen_width),
            self.settings.screen_height,
        )
    }

    /// Scroll the camera; the only path by which horizontal movement happens
    pub fn apply_camera_delta(&mut self, dx: f64) {
        if dx == 0.0 {
            return;
        }
        self.window.apply_camera_delta(dx);
        for actor in &mut self.actors {
            actor.body.position.x -= dx;
        }
        self.effects.apply_camera_delta(dx);
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    /// Render callback: a one-shot attack or death animation finished.
    ///
    /// The matching FSM event fires on the actor's next tick. Returns
    /// false for an unknown id.
    pub fn change_state_to_locomotion(&mut self, id: ActorId) -> bool {
        match self.actors.iter_mut().find(|a| a.id == id) {
            Some(actor) => {
                actor.body.animation_done = true;
                true
            }
            None => {
                log::debug!("Animation callback for unknown actor #{id}");
                false
            }
        }
    }

    /// Sounds emitted since the last call
    pub fn drain_sounds(&mut self) -> Vec<SoundEvent> {
        self.effects.drain_sounds()
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::Won | GamePhase::Lost)
    }

    /// Snapshot for the render collaborator
    pub fn frame(&self) -> FrameView {
        FrameView {
            phase: self.phase,
            cursor: self.window.cursor(),
            camera_offset: self.window.camera_offset(),
            tiles: self
                .window
                .blocks()
                .map(|t| TileView {
                    pos: t.pos,
                    kind: t.kind,
                    broken: t.broken,
                })
                .collect(),
            actors: self
                .actors
                .iter()
                .map(|a| ActorView {
                    id: a.id,
                    kind: a.kind,
                    position: a.body.position,
                    size: a.body.size,
                    direction: a.body.direction,
                    state: a.state_name(),
                    attacking: a.body.attacking,
                    dying: a.body.dying,
                })
                .collect(),
            waves: self.effects.waves.clone(),
            projectiles: self.effects.projectiles.clone(),
            landmark: self.window.landmark(),
            player: self.player.rect(),
        }
    }

    /// Ensure actors are sorted by id for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.actors.sort_by_key(|a| a.id);
    }
}
