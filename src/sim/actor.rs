//! Actors: kinds, bodies, shared transition tables and the spawner
//!
//! An actor is a flat struct: a kind tag, the kind's parameters, a mutable
//! body and one FSM instance. Kind-specific behavior lives in
//! [`behavior`](super::behavior), dispatched on the tag.
//!
//! Two tables exist, built once per session and shared through `Arc`:
//! - cruiser table (bird, whale): Move / Attack / Dead
//! - ground table (spider, turtle): Move / MoveInAir / Attack / Jump / Fall / Dying / Dead

use std::sync::Arc;

use glam::DVec2;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::collision::{Rect, overlaps_any};
use super::effects::ActorId;
use super::fsm::{Fsm, TransitionTable};
use super::segment::{Segment, Tile, TileKind};
use crate::error::FsmError;

/// Actor FSM states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorState {
    Move,
    MoveInAir,
    Attack,
    Jump,
    Fall,
    Dying,
    Dead,
}

/// Events raised by the controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorEvent {
    Move,
    MoveInAir,
    Attack,
    Jump,
    Fall,
    Dying,
    Dead,
}

pub type ActorTable = TransitionTable<ActorState, ActorEvent>;

/// Actor kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// Airborne cruiser
    Bird,
    /// Ground walker with a long hop
    Spider,
    /// Ground walker with a short hop
    Turtle,
    /// Stationary rear-guard
    Whale,
}

impl ActorKind {
    pub const ALL: [ActorKind; 4] = [
        ActorKind::Bird,
        ActorKind::Spider,
        ActorKind::Turtle,
        ActorKind::Whale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Bird => "bird",
            ActorKind::Spider => "spider",
            ActorKind::Turtle => "turtle",
            ActorKind::Whale => "whale",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bird" => Some(ActorKind::Bird),
            "spider" => Some(ActorKind::Spider),
            "turtle" => Some(ActorKind::Turtle),
            "whale" => Some(ActorKind::Whale),
            _ => None,
        }
    }

    /// Walks on tiles and uses the ground table
    pub fn is_ground(&self) -> bool {
        matches!(self, ActorKind::Spider | ActorKind::Turtle)
    }

    fn index(self) -> usize {
        match self {
            ActorKind::Bird => 0,
            ActorKind::Spider => 1,
            ActorKind::Turtle => 2,
            ActorKind::Whale => 3,
        }
    }

    /// Fixed per-kind tuning
    pub fn params(&self) -> KindParams {
        match self {
            ActorKind::Bird => KindParams {
                size: DVec2::new(48.0, 32.0),
                speed: 1.0,
                attack_probability: 0.05,
                cry_probability: 0.01,
                jump_limit: 0,
                jump_step: DVec2::ZERO,
                attack_cooldown: 0,
            },
            ActorKind::Spider => KindParams {
                size: DVec2::new(32.0, 32.0),
                speed: 1.0,
                attack_probability: 0.005,
                cry_probability: 0.0,
                jump_limit: 7,
                jump_step: DVec2::new(7.0, 1.0),
                attack_cooldown: 0,
            },
            ActorKind::Turtle => KindParams {
                size: DVec2::new(32.0, 32.0),
                speed: 1.0,
                attack_probability: 0.005,
                cry_probability: 0.02,
                jump_limit: 3,
                jump_step: DVec2::new(7.0, 1.0),
                attack_cooldown: 0,
            },
            ActorKind::Whale => KindParams {
                size: DVec2::new(128.0, 64.0),
                speed: 0.0,
                attack_probability: 0.01,
                cry_probability: 0.0,
                jump_limit: 0,
                jump_step: DVec2::ZERO,
                // 5 s at 60 ticks per second
                attack_cooldown: 300,
            },
        }
    }
}

/// Per-kind tuning shared by every actor of that kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindParams {
    pub size: DVec2,
    /// Horizontal creep per tick
    pub speed: f64,
    pub attack_probability: f64,
    pub cry_probability: f64,
    /// Rising ticks per jump
    pub jump_limit: u32,
    /// Per-tick displacement while jumping or falling
    pub jump_step: DVec2,
    /// Ticks between attacks
    pub attack_cooldown: u32,
}

/// Mutable pose and flags of one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Top-left corner, screen space
    pub position: DVec2,
    pub size: DVec2,
    /// +1 right, -1 left
    pub direction: f64,
    pub attack_probability: f64,
    pub jump_limit: u32,
    pub jump_progress: u32,
    pub falling: bool,
    pub attacking: bool,
    pub dying: bool,
    pub dead: bool,
    /// Descent multiplier while falling
    pub fall_speed: f64,
    /// Set by the render collaborator when a one-shot animation finishes
    pub animation_done: bool,
    pub cooldown: u32,
    pub step_timer: u32,
}

impl Body {
    pub fn new(params: &KindParams) -> Self {
        Self {
            position: DVec2::ZERO,
            size: params.size,
            direction: 1.0,
            attack_probability: params.attack_probability,
            jump_limit: params.jump_limit,
            jump_progress: 0,
            falling: false,
            attacking: false,
            dying: false,
            dead: false,
            fall_speed: 1.0,
            animation_done: false,
            cooldown: 0,
            step_timer: 0,
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    #[inline]
    pub fn center(&self) -> DVec2 {
        self.position + self.size * 0.5
    }

    /// Left the world box (screen space)
    pub fn out_of_bounds(&self, width: f64, height: f64) -> bool {
        let p = self.position;
        p.x < 0.0 || p.x > width || p.y < 0.0 || p.y > height
    }
}

/// A live non-player actor
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    pub params: KindParams,
    pub body: Body,
    pub fsm: Fsm<ActorState, ActorEvent>,
}

impl Actor {
    pub fn state(&self) -> ActorState {
        self.fsm.current()
    }

    pub fn state_name(&self) -> &'static str {
        match self.fsm.current() {
            ActorState::Move => "move",
            ActorState::MoveInAir => "move_in_air",
            ActorState::Attack => "attack",
            ActorState::Jump => "jump",
            ActorState::Fall => "fall",
            ActorState::Dying => "dying",
            ActorState::Dead => "dead",
        }
    }

    /// Ready to be dropped from the live set
    pub fn is_finished(&self) -> bool {
        self.body.dead || self.fsm.is_finished()
    }
}

/// Bird and whale table
pub fn cruiser_table() -> Result<ActorTable, FsmError> {
    use ActorEvent as E;
    use ActorState as S;
    TransitionTable::builder(S::Move, S::Dead)
        .on(E::Attack, S::Move, S::Attack)
        .on(E::Move, S::Attack, S::Move)
        .on_any(E::Dead, &[S::Move, S::Attack], S::Dead)
        .build()
}

/// Spider and turtle table
pub fn ground_table() -> Result<ActorTable, FsmError> {
    use ActorEvent as E;
    use ActorState as S;
    let alive = [S::Move, S::MoveInAir, S::Attack, S::Jump, S::Fall];
    TransitionTable::builder(S::Move, S::Dead)
        .on(E::Attack, S::Move, S::Attack)
        .on(E::Jump, S::Attack, S::Jump)
        .on_any(E::Fall, &[S::Jump, S::MoveInAir], S::Fall)
        .on(E::Move, S::Fall, S::Move)
        .on(E::MoveInAir, S::Move, S::MoveInAir)
        .on_any(E::Dying, &alive, S::Dying)
        .on(E::Dead, S::Dying, S::Dead)
        .on_any(E::Dead, &alive, S::Dead)
        .build()
}

/// Both tables, validated once per session
#[derive(Debug, Clone)]
pub struct ActorTables {
    pub cruiser: Arc<ActorTable>,
    pub ground: Arc<ActorTable>,
}

impl ActorTables {
    pub fn new() -> Result<Self, FsmError> {
        Ok(Self {
            cruiser: Arc::new(cruiser_table()?),
            ground: Arc::new(ground_table()?),
        })
    }

    pub fn for_kind(&self, kind: ActorKind) -> Arc<ActorTable> {
        if kind.is_ground() {
            Arc::clone(&self.ground)
        } else {
            Arc::clone(&self.cruiser)
        }
    }
}

/// Altitude band birds are placed in
const BIRD_ALTITUDE: (f64, f64) = (32.0, 192.0);
/// Placement attempts for a bird before giving up on it
const BIRD_ATTEMPTS: usize = 8;

/// Clones per-kind prototypes and hands out ids
#[derive(Debug, Clone)]
pub struct Spawner {
    prototypes: Vec<Actor>,
    next_id: ActorId,
    /// Multiplier applied to every prototype's attack probability
    attack_scale: f64,
}

impl Spawner {
    pub fn new(tables: &ActorTables, attack_scale: f64) -> Self {
        let prototypes = ActorKind::ALL
            .iter()
            .map(|&kind| {
                let params = kind.params();
                let mut body = Body::new(&params);
                body.attack_probability =
                    (params.attack_probability * attack_scale).clamp(0.0, 1.0);
                if kind == ActorKind::Whale {
                    body.direction = -1.0;
                }
                Actor {
                    id: 0,
                    kind,
                    params,
                    body,
                    fsm: Fsm::new(tables.for_kind(kind)),
                }
            })
            .collect();
        Self {
            prototypes,
            next_id: 1,
            attack_scale,
        }
    }

    pub fn attack_scale(&self) -> f64 {
        self.attack_scale
    }

    /// Fresh copy of `kind`'s prototype at `position`
    pub fn spawn(&mut self, kind: ActorKind, position: DVec2) -> Actor {
        let mut actor = self.prototypes[kind.index()].clone();
        actor.id = self.next_id;
        self.next_id += 1;
        actor.body.position = position;
        log::debug!("Spawned {} #{} at {:?}", kind.as_str(), actor.id, position);
        actor
    }

    /// The rear-guard, top-center of the viewport
    pub fn spawn_whale(&mut self, screen_width: f64) -> Actor {
        let size = ActorKind::Whale.params().size;
        self.spawn(ActorKind::Whale, DVec2::new(screen_width / 2.0 - size.x / 2.0, 50.0))
    }

    /// Place up to `count` birds and walkers on a newly materialized segment.
    ///
    /// Walkers stand on a free Surface tile of `segment`; birds cruise above
    /// it. A spot overlapping any tile in `tiles` is never used.
    pub fn populate<R: Rng + ?Sized>(
        &mut self,
        segment: &Segment,
        count: usize,
        tiles: &[&Tile],
        rng: &mut R,
    ) -> Vec<Actor> {
        let mut surfaces: Vec<&Tile> = segment
            .tiles
            .iter()
            .filter(|t| t.kind == TileKind::Surface)
            .collect();
        surfaces.shuffle(rng);
        let mut surfaces = surfaces.into_iter();

        let mut spawned: Vec<Actor> = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = [ActorKind::Bird, ActorKind::Spider, ActorKind::Turtle]
                [rng.random_range(0..3)];
            let size = kind.params().size;
            let free = |rect: &Rect, spawned: &[Actor]| {
                !overlaps_any(rect, tiles.iter().copied())
                    && !spawned.iter().any(|a| a.body.rect().overlaps(rect))
            };

            let spot = if kind.is_ground() {
                surfaces
                    .by_ref()
                    .map(|t| DVec2::new(t.pos.x, t.pos.y - size.y))
                    .find(|&p| free(&Rect::new(p, size), &spawned))
            } else {
                let span = (
                    segment.origin_x,
                    segment.origin_x + crate::consts::SEGMENT_WIDTH - size.x,
                );
                (0..BIRD_ATTEMPTS)
                    .map(|_| {
                        DVec2::new(
                            rng.random_range(span.0..span.1).floor(),
                            rng.random_range(BIRD_ALTITUDE.0..BIRD_ALTITUDE.1).floor(),
                        )
                    })
                    .find(|&p| free(&Rect::new(p, size), &spawned))
            };

            if let Some(position) = spot {
                let mut actor = self.spawn(kind, position);
                actor.body.direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                spawned.push(actor);
            }
        }
        spawned
    }
}
