//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by actor ID)
//! - No rendering, audio or platform dependencies

pub mod actor;
pub mod behavior;
pub mod collision;
pub mod compat;
pub mod effects;
pub mod fsm;
pub mod generator;
pub mod player;
pub mod segment;
pub mod state;
pub mod tick;
pub mod window;

pub use actor::{Actor, ActorEvent, ActorKind, ActorState, ActorTables, Body, KindParams, Spawner};
pub use behavior::{Contact, PlayerProbe, Senses, StepOutcome, step_actor};
pub use collision::{Rect, blocked_ahead, ceiling_above, overlaps_any, probe, supported};
pub use compat::can_follow;
pub use effects::{ActorId, Cue, EffectsBus, PLAYER_ID, Projectile, SoundEvent, Wave};
pub use fsm::{Fsm, StateHooks, TransitionTable};
pub use generator::{GeneratorConfig, Route, SegmentPool, generate};
pub use player::{Intent, Player};
pub use segment::{LandmarkPlacement, Opening, Segment, Tile, TileKind};
pub use state::{ActorView, FrameView, GamePhase, GameState, TileView};
pub use tick::{TickInput, tick};
pub use window::{PageChange, Placed, StreamWindow};
