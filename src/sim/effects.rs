//! Sound cues, echo waves and projectiles
//!
//! Everything here is produced by actor hooks and the player during a tick
//! and consumed by the render/audio collaborators afterwards. The bus is
//! handed to controllers explicitly; there is no global wave list.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;

/// Actor identifier (monotonic per session, the player is always 0)
pub type ActorId = u64;

/// Id used for sounds made by the player
pub const PLAYER_ID: ActorId = 0;

/// Audio cue kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    Cry,
    Step,
    Attack,
    Land,
}

impl Cue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cue::Cry => "cry",
            Cue::Step => "step",
            Cue::Attack => "attack",
            Cue::Land => "land",
        }
    }
}

/// Fire-and-forget notification for the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub actor: ActorId,
    pub cue: Cue,
}

/// Expanding echo ring made visible by a sound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub center: DVec2,
    pub radius: f64,
    pub growth_rate: f64,
    pub thickness: f64,
}

impl Wave {
    pub fn new(center: DVec2, growth_rate: f64, thickness: f64) -> Self {
        Self {
            center,
            radius: 0.0,
            growth_rate,
            thickness,
        }
    }

    pub fn grow(&mut self) {
        self.radius += self.growth_rate;
    }

    /// Every viewport corner lies inside the ring (manhattan distance)
    pub fn covers_viewport(&self, width: f64, height: f64) -> bool {
        [
            DVec2::ZERO,
            DVec2::new(width, 0.0),
            DVec2::new(0.0, height),
            DVec2::new(width, height),
        ]
        .iter()
        .all(|corner| {
            let d = (*corner - self.center).abs();
            d.x + d.y < self.radius
        })
    }
}

/// Feather dropped by an attacking bird
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u64,
    pub owner: ActorId,
    pub pos: DVec2,
    pub size: DVec2,
    /// Horizontal drift per tick (sign of the owner's heading)
    pub direction: f64,
}

impl Projectile {
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }

    /// Drift one unit sideways and one unit down
    pub fn step(&mut self) {
        self.pos += DVec2::new(self.direction, 1.0);
    }

    pub fn out_of_bounds(&self, width: f64, height: f64) -> bool {
        self.pos.x < 0.0 || self.pos.x > width || self.pos.y > height
    }
}

/// Feather box
pub const PROJECTILE_SIZE: DVec2 = DVec2::new(16.0, 8.0);

/// Per-session collection of tick side effects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectsBus {
    pub waves: Vec<Wave>,
    pub projectiles: Vec<Projectile>,
    sounds: Vec<SoundEvent>,
    next_projectile: u64,
}

impl EffectsBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, actor: ActorId, cue: Cue) {
        self.sounds.push(SoundEvent { actor, cue });
    }

    pub fn spawn_wave(&mut self, wave: Wave) {
        self.waves.push(wave);
    }

    /// Sound with its matching echo
    pub fn emit_with_wave(&mut self, actor: ActorId, cue: Cue, wave: Wave) {
        self.emit(actor, cue);
        self.spawn_wave(wave);
    }

    pub fn drop_projectile(&mut self, owner: ActorId, pos: DVec2, direction: f64) {
        let id = self.next_projectile;
        self.next_projectile += 1;
        self.projectiles.push(Projectile {
            id,
            owner,
            pos,
            size: PROJECTILE_SIZE,
            direction: direction.signum(),
        });
    }

    /// Whether `owner` still has a projectile in flight
    pub fn has_projectile(&self, owner: ActorId) -> bool {
        self.projectiles.iter().any(|p| p.owner == owner)
    }

    /// Sounds emitted since the last drain, in emission order
    pub fn drain_sounds(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.sounds)
    }

    pub fn pending_sounds(&self) -> &[SoundEvent] {
        &self.sounds
    }

    /// Advance projectiles; returns true if one struck `player`.
    ///
    /// A projectile that hits the player or leaves the viewport is removed.
    pub fn step_projectiles(&mut self, player: &Rect, width: f64, height: f64) -> bool {
        let mut hit = false;
        self.projectiles.retain_mut(|p| {
            if p.rect().overlaps(player) {
                hit = true;
                return false;
            }
            if p.out_of_bounds(width, height) {
                return false;
            }
            p.step();
            true
        });
        hit
    }

    /// Grow every wave and retire the ones that have swept the viewport
    pub fn step_waves(&mut self, width: f64, height: f64) {
        for wave in &mut self.waves {
            wave.grow();
        }
        self.waves.retain(|w| !w.covers_viewport(width, height));
    }

    /// Scroll world-anchored effects with the camera
    pub fn apply_camera_delta(&mut self, dx: f64) {
        for wave in &mut self.waves {
            wave.center.x -= dx;
        }
        for p in &mut self.projectiles {
            p.pos.x -= dx;
        }
    }
}
