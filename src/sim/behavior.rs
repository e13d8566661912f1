//! Per-kind actor controllers
//!
//! Each tick, for every live actor:
//! 1. Sense: player contact, world bounds, ground support
//! 2. Decide: map the predicates to at most one event, in the kind's fixed
//!    priority order (death outranks attack, attack outranks locomotion)
//! 3. Feed the event to the actor's FSM; the state hooks below do the
//!    actual pose mutation
//!
//! Hooks receive a [`Ctx`] borrowing the actor body, the window's tiles and
//! the effects bus, so no hook needs access to the rest of the game state.

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::actor::{Actor, ActorEvent, ActorKind, ActorState, Body, KindParams};
use super::collision::{Rect, blocked_ahead, ceiling_above, supported};
use super::effects::{ActorId, Cue, EffectsBus, Wave};
use super::fsm::StateHooks;
use super::segment::Tile;
use crate::consts::ATTACK_REACH;

/// Ticks between walker footsteps
pub const STEP_INTERVAL: u32 = 32;

/// How the player touches an actor this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Contact {
    #[default]
    None,
    /// Player descending onto the actor from above
    Stomp,
    /// Any other overlap
    Side,
}

/// What a controller needs to know about the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerProbe {
    pub rect: Rect,
    pub descending: bool,
}

/// Physical predicates for one actor on one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Senses {
    pub contact: Contact,
    pub out_of_bounds: bool,
    pub supported: bool,
    /// Player center minus actor position
    pub to_player: DVec2,
}

/// Classify the overlap between the player and `body`
pub fn contact(body: &Body, player: &PlayerProbe) -> Contact {
    let rect = body.rect();
    if !player.rect.overlaps(&rect) {
        Contact::None
    } else if player.descending && player.rect.min.y < rect.min.y {
        Contact::Stomp
    } else {
        Contact::Side
    }
}

pub fn sense(
    actor: &Actor,
    player: &PlayerProbe,
    tiles: &[&Tile],
    bounds: DVec2,
) -> Senses {
    let body = &actor.body;
    let rect = body.rect();
    let contact = match contact(body, player) {
        _ if body.dying || body.dead => Contact::None,
        // The rear-guard cannot be stomped
        Contact::Stomp if actor.kind == ActorKind::Whale => Contact::Side,
        other => other,
    };
    Senses {
        contact,
        out_of_bounds: body.out_of_bounds(bounds.x, bounds.y),
        supported: supported(&rect, 1.0, tiles.iter().copied()),
        to_player: player.rect.min + player.rect.size * 0.5 - body.position,
    }
}

fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.random_bool(probability.clamp(0.0, 1.0))
}

/// Pick this tick's event for `actor`.
///
/// May adjust the body ahead of the transition (facing, fall speed).
pub fn decide<R: Rng + ?Sized>(
    actor: &mut Actor,
    senses: &Senses,
    rng: &mut R,
) -> Option<ActorEvent> {
    match actor.kind {
        ActorKind::Bird => decide_cruiser(actor, senses, rng),
        ActorKind::Spider | ActorKind::Turtle => decide_ground(actor, senses, rng),
        ActorKind::Whale => decide_rear_guard(actor, senses, rng),
    }
}

fn decide_cruiser<R: Rng + ?Sized>(
    actor: &mut Actor,
    senses: &Senses,
    rng: &mut R,
) -> Option<ActorEvent> {
    let state = actor.state();
    if senses.contact == Contact::Stomp || senses.out_of_bounds {
        Some(ActorEvent::Dead)
    } else if state == ActorState::Attack {
        Some(ActorEvent::Move)
    } else if state == ActorState::Move && roll(rng, actor.body.attack_probability) {
        Some(ActorEvent::Attack)
    } else {
        None
    }
}

fn decide_ground<R: Rng + ?Sized>(
    actor: &mut Actor,
    senses: &Senses,
    rng: &mut R,
) -> Option<ActorEvent> {
    let state = actor.state();
    let body = &mut actor.body;
    let reach = senses.to_player - body.size * 0.5;

    if senses.contact == Contact::Stomp {
        Some(ActorEvent::Dying)
    } else if senses.out_of_bounds {
        Some(ActorEvent::Dead)
    } else if state == ActorState::Dying {
        body.animation_done.then_some(ActorEvent::Dead)
    } else if state == ActorState::Jump && body.falling {
        Some(ActorEvent::Fall)
    } else if state == ActorState::Fall && !body.falling {
        body.fall_speed = 1.0;
        Some(ActorEvent::Move)
    } else if state == ActorState::Attack {
        Some(ActorEvent::Jump)
    } else if state == ActorState::Move
        && !body.attacking
        && reach.y.abs() < ATTACK_REACH.1
        && reach.x.abs() < ATTACK_REACH.0
        && roll(rng, body.attack_probability)
    {
        body.direction = if reach.x < 0.0 { -1.0 } else { 1.0 };
        Some(ActorEvent::Attack)
    } else if state == ActorState::Move && !senses.supported {
        Some(ActorEvent::MoveInAir)
    } else if state == ActorState::MoveInAir {
        body.falling = true;
        body.fall_speed = 2.0;
        Some(ActorEvent::Fall)
    } else {
        None
    }
}

fn decide_rear_guard<R: Rng + ?Sized>(
    actor: &mut Actor,
    senses: &Senses,
    rng: &mut R,
) -> Option<ActorEvent> {
    let state = actor.state();
    let body = &mut actor.body;
    if senses.out_of_bounds {
        Some(ActorEvent::Dead)
    } else if state == ActorState::Attack && body.animation_done {
        Some(ActorEvent::Move)
    } else if state == ActorState::Move
        && body.cooldown == 0
        && roll(rng, body.attack_probability)
    {
        Some(ActorEvent::Attack)
    } else {
        None
    }
}

/// Hook subject: one actor's body plus what its hooks may touch
pub struct Ctx<'a> {
    pub id: ActorId,
    pub kind: ActorKind,
    pub params: &'a KindParams,
    pub body: &'a mut Body,
    pub tiles: &'a [&'a Tile],
    pub effects: &'a mut EffectsBus,
}

impl Ctx<'_> {
    fn blocked(&self) -> bool {
        blocked_ahead(
            &self.body.rect(),
            self.body.direction,
            1.0,
            self.tiles.iter().copied(),
        )
    }

    fn supported(&self) -> bool {
        supported(&self.body.rect(), 1.0, self.tiles.iter().copied())
    }

    /// Reverse on a wall unless attacking
    fn turn_if_blocked(&mut self) -> bool {
        if self.blocked() {
            if !self.body.attacking {
                self.body.direction = -self.body.direction;
            }
            return true;
        }
        false
    }

    /// Slide up to `dx` units, stopping at the first wall
    fn slide(&mut self, dx: f64) {
        let step = dx.signum();
        let mut left = dx.abs();
        while left > 0.0 {
            let rect = self.body.rect();
            if blocked_ahead(&rect, step, 1.0, self.tiles.iter().copied()) {
                break;
            }
            let unit = left.min(1.0);
            self.body.position.x += step * unit;
            left -= unit;
        }
    }

    /// Drop up to `dy` units; returns true on touching ground
    fn descend(&mut self, dy: f64) -> bool {
        let mut left = dy;
        while left > 0.0 {
            if self.supported() {
                return true;
            }
            let unit = left.min(1.0);
            self.body.position.y += unit;
            left -= unit;
        }
        self.supported()
    }

    fn land(&mut self) {
        self.body.falling = false;
        self.body.jump_progress = 0;
        if self.kind.is_ground() {
            let at = DVec2::new(self.body.center().x, self.body.rect().bottom());
            self.effects
                .emit_with_wave(self.id, Cue::Land, Wave::new(at, 3.0, 12.0));
        }
    }

    fn creep(&mut self) {
        if self.params.speed <= 0.0 {
            return;
        }
        self.turn_if_blocked();
        if !self.blocked() {
            self.body.position.x += self.body.direction * self.params.speed;
        }
        if self.kind.is_ground() {
            self.body.step_timer += 1;
            if self.body.step_timer >= STEP_INTERVAL {
                self.body.step_timer = 0;
                self.effects.emit(self.id, Cue::Step);
            }
        }
    }
}

impl<'a> StateHooks<Ctx<'a>> for ActorState {
    fn enter(self, ctx: &mut Ctx<'a>) {
        match self {
            ActorState::Move => {
                ctx.body.attacking = false;
            }
            ActorState::Attack => {
                if ctx.body.dying || ctx.body.dead {
                    return;
                }
                ctx.body.attacking = true;
                ctx.body.animation_done = false;
                match ctx.kind {
                    ActorKind::Spider | ActorKind::Turtle => {
                        ctx.body.jump_progress = 0;
                        ctx.body.falling = false;
                    }
                    ActorKind::Bird => {
                        if !ctx.effects.has_projectile(ctx.id) {
                            let at = DVec2::new(ctx.body.center().x, ctx.body.rect().bottom());
                            ctx.effects.drop_projectile(ctx.id, at, ctx.body.direction);
                            ctx.effects.emit(ctx.id, Cue::Attack);
                        }
                    }
                    ActorKind::Whale => {
                        ctx.body.cooldown = ctx.params.attack_cooldown;
                        let at = ctx.body.center();
                        ctx.effects
                            .emit_with_wave(ctx.id, Cue::Attack, Wave::new(at, 1.0, 108.0));
                    }
                }
            }
            ActorState::Dying => {
                ctx.body.dying = true;
                ctx.body.attacking = false;
                ctx.body.animation_done = false;
            }
            ActorState::Dead => {
                ctx.body.dead = true;
            }
            ActorState::MoveInAir | ActorState::Jump | ActorState::Fall => {}
        }
    }

    fn update(self, ctx: &mut Ctx<'a>) {
        match self {
            ActorState::Move | ActorState::MoveInAir => ctx.creep(),
            ActorState::Jump => {
                let body = &*ctx.body;
                if body.jump_progress >= body.jump_limit {
                    ctx.body.falling = true;
                    return;
                }
                let rect = body.rect();
                let step = ctx.params.jump_step;
                if ceiling_above(&rect, step.y, ctx.tiles.iter().copied()) {
                    ctx.body.falling = true;
                    return;
                }
                ctx.body.position.y -= step.y;
                if !ctx.turn_if_blocked() {
                    ctx.slide(step.x * ctx.body.direction);
                }
                ctx.body.jump_progress += 1;
                if ctx.body.jump_progress >= ctx.body.jump_limit {
                    ctx.body.falling = true;
                }
            }
            ActorState::Fall => {
                if !ctx.body.falling {
                    return;
                }
                if ctx.supported() {
                    ctx.land();
                    return;
                }
                let step = ctx.params.jump_step;
                if !ctx.turn_if_blocked() {
                    ctx.slide(step.x * ctx.body.direction);
                }
                let dy = step.y.max(1.0) * ctx.body.fall_speed;
                if ctx.descend(dy) {
                    ctx.land();
                } else if ctx.body.attacking && ctx.body.jump_progress > 0 {
                    ctx.body.jump_progress -= 1;
                }
            }
            ActorState::Attack | ActorState::Dying | ActorState::Dead => {}
        }
    }
}

/// Result of one controller step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub contact: Contact,
    /// The machine reached its terminal state
    pub finished: bool,
}

/// Sense, decide, feed the FSM, and run the kind's ambient rolls
pub fn step_actor<R: Rng + ?Sized>(
    actor: &mut Actor,
    player: &PlayerProbe,
    tiles: &[&Tile],
    bounds: DVec2,
    effects: &mut EffectsBus,
    rng: &mut R,
) -> StepOutcome {
    let senses = sense(actor, player, tiles, bounds);
    let event = decide(actor, &senses, rng);

    if actor.body.cooldown > 0 {
        actor.body.cooldown -= 1;
    }

    let Actor {
        id,
        kind,
        params,
        body,
        fsm,
    } = actor;
    let mut ctx = Ctx {
        id: *id,
        kind: *kind,
        params,
        body,
        tiles,
        effects,
    };
    let alive = fsm.update(event, &mut ctx);

    if alive && !ctx.body.dying && roll(rng, ctx.params.cry_probability) {
        let at = ctx.body.center();
        ctx.effects
            .emit_with_wave(ctx.id, Cue::Cry, Wave::new(at, 2.0, 24.0));
    }

    StepOutcome {
        contact: senses.contact,
        finished: !alive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actor::{ActorTables, Spawner};
    use crate::sim::segment::TileKind;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const BOUNDS: DVec2 = DVec2::new(1024.0, 640.0);

    fn floor() -> Vec<Tile> {
        (0..32)
            .map(|i| Tile::new((i * 32, 448), TileKind::Surface))
            .collect()
    }

    fn far_player() -> PlayerProbe {
        PlayerProbe {
            rect: Rect::new(DVec2::new(900.0, 0.0), DVec2::splat(32.0)),
            descending: false,
        }
    }

    fn spawner() -> Spawner {
        Spawner::new(&ActorTables::new().unwrap(), 1.0)
    }

    /// Actor that never rolls an attack or a cry
    fn calm(kind: ActorKind, position: DVec2) -> Actor {
        let mut actor = spawner().spawn(kind, position);
        actor.body.attack_probability = 0.0;
        actor.params.cry_probability = 0.0;
        actor
    }

    #[test]
    fn test_jump_limit_then_fall_on_following_tick() {
        let tiles = floor();
        let refs: Vec<&Tile> = tiles.iter().collect();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut spider = calm(ActorKind::Spider, DVec2::new(300.0, 416.0));
        assert_eq!(spider.body.jump_limit, 7);

        // Move -> Attack -> Jump
        let mut ctx = Ctx {
            id: spider.id,
            kind: spider.kind,
            params: &spider.params,
            body: &mut spider.body,
            tiles: &refs,
            effects: &mut effects,
        };
        spider.fsm.try_fire(ActorEvent::Attack, &mut ctx).unwrap();
        step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
        assert_eq!(spider.state(), ActorState::Jump);
        assert_eq!(spider.body.jump_progress, 1);

        for tick in 2..=7 {
            step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
            assert_eq!(spider.state(), ActorState::Jump, "tick {tick}");
        }
        assert_eq!(spider.body.jump_progress, 7);
        assert!(spider.body.falling);

        let senses = sense(&spider, &far_player(), &refs, BOUNDS);
        assert_eq!(decide(&mut spider, &senses, &mut rng), Some(ActorEvent::Fall));
        step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
        assert_eq!(spider.state(), ActorState::Fall);
    }

    #[test]
    fn test_jump_then_fall_lands_and_returns_to_move() {
        let tiles = floor();
        let refs: Vec<&Tile> = tiles.iter().collect();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(2);
        let mut turtle = calm(ActorKind::Turtle, DVec2::new(300.0, 416.0));
        turtle.body.attack_probability = 1.0;
        let near = PlayerProbe {
            rect: Rect::new(DVec2::new(360.0, 416.0), DVec2::splat(32.0)),
            descending: false,
        };

        step_actor(&mut turtle, &near, &refs, BOUNDS, &mut effects, &mut rng);
        assert_eq!(turtle.state(), ActorState::Attack);
        assert!(turtle.body.attacking);
        assert_eq!(turtle.body.direction, 1.0);

        turtle.body.attack_probability = 0.0;
        let mut seen_move = false;
        for _ in 0..64 {
            step_actor(&mut turtle, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
            if turtle.state() == ActorState::Move {
                seen_move = true;
                break;
            }
        }
        assert!(seen_move);
        assert!(!turtle.body.attacking);
        assert_eq!(turtle.body.rect().bottom(), 448.0);
        assert!(effects.drain_sounds().iter().any(|s| s.cue == Cue::Land));
    }

    #[test]
    fn test_stomp_raises_dying_then_dead_after_acknowledge() {
        let tiles = floor();
        let refs: Vec<&Tile> = tiles.iter().collect();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut spider = calm(ActorKind::Spider, DVec2::new(500.0, 300.0));
        let stomp = PlayerProbe {
            rect: Rect::new(DVec2::new(505.0, 280.0), DVec2::splat(32.0)),
            descending: true,
        };

        let senses = sense(&spider, &stomp, &refs, BOUNDS);
        assert_eq!(senses.contact, Contact::Stomp);
        assert_eq!(decide(&mut spider, &senses, &mut rng), Some(ActorEvent::Dying));

        let outcome = step_actor(&mut spider, &stomp, &refs, BOUNDS, &mut effects, &mut rng);
        assert_eq!(outcome.contact, Contact::Stomp);
        assert_eq!(spider.state(), ActorState::Dying);
        assert!(spider.body.dying && !spider.body.dead);

        // Still dying while the animation runs, even with the player overlapping
        for _ in 0..10 {
            let outcome = step_actor(&mut spider, &stomp, &refs, BOUNDS, &mut effects, &mut rng);
            assert_eq!(outcome.contact, Contact::None);
            assert_eq!(spider.state(), ActorState::Dying);
        }

        spider.body.animation_done = true;
        let outcome = step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
        assert!(outcome.finished);
        assert!(spider.is_finished());
    }

    #[test]
    fn test_side_contact_reported_for_player_death() {
        let tiles = floor();
        let refs: Vec<&Tile> = tiles.iter().collect();
        let spider = calm(ActorKind::Spider, DVec2::new(300.0, 416.0));
        let side = PlayerProbe {
            rect: Rect::new(DVec2::new(320.0, 416.0), DVec2::splat(32.0)),
            descending: true,
        };
        assert_eq!(sense(&spider, &side, &refs, BOUNDS).contact, Contact::Side);
    }

    #[test]
    fn test_walker_turns_at_wall() {
        let mut tiles = floor();
        tiles.push(Tile::new((352, 416), TileKind::Metal));
        let refs: Vec<&Tile> = tiles.iter().collect();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(4);
        let mut spider = calm(ActorKind::Spider, DVec2::new(318.0, 416.0));
        spider.body.direction = 1.0;

        for _ in 0..4 {
            step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
        }
        assert_eq!(spider.body.direction, -1.0);
        assert!(spider.body.rect().max().x <= 352.0);
    }

    #[test]
    fn test_walker_off_ledge_falls_faster() {
        let tiles: Vec<Tile> = (0..4)
            .map(|i| Tile::new((i * 32, 448), TileKind::Surface))
            .chain((0..32).map(|i| Tile::new((i * 32, 600), TileKind::Surface)))
            .collect();
        let refs: Vec<&Tile> = tiles.iter().collect();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut spider = calm(ActorKind::Spider, DVec2::new(129.0, 416.0));
        spider.body.direction = 1.0;

        step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
        assert_eq!(spider.state(), ActorState::MoveInAir);
        step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
        assert_eq!(spider.state(), ActorState::Fall);
        assert_eq!(spider.body.fall_speed, 2.0);

        for _ in 0..200 {
            step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
        }
        assert_eq!(spider.state(), ActorState::Move);
        assert_eq!(spider.body.rect().bottom(), 600.0);
    }

    #[test]
    fn test_bird_attack_drops_feather_then_moves() {
        let none: Vec<&Tile> = Vec::new();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(6);
        let mut bird = calm(ActorKind::Bird, DVec2::new(400.0, 100.0));
        bird.body.attack_probability = 1.0;

        step_actor(&mut bird, &far_player(), &none, BOUNDS, &mut effects, &mut rng);
        assert_eq!(bird.state(), ActorState::Attack);
        assert!(effects.has_projectile(bird.id));
        assert_eq!(effects.pending_sounds()[0].cue, Cue::Attack);

        step_actor(&mut bird, &far_player(), &none, BOUNDS, &mut effects, &mut rng);
        assert_eq!(bird.state(), ActorState::Move);
        assert!(!bird.body.attacking);
    }

    #[test]
    fn test_bird_dies_out_of_bounds() {
        let none: Vec<&Tile> = Vec::new();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut bird = calm(ActorKind::Bird, DVec2::new(-10.0, 100.0));
        let outcome = step_actor(&mut bird, &far_player(), &none, BOUNDS, &mut effects, &mut rng);
        assert!(outcome.finished);
        assert!(bird.body.dead);
    }

    #[test]
    fn test_whale_returns_to_move_only_after_acknowledge() {
        let none: Vec<&Tile> = Vec::new();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(8);
        let mut whale = spawner().spawn_whale(1024.0);
        whale.body.attack_probability = 1.0;

        step_actor(&mut whale, &far_player(), &none, BOUNDS, &mut effects, &mut rng);
        assert_eq!(whale.state(), ActorState::Attack);
        assert_eq!(effects.waves.len(), 1);
        let x = whale.body.position.x;

        for _ in 0..20 {
            step_actor(&mut whale, &far_player(), &none, BOUNDS, &mut effects, &mut rng);
        }
        assert_eq!(whale.state(), ActorState::Attack);

        whale.body.animation_done = true;
        step_actor(&mut whale, &far_player(), &none, BOUNDS, &mut effects, &mut rng);
        assert_eq!(whale.state(), ActorState::Move);
        // Cooldown blocks an immediate second attack
        step_actor(&mut whale, &far_player(), &none, BOUNDS, &mut effects, &mut rng);
        assert_eq!(whale.state(), ActorState::Move);
        assert_eq!(whale.body.position.x, x);
    }

    #[test]
    fn test_walker_emits_steps() {
        let tiles = floor();
        let refs: Vec<&Tile> = tiles.iter().collect();
        let mut effects = EffectsBus::new();
        let mut rng = Pcg32::seed_from_u64(9);
        let mut spider = calm(ActorKind::Spider, DVec2::new(300.0, 416.0));
        for _ in 0..STEP_INTERVAL * 2 {
            step_actor(&mut spider, &far_player(), &refs, BOUNDS, &mut effects, &mut rng);
        }
        let steps = effects
            .drain_sounds()
            .iter()
            .filter(|s| s.cue == Cue::Step)
            .count();
        assert_eq!(steps, 2);
    }
}
