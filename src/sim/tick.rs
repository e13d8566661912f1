//! Fixed timestep simulation tick
//!
//! One tick, in order:
//! 1. Player intent becomes a camera scroll (clamped to the route)
//! 2. The window pages at most one segment toward the player
//! 3. Player vertical arc
//! 4. Actor controllers against one player snapshot, then the stomp rebound
//! 5. Projectiles and waves
//! 6. Bounds and landmark checks, dead actors dropped, phase updated

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::behavior::{Contact, PlayerProbe, step_actor};
use super::effects::EffectsBus;
use super::player::{Intent, Player};
use super::segment::Tile;
use super::state::{GamePhase, GameState};
use crate::consts::{PLAYER_SCREEN_X, PLAYER_SIZE};
use crate::segment_index_at;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub intent: Intent,
    /// Pause toggle
    pub pause: bool,
}

impl TickInput {
    pub fn intent(intent: Intent) -> Self {
        Self {
            intent,
            ..Default::default()
        }
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            _ => {}
        }
    }
    if state.phase != GamePhase::Playing {
        return;
    }

    state.time_ticks += 1;

    let dx = {
        let tiles: Vec<&Tile> = state.window.blocks().collect();
        state
            .player
            .scroll_intent(input.intent, &tiles, &mut state.effects, &mut state.rng)
    };
    let camera = state.window.camera_offset();
    let max_camera = (state.window.route().width() - PLAYER_SCREEN_X - PLAYER_SIZE).max(0.0);
    state.apply_camera_delta((camera + dx).clamp(0.0, max_camera) - camera);

    page(state);

    let (width, height) = (state.settings.screen_width, state.settings.screen_height);
    let bounds = state.world_bounds();
    {
        let tiles: Vec<&Tile> = state.window.blocks().collect();
        state.player.step_vertical(&tiles, &mut state.effects);
        let probe = state.player_probe();
        step_actors(
            &mut state.actors,
            &probe,
            &mut state.player,
            &tiles,
            bounds,
            &mut state.effects,
            &mut state.rng,
        );
    }

    let player_rect = state.player.rect();
    if state.effects.step_projectiles(&player_rect, width, height) && !state.player.dead {
        log::info!("Player struck by a projectile");
        state.player.dead = true;
    }
    state.effects.step_waves(width, height);

    state.player.check_bounds(height);
    let landmark = state.window.landmark();
    state.player.check_landmark(landmark);

    state.actors.retain(|a| {
        let keep = !a.is_finished();
        if !keep {
            log::debug!("Removed {} #{}", a.kind.as_str(), a.id);
        }
        keep
    });

    if state.player.dead {
        state.phase = GamePhase::Lost;
    } else if state.player.won {
        state.phase = GamePhase::Won;
    }
    if state.is_over() {
        log::info!(
            "Session over after {} ticks: {:?}",
            state.time_ticks,
            state.phase
        );
    }
}

/// Move the cursor one segment toward the player's column, if it left it
fn page(state: &mut GameState) {
    let focus = state.window.camera_offset() + PLAYER_SCREEN_X + PLAYER_SIZE / 2.0;
    let target = segment_index_at(focus);
    let cursor = state.window.cursor() as i64;

    if target > cursor {
        let change = state.window.advance();
        if let Some(evicted) = change.evicted {
            log::debug!("Evicted segment {} (`{}`)", evicted.index, evicted.segment.id);
        }
        if let Some(index) = change.added {
            state.populate(index);
        }
    } else if target < cursor {
        state.window.retreat();
    }
}

/// Run every actor controller against this tick's tiles.
///
/// Every actor sees the same player snapshot; a stomp rebound is applied
/// once, after all actors have moved.
fn step_actors<R: Rng + ?Sized>(
    actors: &mut [Actor],
    probe: &PlayerProbe,
    player: &mut Player,
    tiles: &[&Tile],
    bounds: DVec2,
    effects: &mut EffectsBus,
    rng: &mut R,
) {
    let mut stomped = false;
    for actor in actors.iter_mut() {
        let outcome = step_actor(actor, probe, tiles, bounds, effects, rng);
        match outcome.contact {
            Contact::Stomp => {
                log::debug!("Player stomped {} #{}", actor.kind.as_str(), actor.id);
                stomped = true;
            }
            Contact::Side if !player.dead => {
                log::info!("Player caught by {} #{}", actor.kind.as_str(), actor.id);
                player.dead = true;
            }
            _ => {}
        }
    }
    if stomped {
        player.start_jump(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::actor::{ActorKind, ActorState};
    use crate::store::SegmentLibrary;

    fn flat_library() -> SegmentLibrary {
        let mut library = SegmentLibrary::builtin();
        library.normal.retain(|s| s.id == "flat");
        library.tunnel.clear();
        library
    }

    /// Flat route with no actors
    fn quiet(time_limit_minutes: u32) -> GameState {
        let settings = Settings {
            seed: 11,
            time_limit_minutes,
            actors_per_segment: Some(0),
            rear_guard: false,
            ..Settings::default()
        };
        GameState::new(&settings, &flat_library()).unwrap()
    }

    fn run(state: &mut GameState, intent: Intent, ticks: usize) {
        let input = TickInput::intent(intent);
        for _ in 0..ticks {
            tick(state, &input);
        }
    }

    #[test]
    fn test_scroll_pages_window_both_ways() {
        let mut state = quiet(1);

        run(&mut state, Intent::MoveRight, 300);
        assert_eq!(state.window.camera_offset(), 600.0);
        assert_eq!(state.window.cursor(), 1);
        assert_eq!(state.window.indices(), vec![None, Some(0), Some(1), Some(2), Some(3)]);

        run(&mut state, Intent::MoveLeft, 400);
        assert_eq!(state.window.camera_offset(), 0.0);
        assert_eq!(state.window.cursor(), 0);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_reaching_landmark_wins() {
        let mut state = quiet(0);
        assert_eq!(state.window.route().len(), 2);
        run(&mut state, Intent::MoveRight, 400);
        assert_eq!(state.phase, GamePhase::Won);
        assert!(state.is_over());
    }

    #[test]
    fn test_stomp_rebounds_player_and_kills_walker() {
        let mut state = quiet(1);
        let mut spider = state
            .spawner
            .spawn(ActorKind::Spider, DVec2::new(96.0, 416.0));
        spider.body.attack_probability = 0.0;
        let id = spider.id;
        state.actors.push(spider);
        state.player.pos.y = 380.0;
        state.player.falling = true;

        run(&mut state, Intent::None, 5);
        assert_eq!(state.actor(id).map(|a| a.state()), Some(ActorState::Dying));
        assert!(state.player.jumping);
        assert_eq!(state.phase, GamePhase::Playing);

        // Stays dying until the animation is acknowledged
        run(&mut state, Intent::None, 3);
        assert!(state.actor(id).is_some());
        assert!(state.change_state_to_locomotion(id));
        run(&mut state, Intent::None, 1);
        assert!(state.actor(id).is_none());
    }

    #[test]
    fn test_landing_on_two_walkers_stomps_both() {
        let mut state = quiet(1);
        let mut ids = Vec::new();
        for x in [84.0, 110.0] {
            let mut spider = state.spawner.spawn(ActorKind::Spider, DVec2::new(x, 416.0));
            spider.body.attack_probability = 0.0;
            ids.push(spider.id);
            state.actors.push(spider);
        }
        state.player.pos.y = 380.0;
        state.player.falling = true;

        run(&mut state, Intent::None, 5);
        for id in ids {
            assert_eq!(state.actor(id).map(|a| a.state()), Some(ActorState::Dying));
        }
        assert!(!state.player.dead);
        assert!(state.player.jumping);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_side_contact_kills_player() {
        let mut state = quiet(1);
        let mut spider = state
            .spawner
            .spawn(ActorKind::Spider, DVec2::new(131.0, 416.0));
        spider.body.attack_probability = 0.0;
        spider.body.direction = -1.0;
        state.actors.push(spider);

        run(&mut state, Intent::None, 10);
        assert_eq!(state.phase, GamePhase::Lost);
    }

    #[test]
    fn test_projectile_kills_player() {
        let mut state = quiet(1);
        state
            .effects
            .drop_projectile(99, DVec2::new(100.0, 400.0), 1.0);
        run(&mut state, Intent::None, 20);
        assert_eq!(state.phase, GamePhase::Lost);
        assert!(state.effects.projectiles.is_empty());
    }

    #[test]
    fn test_pause_freezes_simulation() {
        let mut state = quiet(1);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause);
        assert_eq!(state.phase, GamePhase::Paused);
        run(&mut state, Intent::MoveRight, 10);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.window.camera_offset(), 0.0);

        tick(&mut state, &pause);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.time_ticks, 1);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let settings = Settings {
            seed: 424242,
            time_limit_minutes: 1,
            ..Settings::default()
        };
        let library = SegmentLibrary::builtin();
        let mut state1 = GameState::new(&settings, &library).unwrap();
        let mut state2 = GameState::new(&settings, &library).unwrap();

        for t in 0..900 {
            let intent = match t % 90 {
                0..=9 => Intent::Jump,
                10..=14 => Intent::None,
                _ => Intent::MoveRight,
            };
            let input = TickInput::intent(intent);
            tick(&mut state1, &input);
            tick(&mut state2, &input);
            assert_eq!(state1.frame(), state2.frame());
            assert_eq!(state1.drain_sounds(), state2.drain_sounds());
        }
        assert_eq!(state1.time_ticks, state2.time_ticks);
    }
}
