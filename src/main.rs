//! Echo Runner headless driver
//!
//! Runs a seeded session with a scripted runner and plays the render
//! collaborator's part: one-shot animations are acknowledged a fixed number
//! of ticks after they start, and sound cues are logged instead of played.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use echo_runner::sim::{ActorId, GamePhase, GameState, Intent, TickInput, tick};
use echo_runner::{Difficulty, SegmentLibrary, SessionError, Settings};

/// Simulation ticks per second
const TICKS_PER_SECOND: u64 = 60;
/// Length of a one-shot attack or death animation
const ANIMATION_TICKS: u64 = 30;

/// Run a headless Echo Runner session
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Session seed (overrides the settings file)
    #[arg(short, long)]
    seed: Option<u64>,
    /// Difficulty: easy, normal or hard (overrides the settings file)
    #[arg(short, long)]
    difficulty: Option<String>,
    /// Settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Segment library directory (built-in library when omitted)
    #[arg(long)]
    segments: Option<PathBuf>,
    /// Write the built-in library to this directory and exit
    #[arg(long)]
    dump_library: Option<PathBuf>,
    /// Stop after this many ticks
    #[arg(short, long, default_value_t = 60 * 60)]
    ticks: u64,
    /// Log every frame as JSON at trace level
    #[arg(long)]
    frames: bool,
}

/// Scripted runner: hold right, jump at walls and drops
struct Autopilot {
    last_camera: f64,
    jump_held: u32,
}

impl Autopilot {
    fn new() -> Self {
        Self {
            last_camera: 0.0,
            jump_held: 0,
        }
    }

    fn next(&mut self, state: &GameState) -> Intent {
        let camera = state.window.camera_offset();
        let stalled = camera == self.last_camera && state.time_ticks > 0;
        self.last_camera = camera;

        if self.jump_held > 0 {
            self.jump_held -= 1;
            return Intent::Jump;
        }
        if state.player.is_grounded() && (stalled || drop_ahead(state)) {
            self.jump_held = 2;
            return Intent::Jump;
        }
        Intent::MoveRight
    }
}

/// No floor a short way ahead of the player
fn drop_ahead(state: &GameState) -> bool {
    let rect = state.player.rect();
    let x = rect.max().x + 24.0;
    let feet = rect.bottom();
    !state
        .tiles()
        .iter()
        .any(|t| x >= t.pos.x && x < t.pos.x + 32.0 && t.pos.y >= feet && t.pos.y < feet + 96.0)
}

/// Acknowledges one-shot animations after they have played
#[derive(Default)]
struct Animator {
    started: HashMap<ActorId, u64>,
}

impl Animator {
    fn update(&mut self, state: &mut GameState) {
        let now = state.time_ticks;
        let playing: Vec<ActorId> = state
            .actors
            .iter()
            .filter(|a| (a.body.dying || a.body.attacking) && !a.body.animation_done)
            .map(|a| a.id)
            .collect();
        self.started.retain(|id, _| playing.contains(id));

        for id in playing {
            let start = *self.started.entry(id).or_insert(now);
            if now - start >= ANIMATION_TICKS {
                state.change_state_to_locomotion(id);
                self.started.remove(&id);
            }
        }
    }
}

fn settings_from(args: &Args) -> Result<Settings, SessionError> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(name) = &args.difficulty {
        match Difficulty::from_str(name) {
            Some(difficulty) => settings.difficulty = difficulty,
            None => log::warn!(
                "Unknown difficulty `{name}`, keeping {}",
                settings.difficulty.as_str()
            ),
        }
    }
    Ok(settings)
}

fn run(args: &Args) -> Result<GamePhase, SessionError> {
    if let Some(dir) = &args.dump_library {
        SegmentLibrary::builtin().save_dir(dir)?;
        log::info!("Built-in library written to {}", dir.display());
        return Ok(GamePhase::Playing);
    }

    let settings = settings_from(args)?;
    let library = match &args.segments {
        Some(dir) => SegmentLibrary::load_dir(dir)?,
        None => SegmentLibrary::builtin(),
    };
    let mut state = GameState::new(&settings, &library)?;
    let mut pilot = Autopilot::new();
    let mut animator = Animator::default();

    while !state.is_over() && state.time_ticks < args.ticks {
        let input = TickInput::intent(pilot.next(&state));
        tick(&mut state, &input);
        animator.update(&mut state);

        for sound in state.drain_sounds() {
            log::debug!("Sound: {} from #{}", sound.cue.as_str(), sound.actor);
        }
        if args.frames {
            match serde_json::to_string(&state.frame()) {
                Ok(json) => log::trace!("{json}"),
                Err(e) => log::warn!("Failed to encode frame: {e}"),
            }
        }
        if state.time_ticks % TICKS_PER_SECOND == 0 {
            log::info!(
                "t={}s segment {}/{} camera {:.0} actors {} waves {}",
                state.time_ticks / TICKS_PER_SECOND,
                state.window.cursor(),
                state.window.route().len(),
                state.window.camera_offset(),
                state.actors.len(),
                state.effects.waves.len()
            );
        }
    }
    Ok(state.phase)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("Echo Runner starting...");

    match run(&args) {
        Ok(phase) => {
            log::info!("Finished: {phase:?}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
