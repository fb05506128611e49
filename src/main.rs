/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use sim::event::GameEvent;
use sim::step::{self, Command};
use sim::world::World;
use ui::input::InputState;
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_ENV: &str = "DEADGRID_LOG";

fn main() {
    let config = GameConfig::load();
    init_logging(config.log_file.as_deref());

    let mut world = match World::from_config(&config) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Setup failed: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }
    let enhanced = enable_key_release();

    let result = game_loop(&mut world, &mut renderer, enhanced, &config);

    if enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    info!(score = world.score, turn = world.turn, "session ended");
    println!();
    println!("Thanks for playing Dead Grid!");
    println!("Final Score: {:06}  Turns survived: {}", world.score, world.turn);
}

fn game_loop(
    world: &mut World,
    renderer: &mut Renderer,
    honor_release: bool,
    config: &GameConfig,
) -> io::Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let frame = Duration::from_millis(config.display.tick_rate_ms).max(FRAME_SLEEP);

    loop {
        kb.drain_events();

        if let Some(cmd) = kb.command() {
            if cmd == Command::Cancel {
                break;
            }
            let events = step::step(world, cmd);
            log_events(&events);
        }

        // diff-based, so idle frames cost almost nothing
        renderer.render(world)?;
        std::thread::sleep(frame);
    }
    Ok(())
}

/// Summaries only; per-entity detail is logged inside the step.
fn log_events(events: &[GameEvent]) {
    for ev in events {
        match ev {
            GameEvent::Paused => info!("paused"),
            GameEvent::Resumed => info!("resumed"),
            GameEvent::Restarted => info!("restarted"),
            GameEvent::ScoreChanged { score } => info!(score, "score changed"),
            _ => {}
        }
    }
}

/// Ask the terminal for Release events. True when it agreed.
fn enable_key_release() -> bool {
    if !matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
        return false;
    }
    execute!(
        io::stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )
    .is_ok()
}

/// The terminal belongs to the renderer, so logs go to a file.
/// No file (or one that cannot be created) means no logging.
fn init_logging(path: Option<&Path>) {
    let Some(path) = path else { return };
    let file = match File::create(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", path.display());
            return;
        }
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        warn!("tracing subscriber already installed");
    }
}
