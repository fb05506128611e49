/// Input state tracker.
///
/// The game is turn-based, so every command is edge-triggered: a key fires
/// once when it goes from "not held" to "held". Holding a key does not
/// repeat the move.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::sim::step::Command;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A'), KeyCode::Char('h')];
const RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D'), KeyCode::Char('l')];
const UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char('k')];
const DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S'), KeyCode::Char('j')];
const CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const CANCEL: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

/// Checked in this order; the first group with a fresh press wins.
const BINDINGS: [(&[KeyCode], Command); 7] = [
    (LEFT, Command::MoveLeft),
    (RIGHT, Command::MoveRight),
    (UP, Command::MoveUp),
    (DOWN, Command::MoveDown),
    (CONFIRM, Command::Confirm),
    (PAUSE, Command::Pause),
    (CANCEL, Command::Cancel),
];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation step.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);

            match key.kind {
                KeyEventKind::Release if self.honor_release => {
                    self.last_active.remove(&key.code);
                }
                // rely on timeout-based expiry instead
                KeyEventKind::Release => {}
                _ => {
                    let was_held = self.is_held(key.code);
                    self.last_active.insert(key.code, Instant::now());
                    if !was_held {
                        self.fresh_presses.push(key.code);
                    }
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// The command for this frame, if any. Ctrl+C always cancels.
    pub fn command(&self) -> Option<Command> {
        if self.ctrl_c_pressed() {
            return Some(Command::Cancel);
        }
        detect_command(&self.fresh_presses)
    }

    fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

/// Map this frame's fresh presses to at most one command.
pub fn detect_command(pressed: &[KeyCode]) -> Option<Command> {
    BINDINGS
        .iter()
        .find(|(keys, _)| keys.iter().any(|k| pressed.contains(k)))
        .map(|&(_, cmd)| cmd)
}
