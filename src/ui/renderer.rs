/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Glyph)
///   2. Compare each glyph with `back` buffer (previous frame)
///   3. Only emit terminal commands for glyphs that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The renderer only reads the world; it never changes game state.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::cell::{Cell, Pos};
use crate::domain::entity::{EnemyKind, Facing};
use crate::sim::world::{Phase, World};

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Glyph {
    /// Explicit background for every terminal cell, so row gaps match.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Glyph = Glyph { ch: ' ', fg: Color::White, bg: Glyph::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Glyph = Glyph { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Glyph { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Glyphs ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Glyph::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Glyph::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, glyph: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = glyph;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Glyph::new(ch, fg, bg));
        }
    }
}

// ── Renderer ──

/// Each grid cell is two terminal columns wide so the map looks square.
const CELL_W: i32 = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const FLOOR_FG: Color = Color::Rgb { r: 60, g: 60, b: 80 };
const WALL_FG: Color = Color::Rgb { r: 120, g: 110, b: 100 };
const PLAYER_FG: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const PICKUP_FG: Color = Color::Rgb { r: 255, g: 220, b: 50 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Glyph::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Glyph::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &World) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Glyph::INVALID);
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.compose_hud(world);
        self.compose_map(world);
        match world.phase {
            Phase::Playing => {}
            Phase::Paused => self.compose_banner(world, "PAUSED", "P: Resume   ENTER: Restart", PICKUP_FG),
            Phase::GameOver => self.compose_banner(
                world,
                "CAUGHT",
                "ENTER: Restart   ESC: Quit",
                Color::Rgb { r: 255, g: 60, b: 60 },
            ),
        }
        self.compose_help(world);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed glyphs ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Glyph::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let glyph = self.front.get(x, y);
                if glyph == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if glyph.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(glyph.fg))?;
                    last_fg = glyph.fg;
                }
                if glyph.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(glyph.bg))?;
                    last_bg = glyph.bg;
                }
                queue!(self.writer, Print(glyph.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &World) {
        for x in 0..self.front.width {
            self.front.set(x, HUD_ROW, Glyph::new(' ', Color::White, HUD_BG));
        }
        let hud = format!(
            " {}  Score:{}  Turn:{:<5}  Enemies:{:<3}  Pickups:{:<3}",
            w.level.name,
            score_text(w.score),
            w.turn,
            w.enemies.len(),
            w.pickups.len(),
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, w: &World) {
        for pos in w.grid.positions() {
            let (col, _) = pos.to_pixels(CELL_W);
            let (col, row) = (col as usize, MAP_ROW + pos.y as usize);
            let [left, right] = glyph_for(w, pos);
            self.front.set(col, row, left);
            self.front.set(col + 1, row, right);
        }
    }

    fn compose_banner(&mut self, w: &World, title: &str, hint: &str, color: Color) {
        let map_cols = w.grid.width() * CELL_W as usize;
        let box_w = 30_usize.min(map_cols.max(1));
        let box_x = map_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + w.grid.height().saturating_sub(5) / 2;
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };

        for y in box_y..box_y + 5 {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Glyph::new(' ', Color::White, dim));
            }
        }
        let center = |s: &str| box_x + box_w.saturating_sub(s.chars().count()) / 2;
        self.front.put_str(center(title), box_y + 1, title, color, dim);
        let score = format!("Score {}", score_text(w.score));
        self.front.put_str(center(&score), box_y + 2, &score, Color::White, dim);
        self.front.put_str(center(hint), box_y + 3, hint, Color::DarkGrey, dim);
    }

    fn compose_help(&mut self, w: &World) {
        let row = MAP_ROW + w.grid.height() + 1;
        let help = " ←↑↓→/WASD: Move   P/F1: Pause   ENTER: Restart   ESC: Quit";
        self.front.put_str(0, row, help, Color::DarkGrey, Color::Reset);
    }
}

/// Six-digit zero-padded score.
fn score_text(score: u32) -> String {
    format!("{score:06}")
}

/// The two terminal columns for `pos`. Player over enemy over pickup
/// over terrain. Movers lean toward the side they face.
fn glyph_for(w: &World, pos: Pos) -> [Glyph; 2] {
    let cell = w.grid.cell(pos);
    let facing = |ch: char, fg: Color, f: Facing| {
        let g = Glyph::new(ch, fg, Color::Reset);
        match f {
            Facing::Left => [g, Glyph::BLANK],
            Facing::Right => [Glyph::BLANK, g],
        }
    };

    if cell.has_any(Cell::PLAYER) {
        return facing('@', PLAYER_FG, w.player.facing);
    }
    if let Some(e) = w.enemy_at(pos) {
        let (ch, fg) = match e.kind {
            EnemyKind::Walker => ('w', Color::Rgb { r: 200, g: 90, b: 90 }),
            EnemyKind::Runner => ('r', Color::Rgb { r: 255, g: 140, b: 60 }),
            EnemyKind::Brute => ('B', Color::Rgb { r: 220, g: 50, b: 160 }),
        };
        return facing(ch, fg, e.facing);
    }
    if cell.has_any(Cell::PICKUP) {
        return [Glyph::new('+', PICKUP_FG, Color::Reset), Glyph::BLANK];
    }
    if cell.is_wall() {
        let g = Glyph::new('█', WALL_FG, Color::Reset);
        return [g, g];
    }
    [Glyph::new('·', FLOOR_FG, Color::Reset), Glyph::BLANK]
}
