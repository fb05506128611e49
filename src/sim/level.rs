/// Level geometry loader.
///
/// ## Format (`.txt`):
///   Line 1 (optional): `# Level Name`. A line made only of tile glyphs
///   that is as wide as the next line is read as a map row instead.
///   Remaining lines: map rows, all the same width.
///
/// ## Tile legend:
///   '#' = Wall      '.' or ' ' = Floor
///
/// The outer ring is always wall regardless of what the file says.
/// The player starts at the grid center, so that cell must be floor.

use std::path::Path;

use crate::domain::cell::Pos;
use crate::domain::grid::Grid;
use crate::error::{Result, SetupError};

const EMBEDDED_LEVEL: &str = include_str!("../../levels/arena.txt");

#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// Interior wall cells (the border is implied).
    pub walls: Vec<Pos>,
}

impl LevelDef {
    /// An empty walled arena.
    #[cfg(test)]
    pub fn open(width: usize, height: usize) -> Self {
        LevelDef { name: String::from("Open Arena"), width, height, walls: vec![] }
    }

    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_LEVEL)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| SetupError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .collect();

        let (name, rows) = match lines.split_first() {
            Some((first, rest)) if is_title(first, rest.first().copied()) => {
                (first[2..].trim().to_string(), rest)
            }
            _ => (String::from("Untitled"), &lines[..]),
        };
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        if width < 3 || height < 3 {
            return Err(SetupError::LevelShape(format!(
                "grid must be at least 3x3, got {width}x{height}"
            )));
        }

        let mut walls = vec![];
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(SetupError::LevelShape(format!(
                    "row {} is {} wide, expected {width}",
                    y + 1,
                    row.chars().count()
                )));
            }
            for (x, ch) in row.chars().enumerate() {
                let border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
                match ch {
                    '#' if !border => walls.push(Pos::new(x as i32, y as i32)),
                    '#' | '.' | ' ' => {}
                    other => {
                        return Err(SetupError::LevelShape(format!(
                            "unknown tile '{other}' at ({x}, {y})"
                        )))
                    }
                }
            }
        }

        let level = LevelDef { name, width, height, walls };
        level.validate()?;
        Ok(level)
    }

    /// Fresh grid for this level: bare arena, then interior walls.
    pub fn build_grid(&self) -> Grid {
        let mut grid = Grid::new(self.width, self.height);
        for &w in &self.walls {
            grid.place_wall(w);
        }
        grid
    }

    /// Reject layouts a game cannot start on.
    pub fn validate(&self) -> Result<()> {
        let grid = self.build_grid();
        if grid.walkable_count() == 0 {
            return Err(SetupError::NoWalkableTiles);
        }
        let center = grid.center();
        if grid.cell(center).is_wall() {
            return Err(SetupError::StartBlocked(center));
        }
        Ok(())
    }
}

/// `# Name` is a title unless it could also be the map's top row
/// (tile glyphs only, same width as the row after it).
fn is_title(line: &str, next: Option<&str>) -> bool {
    if !line.starts_with("# ") {
        return false;
    }
    let tiles_only = line.chars().all(|c| matches!(c, '#' | '.' | ' '));
    let same_width = next.map_or(false, |n| n.chars().count() == line.chars().count());
    !(tiles_only && same_width)
}
