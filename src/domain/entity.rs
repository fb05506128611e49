/// Entities: Player, Enemy, Pickup.
///
/// Each entity owns its grid position; the grid only carries the matching
/// occupancy flag. All position changes go through `move_to`, which keeps
/// the two in sync within a single call.

use super::cell::{Cell, Pos};
use super::grid::Grid;

/// Render hint only, never consulted by gameplay.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Something that stands in exactly one cell and marks it with a flag.
pub trait Occupant {
    /// Occupancy flag this entity writes into its cell.
    const FLAG: Cell;
    /// Destination flags that reject a move.
    const BLOCKERS: Cell;

    fn pos(&self) -> Pos;
    fn set_pos(&mut self, pos: Pos);
    fn set_facing(&mut self, _facing: Facing) {}

    /// Write this entity's flag at its current position.
    fn register(&self, grid: &mut Grid) {
        grid.set_flag(self.pos(), Self::FLAG);
    }

    /// Remove this entity's flag from its current position.
    fn unregister(&self, grid: &mut Grid) {
        grid.clear_flag(self.pos(), Self::FLAG);
    }
}

/// Move `who` to `to`, updating occupancy. Returns false (and changes
/// nothing) when `to` is out of bounds or carries a blocking flag.
pub fn move_to<O: Occupant>(who: &mut O, grid: &mut Grid, to: Pos) -> bool {
    if !grid.in_bounds(to) || grid.cell_has_any(to, O::BLOCKERS) {
        return false;
    }
    let from = who.pos();
    grid.clear_flag(from, O::FLAG);
    if to.x < from.x {
        who.set_facing(Facing::Left);
    } else if to.x > from.x {
        who.set_facing(Facing::Right);
    }
    who.set_pos(to);
    grid.set_flag(to, O::FLAG);
    true
}

// ── Player ──

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Pos,
    pub facing: Facing,
}

impl Player {
    pub fn new(pos: Pos) -> Self {
        Player { pos, facing: Facing::Right }
    }
}

impl Occupant for Player {
    const FLAG: Cell = Cell::PLAYER;
    const BLOCKERS: Cell = Cell::WALL;

    fn pos(&self) -> Pos {
        self.pos
    }
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
    }
    fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }
}

// ── Enemy ──

/// Enemy variant tag. Variants differ only in their cadence record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EnemyKind {
    Walker,
    Runner,
    Brute,
}

/// How far and how often an enemy moves.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cadence {
    /// Tiles advanced on an eligible turn.
    pub move_span: u32,
    /// Player moves between eligible turns.
    pub move_cadence: u32,
}

impl EnemyKind {
    pub fn cadence(self) -> Cadence {
        match self {
            EnemyKind::Walker => Cadence { move_span: 1, move_cadence: 2 },
            EnemyKind::Runner => Cadence { move_span: 1, move_cadence: 1 },
            EnemyKind::Brute => Cadence { move_span: 2, move_cadence: 3 },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Pos,
    pub facing: Facing,
    pub move_span: u32,
    pub move_countdown: u32,
    pub reset_move_countdown: u32,
}

impl Enemy {
    pub fn new(id: u32, kind: EnemyKind, pos: Pos) -> Self {
        let cadence = kind.cadence();
        Enemy {
            id,
            kind,
            pos,
            facing: Facing::Left,
            move_span: cadence.move_span,
            move_countdown: cadence.move_cadence,
            reset_move_countdown: cadence.move_cadence,
        }
    }

    /// Count one player move. Returns true when the enemy may advance
    /// this turn; the countdown is reset in that case.
    pub fn tick_countdown(&mut self) -> bool {
        self.move_countdown = self.move_countdown.saturating_sub(1);
        if self.move_countdown == 0 {
            self.move_countdown = self.reset_move_countdown;
            true
        } else {
            false
        }
    }
}

impl Occupant for Enemy {
    const FLAG: Cell = Cell::ENEMY;
    // Another enemy's cell is never a legal destination.
    const BLOCKERS: Cell = Cell::ENEMY_BLOCKERS;

    fn pos(&self) -> Pos {
        self.pos
    }
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
    }
    fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }
}

// ── Pickup ──

/// Stationary, consumable. Consuming one eliminates an enemy.
#[derive(Clone, Debug)]
pub struct Pickup {
    pub id: u32,
    pub pos: Pos,
}

impl Occupant for Pickup {
    const FLAG: Cell = Cell::PICKUP;
    const BLOCKERS: Cell = Cell::WALL;

    fn pos(&self) -> Pos {
        self.pos
    }
    fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
    }
}
