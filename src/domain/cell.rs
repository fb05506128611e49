/// Cell state, grid positions and movement directions.
///
/// A cell is a bitmask: terrain bits (`WALKABLE`, `WALL`) say what the
/// cell IS, occupancy bits (`PLAYER`, `ENEMY`, `PICKUP`) say who is there.
/// Queries are methods so flag semantics stay centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Cell(u8);

impl Cell {
    #[cfg(test)]
    pub const EMPTY: Cell = Cell(0);
    pub const WALKABLE: Cell = Cell(1 << 0);
    pub const WALL: Cell = Cell(1 << 1);
    pub const PLAYER: Cell = Cell(1 << 2);
    pub const ENEMY: Cell = Cell(1 << 3);
    pub const PICKUP: Cell = Cell(1 << 4);

    /// Every flag that marks an entity standing in the cell.
    pub const OCCUPIED: Cell = Cell(Self::PLAYER.0 | Self::ENEMY.0 | Self::PICKUP.0);

    /// Cells an enemy may not path through.
    pub const ENEMY_BLOCKERS: Cell = Cell(Self::WALL.0 | Self::ENEMY.0);

    #[inline]
    pub fn union(self, other: Cell) -> Cell {
        Cell(self.0 | other.0)
    }

    #[inline]
    pub fn without(self, other: Cell) -> Cell {
        Cell(self.0 & !other.0)
    }

    /// Bitwise intersection test.
    #[inline]
    pub fn has_any(self, mask: Cell) -> bool {
        self.0 & mask.0 != 0
    }

    pub fn is_wall(self) -> bool {
        self.has_any(Cell::WALL)
    }

    /// Walkable terrain with nobody on it (spawn placement target).
    pub fn is_free(self) -> bool {
        self.has_any(Cell::WALKABLE) && !self.has_any(Cell::WALL.union(Cell::OCCUPIED))
    }
}

/// Grid-space position. `(-1, -1)` is the "not found" sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const NOT_FOUND: Pos = Pos { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Pos { x, y }
    }

    pub fn offset(self, dir: Dir) -> Pos {
        let (dx, dy) = dir.delta();
        Pos::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Pos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Loose "far enough" test: either axis distance reaches `min`.
    pub fn far_from(self, other: Pos, min: i32) -> bool {
        (self.x - other.x).abs() >= min || (self.y - other.y).abs() >= min
    }

    /// Pixel-space projection for renderers: `pos × tile_size`.
    pub fn to_pixels(self, tile_size: i32) -> (i32, i32) {
        (self.x * tile_size, self.y * tile_size)
    }
}

/// Orthogonal movement direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dir {
    Left,
    Right,
    Up,
    Down,
}

impl Dir {
    /// Neighbour expansion order used by the pathfinder.
    pub const ALL: [Dir; 4] = [Dir::Right, Dir::Left, Dir::Down, Dir::Up];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_cell_needs_walkable_and_no_occupant() {
        assert!(Cell::WALKABLE.is_free());
        assert!(!Cell::EMPTY.is_free());
        assert!(!Cell::WALKABLE.union(Cell::PICKUP).is_free());
        assert!(!Cell::WALL.is_free());
    }

    #[test]
    fn without_clears_only_given_bits() {
        let c = Cell::WALKABLE.union(Cell::PLAYER).union(Cell::PICKUP);
        let c = c.without(Cell::PLAYER);
        assert!(c.has_any(Cell::PICKUP));
        assert!(!c.has_any(Cell::PLAYER));
        assert!(c.has_any(Cell::WALKABLE));
    }

    #[test]
    fn far_from_is_either_axis() {
        let p = Pos::new(5, 5);
        assert!(Pos::new(8, 5).far_from(p, 3));
        assert!(Pos::new(6, 2).far_from(p, 3));
        assert!(!Pos::new(7, 7).far_from(p, 3));
    }

    #[test]
    fn pixel_projection_scales_both_axes() {
        assert_eq!(Pos::new(3, 2).to_pixels(80), (240, 160));
    }
}
