/// The authoritative cell grid.
///
/// `cells[y][x]` holds a `Cell` bitmask. Border cells are always walls.
/// Out-of-bounds reads answer `WALL` so callers never index past the edge;
/// out-of-bounds writes are silently ignored.

use super::cell::{Cell, Pos};

#[derive(Clone, Debug)]
pub struct Grid {
    cells: Vec<Vec<Cell>>,
    width: usize,
    height: usize,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        let mut grid = Grid { cells: vec![], width: 0, height: 0 };
        grid.initialize(width, height);
        grid
    }

    /// Reset to a bare arena: border = WALL, interior = WALKABLE.
    /// Must run before any entity registers its occupancy.
    pub fn initialize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells = (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| {
                        if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                            Cell::WALL
                        } else {
                            Cell::WALKABLE
                        }
                    })
                    .collect()
            })
            .collect();
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// Cell at `pos`; out of bounds reads as a wall.
    #[inline]
    pub fn cell(&self, pos: Pos) -> Cell {
        if self.in_bounds(pos) {
            self.cells[pos.y as usize][pos.x as usize]
        } else {
            Cell::WALL
        }
    }

    #[inline]
    pub fn set_flag(&mut self, pos: Pos, flag: Cell) {
        if self.in_bounds(pos) {
            let c = &mut self.cells[pos.y as usize][pos.x as usize];
            *c = c.union(flag);
        }
    }

    #[inline]
    pub fn clear_flag(&mut self, pos: Pos, flag: Cell) {
        if self.in_bounds(pos) {
            let c = &mut self.cells[pos.y as usize][pos.x as usize];
            *c = c.without(flag);
        }
    }

    #[inline]
    pub fn cell_has_any(&self, pos: Pos, mask: Cell) -> bool {
        self.cell(pos).has_any(mask)
    }

    /// Turn an unoccupied cell into a wall (level geometry).
    pub fn place_wall(&mut self, pos: Pos) {
        if self.cell_has_any(pos, Cell::OCCUPIED) {
            return;
        }
        self.clear_flag(pos, Cell::WALKABLE);
        self.set_flag(pos, Cell::WALL);
    }

    pub fn center(&self) -> Pos {
        Pos::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Pos::new(x as i32, y as i32)))
    }

    /// Interior cells that are walkable terrain (occupied or not).
    pub fn walkable_count(&self) -> usize {
        self.positions()
            .filter(|&p| {
                let c = self.cell(p);
                c.has_any(Cell::WALKABLE) && !c.is_wall()
            })
            .count()
    }
}
