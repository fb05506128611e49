/// Enemy pathfinding: A* over the occupancy grid.
///
/// 4-connected, uniform step cost, Manhattan heuristic.
/// The open list is a plain `Vec` scanned for the lowest `f` each
/// iteration; on ties the earliest-inserted node wins, which keeps
/// paths stable from turn to turn. Grids are small (≤ ~50×50).
///
/// Walls and other enemies block. The player and pickups do not.
/// Nothing is cached: every call searches a fresh snapshot.

use super::cell::{Cell, Dir, Pos};
use super::grid::Grid;

#[derive(Clone, Copy, Debug)]
struct Node {
    pos: Pos,
    g: i32,
    h: i32,
    parent: Option<usize>,
}

impl Node {
    #[inline]
    fn f(&self) -> i32 {
        self.g + self.h
    }
}

/// Per-cell search bookkeeping. `Open` carries the node index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mark {
    Unseen,
    Open(usize),
    Closed,
}

pub struct Pathfinder<'a> {
    grid: &'a Grid,
}

impl<'a> Pathfinder<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Pathfinder { grid }
    }

    /// Can a pursuing enemy step onto `pos`?
    pub fn traversable(&self, pos: Pos) -> bool {
        self.grid.in_bounds(pos) && !self.grid.cell_has_any(pos, Cell::ENEMY_BLOCKERS)
    }

    /// Shortest path `start..=goal`, or `None` if the goal is blocked or
    /// unreachable.
    pub fn find_path(&self, start: Pos, goal: Pos) -> Option<Vec<Pos>> {
        if !self.grid.in_bounds(start) || !self.traversable(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let width = self.grid.width();
        let index = |p: Pos| p.y as usize * width + p.x as usize;

        let mut marks = vec![Mark::Unseen; width * self.grid.height()];
        let mut nodes: Vec<Node> = Vec::with_capacity(64);
        let mut open: Vec<usize> = Vec::with_capacity(32);

        nodes.push(Node { pos: start, g: 0, h: start.manhattan(goal), parent: None });
        open.push(0);
        marks[index(start)] = Mark::Open(0);

        while !open.is_empty() {
            // Lowest f; strict `<` keeps the first-inserted node on ties.
            let mut best = 0;
            for i in 1..open.len() {
                if nodes[open[i]].f() < nodes[open[best]].f() {
                    best = i;
                }
            }
            let current = open.remove(best);
            let here = nodes[current].pos;

            if here == goal {
                return Some(reconstruct(&nodes, current));
            }
            marks[index(here)] = Mark::Closed;

            for dir in Dir::ALL {
                let next = here.offset(dir);
                if !self.traversable(next) {
                    continue;
                }
                let tentative_g = nodes[current].g + 1;
                match marks[index(next)] {
                    Mark::Closed => {}
                    Mark::Open(i) => {
                        if tentative_g < nodes[i].g {
                            nodes[i].g = tentative_g;
                            nodes[i].parent = Some(current);
                        }
                    }
                    Mark::Unseen => {
                        nodes.push(Node {
                            pos: next,
                            g: tentative_g,
                            h: next.manhattan(goal),
                            parent: Some(current),
                        });
                        let i = nodes.len() - 1;
                        open.push(i);
                        marks[index(next)] = Mark::Open(i);
                    }
                }
            }
        }

        None
    }

    /// The first step from `from` toward `target`.
    /// Stays put for the `NOT_FOUND` sentinel, when no path exists,
    /// or when already standing on the target.
    pub fn next_step(&self, from: Pos, target: Pos) -> Pos {
        if target == Pos::NOT_FOUND {
            return from;
        }
        match self.find_path(from, target) {
            Some(path) if path.len() >= 2 => path[1],
            _ => from,
        }
    }
}

fn reconstruct(nodes: &[Node], mut i: usize) -> Vec<Pos> {
    let mut path = vec![nodes[i].pos];
    while let Some(parent) = nodes[i].parent {
        path.push(nodes[parent].pos);
        i = parent;
    }
    path.reverse();
    path
}
