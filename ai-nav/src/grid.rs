use crate::astar::{AStarSolver, CostTraits, GraphTraits, HeuristicTraits};
use crate::{NavPath, Navigator, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Cell {
    x: i32,
    y: i32,
}

/// Solver over a [`NavGrid`], which is its own graph, heuristic and cost.
pub type GridSolver<'a> = AStarSolver<'a, NavGrid, NavGrid, NavGrid>;

/// Uniform 4-connected grid. Node indices are `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavGrid {
    width: i32,
    height: i32,
    cell_size: f32,
    blocked: Vec<bool>,
}

impl NavGrid {
    pub fn new(width: u32, height: u32, cell_size: f32) -> Self {
        assert!(width > 0 && height > 0, "grid must be non-empty");
        assert!(cell_size > 0.0, "cell_size must be > 0");
        let width = width as i32;
        let height = height as i32;
        Self {
            width,
            height,
            cell_size,
            blocked: vec![false; (width * height) as usize],
        }
    }

    /// Builds a grid from text rows, `#` marking blocked cells. Row 0 is `y = 0`.
    pub fn from_rows(rows: &[&str], cell_size: f32) -> Self {
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let mut grid = Self::new(width as u32, rows.len() as u32, cell_size);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    grid.set_blocked(x as i32, y as i32, true);
                }
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    pub fn height(&self) -> u32 {
        self.height as u32
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn set_blocked(&mut self, x: i32, y: i32, blocked: bool) {
        if let Some(idx) = self.idx(Cell { x, y }) {
            self.blocked[idx] = blocked;
        }
    }

    /// Out-of-bounds cells count as blocked.
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        self.idx(Cell { x, y })
            .map(|idx| self.blocked[idx])
            .unwrap_or(true)
    }

    /// Node index of the cell containing `p`.
    pub fn cell_index(&self, p: Vec2) -> Option<usize> {
        self.world_to_cell(p).and_then(|cell| self.idx(cell))
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn idx(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        Some((cell.y * self.width + cell.x) as usize)
    }

    fn world_to_cell(&self, p: Vec2) -> Option<Cell> {
        let cell = Cell {
            x: (p.x / self.cell_size).floor() as i32,
            y: (p.y / self.cell_size).floor() as i32,
        };
        self.in_bounds(cell).then_some(cell)
    }

    fn cell_center(&self, cell: Cell) -> Vec2 {
        Vec2::new(
            (cell.x as f32 + 0.5) * self.cell_size,
            (cell.y as f32 + 0.5) * self.cell_size,
        )
    }

    fn cell_from_idx(&self, idx: usize) -> Cell {
        let idx = idx as i32;
        Cell {
            x: idx % self.width,
            y: idx / self.width,
        }
    }

    fn adjacent_cells(cell: Cell) -> impl Iterator<Item = Cell> {
        // Fixed order for determinism: N, E, S, W.
        const STEPS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
        STEPS.into_iter().map(move |(dx, dy)| Cell {
            x: cell.x + dx,
            y: cell.y + dy,
        })
    }
}

impl GraphTraits for NavGrid {
    type Index = usize;
    type Point = Vec2;

    fn node_count(&self) -> usize {
        self.blocked.len()
    }

    fn best_node(&self, point: &Vec2) -> Option<usize> {
        self.cell_index(*point).filter(|&idx| !self.blocked[idx])
    }

    fn node_point(&self, node: usize) -> Vec2 {
        self.cell_center(self.cell_from_idx(node))
    }

    fn neighbors(&self, node: usize, out: &mut Vec<usize>) {
        let cell = self.cell_from_idx(node);
        out.extend(
            Self::adjacent_cells(cell)
                .filter_map(|n| self.idx(n))
                .filter(|&idx| !self.blocked[idx]),
        );
    }
}

impl HeuristicTraits<usize> for NavGrid {
    /// Manhattan distance in cells.
    fn estimate(&self, from: usize, to: usize) -> f32 {
        let a = self.cell_from_idx(from);
        let b = self.cell_from_idx(to);
        ((a.x - b.x).abs() + (a.y - b.y).abs()) as f32
    }
}

impl CostTraits<usize> for NavGrid {
    fn cost(&self, _from: usize, _to: usize) -> f32 {
        1.0
    }
}

impl Navigator for NavGrid {
    fn find_path(&self, start: Vec2, goal: Vec2) -> Option<NavPath> {
        let mut solver = GridSolver::new();
        solver.start_path_find(self, self, self, &start, &goal);
        solver.update(usize::MAX);
        if !solver.path_found() {
            return None;
        }

        // Preserve exact endpoints for nicer movement.
        let cells = solver.path_nodes();
        let inner_len = cells.len().saturating_sub(2);
        let mut points = Vec::with_capacity(inner_len + 2);
        points.push(start);
        points.extend(
            cells
                .iter()
                .skip(1)
                .take(inner_len)
                .map(|&idx| self.node_point(idx)),
        );
        points.push(goal);
        Some(NavPath::new(points))
    }

    fn nearest_point(&self, point: Vec2) -> Option<Vec2> {
        self.best_node(&point).map(|idx| self.node_point(idx))
    }
}
