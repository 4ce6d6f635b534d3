//! Game of Life block field
//!
//! A toroidal Conway grid whose live cells double as destructible blocks.
//! The grid steps on its own slow cadence, independent of the physics tick.

use std::time::Duration;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::PADDLE_WIDTH;

pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLS: usize = 30;
pub const DEFAULT_CELL_SIZE: f32 = 10.0;
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_DENSITY: f64 = 0.3;

/// Horizontal clearance kept between the grid and each paddle column
pub const GRID_SIDE_MARGIN: f32 = PADDLE_WIDTH + 60.0;
/// Vertical clearance from the top/bottom walls
pub const GRID_TOP_MARGIN: f32 = 20.0;

/// Toroidal boolean grid positioned on the canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeGrid {
    rows: usize,
    cols: usize,
    /// Row-major cells, `true` = alive
    cells: Vec<bool>,
    /// Scratch buffer for the next generation
    #[serde(skip)]
    next: Vec<bool>,
    pub cell_size: f32,
    /// Top-left corner of the grid in canvas space
    pub origin: Vec2,
    pub step_interval: Duration,
    pub density: f64,
    last_step: Duration,
    generation: u64,
}

impl LifeGrid {
    pub fn new(rows: usize, cols: usize, cell_size: f32) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
            next: vec![false; rows * cols],
            cell_size: cell_size.max(1.0),
            origin: Vec2::ZERO,
            step_interval: DEFAULT_STEP_INTERVAL,
            density: DEFAULT_DENSITY,
            last_step: Duration::ZERO,
            generation: 0,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[self.index(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, alive: bool) {
        if row < self.rows && col < self.cols {
            let i = self.index(row, col);
            self.cells[i] = alive;
        }
    }

    /// Kill a cell (block destroyed by a puck)
    pub fn kill(&mut self, row: usize, col: usize) {
        self.set(row, col, false);
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Grid width and height in canvas units
    pub fn footprint(&self) -> Vec2 {
        Vec2::new(self.cols as f32, self.rows as f32) * self.cell_size
    }

    /// Canvas-space top-left corner of a cell
    pub fn cell_origin(&self, row: usize, col: usize) -> Vec2 {
        self.origin + Vec2::new(col as f32, row as f32) * self.cell_size
    }

    /// Canvas-space center of a cell
    pub fn cell_center(&self, row: usize, col: usize) -> Vec2 {
        self.cell_origin(row, col) + Vec2::splat(self.cell_size * 0.5)
    }

    /// Iterate live cells as (row, col)
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(i, _)| (i / self.cols, i % self.cols))
    }

    /// Cell index range overlapping an axis-aligned box, clamped to the grid.
    /// Returns None when the box misses the grid entirely.
    pub fn cells_overlapping(&self, min: Vec2, max: Vec2) -> Option<(RangeRC, RangeRC)> {
        let lo = (min - self.origin) / self.cell_size;
        let hi = (max - self.origin) / self.cell_size;
        if hi.x < 0.0 || hi.y < 0.0 || lo.x >= self.cols as f32 || lo.y >= self.rows as f32 {
            return None;
        }
        let c0 = lo.x.max(0.0) as usize;
        let r0 = lo.y.max(0.0) as usize;
        let c1 = (hi.x.max(0.0) as usize).min(self.cols - 1);
        let r1 = (hi.y.max(0.0) as usize).min(self.rows - 1);
        Some(((r0, r1), (c0, c1)))
    }

    /// Live Moore neighbours with wraparound on both axes
    pub fn live_neighbors(&self, row: usize, col: usize) -> u8 {
        let mut count = 0;
        for dr in [self.rows - 1, 0, 1] {
            for dc in [self.cols - 1, 0, 1] {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = (row + dr) % self.rows;
                let c = (col + dc) % self.cols;
                if self.cells[self.index(r, c)] {
                    count += 1;
                }
            }
        }
        count
    }

    /// Advance one generation (B3/S23), double-buffered
    pub fn step(&mut self) {
        if self.next.len() != self.cells.len() {
            self.next = vec![false; self.cells.len()];
        }
        for row in 0..self.rows {
            for col in 0..self.cols {
                let alive = self.cells[self.index(row, col)];
                let n = self.live_neighbors(row, col);
                let i = self.index(row, col);
                self.next[i] = matches!((alive, n), (true, 2) | (true, 3) | (false, 3));
            }
        }
        std::mem::swap(&mut self.cells, &mut self.next);
        self.generation += 1;
    }

    /// Step if the cadence interval has elapsed since the last step.
    /// A late call steps exactly once. Returns whether a step happened.
    pub fn step_if_due(&mut self, now: Duration) -> bool {
        if now.saturating_sub(self.last_step) >= self.step_interval {
            self.step();
            self.last_step = now;
            true
        } else {
            false
        }
    }

    /// Re-seed every cell independently alive with `density` probability
    pub fn randomize(&mut self, rng: &mut impl Rng, now: Duration) {
        let density = self.density.clamp(0.0, 1.0);
        for cell in &mut self.cells {
            *cell = rng.random_bool(density);
        }
        self.last_step = now;
        self.generation = 0;
    }

    /// Place the grid uniformly at random inside the canvas, clear of both
    /// paddle columns. Small canvases clamp to the centred position.
    pub fn reposition(&mut self, rng: &mut impl Rng, canvas: Vec2) {
        let size = self.footprint();
        let x = random_origin_axis(rng, canvas.x, size.x, GRID_SIDE_MARGIN);
        let y = random_origin_axis(rng, canvas.y, size.y, GRID_TOP_MARGIN);
        self.origin = Vec2::new(x, y);
    }
}

/// Inclusive (first, last) index pair
pub type RangeRC = (usize, usize);

fn random_origin_axis(rng: &mut impl Rng, extent: f32, size: f32, margin: f32) -> f32 {
    let lo = margin;
    let hi = extent - size - margin;
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        ((extent - size) * 0.5).max(0.0)
    }
}

impl Default for LifeGrid {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS, DEFAULT_CELL_SIZE)
    }
}
