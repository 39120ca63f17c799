//! Game state: grid, active block, next block, collision, lock and row clear.

use crate::config::GameConfig;
use crate::shape::{Shape, ShapeCatalog, generate_block};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Colour index used for the pre-seeded bottom row.
const FLOOR_COLOR: u8 = 1;

/// Single cell: either empty or occupied with a colour index (1..).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(u8),
}

impl Cell {
    /// Integer tag: 0 for empty, otherwise the colour index.
    #[inline]
    pub fn index(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Filled(c) => c,
        }
    }

    #[inline]
    pub fn is_filled(self) -> bool {
        matches!(self, Self::Filled(_))
    }
}

/// Settled cells. y=0 is top; rows are stored [0..height].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    /// rows[y][x] = cell. rows[0] is top.
    rows: VecDeque<Vec<Cell>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        let rows = (0..height).map(|_| vec![Cell::Empty; width]).collect();
        Self {
            width,
            height,
            rows,
        }
    }

    /// Starting state: bottom row occupied everywhere except column 0.
    pub fn seeded(width: usize, height: usize) -> Self {
        let mut grid = Self::new(width, height);
        if let Some(bottom) = grid.rows.back_mut() {
            for (x, cell) in bottom.iter_mut().enumerate() {
                if x != 0 {
                    *cell = Cell::Filled(FLOOR_COLOR);
                }
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn is_row_full(&self, y: usize) -> bool {
        self.rows
            .get(y)
            .is_some_and(|row| row.iter().all(|c| c.is_filled()))
    }

    /// Remove every full row and push the same number of empty rows in at the top.
    /// Full rows are collected first, then the grid is rebuilt from the survivors,
    /// so adjacent or gapped clears in one pass are all handled.
    /// Returns the cleared row indices, top to bottom, in pre-clear coordinates.
    pub fn clear_full_rows(&mut self) -> Vec<usize> {
        let full: Vec<usize> = (0..self.height).filter(|&y| self.is_row_full(y)).collect();
        if full.is_empty() {
            return full;
        }
        let mut rebuilt: VecDeque<Vec<Cell>> = (0..full.len())
            .map(|_| vec![Cell::Empty; self.width])
            .collect();
        rebuilt.extend(
            self.rows
                .drain(..)
                .enumerate()
                .filter(|(y, _)| !full.contains(y))
                .map(|(_, row)| row),
        );
        self.rows = rebuilt;
        full
    }
}

/// Grid offset of the active shape's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

/// What a lock did to the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockReport {
    /// Cleared row indices, top to bottom, before the shift.
    pub cleared_rows: Vec<usize>,
    /// The freshly activated block collided at spawn.
    pub game_over: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// At least one axis of the move was applied.
    Moved,
    /// Nothing changed.
    Rejected,
    /// The vertical step collided; the block was merged into the grid.
    Locked(LockReport),
}

/// The simulation: settled grid plus the falling and the upcoming block.
#[derive(Debug, Clone)]
pub struct World {
    grid: Grid,
    active: Shape,
    offset: Offset,
    next: Shape,
    game_over: bool,
    catalog: ShapeCatalog,
    color_count: u8,
    seed_floor: bool,
    rng: StdRng,
}

impl World {
    pub fn new(config: &GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: &GameConfig, rng: StdRng) -> Self {
        let grid = if config.seed_floor {
            Grid::seeded(config.columns, config.rows)
        } else {
            Grid::new(config.columns, config.rows)
        };
        Self::with_grid(config, rng, grid)
    }

    /// Start from an arbitrary grid; the first block is activated immediately.
    pub fn with_grid(config: &GameConfig, mut rng: StdRng, grid: Grid) -> Self {
        let active = generate_block(&config.catalog, config.color_count, &mut rng);
        let next = generate_block(&config.catalog, config.color_count, &mut rng);
        let mut world = Self {
            offset: spawn_offset(grid.width()),
            grid,
            active,
            next,
            game_over: false,
            catalog: config.catalog.clone(),
            color_count: config.color_count,
            seed_floor: config.seed_floor,
            rng,
        };
        world.game_over = world.collides();
        world
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn active_shape(&self) -> &Shape {
        &self.active
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn next_shape(&self) -> &Shape {
        &self.next
    }

    /// Colour indices in use, 0 included.
    pub fn color_count(&self) -> u8 {
        self.color_count
    }

    /// True once a newly activated block collided at its spawn offset.
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Active block's filled cells in grid coordinates as (x, y, colour).
    pub fn active_cells(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        let Offset { x, y } = self.offset;
        self.active
            .filled()
            .map(move |(r, c, color)| (x + c as i32, y + r as i32, color))
    }

    /// Grid cell with the active block drawn over it. `None` outside the grid.
    pub fn cell_at_with_active(&self, x: usize, y: usize) -> Option<Cell> {
        let settled = self.grid.get(x, y)?;
        let Offset { x: ox, y: oy } = self.offset();
        let (Ok(c), Ok(r)) = (
            usize::try_from(x as i64 - i64::from(ox)),
            usize::try_from(y as i64 - i64::from(oy)),
        ) else {
            return Some(settled);
        };
        match self.active_shape().get(r, c) {
            Cell::Empty => Some(settled),
            filled => Some(filled),
        }
    }

    /// True if the active block at its current offset leaves the grid or
    /// overlaps a settled cell. Every filled sub-cell is checked.
    pub fn collides(&self) -> bool {
        let (w, h) = (self.grid.width() as i32, self.grid.height() as i32);
        let Offset { x, y } = self.offset;
        if x < 0 || x + self.active.cols() as i32 > w {
            return true;
        }
        if y + self.active.rows() as i32 > h {
            return true;
        }
        self.active_cells().any(|(cx, cy, _)| {
            cy < 0
                || self
                    .grid
                    .get(cx as usize, cy as usize)
                    .is_none_or(Cell::is_filled)
        })
    }

    /// Horizontal part first: rejected silently on collision. Vertical part
    /// next: on collision it is reverted and the block locks.
    pub fn attempt_move(&mut self, dx: i32, dy: i32) -> MoveOutcome {
        if self.game_over {
            return MoveOutcome::Rejected;
        }
        let mut moved = false;
        if dx != 0 {
            self.offset.x += dx;
            if self.collides() {
                self.offset.x -= dx;
            } else {
                moved = true;
            }
        }
        if dy != 0 {
            self.offset.y += dy;
            if self.collides() {
                self.offset.y -= dy;
                return MoveOutcome::Locked(self.lock_and_advance());
            }
            moved = true;
        }
        if moved {
            MoveOutcome::Moved
        } else {
            MoveOutcome::Rejected
        }
    }

    pub fn move_left(&mut self) -> MoveOutcome {
        self.attempt_move(-1, 0)
    }

    pub fn move_right(&mut self) -> MoveOutcome {
        self.attempt_move(1, 0)
    }

    /// Gravity step (also used for soft drop).
    pub fn tick_down(&mut self) -> MoveOutcome {
        self.attempt_move(0, 1)
    }

    /// Rotate clockwise; reverted if the rotated shape collides.
    pub fn rotate(&mut self) -> bool {
        if self.game_over {
            return false;
        }
        let saved = self.active;
        self.active = saved.rotated_cw();
        if self.collides() {
            self.active = saved;
            return false;
        }
        true
    }

    /// Fresh session: seeded grid, new active and next blocks, game-over cleared.
    pub fn reset(&mut self) {
        self.grid = if self.seed_floor {
            Grid::seeded(self.grid.width(), self.grid.height())
        } else {
            Grid::new(self.grid.width(), self.grid.height())
        };
        self.active = self.generate();
        self.next = self.generate();
        self.offset = spawn_offset(self.grid.width());
        self.game_over = self.collides();
        info!(
            width = self.grid.width(),
            height = self.grid.height(),
            "world reset"
        );
    }

    fn generate(&mut self) -> Shape {
        generate_block(&self.catalog, self.color_count, &mut self.rng)
    }

    fn lock_and_advance(&mut self) -> LockReport {
        let Offset { x, y } = self.offset;
        debug!(x, y, color = ?self.active.color(), "block locked");
        let cells: Vec<(i32, i32, u8)> = self.active_cells().collect();
        for (cx, cy, color) in cells {
            if cx >= 0 && cy >= 0 {
                self.grid.set(cx as usize, cy as usize, Cell::Filled(color));
            }
        }

        let cleared_rows = self.grid.clear_full_rows();
        if !cleared_rows.is_empty() {
            info!(rows = ?cleared_rows, "rows cleared");
        }

        let fresh = self.generate();
        self.active = std::mem::replace(&mut self.next, fresh);
        self.offset = spawn_offset(self.grid.width());
        self.game_over = self.collides();
        if self.game_over {
            info!("game over: spawn position blocked");
        }
        LockReport {
            cleared_rows,
            game_over: self.game_over,
        }
    }
}

/// Horizontally centred, top row.
fn spawn_offset(width: usize) -> Offset {
    Offset {
        x: (width / 2).saturating_sub(1) as i32,
        y: 0,
    }
}
