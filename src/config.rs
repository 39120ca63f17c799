//! Validated runtime configuration assembled from CLI arguments.

use crate::Args;
use crate::shape::ShapeCatalog;
use crate::theme::BLOCK_COLORS;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLUMNS: usize = 10;
/// Colour indices including the empty sentinel 0.
pub const DEFAULT_COLOR_COUNT: u8 = BLOCK_COLORS as u8 + 1;
pub const DEFAULT_TICK_MS: u64 = 200;

const MIN_ROWS: usize = 2;
/// Keeps the board's terminal size within `u16`.
const MAX_GRID_DIM: usize = 255;
const MIN_TICK_MS: u64 = 10;
const MAX_TICK_MS: u64 = 5_000;

/// Options that affect the simulation and the gravity timer.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub rows: usize,
    pub columns: usize,
    /// Number of colour indices, 0 included; blocks draw from `1..color_count`.
    pub color_count: u8,
    pub tick_ms: u64,
    pub seed: Option<u64>,
    /// Pre-fill the bottom row (all but column 0) at session start.
    pub seed_floor: bool,
    pub catalog: ShapeCatalog,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("grid needs at least {min} rows, got {got}")]
    TooFewRows { min: usize, got: usize },
    #[error("grid needs at least {min} columns to fit every shape, got {got}")]
    TooFewColumns { min: usize, got: usize },
    #[error("grid may be at most {max}x{max}, got {columns}x{rows}")]
    TooLarge {
        max: usize,
        columns: usize,
        rows: usize,
    },
    #[error("colour count must be between 2 and {max}, got {got}")]
    ColorCount { max: u8, got: u8 },
    #[error("gravity interval must be between {min} and {max} ms, got {got}")]
    TickInterval { min: u64, max: u64, got: u64 },
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            color_count: DEFAULT_COLOR_COUNT,
            tick_ms: DEFAULT_TICK_MS,
            seed: None,
            seed_floor: true,
            catalog: ShapeCatalog::standard(),
        }
    }
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let config = Self {
            rows: args.rows as usize,
            columns: args.columns as usize,
            color_count: args.colors,
            tick_ms: args.tick_ms,
            seed: args.seed,
            seed_floor: !args.no_floor,
            catalog: ShapeCatalog::standard(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Rotations swap extents, so the widest shape must fit both ways.
        let extent = self.catalog.max_extent();
        if self.rows < MIN_ROWS.max(extent) {
            return Err(ConfigError::TooFewRows {
                min: MIN_ROWS.max(extent),
                got: self.rows,
            });
        }
        if self.columns < extent {
            return Err(ConfigError::TooFewColumns {
                min: extent,
                got: self.columns,
            });
        }
        if self.rows > MAX_GRID_DIM || self.columns > MAX_GRID_DIM {
            return Err(ConfigError::TooLarge {
                max: MAX_GRID_DIM,
                columns: self.columns,
                rows: self.rows,
            });
        }
        if !(2..=DEFAULT_COLOR_COUNT).contains(&self.color_count) {
            return Err(ConfigError::ColorCount {
                max: DEFAULT_COLOR_COUNT,
                got: self.color_count,
            });
        }
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            return Err(ConfigError::TickInterval {
                min: MIN_TICK_MS,
                max: MAX_TICK_MS,
                got: self.tick_ms,
            });
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
