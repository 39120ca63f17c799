//! Blockfall: falling-block puzzle game in the terminal.

mod app;
mod config;
mod game;
mod input;
mod shape;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use config::GameConfig;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!(error = %e, "theme not loaded, using defaults");
        theme::Theme::default()
    });
    let config = GameConfig::from_args(&args).context("invalid game configuration")?;
    info!(
        rows = config.rows,
        columns = config.columns,
        tick_ms = config.tick_ms,
        seed = ?config.seed,
        "starting"
    );
    let mut app = App::new(config, theme, args.frame_rate);
    app.run()
}

/// The terminal owns stdout/stderr, so logs only go to a file when asked for.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    Ok(())
}

/// Falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Falling-block puzzle in the terminal. Steer the falling blocks and fill whole rows to clear them.",
    long_about = "Blockfall is a classic falling-block puzzle for the terminal.\n\n\
        Blocks fall on a timer. Move and rotate them; a block locks when it can fall no \
        further and every completely filled row disappears. The game ends when a new block \
        has no room to appear.\n\n\
        CONTROLS:\n  Left/Right h/l  Move     Up/k/Space  Rotate   Down/j  Soft drop\n  \
        P               Pause    R           Restart  Q / Esc Quit"
)]
pub struct Args {
    /// Grid height in rows.
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub rows: u16,

    /// Grid width in columns.
    #[arg(long, default_value = "10", value_name = "COLS")]
    pub columns: u16,

    /// Gravity interval in milliseconds (one row per tick).
    #[arg(long, default_value = "200", value_name = "MS")]
    pub tick_ms: u64,

    /// Number of colour indices including empty; blocks use 1..COUNT.
    #[arg(long, default_value = "8", value_name = "COUNT")]
    pub colors: u8,

    /// Seed for block generation (random if not set).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Start with an empty grid instead of the pre-filled bottom row.
    #[arg(long)]
    pub no_floor: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
