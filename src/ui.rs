//! Layout and drawing: board, active block, next preview, pause and retry overlays.

use crate::app::Screen;
use crate::game::{Cell, World};
use crate::shape::{MAX_SHAPE_DIM, Shape};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each grid cell is two terminal columns wide so blocks look square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;

const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the row-clear flash in ms.
const CLEAR_FLASH_MS: u32 = 300;

/// Board size in terminal cells (border + grid) for given grid dimensions.
fn board_outer_size(columns: usize, rows: usize) -> (u16, u16) {
    (
        columns as u16 * CELL_WIDTH + 2,
        rows as u16 * CELL_HEIGHT + 2,
    )
}

/// Row-clear flash state owned by the driver and advanced while drawing.
#[derive(Default)]
pub struct ClearFlash {
    /// Grid rows that were cleared by the last lock.
    pub rows: Vec<usize>,
    pub effect: Option<Effect>,
    pub process_time: Option<Instant>,
}

impl ClearFlash {
    pub fn start(&mut self, rows: Vec<usize>) {
        self.rows = rows;
        self.effect = None;
        self.process_time = None;
    }

    pub fn is_active(&self) -> bool {
        !self.rows.is_empty()
    }

    /// True once the running effect has played out.
    pub fn done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Draw the current screen.
pub fn draw(
    frame: &mut Frame,
    world: &World,
    theme: &Theme,
    screen: Screen,
    paused: bool,
    flash: &mut ClearFlash,
    now: Instant,
) {
    let area = frame.area();
    let board_area = draw_game(frame, world, theme, area);
    if flash.is_active() {
        apply_clear_flash(frame, theme, board_area, flash, now);
    }
    match screen {
        Screen::Playing if paused => draw_pause_overlay(frame, theme, board_area),
        Screen::Playing => {}
        Screen::GameOver => draw_game_over(frame, theme, board_area),
    }
}

/// Board + sidebar centred in `area`. Returns the board's outer rect.
fn draw_game(frame: &mut Frame, world: &World, theme: &Theme, area: Rect) -> Rect {
    let grid = world.grid();
    let (pw, ph) = board_outer_size(grid.width(), grid.height());
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert_chunks[1]);

    draw_board(frame, world, theme, inner[0]);
    draw_sidebar(frame, world, theme, inner[1]);
    inner[0]
}

fn draw_board(frame: &mut Frame, world: &World, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Blockfall ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for (y, row) in world.grid().rows().enumerate() {
        for x in 0..row.len() {
            if let Some(cell) = world.cell_at_with_active(x, y) {
                paint_cell(buf, theme, inner, x, y, cell);
            }
        }
    }
}

/// Paint one grid cell (two terminal columns); clipped to `board`.
fn paint_cell(
    buf: &mut ratatui::buffer::Buffer,
    theme: &Theme,
    board: Rect,
    x: usize,
    y: usize,
    cell: Cell,
) {
    let ry = board.y + y as u16 * CELL_HEIGHT;
    let (symbols, style) = if cell.is_filled() {
        let color = theme.block_color(cell.index());
        (["█", "█"], Style::default().fg(color).bg(theme.bg))
    } else {
        ([" ", "·"], Style::default().fg(theme.empty).bg(theme.bg))
    };
    for (i, symbol) in symbols.iter().enumerate() {
        let rx = board.x + x as u16 * CELL_WIDTH + i as u16;
        if rx < board.x + board.width && ry < board.y + board.height {
            buf[(rx, ry)].set_symbol(symbol).set_style(style);
        }
    }
}

/// Buffer positions covering the given grid rows.
fn flash_positions(board_inner: Rect, rows: &[usize]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &gy in rows {
        let by = board_inner.y + gy as u16 * CELL_HEIGHT;
        if by >= board_inner.y + board_inner.height {
            continue;
        }
        for bx in board_inner.x..board_inner.x + board_inner.width {
            set.insert((bx, by));
        }
    }
    set
}

/// Create or advance the row-clear flash (TachyonFX: cleared rows fade in from bright).
fn apply_clear_flash(
    frame: &mut Frame,
    theme: &Theme,
    board_area: Rect,
    flash: &mut ClearFlash,
    now: Instant,
) {
    let board_rect = Block::default().borders(Borders::ALL).inner(board_area);
    let delta = flash
        .process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.process_time = Some(now);

    if flash.effect.is_none() {
        let positions = flash_positions(board_rect, &flash.rows);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            theme.main_fg,
            theme.main_fg,
            (CLEAR_FLASH_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(board_rect);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
    }
}

/// Centred popup inside `area`.
fn popup_rect(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 20, 5);
    let lines = vec![
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P resume  Q quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    render_popup(frame, theme, popup, lines);
}

fn draw_game_over(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 20, 6);
    let lines = vec![
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(" R retry ", Style::default().fg(theme.main_fg))),
        Line::from(Span::styled(" Q quit ", Style::default().fg(theme.main_fg))),
    ];
    render_popup(frame, theme, popup, lines);
}

fn render_popup(frame: &mut Frame, theme: &Theme, popup: Rect, lines: Vec<Line<'_>>) {
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_sidebar(frame: &mut Frame, world: &World, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next (border + title + 4-row preview)
            Constraint::Length(1),
            Constraint::Length(4), // Colours
            Constraint::Length(1),
            Constraint::Length(9), // Keys
        ])
        .split(area);

    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let next_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(MAX_SHAPE_DIM as u16)])
        .split(next_inner);
    Paragraph::new(Line::from(Span::styled("Next", title_style)))
        .render(next_layout[0], frame.buffer_mut());
    draw_shape_preview(frame, theme, next_layout[1], world.next_shape());

    let colours_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let colours_inner = colours_block.inner(chunks[2]);
    colours_block.render(chunks[2], frame.buffer_mut());
    let colours_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(colours_inner);
    Paragraph::new(Line::from(Span::styled("Colours", title_style)))
        .render(colours_layout[0], frame.buffer_mut());
    draw_colour_strip(frame, theme, colours_layout[1], world.color_count());

    let keys_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let keys_inner = keys_block.inner(chunks[4]);
    keys_block.render(chunks[4], frame.buffer_mut());
    let hint = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{key:<8}"), title_style),
            Span::styled(what, Style::default().fg(theme.inactive_fg)),
        ])
    };
    Paragraph::new(vec![
        hint("←/→", "move"),
        hint("↑/space", "rotate"),
        hint("↓", "drop"),
        hint("p", "pause"),
        hint("r", "restart"),
        hint("q", "quit"),
    ])
    .render(keys_inner, frame.buffer_mut());
}

/// Draw a shape centred in `area`, two columns per cell.
fn draw_shape_preview(frame: &mut Frame, theme: &Theme, area: Rect, shape: &Shape) {
    let bw = shape.cols() as u16 * CELL_WIDTH;
    let bh = shape.rows() as u16 * CELL_HEIGHT;
    let off_x = area.width.saturating_sub(bw) / 2;
    let off_y = area.height.saturating_sub(bh) / 2;
    let buf = frame.buffer_mut();
    for (r, c, color) in shape.filled() {
        let style = Style::default().fg(theme.block_color(color)).bg(theme.bg);
        let ry = area.y + off_y + r as u16 * CELL_HEIGHT;
        for i in 0..CELL_WIDTH {
            let rx = area.x + off_x + c as u16 * CELL_WIDTH + i;
            if rx < area.x + area.width && ry < area.y + area.height {
                buf[(rx, ry)].set_symbol("█").set_style(style);
            }
        }
    }
}

/// One swatch per colour index in use.
fn draw_colour_strip(frame: &mut Frame, theme: &Theme, area: Rect, color_count: u8) {
    let n = color_count.saturating_sub(1).max(1) as u16;
    let block_w = (area.width / n).max(1);
    for i in 1..color_count {
        let r = Rect {
            x: area.x + (i as u16 - 1) * block_w,
            y: area.y,
            width: block_w,
            height: area.height.min(1),
        }
        .intersection(area);
        let c = theme.block_color(i);
        Paragraph::new("█".repeat(block_w as usize))
            .style(Style::default().fg(c).bg(theme.bg))
            .render(r, frame.buffer_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render(world: &World, screen: Screen, paused: bool) -> ratatui::buffer::Buffer {
        let mut terminal = Terminal::new(TestBackend::new(60, 26)).unwrap();
        let theme = Theme::default();
        let mut flash = ClearFlash::default();
        terminal
            .draw(|f| draw(f, world, &theme, screen, paused, &mut flash, Instant::now()))
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn text(buf: &ratatui::buffer::Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_board_size() {
        assert_eq!(board_outer_size(10, 20), (22, 22));
        assert_eq!(board_outer_size(255, 255), (512, 257));
    }

    #[test]
    fn test_largest_grid_draws_clipped() {
        let config = GameConfig {
            rows: 255,
            columns: 255,
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
        let world = World::with_rng(&config, StdRng::seed_from_u64(5));
        let out = text(&render(&world, Screen::Playing, false));
        assert!(out.contains('·'));
    }

    #[test]
    fn test_draws_board_and_sidebar() {
        let world = World::with_rng(&GameConfig::default(), StdRng::seed_from_u64(1));
        let out = text(&render(&world, Screen::Playing, false));
        assert!(out.contains("Blockfall"));
        assert!(out.contains("Next"));
        assert!(out.contains("Colours"));
        assert!(out.contains('█'));
    }

    #[test]
    fn test_overlays() {
        let world = World::with_rng(&GameConfig::default(), StdRng::seed_from_u64(2));
        assert!(text(&render(&world, Screen::Playing, true)).contains("Paused"));
        let over = text(&render(&world, Screen::GameOver, false));
        assert!(over.contains("Game Over"));
        assert!(over.contains("retry"));
    }

    #[test]
    fn test_flash_positions_cover_rows() {
        let inner = Rect::new(1, 1, 20, 20);
        let set = flash_positions(inner, &[3, 25]);
        assert_eq!(set.len(), 20);
        assert!(set.contains(&(1, 4)));
        assert!(set.contains(&(20, 4)));
    }

    #[test]
    fn test_clear_flash_lifecycle() {
        let mut flash = ClearFlash::default();
        assert!(!flash.is_active());
        flash.start(vec![18]);
        assert!(flash.is_active());
        assert!(!flash.done());
        flash.clear();
        assert!(!flash.is_active());
    }
}
