//! App: terminal init, main loop, gravity timer and key handling.

use crate::config::GameConfig;
use crate::game::{MoveOutcome, World};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::ClearFlash;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

/// Whether the loop keeps going after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    world: World,
    screen: Screen,
    paused: bool,
    last_tick: Instant,
    frame_interval: Duration,
    flash: ClearFlash,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, frame_rate: f64) -> Self {
        let world = World::new(&config);
        let frame_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            60.0
        };
        let screen = if world.is_game_over() {
            Screen::GameOver
        } else {
            Screen::Playing
        };
        Self {
            config,
            theme,
            world,
            screen,
            paused: false,
            last_tick: Instant::now(),
            frame_interval: Duration::from_secs_f64(1.0 / frame_rate),
            flash: ClearFlash::default(),
        }
    }

    fn reset_game(&mut self) {
        self.world.reset();
        self.screen = if self.world.is_game_over() {
            Screen::GameOver
        } else {
            Screen::Playing
        };
        self.paused = false;
        self.last_tick = Instant::now();
        self.flash.clear();
    }

    /// Follow-up after any downward step: flash cleared rows, switch to the
    /// retry screen when the new block had no room.
    fn after_move(&mut self, outcome: MoveOutcome) {
        if let MoveOutcome::Locked(report) = outcome {
            if !report.cleared_rows.is_empty() {
                self.flash.start(report.cleared_rows);
            }
            if report.game_over {
                self.screen = Screen::GameOver;
                self.paused = false;
            }
        }
    }

    /// Gravity: one row down per elapsed interval while playing.
    fn tick(&mut self, now: Instant) {
        if self.screen != Screen::Playing || self.paused {
            return;
        }
        if now.saturating_duration_since(self.last_tick) >= self.config.tick_interval() {
            self.last_tick = now;
            let outcome = self.world.tick_down();
            self.after_move(outcome);
        }
    }

    /// One simulation mutator per action at most.
    fn apply_action(&mut self, action: Action) -> Flow {
        if action == Action::Quit {
            return Flow::Quit;
        }
        match self.screen {
            Screen::GameOver => {
                if action == Action::Restart {
                    self.reset_game();
                }
            }
            Screen::Playing if self.paused => match action {
                Action::Pause => {
                    self.paused = false;
                    self.last_tick = Instant::now();
                }
                Action::Restart => self.reset_game(),
                _ => {}
            },
            Screen::Playing => match action {
                Action::MoveLeft => {
                    let outcome = self.world.move_left();
                    self.after_move(outcome);
                }
                Action::MoveRight => {
                    let outcome = self.world.move_right();
                    self.after_move(outcome);
                }
                Action::Rotate => {
                    if !self.world.rotate() {
                        debug!("rotation blocked");
                    }
                }
                Action::SoftDrop => {
                    let outcome = self.world.tick_down();
                    self.after_move(outcome);
                }
                Action::Restart => {
                    info!("restart requested");
                    self.reset_game();
                }
                Action::Pause => self.paused = true,
                Action::Quit | Action::None => {}
            },
        }
        Flow::Continue
    }

    /// How long to wait for input: until the next frame, or the next gravity
    /// tick if that comes first. Gravity only counts while it is running.
    fn poll_timeout(&self, now: Instant) -> Duration {
        let frame = self.frame_interval.saturating_sub(now.elapsed());
        if self.screen != Screen::Playing || self.paused {
            return frame;
        }
        let until_tick = self
            .config
            .tick_interval()
            .saturating_sub(now.saturating_duration_since(self.last_tick));
        frame.min(until_tick)
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            cursor::Show,
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen, Show)?;
        disable_raw_mode()?;
        info!("terminal restored");

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.world,
                    &self.theme,
                    self.screen,
                    self.paused,
                    &mut self.flash,
                    now,
                );
            })?;
            if self.flash.done() {
                self.flash.clear();
            }

            if event::poll(self.poll_timeout(now))? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.apply_action(key_to_action(key)) == Flow::Quit {
                            return Ok(());
                        }
                    }
                }
            }

            self.tick(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Offset;

    fn app() -> App {
        let config = GameConfig {
            seed: Some(99),
            ..GameConfig::default()
        };
        App::new(config, Theme::default(), 60.0)
    }

    #[test]
    fn test_starts_playing() {
        let a = app();
        assert_eq!(a.screen, Screen::Playing);
        assert!(!a.paused);
        assert_eq!(a.world.offset(), Offset { x: 4, y: 0 });
    }

    #[test]
    fn test_moves_reach_world() {
        let mut a = app();
        assert_eq!(a.apply_action(Action::MoveRight), Flow::Continue);
        assert_eq!(a.world.offset().x, 5);
        a.apply_action(Action::SoftDrop);
        assert_eq!(a.world.offset().y, 1);
    }

    #[test]
    fn test_pause_blocks_input_and_gravity() {
        let mut a = app();
        a.apply_action(Action::Pause);
        assert!(a.paused);
        a.apply_action(Action::MoveLeft);
        assert_eq!(a.world.offset().x, 4);
        a.tick(Instant::now() + Duration::from_secs(5));
        assert_eq!(a.world.offset().y, 0);
        a.apply_action(Action::Pause);
        assert!(!a.paused);
    }

    #[test]
    fn test_poll_waits_for_frame_while_gravity_stopped() {
        let mut a = app();
        let now = Instant::now();
        a.last_tick = now - Duration::from_millis(300);
        assert_eq!(a.poll_timeout(now), Duration::ZERO);

        a.apply_action(Action::Pause);
        a.last_tick = now - Duration::from_millis(300);
        assert!(a.poll_timeout(now) > Duration::ZERO);

        a.paused = false;
        a.screen = Screen::GameOver;
        assert!(a.poll_timeout(now) > Duration::ZERO);
    }

    #[test]
    fn test_resume_restarts_gravity_interval() {
        let mut a = app();
        a.apply_action(Action::Pause);
        a.last_tick = Instant::now() - Duration::from_secs(5);
        a.apply_action(Action::Pause);
        assert!(!a.paused);
        a.tick(Instant::now());
        assert_eq!(a.world.offset().y, 0);
        assert!(a.poll_timeout(Instant::now()) > Duration::ZERO);
    }

    #[test]
    fn test_gravity_waits_for_interval() {
        let mut a = app();
        let start = a.last_tick;
        a.tick(start + Duration::from_millis(50));
        assert_eq!(a.world.offset().y, 0);
        a.tick(start + Duration::from_millis(200));
        assert_eq!(a.world.offset().y, 1);
    }

    #[test]
    fn test_game_over_only_allows_restart() {
        let mut a = app();
        let mut guard = 0;
        while a.screen == Screen::Playing {
            a.apply_action(Action::SoftDrop);
            guard += 1;
            assert!(guard < 10_000, "stack never reached the top");
        }
        assert_eq!(a.screen, Screen::GameOver);
        assert!(a.world.is_game_over());

        let offset = a.world.offset();
        a.apply_action(Action::MoveLeft);
        a.apply_action(Action::SoftDrop);
        assert_eq!(a.world.offset(), offset);

        a.apply_action(Action::Restart);
        assert_eq!(a.screen, Screen::Playing);
        assert!(!a.world.is_game_over());
    }

    #[test]
    fn test_quit_from_any_screen() {
        let mut a = app();
        assert_eq!(a.apply_action(Action::Quit), Flow::Quit);
        a.screen = Screen::GameOver;
        assert_eq!(a.apply_action(Action::Quit), Flow::Quit);
    }
}
