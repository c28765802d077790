use std::io::Stdout;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use super::App;
use crate::actions::{Host, Notice};
use crate::error::{Error, Result};
use crate::runner::{CommandRunner, Invocation, RunStatus};

/// [`Host`] backed by the live terminal. Confirmation is a modal drawn over
/// the picker; following logs hands the terminal to the child until it exits.
pub(super) struct TuiHost<'a> {
    terminal: &'a mut Terminal<CrosstermBackend<Stdout>>,
    app: &'a mut App,
}

impl<'a> TuiHost<'a> {
    pub(super) fn new(terminal: &'a mut Terminal<CrosstermBackend<Stdout>>, app: &'a mut App) -> Self {
        Self { terminal, app }
    }

    fn redraw(&mut self) {
        let app = &mut *self.app;
        if let Err(e) = self.terminal.draw(|f| app.draw(f)) {
            tracing::warn!(error = %e, "redraw failed");
        }
    }

    fn wait_for_answer(&mut self) -> Result<bool> {
        loop {
            self.redraw();
            let Event::Key(k) = event::read().map_err(|e| Error::msg(e.to_string()))? else {
                continue;
            };
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Enter => {
                    return Ok(false);
                }
                _ => {}
            }
        }
    }

    fn suspend(&mut self) -> Result<()> {
        disable_raw_mode().map_err(|e| Error::msg(e.to_string()))?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, Show)
            .map_err(|e| Error::msg(e.to_string()))
    }

    fn resume(&mut self) -> Result<()> {
        enable_raw_mode().map_err(|e| Error::msg(e.to_string()))?;
        execute!(self.terminal.backend_mut(), EnterAlternateScreen, Hide)
            .map_err(|e| Error::msg(e.to_string()))?;
        self.terminal
            .clear()
            .map_err(|e| Error::msg(format!("tui clear failed: {e}")))
    }
}

impl Host for TuiHost<'_> {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.app.set_confirm(prompt);
        let answer = self.wait_for_answer();
        self.app.clear_modal();
        match answer {
            Ok(yes) => yes,
            Err(e) => {
                tracing::warn!(error = %e, "confirmation aborted");
                false
            }
        }
    }

    fn notify(&mut self, notice: Notice) {
        self.app.push_notice(notice);
    }

    fn follow(&mut self, runner: &dyn CommandRunner, inv: &Invocation) -> Result<RunStatus> {
        self.suspend()?;
        println!("$ {inv}   (Ctrl-C returns to cfpick)");
        let status = runner.attach(inv);
        self.resume()?;
        status
    }

    fn open_url(&mut self, url: &str) -> Result<()> {
        crate::browser::open_url(url)
    }
}
