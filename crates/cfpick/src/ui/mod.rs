mod host;

use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Widget, Wrap,
};

use crate::actions::{Command, Level, Notice, Outcome, dispatch};
use crate::error::{Error, Result};
use crate::filter;
use crate::listing::{Controller, Listing};
use crate::model::{BuildRecord, BuildStatus, PipelineRecord, format_age};
use crate::runner::CommandRunner;

use host::TuiHost;

const MAX_NOTICES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Builds,
    Pipelines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    Confirm { prompt: String },
    Busy { label: String },
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
    Dispatch(Command),
}

pub struct App {
    screen: Screen,
    host_name: String,

    builds: Listing<BuildRecord>,
    builds_loaded: bool,
    build_query: String,
    build_matches: Vec<usize>,
    build_list: ListState,

    pipelines: Listing<PipelineRecord>,
    pipelines_loaded: bool,
    pipeline_query: String,
    pipeline_matches: Vec<usize>,
    pipeline_list: ListState,

    show_report: bool,
    notices: VecDeque<Notice>,
    input: InputMode,
}

impl App {
    pub fn new(screen: Screen, host_name: impl Into<String>, builds_scope: &str) -> Self {
        Self {
            screen,
            host_name: host_name.into(),
            builds: Listing::empty(builds_scope),
            builds_loaded: false,
            build_query: String::new(),
            build_matches: Vec::new(),
            build_list: ListState::default(),
            pipelines: Listing::empty("all pipelines"),
            pipelines_loaded: false,
            pipeline_query: String::new(),
            pipeline_matches: Vec::new(),
            pipeline_list: ListState::default(),
            show_report: false,
            notices: VecDeque::new(),
            input: InputMode::Normal,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn query(&self) -> &str {
        match self.screen {
            Screen::Builds => &self.build_query,
            Screen::Pipelines => &self.pipeline_query,
        }
    }

    fn query_mut(&mut self) -> &mut String {
        match self.screen {
            Screen::Builds => &mut self.build_query,
            Screen::Pipelines => &mut self.pipeline_query,
        }
    }

    /// The command that loads the current screen's listing.
    pub fn refresh_command(&self) -> Command {
        match self.screen {
            Screen::Builds => Command::RefreshBuilds,
            Screen::Pipelines => Command::RefreshPipelines,
        }
    }

    pub fn selected_build(&self) -> Option<&BuildRecord> {
        let idx = *self.build_matches.get(self.build_list.selected()?)?;
        self.builds.records().get(idx)
    }

    pub fn selected_pipeline(&self) -> Option<&PipelineRecord> {
        let idx = *self.pipeline_matches.get(self.pipeline_list.selected()?)?;
        self.pipelines.records().get(idx)
    }

    pub fn visible_builds(&self) -> impl Iterator<Item = &BuildRecord> {
        self.build_matches
            .iter()
            .filter_map(|i| self.builds.records().get(*i))
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn push_notice(&mut self, notice: Notice) {
        while self.notices.len() >= MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }

    fn set_confirm(&mut self, prompt: &str) {
        self.input = InputMode::Confirm {
            prompt: prompt.to_string(),
        };
    }

    fn set_busy(&mut self, label: impl Into<String>) {
        self.input = InputMode::Busy {
            label: label.into(),
        };
    }

    fn clear_modal(&mut self) {
        self.input = InputMode::Normal;
    }

    fn recompute_matches(&mut self) {
        match self.screen {
            Screen::Builds => {
                self.build_matches =
                    filter::rank(&self.build_query, self.builds.records(), BuildRecord::haystack);
                clamp_selection(&mut self.build_list, self.build_matches.len());
            }
            Screen::Pipelines => {
                self.pipeline_matches = filter::rank(
                    &self.pipeline_query,
                    self.pipelines.records(),
                    PipelineRecord::haystack,
                );
                clamp_selection(&mut self.pipeline_list, self.pipeline_matches.len());
            }
        }
    }

    fn active_list(&mut self) -> (&mut ListState, usize) {
        match self.screen {
            Screen::Builds => (&mut self.build_list, self.build_matches.len()),
            Screen::Pipelines => (&mut self.pipeline_list, self.pipeline_matches.len()),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let (list, len) = self.active_list();
        if len == 0 {
            list.select(None);
            return;
        }
        let cur = list.selected().unwrap_or(0);
        list.select(Some(add_signed_saturating(cur, delta).min(len - 1)));
    }

    /// Swap in a fresh snapshot from a finished command.
    pub fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Builds(listing) => {
                let prev_id = self.selected_build().map(|b| b.id.clone());
                self.builds = listing;
                self.builds_loaded = true;
                let screen = self.screen;
                self.screen = Screen::Builds;
                self.recompute_matches();
                let pos = prev_id.and_then(|id| self.visible_builds().position(|b| b.id == id));
                if let Some(pos) = pos {
                    self.build_list.select(Some(pos));
                }
                self.screen = screen;
            }
            Outcome::Pipelines(listing) => {
                self.pipelines = listing;
                self.pipelines_loaded = true;
                let screen = self.screen;
                self.screen = Screen::Pipelines;
                self.recompute_matches();
                self.screen = screen;
            }
            _ => {}
        }
    }

    fn switch_screen(&mut self) -> Step {
        self.screen = match self.screen {
            Screen::Builds => Screen::Pipelines,
            Screen::Pipelines => Screen::Builds,
        };
        if !self.loaded(self.screen) {
            return Step::Dispatch(self.refresh_command());
        }
        Step::Continue
    }

    fn loaded(&self, screen: Screen) -> bool {
        match screen {
            Screen::Builds => self.builds_loaded,
            Screen::Pipelines => self.pipelines_loaded,
        }
    }

    /// Pipeline picker Enter: show that pipeline's builds.
    fn drill_into_pipeline(&mut self) -> Step {
        let Some(p) = self.selected_pipeline() else {
            return Step::Continue;
        };
        self.build_query = p.full_name();
        self.screen = Screen::Builds;
        self.build_list.select(Some(0));
        self.recompute_matches();
        if !self.builds_loaded {
            return Step::Dispatch(Command::RefreshBuilds);
        }
        Step::Continue
    }

    pub fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers) -> Step {
        let ctrl = mods.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(code, KeyCode::Char('c')) {
            return Step::Quit;
        }
        if self.input != InputMode::Normal {
            return Step::Continue;
        }

        if ctrl {
            return match code {
                KeyCode::Char('t') => self
                    .selected_build_on_screen()
                    .map(|b| Step::Dispatch(Command::Terminate(b)))
                    .unwrap_or(Step::Continue),
                KeyCode::Char('r') => self
                    .selected_build_on_screen()
                    .map(|b| Step::Dispatch(Command::Restart(b)))
                    .unwrap_or(Step::Continue),
                KeyCode::Char('o') => self.open_selected(),
                KeyCode::Char('l') => Step::Dispatch(self.refresh_command()),
                KeyCode::Char('u') => {
                    self.query_mut().clear();
                    self.recompute_matches();
                    Step::Continue
                }
                KeyCode::Char('n') | KeyCode::Char('j') => {
                    self.move_selection(1);
                    Step::Continue
                }
                KeyCode::Char('p') | KeyCode::Char('k') => {
                    self.move_selection(-1);
                    Step::Continue
                }
                _ => Step::Continue,
            };
        }

        match code {
            KeyCode::Esc => {
                if self.query().is_empty() {
                    return Step::Quit;
                }
                self.query_mut().clear();
                self.recompute_matches();
            }
            KeyCode::Tab | KeyCode::BackTab => return self.switch_screen(),
            KeyCode::F(5) => return Step::Dispatch(self.refresh_command()),
            KeyCode::F(2) => self.show_report = !self.show_report,
            KeyCode::Down => self.move_selection(1),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::Enter => match self.screen {
                Screen::Builds => {
                    if let Some(b) = self.selected_build().cloned() {
                        return Step::Dispatch(Command::FollowLogs(b));
                    }
                }
                Screen::Pipelines => return self.drill_into_pipeline(),
            },
            KeyCode::Backspace => {
                self.query_mut().pop();
                self.recompute_matches();
            }
            KeyCode::Char(c) => {
                self.query_mut().push(c);
                self.recompute_matches();
                let (list, len) = self.active_list();
                list.select((len > 0).then_some(0));
            }
            _ => {}
        }
        Step::Continue
    }

    fn selected_build_on_screen(&self) -> Option<BuildRecord> {
        match self.screen {
            Screen::Builds => self.selected_build().cloned(),
            Screen::Pipelines => None,
        }
    }

    fn open_selected(&self) -> Step {
        let cmd = match self.screen {
            Screen::Builds => self.selected_build().cloned().map(Command::OpenBuild),
            Screen::Pipelines => self.selected_pipeline().cloned().map(Command::OpenPipeline),
        };
        cmd.map(Step::Dispatch).unwrap_or(Step::Continue)
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(f.area());

        self.draw_header(f, chunks[0]);
        self.draw_main(f, chunks[1]);
        self.draw_prompt(f, chunks[2]);
        self.draw_footer(f, chunks[3]);
        self.draw_modal(f);
    }

    fn draw_header(&self, f: &mut ratatui::Frame, area: Rect) {
        let (title, scope, summary, fetched) = match self.screen {
            Screen::Builds => (
                "cfpick: Builds",
                self.builds.scope.as_str(),
                self.builds.report.summary(),
                self.builds.fetched_at,
            ),
            Screen::Pipelines => (
                "cfpick: Pipelines",
                self.pipelines.scope.as_str(),
                self.pipelines.report.summary(),
                self.pipelines.fetched_at,
            ),
        };
        let line = Line::from(vec![
            Span::styled(title, Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled(scope.to_string(), Style::default().fg(Color::LightBlue)),
            Span::raw("  "),
            Span::styled(summary, Style::default().fg(Color::Gray)),
            Span::raw("  "),
            Span::styled(
                fetched.format("%H:%M:%S").to_string(),
                Style::default().fg(Color::Yellow),
            ),
        ]);
        let p = Paragraph::new(Text::from(line)).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_type(BorderType::Plain),
        );
        f.render_widget(p, area);
    }

    fn draw_main(&self, f: &mut ratatui::Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        match self.screen {
            Screen::Builds => self.draw_build_list(f, cols[0]),
            Screen::Pipelines => self.draw_pipeline_list(f, cols[0]),
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(8)])
            .split(cols[1]);
        let (title, body) = if self.show_report {
            ("Parse Report [F2]", self.render_report())
        } else {
            ("Preview", self.render_preview())
        };
        let p = Paragraph::new(body).wrap(Wrap { trim: false }).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
        f.render_widget(p, rows[0]);
        self.draw_notices(f, rows[1]);
    }

    fn draw_build_list(&self, f: &mut ratatui::Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .visible_builds()
            .map(|b| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", b.status.glyph()),
                        Style::default().fg(status_color(b.status)),
                    ),
                    Span::raw(format!("{:<28} ", b.pipeline)),
                    Span::styled(
                        format!("{:<11} ", b.status.as_str()),
                        Style::default().fg(status_color(b.status)),
                    ),
                    Span::styled(b.started.clone(), Style::default().fg(Color::Gray)),
                ]))
            })
            .collect();
        let title = format!(
            "Builds {}/{}",
            self.build_matches.len(),
            self.builds.len()
        );
        self.render_list(f, area, items, title, &self.build_list);
    }

    fn draw_pipeline_list(&self, f: &mut ratatui::Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .pipeline_matches
            .iter()
            .filter_map(|i| self.pipelines.records().get(*i))
            .map(|p| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{}/", p.project), Style::default().fg(Color::Gray)),
                    Span::raw(p.name.clone()),
                ]))
            })
            .collect();
        let title = format!(
            "Pipelines {}/{}",
            self.pipeline_matches.len(),
            self.pipelines.len()
        );
        self.render_list(f, area, items, title, &self.pipeline_list);
    }

    fn render_list(
        &self,
        f: &mut ratatui::Frame,
        area: Rect,
        items: Vec<ListItem>,
        title: String,
        state: &ListState,
    ) {
        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::LightYellow))
            .highlight_symbol("> ");
        let mut state = state.clone();
        f.render_stateful_widget(list, area, &mut state);
    }

    fn render_preview(&self) -> Text<'static> {
        let mut lines = Vec::new();
        let key = |k: &str| Span::styled(format!("{k:<10}"), Style::default().fg(Color::Yellow));
        match self.screen {
            Screen::Builds => {
                let Some(b) = self.selected_build() else {
                    return Text::from(self.empty_hint(&self.builds));
                };
                lines.push(Line::from(vec![key("id"), Span::raw(b.id.clone())]));
                lines.push(Line::from(vec![key("pipeline"), Span::raw(b.pipeline.clone())]));
                lines.push(Line::from(vec![
                    key("status"),
                    Span::styled(
                        format!("{} {}", b.status.glyph(), b.status),
                        Style::default().fg(status_color(b.status)),
                    ),
                ]));
                let age = b
                    .started_at()
                    .map(|t| format!("  ({})", format_age(t, chrono::Utc::now())))
                    .unwrap_or_default();
                lines.push(Line::from(vec![
                    key("started"),
                    Span::raw(format!("{}{age}", b.started)),
                ]));
                lines.push(Line::from(vec![
                    key("restart"),
                    Span::raw(if b.restartable() { "allowed" } else { "not allowed" }),
                ]));
                lines.push(Line::from(vec![key("url"), Span::raw(b.url(&self.host_name))]));
            }
            Screen::Pipelines => {
                let Some(p) = self.selected_pipeline() else {
                    return Text::from(self.empty_hint(&self.pipelines));
                };
                lines.push(Line::from(vec![key("project"), Span::raw(p.project.clone())]));
                lines.push(Line::from(vec![key("name"), Span::raw(p.name.clone())]));
                lines.push(Line::from(vec![key("url"), Span::raw(p.url(&self.host_name))]));
                lines.push(Line::from(""));
                lines.push(Line::from("Enter shows this pipeline's builds."));
            }
        }
        Text::from(lines)
    }

    fn empty_hint<T>(&self, listing: &Listing<T>) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from("Nothing selected.")];
        if let Some(err) = &listing.error {
            lines.push(Line::from(Span::styled(
                format!("last fetch failed: {err}"),
                Style::default().fg(Color::Red),
            )));
        } else if !self.query().is_empty() {
            lines.push(Line::from("No rows match the current query."));
        }
        lines
    }

    fn render_report(&self) -> Text<'static> {
        let report = match self.screen {
            Screen::Builds => (&self.builds.report.malformed, self.builds.report.headers),
            Screen::Pipelines => (
                &self.pipelines.report.malformed,
                self.pipelines.report.headers,
            ),
        };
        let (malformed, headers) = report;
        let mut lines = vec![Line::from(format!(
            "headers skipped: {headers}  malformed: {}",
            malformed.len()
        ))];
        for row in malformed {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("line {}: {}", row.line_no, row.reason),
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::from(row.line.clone()));
        }
        Text::from(lines)
    }

    fn draw_notices(&self, f: &mut ratatui::Frame, area: Rect) {
        let height = area.height.saturating_sub(2) as usize;
        let lines: Vec<Line> = self
            .notices
            .iter()
            .rev()
            .take(height)
            .rev()
            .map(|n| Line::from(Span::styled(n.text.clone(), notice_style(n.level))))
            .collect();
        let p = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }).block(
            Block::default()
                .title("Notices")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
        f.render_widget(p, area);
    }

    fn draw_prompt(&self, f: &mut ratatui::Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::LightYellow)),
            Span::raw(self.query().to_string()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]);
        let p = Paragraph::new(line).block(
            Block::default()
                .title("Filter")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
        f.render_widget(p, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame, area: Rect) {
        let hint = match self.screen {
            Screen::Builds => {
                "[Up/Down] Move  [Enter] Logs  [C-t] Terminate  [C-r] Restart  [C-o] Open  [F5/C-l] Refresh  [F2] Report  [Tab] Pipelines  [Esc] Clear/Quit"
            }
            Screen::Pipelines => {
                "[Up/Down] Move  [Enter] Builds  [C-o] Open  [F5/C-l] Refresh  [F2] Report  [Tab] Builds  [Esc] Clear/Quit"
            }
        };
        let latest = match self.notices.back() {
            Some(n) => Line::from(Span::styled(n.to_string(), notice_style(n.level))),
            None => Line::from(""),
        };
        let lines = vec![
            latest,
            Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::TOP));
        f.render_widget(p, area);
    }

    fn draw_modal(&self, f: &mut ratatui::Frame) {
        let (title, text) = match &self.input {
            InputMode::Normal => return,
            InputMode::Confirm { prompt } => (
                "Confirm",
                vec![
                    Line::from(Span::styled(
                        prompt.clone(),
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from("y: yes, run it"),
                    Line::from("n/Esc/Enter: no, leave the build alone"),
                ],
            ),
            InputMode::Busy { label } => ("Working", vec![Line::from(label.clone())]),
        };

        let area = centered_rect(60, 25, f.area());
        let shadow = shadow_rect(area, f.area());
        f.render_widget(
            Fill {
                style: Style::default()
                    .bg(Color::Black)
                    .add_modifier(Modifier::DIM),
            },
            shadow,
        );
        f.render_widget(Clear, area);
        let p = Paragraph::new(Text::from(text))
            .style(Style::default().fg(Color::White).bg(Color::DarkGray))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double),
            );
        f.render_widget(p, area);
    }
}

pub fn run_tui<R: CommandRunner>(ctl: &Controller<R>, screen: Screen) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode().map_err(|e| Error::msg(e.to_string()))?;
    execute!(stdout, EnterAlternateScreen, Hide).map_err(|e| Error::msg(e.to_string()))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| Error::msg(e.to_string()))?;
    terminal
        .clear()
        .map_err(|e| Error::msg(format!("tui clear failed: {e}")))?;

    let app = App::new(screen, ctl.host(), &ctl.builds_scope());
    let result = run_loop(&mut terminal, app, ctl);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show).ok();
    result
}

fn run_loop<R: CommandRunner>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
    ctl: &Controller<R>,
) -> Result<()> {
    let initial = app.refresh_command();
    run_command(terminal, &mut app, ctl, initial);

    let tick = Duration::from_millis(200);
    loop {
        let mut draw_panicked = false;
        let draw_result = terminal.draw(|f| {
            if catch_unwind(AssertUnwindSafe(|| app.draw(f))).is_err() {
                draw_panicked = true;
            }
        });
        if draw_panicked {
            tracing::error!("draw panicked; clearing screen");
            let _ = terminal.clear();
            continue;
        }
        if let Err(e) = draw_result {
            tracing::error!(error = %e, "draw failed");
            let _ = terminal.clear();
            continue;
        }

        if !event::poll(tick).map_err(|e| Error::msg(e.to_string()))? {
            continue;
        }
        let Event::Key(k) = event::read().map_err(|e| Error::msg(e.to_string()))? else {
            continue;
        };
        if k.kind != KeyEventKind::Press {
            continue;
        }
        match app.handle_key(k.code, k.modifiers) {
            Step::Continue => {}
            Step::Quit => break,
            Step::Dispatch(cmd) => run_command(terminal, &mut app, ctl, cmd),
        }
    }
    Ok(())
}

/// Dispatch one command with the TUI as host, then fold the outcome into the app.
fn run_command<R: CommandRunner>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    ctl: &Controller<R>,
    cmd: Command,
) {
    let label = match &cmd {
        Command::RefreshBuilds => Some(format!("Fetching builds ({})...", ctl.builds_scope())),
        Command::RefreshPipelines => Some("Fetching pipelines...".to_string()),
        _ => None,
    };
    if let Some(label) = label {
        app.set_busy(label);
        let _ = terminal.draw(|f| app.draw(f));
    }

    let destructive = cmd.is_destructive();
    let outcome = {
        let mut host = TuiHost::new(terminal, app);
        dispatch(ctl, cmd, &mut host)
    };
    app.clear_modal();

    let executed = outcome == Outcome::Executed;
    app.apply(outcome);
    if destructive && executed {
        run_command(terminal, app, ctl, Command::RefreshBuilds);
    }
}

fn clamp_selection(list: &mut ListState, len: usize) {
    if len == 0 {
        list.select(None);
        return;
    }
    let cur = list.selected().unwrap_or(0);
    list.select(Some(cur.min(len - 1)));
}

fn add_signed_saturating(base: usize, delta: isize) -> usize {
    if delta >= 0 {
        base.saturating_add(delta as usize)
    } else {
        base.saturating_sub(delta.unsigned_abs())
    }
}

fn status_color(status: BuildStatus) -> Color {
    match status {
        BuildStatus::Running => Color::Cyan,
        BuildStatus::Success => Color::Green,
        BuildStatus::Error => Color::Red,
        BuildStatus::Terminated | BuildStatus::Terminating => Color::DarkGray,
        BuildStatus::Delayed | BuildStatus::Pending => Color::Yellow,
        BuildStatus::Elected => Color::Magenta,
    }
}

fn notice_style(level: Level) -> Style {
    match level {
        Level::Info => Style::default().fg(Color::Gray),
        Level::Warn => Style::default().fg(Color::Yellow),
        Level::Error => Style::default().fg(Color::Red),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let popup_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    popup_layout[1]
}

fn shadow_rect(inner: Rect, bounds: Rect) -> Rect {
    let max_x = bounds.x.saturating_add(bounds.width);
    let max_y = bounds.y.saturating_add(bounds.height);
    let x = inner.x.saturating_add(1).min(max_x.saturating_sub(1));
    let y = inner.y.saturating_add(1).min(max_y.saturating_sub(1));
    Rect {
        x,
        y,
        width: inner.width.min(max_x.saturating_sub(x)),
        height: inner.height.min(max_y.saturating_sub(y)),
    }
}

struct Fill {
    style: Style,
}

impl Widget for Fill {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for y in area.y..area.y.saturating_add(area.height) {
            for x in area.x..area.x.saturating_add(area.width) {
                buf[(x, y)].set_char(' ').set_style(self.style);
            }
        }
    }
}
