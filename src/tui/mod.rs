//! TUI module - Terminal dashboard, combination editor and round timer with ratatui

use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use chrono::Local;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
};
use tracing::info;

use crate::audio::{BellSignaler, Narrator, SpeechEngine};
use crate::db::Database;
use crate::generator::{Goal, Intensity, generate_workout};
use crate::library::Library;
use crate::session::WorkoutSession;
use crate::timer::format_time;
use crate::workout::{self, Direction as Shift, MAX_COMBINATIONS};

type Tui = Terminal<CrosstermBackend<Stdout>>;
pub type PlaySession = WorkoutSession<BellSignaler, Box<dyn SpeechEngine>>;

const TICK: Duration = Duration::from_secs(1);
const VOICE_POLL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Dashboard,
    Editor,
    Playing,
}

/// Paces timer ticks to wall time
#[derive(Debug)]
struct TickClock {
    last: Instant,
}

impl TickClock {
    fn new(now: Instant) -> Self {
        Self { last: now }
    }

    /// Whole seconds due since the last tick. While paused the count
    /// restarts, so the first second after resuming is a full second.
    fn due(&mut self, now: Instant, running: bool) -> u32 {
        if !running {
            self.last = now;
            return 0;
        }
        let mut due = 0;
        while now.saturating_duration_since(self.last) >= TICK {
            self.last += TICK;
            due += 1;
        }
        due
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    RenameCombination,
    SaveFavorite,
}

impl PromptKind {
    fn label(&self) -> &'static str {
        match self {
            PromptKind::RenameCombination => "Combination name",
            PromptKind::SaveFavorite => "Favorite name",
        }
    }
}

#[derive(Debug)]
struct Prompt {
    kind: PromptKind,
    text: String,
}

/// Cursor positions in the editor panes
#[derive(Debug, Default)]
struct EditorState {
    combination: usize,
    catalog: usize,
    favorite: usize,
    round: usize,
    prompt: Option<Prompt>,
}

impl EditorState {
    fn clamp(&mut self, library: &Library) {
        self.combination = clamp(self.combination, library.combinations.len());
        self.catalog = clamp(self.catalog, library.catalog.moves().len());
        self.favorite = clamp(self.favorite, library.favorites.len());
        self.round = clamp(self.round, library.rounds.len());
    }
}

fn clamp(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

fn step(index: usize, len: usize, forward: bool) -> usize {
    if forward {
        clamp(index + 1, len)
    } else {
        index.saturating_sub(1)
    }
}

fn highlight(selected: bool) -> Style {
    if selected {
        Style::default().reversed()
    } else {
        Style::default()
    }
}

/// App state for TUI
pub struct App {
    db: Database,
    library: Library,
    session: PlaySession,
    view: View,
    selected: usize,
    editor: EditorState,
    alert: Option<String>,
    should_quit: bool,
    clock: TickClock,
    last_voice_check: Instant,
}

impl App {
    pub fn new(db: Database, bell: BellSignaler, narrator: Narrator<Box<dyn SpeechEngine>>) -> Result<Self> {
        let library = Library::load(&db);
        let session = WorkoutSession::new(library.catalog.clone(), bell, narrator);
        Ok(Self {
            db,
            library,
            session,
            view: View::Dashboard,
            selected: 0,
            editor: EditorState::default(),
            alert: None,
            should_quit: false,
            clock: TickClock::new(Instant::now()),
            last_voice_check: Instant::now(),
        })
    }

    /// Open straight into playback of a saved workout
    pub fn play(&mut self, workout_id: &str) -> Result<()> {
        if !self.library.load_workout(workout_id) {
            bail!("no workout with id {}", workout_id);
        }
        self.start_builder_workout();
        Ok(())
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
            self.drive_timer();
        }

        restore_terminal()?;
        Ok(())
    }

    fn editing(&self) -> bool {
        self.view == View::Editor || (self.view == View::Playing && self.session.is_editing())
    }

    fn drive_timer(&mut self) {
        if self.view != View::Playing {
            return;
        }
        let due = self.clock.due(Instant::now(), self.session.is_running());
        for _ in 0..due {
            self.session.tick();
        }
        if !self.session.narration_ready() && self.last_voice_check.elapsed() >= VOICE_POLL {
            self.last_voice_check = Instant::now();
            self.session.refresh_voices();
        }
        if !self.session.is_active() {
            info!("Back to dashboard");
            self.view = View::Dashboard;
        }
    }

    fn start_builder_workout(&mut self) {
        self.session.load(self.library.rounds.clone());
        if self.session.start() {
            self.view = View::Playing;
            self.clock = TickClock::new(Instant::now());
        } else {
            self.alert = Some("Workout has no rounds".to_string());
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        let title = match self.view {
            _ if self.editing() => "Heavy Bag Workout - Edit Workout".to_string(),
            View::Playing => format!("Heavy Bag Workout - {}", self.session.header()),
            _ => "Heavy Bag Workout".to_string(),
        };
        let header = Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        if self.editing() {
            self.render_editor(frame, chunks[1]);
        } else if self.view == View::Playing {
            self.render_timer(frame, chunks[1]);
        } else {
            self.render_dashboard(frame, chunks[1]);
        }

        let (text, color) = match (&self.alert, &self.editor.prompt) {
            (Some(alert), _) => (format!("{} (any key)", alert), Color::Red),
            (None, Some(prompt)) if self.editing() => (
                format!("{}: {}_   enter: ok | esc: cancel", prompt.kind.label(), prompt.text),
                Color::Yellow,
            ),
            _ if self.editing() => (
                "↑↓ combo | ←→ move | enter add | ⌫ drop | a new | x del | K/J order | n rename | f favorite | [ ] fav | o open | i insert | D del fav | , . round | z clear | u up | m rotate | esc back"
                    .to_string(),
                Color::DarkGray,
            ),
            _ if self.view == View::Playing => (
                "space: start/pause | r: reset | e: edit | s: stop | q: quit".to_string(),
                Color::DarkGray,
            ),
            _ => (
                "↑↓: select | enter: play | l: load | d: delete | c: combinations | g: generate | w: save | space: start | q: quit"
                    .to_string(),
                Color::DarkGray,
            ),
        };
        let footer = Paragraph::new(text)
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn render_timer(&self, frame: &mut Frame, area: Rect) {
        let color = if self.session.is_cooldown() { Color::Green } else { Color::Blue };
        let time = self.session.time_left().map(format_time).unwrap_or_default();
        let status = if self.session.is_running() { "running" } else { "paused" };

        let mut lines = vec![
            Line::from(time).style(Style::default().fg(color).bold()),
            Line::from(status).style(Style::default().fg(Color::DarkGray)),
            Line::from(""),
        ];
        if let Some(combo) = self.session.current_combination() {
            let catalog = self.session.catalog();
            lines.push(Line::from(combo.name.clone()).bold());
            lines.push(Line::from(combo.move_names(catalog).join("  ")));
        }

        let timer = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Timer"));
        frame.render_widget(timer, area);
    }

    fn render_dashboard(&self, frame: &mut Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let rows: Vec<Row> = self
            .library
            .workouts
            .iter()
            .enumerate()
            .map(|(i, w)| {
                Row::new(vec![
                    Cell::from(w.created_at.with_timezone(&Local).format("%Y-%m-%d").to_string()),
                    Cell::from(w.name.clone()),
                    Cell::from(w.rounds.len().to_string()),
                ])
                .style(highlight(i == self.selected))
            })
            .collect();

        let table = Table::new(
            rows,
            [Constraint::Length(12), Constraint::Min(16), Constraint::Length(7)],
        )
        .header(Row::new(vec!["Created", "Name", "Rounds"]).style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title("Saved Workouts"));
        frame.render_widget(table, cols[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(cols[1]);

        self.render_builder(frame, right[0], None);
        self.render_favorites(frame, right[1], None);
    }

    fn render_builder(&self, frame: &mut Frame, area: Rect, selected: Option<usize>) {
        let catalog = &self.library.catalog;
        let builder: Vec<ListItem> = self
            .library
            .rounds
            .iter()
            .enumerate()
            .flat_map(|(i, round)| {
                let heading = ListItem::new(format!("Round {}", round.round_number))
                    .style(highlight(selected == Some(i)).bold());
                let mut items = vec![heading];
                items.extend(round.combinations.iter().map(|c| {
                    ListItem::new(format!("  {}: {}", c.name, c.move_names(catalog).join(", ")))
                }));
                items
            })
            .collect();
        let title = match &self.library.current_workout_id {
            Some(_) => "Build Your Workout (saved)",
            None => "Build Your Workout",
        };
        frame.render_widget(
            List::new(builder).block(Block::default().borders(Borders::ALL).title(title)),
            area,
        );
    }

    fn render_favorites(&self, frame: &mut Frame, area: Rect, selected: Option<usize>) {
        let favorites: Vec<ListItem> = self
            .library
            .favorites
            .iter()
            .enumerate()
            .map(|(i, f)| {
                ListItem::new(format!("{} ({} combinations)", f.name, f.combinations.len()))
                    .style(highlight(selected == Some(i)))
            })
            .collect();
        frame.render_widget(
            List::new(favorites).block(Block::default().borders(Borders::ALL).title("Favorite Rounds")),
            area,
        );
    }

    fn render_editor(&self, frame: &mut Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Percentage(25),
                Constraint::Percentage(40),
            ])
            .split(area);

        let catalog = &self.library.catalog;
        let combos: Vec<ListItem> = self
            .library
            .combinations
            .iter()
            .enumerate()
            .map(|(i, c)| {
                ListItem::new(format!("{}: {}", c.name, c.move_names(catalog).join(", ")))
                    .style(highlight(i == self.editor.combination))
            })
            .collect();
        let title = format!("Combinations ({}/{})", self.library.combinations.len(), MAX_COMBINATIONS);
        frame.render_widget(
            List::new(combos).block(Block::default().borders(Borders::ALL).title(title)),
            cols[0],
        );

        let moves: Vec<ListItem> = catalog
            .moves()
            .iter()
            .enumerate()
            .map(|(i, m)| ListItem::new(m.name.clone()).style(highlight(i == self.editor.catalog)))
            .collect();
        frame.render_widget(
            List::new(moves).block(Block::default().borders(Borders::ALL).title("Moves")),
            cols[1],
        );

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(cols[2]);
        self.render_favorites(frame, right[0], Some(self.editor.favorite));
        self.render_builder(frame, right[1], Some(self.editor.round));
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            if self.alert.take().is_some() {
                return Ok(());
            }
            let result = if self.editing() && self.editor.prompt.is_some() {
                self.handle_prompt_key(key.code)
            } else if self.editing() {
                self.handle_editor_key(key.code)
            } else {
                match self.view {
                    View::Playing => {
                        self.handle_playing_key(key.code);
                        Ok(())
                    }
                    _ => self.handle_dashboard_key(key.code),
                }
            };
            if let Err(e) = result {
                self.alert = Some(format!("{:#}", e));
            }
            self.editor.clamp(&self.library);
        }
        Ok(())
    }

    fn handle_playing_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(' ') => {
                self.session.toggle_timer();
                self.clock = TickClock::new(Instant::now());
            }
            KeyCode::Char('r') => self.session.reset_timer(),
            KeyCode::Char('e') => self.session.toggle_editing(),
            KeyCode::Char('s') => {
                self.session.stop();
                self.view = View::Dashboard;
            }
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, code: KeyCode) -> Result<()> {
        let selected_id = self.library.workouts.get(self.selected).map(|w| w.id.clone());
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = step(self.selected, self.library.workouts.len(), true),
            KeyCode::Enter => {
                if let Some(id) = selected_id {
                    self.library.load_workout(&id);
                    self.start_builder_workout();
                }
            }
            KeyCode::Char('l') => {
                if let Some(id) = selected_id {
                    self.library.load_workout(&id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = selected_id {
                    self.library.delete_workout(&self.db, &id)?;
                    self.selected = clamp(self.selected, self.library.workouts.len());
                }
            }
            KeyCode::Char('c') => self.view = View::Editor,
            KeyCode::Char('g') => {
                let rounds = generate_workout(
                    Goal::Balanced,
                    15,
                    Intensity::Medium,
                    &self.library.catalog,
                    &mut rand::thread_rng(),
                );
                self.library.set_generated(rounds);
                self.library.current_workout_id = None;
            }
            KeyCode::Char('w') => self.save_builder()?,
            KeyCode::Char(' ') => self.start_builder_workout(),
            _ => {}
        }
        Ok(())
    }

    fn save_builder(&mut self) -> Result<()> {
        if self.library.rounds.is_empty() {
            return Ok(());
        }
        let name = format!("Workout {}", Local::now().format("%Y-%m-%d %H:%M"));
        self.library.save_workout(&self.db, &name)?;
        Ok(())
    }

    fn leave_editor(&mut self) {
        if self.view == View::Playing {
            self.session.load(self.library.rounds.clone());
            self.session.toggle_editing();
            self.clock = TickClock::new(Instant::now());
        } else {
            self.view = View::Dashboard;
        }
    }

    fn handle_editor_key(&mut self, code: KeyCode) -> Result<()> {
        let combo_id = self
            .library
            .combinations
            .get(self.editor.combination)
            .map(|c| c.id.clone());
        let favorite_id = self
            .library
            .favorites
            .get(self.editor.favorite)
            .map(|f| f.id.clone());
        let round = self.editor.round;

        match code {
            KeyCode::Esc => self.leave_editor(),
            KeyCode::Up => self.editor.combination = self.editor.combination.saturating_sub(1),
            KeyCode::Down => {
                self.editor.combination = step(self.editor.combination, self.library.combinations.len(), true)
            }
            KeyCode::Left => self.editor.catalog = self.editor.catalog.saturating_sub(1),
            KeyCode::Right => {
                self.editor.catalog = step(self.editor.catalog, self.library.catalog.moves().len(), true)
            }
            KeyCode::Enter => {
                let Some(combo_id) = combo_id else {
                    bail!("Add a combination first");
                };
                if let Some(m) = self.library.catalog.moves().get(self.editor.catalog) {
                    let move_id = m.id.clone();
                    workout::add_move(&mut self.library.combinations, &combo_id, &move_id);
                }
            }
            KeyCode::Backspace => {
                if let Some(combo) = self.library.combinations.get(self.editor.combination)
                    && let Some(last) = combo.moves.len().checked_sub(1)
                {
                    let id = combo.id.clone();
                    workout::remove_move(&mut self.library.combinations, &id, last);
                }
            }
            KeyCode::Char('a') => match workout::add_combination(&mut self.library.combinations, None) {
                Some(_) => self.editor.combination = self.library.combinations.len() - 1,
                None => bail!("A round holds at most {} combinations", MAX_COMBINATIONS),
            },
            KeyCode::Char('x') => {
                if let Some(id) = combo_id {
                    workout::remove_combination(&mut self.library.combinations, &id);
                }
            }
            KeyCode::Char('K') => {
                let index = self.editor.combination;
                if workout::move_combination(&mut self.library.combinations, index, Shift::Up) {
                    self.editor.combination -= 1;
                }
            }
            KeyCode::Char('J') => {
                let index = self.editor.combination;
                if workout::move_combination(&mut self.library.combinations, index, Shift::Down) {
                    self.editor.combination += 1;
                }
            }
            KeyCode::Char('n') => {
                if let Some(combo) = self.library.combinations.get(self.editor.combination) {
                    self.editor.prompt = Some(Prompt {
                        kind: PromptKind::RenameCombination,
                        text: combo.name.clone(),
                    });
                }
            }
            KeyCode::Char('f') => {
                if self.library.combinations.is_empty() {
                    bail!("Add a combination first");
                }
                self.editor.prompt = Some(Prompt {
                    kind: PromptKind::SaveFavorite,
                    text: String::new(),
                });
            }
            KeyCode::Char('[') => self.editor.favorite = self.editor.favorite.saturating_sub(1),
            KeyCode::Char(']') => {
                self.editor.favorite = step(self.editor.favorite, self.library.favorites.len(), true)
            }
            KeyCode::Char('o') => {
                if let Some(id) = favorite_id {
                    self.library.load_favorite(&id);
                }
            }
            KeyCode::Char('D') => {
                if let Some(id) = favorite_id {
                    self.library.remove_favorite(&self.db, &id)?;
                }
            }
            KeyCode::Char('i') => {
                if let Some(id) = favorite_id {
                    let next = self.library.rounds.len() as u32 + 1;
                    self.library.update_workout_round(&self.db, next, &id)?;
                    self.editor.round = self.library.rounds.len().saturating_sub(1);
                }
            }
            KeyCode::Char(',') => self.editor.round = round.saturating_sub(1),
            KeyCode::Char('.') => self.editor.round = step(round, self.library.rounds.len(), true),
            KeyCode::Char('z') => {
                if let Some(r) = self.library.rounds.get(round) {
                    let number = r.round_number;
                    self.library.clear_workout_round(&self.db, number)?;
                }
            }
            KeyCode::Char('u') => {
                if round > 0 {
                    self.library.reorder_workout_rounds(&self.db, round, round - 1)?;
                    self.editor.round -= 1;
                }
            }
            KeyCode::Char('m') => {
                if let Some(last) = self
                    .library
                    .rounds
                    .get(round)
                    .and_then(|r| r.combinations.len().checked_sub(1))
                {
                    self.library.reorder_round_combinations(&self.db, round, 0, last)?;
                }
            }
            KeyCode::Char('w') => self.save_builder()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, code: KeyCode) -> Result<()> {
        let Some(prompt) = self.editor.prompt.as_mut() else {
            return Ok(());
        };
        match code {
            KeyCode::Char(c) => prompt.text.push(c),
            KeyCode::Backspace => {
                prompt.text.pop();
            }
            KeyCode::Esc => self.editor.prompt = None,
            KeyCode::Enter => {
                let Some(Prompt { kind, text }) = self.editor.prompt.take() else {
                    return Ok(());
                };
                let name = text.trim();
                match kind {
                    PromptKind::RenameCombination => {
                        if let Some(combo) = self.library.combinations.get(self.editor.combination) {
                            let id = combo.id.clone();
                            workout::rename_combination(&mut self.library.combinations, &id, name);
                        }
                    }
                    PromptKind::SaveFavorite if !name.is_empty() => {
                        self.library.save_to_favorites(&self.db, name)?;
                        self.editor.favorite = self.library.favorites.len() - 1;
                    }
                    PromptKind::SaveFavorite => {}
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
