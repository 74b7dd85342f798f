pub mod api;
pub mod app_dirs;
pub mod attempts;
pub mod config;
pub mod grouping;
pub mod persist;
pub mod question;
pub mod runtime;
pub mod session;
pub mod shuffle;
pub mod timer;
pub mod ui;

use crate::{
    api::{AnswerEntry, AttemptReceipt, AttemptSink, AttemptSubmission, BundledQuizSource,
          DirQuizSource, QuizSource},
    attempts::{AttemptRecord, AttemptsDb},
    config::{ConfigStore, FileConfigStore},
    grouping::{project, Projection},
    persist::ProgressStore,
    question::{validate_questions, Question},
    runtime::{CrosstermEventSource, QuizEvent, Runner},
    session::{Mode, Phase, Session},
    timer::ExamTimer,
};
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;

/// terminal quiz runner with study and exam modes
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal quiz runner with a relaxed study mode that reveals answers as you go, a shuffled exam mode with negative marking and a countdown clock, resumable in-progress attempts, and a local attempt history."
)]
pub struct Cli {
    /// quiz to run (the id of a <id>.json document)
    quiz: Option<String>,

    /// directory of quiz JSON files (defaults to the bundled set)
    #[clap(short = 'd', long)]
    quiz_dir: Option<PathBuf>,

    /// start directly in this mode, skipping the picker
    #[clap(short, long, value_enum)]
    mode: Option<CliMode>,

    /// discard any saved in-progress attempt and start fresh
    #[clap(long)]
    fresh: bool,

    /// list available quizzes and exit
    #[clap(short, long)]
    list: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum CliMode {
    Study,
    Exam,
}

impl CliMode {
    fn as_mode(&self) -> Mode {
        match self {
            CliMode::Study => Mode::Study,
            CliMode::Exam => Mode::Exam,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    Quiz,
    History,
}

#[derive(Debug)]
pub struct App {
    pub quiz_id: String,
    pub quiz_title: String,
    pub session: Session,
    pub projection: Projection,
    pub timer: Option<ExamTimer>,
    pub cursor: usize,
    pub screen: AppScreen,
    pub history: Vec<AttemptRecord>,
    pub receipt: Option<AttemptReceipt>,
    pub notice: Option<String>,
    history_limit: usize,
    attempts: Option<AttemptsDb>,
}

impl App {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        quiz_id: &str,
        quiz_title: &str,
        questions: Vec<Question>,
        progress: Option<ProgressStore>,
        attempts: Option<AttemptsDb>,
        fresh: bool,
        default_mode: Option<Mode>,
        history_limit: usize,
    ) -> Self {
        let session = Session::new(questions, Some(quiz_id), progress, fresh);

        let notice = if session.restored {
            Some("Resumed an in-progress attempt".to_string())
        } else {
            None
        };

        // A restored exam keeps its original clock, so time spent before the
        // reload still counts against the allotment.
        let timer = if session.restored
            && session.mode == Some(Mode::Exam)
            && session.phase == Phase::InProgress
        {
            Some(ExamTimer::new(
                session.questions.len(),
                session.started_at.unwrap_or_else(chrono::Local::now),
            ))
        } else {
            None
        };

        let projection = project(&session.questions);

        let mut app = Self {
            quiz_id: quiz_id.to_string(),
            quiz_title: quiz_title.to_string(),
            session,
            projection,
            timer,
            cursor: 0,
            screen: AppScreen::Quiz,
            history: Vec::new(),
            receipt: None,
            notice,
            history_limit,
            attempts,
        };

        if let Some(mode) = default_mode {
            if app.session.phase == Phase::SelectingMode {
                app.select_mode(mode);
            }
        }

        app
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.questions.get(self.cursor)
    }

    pub fn select_mode(&mut self, mode: Mode) {
        self.session.select_mode(mode);
        if self.session.phase == Phase::InProgress {
            self.projection = project(&self.session.questions);
            self.cursor = 0;
            if self.session.mode == Some(Mode::Exam) {
                self.timer = Some(ExamTimer::new(
                    self.session.questions.len(),
                    self.session.started_at.unwrap_or_else(chrono::Local::now),
                ));
            }
        }
    }

    pub fn answer(&mut self, option_index: usize) {
        let Some(question) = self.current_question() else {
            return;
        };
        if option_index >= question.options.len() {
            return;
        }
        let id = question.id.clone();
        self.session.select_answer(&id, option_index);
    }

    pub fn next_question(&mut self) {
        if self.cursor + 1 < self.session.questions.len() {
            self.cursor += 1;
        }
    }

    pub fn prev_question(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Submit whichever mode is running. On success the countdown (if any)
    /// is dropped and the attempt is recorded, best effort.
    pub fn submit(&mut self) {
        let score = match self.session.mode {
            Some(Mode::Exam) => self.session.submit_exam(),
            Some(Mode::Study) => self.session.complete_study(),
            None => None,
        };
        if score.is_some() {
            self.timer = None;
            self.record_attempt();
        }
    }

    fn record_attempt(&mut self) {
        let Some(db) = self.attempts.as_mut() else {
            return;
        };

        let answers: Vec<AnswerEntry> = self
            .session
            .questions
            .iter()
            .filter_map(|q| {
                self.session.get_answer(&q.id).map(|selected_index| AnswerEntry {
                    question_id: q.id.clone(),
                    selected_index,
                })
            })
            .collect();
        let submission = AttemptSubmission {
            quiz_id: self.quiz_id.clone(),
            quiz_title: self.quiz_title.clone(),
            mode: self.session.mode.unwrap_or(Mode::Study),
            answers,
        };

        match db.submit_attempt(&submission, &self.session.questions) {
            Ok(receipt) => self.receipt = Some(receipt),
            Err(e) => self.notice = Some(format!("attempt not saved: {}", e)),
        }
    }

    /// Recurring tick: advances submitted to review and polls the exam clock.
    pub fn on_tick(&mut self) {
        self.session.on_tick();

        let now = chrono::Local::now();
        let fired = self
            .timer
            .as_mut()
            .map(|t| t.poll(now))
            .unwrap_or(false);
        if fired {
            self.submit();
        }
    }

    pub fn open_history(&mut self) {
        if let Some(db) = &self.attempts {
            match db.recent_attempts(self.history_limit) {
                Ok(records) => self.history = records,
                Err(e) => self.notice = Some(format!("history unavailable: {}", e)),
            }
        }
        self.screen = AppScreen::History;
    }

    pub fn retake(&mut self) {
        self.session.reset();
        self.projection = project(&self.session.questions);
        self.cursor = 0;
        self.timer = None;
        self.receipt = None;
        self.notice = None;
    }

    /// Returns false when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return false;
        }

        match self.screen {
            AppScreen::History => match key.code {
                KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc => {
                    self.screen = AppScreen::Quiz;
                    true
                }
                KeyCode::Char('q') => false,
                _ => true,
            },
            AppScreen::Quiz => match self.session.phase {
                Phase::SelectingMode => match key.code {
                    KeyCode::Char('s') => {
                        self.select_mode(Mode::Study);
                        true
                    }
                    KeyCode::Char('e') => {
                        self.select_mode(Mode::Exam);
                        true
                    }
                    KeyCode::Char('h') => {
                        self.open_history();
                        true
                    }
                    KeyCode::Char('q') | KeyCode::Esc => false,
                    _ => true,
                },
                Phase::InProgress => match key.code {
                    KeyCode::Char(c @ '1'..='9') => {
                        self.answer(c as usize - '1' as usize);
                        true
                    }
                    KeyCode::Left | KeyCode::Char('p') => {
                        self.prev_question();
                        true
                    }
                    KeyCode::Right | KeyCode::Char('n') => {
                        self.next_question();
                        true
                    }
                    KeyCode::Enter => {
                        self.submit();
                        true
                    }
                    // quitting mid-attempt is safe: progress is persisted
                    KeyCode::Esc => false,
                    _ => true,
                },
                Phase::Submitted => true,
                Phase::Review => match key.code {
                    KeyCode::Left => {
                        self.prev_question();
                        true
                    }
                    KeyCode::Right => {
                        self.next_question();
                        true
                    }
                    KeyCode::Char('r') => {
                        self.retake();
                        true
                    }
                    KeyCode::Char('h') => {
                        self.open_history();
                        true
                    }
                    KeyCode::Char('q') | KeyCode::Esc => false,
                    _ => true,
                },
            },
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = FileConfigStore::new().load();

    let quiz_dir = cli.quiz_dir.clone().or_else(|| config.quiz_dir.clone());
    let source: Box<dyn QuizSource> = match &quiz_dir {
        Some(dir) => Box::new(DirQuizSource::new(dir)),
        None => Box::new(BundledQuizSource),
    };

    if cli.list {
        for id in source.list() {
            println!("{}", id);
        }
        return Ok(());
    }

    let quiz_id = match cli.quiz.clone().or_else(|| source.list().into_iter().next()) {
        Some(id) => id,
        None => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, "no quizzes available")
                .exit();
        }
    };

    let response = source.fetch_questions(&quiz_id)?;
    let validation = validate_questions(&response.questions);
    if !validation.is_valid {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::ValueValidation,
            format!(
                "quiz '{}' failed validation:\n{}",
                quiz_id,
                validation.errors.join("\n")
            ),
        )
        .exit();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let default_mode = cli.mode.map(|m| m.as_mode()).or(config.default_mode);
    let mut app = App::new(
        &quiz_id,
        &response.title,
        response.questions,
        Some(ProgressStore::file_backed()),
        AttemptsDb::new().ok(),
        cli.fresh,
        default_mode,
        config.history_limit,
    );

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        match runner.step() {
            QuizEvent::Tick => {
                let phase_before = app.session.phase;
                app.on_tick();

                // Redraw when something time-driven is on screen: the exam
                // countdown, or the submitted -> review hop.
                if app.timer.is_some() || app.session.phase != phase_before {
                    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
                }
            }
            QuizEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            QuizEvent::Key(key) => {
                if !app.handle_key(key) {
                    break;
                }
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
        }
    }

    Ok(())
}
