use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget, Wrap},
};
use time_humanize::{Accuracy, HumanTime, Tense};
use unicode_width::UnicodeWidthStr;

use crate::grouping::Entry;
use crate::session::{Mode, Phase};
use crate::{App, AppScreen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            AppScreen::History => render_history(self, area, buf),
            AppScreen::Quiz => match self.session.phase {
                Phase::SelectingMode => render_mode_select(self, area, buf),
                Phase::InProgress => render_question(self, area, buf),
                Phase::Submitted => render_scoring(self, area, buf),
                Phase::Review => render_question(self, area, buf),
            },
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn render_mode_select(app: &App, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![
        Line::from(Span::styled(app.quiz_title.clone(), bold())),
        Line::from(Span::styled(
            format!("{} questions", app.session.questions.len()),
            dim(),
        )),
        Line::default(),
        Line::from(vec![
            Span::styled("(s)", bold().fg(Color::Green)),
            Span::raw(" study mode    "),
            Span::styled("(e)", bold().fg(Color::Magenta)),
            Span::raw(" exam mode"),
        ]),
        Line::from(vec![
            Span::styled("(h)", dim()),
            Span::raw(" history    "),
            Span::styled("(q)", dim()),
            Span::raw(" quit"),
        ]),
    ];

    if let Some(notice) = &app.notice {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
    }

    let top_pad = (area.height.saturating_sub(lines.len() as u16)) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([Constraint::Length(top_pad), Constraint::Min(1)])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

fn render_scoring(_app: &App, area: Rect, buf: &mut Buffer) {
    // Transient: the next tick moves submitted on to review.
    Paragraph::new(Span::styled("Scoring...", dim().patch(bold())))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_question(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(question) = app.current_question() else {
        return;
    };
    let label = app
        .projection
        .labels
        .get(app.cursor)
        .cloned()
        .unwrap_or_default();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);

    // Shared passage text, shown only for grouped questions.
    let context = match app
        .projection
        .entry_of(app.cursor)
        .map(|i| &app.projection.entries[i])
    {
        Some(Entry::Group {
            context: Some(text), ..
        }) => Some(text.clone()),
        _ => None,
    };
    let context_lines = context
        .as_deref()
        .map(|text| ((text.width() as f64 / max_chars_per_line as f64).ceil() as u16 + 1).max(2))
        .unwrap_or(0);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),             // header
            Constraint::Length(1),             // padding
            Constraint::Length(context_lines), // passage
            Constraint::Min(4),                // question + options + feedback
            Constraint::Length(1),             // navigator
            Constraint::Length(1),             // footer
        ])
        .split(area);

    render_header(app, chunks[0], buf);

    if let Some(text) = context {
        Paragraph::new(Span::styled(text, Style::default().fg(Color::Cyan)))
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);
    }

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!("{}. {}", label, question.prompt),
        bold(),
    )));
    lines.push(Line::default());

    let selected = app.session.get_answer(&question.id);
    let show_feedback = app.session.should_show_feedback(&question.id);

    for (index, option) in question.options.iter().enumerate() {
        let marker = if selected == Some(index) { "▸" } else { " " };
        let mut style = Style::default();
        if show_feedback {
            if question.is_correct(index) {
                style = style.fg(Color::Green).patch(bold());
            } else if selected == Some(index) {
                style = style.fg(Color::Red).patch(bold());
            } else {
                style = dim();
            }
        } else if selected == Some(index) {
            style = bold().fg(Color::Yellow);
        }
        lines.push(Line::from(Span::styled(
            format!("{} ({}) {}", marker, index + 1, option),
            style,
        )));
    }

    if show_feedback {
        lines.push(Line::default());
        match app.session.is_answer_correct(&question.id) {
            Some(true) => lines.push(Line::from(Span::styled(
                "Correct",
                bold().fg(Color::Green),
            ))),
            Some(false) => lines.push(Line::from(Span::styled(
                "Incorrect",
                bold().fg(Color::Red),
            ))),
            None => lines.push(Line::from(Span::styled("Not answered", dim()))),
        }
        if app.session.should_show_explanation(&question.id)
            && !question.explanation.content.is_empty()
        {
            lines.push(Line::from(Span::styled(
                question.explanation.content.clone(),
                Style::default()
                    .add_modifier(Modifier::ITALIC)
                    .fg(Color::Gray),
            )));
        }
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    render_navigator(app, chunks[4], buf);
    render_footer(app, chunks[5], buf);
}

fn render_header(app: &App, area: Rect, buf: &mut Buffer) {
    let left = Span::styled(app.quiz_title.clone(), bold());

    let right = if app.session.phase == Phase::Review {
        let score = app.session.score.unwrap_or(0.0);
        let total: f64 = app.session.questions.iter().map(|q| q.mark).sum();
        let verdict = app
            .receipt
            .as_ref()
            .map(|r| format!("  {}", r.result))
            .unwrap_or_default();
        Span::styled(format!("score {:.2} / {:.0}{}", score, total, verdict), bold())
    } else if let Some(timer) = &app.timer {
        Span::styled(
            timer.display(chrono::Local::now()),
            bold().fg(Color::Magenta),
        )
    } else {
        Span::styled(
            app.session
                .mode
                .map(|m| m.to_string().to_lowercase())
                .unwrap_or_default(),
            dim(),
        )
    };

    // left-aligned title, right-aligned status on the same row
    let pad = area
        .width
        .saturating_sub((left.width() + right.width()) as u16);
    Paragraph::new(Line::from(vec![
        left,
        Span::raw(" ".repeat(pad as usize)),
        right,
    ]))
    .render(area, buf);
}

/// One span per question label: answered green, current inverted, rest dim.
/// Once feedback is visible the answered color splits into correct/incorrect.
fn render_navigator(app: &App, area: Rect, buf: &mut Buffer) {
    let mut spans: Vec<Span> = Vec::new();
    for (index, label) in app.projection.labels.iter().enumerate() {
        let question = &app.session.questions[index];
        let answered = app.session.get_answer(&question.id).is_some();

        let mut style = if answered && app.session.should_show_feedback(&question.id) {
            match app.session.is_answer_correct(&question.id) {
                Some(true) => Style::default().fg(Color::Green),
                _ => Style::default().fg(Color::Red),
            }
        } else if answered {
            Style::default().fg(Color::Green)
        } else {
            dim()
        };
        if index == app.cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(format!(" {} ", label), style));
    }
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_footer(app: &App, area: Rect, buf: &mut Buffer) {
    let keys = match app.session.phase {
        Phase::InProgress => match app.session.mode {
            Some(Mode::Exam) => "(1-9) answer  (←/→) move  (enter) submit  (esc) quit",
            _ => "(1-9) answer  (←/→) move  (enter) finish  (esc) quit",
        },
        Phase::Review => "(←/→) move  (r) retake  (h) history  (q) quit",
        _ => "",
    };
    Paragraph::new(Span::styled(keys, dim().add_modifier(Modifier::ITALIC)))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_history(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(0),    // table
            Constraint::Length(3), // instructions
        ])
        .split(area);

    let title = Paragraph::new("Attempt History")
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    title.render(chunks[0], buf);

    if app.history.is_empty() {
        let no_data = Paragraph::new("No attempts recorded yet.\nFinish a quiz to see it here!")
            .block(Block::default().borders(Borders::ALL).title("No Data"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        no_data.render(chunks[1], buf);
    } else {
        let header = Row::new(vec![
            Cell::from("When"),
            Cell::from("Quiz"),
            Cell::from("Mode"),
            Cell::from("Score"),
            Cell::from("Correct"),
            Cell::from("Result"),
        ])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

        let now = chrono::Local::now();
        let rows: Vec<Row> = app
            .history
            .iter()
            .map(|record| {
                let elapsed = (now - record.timestamp).to_std().unwrap_or_default();
                let when = HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past);
                let result_style = if record.result == "Pass" {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                };
                Row::new(vec![
                    Cell::from(when),
                    Cell::from(record.quiz_title.clone()),
                    Cell::from(record.mode.clone()),
                    Cell::from(format!("{:.2}", record.score)),
                    Cell::from(format!("{}/{}", record.correct, record.total_questions)),
                    Cell::from(record.result.clone()).style(result_style),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            &[
                Constraint::Length(20),
                Constraint::Min(16),
                Constraint::Length(7),
                Constraint::Length(8),
                Constraint::Length(9),
                Constraint::Length(8),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Attempts"));

        Widget::render(table, chunks[1], buf);
    }

    let instructions = Paragraph::new("(b)ack (q)uit")
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center);
    instructions.render(chunks[2], buf);
}
