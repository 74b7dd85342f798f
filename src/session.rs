use crate::persist::{ProgressStore, Snapshot};
use crate::question::Question;
use crate::shuffle::shuffle_questions;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Penalty applied to a wrong answer, as a fraction of the question's mark.
/// Lighter than the reward for a correct answer so guessing is discouraged
/// without being punitive.
pub const NEGATIVE_MARK_RATE: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Study,
    Exam,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    SelectingMode,
    InProgress,
    Submitted,
    Review,
}

/// One attempt at a single quiz: mode selection, answer capture, scoring,
/// submission, review.
///
/// All transitions are synchronous state replacements; invalid calls (submit
/// while not in progress, mode change after lock) are silent no-ops rather
/// than errors. In-progress state is snapshotted to the progress store after
/// every mutation so a reload can resume the attempt.
#[derive(Debug)]
pub struct Session {
    quiz_id: Option<String>,
    pub mode: Option<Mode>,
    pub phase: Phase,
    pub questions: Vec<Question>,
    original_questions: Vec<Question>,
    answers: HashMap<String, usize>,
    pub score: Option<f64>,
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
    mode_locked: bool,
    progress: Option<ProgressStore>,
    /// True when this session resumed an in-progress attempt from storage.
    pub restored: bool,
}

impl Session {
    /// Initialize a session for a loaded question set.
    ///
    /// When a progress store and quiz id are given, the stored slot is
    /// consulted exactly once and, if it holds a readable in-progress
    /// snapshot, re-establishes the attempt (mode, answers, shuffled order,
    /// timestamps, lock). Restore failures degrade silently to a fresh
    /// selecting-mode session. With `force_new` the slot is cleared first so
    /// a stale snapshot can never leak into an attempt the caller intends to
    /// be brand new.
    pub fn new(
        questions: Vec<Question>,
        quiz_id: Option<&str>,
        progress: Option<ProgressStore>,
        force_new: bool,
    ) -> Self {
        let mut session = Self {
            quiz_id: quiz_id.map(str::to_string),
            mode: None,
            phase: Phase::SelectingMode,
            questions: questions.clone(),
            original_questions: questions,
            answers: HashMap::new(),
            score: None,
            started_at: None,
            ended_at: None,
            mode_locked: false,
            progress,
            restored: false,
        };

        if force_new {
            session.clear_progress();
            return session;
        }

        if let (Some(id), Some(store)) = (&session.quiz_id, &session.progress) {
            if let Some(snapshot) = store.load(id) {
                if snapshot.phase == Phase::InProgress {
                    session.mode = snapshot.mode;
                    session.phase = Phase::InProgress;
                    session.answers = snapshot.answers;
                    session.started_at = snapshot.start_time;
                    session.ended_at = snapshot.end_time;
                    session.mode_locked = snapshot.is_mode_locked;
                    if !snapshot.questions.is_empty() {
                        // keep the shuffled order the attempt started with
                        session.questions = snapshot.questions;
                    }
                    session.restored = true;
                }
            }
        }

        session
    }

    /// Commit to study or exam mode and start the attempt.
    ///
    /// No-op once the mode is locked (a restored exam cannot be switched) or
    /// outside the selecting-mode phase. Exam mode shuffles a copy of the
    /// original order; study mode always runs in original order.
    pub fn select_mode(&mut self, mode: Mode) {
        if self.phase != Phase::SelectingMode || self.mode_locked {
            return;
        }

        self.mode = Some(mode);
        self.questions = match mode {
            Mode::Exam => shuffle_questions(&self.original_questions),
            Mode::Study => self.original_questions.clone(),
        };
        self.started_at = Some(Local::now());
        self.phase = Phase::InProgress;
        self.persist();
    }

    /// Record (or overwrite) an answer. Locks the mode on every call: the
    /// instant any answer exists, the mode commitment is irreversible.
    pub fn select_answer(&mut self, question_id: &str, option_index: usize) {
        if self.phase != Phase::InProgress {
            return;
        }

        self.answers.insert(question_id.to_string(), option_index);
        self.mode_locked = true;
        self.persist();
    }

    /// Score and submit an exam attempt. Partial submission is allowed:
    /// unanswered questions simply contribute zero. Idempotent once the
    /// phase leaves in-progress, so a timer/manual submit race settles on
    /// whichever ran first.
    pub fn submit_exam(&mut self) -> Option<f64> {
        if self.phase != Phase::InProgress || self.mode != Some(Mode::Exam) {
            return None;
        }
        Some(self.finish())
    }

    /// Study-mode counterpart of [`Session::submit_exam`], same scoring rule.
    pub fn complete_study(&mut self) -> Option<f64> {
        if self.phase != Phase::InProgress || self.mode != Some(Mode::Study) {
            return None;
        }
        Some(self.finish())
    }

    fn finish(&mut self) -> f64 {
        let score = self.compute_score();
        self.score = Some(score);
        self.ended_at = Some(Local::now());
        self.phase = Phase::Submitted;
        score
    }

    /// Advance the submitted → review transition on the next engine tick.
    pub fn on_tick(&mut self) {
        if self.phase == Phase::Submitted {
            self.phase = Phase::Review;
        }
    }

    /// Back to mode selection with the original question order; the question
    /// set stays loaded. Clears the persisted slot for this quiz.
    pub fn reset(&mut self) {
        self.questions = self.original_questions.clone();
        self.answers.clear();
        self.mode = None;
        self.score = None;
        self.started_at = None;
        self.ended_at = None;
        self.mode_locked = false;
        self.phase = Phase::SelectingMode;
        self.clear_progress();
    }

    /// Fixed scoring rule for both modes: correct adds the question's mark,
    /// incorrect subtracts a quarter of it, unanswered adds nothing. The
    /// total can go negative.
    pub fn compute_score(&self) -> f64 {
        self.questions
            .iter()
            .map(|q| match self.answers.get(&q.id) {
                Some(&selected) if q.is_correct(selected) => q.mark,
                Some(_) => -q.mark * NEGATIVE_MARK_RATE,
                None => 0.0,
            })
            .sum()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn all_answered(&self) -> bool {
        !self.questions.is_empty() && self.answers.len() == self.questions.len()
    }

    pub fn get_answer(&self, question_id: &str) -> Option<usize> {
        self.answers.get(question_id).copied()
    }

    pub fn answers(&self) -> &HashMap<String, usize> {
        &self.answers
    }

    pub fn is_mode_locked(&self) -> bool {
        self.mode_locked
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// None when unanswered or unknown, otherwise whether the recorded
    /// answer matches the key.
    pub fn is_answer_correct(&self, question_id: &str) -> Option<bool> {
        let question = self.question(question_id)?;
        let selected = self.answers.get(question_id)?;
        Some(question.is_correct(*selected))
    }

    /// Study mode reveals feedback per answered question; review reveals all.
    pub fn should_show_feedback(&self, question_id: &str) -> bool {
        if self.mode == Some(Mode::Study) && self.answers.contains_key(question_id) {
            return true;
        }
        self.phase == Phase::Review
    }

    /// Explanations accompany feedback, same visibility rule.
    pub fn should_show_explanation(&self, question_id: &str) -> bool {
        self.should_show_feedback(question_id)
    }

    /// Answers can change any time before submission, in both modes.
    pub fn can_change_answer(&self, _question_id: &str) -> bool {
        self.phase == Phase::InProgress
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            phase: self.phase,
            questions: self.questions.clone(),
            original_questions: self.original_questions.clone(),
            answers: self.answers.clone(),
            start_time: self.started_at,
            end_time: self.ended_at,
            is_mode_locked: self.mode_locked,
        }
    }

    /// Snapshot the attempt, but only while in progress: idle, selecting,
    /// submitted, and review states never survive a reload.
    fn persist(&self) {
        if self.phase != Phase::InProgress {
            return;
        }
        if let (Some(id), Some(store)) = (&self.quiz_id, &self.progress) {
            store.save(id, &self.snapshot());
        }
    }

    fn clear_progress(&self) {
        if let (Some(id), Some(store)) = (&self.quiz_id, &self.progress) {
            store.clear(id);
        }
    }

    #[cfg(test)]
    pub(crate) fn take_progress(&mut self) -> Option<ProgressStore> {
        self.progress.take()
    }

    #[cfg(test)]
    pub(crate) fn progress(&self) -> Option<&ProgressStore> {
        self.progress.as_ref()
    }
}
