use crate::question::{Question, QuizResponse};
use crate::session::{Mode, NEGATIVE_MARK_RATE};
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Compiled-in sample quizzes so the binary works out of the box.
static BUNDLED_QUIZZES: Dir = include_dir!("quizzes");

/// Quiz ids travel into file names and storage keys, so they are restricted
/// to a safe alphabet and a sane length.
pub const MAX_QUIZ_ID_LEN: usize = 100;

/// Fraction of questions that must be correct for a Pass result.
pub const PASS_THRESHOLD: f64 = 0.4;

#[derive(Debug)]
pub enum ApiError {
    InvalidQuizId(String),
    QuizNotFound(String),
    NoQuestions(String),
    Io(io::Error),
    Malformed(serde_json::Error),
    Storage(rusqlite::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidQuizId(reason) => write!(f, "invalid quiz id: {}", reason),
            ApiError::QuizNotFound(id) => write!(f, "quiz not found: {}", id),
            ApiError::NoQuestions(id) => write!(f, "quiz {} has no questions", id),
            ApiError::Io(e) => write!(f, "i/o error: {}", e),
            ApiError::Malformed(e) => write!(f, "malformed quiz file: {}", e),
            ApiError::Storage(e) => write!(f, "attempt storage error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Io(e) => Some(e),
            ApiError::Malformed(e) => Some(e),
            ApiError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ApiError {
    fn from(e: io::Error) -> Self {
        ApiError::Io(e)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Malformed(e)
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Storage(e)
    }
}

/// Accepts alphanumerics plus hyphen, underscore, and dot, up to 100 chars.
pub fn validate_quiz_id(quiz_id: &str) -> Result<(), ApiError> {
    let trimmed = quiz_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidQuizId("must not be empty".to_string()));
    }
    if trimmed.len() > MAX_QUIZ_ID_LEN {
        return Err(ApiError::InvalidQuizId(format!(
            "must be at most {} characters",
            MAX_QUIZ_ID_LEN
        )));
    }
    if let Some(bad) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ApiError::InvalidQuizId(format!(
            "character {:?} is not allowed",
            bad
        )));
    }
    Ok(())
}

/// Inbound question-fetch contract.
pub trait QuizSource {
    fn fetch_questions(&self, quiz_id: &str) -> Result<QuizResponse, ApiError>;
    /// Available quiz ids, for `--list` and the picker.
    fn list(&self) -> Vec<String>;
}

fn parse_quiz(quiz_id: &str, raw: &str) -> Result<QuizResponse, ApiError> {
    let mut response: QuizResponse = serde_json::from_str(raw)?;
    if response.questions.is_empty() {
        return Err(ApiError::NoQuestions(quiz_id.to_string()));
    }
    for question in &mut response.questions {
        question.explanation = std::mem::take(&mut question.explanation).truncated();
    }
    Ok(response)
}

/// Reads `<dir>/<quiz-id>.json` documents.
#[derive(Debug, Clone)]
pub struct DirQuizSource {
    dir: PathBuf,
}

impl DirQuizSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl QuizSource for DirQuizSource {
    fn fetch_questions(&self, quiz_id: &str) -> Result<QuizResponse, ApiError> {
        validate_quiz_id(quiz_id)?;
        let path = self.dir.join(format!("{}.json", quiz_id.trim()));
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ApiError::QuizNotFound(quiz_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        parse_quiz(quiz_id, &raw)
    }

    fn list(&self) -> Vec<String> {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| {
                        let path = entry.path();
                        if path.extension().and_then(|e| e.to_str()) == Some("json") {
                            path.file_stem()
                                .and_then(|s| s.to_str())
                                .map(str::to_string)
                        } else {
                            None
                        }
                    })
                    .sorted()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Serves the quizzes compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledQuizSource;

impl QuizSource for BundledQuizSource {
    fn fetch_questions(&self, quiz_id: &str) -> Result<QuizResponse, ApiError> {
        validate_quiz_id(quiz_id)?;
        let file = BUNDLED_QUIZZES
            .get_file(format!("{}.json", quiz_id.trim()))
            .ok_or_else(|| ApiError::QuizNotFound(quiz_id.to_string()))?;
        let raw = file
            .contents_utf8()
            .ok_or_else(|| ApiError::QuizNotFound(quiz_id.to_string()))?;
        parse_quiz(quiz_id, raw)
    }

    fn list(&self) -> Vec<String> {
        BUNDLED_QUIZZES
            .files()
            .filter_map(|f| {
                let path = f.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
                } else {
                    None
                }
            })
            .sorted()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: String,
    pub selected_index: usize,
}

/// Outbound attempt-submission request: only recorded answers are included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSubmission {
    pub quiz_id: String,
    pub quiz_title: String,
    pub mode: Mode,
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReceipt {
    pub attempt_id: String,
    pub saved: bool,
    pub score: f64,
    pub total_questions: usize,
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub result: String,
}

/// Attempt-record sink. Best-effort from the caller's point of view: the
/// session has already moved to review on local scoring before this runs,
/// and a failure never rolls that back.
pub trait AttemptSink {
    fn submit_attempt(
        &mut self,
        submission: &AttemptSubmission,
        questions: &[Question],
    ) -> Result<AttemptReceipt, ApiError>;
}

/// Grade a submission against the question set the way the attempt store
/// records it: mark-weighted, 25% negative marking, Pass at 40% correct.
pub fn grade(answers: &[AnswerEntry], questions: &[Question]) -> (f64, usize, usize, String) {
    let mut score = 0.0;
    let mut correct = 0;
    let mut incorrect = 0;

    for answer in answers {
        let Some(question) = questions.iter().find(|q| q.id == answer.question_id) else {
            continue;
        };
        if question.is_correct(answer.selected_index) {
            score += question.mark;
            correct += 1;
        } else {
            score -= question.mark * NEGATIVE_MARK_RATE;
            incorrect += 1;
        }
    }

    let result = if !questions.is_empty()
        && correct as f64 / questions.len() as f64 >= PASS_THRESHOLD
    {
        "Pass"
    } else {
        "Fail"
    };

    (score, correct, incorrect, result.to_string())
}
