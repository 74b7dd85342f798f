use serde::{Deserialize, Serialize};

/// Explanation bodies are capped so a malformed quiz file cannot blow up the
/// review screen.
pub const MAX_EXPLANATION_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationFormat {
    #[default]
    Markdown,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Explanation {
    #[serde(default)]
    pub format: ExplanationFormat,
    #[serde(default)]
    pub content: String,
}

impl Explanation {
    /// Enforce the content cap without failing the load.
    pub fn truncated(mut self) -> Self {
        if self.content.chars().count() > MAX_EXPLANATION_CHARS {
            self.content = self.content.chars().take(MAX_EXPLANATION_CHARS).collect();
        }
        self
    }
}

fn default_mark() -> f64 {
    1.0
}

/// One assessable item. `options` order is significant: the option index is
/// the answer key, and `correct_index` must stay in bounds through shuffling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: Explanation,
    /// Scoring weight; quizzes that omit it get weight 1.
    #[serde(default = "default_mark")]
    pub mark: f64,
    /// Shared passage text for grouped questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Questions sharing a group id form one passage block and must be
    /// contiguous in source order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl Question {
    pub fn is_correct(&self, selected_index: usize) -> bool {
        selected_index == self.correct_index
    }
}

/// Response shape of the question fetch contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub quiz_id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Structural validation of a question set before a session may start.
///
/// Accumulates every violation instead of stopping at the first one; the
/// caller gets the full list of human-readable messages.
pub fn validate_questions(questions: &[Question]) -> ValidationResult {
    let mut errors = Vec::new();

    if questions.is_empty() {
        errors.push("Quiz must have at least one question".to_string());
    }

    let mut seen_ids = std::collections::HashSet::new();
    for (index, q) in questions.iter().enumerate() {
        if !seen_ids.insert(q.id.as_str()) {
            errors.push(format!("Duplicate question ID: {} at index {}", q.id, index));
        }
    }

    for (index, q) in questions.iter().enumerate() {
        if q.options.len() < 2 {
            errors.push(format!(
                "Question {} ({}): must have at least 2 options",
                index + 1,
                q.id
            ));
        }

        if q.correct_index >= q.options.len() {
            errors.push(format!(
                "Question {} ({}): correctIndex must be within 0..{}, got {}",
                index + 1,
                q.id,
                q.options.len(),
                q.correct_index
            ));
        }

        if q.prompt.trim().is_empty() {
            errors.push(format!(
                "Question {} ({}): question text is required",
                index + 1,
                q.id
            ));
        }

        if q.id.trim().is_empty() {
            errors.push(format!("Question at index {}: ID is required", index));
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
pub(crate) fn sample_question(id: &str, correct_index: usize) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("prompt for {}", id),
        options: vec![
            "option a".into(),
            "option b".into(),
            "option c".into(),
            "option d".into(),
        ],
        correct_index,
        explanation: Explanation {
            format: ExplanationFormat::Text,
            content: format!("because {}", id),
        },
        mark: 1.0,
        context: None,
        group_id: None,
    }
}
