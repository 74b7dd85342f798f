use crate::api::{grade, ApiError, AttemptReceipt, AttemptSink, AttemptSubmission};
use crate::app_dirs::AppDirs;
use crate::question::Question;
use chrono::{DateTime, Local, Utc};
use rand::Rng;
use rusqlite::{params, Connection, Result};
use std::path::PathBuf;

/// One finished attempt as stored in the history table.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub mode: String,
    pub score: f64,
    pub total_questions: usize,
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub result: String,
    pub timestamp: DateTime<Local>,
}

/// Database manager for the attempt history
#[derive(Debug)]
pub struct AttemptsDb {
    conn: Connection,
}

impl AttemptsDb {
    /// Initialize the database connection and create tables if needed
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("quizzr_attempts.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        Ok(AttemptsDb { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attempt_id TEXT NOT NULL,
                quiz_id TEXT NOT NULL,
                quiz_title TEXT NOT NULL,
                mode TEXT NOT NULL,
                score REAL NOT NULL,
                total_questions INTEGER NOT NULL,
                attempted INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                incorrect INTEGER NOT NULL,
                result TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attempts_quiz_id ON attempts(quiz_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attempts_timestamp ON attempts(timestamp)",
            [],
        )?;

        Ok(())
    }

    /// Most recent attempts, newest first. Timestamps are written as UTC
    /// RFC3339, so their text order matches their instant order; the row id
    /// breaks ties within the same instant.
    pub fn recent_attempts(&self, limit: usize) -> Result<Vec<AttemptRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT attempt_id, quiz_id, quiz_title, mode, score,
                   total_questions, attempted, correct, incorrect, result, timestamp
            FROM attempts
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let record_iter = stmt.query_map([limit as i64], |row| {
            let timestamp_str: String = row.get(10)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        10,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(AttemptRecord {
                attempt_id: row.get(0)?,
                quiz_id: row.get(1)?,
                quiz_title: row.get(2)?,
                mode: row.get(3)?,
                score: row.get(4)?,
                total_questions: row.get::<_, i64>(5)? as usize,
                attempted: row.get::<_, i64>(6)? as usize,
                correct: row.get::<_, i64>(7)? as usize,
                incorrect: row.get::<_, i64>(8)? as usize,
                result: row.get(9)?,
                timestamp,
            })
        })?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(records)
    }

    /// Clear all attempts (for testing or reset purposes)
    pub fn clear_all_attempts(&self) -> Result<()> {
        self.conn.execute("DELETE FROM attempts", [])?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(AttemptsDb { conn })
    }
}

fn new_attempt_id() -> String {
    let timestamp = Local::now().timestamp_millis();
    let noise: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("attempt-{}-{:06}", timestamp, noise)
}

impl AttemptSink for AttemptsDb {
    fn submit_attempt(
        &mut self,
        submission: &AttemptSubmission,
        questions: &[Question],
    ) -> std::result::Result<AttemptReceipt, ApiError> {
        let (score, correct, incorrect, result) = grade(&submission.answers, questions);
        let receipt = AttemptReceipt {
            attempt_id: new_attempt_id(),
            saved: true,
            score,
            total_questions: questions.len(),
            attempted: submission.answers.len(),
            correct,
            incorrect,
            result,
        };

        self.conn.execute(
            r#"
            INSERT INTO attempts
            (attempt_id, quiz_id, quiz_title, mode, score,
             total_questions, attempted, correct, incorrect, result, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                receipt.attempt_id,
                submission.quiz_id,
                submission.quiz_title,
                submission.mode.to_string().to_lowercase(),
                receipt.score,
                receipt.total_questions as i64,
                receipt.attempted as i64,
                receipt.correct as i64,
                receipt.incorrect as i64,
                receipt.result,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AnswerEntry;
    use crate::question::sample_question;
    use crate::session::Mode;

    fn create_test_db() -> AttemptsDb {
        AttemptsDb::in_memory().unwrap()
    }

    fn submission(answers: Vec<AnswerEntry>) -> AttemptSubmission {
        AttemptSubmission {
            quiz_id: "demo".to_string(),
            quiz_title: "Demo Quiz".to_string(),
            mode: Mode::Exam,
            answers,
        }
    }

    #[test]
    fn record_and_list_attempt() {
        let mut db = create_test_db();
        let questions = vec![sample_question("q1", 0), sample_question("q2", 1)];
        let answers = vec![AnswerEntry {
            question_id: "q1".to_string(),
            selected_index: 0,
        }];

        let receipt = db.submit_attempt(&submission(answers), &questions).unwrap();
        assert!(receipt.saved);
        assert!(receipt.attempt_id.starts_with("attempt-"));
        assert_eq!(receipt.score, 1.0);
        assert_eq!(receipt.total_questions, 2);
        assert_eq!(receipt.attempted, 1);
        assert_eq!(receipt.correct, 1);
        assert_eq!(receipt.incorrect, 0);
        assert_eq!(receipt.result, "Pass");

        let records = db.recent_attempts(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attempt_id, receipt.attempt_id);
        assert_eq!(records[0].quiz_id, "demo");
        assert_eq!(records[0].mode, "exam");
        assert_eq!(records[0].result, "Pass");
    }

    #[test]
    fn partial_submission_counts_only_recorded_answers() {
        let mut db = create_test_db();
        let questions = vec![
            sample_question("q1", 0),
            sample_question("q2", 1),
            sample_question("q3", 2),
        ];
        let answers = vec![
            AnswerEntry {
                question_id: "q1".to_string(),
                selected_index: 3,
            },
            AnswerEntry {
                question_id: "q3".to_string(),
                selected_index: 2,
            },
        ];

        let receipt = db.submit_attempt(&submission(answers), &questions).unwrap();
        assert_eq!(receipt.attempted, 2);
        assert_eq!(receipt.correct, 1);
        assert_eq!(receipt.incorrect, 1);
        assert_eq!(receipt.score, 0.75);
        assert_eq!(receipt.result, "Fail"); // 1/3 correct
    }

    #[test]
    fn recent_attempts_respects_limit() {
        let mut db = create_test_db();
        let questions = vec![sample_question("q1", 0)];

        for _ in 0..5 {
            db.submit_attempt(&submission(Vec::new()), &questions).unwrap();
        }

        assert_eq!(db.recent_attempts(3).unwrap().len(), 3);
        assert_eq!(db.recent_attempts(10).unwrap().len(), 5);
    }

    #[test]
    fn timestamps_are_stored_as_utc_instants() {
        let mut db = create_test_db();
        let questions = vec![sample_question("q1", 0)];
        db.submit_attempt(&submission(Vec::new()), &questions).unwrap();

        // a uniform UTC offset keeps the text sort equal to the instant sort
        let raw: String = db
            .conn
            .query_row("SELECT timestamp FROM attempts", [], |row| row.get(0))
            .unwrap();
        assert!(raw.ends_with("+00:00"), "timestamp {:?} is not UTC", raw);

        let records = db.recent_attempts(10).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].timestamp <= Local::now());
    }

    #[test]
    fn attempt_ids_are_unique() {
        let mut db = create_test_db();
        let questions = vec![sample_question("q1", 0)];
        let a = db.submit_attempt(&submission(Vec::new()), &questions).unwrap();
        let b = db.submit_attempt(&submission(Vec::new()), &questions).unwrap();
        assert_ne!(a.attempt_id, b.attempt_id);
    }

    #[test]
    fn clear_all_attempts_empties_the_table() {
        let mut db = create_test_db();
        let questions = vec![sample_question("q1", 0)];
        db.submit_attempt(&submission(Vec::new()), &questions).unwrap();
        db.clear_all_attempts().unwrap();
        assert!(db.recent_attempts(10).unwrap().is_empty());
    }
}
