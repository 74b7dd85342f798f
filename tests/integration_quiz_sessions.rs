// End-to-end engine tests: validation, mode selection, answering, scoring,
// persistence, and the display projection working together on realistic data.

use quizzr::api::{grade, AnswerEntry};
use quizzr::grouping::project;
use quizzr::persist::{FileStore, ProgressStore};
use quizzr::question::{validate_questions, Explanation, ExplanationFormat, Question};
use quizzr::session::{Mode, Phase, Session};
use quizzr::timer::ExamTimer;

fn question(id: &str, correct_index: usize, mark: f64) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("What is the answer to {}?", id),
        options: vec![
            "first".to_string(),
            "second".to_string(),
            "third".to_string(),
            "fourth".to_string(),
        ],
        correct_index,
        explanation: Explanation {
            format: ExplanationFormat::Text,
            content: format!("the key for {}", id),
        },
        mark,
        context: None,
        group_id: None,
    }
}

fn grouped(id: &str, correct_index: usize, group: &str) -> Question {
    let mut q = question(id, correct_index, 1.0);
    q.group_id = Some(group.to_string());
    q.context = Some(format!("shared passage for {}", group));
    q
}

#[test]
fn exam_with_one_correct_and_one_unanswered_scores_the_single_mark() {
    let questions = vec![question("q1", 0, 1.0), question("q2", 1, 2.0)];
    assert!(validate_questions(&questions).is_valid);

    let mut session = Session::new(questions, None, None, false);
    session.select_mode(Mode::Exam);
    assert_eq!(session.phase, Phase::InProgress);

    // exam mode shuffles options, so read the correct index off the live state
    let correct = session.question("q1").unwrap().correct_index;
    session.select_answer("q1", correct);
    let score = session.submit_exam();
    assert_eq!(score, Some(1.0));
    assert_eq!(session.phase, Phase::Submitted);

    session.on_tick();
    assert_eq!(session.phase, Phase::Review);
    assert!(session.should_show_feedback("q1"));
    assert!(session.should_show_feedback("q2"));
}

#[test]
fn study_session_full_round_with_negative_marking() {
    let questions = vec![
        question("q1", 0, 1.0),
        question("q2", 1, 2.0),
        question("q3", 2, 1.0),
    ];
    let mut session = Session::new(questions, None, None, false);
    session.select_mode(Mode::Study);

    session.select_answer("q1", 0); // +1
    assert!(session.should_show_feedback("q1"));
    assert!(!session.should_show_feedback("q2"));

    session.select_answer("q2", 0); // -0.5
    session.select_answer("q3", 2); // +1

    let score = session.complete_study();
    assert_eq!(score, Some(1.5));
    session.on_tick();
    assert_eq!(session.phase, Phase::Review);
}

#[test]
fn interrupted_exam_resumes_with_order_answers_and_clock() {
    let questions = vec![
        question("q1", 0, 1.0),
        grouped("q2", 1, "g1"),
        grouped("q3", 2, "g1"),
        question("q4", 3, 1.0),
    ];

    let dir = tempfile::tempdir().unwrap();
    let store = || ProgressStore::new(Box::new(FileStore::with_dir(dir.path())));

    let mut first = Session::new(questions.clone(), Some("demo"), Some(store()), false);
    first.select_mode(Mode::Exam);
    first.select_answer("q2", 0);
    let first_order: Vec<String> = first.questions.iter().map(|q| q.id.clone()).collect();
    let started_at = first.started_at.unwrap();
    drop(first); // simulate the process going away mid-attempt

    let resumed = Session::new(questions, Some("demo"), Some(store()), false);
    assert!(resumed.restored);
    assert_eq!(resumed.phase, Phase::InProgress);
    assert_eq!(resumed.mode, Some(Mode::Exam));
    assert!(resumed.is_mode_locked());
    assert_eq!(resumed.get_answer("q2"), Some(0));
    let resumed_order: Vec<String> = resumed.questions.iter().map(|q| q.id.clone()).collect();
    assert_eq!(resumed_order, first_order);
    assert_eq!(resumed.started_at, Some(started_at));

    // a resumed clock counts from the original start, not from the reload
    let timer = ExamTimer::new(resumed.questions.len(), resumed.started_at.unwrap());
    assert_eq!(
        timer.remaining_ms(started_at + chrono::Duration::minutes(1)),
        3 * 60_000
    );
}

#[test]
fn projection_follows_the_shuffled_exam_order() {
    let questions = vec![
        question("q1", 0, 1.0),
        grouped("q2", 1, "g1"),
        grouped("q3", 2, "g1"),
        question("q4", 3, 1.0),
    ];
    let mut session = Session::new(questions, None, None, false);
    session.select_mode(Mode::Exam);

    let projection = project(&session.questions);
    assert_eq!(projection.labels.len(), 4);

    // the passage group stays contiguous, so exactly 3 entries remain
    assert_eq!(projection.entries.len(), 3);
    let positions: Vec<usize> = session
        .questions
        .iter()
        .enumerate()
        .filter(|(_, q)| q.group_id.is_some())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[1], positions[0] + 1);
}

#[test]
fn grading_agrees_with_the_session_score_for_recorded_answers() {
    let questions = vec![
        question("q1", 0, 1.0),
        question("q2", 1, 2.0),
        question("q3", 2, 1.0),
    ];
    let mut session = Session::new(questions, None, None, false);
    session.select_mode(Mode::Exam);
    let right = session.question("q1").unwrap().correct_index;
    session.select_answer("q1", right);
    let q2 = session.question("q2").unwrap();
    let wrong = (q2.correct_index + 1) % q2.options.len();
    session.select_answer("q2", wrong);
    let score = session.submit_exam().unwrap();
    assert_eq!(score, 0.5); // +1 for q1, -0.5 for the two-mark q2

    // grade against the same shuffled state the session scored
    let answers: Vec<AnswerEntry> = session
        .questions
        .iter()
        .filter_map(|q| {
            session.get_answer(&q.id).map(|selected_index| AnswerEntry {
                question_id: q.id.clone(),
                selected_index,
            })
        })
        .collect();
    let (graded_score, correct, incorrect, _result) = grade(&answers, &session.questions);
    assert_eq!(graded_score, score);
    assert_eq!(correct, 1);
    assert_eq!(incorrect, 1);
}

#[test]
fn invalid_question_sets_are_refused_up_front() {
    let mut bad = question("dup", 0, 1.0);
    bad.options = vec!["only".to_string()];
    let questions = vec![bad, question("dup", 5, 1.0)];

    let result = validate_questions(&questions);
    assert!(!result.is_valid);
    // duplicate id, too few options, out-of-range correct index
    assert!(result.errors.len() >= 3);
}
