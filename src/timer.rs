use chrono::{DateTime, Local};

/// Fixed exam time allotment: one minute per question.
pub const MS_PER_QUESTION: i64 = 60_000;

/// Wall-clock countdown that forces submission when the allotted exam
/// duration elapses.
///
/// The timer holds no callback: the owner polls it on the app's recurring
/// tick and, when `poll` reports expiry, invokes whatever the current submit
/// path is. That keeps the "fire the latest submit behavior" requirement
/// trivially true and makes cancellation a matter of dropping the timer when
/// the session leaves exam + in-progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamTimer {
    started_at: DateTime<Local>,
    duration_ms: i64,
    fired: bool,
}

impl ExamTimer {
    /// Start (or resume) a countdown for `question_count` questions. A
    /// restored attempt passes its persisted start time, so time spent
    /// before the reload still counts.
    pub fn new(question_count: usize, started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            duration_ms: question_count as i64 * MS_PER_QUESTION,
            fired: false,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Milliseconds left on the clock; negative once overdue.
    pub fn remaining_ms(&self, now: DateTime<Local>) -> i64 {
        self.duration_ms - (now - self.started_at).num_milliseconds()
    }

    /// True exactly once, on the first poll at or past expiry. Later polls
    /// return false, so a slow consumer can never double-submit through the
    /// timer.
    pub fn poll(&mut self, now: DateTime<Local>) -> bool {
        if self.fired || self.remaining_ms(now) > 0 {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Remaining time formatted as `MM:SS`, clamped at zero.
    pub fn display(&self, now: DateTime<Local>) -> String {
        let secs = (self.remaining_ms(now).max(0) + 999) / 1000;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn duration_is_one_minute_per_question() {
        let timer = ExamTimer::new(5, Local::now());
        assert_eq!(timer.duration_ms(), 5 * 60_000);
    }

    #[test]
    fn remaining_counts_down_with_wall_clock() {
        let start = Local::now();
        let timer = ExamTimer::new(2, start);
        assert_eq!(timer.remaining_ms(start), 120_000);
        assert_eq!(timer.remaining_ms(start + Duration::seconds(30)), 90_000);
        assert_eq!(timer.remaining_ms(start + Duration::seconds(130)), -10_000);
    }

    #[test]
    fn fires_exactly_once() {
        let start = Local::now();
        let mut timer = ExamTimer::new(1, start);

        assert!(!timer.poll(start + Duration::milliseconds(59_999)));
        assert!(!timer.has_fired());

        assert!(timer.poll(start + Duration::milliseconds(60_000)));
        assert!(timer.has_fired());

        // repeated polls past expiry stay quiet
        for extra in 1..10 {
            assert!(!timer.poll(start + Duration::milliseconds(60_000 + extra * 1000)));
        }
    }

    #[test]
    fn resumed_timer_accounts_for_elapsed_time() {
        let started_long_ago = Local::now() - Duration::minutes(3);
        let mut timer = ExamTimer::new(2, started_long_ago);
        // 2-minute allotment started 3 minutes ago: already overdue
        assert!(timer.poll(Local::now()));
    }

    #[test]
    fn display_clamps_at_zero() {
        let start = Local::now();
        let timer = ExamTimer::new(1, start);
        assert_eq!(timer.display(start), "01:00");
        assert_eq!(timer.display(start + Duration::seconds(30)), "00:30");
        assert_eq!(timer.display(start + Duration::seconds(90)), "00:00");
    }
}
