use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Events the quiz loop consumes. `Tick` is never produced by an input
/// source; the runner synthesizes it when input stays quiet for a whole
/// tick interval, which is what advances the exam countdown and the
/// submitted-to-review hop while the user sits still.
#[derive(Clone, Debug)]
pub enum QuizEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Where the runner pulls input from. Production reads crossterm on a
/// background thread; tests push events through a plain channel.
pub trait QuizEventSource {
    /// Wait up to `wait` for input. `None` means nothing arrived (or the
    /// feed shut down), which the runner turns into a tick.
    fn next_event(&self, wait: Duration) -> Option<QuizEvent>;
}

pub struct CrosstermEventSource {
    rx: Receiver<QuizEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || loop {
            let forward = match event::read() {
                Ok(CtEvent::Key(key)) => tx.send(QuizEvent::Key(key)),
                Ok(CtEvent::Resize(..)) => tx.send(QuizEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forward.is_err() {
                break;
            }
        });
        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEventSource for CrosstermEventSource {
    fn next_event(&self, wait: Duration) -> Option<QuizEvent> {
        self.rx.recv_timeout(wait).ok()
    }
}

/// Channel-fed source for driving the loop headlessly.
pub struct TestEventSource {
    rx: Receiver<QuizEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<QuizEvent>) -> Self {
        Self { rx }
    }
}

impl QuizEventSource for TestEventSource {
    fn next_event(&self, wait: Duration) -> Option<QuizEvent> {
        self.rx.recv_timeout(wait).ok()
    }
}

/// Paces the loop at a fixed tick rate: each `step` hands back the next
/// input event, or a `Tick` once the interval passes without one.
pub struct Runner<E: QuizEventSource> {
    events: E,
    tick_every: Duration,
}

impl<E: QuizEventSource> Runner<E> {
    pub fn new(events: E, tick_every: Duration) -> Self {
        Self { events, tick_every }
    }

    pub fn step(&self) -> QuizEvent {
        self.events
            .next_event(self.tick_every)
            .unwrap_or(QuizEvent::Tick)
    }
}
