// src/supervisor/observer.rs

//! Outward notification channels of a run.
//!
//! A run talks to exactly one observer, sequentially, from the run's own
//! Tokio task. Calls arrive in the order the child produced its output; the
//! last call of a run that was not stopped is always `on_finished`.

use tokio::sync::mpsc;

pub trait RunObserver: Send + 'static {
    /// One line of combined child output, or a diagnostic produced by the
    /// supervisor itself.
    fn on_output(&mut self, line: &str);

    /// Completion percentage, 0..=100.
    fn on_progress(&mut self, percentage: u32);

    /// Estimated seconds left, never negative.
    fn on_time_remaining(&mut self, seconds: f64);

    /// Emitted once, as the final notification.
    fn on_finished(&mut self);
}

/// Observer notifications as values.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Output(String),
    Progress(u32),
    TimeRemaining(f64),
    Finished,
}

/// Observer that forwards every notification as a [`RunEvent`] over an
/// unbounded channel. Sends never block the run; if the receiver is gone
/// the events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }
}

impl RunObserver for ChannelObserver {
    fn on_output(&mut self, line: &str) {
        self.send(RunEvent::Output(line.to_string()));
    }

    fn on_progress(&mut self, percentage: u32) {
        self.send(RunEvent::Progress(percentage));
    }

    fn on_time_remaining(&mut self, seconds: f64) {
        self.send(RunEvent::TimeRemaining(seconds));
    }

    fn on_finished(&mut self) {
        self.send(RunEvent::Finished);
    }
}
