use std::sync::{Arc, Mutex};

use mpiwatch::supervisor::{RunEvent, RunObserver};

/// Observer that records every notification in order.
///
/// Clones share the same log, so a test keeps one clone and hands the
/// other to the supervisor.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<RunEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn outputs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::Output(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn remaining(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::TimeRemaining(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn finished_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RunEvent::Finished))
            .count()
    }

    fn push(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RunObserver for RecordingObserver {
    fn on_output(&mut self, line: &str) {
        self.push(RunEvent::Output(line.to_string()));
    }

    fn on_progress(&mut self, percentage: u32) {
        self.push(RunEvent::Progress(percentage));
    }

    fn on_time_remaining(&mut self, seconds: f64) {
        self.push(RunEvent::TimeRemaining(seconds));
    }

    fn on_finished(&mut self) {
        self.push(RunEvent::Finished);
    }
}
