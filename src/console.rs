// src/console.rs

//! Terminal rendering of a run: the thin shell around the supervisor.

use std::io::Write;

use crate::supervisor::RunObserver;

/// Prints job output to stdout and progress to stderr.
///
/// Progress and remaining time share one status line on stderr that is
/// rewritten in place; it is terminated before any job output is printed.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    percentage: u32,
    remaining: Option<f64>,
    status_visible: bool,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Progress:  42% | Time remaining: 12.3 s`
    pub fn status_line(&self) -> String {
        let remaining = match self.remaining {
            Some(secs) => format!("{secs:.1} s"),
            None => "-- s".to_string(),
        };
        format!("Progress: {:>3}% | Time remaining: {remaining}", self.percentage)
    }

    fn redraw_status(&mut self) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", self.status_line());
        let _ = stderr.flush();
        self.status_visible = true;
    }

    fn clear_status(&mut self) {
        if self.status_visible {
            eprintln!();
            self.status_visible = false;
        }
    }
}

impl RunObserver for ConsoleObserver {
    fn on_output(&mut self, line: &str) {
        self.clear_status();
        println!("{line}");
    }

    fn on_progress(&mut self, percentage: u32) {
        self.percentage = percentage;
        self.redraw_status();
    }

    fn on_time_remaining(&mut self, seconds: f64) {
        self.remaining = Some(seconds);
        self.redraw_status();
    }

    fn on_finished(&mut self) {
        self.clear_status();
        eprintln!("Processing finished.");
    }
}
