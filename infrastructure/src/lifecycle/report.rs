//! Aggregated results of batch cleanup operations

use std::fmt;

/// One participant that failed during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Transport label or process name
    pub subject: String,
    pub error: String,
}

/// Outcome of closing or terminating a set of resources.
///
/// A batch never fails as a whole: each participant's error is recorded and
/// the remaining participants still run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Another sequence was already running; nothing was attempted.
    pub skipped: bool,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Default::default()
        }
    }

    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, subject: impl Into<String>, error: impl fmt::Display) {
        self.failures.push(BatchFailure {
            subject: subject.into(),
            error: error.to_string(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            return write!(f, "skipped (already in progress)");
        }
        write!(f, "{}/{} succeeded", self.succeeded, self.attempted)?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        Ok(())
    }
}

/// Outcome of a full shutdown: transports first, then processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub skipped: bool,
    pub transports: BatchReport,
    pub processes: BatchReport,
}

impl ShutdownReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchFailure> {
        self.transports.failures.iter().chain(&self.processes.failures)
    }
}
