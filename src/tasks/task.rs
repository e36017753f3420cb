use std::fmt;

use thiserror::Error;

/// Failure reported by a task body that returned instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct TaskFailure {
    reason: String,
}

impl TaskFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A unit of work with no inputs, run once for its side effects.
pub struct Task {
    body: Box<dyn FnOnce() -> Result<(), TaskFailure> + Send>,
}

impl Task {
    /// Wraps a body that can report failure.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() -> Result<(), TaskFailure> + Send + 'static,
    {
        Self {
            body: Box::new(body),
        }
    }

    /// Wraps a body that cannot fail.
    pub fn from_fn<F>(body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(move || {
            body();
            Ok(())
        })
    }

    /// Consumes the task; a task can only ever run once.
    pub fn run(self) -> Result<(), TaskFailure> {
        (self.body)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}
