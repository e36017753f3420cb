use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a runner. Only `New -> Running -> Terminated` is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    New,
    Running,
    Terminated,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::New => "new",
            RunState::Running => "running",
            RunState::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

/// How a task body ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Failed(String),
    Panicked(String),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => f.write_str("completed"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
            Outcome::Panicked(message) => write!(f, "panicked: {message}"),
        }
    }
}
