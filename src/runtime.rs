use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppConfig, ConfigError};
use crate::logging::LogSink;
use crate::tasks::thread_creation;
use crate::tasks::{Outcome, RunState, RunnerError, Scheduler, TaskRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub message: String,
    pub count: usize,
    pub scheduler: Scheduler,
    pub wait: Duration,
}

impl RunOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            message: config.task_message(),
            count: 1,
            scheduler: config.scheduler()?,
            wait: config.wait()?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunnerSummary {
    pub id: Uuid,
    pub name: String,
    pub state: RunState,
    pub outcome: Option<Outcome>,
}

impl fmt::Display for RunnerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Some(outcome) => write!(f, "runner {} {outcome}", self.name),
            None => write!(f, "runner {} did not finish ({})", self.name, self.state),
        }
    }
}

#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("runner `{name}` accepted a second start")]
    RestartAccepted { name: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub runners: Vec<RunnerSummary>,
}

impl RunReport {
    pub fn all_completed(&self) -> bool {
        self.runners
            .iter()
            .all(|runner| runner.outcome.as_ref().is_some_and(Outcome::is_completed))
    }

    /// Runners that timed out, failed or panicked.
    pub fn incomplete(&self) -> impl Iterator<Item = &RunnerSummary> {
        self.runners
            .iter()
            .filter(|runner| !runner.outcome.as_ref().is_some_and(Outcome::is_completed))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RestartReport {
    pub runner: RunnerSummary,
    pub rejection: String,
}

fn build_runner(options: &RunOptions, sink: Arc<dyn LogSink>, index: usize) -> Result<TaskRunner, RunnerError> {
    let spawner = options.scheduler.spawner()?;
    let task = thread_creation::task_with_message(sink.clone(), options.message.clone());
    let runner = TaskRunner::new(task, sink).with_spawner(spawner);
    let name = format!("{}-{index}", runner.name());
    Ok(runner.with_name(name))
}

fn summarize(runner: &TaskRunner, outcome: Option<Outcome>) -> RunnerSummary {
    RunnerSummary {
        id: runner.id(),
        name: runner.name().to_string(),
        state: runner.state(),
        outcome,
    }
}

/// Starts `count` demo runners back to back, then waits for each in turn.
pub fn run_demo(options: &RunOptions, sink: Arc<dyn LogSink>) -> Result<RunReport, RunnerError> {
    let runners = (0..options.count)
        .map(|index| build_runner(options, sink.clone(), index))
        .collect::<Result<Vec<_>, _>>()?;

    for runner in &runners {
        runner.start()?;
    }
    tracing::debug!(count = runners.len(), scheduler = %options.scheduler, "runners started");

    let runners = runners
        .iter()
        .map(|runner| {
            let outcome = runner.wait(options.wait);
            if outcome.is_none() {
                tracing::warn!(runner = runner.name(), "runner did not terminate in time");
            }
            summarize(runner, outcome)
        })
        .collect();

    Ok(RunReport { runners })
}

/// Starts one demo runner twice. The second start must be refused.
pub fn restart_demo(options: &RunOptions, sink: Arc<dyn LogSink>) -> Result<RestartReport, DemoError> {
    let runner = build_runner(options, sink, 0)?;
    runner.start()?;

    let rejection = match runner.start() {
        Err(err @ RunnerError::AlreadyStarted { .. }) => err.to_string(),
        Err(err) => return Err(err.into()),
        Ok(()) => {
            return Err(DemoError::RestartAccepted {
                name: runner.name().to_string(),
            });
        }
    };

    let outcome = runner.wait(options.wait);
    Ok(RestartReport {
        runner: summarize(&runner, outcome),
        rejection,
    })
}
