use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;

/// A job handed to a spawner: the runner's wrapper around the task body.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to spawn thread `{name}`: {source}")]
    Thread {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("no tokio runtime is running on this thread")]
    NoRuntime,
}

/// Decides where a job runs. Every implementation must run the job on a
/// thread other than the caller's and must not wait for it.
pub trait Spawner: Send + Sync {
    fn spawn(&self, name: &str, job: Job) -> Result<(), SpawnError>;
}

/// One dedicated, named OS thread per job. The join handle is dropped so the
/// thread is detached.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawner;

impl Spawner for ThreadSpawner {
    fn spawn(&self, name: &str, job: Job) -> Result<(), SpawnError> {
        thread::Builder::new()
            .name(name.to_string())
            .spawn(job)
            .map(drop)
            .map_err(|source| SpawnError::Thread {
                name: name.to_string(),
                source,
            })
    }
}

/// Runs jobs on a tokio runtime's blocking pool.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running inside.
    pub fn current() -> Result<Self, SpawnError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SpawnError::NoRuntime)
    }
}

impl Spawner for TokioSpawner {
    fn spawn(&self, _name: &str, job: Job) -> Result<(), SpawnError> {
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}

/// Scheduler choice as it appears in config and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scheduler {
    #[default]
    Thread,
    Tokio,
}

impl Scheduler {
    pub fn spawner(self) -> Result<Arc<dyn Spawner>, SpawnError> {
        match self {
            Scheduler::Thread => Ok(Arc::new(ThreadSpawner)),
            Scheduler::Tokio => Ok(Arc::new(TokioSpawner::current()?)),
        }
    }
}

impl fmt::Display for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheduler::Thread => f.write_str("thread"),
            Scheduler::Tokio => f.write_str("tokio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scheduler `{0}`, expected `thread` or `tokio`")]
pub struct ParseSchedulerError(pub String);

impl FromStr for Scheduler {
    type Err = ParseSchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thread" => Ok(Scheduler::Thread),
            "tokio" => Ok(Scheduler::Tokio),
            _ => Err(ParseSchedulerError(s.to_string())),
        }
    }
}
