use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::logging::{LogSink, Severity};
use crate::tasks::spawner::{Job, SpawnError, Spawner, ThreadSpawner};
use crate::tasks::state::{Outcome, RunState};
use crate::tasks::task::Task;

const COMPONENT: &str = "task_runner";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("runner `{name}` cannot be started again (state: {state})")]
    AlreadyStarted { name: String, state: RunState },
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

enum Stage {
    New(Task),
    Running,
    Terminated(Outcome),
}

impl Stage {
    fn state(&self) -> RunState {
        match self {
            Stage::New(_) => RunState::New,
            Stage::Running => RunState::Running,
            Stage::Terminated(_) => RunState::Terminated,
        }
    }
}

struct Shared {
    stage: Mutex<Stage>,
    terminated: Condvar,
    released: Mutex<bool>,
    release: Condvar,
}

impl Shared {
    fn new(task: Task) -> Self {
        Self {
            stage: Mutex::new(Stage::New(task)),
            terminated: Condvar::new(),
            released: Mutex::new(false),
            release: Condvar::new(),
        }
    }

    // Nothing panics while the lock is held, so a poisoned lock still holds
    // a consistent stage.
    fn lock(&self) -> MutexGuard<'_, Stage> {
        self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, outcome: Outcome) {
        *self.lock() = Stage::Terminated(outcome);
        self.terminated.notify_all();
    }

    fn release(&self) {
        *self.released.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.release.notify_all();
    }

    fn wait_for_release(&self) {
        let released = self.released.lock().unwrap_or_else(PoisonError::into_inner);
        let _released = self
            .release
            .wait_while(released, |released| !*released)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

pub(crate) const DROPPED_BEFORE_RUNNING: &str = "job dropped before running";

/// Travels with the job and terminates the runner when dropped.
///
/// Dropped without an outcome means the spawner discarded the job, so the
/// runner ends `Failed`. With an outcome, the runner terminates even if
/// reporting to the sink panicked.
struct Completion {
    shared: Arc<Shared>,
    sink: Arc<dyn LogSink>,
    name: String,
    outcome: Option<Outcome>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => {
                if !thread::panicking() {
                    self.sink.record(
                        Severity::Error,
                        COMPONENT,
                        &format!("runner `{}` {DROPPED_BEFORE_RUNNING}", self.name),
                    );
                }
                Outcome::Failed(DROPPED_BEFORE_RUNNING.to_string())
            }
        };
        self.shared.finish(outcome);
    }
}

/// Runs one [`Task`] on a thread of control other than the caller's.
///
/// `start` hands the task to the configured [`Spawner`] and returns without
/// waiting for it. The body is held back until `start` has finished its last
/// step, so it never begins while `start` is still doing work. A runner
/// starts at most once; any later `start` fails with
/// [`RunnerError::AlreadyStarted`] and leaves the first execution alone.
///
/// Whatever the body does, the runner ends in [`RunState::Terminated`] with an
/// [`Outcome`]. Failures and panics are recorded on the sink at error
/// severity and never reach the caller's thread. A panicking body still goes
/// through the process panic hook first, so the default hook prints it to
/// stderr as well. A job the spawner drops without running ends the runner
/// as `Failed`.
pub struct TaskRunner {
    id: Uuid,
    name: String,
    sink: Arc<dyn LogSink>,
    spawner: Arc<dyn Spawner>,
    shared: Arc<Shared>,
}

impl TaskRunner {
    pub fn new(task: Task, sink: Arc<dyn LogSink>) -> Self {
        let id = Uuid::new_v4();
        let short_id = id.simple().to_string();
        Self {
            id,
            name: format!("task-runner-{}", &short_id[..8]),
            sink,
            spawner: Arc::new(ThreadSpawner),
            shared: Arc::new(Shared::new(task)),
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Overrides the generated name. The thread spawner uses it as the
    /// thread name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RunState {
        self.shared.lock().state()
    }

    /// `Some` once the runner has terminated.
    pub fn outcome(&self) -> Option<Outcome> {
        match &*self.shared.lock() {
            Stage::Terminated(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    pub fn start(&self) -> Result<(), RunnerError> {
        let task = {
            let mut stage = self.shared.lock();
            let previous = std::mem::replace(&mut *stage, Stage::Running);
            match previous {
                Stage::New(task) => task,
                previous => {
                    let state = previous.state();
                    *stage = previous;
                    drop(stage);
                    self.sink.record(
                        Severity::Warn,
                        COMPONENT,
                        &format!("runner `{}` rejected start while {state}", self.name),
                    );
                    return Err(RunnerError::AlreadyStarted {
                        name: self.name.clone(),
                        state,
                    });
                }
            }
        };

        self.sink.record(
            Severity::Debug,
            COMPONENT,
            &format!("starting runner `{}` ({})", self.name, self.id),
        );

        let completion = Completion {
            shared: Arc::clone(&self.shared),
            sink: Arc::clone(&self.sink),
            name: self.name.clone(),
            outcome: None,
        };
        let job: Job = Box::new(move || {
            let mut completion = completion;
            completion.shared.wait_for_release();
            let outcome = execute(task);
            completion.outcome = Some(outcome.clone());
            report(&outcome, completion.sink.as_ref(), &completion.name);
        });

        if let Err(err) = self.spawner.spawn(&self.name, job) {
            self.sink.record(
                Severity::Error,
                COMPONENT,
                &format!("runner `{}` could not be scheduled: {err}", self.name),
            );
            self.shared
                .finish(Outcome::Failed(format!("spawn failed: {err}")));
            return Err(err.into());
        }

        self.shared.release();
        Ok(())
    }

    /// Blocks until the runner terminates or `timeout` elapses.
    ///
    /// Returns `None` on timeout, including when the runner was never started.
    pub fn wait(&self, timeout: Duration) -> Option<Outcome> {
        let stage = self.shared.lock();
        let (stage, _) = self
            .shared
            .terminated
            .wait_timeout_while(stage, timeout, |stage| {
                !matches!(stage, Stage::Terminated(_))
            })
            .unwrap_or_else(PoisonError::into_inner);
        match &*stage {
            Stage::Terminated(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn execute(task: Task) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(Ok(())) => Outcome::Completed,
        Ok(Err(failure)) => Outcome::Failed(failure.reason().to_string()),
        Err(payload) => Outcome::Panicked(panic_payload_to_string(&payload)),
    }
}

fn report(outcome: &Outcome, sink: &dyn LogSink, name: &str) {
    match outcome {
        Outcome::Completed => sink.record(
            Severity::Debug,
            COMPONENT,
            &format!("runner `{name}` completed"),
        ),
        Outcome::Failed(reason) => sink.record(
            Severity::Error,
            COMPONENT,
            &format!("runner `{name}` task failed: {reason}"),
        ),
        Outcome::Panicked(message) => sink.record(
            Severity::Error,
            COMPONENT,
            &format!("runner `{name}` task panicked: {message}"),
        ),
    }
}

fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
