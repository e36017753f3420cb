pub mod spawner;
pub mod state;
pub mod task;
pub mod task_runner;
pub mod thread_creation;

pub use spawner::{Scheduler, SpawnError, Spawner, ThreadSpawner, TokioSpawner};
pub use state::{Outcome, RunState};
pub use task::{Task, TaskFailure};
pub use task_runner::{RunnerError, TaskRunner};
