//! The smallest useful task: announce that the worker thread is running.

use std::sync::Arc;

use crate::logging::{LogSink, Severity};
use crate::tasks::task::Task;

pub const COMPONENT: &str = "thread_creation";
pub const DEFAULT_MESSAGE: &str = "Thread is Running";

pub fn task(sink: Arc<dyn LogSink>) -> Task {
    task_with_message(sink, DEFAULT_MESSAGE)
}

pub fn task_with_message(sink: Arc<dyn LogSink>, message: impl Into<String>) -> Task {
    let message = message.into();
    Task::from_fn(move || sink.record(Severity::Info, COMPONENT, &message))
}
