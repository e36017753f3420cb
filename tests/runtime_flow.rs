use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use threadRunner::config::AppConfig;
use threadRunner::logging::{MemorySink, Severity};
use threadRunner::runtime::{
    DemoError, RunOptions, RunReport, RunnerSummary, restart_demo, run_demo,
};
use threadRunner::tasks::thread_creation::COMPONENT;
use threadRunner::tasks::{Outcome, RunState, Scheduler};

fn options(count: usize, scheduler: Scheduler) -> RunOptions {
    RunOptions {
        message: "Thread is Running".to_string(),
        count,
        scheduler,
        wait: Duration::from_secs(1),
    }
}

#[test]
fn run_demo_completes_every_runner() {
    let sink = Arc::new(MemorySink::new());
    let report = run_demo(&options(3, Scheduler::Thread), sink.clone()).unwrap();

    assert_eq!(report.runners.len(), 3);
    assert!(report.all_completed());
    assert!(
        report
            .runners
            .iter()
            .all(|runner| runner.state == RunState::Terminated)
    );
    assert_eq!(sink.from_component(COMPONENT).len(), 3);
    assert_eq!(sink.count_matching(Severity::Info, "Thread is Running"), 3);
}

#[test]
fn run_demo_with_tokio_outside_a_runtime_fails_to_spawn() {
    let sink = Arc::new(MemorySink::new());
    let err = run_demo(&options(1, Scheduler::Tokio), sink.clone()).unwrap_err();
    assert!(err.to_string().contains("no tokio runtime"));
    assert!(sink.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_demo_on_tokio_blocking_pool() {
    let sink = Arc::new(MemorySink::new());
    let report = tokio::task::spawn_blocking({
        let sink = sink.clone();
        move || run_demo(&options(2, Scheduler::Tokio), sink)
    })
    .await
    .unwrap()
    .unwrap();

    assert!(report.all_completed());
    assert_eq!(sink.from_component(COMPONENT).len(), 2);
}

#[test]
fn restart_demo_reports_refusal_and_single_body_record() {
    let sink = Arc::new(MemorySink::new());
    let report = restart_demo(&options(1, Scheduler::Thread), sink.clone()).unwrap();

    assert!(report.rejection.contains("cannot be started again"));
    assert_eq!(report.runner.outcome, Some(Outcome::Completed));
    assert_eq!(sink.from_component(COMPONENT).len(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["runner"]["state"], "terminated");
    assert_eq!(json["runner"]["outcome"]["outcome"], "completed");
}

#[test]
fn options_come_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# runner settings").unwrap();
    writeln!(file, "TASK_MESSAGE='from file'").unwrap();
    writeln!(file, "SCHEDULER=thread").unwrap();
    writeln!(file, "WAIT_MS=250").unwrap();

    let config = AppConfig::from_file(file.path()).unwrap();
    let options = RunOptions::from_config(&config).unwrap();

    assert_eq!(options.message, "from file");
    assert_eq!(options.scheduler, Scheduler::Thread);
    assert_eq!(options.wait, Duration::from_millis(250));
    assert_eq!(options.count, 1);
}

#[test]
fn missing_config_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::from_file(dir.path().join("absent.env")).unwrap_err();
    assert!(err.to_string().contains("absent.env"));
}

fn summary(name: &str, state: RunState, outcome: Option<Outcome>) -> RunnerSummary {
    RunnerSummary {
        id: uuid::Uuid::new_v4(),
        name: name.to_string(),
        state,
        outcome,
    }
}

#[test]
fn incomplete_lists_failed_panicked_and_unfinished_runners() {
    let report = RunReport {
        runners: vec![
            summary("ok", RunState::Terminated, Some(Outcome::Completed)),
            summary("failed", RunState::Terminated, Some(Outcome::Failed("no input".to_string()))),
            summary("panicked", RunState::Terminated, Some(Outcome::Panicked("boom".to_string()))),
            summary("slow", RunState::Running, None),
        ],
    };

    assert!(!report.all_completed());
    let lines: Vec<String> = report.incomplete().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "runner failed failed: no input".to_string(),
            "runner panicked panicked: boom".to_string(),
            "runner slow did not finish (running)".to_string(),
        ]
    );
}

#[test]
fn demo_errors_keep_runner_messages() {
    let err = run_demo(&options(1, Scheduler::Tokio), Arc::new(MemorySink::new())).unwrap_err();
    let err = DemoError::from(err);
    assert!(err.to_string().contains("no tokio runtime"));

    let err = DemoError::RestartAccepted {
        name: "demo".to_string(),
    };
    assert_eq!(err.to_string(), "runner `demo` accepted a second start");
}
