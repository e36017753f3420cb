use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use threadRunner::config::AppConfig;
use threadRunner::logging::{FanoutSink, LogRecord, LogSink, MemorySink, TracingSink};
use threadRunner::runtime::{self, RunOptions};
use threadRunner::tasks::Scheduler;
use threadRunner::tasks::thread_creation::COMPONENT;

#[derive(Parser)]
#[command(about = "Run a task on its own thread and watch what it logs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// Message the task records; defaults to TASK_MESSAGE or "Thread is Running"
    #[arg(long)]
    message: Option<String>,
    #[arg(long, value_enum)]
    scheduler: Option<Scheduler>,
    /// How long to wait for each runner before giving up
    #[arg(long)]
    wait_ms: Option<u64>,
    /// Print captured records as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[arg(long, default_value_t = 1)]
        count: usize,
        #[command(flatten)]
        common: Common,
    },
    RestartDemo {
        #[command(flatten)]
        common: Common,
    },
}

impl Common {
    fn options(&self, config: &AppConfig) -> anyhow::Result<RunOptions> {
        let mut options = RunOptions::from_config(config)?;
        if let Some(message) = &self.message {
            options.message = message.clone();
        }
        if let Some(scheduler) = self.scheduler {
            options.scheduler = scheduler;
        }
        if let Some(wait_ms) = self.wait_ms {
            options.wait = Duration::from_millis(wait_ms);
        }
        Ok(options)
    }
}

pub async fn cli(config: AppConfig) -> anyhow::Result<()> {
    let cli = Cli::parse();
    let capture = Arc::new(MemorySink::new());
    let sink: Arc<dyn LogSink> = Arc::new(
        FanoutSink::new()
            .with(capture.clone())
            .with(Arc::new(TracingSink)),
    );

    match cli.command {
        Commands::Run { count, common } => {
            let mut options = common.options(&config)?;
            options.count = count;
            let report = blocking(move || runtime::run_demo(&options, sink)).await??;
            print_records(&capture.from_component(COMPONENT), common.json)?;
            if !report.all_completed() {
                for runner in report.incomplete() {
                    eprintln!("{runner}");
                }
                bail!("not every runner completed");
            }
        }
        Commands::RestartDemo { common } => {
            let options = common.options(&config)?;
            let report = blocking(move || runtime::restart_demo(&options, sink)).await??;
            let body_records = capture.from_component(COMPONENT);
            print_records(&body_records, common.json)?;
            if common.json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("second start refused: {}", report.rejection);
                println!("task body records: {}", body_records.len());
            }
        }
    }
    Ok(())
}

// Runners are waited on with a blocking condvar; keep that off the async workers.
async fn blocking<F, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("runner driver thread failed")
}

fn print_records(records: &[LogRecord], json: bool) -> anyhow::Result<()> {
    for record in records {
        if json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("{record}");
        }
    }
    Ok(())
}
