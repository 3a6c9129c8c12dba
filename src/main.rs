use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use job_dispatch::JobService;
use job_dispatch::config::{DispatcherConfig, SampleTaskConfig};
use job_dispatch::jobs::{JobId, TASK_TYPE_KEY};
use job_dispatch::tasks::TaskRegistry;
use job_dispatch::tasks::sample::{SAMPLE_TASK, SampleTask};
use job_dispatch::worker::JobScheduler;

/// Stand-in for the platform scheduler: logs completion reports.
struct LoggingScheduler;

impl JobScheduler for LoggingScheduler {
    fn report_finished(&self, job_id: JobId, needs_reschedule: bool) {
        tracing::info!(job_id, needs_reschedule, "Scheduler notified: job finished");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; keep the guard alive so buffered file logs flush.
    let _log_guard = init_tracing();

    let config = DispatcherConfig::from_env().context("invalid dispatcher configuration")?;
    let sample_config = SampleTaskConfig::from_env();
    let interval_secs: u64 = std::env::var("JOB_DISPATCH_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    eprintln!("Job Dispatch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Worker: {}", config.name);
    eprintln!("   Shutdown policy: {:?}", config.shutdown_policy);
    eprintln!(
        "   Sample task: {} ({}s latency)",
        sample_config.endpoint,
        sample_config.latency.as_secs()
    );
    eprintln!("   Interval: {}s. Ctrl-C to exit.\n", interval_secs);

    // ── Tasks ────────────────────────────────────────────────────────────
    let mut registry = TaskRegistry::new();
    registry.register_lazy(SAMPLE_TASK, SampleTask::factory(sample_config));

    let service = JobService::start(config, registry, Arc::new(LoggingScheduler));

    // Mirror lifecycle events into the log as JSON.
    let mut events = service.controller().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => tracing::debug!(event = %json, "Job event"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize job event"),
            }
        }
    });

    // ── Simulated periodic scheduler ────────────────────────────────────
    let next_job_id = AtomicI32::new(0);
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // A new sample job supersedes any outstanding one.
                let cancelled = service.controller().cancel_all(SAMPLE_TASK);
                if cancelled > 0 {
                    tracing::info!(cancelled, "Superseded outstanding sample jobs");
                }

                let job_id = next_job_id.fetch_add(1, Ordering::Relaxed);
                let extras = HashMap::from([(TASK_TYPE_KEY.to_string(), i64::from(SAMPLE_TASK))]);
                if let Err(e) = service.notify_start(job_id, Some(extras)) {
                    tracing::error!(job_id, error = %e, "Start signal rejected");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    service.shutdown().await;
    Ok(())
}

/// Console logging, plus a daily rolling file when `JOB_DISPATCH_LOG_DIR`
/// is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false);

    match std::env::var("JOB_DISPATCH_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "job-dispatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}
