//! The single serial worker context.
//!
//! One spawned task drains the start-signal channel in posting order and
//! awaits each task body inline, so at most one body runs at a time.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TaskError;
use crate::jobs::JobOutcome;
use crate::tasks::{TaskContext, TaskRegistry};
use crate::worker::controller::{ControllerCore, Dequeued, StartSignal};

pub(crate) struct WorkerLoop {
    core: Arc<ControllerCore>,
    registry: Arc<TaskRegistry>,
    signals: mpsc::UnboundedReceiver<StartSignal>,
}

impl WorkerLoop {
    pub(crate) fn new(
        core: Arc<ControllerCore>,
        registry: Arc<TaskRegistry>,
        signals: mpsc::UnboundedReceiver<StartSignal>,
    ) -> Self {
        Self {
            core,
            registry,
            signals,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process signals until the channel is closed and drained.
    async fn run(mut self) {
        let name = self.core.config().name.clone();
        tracing::info!(worker = %name, "Worker loop started");

        while let Some(signal) = self.signals.recv().await {
            self.handle(signal).await;
        }

        tracing::info!(worker = %name, "Worker loop exited");
    }

    async fn handle(&self, signal: StartSignal) {
        let job_id = signal.params.job_id;
        let Some(dequeued) = self.core.dequeue(signal) else {
            return;
        };
        let outcome = self.execute(dequeued).await;
        self.core.finish(job_id, outcome);
    }

    async fn execute(&self, dequeued: Dequeued) -> JobOutcome {
        let job_id = dequeued.params.job_id;

        let Some(task_type) = dequeued.params.task_type() else {
            tracing::warn!(job_id, "Job has no task type, nothing to run");
            return JobOutcome::NoWork;
        };

        // Lazy registrations build the task here, so factory panics land here too.
        let resolved =
            std::panic::catch_unwind(AssertUnwindSafe(|| self.registry.resolve(task_type)));
        let task = match resolved {
            Ok(Some(task)) => task,
            Ok(None) => {
                tracing::warn!(job_id, task_type, "Unexpected task type");
                return JobOutcome::NoWork;
            }
            Err(panic) => {
                let error = panic_message(panic.as_ref());
                tracing::error!(job_id, task_type, error = %error, "Task factory panicked");
                return JobOutcome::Failed { error };
            }
        };

        if dequeued.cancel.is_cancelled() {
            tracing::info!(job_id, task = task.name(), "Cancelled before start, skipping");
            return JobOutcome::Skipped;
        }

        tracing::info!(job_id, task = task.name(), "Running task");
        let ctx = TaskContext::new(job_id, task_type, dequeued.cancel);

        match AssertUnwindSafe(task.run(ctx)).catch_unwind().await {
            Ok(Ok(())) => JobOutcome::Completed,
            Ok(Err(TaskError::Cancelled)) => {
                tracing::info!(job_id, task = task.name(), "Task stopped on cancellation");
                JobOutcome::Interrupted
            }
            Ok(Err(e)) => {
                tracing::warn!(job_id, task = task.name(), error = %e, "Task failed");
                JobOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(panic) => {
                let error = panic_message(panic.as_ref());
                tracing::error!(job_id, task = task.name(), error = %error, "Task panicked");
                JobOutcome::Failed { error }
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
