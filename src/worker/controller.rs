//! Job lifecycle controller.
//!
//! Accepts start/stop signals, keeps JobTable and the current job under one
//! lock, and posts start signals to the single worker loop. The lock is
//! only held for bookkeeping, never across a task body or an `.await`.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{DispatcherConfig, ShutdownPolicy};
use crate::error::{DispatchError, Result};
use crate::jobs::{
    JobEvent, JobId, JobOutcome, JobParameters, JobState, JobTable, QueuedJob, TaskType,
};
use crate::tasks::TaskRegistry;
use crate::worker::callback::JobScheduler;
use crate::worker::worker_loop::{WorkerLoop, panic_message};

/// A start signal posted to the worker loop.
#[derive(Debug)]
pub(crate) struct StartSignal {
    pub params: JobParameters,
    pub ticket: u64,
}

/// A job handed to the worker by a successful dequeue.
#[derive(Debug)]
pub(crate) struct Dequeued {
    pub params: JobParameters,
    pub cancel: CancellationToken,
}

/// What a stop signal did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The job was running; cancellation was requested.
    Interrupted,
    /// The job was queued and has been withdrawn.
    Withdrawn,
    /// Neither queued nor running.
    NotTracked,
}

#[derive(Debug)]
struct CurrentJob {
    job_id: JobId,
    task_type: Option<TaskType>,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct DispatchState {
    table: JobTable,
    current: Option<CurrentJob>,
    next_ticket: u64,
    /// `None` once shutdown has begun.
    sender: Option<mpsc::UnboundedSender<StartSignal>>,
}

/// State shared between the signal context and the worker loop.
pub(crate) struct ControllerCore {
    state: Mutex<DispatchState>,
    scheduler: Arc<dyn JobScheduler>,
    events: broadcast::Sender<JobEvent>,
    config: DispatcherConfig,
}

impl ControllerCore {
    pub(crate) fn new(
        config: DispatcherConfig,
        scheduler: Arc<dyn JobScheduler>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<StartSignal>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let core = Arc::new(Self {
            state: Mutex::new(DispatchState {
                table: JobTable::new(),
                current: None,
                next_ticket: 0,
                sender: Some(sender),
            }),
            scheduler,
            events,
            config,
        });
        (core, receiver)
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        // Critical sections never panic midway, so a poisoned lock still
        // holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: JobEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Dequeue step, run by the worker before executing a posted signal.
    ///
    /// Returns `None` when the posting was withdrawn: the job was cancelled
    /// while queued, or re-queued under a newer posting.
    pub(crate) fn dequeue(&self, signal: StartSignal) -> Option<Dequeued> {
        let job_id = signal.params.job_id;
        let mut state = self.lock();

        match state.table.get(job_id) {
            Some(entry) if entry.ticket == signal.ticket => {}
            _ => {
                tracing::debug!(job_id, ticket = signal.ticket, "Skipping withdrawn start signal");
                return None;
            }
        }
        let entry = state.table.remove(job_id)?;

        // A fresh token per dequeue: a stop aimed at an earlier job never
        // carries over.
        let cancel = CancellationToken::new();
        let task_type = entry.params.task_type();
        state.current = Some(CurrentJob {
            job_id,
            task_type,
            cancel: cancel.clone(),
            started_at: Utc::now(),
        });

        tracing::debug!(
            job_id,
            waited_ms = (Utc::now() - entry.queued_at).num_milliseconds(),
            "Dequeued job"
        );
        self.emit(JobEvent::Started { job_id, task_type });

        Some(Dequeued {
            params: entry.params,
            cancel,
        })
    }

    /// Finish step: clear the current job, then report to the scheduler.
    pub(crate) fn finish(&self, job_id: JobId, outcome: JobOutcome) {
        let needs_reschedule =
            self.config.reschedule_on_failure && matches!(outcome, JobOutcome::Failed { .. });

        {
            let mut state = self.lock();
            match state.current.take() {
                Some(current) if current.job_id == job_id => {
                    tracing::info!(
                        job_id,
                        outcome = ?outcome,
                        elapsed_ms = (Utc::now() - current.started_at).num_milliseconds(),
                        "Job finished"
                    );
                }
                other => {
                    tracing::warn!(
                        job_id,
                        current = ?other.as_ref().map(|c| c.job_id),
                        "Finished job was not the current job"
                    );
                    state.current = other;
                }
            }
            self.emit(JobEvent::Finished {
                job_id,
                outcome,
                needs_reschedule,
            });
        }

        let reported = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.scheduler.report_finished(job_id, needs_reschedule)
        }));
        if let Err(panic) = reported {
            tracing::error!(
                job_id,
                error = %panic_message(panic.as_ref()),
                "Scheduler panicked while handling finish report"
            );
        }
    }
}

/// Public coordinator for start/stop signals.
pub struct JobController {
    core: Arc<ControllerCore>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobController {
    /// Create the controller and spawn its worker loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: DispatcherConfig,
        registry: TaskRegistry,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        tracing::info!(
            worker = %config.name,
            tasks = registry.count(),
            "Starting job controller"
        );

        let (core, receiver) = ControllerCore::new(config, scheduler);
        let handle = WorkerLoop::new(Arc::clone(&core), Arc::new(registry), receiver).spawn();

        Self {
            core,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Accept a start signal. Never blocks; completion is reported through
    /// the scheduler callback.
    ///
    /// A start for a job id that is still queued or running is a contract
    /// violation and leaves all state unchanged.
    pub fn on_start(&self, params: JobParameters) -> Result<()> {
        let job_id = params.job_id;
        let task_type = params.task_type();
        let mut state = self.core.lock();

        let Some(sender) = state.sender.clone() else {
            tracing::warn!(job_id, "Rejected start signal: shutting down");
            return Err(DispatchError::ShuttingDown { job_id });
        };

        let is_current = state.current.as_ref().is_some_and(|c| c.job_id == job_id);
        if is_current || state.table.contains(job_id) {
            tracing::error!(job_id, "Duplicate start signal for tracked job");
            return Err(DispatchError::DuplicateJob { job_id });
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state
            .table
            .insert(job_id, QueuedJob::new(params.clone(), ticket));

        if sender.send(StartSignal { params, ticket }).is_err() {
            state.table.remove(job_id);
            tracing::warn!(job_id, "Worker loop is gone, rejected start signal");
            return Err(DispatchError::ShuttingDown { job_id });
        }

        tracing::debug!(job_id, ?task_type, ticket, "Queued job");
        self.core.emit(JobEvent::Queued { job_id, task_type });
        Ok(())
    }

    /// Accept a stop signal.
    ///
    /// A running job gets a cooperative cancellation request; a queued job is
    /// withdrawn and will never run or be reported; anything else is ignored.
    pub fn on_stop(&self, job_id: JobId) -> StopOutcome {
        let mut state = self.core.lock();

        if let Some(current) = state.current.as_ref().filter(|c| c.job_id == job_id) {
            if !current.cancel.is_cancelled() {
                current.cancel.cancel();
                tracing::info!(job_id, "Requested cancellation of running job");
                self.core.emit(JobEvent::Interrupted { job_id });
            }
            return StopOutcome::Interrupted;
        }

        if state.table.remove(job_id).is_some() {
            tracing::info!(job_id, "Withdrew queued job");
            self.core.emit(JobEvent::Cancelled { job_id });
            return StopOutcome::Withdrawn;
        }

        tracing::debug!(job_id, "Stop signal for untracked job ignored");
        StopOutcome::NotTracked
    }

    /// Cancel every queued or running job of the given task type.
    /// Returns the number of jobs affected.
    pub fn cancel_all(&self, task_type: TaskType) -> usize {
        let mut state = self.core.lock();

        let withdrawn = state
            .table
            .remove_where(|job| job.params.task_type() == Some(task_type));
        for &job_id in &withdrawn {
            self.core.emit(JobEvent::Cancelled { job_id });
        }
        let mut affected = withdrawn.len();

        if let Some(current) = state
            .current
            .as_ref()
            .filter(|c| c.task_type == Some(task_type))
        {
            if !current.cancel.is_cancelled() {
                current.cancel.cancel();
                self.core.emit(JobEvent::Interrupted {
                    job_id: current.job_id,
                });
            }
            affected += 1;
        }

        tracing::info!(task_type, affected, "Cancelled jobs by task type");
        affected
    }

    /// The job currently executing on the worker, if any.
    pub fn current_job(&self) -> Option<JobId> {
        self.core.lock().current.as_ref().map(|c| c.job_id)
    }

    /// `Queued`, `Running` or `Interrupted` for tracked ids; `None` otherwise.
    pub fn job_state(&self, job_id: JobId) -> Option<JobState> {
        let state = self.core.lock();
        match state.current.as_ref() {
            Some(current) if current.job_id == job_id => Some(if current.cancel.is_cancelled() {
                JobState::Interrupted
            } else {
                JobState::Running
            }),
            _ if state.table.contains(job_id) => Some(JobState::Queued),
            _ => None,
        }
    }

    /// Get count of queued jobs.
    pub fn queued_count(&self) -> usize {
        self.core.lock().table.len()
    }

    /// Queued job ids, ascending.
    pub fn queued_jobs(&self) -> Vec<JobId> {
        self.core.lock().table.job_ids()
    }

    /// Whether start signals are still accepted.
    pub fn is_accepting(&self) -> bool {
        self.core.lock().sender.is_some()
    }

    /// Subscribe to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.core.events.subscribe()
    }

    /// Stop accepting start signals and apply the shutdown policy. Returns
    /// `false` if the controller was already closed.
    fn close(&self) -> bool {
        let mut state = self.core.lock();
        if state.sender.take().is_none() {
            return false;
        }

        let policy = self.core.config.shutdown_policy;
        if matches!(policy, ShutdownPolicy::DiscardQueued | ShutdownPolicy::CancelAll) {
            let dropped = state.table.clear();
            for &job_id in &dropped {
                self.core.emit(JobEvent::Cancelled { job_id });
            }
            if !dropped.is_empty() {
                tracing::info!(count = dropped.len(), "Dropped queued jobs on shutdown");
            }
        }
        if policy == ShutdownPolicy::CancelAll
            && let Some(current) = state.current.as_ref()
            && !current.cancel.is_cancelled()
        {
            current.cancel.cancel();
            self.core.emit(JobEvent::Interrupted {
                job_id: current.job_id,
            });
        }

        tracing::info!(worker = %self.core.config.name, ?policy, "Job controller closing");
        true
    }

    /// Shut down: stop accepting starts, apply the shutdown policy, and wait
    /// for the worker loop to exit. The in-flight job is never killed.
    pub async fn shutdown(&self) {
        self.close();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker loop terminated abnormally");
            }
            tracing::info!(worker = %self.core.config.name, "Job controller stopped");
        }
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        // Closing the channel lets the detached worker loop exit.
        self.close();
    }
}
