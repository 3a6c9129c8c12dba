//! Sample workload: one slow network request per run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::SampleTaskConfig;
use crate::error::TaskError;
use crate::jobs::TaskType;
use crate::tasks::task::{Task, TaskContext};

/// Task-type code of the sample task.
pub const SAMPLE_TASK: TaskType = -1;

/// Network client stub. A send takes `latency` to complete.
#[derive(Debug, Clone)]
pub struct NetClient {
    endpoint: String,
    latency: Duration,
}

impl NetClient {
    pub fn new(endpoint: impl Into<String>, latency: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            latency,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a request. Returns `false` if `cancel` fired before the
    /// request completed.
    pub async fn send(&self, request: &str, cancel: &CancellationToken) -> bool {
        tracing::info!(endpoint = %self.endpoint, "Sending: {}", request);
        tokio::select! {
            _ = tokio::time::sleep(self.latency) => true,
            _ = cancel.cancelled() => {
                tracing::debug!(endpoint = %self.endpoint, "Send interrupted");
                false
            }
        }
    }
}

/// Sends a single request through a [`NetClient`].
pub struct SampleTask {
    client: NetClient,
}

impl SampleTask {
    pub fn new(client: NetClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &SampleTaskConfig) -> Self {
        Self::new(NetClient::new(config.endpoint.clone(), config.latency))
    }

    /// Factory suitable for `TaskRegistry::register`.
    pub fn factory(config: SampleTaskConfig) -> impl Fn() -> Arc<dyn Task> + Send + Sync {
        move || Arc::new(SampleTask::from_config(&config)) as Arc<dyn Task>
    }
}

#[async_trait]
impl Task for SampleTask {
    fn name(&self) -> &str {
        "sample"
    }

    async fn run(&self, ctx: TaskContext) -> Result<(), TaskError> {
        ctx.checkpoint()?;
        let request = format!("sample request for job {}", ctx.job_id);
        if self.client.send(&request, ctx.token()).await {
            Ok(())
        } else {
            Err(TaskError::Cancelled)
        }
    }
}
