//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// What happens to queued and in-flight jobs on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Drop queued jobs unrun; let the in-flight job finish.
    #[default]
    DiscardQueued,
    /// Run every queued job before the worker exits.
    Drain,
    /// Drop queued jobs and request cancellation of the in-flight job.
    CancelAll,
}

impl FromStr for ShutdownPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" | "discard_queued" => Ok(Self::DiscardQueued),
            "drain" => Ok(Self::Drain),
            "cancel" | "cancel_all" => Ok(Self::CancelAll),
            other => Err(ConfigError::InvalidValue {
                key: "JOB_DISPATCH_SHUTDOWN".to_string(),
                message: format!("unknown policy '{other}' (expected discard, drain or cancel)"),
            }),
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Name of the worker context, used in logs.
    pub name: String,
    /// Capacity of the job event broadcast channel.
    pub event_capacity: usize,
    pub shutdown_policy: ShutdownPolicy,
    /// Ask the scheduler to reschedule jobs whose task body failed.
    pub reschedule_on_failure: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "job-service".to_string(),
            event_capacity: 256,
            shutdown_policy: ShutdownPolicy::DiscardQueued,
            reschedule_on_failure: false,
        }
    }
}

impl DispatcherConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let shutdown_policy = match lookup("JOB_DISPATCH_SHUTDOWN") {
            Some(raw) => raw.parse()?,
            None => defaults.shutdown_policy,
        };

        Ok(Self {
            name: lookup("JOB_DISPATCH_NAME").unwrap_or(defaults.name),
            event_capacity: parse_or(
                &lookup,
                "JOB_DISPATCH_EVENT_CAPACITY",
                defaults.event_capacity,
            )
            .max(1),
            shutdown_policy,
            reschedule_on_failure: parse_or(
                &lookup,
                "JOB_DISPATCH_RESCHEDULE_ON_FAILURE",
                defaults.reschedule_on_failure,
            ),
        })
    }
}

/// Configuration of the sample network task.
#[derive(Debug, Clone)]
pub struct SampleTaskConfig {
    pub endpoint: String,
    pub latency: Duration,
}

impl Default for SampleTaskConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/sample".to_string(),
            latency: Duration::from_secs(30),
        }
    }
}

impl SampleTaskConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            endpoint: lookup("SAMPLE_ENDPOINT").unwrap_or(defaults.endpoint),
            latency: Duration::from_secs(parse_or(
                &lookup,
                "SAMPLE_LATENCY_SECS",
                defaults.latency.as_secs(),
            )),
        }
    }
}

/// Parse `key`, falling back to `default` (with a warning) when the value
/// is malformed.
pub(crate) fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
        None => default,
    }
}
