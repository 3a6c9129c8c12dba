//! Job bookkeeping types.
//!
//! - `params` — job descriptors and task-type codes
//! - `table` — JobTable of queued jobs
//! - `state` — per-job state machine
//! - `event` — lifecycle events broadcast to subscribers

pub mod event;
pub mod params;
pub mod state;
pub mod table;

pub use event::{JobEvent, JobOutcome};
pub use params::{JobId, JobParameters, NO_TASK, TASK_TYPE_KEY, TaskType};
pub use state::JobState;
pub use table::{JobTable, QueuedJob};
