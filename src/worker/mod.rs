//! Worker system: job lifecycle control on a single serial worker.
//!
//! Core components:
//! - `controller` — JobController (start/stop signals, dequeue/finish bookkeeping)
//! - `worker_loop` — the serial worker context
//! - `callback` — completion reporting back to the external scheduler

pub mod callback;
pub mod controller;
mod worker_loop;

pub use callback::JobScheduler;
pub use controller::{JobController, StopOutcome};
