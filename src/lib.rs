//! Job Dispatch — serial background-job controller.
//!
//! An external scheduler delivers start and stop signals; the controller
//! tracks queued and running jobs, runs their tasks one at a time on a
//! single worker, and reports completion back to the scheduler.

pub mod config;
pub mod error;
pub mod jobs;
pub mod service;
pub mod tasks;
pub mod worker;

pub use service::JobService;
pub use worker::{JobController, JobScheduler, StopOutcome};
