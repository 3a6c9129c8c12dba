//! Task abstraction for units of work run by the worker.

pub mod registry;
pub mod sample;
pub mod task;

pub use registry::TaskRegistry;
pub use task::*;
