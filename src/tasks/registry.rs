//! Task registry: resolves task-type codes to runnable tasks.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::jobs::{NO_TASK, TaskType};
use crate::tasks::task::Task;

type TaskFactory = Arc<dyn Fn() -> Arc<dyn Task> + Send + Sync>;

enum Registration {
    /// New instance per resolve.
    Fresh(TaskFactory),
    /// Built on first resolve, then shared.
    Lazy {
        factory: TaskFactory,
        instance: OnceLock<Arc<dyn Task>>,
    },
}

impl Registration {
    fn resolve(&self) -> Arc<dyn Task> {
        match self {
            Self::Fresh(factory) => factory(),
            Self::Lazy { factory, instance } => instance.get_or_init(|| factory()).clone(),
        }
    }
}

/// Registry of runnable tasks keyed by task-type code.
///
/// Populated at startup, then shared read-only with the worker.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskType, Registration>,
}

impl TaskRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory that builds a fresh task for every resolve.
    /// Returns `false` for the reserved "no task" code.
    pub fn register<F>(&mut self, task_type: TaskType, factory: F) -> bool
    where
        F: Fn() -> Arc<dyn Task> + Send + Sync + 'static,
    {
        self.insert(task_type, Registration::Fresh(Arc::new(factory)))
    }

    /// Register a factory whose task is built on first resolve and reused.
    pub fn register_lazy<F>(&mut self, task_type: TaskType, factory: F) -> bool
    where
        F: Fn() -> Arc<dyn Task> + Send + Sync + 'static,
    {
        self.insert(
            task_type,
            Registration::Lazy {
                factory: Arc::new(factory),
                instance: OnceLock::new(),
            },
        )
    }

    fn insert(&mut self, task_type: TaskType, registration: Registration) -> bool {
        if task_type == NO_TASK {
            tracing::warn!(task_type, "Rejected task registration: reserved code");
            return false;
        }
        if self.tasks.insert(task_type, registration).is_some() {
            tracing::warn!(task_type, "Replaced existing task registration");
        }
        tracing::debug!(task_type, "Registered task");
        true
    }

    /// Resolve a task-type code to a ready-to-run task.
    pub fn resolve(&self, task_type: TaskType) -> Option<Arc<dyn Task>> {
        self.tasks.get(&task_type).map(Registration::resolve)
    }

    /// Check if a code is registered.
    pub fn has(&self, task_type: TaskType) -> bool {
        self.tasks.contains_key(&task_type)
    }

    /// Registered codes, ascending.
    pub fn codes(&self) -> Vec<TaskType> {
        let mut codes: Vec<TaskType> = self.tasks.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    /// Get the number of registered tasks.
    pub fn count(&self) -> usize {
        self.tasks.len()
    }
}
