// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! `TaskRepository`: the narrow slice of the SQL database wrapper the core
//! depends on (spec.md §1 Non-goals: "the SQL database wrapper, consumed
//! via a narrow interface"). Only the in-memory `test-support` impl lives
//! in this workspace; a real implementation is external.

use async_trait::async_trait;
use hqw_core::{Task, TaskId, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum TaskRepositoryError {
    #[error("task {0:?} not found")]
    NotFound(TaskId),
}

/// The persistence surface the scheduler and unblock handler need. HQ never
/// stores a "blocked" flag (spec.md §3, §9); every blocking question is
/// answered by walking `Task::dependencies` against current status, which
/// is exactly what [`TaskRepository::get_incomplete_blocker_ids`] does.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get_task(&self, id: TaskId) -> Option<Task>;

    async fn update_task(&self, task: Task) -> Result<(), TaskRepositoryError>;

    /// Dependencies of `task_id` whose status is not yet terminal.
    async fn get_incomplete_blocker_ids(&self, task_id: TaskId) -> Vec<TaskId>;

    /// Tasks with `auto_start = true` that depend on `completed_task_id` and
    /// whose last incomplete blocker was that task (spec.md §4.7, §8 S6).
    async fn get_tasks_ready_to_auto_start(&self, completed_task_id: TaskId) -> Vec<Task>;

    async fn load_ready_tasks(&self) -> Vec<Task>;

    async fn load_running_tasks(&self) -> Vec<Task>;
}

#[cfg(any(test, feature = "test-support"))]
pub use in_memory::InMemoryTaskRepository;

#[cfg(any(test, feature = "test-support"))]
mod in_memory {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// An in-memory stand-in for the SQL-backed repository, for tests only.
    #[derive(Default)]
    pub struct InMemoryTaskRepository {
        tasks: Mutex<HashMap<TaskId, Task>>,
    }

    impl InMemoryTaskRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
            let repo = Self::new();
            for task in tasks {
                repo.tasks.lock().insert(task.id, task);
            }
            repo
        }

        pub fn insert(&self, task: Task) {
            self.tasks.lock().insert(task.id, task);
        }
    }

    #[async_trait]
    impl TaskRepository for InMemoryTaskRepository {
        async fn get_task(&self, id: TaskId) -> Option<Task> {
            self.tasks.lock().get(&id).cloned()
        }

        async fn update_task(&self, task: Task) -> Result<(), TaskRepositoryError> {
            self.tasks.lock().insert(task.id, task);
            Ok(())
        }

        async fn get_incomplete_blocker_ids(&self, task_id: TaskId) -> Vec<TaskId> {
            let tasks = self.tasks.lock();
            let Some(task) = tasks.get(&task_id) else {
                return Vec::new();
            };
            task.dependencies
                .iter()
                .copied()
                .filter(|dep| !tasks.get(dep).map(|t| t.status.is_terminal()).unwrap_or(false))
                .collect()
        }

        async fn get_tasks_ready_to_auto_start(&self, completed_task_id: TaskId) -> Vec<Task> {
            let tasks = self.tasks.lock();
            tasks
                .values()
                .filter(|t| t.auto_start && t.dependencies.contains(&completed_task_id))
                .filter(|t| {
                    t.dependencies
                        .iter()
                        .all(|dep| tasks.get(dep).map(|d| d.status.is_terminal()).unwrap_or(false))
                })
                .cloned()
                .collect()
        }

        async fn load_ready_tasks(&self) -> Vec<Task> {
            self.tasks.lock().values().filter(|t| t.status == TaskStatus::Ready).cloned().collect()
        }

        async fn load_running_tasks(&self) -> Vec<Task> {
            self.tasks.lock().values().filter(|t| t.status == TaskStatus::Running).cloned().collect()
        }
    }
}

#[cfg(test)]
#[path = "task_repository_tests.rs"]
mod tests;
