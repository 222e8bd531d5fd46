// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The HQ-side scheduler: a priority heap of ready tasks with an auxiliary
//! position index for O(log n) cancellation (spec.md §4.7, §9 design note
//! "do not scan linearly on cancel").
//!
//! Priority 1 is highest; ties break FIFO by `created_at_ms`, and a
//! monotonic insertion sequence breaks any remaining tie so ordering is
//! fully deterministic even when two tasks share a timestamp.

use hqw_core::TaskId;
use std::collections::HashMap;

/// A task waiting to run (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedTask {
    pub task_id: TaskId,
    pub priority: u8,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    task: QueuedTask,
    seq: u64,
}

impl HeapEntry {
    /// Smaller key sorts first: lower `priority` value wins, FIFO within a
    /// priority, `seq` as a last-resort deterministic tiebreak.
    fn key(&self) -> (u8, u64, u64) {
        (self.task.priority, self.task.created_at_ms, self.seq)
    }
}

/// A binary min-heap over [`HeapEntry`] with a `task_id -> position` index,
/// so [`IndexedHeap::remove`] runs in O(log n) instead of a linear scan.
#[derive(Debug, Default)]
struct IndexedHeap {
    entries: Vec<HeapEntry>,
    positions: HashMap<TaskId, usize>,
}

impl IndexedHeap {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn contains(&self, task_id: TaskId) -> bool {
        self.positions.contains_key(&task_id)
    }

    fn peek(&self) -> Option<&QueuedTask> {
        self.entries.first().map(|e| &e.task)
    }

    fn push(&mut self, entry: HeapEntry) {
        let pos = self.entries.len();
        self.positions.insert(entry.task.task_id, pos);
        self.entries.push(entry);
        self.sift_up(pos);
    }

    fn pop_min(&mut self) -> Option<QueuedTask> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.swap(0, last);
        let Some(entry) = self.entries.pop() else {
            return None;
        };
        self.positions.remove(&entry.task.task_id);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(entry.task)
    }

    /// Remove an arbitrary task by id in O(log n): swap it with the last
    /// element, truncate, then restore heap order from the swapped-in slot.
    fn remove(&mut self, task_id: TaskId) -> bool {
        let Some(&pos) = self.positions.get(&task_id) else {
            return false;
        };
        let last = self.entries.len() - 1;
        self.swap(pos, last);
        self.entries.pop();
        self.positions.remove(&task_id);
        if pos < self.entries.len() {
            // The moved-in entry may need to go either direction.
            self.sift_down(pos);
            self.sift_up(pos);
        }
        true
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.positions.insert(self.entries[a].task.task_id, a);
        self.positions.insert(self.entries[b].task.task_id, b);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.entries[pos].key() < self.entries[parent].key() {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * pos + 1;
            let right = 2 * pos + 2;
            let mut smallest = pos;
            if left < len && self.entries[left].key() < self.entries[smallest].key() {
                smallest = left;
            }
            if right < len && self.entries[right].key() < self.entries[smallest].key() {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunningEntry {
    priority: u8,
    seq: u64,
}

/// Errors from scheduler operations (spec.md §7 Protocol-adjacent taxonomy:
/// these are caller-usage errors, not I/O).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("task {0:?} is already queued or running")]
    AlreadyQueuedOrRunning(TaskId),
}

/// The outcome of [`Scheduler::next`] (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// Nothing to do: the queue is empty, or it is non-empty but saturated
    /// with no useful preemption available.
    None,
    /// Start this task; a running slot was free.
    Start(QueuedTask),
    /// Start this task by preempting the named lower-priority running task.
    Preempt { start: QueuedTask, preempt_id: TaskId },
}

/// A priority heap of ready tasks plus the set of currently running tasks
/// (spec.md §4.7). Both data structures share no lock here; the crate's
/// callers are expected to hold a single `parking_lot::Mutex<Scheduler>`
/// for the whole operation, per spec.md §5 ("Scheduler heap and running map
/// share one mutex").
pub struct Scheduler {
    heap: IndexedHeap,
    running: HashMap<TaskId, RunningEntry>,
    max_parallel: usize,
    next_seq: u64,
}

/// Default cap on simultaneously running tasks (spec.md §4.7).
pub const DEFAULT_MAX_PARALLEL: usize = 25;

impl Scheduler {
    pub fn new(max_parallel: usize) -> Self {
        Self { heap: IndexedHeap::default(), running: HashMap::new(), max_parallel, next_seq: 0 }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn is_running(&self, task_id: TaskId) -> bool {
        self.running.contains_key(&task_id)
    }

    pub fn is_queued(&self, task_id: TaskId) -> bool {
        self.heap.contains(task_id)
    }

    /// Push a ready task onto the heap (spec.md §4.7).
    pub fn enqueue(&mut self, task_id: TaskId, priority: u8, created_at_ms: u64) -> Result<(), SchedulerError> {
        if self.heap.contains(task_id) || self.running.contains_key(&task_id) {
            return Err(SchedulerError::AlreadyQueuedOrRunning(task_id));
        }
        let seq = self.next_seq();
        self.heap.push(HeapEntry { task: QueuedTask { task_id, priority, created_at_ms }, seq });
        Ok(())
    }

    /// Remove a task from the ready queue without running it (e.g. it was
    /// cancelled before it ever started). O(log n) via the position index.
    pub fn cancel_queued(&mut self, task_id: TaskId) -> bool {
        self.heap.remove(task_id)
    }

    /// Decide what to run next (spec.md §4.7):
    ///
    /// 1. Empty queue -> `None`.
    /// 2. A running slot is free -> pop and `Start`.
    /// 3. Saturated: if the top of the heap outranks the lowest-priority
    ///    running task, pop it and report `Preempt`. Otherwise `None`.
    pub fn next(&mut self) -> NextOutcome {
        if self.heap.is_empty() {
            return NextOutcome::None;
        }
        if self.running.len() < self.max_parallel {
            let Some(task) = self.heap.pop_min() else {
                return NextOutcome::None;
            };
            return NextOutcome::Start(task);
        }

        let Some(top) = self.heap.peek().copied() else {
            return NextOutcome::None;
        };
        let Some((lowest_id, lowest)) = self.lowest_priority_running() else {
            return NextOutcome::None;
        };
        if top.priority < lowest.priority {
            self.heap.pop_min();
            NextOutcome::Preempt { start: top, preempt_id: lowest_id }
        } else {
            NextOutcome::None
        }
    }

    /// The running task with the least urgency: highest numeric priority,
    /// tie-broken by whichever entered `running` first (spec.md §8 S5:
    /// "whichever was inserted first").
    fn lowest_priority_running(&self) -> Option<(TaskId, RunningEntry)> {
        self.running
            .iter()
            .max_by_key(|(_, entry)| (entry.priority, std::cmp::Reverse(entry.seq)))
            .map(|(&id, &entry)| (id, entry))
    }

    pub fn mark_running(&mut self, task_id: TaskId, priority: u8) {
        let seq = self.next_seq();
        self.heap.remove(task_id);
        self.running.insert(task_id, RunningEntry { priority, seq });
    }

    pub fn mark_complete(&mut self, task_id: TaskId) {
        self.running.remove(&task_id);
    }

    /// A preempted (or manually paused) task leaves the running set without
    /// re-entering the ready queue; the caller decides whether/when to
    /// re-enqueue it (spec.md §8 S5).
    pub fn mark_paused(&mut self, task_id: TaskId) {
        self.running.remove(&task_id);
    }

    /// Rebuild the ready queue from storage at startup (spec.md §4.7).
    pub fn load_ready_tasks(&mut self, tasks: impl IntoIterator<Item = QueuedTask>) {
        for task in tasks {
            let _ = self.enqueue(task.task_id, task.priority, task.created_at_ms);
        }
    }

    /// Rebuild the running set from storage at startup (spec.md §4.7).
    pub fn load_running_tasks(&mut self, tasks: impl IntoIterator<Item = (TaskId, u8)>) {
        for (task_id, priority) in tasks {
            self.mark_running(task_id, priority);
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
