// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;

#[test]
fn empty_queue_returns_none() {
    let mut scheduler = Scheduler::new(2);
    assert_eq!(scheduler.next(), NextOutcome::None);
}

#[test]
fn pops_highest_priority_first_ties_broken_fifo() {
    let mut scheduler = Scheduler::new(5);
    let low = TaskId::new();
    let high = TaskId::new();
    let same_prio_later = TaskId::new();

    scheduler.enqueue(low, 5, 100).unwrap();
    scheduler.enqueue(high, 1, 200).unwrap();
    scheduler.enqueue(same_prio_later, 1, 50).unwrap();

    // priority 1 beats priority 5; within priority 1, earlier created_at_ms wins.
    assert_eq!(scheduler.next(), NextOutcome::Start(QueuedTask { task_id: same_prio_later, priority: 1, created_at_ms: 50 }));
}

#[test]
fn enqueue_rejects_duplicate_task() {
    let mut scheduler = Scheduler::new(2);
    let task = TaskId::new();
    scheduler.enqueue(task, 3, 0).unwrap();
    assert_eq!(scheduler.enqueue(task, 3, 0), Err(SchedulerError::AlreadyQueuedOrRunning(task)));
}

#[test]
fn cancel_queued_removes_without_scanning_error() {
    let mut scheduler = Scheduler::new(2);
    let a = TaskId::new();
    let b = TaskId::new();
    let c = TaskId::new();
    scheduler.enqueue(a, 3, 0).unwrap();
    scheduler.enqueue(b, 2, 0).unwrap();
    scheduler.enqueue(c, 1, 0).unwrap();

    assert!(scheduler.cancel_queued(b));
    assert!(!scheduler.cancel_queued(b), "second cancel of the same task is a no-op");

    assert_eq!(scheduler.next(), NextOutcome::Start(QueuedTask { task_id: c, priority: 1, created_at_ms: 0 }));
    assert_eq!(scheduler.next(), NextOutcome::Start(QueuedTask { task_id: a, priority: 3, created_at_ms: 0 }));
}

#[test]
fn saturated_queue_with_no_useful_preemption_returns_none() {
    let mut scheduler = Scheduler::new(1);
    let running = TaskId::new();
    scheduler.mark_running(running, 1);

    let waiting = TaskId::new();
    scheduler.enqueue(waiting, 3, 0).unwrap();

    assert_eq!(scheduler.next(), NextOutcome::None);
}

/// S5: max_parallel=2, tA/tB both priority 3 already running (tA inserted
/// first), enqueue tC at priority 1, `next()` preempts whichever running
/// task was inserted first (spec.md §8 S5).
#[test]
fn s5_higher_priority_arrival_preempts_earliest_running_task() {
    let mut scheduler = Scheduler::new(2);
    let t_a = TaskId::new();
    let t_b = TaskId::new();
    let t_c = TaskId::new();

    scheduler.mark_running(t_a, 3);
    scheduler.mark_running(t_b, 3);
    scheduler.enqueue(t_c, 1, 0).unwrap();

    match scheduler.next() {
        NextOutcome::Preempt { start, preempt_id } => {
            assert_eq!(start.task_id, t_c);
            assert_eq!(preempt_id, t_a, "tA was inserted into running before tB");
        }
        other => panic!("expected Preempt, got {other:?}"),
    }
}

#[test]
fn mark_complete_frees_a_running_slot() {
    let mut scheduler = Scheduler::new(1);
    let running = TaskId::new();
    scheduler.mark_running(running, 3);

    let waiting = TaskId::new();
    scheduler.enqueue(waiting, 3, 0).unwrap();
    assert_eq!(scheduler.next(), NextOutcome::None);

    scheduler.mark_complete(running);
    assert_eq!(scheduler.next(), NextOutcome::Start(QueuedTask { task_id: waiting, priority: 3, created_at_ms: 0 }));
}

#[test]
fn mark_paused_removes_from_running_without_requeueing() {
    let mut scheduler = Scheduler::new(1);
    let task = TaskId::new();
    scheduler.mark_running(task, 2);
    scheduler.mark_paused(task);

    assert!(!scheduler.is_running(task));
    assert!(!scheduler.is_queued(task));
}

#[test]
fn load_ready_and_running_tasks_reconstructs_state() {
    let mut scheduler = Scheduler::new(2);
    let ready = TaskId::new();
    let running = TaskId::new();

    scheduler.load_running_tasks(vec![(running, 2)]);
    scheduler.load_ready_tasks(vec![QueuedTask { task_id: ready, priority: 1, created_at_ms: 0 }]);

    assert!(scheduler.is_running(running));
    assert!(scheduler.is_queued(ready));
    assert_eq!(scheduler.running_count(), 1);
}

/// Property: |running| never exceeds max_parallel across a sequence of
/// enqueue/next/mark_running operations (spec.md §8 property 5).
#[test]
fn running_never_exceeds_max_parallel() {
    let max_parallel = 3;
    let mut scheduler = Scheduler::new(max_parallel);
    for i in 0..10u64 {
        scheduler.enqueue(TaskId::new(), 3, i).unwrap();
    }
    for _ in 0..10 {
        match scheduler.next() {
            NextOutcome::Start(task) => scheduler.mark_running(task.task_id, task.priority),
            NextOutcome::Preempt { start, preempt_id } => {
                scheduler.mark_paused(preempt_id);
                scheduler.mark_running(start.task_id, start.priority);
            }
            NextOutcome::None => break,
        }
        assert!(scheduler.running_count() <= max_parallel);
    }
}
