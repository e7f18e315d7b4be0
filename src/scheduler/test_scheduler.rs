//! Test Scheduler for deterministic testing of time-based combinators.
//!
//! Provides virtual time that only advances when explicitly instructed,
//! enabling deterministic testing of `debounce` and `throttle`.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxbus::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! let source = Subject::<i32>::new();
//! let debounced = source.debounce(Duration::from_millis(50), scheduler.clone());
//!
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! debounced
//!   .subscribe("sink", move |v| {
//!     c_seen.lock().unwrap().push(v);
//!     Ok(())
//!   })
//!   .unwrap();
//!
//! source.next(1).unwrap();
//! source.next(2).unwrap();
//! scheduler.advance_by(Duration::from_millis(50));
//! assert_eq!(*seen.lock().unwrap(), vec![2]);
//! ```
//!
//! # Sharing
//!
//! Clones of a `TestScheduler` share one virtual clock and one task queue.
//! Independent `TestScheduler::new()` instances are fully isolated, so tests
//! running in parallel never observe each other's time.

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use parking_lot::Mutex;
use tracing::trace;

use super::{Duration, Instant, Scheduler, Task, TaskHandle};

// ==================== Internal State ====================

struct TestSchedulerState {
  origin: Instant,
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  task: Task,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

// ==================== TestScheduler ====================

/// A virtual time scheduler for deterministic testing.
#[derive(Clone)]
pub struct TestScheduler {
  state: Arc<Mutex<TestSchedulerState>>,
}

impl Default for TestScheduler {
  fn default() -> Self { Self::new() }
}

impl TestScheduler {
  /// Create a scheduler whose virtual clock starts at zero elapsed time.
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(TestSchedulerState {
        origin: Instant::now(),
        virtual_time: Duration::ZERO,
        task_queue: BinaryHeap::new(),
        next_task_id: 0,
      })),
    }
  }

  /// Virtual time elapsed since the scheduler was created.
  pub fn elapsed(&self) -> Duration { self.state.lock().virtual_time }

  /// Number of queued tasks that have not been cancelled.
  pub fn pending_count(&self) -> usize {
    self
      .state
      .lock()
      .task_queue
      .iter()
      .filter(|t| !t.task.is_cancelled())
      .count()
  }

  /// Check if there are no live pending tasks.
  pub fn is_empty(&self) -> bool { self.pending_count() == 0 }

  fn execute_tasks_until(&self, target_time: Option<Duration>) {
    loop {
      let task = {
        let mut state = self.state.lock();

        // Check if we should stop (no tasks or past target time)
        let should_stop = state
          .task_queue
          .peek()
          .is_none_or(|peek| target_time.is_some_and(|limit| peek.scheduled_time > limit));
        if should_stop {
          return;
        }

        let Some(scheduled_task) = state.task_queue.pop() else { return };
        if state.virtual_time < scheduled_task.scheduled_time {
          state.virtual_time = scheduled_task.scheduled_time;
        }
        scheduled_task
      };

      // the lock is released: the task may schedule more work
      let ScheduledTask { task_id, task, .. } = task;
      let ran = task.run();
      trace!(task_id, ran, "test scheduler task");
    }
  }

  /// Advance virtual time by `duration` and execute due tasks.
  ///
  /// Tasks are executed in order of their scheduled time, with FIFO ordering
  /// for tasks scheduled at the same time. Tasks scheduled by a running task
  /// execute in the same call if they fall due before the target time.
  pub fn advance_by(&self, duration: Duration) {
    let target_time = self.state.lock().virtual_time + duration;

    self.execute_tasks_until(Some(target_time));

    self.state.lock().virtual_time = target_time;
  }

  /// Execute all pending tasks by advancing time to each task's scheduled
  /// time.
  pub fn flush(&self) { self.execute_tasks_until(None); }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> Instant {
    let state = self.state.lock();
    state.origin + state.virtual_time
  }

  fn schedule(&self, task: Task, delay: Duration) -> TaskHandle {
    let handle = task.handle();
    let mut state = self.state.lock();
    let scheduled_time = state.virtual_time + delay;
    let task_id = state.next_task_id;
    state.next_task_id += 1;
    state.task_queue.push(ScheduledTask { scheduled_time, task_id, task });
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex as StdMutex;

  use super::*;
  use crate::scope::CancelScope;

  fn record(
    scheduler: &TestScheduler, log: &Arc<StdMutex<Vec<&'static str>>>, name: &'static str,
    delay_ms: u64,
  ) -> TaskHandle {
    let c_log = log.clone();
    scheduler.schedule(
      Task::new(CancelScope::new(), move || c_log.lock().unwrap().push(name)),
      Duration::from_millis(delay_ms),
    )
  }

  #[rxbus_macro::test]
  fn test_starts_at_zero() {
    let scheduler = TestScheduler::new();
    assert_eq!(scheduler.elapsed(), Duration::ZERO);
    assert!(scheduler.is_empty());

    let start = scheduler.now();
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(scheduler.now() - start, Duration::from_millis(100));
  }

  #[rxbus_macro::test]
  fn test_advance_runs_only_due_tasks() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(StdMutex::new(vec![]));
    record(&scheduler, &log, "late", 100);
    record(&scheduler, &log, "early", 10);

    scheduler.advance_by(Duration::from_millis(50));
    assert_eq!(*log.lock().unwrap(), vec!["early"]);
    assert_eq!(scheduler.pending_count(), 1);

    scheduler.advance_by(Duration::from_millis(50));
    assert_eq!(*log.lock().unwrap(), vec!["early", "late"]);
    assert!(scheduler.is_empty());
  }

  #[rxbus_macro::test]
  fn test_same_time_is_fifo() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(StdMutex::new(vec![]));
    record(&scheduler, &log, "first", 5);
    record(&scheduler, &log, "second", 5);

    scheduler.flush();
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(scheduler.elapsed(), Duration::from_millis(5));
  }

  #[rxbus_macro::test]
  fn test_cancelled_task_is_skipped() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(StdMutex::new(vec![]));
    let handle = record(&scheduler, &log, "cancelled", 10);
    handle.cancel();

    assert_eq!(scheduler.pending_count(), 0);
    scheduler.advance_by(Duration::from_millis(20));
    assert!(log.lock().unwrap().is_empty());
  }

  #[rxbus_macro::test]
  fn test_task_can_schedule_more_work() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(StdMutex::new(vec![]));

    let c_scheduler = scheduler.clone();
    let c_log = log.clone();
    scheduler.schedule(
      Task::new(CancelScope::new(), move || {
        c_log.lock().unwrap().push("outer");
        let c_log = c_log.clone();
        c_scheduler.schedule(
          Task::new(CancelScope::new(), move || c_log.lock().unwrap().push("inner")),
          Duration::from_millis(10),
        );
      }),
      Duration::from_millis(10),
    );

    scheduler.advance_by(Duration::from_millis(15));
    assert_eq!(*log.lock().unwrap(), vec!["outer"]);
    scheduler.advance_by(Duration::from_millis(5));
    assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
  }
}
