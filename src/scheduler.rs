//! Schedulers: where and when deferred work runs.
//!
//! Time-based combinators (`debounce`, `throttle`) never spawn timers on their
//! own; they ask a [`Scheduler`] for the current time and hand it [`Task`]s to
//! run after a delay.
//!
//! - [`ThreadPoolScheduler`] runs tasks on a shared `futures` thread pool
//!   against the wall clock (feature `timer`).
//! - [`TestScheduler`] runs tasks against a virtual clock that only moves
//!   when a test advances it.

#[cfg(all(feature = "timer", not(target_arch = "wasm32")))]
mod thread_pool_scheduler;
mod test_scheduler;

use std::fmt::{Debug, Formatter};
pub use std::time::{Duration, Instant};

pub use test_scheduler::TestScheduler;
#[cfg(all(feature = "timer", not(target_arch = "wasm32")))]
pub use thread_pool_scheduler::ThreadPoolScheduler;

use crate::scope::CancelScope;

/// A source of time and a place to run delayed work.
///
/// Handles are cheap to clone; clones drive the same clock and queue.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// The scheduler's notion of the current instant.
  fn now(&self) -> Instant;

  /// Run `task` once `delay` has elapsed, unless its token is cancelled
  /// first.
  fn schedule(&self, task: Task, delay: Duration) -> TaskHandle;
}

/// A one-shot unit of deferred work guarded by a cancellation token.
pub struct Task {
  token: CancelScope,
  run: Box<dyn FnOnce() + Send>,
}

impl Task {
  pub fn new(token: CancelScope, run: impl FnOnce() + Send + 'static) -> Self {
    Self { token, run: Box::new(run) }
  }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }

  pub fn handle(&self) -> TaskHandle { TaskHandle { token: self.token.clone() } }

  /// Run the task unless its token was cancelled. Returns whether it ran.
  pub fn run(self) -> bool {
    if self.token.is_cancelled() {
      return false;
    }
    (self.run)();
    true
  }
}

impl Debug for Task {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Task")
      .field("cancelled", &self.is_cancelled())
      .finish_non_exhaustive()
  }
}

/// Handle to a scheduled [`Task`]. Cancelling it prevents the task from
/// running if it has not started yet.
#[derive(Clone, Debug)]
pub struct TaskHandle {
  token: CancelScope,
}

impl TaskHandle {
  #[inline]
  pub fn cancel(&self) { self.token.cancel() }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  };

  use super::*;

  #[rxbus_macro::test]
  fn task_skips_when_token_cancelled() {
    let ran = Arc::new(AtomicBool::new(false));
    let c_ran = ran.clone();
    let token = CancelScope::new();
    let task = Task::new(token.clone(), move || c_ran.store(true, Ordering::SeqCst));

    let handle = task.handle();
    handle.cancel();

    assert!(token.is_cancelled());
    assert!(!task.run());
    assert!(!ran.load(Ordering::SeqCst));
  }

  #[rxbus_macro::test]
  fn task_runs_once_when_live() {
    let ran = Arc::new(AtomicBool::new(false));
    let c_ran = ran.clone();
    let task = Task::new(CancelScope::new(), move || c_ran.store(true, Ordering::SeqCst));

    assert!(task.run());
    assert!(ran.load(Ordering::SeqCst));
  }
}
