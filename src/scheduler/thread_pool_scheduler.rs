use futures::executor::ThreadPool;
use once_cell::sync::Lazy;
use tracing::{error, warn};

use super::{Duration, Instant, Scheduler, Task, TaskHandle};

static DEFAULT_POOL: Lazy<Option<ThreadPool>> = Lazy::new(|| {
  match ThreadPool::builder().name_prefix("rxbus-timer-").create() {
    Ok(pool) => Some(pool),
    Err(err) => {
      error!(error = %err, "failed to start the timer thread pool");
      None
    }
  }
});

/// Wall-clock scheduler backed by a `futures` thread pool.
///
/// `ThreadPoolScheduler::default()` shares one process-wide pool; use
/// [`with_pool`](Self::with_pool) to run timers on a pool of your own.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: Option<ThreadPool>,
}

impl Default for ThreadPoolScheduler {
  fn default() -> Self { Self { pool: DEFAULT_POOL.clone() } }
}

impl ThreadPoolScheduler {
  pub fn with_pool(pool: ThreadPool) -> Self { Self { pool: Some(pool) } }
}

impl Scheduler for ThreadPoolScheduler {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn schedule(&self, task: Task, delay: Duration) -> TaskHandle {
    let handle = task.handle();
    let Some(pool) = &self.pool else {
      warn!("no timer thread pool available, dropping scheduled task");
      return handle;
    };
    pool.spawn_ok(async move {
      if !delay.is_zero() {
        futures_time::task::sleep(delay.into()).await;
      }
      task.run();
    });
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc,
  };

  use super::*;
  use crate::scope::CancelScope;

  #[rxbus_macro::test]
  fn test_runs_after_delay() {
    let scheduler = ThreadPoolScheduler::default();
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    scheduler.schedule(
      Task::new(CancelScope::new(), move || {
        let _ = tx.send(Instant::now());
      }),
      Duration::from_millis(20),
    );

    let fired = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(fired - start >= Duration::from_millis(20));
  }

  #[rxbus_macro::test]
  fn test_cancelled_before_due_never_runs() {
    let pool = ThreadPool::new().unwrap();
    let scheduler = ThreadPoolScheduler::with_pool(pool);
    let hits = Arc::new(AtomicUsize::new(0));

    let c_hits = hits.clone();
    let handle = scheduler.schedule(
      Task::new(CancelScope::new(), move || {
        c_hits.fetch_add(1, Ordering::SeqCst);
      }),
      Duration::from_millis(50),
    );
    handle.cancel();

    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }
}
