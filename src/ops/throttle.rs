use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use super::{derive, emit};
use crate::{
  observable::{Observable, Subscribable},
  scheduler::Scheduler,
};

pub(crate) fn throttle<T, S, SD>(source: &S, duration: Duration, scheduler: SD) -> Observable<T>
where
  T: Clone + Send + 'static,
  S: Subscribable<T>,
  SD: Scheduler,
{
  let last_emit: Mutex<Option<Instant>> = Mutex::new(None);

  derive("throttle", source, move |derived: &Observable<T>, value| {
    let now = scheduler.now();
    let open = {
      let mut last_emit = last_emit.lock();
      let open = (*last_emit).is_none_or(|last| now.saturating_duration_since(last) >= duration);
      if open {
        *last_emit = Some(now);
      }
      open
    };
    if open {
      emit(derived, value)
    } else {
      trace!("throttled value dropped");
      Ok(())
    }
  })
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex as StdMutex};

  use crate::{prelude::*, scheduler::TestScheduler};

  #[rxbus_macro::test]
  fn test_leading_edge() {
    let scheduler = TestScheduler::new();
    let source = Subject::<i32>::new();
    let throttled = source.throttle(Duration::from_millis(50), scheduler.clone());

    let seen = Arc::new(StdMutex::new(vec![]));
    let c_seen = seen.clone();
    throttled
      .subscribe("sink", move |v| {
        c_seen.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap();

    source.next(1).unwrap();
    scheduler.advance_by(Duration::from_millis(10));
    source.next(2).unwrap();
    scheduler.advance_by(Duration::from_millis(50));
    source.next(3).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
  }

  #[rxbus_macro::test]
  fn test_window_is_measured_from_last_emission() {
    let scheduler = TestScheduler::new();
    let source = Subject::<i32>::new();
    let throttled = source.throttle(Duration::from_millis(50), scheduler.clone());

    let seen = Arc::new(StdMutex::new(vec![]));
    let c_seen = seen.clone();
    throttled
      .subscribe("sink", move |v| {
        c_seen.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap();

    // t=0 emitted; t=40 dropped; t=50 emitted; t=90 dropped; t=100 emitted
    for (at, v) in [(0, 1), (40, 2), (50, 3), (90, 4), (100, 5)] {
      let now = scheduler.elapsed();
      scheduler.advance_by(Duration::from_millis(at) - now);
      source.next(v).unwrap();
    }

    assert_eq!(*seen.lock().unwrap(), vec![1, 3, 5]);
  }
}
