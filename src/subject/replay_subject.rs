use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{
  error::{DispatchFailure, ObserverError, RxError},
  observable::{sealed::Node, Observable, Subscribable},
  observer::{Observer, ObserverRef},
  scope::CancelScope,
  subject::Subject,
};

struct ReplayState<T> {
  buffer: VecDeque<T>,
  // total number of values ever pushed
  pushed: u64,
}

/// A subject that replays up to `buffer_size` past values to new subscribers.
///
/// The buffer is a FIFO: once full, each `next` evicts the single oldest
/// entry. Replay happens in insertion order, before the subscriber is
/// registered. If a replayed delivery fails, `subscribe` returns the error
/// and the observer is not registered; values replayed before the failure
/// stay delivered.
///
/// Values pushed by a concurrent `next` while the replay runs are replayed
/// as well, as long as they are still buffered.
pub struct ReplaySubject<T> {
  subject: Subject<T>,
  state: Arc<Mutex<ReplayState<T>>>,
  buffer_size: usize,
}

impl<T> Clone for ReplaySubject<T> {
  fn clone(&self) -> Self {
    Self { subject: self.subject.clone(), state: self.state.clone(), buffer_size: self.buffer_size }
  }
}

impl<T: Clone + Send + 'static> ReplaySubject<T> {
  pub fn new(buffer_size: usize) -> Self { Self::from_subject(Subject::new(), buffer_size) }

  pub fn with_parent(buffer_size: usize, parent: &CancelScope) -> Self {
    Self::from_subject(Subject::with_parent(parent), buffer_size)
  }

  fn from_subject(subject: Subject<T>, buffer_size: usize) -> Self {
    let state = ReplayState { buffer: VecDeque::with_capacity(buffer_size), pushed: 0 };
    Self { subject, state: Arc::new(Mutex::new(state)), buffer_size }
  }

  /// Record `value` in the replay buffer, then emit it.
  pub fn next(&self, value: T) -> Result<(), RxError> {
    let observable = self.subject.as_observable();
    let snapshot = {
      let mut state = self.state.lock();
      let snapshot = observable.snapshot()?;
      state.buffer.push_back(value.clone());
      if state.buffer.len() > self.buffer_size {
        state.buffer.pop_front();
      }
      state.pushed += 1;
      snapshot
    };
    observable.dispatch(snapshot, value)
  }

  /// A copy of the replay buffer, oldest first.
  pub fn buffer(&self) -> Vec<T> { self.state.lock().buffer.iter().cloned().collect() }

  #[inline]
  pub fn buffer_size(&self) -> usize { self.buffer_size }

  #[inline]
  pub fn close(&self) { self.subject.close() }
}

impl<T: Clone + Send + 'static> Node<T> for ReplaySubject<T> {
  #[inline]
  fn observable(&self) -> &Observable<T> { self.subject.as_observable() }
}

impl<T: Clone + Send + 'static> Subscribable<T> for ReplaySubject<T> {
  fn subscribe_ref(&self, id: String, observer: ObserverRef<T>) -> Result<(), RxError> {
    let (mut pending, mut delivered) = {
      let state = self.state.lock();
      (state.buffer.iter().cloned().collect::<Vec<_>>(), state.pushed)
    };
    loop {
      if self.is_closed() {
        return Err(RxError::Closed);
      }
      for value in pending {
        if let Err(source) = observer.next(value) {
          return Err(RxError::Dispatch(vec![DispatchFailure::new(id, source)]));
        }
      }
      let state = self.state.lock();
      if state.pushed == delivered {
        return self.observable().register(id, observer);
      }
      let missed = usize::try_from(state.pushed - delivered)
        .unwrap_or(usize::MAX)
        .min(state.buffer.len());
      pending = state
        .buffer
        .iter()
        .skip(state.buffer.len() - missed)
        .cloned()
        .collect();
      delivered = state.pushed;
    }
  }
}

impl<T: Clone + Send + 'static> Observer<T> for ReplaySubject<T> {
  fn next(&self, value: T) -> Result<(), ObserverError> {
    ReplaySubject::next(self, value).map_err(ObserverError::from)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex as StdMutex;

  use super::*;

  #[rxbus_macro::test]
  fn test_buffer_evicts_oldest() {
    let subject = ReplaySubject::new(2);
    subject.next(1).unwrap();
    subject.next(2).unwrap();
    subject.next(3).unwrap();

    assert_eq!(subject.buffer(), vec![2, 3]);

    let results = Arc::new(StdMutex::new(vec![]));
    let c_results = results.clone();
    subject
      .subscribe("late", move |v| {
        c_results.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap();
    assert_eq!(*results.lock().unwrap(), vec![2, 3]);

    subject.next(4).unwrap();
    assert_eq!(*results.lock().unwrap(), vec![2, 3, 4]);
    assert_eq!(subject.buffer(), vec![3, 4]);
  }

  #[rxbus_macro::test]
  fn test_buffer_is_a_copy() {
    let subject = ReplaySubject::new(3);
    subject.next(1).unwrap();
    let mut copy = subject.buffer();
    copy.push(99);
    assert_eq!(subject.buffer(), vec![1]);
  }

  #[rxbus_macro::test]
  fn test_zero_sized_buffer_replays_nothing() {
    let subject = ReplaySubject::new(0);
    subject.next(1).unwrap();
    assert!(subject.buffer().is_empty());
  }

  #[rxbus_macro::test]
  fn test_failed_replay_keeps_partial_delivery() {
    let subject = ReplaySubject::new(3);
    for v in 1..=3 {
      subject.next(v).unwrap();
    }

    let results = Arc::new(StdMutex::new(vec![]));
    let c_results = results.clone();
    let err = subject
      .subscribe("stops-at-two", move |v| {
        if v == 2 {
          return Err("cannot take 2".into());
        }
        c_results.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap_err();

    assert_eq!(err.failed_ids(), vec!["stops-at-two"]);
    assert_eq!(*results.lock().unwrap(), vec![1]);
    assert_eq!(subject.observer_count(), 0);
  }

  #[rxbus_macro::test]
  fn test_values_pushed_during_replay_are_replayed() {
    let subject = ReplaySubject::new(3);
    subject.next(1).unwrap();

    let results = Arc::new(StdMutex::new(vec![]));
    let c_subject = subject.clone();
    let c_results = results.clone();
    subject
      .subscribe("late", move |v| {
        c_results.lock().unwrap().push(v);
        if v == 1 {
          let other = c_subject.clone();
          std::thread::spawn(move || other.next(2)).join().unwrap()?;
        }
        Ok(())
      })
      .unwrap();

    assert_eq!(*results.lock().unwrap(), vec![1, 2]);
    subject.next(3).unwrap();
    assert_eq!(*results.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(subject.buffer(), vec![1, 2, 3]);
  }

  #[rxbus_macro::test]
  fn test_closed_rejects_next_and_subscribe() {
    let subject = ReplaySubject::new(2);
    subject.next(1).unwrap();
    subject.close();

    assert!(subject.next(2).unwrap_err().is_closed());
    assert_eq!(subject.buffer(), vec![1]);
    assert!(subject
      .subscribe("late", |_| Ok(()))
      .unwrap_err()
      .is_closed());
  }
}
