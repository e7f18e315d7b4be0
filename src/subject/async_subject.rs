use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
  error::{DispatchFailure, ObserverError, RxError},
  observable::{sealed::Node, Observable, Subscribable},
  observer::{Observer, ObserverRef},
  scope::CancelScope,
  subject::Subject,
};

struct AsyncState<T> {
  last: Option<T>,
  completed: bool,
  completions: u64,
}

/// A subject that only emits its last value, and only on completion.
///
/// `next` stores the value without emitting. `complete` marks the subject
/// completed and emits the stored value, if any, to every current
/// subscriber. Subscribers arriving after completion receive the stored value
/// immediately.
///
/// Calling `complete` again emits the stored value again. Values passed to
/// `next` after completion replace the stored value silently.
pub struct AsyncSubject<T> {
  subject: Subject<T>,
  state: Arc<Mutex<AsyncState<T>>>,
}

impl<T> Clone for AsyncSubject<T> {
  fn clone(&self) -> Self { Self { subject: self.subject.clone(), state: self.state.clone() } }
}

impl<T: Clone + Send + 'static> Default for AsyncSubject<T> {
  fn default() -> Self { Self::new() }
}

impl<T: Clone + Send + 'static> AsyncSubject<T> {
  pub fn new() -> Self { Self::from_subject(Subject::new()) }

  pub fn with_parent(parent: &CancelScope) -> Self { Self::from_subject(Subject::with_parent(parent)) }

  fn from_subject(subject: Subject<T>) -> Self {
    Self { subject, state: Arc::new(Mutex::new(AsyncState { last: None, completed: false, completions: 0 })) }
  }

  /// Store `value` as the pending last value. Never emits.
  pub fn next(&self, value: T) -> Result<(), RxError> {
    if self.is_closed() {
      return Err(RxError::Closed);
    }
    self.state.lock().last = Some(value);
    Ok(())
  }

  /// Mark the subject completed and emit the stored value, if any.
  pub fn complete(&self) -> Result<(), RxError> {
    let observable = self.subject.as_observable();
    let (snapshot, last) = {
      let mut state = self.state.lock();
      let snapshot = observable.snapshot()?;
      if state.completed {
        debug!("async subject completed again, re-emitting stored value");
      }
      state.completed = true;
      state.completions += 1;
      (snapshot, state.last.clone())
    };
    match last {
      Some(value) => observable.dispatch(snapshot, value),
      None => Ok(()),
    }
  }

  #[inline]
  pub fn is_completed(&self) -> bool { self.state.lock().completed }

  /// The stored last value.
  #[inline]
  pub fn value(&self) -> Option<T> { self.state.lock().last.clone() }

  #[inline]
  pub fn close(&self) { self.subject.close() }
}

impl<T: Clone + Send + 'static> Node<T> for AsyncSubject<T> {
  #[inline]
  fn observable(&self) -> &Observable<T> { self.subject.as_observable() }
}

impl<T: Clone + Send + 'static> Subscribable<T> for AsyncSubject<T> {
  fn subscribe_ref(&self, id: String, observer: ObserverRef<T>) -> Result<(), RxError> {
    let (mut pending, mut delivered) = {
      let state = self.state.lock();
      (if state.completed { state.last.clone() } else { None }, state.completions)
    };
    loop {
      if self.is_closed() {
        return Err(RxError::Closed);
      }
      if let Some(value) = pending {
        if let Err(source) = observer.next(value) {
          return Err(RxError::Dispatch(vec![DispatchFailure::new(id, source)]));
        }
      }
      let state = self.state.lock();
      if state.completions == delivered {
        return self.observable().register(id, observer);
      }
      // completed meanwhile, before this observer was registered
      pending = state.last.clone();
      delivered = state.completions;
    }
  }
}

impl<T: Clone + Send + 'static> Observer<T> for AsyncSubject<T> {
  fn next(&self, value: T) -> Result<(), ObserverError> {
    AsyncSubject::next(self, value).map_err(ObserverError::from)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex as StdMutex;

  use super::*;

  fn collect(subject: &AsyncSubject<i32>, id: &str) -> Arc<StdMutex<Vec<i32>>> {
    let results = Arc::new(StdMutex::new(vec![]));
    let c_results = results.clone();
    subject
      .subscribe(id, move |v| {
        c_results.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap();
    results
  }

  #[rxbus_macro::test]
  fn test_emits_last_value_on_complete() {
    let subject = AsyncSubject::new();
    subject.next(1).unwrap();
    subject.next(2).unwrap();
    subject.next(3).unwrap();

    let early = collect(&subject, "early");
    let other = collect(&subject, "other");
    assert!(early.lock().unwrap().is_empty());

    subject.complete().unwrap();
    assert!(subject.is_completed());
    assert_eq!(*early.lock().unwrap(), vec![3]);
    assert_eq!(*other.lock().unwrap(), vec![3]);

    let late = collect(&subject, "late");
    assert_eq!(*late.lock().unwrap(), vec![3]);
  }

  #[rxbus_macro::test]
  fn test_complete_without_value_emits_nothing() {
    let subject = AsyncSubject::new();
    let results = collect(&subject, "a");
    subject.complete().unwrap();
    assert!(results.lock().unwrap().is_empty());

    let late = collect(&subject, "late");
    assert!(late.lock().unwrap().is_empty());
  }

  #[rxbus_macro::test]
  fn test_second_complete_emits_again() {
    let subject = AsyncSubject::new();
    let results = collect(&subject, "a");
    subject.next(9).unwrap();
    subject.complete().unwrap();
    subject.complete().unwrap();
    assert_eq!(*results.lock().unwrap(), vec![9, 9]);
  }

  #[rxbus_macro::test]
  fn test_next_after_complete_updates_silently() {
    let subject = AsyncSubject::new();
    let results = collect(&subject, "a");
    subject.next(1).unwrap();
    subject.complete().unwrap();
    subject.next(2).unwrap();

    assert_eq!(*results.lock().unwrap(), vec![1]);
    assert_eq!(subject.value(), Some(2));
    assert_eq!(*collect(&subject, "late").lock().unwrap(), vec![2]);
  }

  #[rxbus_macro::test]
  fn test_completion_during_late_delivery_is_not_lost() {
    let subject = AsyncSubject::new();
    subject.next(1).unwrap();
    subject.complete().unwrap();

    let results = Arc::new(StdMutex::new(vec![]));
    let c_subject = subject.clone();
    let c_results = results.clone();
    subject
      .subscribe("late", move |v| {
        c_results.lock().unwrap().push(v);
        if v == 1 {
          let other = c_subject.clone();
          std::thread::spawn(move || {
            other.next(2)?;
            other.complete()
          })
          .join()
          .unwrap()?;
        }
        Ok(())
      })
      .unwrap();

    assert_eq!(*results.lock().unwrap(), vec![1, 2]);
    assert_eq!(subject.observer_count(), 1);
  }

  #[rxbus_macro::test]
  fn test_closed() {
    let subject = AsyncSubject::<i32>::new();
    subject.close();
    assert!(subject.next(1).unwrap_err().is_closed());
    assert!(subject.complete().unwrap_err().is_closed());
  }
}
