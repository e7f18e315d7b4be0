use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  error::{DispatchFailure, ObserverError, RxError},
  observable::{sealed::Node, Observable, Subscribable},
  observer::{Observer, ObserverRef},
  scope::CancelScope,
  subject::Subject,
};

struct BehaviorState<T> {
  value: T,
  // bumped by every stored value
  version: u64,
}

/// A subject that always holds a current value.
///
/// The value is seeded at construction and replaced by every `next`. New
/// subscribers receive the current value synchronously before they are
/// registered for future values.
///
/// A `next` racing with a `subscribe` on another thread is never lost: if a
/// value is stored while the initial delivery runs, the subscriber receives
/// that value too before it is registered. The guarantee for the current
/// value is at-least-once, not exactly-once.
pub struct BehaviorSubject<T> {
  subject: Subject<T>,
  state: Arc<Mutex<BehaviorState<T>>>,
}

impl<T> Clone for BehaviorSubject<T> {
  fn clone(&self) -> Self { Self { subject: self.subject.clone(), state: self.state.clone() } }
}

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
  #[inline]
  pub fn new(initial: T) -> Self { Self::from_subject(Subject::new(), initial) }

  pub fn with_parent(initial: T, parent: &CancelScope) -> Self {
    Self::from_subject(Subject::with_parent(parent), initial)
  }

  fn from_subject(subject: Subject<T>, initial: T) -> Self {
    Self { subject, state: Arc::new(Mutex::new(BehaviorState { value: initial, version: 0 })) }
  }

  /// The current value.
  #[inline]
  pub fn value(&self) -> T { self.state.lock().value.clone() }

  /// Store `value` as the current value, then emit it.
  ///
  /// The value is stored before any observer runs, so an observer reading
  /// [`value`](Self::value) from inside its callback sees the new value.
  pub fn next(&self, value: T) -> Result<(), RxError> {
    let observable = self.subject.as_observable();
    let snapshot = {
      let mut state = self.state.lock();
      let snapshot = observable.snapshot()?;
      state.value = value.clone();
      state.version += 1;
      snapshot
    };
    observable.dispatch(snapshot, value)
  }

  #[inline]
  pub fn close(&self) { self.subject.close() }
}

impl<T: Clone + Send + 'static> Node<T> for BehaviorSubject<T> {
  #[inline]
  fn observable(&self) -> &Observable<T> { self.subject.as_observable() }
}

impl<T: Clone + Send + 'static> Subscribable<T> for BehaviorSubject<T> {
  fn subscribe_ref(&self, id: String, observer: ObserverRef<T>) -> Result<(), RxError> {
    let (mut current, mut delivered) = {
      let state = self.state.lock();
      (state.value.clone(), state.version)
    };
    loop {
      if self.is_closed() {
        return Err(RxError::Closed);
      }
      if let Err(source) = observer.next(current) {
        return Err(RxError::Dispatch(vec![DispatchFailure::new(id, source)]));
      }
      let state = self.state.lock();
      if state.version == delivered {
        return self.observable().register(id, observer);
      }
      // stored meanwhile, and dispatched to a snapshot without this observer
      current = state.value.clone();
      delivered = state.version;
    }
  }
}

impl<T: Clone + Send + 'static> Observer<T> for BehaviorSubject<T> {
  fn next(&self, value: T) -> Result<(), ObserverError> {
    BehaviorSubject::next(self, value).map_err(ObserverError::from)
  }
}
