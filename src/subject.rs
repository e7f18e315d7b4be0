//! Subjects: multicast nodes usable both as a value source and a value sink.
//!
//! A [`Subject`] wraps exactly one [`Observable`]; it *has* the registry and
//! exposes it through two call surfaces, the [`Subscribable`] side and the
//! [`Observer`] side. The specialised subjects layer their replay state on
//! top of the same single registry.

mod async_subject;
mod behavior_subject;
mod replay_subject;
pub(crate) mod subscribers;

pub use async_subject::AsyncSubject;
pub use behavior_subject::BehaviorSubject;
pub use replay_subject::ReplaySubject;

use crate::{
  error::{ObserverError, RxError},
  observable::{sealed::Node, Observable, Subscribable},
  observer::Observer,
  scope::CancelScope,
};

/// Subject: a hot observable that can also be fed as an observer.
///
/// Late subscribers only see values emitted after they subscribed.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use rxbus::prelude::*;
///
/// let upstream = Subject::<i32>::new();
/// let relay = Subject::<i32>::new();
/// let seen = Arc::new(Mutex::new(vec![]));
///
/// // a subject is an observer, so it can sit inside a pipeline
/// upstream.subscribe_with("relay", relay.clone()).unwrap();
/// let c_seen = seen.clone();
/// relay
///   .subscribe("sink", move |v| {
///     c_seen.lock().unwrap().push(v);
///     Ok(())
///   })
///   .unwrap();
///
/// upstream.next(1).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![1]);
/// ```
pub struct Subject<T> {
  observable: Observable<T>,
}

impl<T> Clone for Subject<T> {
  fn clone(&self) -> Self { Self { observable: self.observable.clone() } }
}

impl<T: Clone + Send + 'static> Default for Subject<T> {
  fn default() -> Self { Self::new() }
}

impl<T: Clone + Send + 'static> Subject<T> {
  pub fn new() -> Self { Self { observable: Observable::new() } }

  /// Create a subject whose scope is a child of `parent`.
  pub fn with_parent(parent: &CancelScope) -> Self {
    Self { observable: Observable::with_parent(parent) }
  }

  /// Emit `value` to every registered observer. See [`Observable::next`].
  #[inline]
  pub fn next(&self, value: T) -> Result<(), RxError> { self.observable.next(value) }

  /// Close the subject. Idempotent.
  #[inline]
  pub fn close(&self) { self.observable.close() }

  /// The observable side of this subject; shares the same registry.
  #[inline]
  pub fn as_observable(&self) -> &Observable<T> { &self.observable }
}

impl<T: Clone + Send + 'static> Node<T> for Subject<T> {
  #[inline]
  fn observable(&self) -> &Observable<T> { &self.observable }
}

impl<T: Clone + Send + 'static> Subscribable<T> for Subject<T> {}

impl<T: Clone + Send + 'static> Observer<T> for Subject<T> {
  fn next(&self, value: T) -> Result<(), ObserverError> {
    Subject::next(self, value).map_err(ObserverError::from)
  }
}
