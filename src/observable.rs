//! The multicast core.
//!
//! [`Observable`] owns exactly one registry of named observers, a closed flag
//! and a [`CancelScope`]. Every other node in the crate (subjects, the event
//! bus channels, combinator outputs) is built on top of it, so the dispatch
//! rules live in one place:
//!
//! - no lock is held while user callbacks run; `next` snapshots the registry,
//!   releases the lock and dispatches against the snapshot, so observers may
//!   `subscribe`, `unsubscribe` or `next` on the same node from inside their
//!   callback, or hand work to another thread that does;
//! - one failing observer never stops delivery to the others;
//! - cancelling the scope mid-dispatch skips the observers not reached yet.
//!
//! Calls made from one thread are dispatched in call order. Dispatches from
//! different threads may interleave.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
  error::{DispatchFailure, ObserverError, RxError},
  observer::{Observer, ObserverRef},
  scope::CancelScope,
  subject::subscribers::{Snapshot, Subscribers},
};

// ============================================================================
// Subscribable Trait
// ============================================================================

pub(crate) mod sealed {
  use super::Observable;

  /// Access to the multicast core of a node. Crate-private so callers cannot
  /// bypass a subject's own `next`/`subscribe` bookkeeping.
  pub trait Node<T: Clone + Send + 'static> {
    fn observable(&self) -> &Observable<T>;
  }
}

use sealed::Node;

/// Anything observers can be attached to.
///
/// Nodes that deliver something at subscription time (behavior, replay and
/// async subjects) override [`subscribe_ref`](Subscribable::subscribe_ref).
///
/// The backing [`Observable`] of a subject is not reachable through this
/// trait, so its cached value or replay buffer cannot be skipped:
///
/// ```compile_fail
/// use rxbus::prelude::*;
///
/// let subject = BehaviorSubject::new(1);
/// subject.observable().next(2).unwrap();
/// ```
pub trait Subscribable<T: Clone + Send + 'static>: Node<T> {
  /// Register a type-erased observer under `id`, replacing any observer
  /// already registered under it.
  fn subscribe_ref(&self, id: String, observer: ObserverRef<T>) -> Result<(), RxError> {
    self.observable().register(id, observer)
  }

  /// Register a closure observer under `id`.
  fn subscribe<F>(&self, id: impl Into<String>, observer: F) -> Result<(), RxError>
  where
    Self: Sized,
    F: Fn(T) -> Result<(), ObserverError> + Send + Sync + 'static,
  {
    self.subscribe_ref(id.into(), Arc::new(observer))
  }

  /// Register any [`Observer`] implementation under `id`.
  fn subscribe_with<O>(&self, id: impl Into<String>, observer: O) -> Result<(), RxError>
  where
    Self: Sized,
    O: Observer<T> + 'static,
  {
    self.subscribe_ref(id.into(), Arc::new(observer))
  }

  /// Remove the observer registered under `id`. Unknown ids are ignored.
  fn unsubscribe(&self, id: &str) { self.observable().remove(id) }

  #[inline]
  fn scope(&self) -> &CancelScope { &self.observable().inner.scope }

  #[inline]
  fn is_closed(&self) -> bool { self.observable().inner.subscribers.lock().is_closed() }

  #[inline]
  fn observer_count(&self) -> usize { self.observable().inner.subscribers.lock().len() }
}

// ============================================================================
// Observable
// ============================================================================

/// Base multicast primitive: a registry of named observers plus an
/// emit/close lifecycle.
///
/// `Observable` is a handle; clones share the same registry. Dropping the
/// last handle cancels the node's scope.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use rxbus::prelude::*;
///
/// let source = Observable::<i32>::new();
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
///
/// source
///   .subscribe("collector", move |v| {
///     c_seen.lock().unwrap().push(v);
///     Ok(())
///   })
///   .unwrap();
///
/// source.next(1).unwrap();
/// source.close();
/// assert!(source.next(2).unwrap_err().is_closed());
/// assert_eq!(*seen.lock().unwrap(), vec![1]);
/// ```
pub struct Observable<T> {
  inner: Arc<Inner<T>>,
}

struct Inner<T> {
  subscribers: Mutex<Subscribers<T>>,
  scope: CancelScope,
}

impl<T> Drop for Inner<T> {
  fn drop(&mut self) { self.scope.cancel(); }
}

/// A non-owning handle to an [`Observable`].
pub struct WeakObservable<T> {
  inner: Weak<Inner<T>>,
}

impl<T> Clone for Observable<T> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T> Clone for WeakObservable<T> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T> WeakObservable<T> {
  pub fn upgrade(&self) -> Option<Observable<T>> {
    self.inner.upgrade().map(|inner| Observable { inner })
  }
}

impl<T> Observable<T> {
  pub fn downgrade(&self) -> WeakObservable<T> {
    WeakObservable { inner: Arc::downgrade(&self.inner) }
  }

  pub(crate) fn remove(&self, id: &str) {
    let removed = {
      let mut subscribers = self.inner.subscribers.lock();
      let removed = subscribers.remove(id);
      if removed.is_some() {
        trace!(id = %id, observers = subscribers.len(), "unsubscribed");
      }
      removed
    };
    drop(removed);
  }
}

impl<T: Clone + Send + 'static> Default for Observable<T> {
  fn default() -> Self { Self::new() }
}

impl<T: Clone + Send + 'static> Observable<T> {
  /// Create an observable with a fresh root scope.
  pub fn new() -> Self { Self::with_scope(CancelScope::new()) }

  /// Create an observable whose scope is a child of `parent`.
  pub fn with_parent(parent: &CancelScope) -> Self { Self::with_scope(parent.child()) }

  /// Create an observable that owns `scope`.
  ///
  /// Once `scope` is cancelled, by `close` or by any ancestor, the node is
  /// closed. An already cancelled scope yields a closed observable.
  pub(crate) fn with_scope(scope: CancelScope) -> Self {
    let inner = Arc::new(Inner { subscribers: Mutex::new(Subscribers::default()), scope });
    let weak = Arc::downgrade(&inner);
    inner.scope.on_cancel(move || {
      if let Some(inner) = weak.upgrade() {
        let dropped = inner.subscribers.lock().close();
        drop(dropped);
      }
    });
    Self { inner }
  }

  /// Emit `value` to every currently registered observer.
  ///
  /// # Errors
  ///
  /// - [`RxError::Closed`] if the observable is closed; nobody is invoked.
  /// - [`RxError::Cancelled`] if the scope was cancelled before or during
  ///   dispatch. Observers reached before the cancellation keep their
  ///   delivery, the rest are skipped.
  /// - [`RxError::Dispatch`] if one or more observers failed. Every other
  ///   observer was still invoked.
  pub fn next(&self, value: T) -> Result<(), RxError> {
    let snapshot = self.snapshot()?;
    self.dispatch(snapshot, value)
  }

  /// Close the observable: drop every observer and cancel the scope.
  ///
  /// Idempotent; repeated calls have no effect.
  pub fn close(&self) {
    let dropped = self.inner.subscribers.lock().close();
    if let Some(dropped) = dropped {
      debug!(observers = dropped.len(), "observable closed");
    }
    self.inner.scope.cancel();
  }

  pub(crate) fn register(&self, id: String, observer: ObserverRef<T>) -> Result<(), RxError> {
    let mut subscribers = self.inner.subscribers.lock();
    if subscribers.is_closed() {
      return Err(RxError::Closed);
    }
    let replaced = subscribers.insert(id.clone(), observer);
    trace!(id = %id, replaced, observers = subscribers.len(), "subscribed");
    Ok(())
  }

  /// The observers a `next` issued now would reach.
  ///
  /// Subjects take the snapshot while holding their own state lock, so the
  /// state update and the set of observers it reaches stay consistent with a
  /// concurrent `subscribe`.
  pub(crate) fn snapshot(&self) -> Result<Snapshot<T>, RxError> {
    let subscribers = self.inner.subscribers.lock();
    if subscribers.is_closed() {
      return Err(RxError::Closed);
    }
    Ok(subscribers.snapshot())
  }

  /// Deliver `value` to a snapshot taken by [`snapshot`](Self::snapshot).
  pub(crate) fn dispatch(&self, snapshot: Snapshot<T>, value: T) -> Result<(), RxError> {
    if self.inner.scope.is_cancelled() {
      return Err(RxError::Cancelled);
    }
    broadcast(&self.inner.scope, snapshot, value)
  }
}

impl<T: Clone + Send + 'static> Node<T> for Observable<T> {
  #[inline]
  fn observable(&self) -> &Observable<T> { self }
}

impl<T: Clone + Send + 'static> Subscribable<T> for Observable<T> {}

/// Deliver `value` to every observer of `snapshot`.
///
/// The value is cloned for all observers except the last one, which receives
/// the moved value.
fn broadcast<T: Clone>(scope: &CancelScope, snapshot: Snapshot<T>, value: T) -> Result<(), RxError> {
  let total = snapshot.len();
  let mut failures = Vec::new();
  let mut iter = snapshot.into_iter().peekable();
  let mut value = Some(value);
  let mut cancelled = false;

  while let Some((id, observer)) = iter.next() {
    if scope.is_cancelled() {
      cancelled = true;
      break;
    }
    let item = if iter.peek().is_some() { value.clone() } else { value.take() };
    let Some(item) = item else { break };
    if let Err(source) = observer.next(item) {
      failures.push(DispatchFailure::new(id, source));
    }
  }

  if !failures.is_empty() {
    warn!(failed = failures.len(), observers = total, "observers failed during dispatch");
  }
  if cancelled {
    return Err(RxError::Cancelled);
  }
  if failures.is_empty() { Ok(()) } else { Err(RxError::Dispatch(failures)) }
}

// ============================================================================
// Tests
// ============================================================================
