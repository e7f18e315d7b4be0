//! Stream combinators.
//!
//! Every combinator builds a fresh [`Observable`] and installs a forwarding
//! observer on its source(s) under a generated id (`"<op>-<uuid>"`). Handles
//! point upstream only: the derived node keeps its sources alive, while the
//! forwarding observer holds a weak handle to the derived node. A pipeline
//! therefore lives as long as its most downstream handle, and the derived
//! node unsubscribes itself from its sources once its scope is cancelled.
//! Bind the last combinator's result: a temporary is torn down as soon as
//! the statement ends.
//!
//! Single-source combinators derive their scope from the source's scope:
//! closing the source tears down everything built on top of it. Multi-source
//! combinators ([`merge`], [`combine_latest`](ObservableExt::combine_latest))
//! own a fresh root scope and close once every source has closed. A source
//! that is already closed when the combinator is built counts as closed; it
//! does not close the output on its own.

mod combine_latest;
mod debounce;
mod filter;
mod into_stream;
mod map;
mod merge;
mod throttle;

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  time::Duration,
};

pub use into_stream::RxStream;
pub use merge::merge;
use tracing::debug;
use uuid::Uuid;

use crate::{
  error::{ObserverError, RxError},
  observable::{Observable, Subscribable},
  scheduler::Scheduler,
  scope::{CancelScope, HookId},
};

/// Combinators available on every node.
pub trait ObservableExt<T: Clone + Send + 'static>: Subscribable<T> {
  /// Emit `f(v)` for every source value `v`.
  fn map<R, F>(&self, f: F) -> Observable<R>
  where
    Self: Sized,
    R: Clone + Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
  {
    map::map(self, f)
  }

  /// Like [`map`](Self::map) with a fallible projection. A failed
  /// projection emits nothing and is reported to the upstream `next` caller
  /// as this combinator's failure.
  fn try_map<R, F>(&self, f: F) -> Observable<R>
  where
    Self: Sized,
    R: Clone + Send + 'static,
    F: Fn(T) -> Result<R, ObserverError> + Send + Sync + 'static,
  {
    map::try_map(self, f)
  }

  /// Emit only the values for which `predicate` returns `true`.
  fn filter<F>(&self, predicate: F) -> Observable<T>
  where
    Self: Sized,
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    filter::filter(self, predicate)
  }

  /// Emit the last value of a burst once `duration` has passed without a
  /// new arrival.
  fn debounce<SD>(&self, duration: Duration, scheduler: SD) -> Observable<T>
  where
    Self: Sized,
    SD: Scheduler,
  {
    debounce::debounce(self, duration, scheduler)
  }

  /// Emit a value immediately, then drop every value arriving less than
  /// `duration` after the last emitted one.
  fn throttle<SD>(&self, duration: Duration, scheduler: SD) -> Observable<T>
  where
    Self: Sized,
    SD: Scheduler,
  {
    throttle::throttle(self, duration, scheduler)
  }

  /// Merge this node with `other`. See [`merge`].
  fn merge_with<O>(&self, other: &O) -> Observable<T>
  where
    Self: Sized,
    O: Subscribable<T>,
  {
    let sources: [&dyn Subscribable<T>; 2] = [self, other];
    merge::merge(sources)
  }

  /// Emit `combiner(a, b)` with the latest value of each side, once both
  /// sides have emitted at least once.
  fn combine_latest<U, R, O, F>(&self, other: &O, combiner: F) -> Observable<R>
  where
    Self: Sized,
    U: Clone + Send + 'static,
    R: Clone + Send + 'static,
    O: Subscribable<U>,
    F: Fn(T, U) -> R + Send + Sync + 'static,
  {
    combine_latest::combine_latest(self, other, combiner)
  }

  /// Consume this node as a [`futures::Stream`].
  fn into_stream(&self) -> RxStream<T>
  where
    Self: Sized,
  {
    into_stream::into_stream(self)
  }
}

impl<T: Clone + Send + 'static, S: Subscribable<T>> ObservableExt<T> for S {}

/// Subscribe `forward` to `source` on behalf of `derived`.
///
/// `forward` receives the derived node along with each source value; its
/// error becomes the forwarding observer's failure. `derived` holds `source`
/// until its scope is cancelled, then removes the forwarding observer from
/// it. A refused subscription is returned to the caller, which decides what
/// it means for `derived`.
pub(crate) fn attach<T, U, S, F>(
  op: &str, source: &S, derived: &Observable<U>, forward: F,
) -> Result<(), RxError>
where
  T: Clone + Send + 'static,
  U: Clone + Send + 'static,
  S: Subscribable<T> + ?Sized,
  F: Fn(&Observable<U>, T) -> Result<(), ObserverError> + Send + Sync + 'static,
{
  let id = format!("{op}-{}", Uuid::new_v4());
  let weak = derived.downgrade();
  let observer = move |value: T| -> Result<(), ObserverError> {
    match weak.upgrade() {
      Some(derived) => forward(&derived, value),
      None => Ok(()),
    }
  };

  if let Err(err) = source.subscribe_ref(id.clone(), Arc::new(observer)) {
    debug!(op, error = %err, "source rejected combinator subscription");
    return Err(err);
  }

  let upstream = source.observable().clone();
  derived.scope().on_cancel(move || upstream.unsubscribe(&id));
  Ok(())
}

/// Emit `value` on a derived node.
///
/// A closed derived node drops the value silently; other errors are handed
/// back to the upstream caller.
pub(crate) fn emit<U>(derived: &Observable<U>, value: U) -> Result<(), ObserverError>
where
  U: Clone + Send + 'static,
{
  match derived.next(value) {
    Ok(()) | Err(RxError::Closed) => Ok(()),
    Err(err) => Err(err.into()),
  }
}

/// A derived node whose scope is a child of `source`'s scope. Closed if the
/// source refuses the subscription.
pub(crate) fn derive<T, U, S, F>(op: &str, source: &S, forward: F) -> Observable<U>
where
  T: Clone + Send + 'static,
  U: Clone + Send + 'static,
  S: Subscribable<T> + ?Sized,
  F: Fn(&Observable<U>, T) -> Result<(), ObserverError> + Send + Sync + 'static,
{
  let derived = Observable::with_parent(source.scope());
  if attach(op, source, &derived, forward).is_err() {
    derived.close();
  }
  derived
}

/// Close `derived` once every scope in `sources` has been cancelled.
///
/// The hooks installed on `sources` are removed again once `derived` is
/// cancelled, so long-lived sources do not accumulate them.
pub(crate) fn close_when_all_cancelled<U>(derived: &Observable<U>, sources: &[&CancelScope])
where
  U: Clone + Send + 'static,
{
  if sources.is_empty() {
    derived.close();
    return;
  }
  let live = Arc::new(AtomicUsize::new(sources.len()));
  let mut installed: Vec<(CancelScope, HookId)> = Vec::with_capacity(sources.len());
  for scope in sources {
    let live = live.clone();
    let weak = derived.downgrade();
    let hook = scope.on_cancel(move || {
      if live.fetch_sub(1, Ordering::AcqRel) == 1 {
        if let Some(derived) = weak.upgrade() {
          derived.close();
        }
      }
    });
    installed.push(((*scope).clone(), hook));
  }
  derived.scope().on_cancel(move || {
    for (scope, hook) in installed {
      scope.remove_hook(hook);
    }
  });
}
