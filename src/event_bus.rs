//! Named-channel publish/subscribe over [`Event`]s.
//!
//! An [`EventBus`] keeps one [`Subject<Event>`] per event type, created the
//! first time somebody subscribes to that type. Publishing to a type nobody
//! subscribed to is a silent no-op, so producers never depend on consumers
//! existing.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
  error::{ObserverError, RxError},
  event::Event,
  observable::Subscribable,
  observer::Observer,
  scope::CancelScope,
  subject::Subject,
};

/// A registry of subjects keyed by event type.
///
/// `EventBus` is a handle; clones share the same channels.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use rxbus::prelude::*;
///
/// let bus = EventBus::new();
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// bus
///   .subscribe("task.created", "audit", move |e: Event| {
///     c_seen.lock().unwrap().push(e.data["id"].clone());
///     Ok(())
///   })
///   .unwrap();
///
/// bus.publish(Event::new("task.created", serde_json::json!({"id": 1}))).unwrap();
/// bus.publish(Event::new("task.deleted", serde_json::json!({"id": 1}))).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![serde_json::json!(1)]);
/// ```
#[derive(Clone)]
pub struct EventBus {
  inner: Arc<Inner>,
}

struct Inner {
  scope: CancelScope,
  state: Mutex<BusState>,
}

#[derive(Default)]
struct BusState {
  subjects: HashMap<String, Subject<Event>>,
  closed: bool,
}

impl Default for EventBus {
  fn default() -> Self { Self::new() }
}

impl EventBus {
  pub fn new() -> Self { Self::with_scope(CancelScope::new()) }

  /// Create a bus whose channels are cancelled along with `parent`.
  pub fn with_parent(parent: &CancelScope) -> Self { Self::with_scope(parent.child()) }

  fn with_scope(scope: CancelScope) -> Self {
    let inner = Arc::new(Inner { scope, state: Mutex::new(BusState::default()) });
    // cancelling an ancestor scope is a close of the bus
    let weak = Arc::downgrade(&inner);
    inner.scope.on_cancel(move || {
      if let Some(inner) = weak.upgrade() {
        EventBus { inner }.close();
      }
    });
    Self { inner }
  }

  /// Subscribe a closure to events of `event_type` under `id`.
  pub fn subscribe<F>(
    &self, event_type: impl Into<String>, id: impl Into<String>, observer: F,
  ) -> Result<(), RxError>
  where
    F: Fn(Event) -> Result<(), ObserverError> + Send + Sync + 'static,
  {
    self.channel(event_type.into())?.subscribe(id, observer)
  }

  /// Subscribe any [`Observer`] to events of `event_type` under `id`.
  pub fn subscribe_with<O>(
    &self, event_type: impl Into<String>, id: impl Into<String>, observer: O,
  ) -> Result<(), RxError>
  where
    O: Observer<Event> + 'static,
  {
    self.channel(event_type.into())?.subscribe_with(id, observer)
  }

  /// Remove `id` from the channel of `event_type`. Unknown types and ids are
  /// ignored.
  pub fn unsubscribe(&self, event_type: &str, id: &str) {
    let subject = self.inner.state.lock().subjects.get(event_type).cloned();
    if let Some(subject) = subject {
      subject.unsubscribe(id);
    }
  }

  /// Deliver `event` to every subscriber of its type.
  ///
  /// # Errors
  ///
  /// - [`RxError::Closed`] if the bus is closed.
  /// - [`RxError::Dispatch`] if one or more subscribers failed; the others
  ///   still received the event.
  pub fn publish(&self, event: Event) -> Result<(), RxError> {
    let subject = {
      let state = self.inner.state.lock();
      if state.closed {
        return Err(RxError::Closed);
      }
      state.subjects.get(&event.event_type).cloned()
    };
    match subject {
      Some(subject) => subject.next(event),
      None => {
        trace!(event_type = %event.event_type, "no channel for event type");
        Ok(())
      }
    }
  }

  /// Close the bus and every channel. Further `subscribe` and `publish`
  /// calls fail with [`RxError::Closed`]. Idempotent.
  pub fn close(&self) {
    let subjects = {
      let mut state = self.inner.state.lock();
      if state.closed {
        return;
      }
      state.closed = true;
      std::mem::take(&mut state.subjects)
    };
    debug!(channels = subjects.len(), "event bus closed");
    self.inner.scope.cancel();
    for subject in subjects.values() {
      subject.close();
    }
  }

  #[inline]
  pub fn is_closed(&self) -> bool { self.inner.state.lock().closed }

  /// Number of event types with a channel.
  pub fn subject_count(&self) -> usize { self.inner.state.lock().subjects.len() }

  /// Total number of subscriptions across every channel.
  pub fn observer_count(&self) -> usize {
    let subjects: Vec<_> = self.inner.state.lock().subjects.values().cloned().collect();
    subjects.iter().map(|s| s.observer_count()).sum()
  }

  /// Event types with a channel, sorted.
  pub fn event_types(&self) -> Vec<String> {
    let mut types: Vec<_> = self.inner.state.lock().subjects.keys().cloned().collect();
    types.sort();
    types
  }

  fn channel(&self, event_type: String) -> Result<Subject<Event>, RxError> {
    let mut state = self.inner.state.lock();
    if state.closed {
      return Err(RxError::Closed);
    }
    let subject = state.subjects.entry(event_type).or_insert_with_key(|event_type| {
      trace!(event_type = %event_type, "channel created");
      Subject::with_parent(&self.inner.scope)
    });
    Ok(subject.clone())
  }
}
