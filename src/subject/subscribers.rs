use smallvec::SmallVec;

use crate::observer::ObserverRef;

/// Subscribers container with id-based management.
///
/// This is the one registry every multicast node owns. Entries keep their
/// insertion order; re-subscribing under an existing id replaces the observer
/// in place.
///
/// # Design Rationale
///
/// - **SmallVec Optimization**: Most nodes carry zero to two observers, so the
///   common case needs no heap allocation for the entry list.
/// - **Snapshot Dispatch**: Emission never runs under the registry lock. The
///   node takes a [`snapshot`](Subscribers::snapshot) of the entries, drops the
///   lock, and invokes the observers against the snapshot. Mutations made
///   meanwhile land in the live registry and are seen by the next emission.
pub struct Subscribers<T> {
  closed: bool,
  items: SmallVec<[(String, ObserverRef<T>); 2]>,
}

/// A point-in-time copy of the registry entries.
pub type Snapshot<T> = SmallVec<[(String, ObserverRef<T>); 2]>;

impl<T> Default for Subscribers<T> {
  fn default() -> Self { Self { closed: false, items: SmallVec::new() } }
}

impl<T> Subscribers<T> {
  /// Insert or replace the observer registered under `id`.
  ///
  /// Returns `true` if an existing entry was replaced.
  pub fn insert(&mut self, id: String, observer: ObserverRef<T>) -> bool {
    match self.items.iter_mut().find(|(i, _)| *i == id) {
      Some(entry) => {
        entry.1 = observer;
        true
      }
      None => {
        self.items.push((id, observer));
        false
      }
    }
  }

  /// Remove an observer by id.
  pub fn remove(&mut self, id: &str) -> Option<ObserverRef<T>> {
    self
      .items
      .iter()
      .position(|(i, _)| i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_closed(&self) -> bool { self.closed }

  /// Mark the registry closed and take every observer out of it.
  ///
  /// Returns `None` if it was already closed. The caller drops the returned
  /// entries after releasing its lock.
  pub fn close(&mut self) -> Option<Snapshot<T>> {
    if self.closed {
      return None;
    }
    self.closed = true;
    Some(std::mem::take(&mut self.items))
  }

  /// Copy the current entries for dispatch outside the lock.
  #[inline]
  pub fn snapshot(&self) -> Snapshot<T> { self.items.clone() }
}
