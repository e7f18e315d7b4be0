//! Cancellation scopes.
//!
//! A [`CancelScope`] is an explicit lifetime token. Scopes form a tree:
//! cancelling a scope cancels every live descendant, top-down, and runs the
//! hooks registered on each of them. A scope created under an already
//! cancelled parent is born cancelled.
//!
//! Every multicast node owns one scope. Combinators derive their scope from
//! the source's scope, so tearing down an upstream node tears down the whole
//! pipeline hanging off it.

use std::{
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
  },
};

use parking_lot::Mutex;
use smallvec::SmallVec;

type CancelHook = Box<dyn FnOnce() + Send>;

/// Key of a hook registered with [`CancelScope::on_cancel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookId(u64);

/// A hierarchical, explicitly cancellable lifetime token.
///
/// Cloning yields another handle to the same scope.
#[derive(Clone, Default)]
pub struct CancelScope(Arc<Inner>);

#[derive(Default)]
struct Inner {
  cancelled: AtomicBool,
  teardown: Mutex<Teardown>,
}

#[derive(Default)]
struct Teardown {
  children: SmallVec<[Weak<Inner>; 2]>,
  hooks: SmallVec<[(HookId, CancelHook); 1]>,
  next_hook: u64,
}

impl CancelScope {
  /// Create a new root scope.
  pub fn new() -> Self { Self::default() }

  /// Create a child scope that is cancelled whenever `self` is.
  pub fn child(&self) -> CancelScope {
    let child = CancelScope::new();
    let mut teardown = self.0.teardown.lock();
    if self.is_cancelled() {
      drop(teardown);
      child.0.cancelled.store(true, Ordering::Release);
    } else {
      teardown.children.retain(|c| c.strong_count() > 0);
      teardown.children.push(Arc::downgrade(&child.0));
    }
    child
  }

  /// Register `hook` to run once when this scope is cancelled. Runs
  /// immediately on the calling thread if the scope is already cancelled.
  ///
  /// The returned id removes the hook again through
  /// [`remove_hook`](Self::remove_hook).
  pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) -> HookId {
    let mut teardown = self.0.teardown.lock();
    let id = HookId(teardown.next_hook);
    teardown.next_hook += 1;
    if self.is_cancelled() {
      drop(teardown);
      hook();
    } else {
      teardown.hooks.push((id, Box::new(hook)));
    }
    id
  }

  /// Drop a hook that has not run yet. Unknown or already run hooks are
  /// ignored.
  pub fn remove_hook(&self, id: HookId) {
    let removed = {
      let mut teardown = self.0.teardown.lock();
      teardown
        .hooks
        .iter()
        .position(|(h, _)| *h == id)
        .map(|pos| teardown.hooks.remove(pos))
    };
    drop(removed);
  }

  /// Cancel this scope and all of its descendants. Idempotent.
  pub fn cancel(&self) {
    if self.0.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    let Teardown { children, hooks, .. } = std::mem::take(&mut *self.0.teardown.lock());
    for child in children.iter().filter_map(Weak::upgrade) {
      CancelScope(child).cancel();
    }
    for (_, hook) in hooks {
      hook();
    }
  }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::Acquire) }

  #[cfg(test)]
  pub(crate) fn hook_count(&self) -> usize { self.0.teardown.lock().hooks.len() }

  #[cfg(test)]
  pub(crate) fn child_count(&self) -> usize {
    self
      .0
      .teardown
      .lock()
      .children
      .iter()
      .filter(|c| c.strong_count() > 0)
      .count()
  }

  /// Whether two handles refer to the same scope.
  #[inline]
  pub fn ptr_eq(&self, other: &CancelScope) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl Debug for CancelScope {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CancelScope")
      .field("cancelled", &self.is_cancelled())
      .finish()
  }
}
