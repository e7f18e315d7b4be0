//! Observer trait and implementations
//!
//! An observer is the consumer side of every multicast node: it is invoked
//! once per emitted value and may fail. Closures of the shape
//! `Fn(T) -> Result<(), ObserverError>` are observers out of the box.

use std::sync::Arc;

use crate::error::ObserverError;

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: the consumer of values in the runtime.
///
/// Observers are shared between threads and invoked through `&self`, so any
/// mutable state must live behind interior mutability.
pub trait Observer<T>: Send + Sync {
  /// Receive the next value.
  fn next(&self, value: T) -> Result<(), ObserverError>;
}

impl<T, F> Observer<T> for F
where
  F: Fn(T) -> Result<(), ObserverError> + Send + Sync,
{
  #[inline]
  fn next(&self, value: T) -> Result<(), ObserverError> { self(value) }
}

/// Shared, type-erased observer as stored in a registry.
pub type ObserverRef<T> = Arc<dyn Observer<T>>;

/// Helper trait to erase a concrete observer into an [`ObserverRef`].
pub trait IntoObserverRef<T> {
  fn into_observer_ref(self) -> ObserverRef<T>;
}

impl<T, O> IntoObserverRef<T> for O
where
  O: Observer<T> + 'static,
{
  #[inline]
  fn into_observer_ref(self) -> ObserverRef<T> { Arc::new(self) }
}

// ============================================================================
// FnObserver - infallible closure adapter
// ============================================================================

/// Adapts an infallible closure into an [`Observer`].
///
/// Handy for consumers that cannot fail, e.g. `FnObserver(|v| log(v))`.
#[derive(Clone)]
pub struct FnObserver<F>(pub F);

impl<T, F> Observer<T> for FnObserver<F>
where
  F: Fn(T) + Send + Sync,
{
  #[inline]
  fn next(&self, value: T) -> Result<(), ObserverError> {
    (self.0)(value);
    Ok(())
  }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  struct Collect {
    values: Mutex<Vec<i32>>,
  }

  impl Observer<i32> for Collect {
    fn next(&self, value: i32) -> Result<(), ObserverError> {
      self.values.lock().unwrap().push(value);
      Ok(())
    }
  }

  #[rxbus_macro::test]
  fn test_observer_trait() {
    let obs = Collect { values: Mutex::new(vec![]) };
    obs.next(1).unwrap();
    obs.next(2).unwrap();
    assert_eq!(*obs.values.lock().unwrap(), vec![1, 2]);
  }

  #[rxbus_macro::test]
  fn test_closure_as_observer() {
    let obs = |v: i32| -> Result<(), ObserverError> {
      if v < 0 {
        return Err("negative".into());
      }
      Ok(())
    };

    assert!(obs.next(10).is_ok());
    assert!(Observer::next(&obs, -1).is_err());
  }

  #[rxbus_macro::test]
  fn test_fn_observer_never_fails() {
    let seen = Arc::new(Mutex::new(0));
    let c_seen = seen.clone();
    let obs: ObserverRef<i32> =
      FnObserver(move |v: i32| *c_seen.lock().unwrap() += v).into_observer_ref();

    obs.next(3).unwrap();
    obs.next(4).unwrap();
    assert_eq!(*seen.lock().unwrap(), 7);
  }
}
