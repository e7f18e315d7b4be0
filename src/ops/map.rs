use super::{derive, emit};
use crate::{
  error::ObserverError,
  observable::{Observable, Subscribable},
};

pub(crate) fn map<T, R, S, F>(source: &S, f: F) -> Observable<R>
where
  T: Clone + Send + 'static,
  R: Clone + Send + 'static,
  S: Subscribable<T>,
  F: Fn(T) -> R + Send + Sync + 'static,
{
  derive("map", source, move |derived: &Observable<R>, value| emit(derived, f(value)))
}

pub(crate) fn try_map<T, R, S, F>(source: &S, f: F) -> Observable<R>
where
  T: Clone + Send + 'static,
  R: Clone + Send + 'static,
  S: Subscribable<T>,
  F: Fn(T) -> Result<R, ObserverError> + Send + Sync + 'static,
{
  derive("try_map", source, move |derived: &Observable<R>, value| emit(derived, f(value)?))
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxbus_macro::test]
  fn test_map_types() {
    let source = Subject::<i32>::new();
    let labels = source.map(|v| format!("#{v}"));

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    labels
      .subscribe("sink", move |v: String| {
        c_seen.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap();

    source.next(1).unwrap();
    source.next(2).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["#1", "#2"]);
  }

  #[rxbus_macro::test]
  fn test_try_map_failure_is_reported_upstream() {
    let source = Subject::<&'static str>::new();
    let parsed = source.try_map(|v| v.parse::<i32>().map_err(ObserverError::from));

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    parsed
      .subscribe("sink", move |v| {
        c_seen.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap();

    source.next("7").unwrap();
    let err = source.next("seven").unwrap_err();
    assert_eq!(err.failures().len(), 1);
    assert!(err.failed_ids()[0].starts_with("try_map-"));
    source.next("8").unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![7, 8]);
  }

  #[rxbus_macro::test]
  fn test_derived_closed_during_dispatch() {
    let source = Subject::<i32>::new();
    let mapped = source.map(|v| v * 2);
    let c_mapped = mapped.clone();
    source
      .subscribe("closer", move |_| {
        c_mapped.close();
        Ok(())
      })
      .unwrap();

    source.next(1).unwrap();
    assert!(mapped.is_closed());
    assert_eq!(source.observer_count(), 1);
    source.next(2).unwrap();
  }
}
