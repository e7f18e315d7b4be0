use super::{derive, emit};
use crate::observable::{Observable, Subscribable};

pub(crate) fn filter<T, S, F>(source: &S, predicate: F) -> Observable<T>
where
  T: Clone + Send + 'static,
  S: Subscribable<T>,
  F: Fn(&T) -> bool + Send + Sync + 'static,
{
  derive("filter", source, move |derived: &Observable<T>, value| {
    if predicate(&value) { emit(derived, value) } else { Ok(()) }
  })
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxbus_macro::test]
  fn test_filter() {
    let source = Subject::<i32>::new();
    let evens = source.filter(|v| v % 2 == 0);

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    evens
      .subscribe("sink", move |v| {
        c_seen.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap();

    (0..10).for_each(|v| source.next(v).unwrap());
    assert_eq!(*seen.lock().unwrap(), vec![0, 2, 4, 6, 8]);
  }

  #[rxbus_macro::test]
  fn test_filter_on_behavior_subject_sees_current_value() {
    let source = BehaviorSubject::new(4);
    let evens = source.filter(|v| v % 2 == 0);

    // the seed was delivered while `evens` had no observers yet
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    evens
      .subscribe("sink", move |v| {
        c_seen.lock().unwrap().push(v);
        Ok(())
      })
      .unwrap();

    source.next(5).unwrap();
    source.next(6).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![6]);
  }
}
