use super::{attach, close_when_all_cancelled, emit};
use crate::{
  observable::{Observable, Subscribable},
  scope::CancelScope,
};

/// Forward every value of every source into one output.
///
/// Values of one source keep their relative order in the output; values of
/// different sources interleave as they arrive. The output owns a fresh root
/// scope: it outlives any single source and closes once every source has
/// closed. Sources already closed are skipped; merging no open source yields
/// a closed output.
///
/// Sources of different node types can be merged through trait objects:
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use rxbus::prelude::*;
///
/// let plain = Subject::<i32>::new();
/// let seeded = BehaviorSubject::new(0);
/// let merged = merge([&plain as &dyn Subscribable<i32>, &seeded]);
///
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// merged
///   .subscribe("sink", move |v| {
///     c_seen.lock().unwrap().push(v);
///     Ok(())
///   })
///   .unwrap();
///
/// plain.next(1).unwrap();
/// seeded.next(2).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
pub fn merge<'a, T, S, I>(sources: I) -> Observable<T>
where
  T: Clone + Send + 'static,
  S: Subscribable<T> + ?Sized + 'a,
  I: IntoIterator<Item = &'a S>,
{
  let merged = Observable::<T>::new();
  let mut live: Vec<&CancelScope> = Vec::new();
  for source in sources {
    if attach("merge", source, &merged, emit::<T>).is_ok() {
      live.push(source.scope());
    }
  }
  close_when_all_cancelled(&merged, &live);
  merged
}
