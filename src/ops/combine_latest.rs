use std::sync::Arc;

use parking_lot::Mutex;

use super::{attach, close_when_all_cancelled, emit};
use crate::observable::{Observable, Subscribable};

struct Latest<A, B> {
  a: Option<A>,
  b: Option<B>,
}

impl<A: Clone, B: Clone> Latest<A, B> {
  fn pair(&self) -> Option<(A, B)> {
    match (&self.a, &self.b) {
      (Some(a), Some(b)) => Some((a.clone(), b.clone())),
      _ => None,
    }
  }
}

pub(crate) fn combine_latest<A, B, R, SA, SB, F>(a: &SA, b: &SB, combiner: F) -> Observable<R>
where
  A: Clone + Send + 'static,
  B: Clone + Send + 'static,
  R: Clone + Send + 'static,
  SA: Subscribable<A>,
  SB: Subscribable<B>,
  F: Fn(A, B) -> R + Send + Sync + 'static,
{
  let latest = Arc::new(Mutex::new(Latest { a: None, b: None }));
  let combiner = Arc::new(combiner);
  let combined = Observable::<R>::new();

  let (c_latest, c_combiner) = (latest.clone(), combiner.clone());
  let mut live = Vec::with_capacity(2);
  let accepted = attach("combine_latest", a, &combined, move |combined: &Observable<R>, value: A| {
    let pair = {
      let mut latest = c_latest.lock();
      latest.a = Some(value);
      latest.pair()
    };
    match pair {
      Some((a, b)) => emit(combined, c_combiner(a, b)),
      None => Ok(()),
    }
  });

  if accepted.is_ok() {
    live.push(a.scope());
  }

  let accepted = attach("combine_latest", b, &combined, move |combined: &Observable<R>, value: B| {
    let pair = {
      let mut latest = latest.lock();
      latest.b = Some(value);
      latest.pair()
    };
    match pair {
      Some((a, b)) => emit(combined, combiner(a, b)),
      None => Ok(()),
    }
  });

  if accepted.is_ok() {
    live.push(b.scope());
  }

  close_when_all_cancelled(&combined, &live);
  combined
}
