use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::derive;
use crate::{
  error::RxError,
  observable::{Observable, Subscribable},
  scheduler::{Scheduler, Task},
  scope::CancelScope,
};

struct DebounceState<T> {
  trailing_value: Option<T>,
  timer: Option<CancelScope>,
}

pub(crate) fn debounce<T, S, SD>(source: &S, duration: Duration, scheduler: SD) -> Observable<T>
where
  T: Clone + Send + 'static,
  S: Subscribable<T>,
  SD: Scheduler,
{
  let state = Arc::new(Mutex::new(DebounceState { trailing_value: None, timer: None }));

  derive("debounce", source, move |derived: &Observable<T>, value| {
    // timers die with the derived node
    let token = derived.scope().child();
    {
      let mut state = state.lock();
      state.trailing_value = Some(value);
      if let Some(previous) = state.timer.replace(token.clone()) {
        previous.cancel();
      }
    }

    let c_state = state.clone();
    let c_token = token.clone();
    let weak = derived.downgrade();
    scheduler.schedule(
      Task::new(token, move || {
        let value = {
          let mut state = c_state.lock();
          if !state.timer.as_ref().is_some_and(|t| t.ptr_eq(&c_token)) {
            return;
          }
          state.timer = None;
          state.trailing_value.take()
        };
        let (Some(value), Some(derived)) = (value, weak.upgrade()) else { return };
        match derived.next(value) {
          Ok(()) => {}
          Err(RxError::Closed) => debug!("debounced value dropped, output closed"),
          Err(err) => warn!(error = %err, "debounced emission failed"),
        }
      }),
      duration,
    );
    Ok(())
  })
}
