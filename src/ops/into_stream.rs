use std::{
  pin::Pin,
  sync::Arc,
  task::{Context, Poll},
};

use futures::{
  channel::mpsc::{unbounded, UnboundedReceiver},
  Stream, StreamExt,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
  error::ObserverError,
  observable::{Subscribable, WeakObservable},
};

/// A [`Stream`] of the values emitted by a node.
///
/// Values are buffered without bound until polled. The stream ends once the
/// node closes (after the buffered values have been yielded), and dropping
/// the stream unsubscribes it.
pub struct RxStream<T> {
  rx: UnboundedReceiver<T>,
  source: WeakObservable<T>,
  id: String,
}

pub(crate) fn into_stream<T, S>(source: &S) -> RxStream<T>
where
  T: Clone + Send + 'static,
  S: Subscribable<T>,
{
  let (tx, rx) = unbounded();
  let id = format!("into_stream-{}", Uuid::new_v4());
  let observer = move |value: T| -> Result<(), ObserverError> {
    tx.unbounded_send(value)
      .map_err(|_| ObserverError::from("stream receiver dropped"))
  };
  // a closed source drops the observer, and with it the sender
  if let Err(err) = source.subscribe_ref(id.clone(), Arc::new(observer)) {
    debug!(error = %err, "stream over a closed source");
  }
  RxStream { rx, source: source.observable().downgrade(), id }
}

impl<T> Stream for RxStream<T> {
  type Item = T;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
    self.rx.poll_next_unpin(cx)
  }
}

impl<T> Drop for RxStream<T> {
  fn drop(&mut self) {
    if let Some(source) = self.source.upgrade() {
      source.remove(&self.id);
    }
  }
}
