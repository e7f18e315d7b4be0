//! Error types shared by every multicast node.
//!
//! Observers report failures as [`ObserverError`]. A node never stops a
//! broadcast because one observer failed: it collects every failure of a
//! single emission and hands them back to the producer as one
//! [`RxError::Dispatch`].

use std::fmt;

use thiserror::Error;

/// Error returned by an observer callback.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One observer's failure inside an aggregate dispatch error.
#[derive(Debug)]
pub struct DispatchFailure {
  /// Subscription id of the failing observer.
  pub id: String,
  /// The error the observer returned.
  pub source: ObserverError,
}

impl DispatchFailure {
  pub fn new(id: impl Into<String>, source: ObserverError) -> Self {
    Self { id: id.into(), source }
  }
}

impl fmt::Display for DispatchFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.id, self.source)
  }
}

#[derive(Debug, Error)]
pub enum RxError {
  /// Operation on a closed observable, subject or bus.
  #[error("observable is closed")]
  Closed,
  /// The owning cancellation scope was cancelled before or during dispatch.
  #[error("dispatch cancelled")]
  Cancelled,
  /// One or more observers failed during a single emission.
  #[error("{} observer(s) failed: {}", .0.len(), DisplayFailures(.0))]
  Dispatch(Vec<DispatchFailure>),
}

impl RxError {
  #[inline]
  pub fn is_closed(&self) -> bool { matches!(self, RxError::Closed) }

  #[inline]
  pub fn is_cancelled(&self) -> bool { matches!(self, RxError::Cancelled) }

  /// Per-observer failures of a dispatch error, empty for other kinds.
  pub fn failures(&self) -> &[DispatchFailure] {
    match self {
      RxError::Dispatch(failures) => failures,
      _ => &[],
    }
  }

  /// Ids of the observers that failed, in dispatch order.
  pub fn failed_ids(&self) -> Vec<&str> {
    self
      .failures()
      .iter()
      .map(|f| f.id.as_str())
      .collect()
  }
}

struct DisplayFailures<'a>(&'a [DispatchFailure]);

impl fmt::Display for DisplayFailures<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, failure) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{failure}")?;
    }
    Ok(())
  }
}
