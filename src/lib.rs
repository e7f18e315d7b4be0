//! # rxbus: in-process reactive publish/subscribe
//!
//! Multicast observables, subjects with replay semantics, a typed event bus
//! and a small set of stream combinators, all safe to drive from many
//! threads at once.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxbus::prelude::*;
//!
//! let source = Subject::<i32>::new();
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//!
//! let tens = source.filter(|v| v % 2 == 0).map(|v| v * 10);
//! tens
//!   .subscribe("printer", move |v| {
//!     c_seen.lock().unwrap().push(v);
//!     Ok(())
//!   })
//!   .unwrap();
//!
//! (1..=4).for_each(|v| source.next(v).unwrap());
//! assert_eq!(*seen.lock().unwrap(), vec![20, 40]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A registry of named observers plus an emit/close lifecycle |
//! | [`Subject`] | An observable that can also be fed as an observer |
//! | [`BehaviorSubject`] / [`ReplaySubject`] / [`AsyncSubject`] | Subjects that replay a current value, a bounded history, or a final value |
//! | [`EventBus`] | Named channels of [`Event`]s keyed by event type |
//! | [`CancelScope`] | Hierarchical lifetime token; cancelling it closes every node below it |
//! | [`ObservableExt`] | `map`, `filter`, `debounce`, `throttle`, `merge_with`, `combine_latest`, `into_stream` |
//!
//! Every emission is synchronous: `next` returns after every observer ran,
//! and reports failed observers as one [`RxError::Dispatch`].
//!
//! ## Feature Flags
//!
//! - **`timer`** (default): [`ThreadPoolScheduler`], a wall-clock scheduler
//!   for `debounce` and `throttle`
//!
//! [`Observable`]: observable::Observable
//! [`Subject`]: subject::Subject
//! [`BehaviorSubject`]: subject::BehaviorSubject
//! [`ReplaySubject`]: subject::ReplaySubject
//! [`AsyncSubject`]: subject::AsyncSubject
//! [`EventBus`]: event_bus::EventBus
//! [`Event`]: event::Event
//! [`CancelScope`]: scope::CancelScope
//! [`ObservableExt`]: ops::ObservableExt
//! [`RxError::Dispatch`]: error::RxError::Dispatch
//! [`ThreadPoolScheduler`]: prelude::ThreadPoolScheduler

pub mod error;
pub mod event;
pub mod event_bus;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod scope;
pub mod subject;

// Re-export the prelude module
pub use prelude::*;
