//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Errors
pub use crate::error::{DispatchFailure, ObserverError, RxError};
// Event bus
pub use crate::event::Event;
pub use crate::event_bus::EventBus;
// Core types and traits
pub use crate::observable::{Observable, Subscribable, WeakObservable};
// Observer trait
pub use crate::observer::{FnObserver, IntoObserverRef, Observer, ObserverRef};
// Operators
pub use crate::ops::{merge, ObservableExt, RxStream};
// Scheduler Core types
pub use crate::scheduler::{Duration, Instant, Scheduler, Task, TaskHandle, TestScheduler};
// Default Scheduler
#[cfg(all(feature = "timer", not(target_arch = "wasm32")))]
pub use crate::scheduler::ThreadPoolScheduler;
pub use crate::scope::{CancelScope, HookId};
// Subjects
pub use crate::subject::{AsyncSubject, BehaviorSubject, ReplaySubject, Subject};
