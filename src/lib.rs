//! # Interlock
//!
//! Shared guarded values with scoped locking, plus deadlock-free
//! multi-lock critical sections.
//!
//! Interlock provides two small, composable primitives for shared
//! mutable state across threads:
//!
//! - [`Shared<T>`]: a reference-counted handle to a lock-guarded value.
//!   Every clone refers to the same value; every holder gets exclusive,
//!   serialized access through the scoped guard returned by
//!   [`Shared::lock`]. The last handle to drop frees the value and its
//!   lock. The lock is reentrant, so nested access from the owning
//!   thread never self-deadlocks.
//! - [`synchronized`]: run a callback while holding several locks at
//!   once, acquired all-or-nothing so that concurrent callers with
//!   overlapping lock sets cannot deadlock no matter the order they
//!   list their locks in.
//!
//! ## Features
//!
//! - Scoped, serialized access to shared values
//! - Deadlock-free acquisition of arbitrary lock sets
//! - Lock event tracing to JSON lines ([`init_trace`])
//! - Optional stress hooks for shaking out interleavings (`stress`
//!   feature)
//!
//! ## Example
//!
//! ```rust
//! use interlock::{Shared, synchronized};
//! use std::thread;
//!
//! let inbox: Shared<Vec<String>> = Shared::default();
//! let outbox: Shared<Vec<String>> = Shared::default();
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|i| {
//!         let inbox = inbox.clone();
//!         let outbox = outbox.clone();
//!         thread::spawn(move || {
//!             // Move a message between the two queues atomically with
//!             // respect to both of them.
//!             synchronized(&[inbox.raw_lock(), outbox.raw_lock()], || {
//!                 inbox.lock().get_mut().push(format!("msg-{i}"));
//!                 outbox.lock().get_mut().push(format!("ack-{i}"));
//!             });
//!         })
//!     })
//!     .collect();
//!
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//!
//! assert_eq!(inbox.lock().with(|v| v.len()), 4);
//! assert_eq!(outbox.lock().with(|v| v.len()), 4);
//! ```

mod core;
pub use core::{
    Interlock, MultiLockGuard, RawLock, RawSharedLock, Shared, SharedGuard, StressConfig,
    init_trace, is_trace_enabled, synchronized,
    types::{Event, LockId, MULTI_LOCK_ID, ThreadId, get_current_thread_id},
};
#[cfg(feature = "stress")]
pub use core::{apply_delay, set_stress_config};
