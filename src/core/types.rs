use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread identifier type
///
/// Uniquely identifies a thread in the application.
pub type ThreadId = usize;

// Global counter for assigning unique thread IDs
static THREAD_ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

// Thread-local storage for each thread's assigned ID
thread_local! {
    static THREAD_ID: ThreadId = {
        // Each thread gets a unique ID once, when this is first accessed
        THREAD_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
    };
}

/// Get a unique identifier of the current thread
/// This will always return the same ID for the lifetime of the thread
pub fn get_current_thread_id() -> ThreadId {
    THREAD_ID.with(|&id| id)
}

/// Lock identifier type
///
/// Uniquely identifies the lock behind one family of [`Shared`] handles.
/// Each shared state is assigned an ID when created; IDs start at 1.
///
/// [`Shared`]: crate::Shared
pub type LockId = usize;

/// Reserved lock ID used in trace entries emitted by multi-lock
/// acquisition, which operates on type-erased locks with no ID of
/// their own.
pub const MULTI_LOCK_ID: LockId = 0;

// Real lock IDs start above MULTI_LOCK_ID
static NEXT_LOCK_ID: AtomicUsize = AtomicUsize::new(1);

/// Allocate the next lock ID
pub(crate) fn next_lock_id() -> LockId {
    NEXT_LOCK_ID.fetch_add(1, Ordering::SeqCst)
}

/// Represents the type of lock event that occurred
///
/// These events describe the lifecycle of shared states and the progress
/// of lock acquisitions, and are what the trace logger records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    /// A new shared state (value + lock) was created
    Created,
    /// The shared state was dropped by its last handle
    Destroyed,
    /// Thread is attempting to acquire a lock (or a lock set)
    Attempt,
    /// Thread successfully acquired a lock
    Acquired,
    /// Thread acquired every lock of a multi-lock set
    AllAcquired,
    /// Thread released a lock (or a lock set)
    Released,
    /// A multi-lock round failed and the thread is backing off
    Backoff,
}
