use crate::core::shared::RawSharedLock;
use crate::core::stress;
use crate::core::trace;
use crate::core::types::{Event, MULTI_LOCK_ID, ThreadId, get_current_thread_id};
use std::thread;
use std::time::Duration;

/// A type-erased exclusive lock that multi-lock acquisition can drive
///
/// Implemented for [`RawSharedLock`] (the lock behind [`Shared`]) and
/// for [`parking_lot::RawMutex`], so shared handles and plain
/// parking_lot locks can participate in the same lock set.
///
/// [`Shared`]: crate::Shared
pub trait RawLock {
    /// Block until the lock is held by the caller
    fn lock(&self);

    /// Attempt to take the lock without blocking
    fn try_lock(&self) -> bool;

    /// Release the lock
    ///
    /// # Safety
    /// The lock must be held by the current context.
    unsafe fn unlock(&self);
}

impl RawLock for RawSharedLock {
    fn lock(&self) {
        RawSharedLock::lock(self)
    }

    fn try_lock(&self) -> bool {
        RawSharedLock::try_lock(self)
    }

    unsafe fn unlock(&self) {
        unsafe { RawSharedLock::unlock(self) }
    }
}

impl RawLock for parking_lot::RawMutex {
    fn lock(&self) {
        lock_api::RawMutex::lock(self)
    }

    fn try_lock(&self) -> bool {
        lock_api::RawMutex::try_lock(self)
    }

    unsafe fn unlock(&self) {
        unsafe { lock_api::RawMutex::unlock(self) }
    }
}

/// Guard holding every lock of a multi-lock set
///
/// Returned by [`MultiLockGuard::acquire`] once all locks are held;
/// releases all of them on drop, on every exit path including unwinding.
pub struct MultiLockGuard<'a> {
    locks: &'a [&'a dyn RawLock],
    thread_id: ThreadId,
}

impl<'a> MultiLockGuard<'a> {
    /// Acquire every lock in `locks`, deadlock-free
    ///
    /// The locks in one call must be distinct objects. Acquisition is
    /// all-or-nothing: one lock is acquired blocking, the rest are
    /// try-locked; any failure releases everything taken so far, backs
    /// off, and retries with the lock that was busy as the new blocking
    /// one. Two callers requesting overlapping sets in different orders
    /// therefore cannot hold each other up forever.
    ///
    /// An empty slice yields a guard holding nothing; a single lock
    /// degenerates to a plain blocking acquire.
    ///
    /// # Example
    ///
    /// ```rust
    /// use interlock::{MultiLockGuard, Shared};
    ///
    /// let a = Shared::new(1);
    /// let b = Shared::new(2);
    /// let locks: [&dyn interlock::RawLock; 2] = [a.raw_lock(), b.raw_lock()];
    /// let guard = MultiLockGuard::acquire(&locks);
    /// // Both values are exclusively ours until `guard` drops.
    /// a.lock().with_mut(|a| *a += 10);
    /// b.lock().with_mut(|b| *b += 10);
    /// drop(guard);
    /// ```
    pub fn acquire(locks: &'a [&'a dyn RawLock]) -> Self {
        let thread_id = get_current_thread_id();

        match locks {
            [] => {}
            [only] => {
                trace::emit(thread_id, MULTI_LOCK_ID, Event::Attempt);
                only.lock();
                trace::emit(thread_id, MULTI_LOCK_ID, Event::AllAcquired);
            }
            _ => lock_all(locks, thread_id),
        }

        MultiLockGuard { locks, thread_id }
    }
}

impl Drop for MultiLockGuard<'_> {
    fn drop(&mut self) {
        for lock in self.locks {
            // Safety: acquire() took every lock in the slice and nothing
            // else releases them before this guard drops.
            unsafe { lock.unlock() };
        }
        if !self.locks.is_empty() {
            trace::emit(self.thread_id, MULTI_LOCK_ID, Event::Released);
        }
    }
}

/// Run `f` while holding every lock in `locks`
///
/// The callback executes with exclusive access to every value the locks
/// protect, as if a single combined lock covered the whole set. All
/// locks are released before a panic from the callback continues
/// unwinding; nothing is leaked.
///
/// Concurrent callers may list overlapping locks in any order without
/// risking deadlock; see [`MultiLockGuard::acquire`] for the protocol.
///
/// # Example
///
/// ```rust
/// use interlock::{Shared, synchronized};
///
/// let from = Shared::new(100i64);
/// let to = Shared::new(0i64);
///
/// // Transfer atomically with respect to both accounts.
/// synchronized(&[from.raw_lock(), to.raw_lock()], || {
///     from.lock().with_mut(|f| *f -= 30);
///     to.lock().with_mut(|t| *t += 30);
/// });
///
/// assert_eq!(from.lock().with(|f| *f), 70);
/// assert_eq!(to.lock().with(|t| *t), 30);
/// ```
pub fn synchronized<R, F>(locks: &[&dyn RawLock], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = MultiLockGuard::acquire(locks);
    f()
}

// Retry rounds yield this many times before escalating to sleeps
const YIELD_ROUNDS: u32 = 8;
// First sleep length; doubles per round up to the cap below
const BACKOFF_UNIT_MICROS: u64 = 10;
const BACKOFF_CAP_SHIFT: u32 = 7;

/// All-or-nothing acquisition of `locks`, in the manner of `std::lock`:
/// block on one lock, try-lock the rest in rotation order, and on any
/// failure release the round and restart blocking on the lock that was
/// busy.
fn lock_all(locks: &[&dyn RawLock], thread_id: ThreadId) {
    let n = locks.len();
    let mut hard = 0;
    let mut rounds = 0u32;

    loop {
        stress::on_acquire_round(thread_id, rounds);
        trace::emit(thread_id, MULTI_LOCK_ID, Event::Attempt);

        locks[hard].lock();

        let mut busy = None;
        for step in 1..n {
            let idx = (hard + step) % n;
            if !locks[idx].try_lock() {
                busy = Some((idx, step));
                break;
            }
        }

        let Some((busy_idx, busy_step)) = busy else {
            trace::emit(thread_id, MULTI_LOCK_ID, Event::AllAcquired);
            return;
        };

        // Give the whole round back before waiting on the busy lock
        for step in (0..busy_step).rev() {
            // Safety: steps 0..busy_step were acquired in this round
            unsafe { locks[(hard + step) % n].unlock() };
        }

        hard = busy_idx;
        rounds += 1;
        trace::emit(thread_id, MULTI_LOCK_ID, Event::Backoff);
        backoff(rounds);
    }
}

/// Measured backoff between failed rounds: yield first, then sleep in
/// doubling micro-sleeps bounded by `BACKOFF_CAP_SHIFT`.
fn backoff(rounds: u32) {
    if rounds <= YIELD_ROUNDS {
        thread::yield_now();
    } else {
        let shift = (rounds - YIELD_ROUNDS).min(BACKOFF_CAP_SHIFT);
        thread::sleep(Duration::from_micros(BACKOFF_UNIT_MICROS << shift));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::Shared;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn test_single_lock_runs_callback() {
        let value = Shared::new(1);
        let out = synchronized(&[value.raw_lock()], || value.lock().with(|v| *v + 1));
        assert_eq!(out, 2);
    }

    #[test]
    fn test_empty_lock_set_runs_callback() {
        assert_eq!(synchronized(&[], || 42), 42);
    }

    #[test]
    fn test_locks_are_held_during_callback() {
        let a = Shared::new(0);
        let b = Shared::new(0);

        synchronized(&[a.raw_lock(), b.raw_lock()], || {
            assert!(a.raw_lock().is_locked());
            assert!(b.raw_lock().is_locked());
            assert!(a.raw_lock().is_owned_by_current_thread());
            assert!(b.raw_lock().is_owned_by_current_thread());
        });

        assert!(!a.raw_lock().is_locked());
        assert!(!b.raw_lock().is_locked());
    }

    #[test]
    fn test_panicking_callback_releases_all_locks() {
        let a = Shared::new(0);
        let b = Shared::new(0);

        let result = catch_unwind(AssertUnwindSafe(|| {
            synchronized(&[a.raw_lock(), b.raw_lock()], || panic!("boom"));
        }));
        assert!(result.is_err());

        // Both locks must be free again
        assert!(!a.raw_lock().is_locked());
        assert!(!b.raw_lock().is_locked());
        synchronized(&[a.raw_lock(), b.raw_lock()], || {
            a.lock().with_mut(|v| *v += 1);
            b.lock().with_mut(|v| *v += 1);
        });
        assert_eq!(a.lock().with(|v| *v), 1);
        assert_eq!(b.lock().with(|v| *v), 1);
    }

    #[test]
    fn test_plain_parking_lot_mutex_participates() {
        let shared = Shared::new(0);
        let plain = parking_lot::Mutex::new(0);

        // Safety: the raw handle is only used for multi-lock acquisition
        let plain_raw = unsafe { plain.raw() };
        synchronized(&[shared.raw_lock(), plain_raw], || {
            shared.lock().with_mut(|v| *v += 1);
            // The plain mutex is held; touch its value unsynchronized
            unsafe { *plain.data_ptr() += 1 };
        });

        assert_eq!(shared.lock().with(|v| *v), 1);
        assert_eq!(*plain.lock(), 1);
    }
}
