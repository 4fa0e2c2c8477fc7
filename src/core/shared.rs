use crate::core::trace;
use crate::core::types::{Event, LockId, ThreadId, get_current_thread_id, next_lock_id};
use parking_lot::{RawMutex, RawThreadId, ReentrantMutex, ReentrantMutexGuard};
use std::cell::{Ref, RefCell, RefMut};
use std::sync::Arc;

/// The raw reentrant lock behind a family of [`Shared`] handles.
///
/// Obtained through [`Shared::raw_lock`] and consumed by multi-lock
/// acquisition. Acquiring through it never grants access to the guarded
/// value; releasing through it is unsafe.
pub type RawSharedLock = lock_api::RawReentrantMutex<RawMutex, RawThreadId>;

/// The heap state shared by every handle of one family: the guarded
/// value together with its lock. The handle count lives in the `Arc`
/// that carries this state.
struct State<T> {
    /// Unique identifier for this state's lock
    id: LockId,
    /// The guarded value. The lock is reentrant, so mutable access goes
    /// through a `RefCell` rather than the lock handing out `&mut T`.
    cell: ReentrantMutex<RefCell<T>>,
}

impl<T> Drop for State<T> {
    fn drop(&mut self) {
        // Runs exactly once, on the last handle's release
        trace::emit(get_current_thread_id(), self.id, Event::Destroyed);
    }
}

/// A reference-counted handle to a lock-guarded value
///
/// Every clone of a `Shared` refers to the same underlying value, and
/// every holder gets exclusive, serialized access to it through the
/// scoped guard returned by [`lock`](Shared::lock). The last handle to
/// drop frees the value and its lock.
///
/// The lock is reentrant: a thread that already holds it may call
/// [`lock`](Shared::lock) again on the same handle without
/// self-deadlocking. This is what lets a callback running under
/// [`synchronized`](crate::synchronized) reach values whose locks the
/// callback already holds.
///
/// # Example
///
/// ```rust
/// use interlock::Shared;
/// use std::thread;
///
/// let counter = Shared::new(0u64);
/// let worker = {
///     let counter = counter.clone();
///     thread::spawn(move || {
///         counter.lock().with_mut(|c| *c += 1);
///     })
/// };
///
/// counter.lock().with_mut(|c| *c += 1);
/// worker.join().unwrap();
///
/// assert_eq!(counter.lock().with(|c| *c), 2);
/// ```
pub struct Shared<T> {
    state: Arc<State<T>>,
}

/// Scoped accessor for the value behind a [`Shared`] handle
///
/// Holds the shared lock for its entire lifetime and releases it on
/// drop. The value is reached through [`get`](SharedGuard::get) /
/// [`get_mut`](SharedGuard::get_mut) or the closure forms
/// [`with`](SharedGuard::with) / [`with_mut`](SharedGuard::with_mut).
pub struct SharedGuard<'a, T> {
    /// Thread that owns this guard
    thread_id: ThreadId,
    /// Lock that this guard is for
    lock_id: LockId,
    /// The inner reentrant guard
    inner: ReentrantMutexGuard<'a, RefCell<T>>,
}

impl<T> Shared<T> {
    /// Create a new shared handle owning `value`
    ///
    /// Allocates fresh state holding the moved-in value and its lock,
    /// with a handle count of one.
    ///
    /// # Example
    ///
    /// ```rust
    /// use interlock::Shared;
    ///
    /// let names = Shared::new(vec!["mat".to_string()]);
    /// assert_eq!(names.handles(), 1);
    /// ```
    pub fn new(value: T) -> Self {
        let id = next_lock_id();
        trace::emit(get_current_thread_id(), id, Event::Created);

        Shared {
            state: Arc::new(State {
                id,
                cell: ReentrantMutex::new(RefCell::new(value)),
            }),
        }
    }

    /// Get the ID of the lock behind this handle
    pub fn id(&self) -> LockId {
        self.state.id
    }

    /// Acquire the shared lock and return a scoped accessor to the value
    ///
    /// Blocks until the lock is available. The lock is held for the
    /// guard's entire lifetime and released when it drops. Calls from
    /// other threads serialize; nested calls from the thread already
    /// holding the lock succeed immediately (the lock is reentrant).
    ///
    /// # Example
    ///
    /// ```rust
    /// use interlock::Shared;
    ///
    /// let data = Shared::new(vec![1, 2]);
    /// {
    ///     let guard = data.lock();
    ///     guard.get_mut().push(3);
    /// } // lock released here
    /// assert_eq!(data.lock().with(|v| v.len()), 3);
    /// ```
    pub fn lock(&self) -> SharedGuard<'_, T> {
        let thread_id = get_current_thread_id();

        trace::emit(thread_id, self.state.id, Event::Attempt);
        let inner = self.state.cell.lock();
        trace::emit(thread_id, self.state.id, Event::Acquired);

        SharedGuard {
            thread_id,
            lock_id: self.state.id,
            inner,
        }
    }

    /// Try to acquire the shared lock without blocking
    ///
    /// # Returns
    /// `Some(guard)` if the lock was acquired, `None` if another thread
    /// holds it.
    pub fn try_lock(&self) -> Option<SharedGuard<'_, T>> {
        let thread_id = get_current_thread_id();

        trace::emit(thread_id, self.state.id, Event::Attempt);
        let inner = self.state.cell.try_lock()?;
        trace::emit(thread_id, self.state.id, Event::Acquired);

        Some(SharedGuard {
            thread_id,
            lock_id: self.state.id,
            inner,
        })
    }

    /// The raw lock handle, for composing with multi-lock acquisition
    ///
    /// This is the deliberately separate "advanced" surface: pass it to
    /// [`synchronized`](crate::synchronized) or
    /// [`MultiLockGuard::acquire`](crate::MultiLockGuard::acquire)
    /// together with other handles' locks. Acquiring through the raw
    /// handle grants no access to the value; use [`lock`](Shared::lock)
    /// inside the critical section for that (it re-enters the held
    /// lock).
    ///
    /// # Example
    ///
    /// ```rust
    /// use interlock::{Shared, synchronized};
    ///
    /// let a = Shared::new(1);
    /// let b = Shared::new(2);
    /// let sum = synchronized(&[a.raw_lock(), b.raw_lock()], || {
    ///     a.lock().with(|a| *a) + b.lock().with(|b| *b)
    /// });
    /// assert_eq!(sum, 3);
    /// ```
    pub fn raw_lock(&self) -> &RawSharedLock {
        // `ReentrantMutex<RefCell<T>>` stores its `RawReentrantMutex`
        // (our `RawSharedLock`) as its leading field, so reborrow that to
        // drive the very lock this handle's guards take. `raw()` would
        // instead yield the inner `RawMutex`, one level too deep.
        // Acquiring through the raw handle is safe; releasing it is an
        // unsafe operation on RawSharedLock itself, so handing out the
        // reference cannot unlock behind a live guard's back.
        let cell: &ReentrantMutex<RefCell<T>> = &self.state.cell;
        unsafe { &*(cell as *const ReentrantMutex<RefCell<T>> as *const RawSharedLock) }
    }

    /// Number of live handles currently sharing this value
    ///
    /// The count is a snapshot; other threads may clone or drop handles
    /// concurrently.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.state)
    }

    /// Replace this handle's binding with fresh state owning `value`
    ///
    /// The old state loses one handle (and is freed if this was its last
    /// one); the new state starts with a count of one. Other handles
    /// still see the old value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use interlock::Shared;
    ///
    /// let mut data = Shared::new(1);
    /// let other = data.clone();
    /// data.assign(2);
    /// assert_eq!(data.lock().with(|v| *v), 2);
    /// assert_eq!(other.lock().with(|v| *v), 1);
    /// ```
    pub fn assign(&mut self, value: T) {
        *self = Shared::new(value);
    }

    /// Unsynchronized view of the value
    ///
    /// Does not acquire the lock.
    ///
    /// # Safety
    /// The caller must guarantee that no other thread mutates the value
    /// for the lifetime of the returned reference, either because no
    /// other handle escaped this thread yet or because the lock is held
    /// through some outer protocol.
    pub unsafe fn value_unchecked(&self) -> &T {
        // data_ptr does not touch the lock
        unsafe { &*(*self.state.cell.data_ptr()).as_ptr() }
    }

    /// Mutable access without locking, available while this handle is
    /// the only one
    ///
    /// The exclusive borrow plus the count check statically guarantee no
    /// concurrent access, so no locking is needed. Returns `None` once
    /// the value is shared.
    ///
    /// # Example
    ///
    /// ```rust
    /// use interlock::Shared;
    ///
    /// let mut data = Shared::new(0);
    /// *data.get_mut().unwrap() = 10;
    /// assert_eq!(data.lock().with(|v| *v), 10);
    /// ```
    pub fn get_mut(&mut self) -> Option<&mut T> {
        Arc::get_mut(&mut self.state).map(|state| state.cell.get_mut().get_mut())
    }

    /// Consume the handle and recover the value, if this is the last one
    ///
    /// # Returns
    /// `Ok(value)` when no other handle shares the state, `Err(self)`
    /// otherwise.
    ///
    /// # Example
    ///
    /// ```rust
    /// use interlock::Shared;
    ///
    /// let data = Shared::new(String::from("only"));
    /// assert_eq!(data.try_unwrap().unwrap(), "only");
    /// ```
    pub fn try_unwrap(self) -> Result<T, Self> {
        match Arc::try_unwrap(self.state) {
            Ok(state) => {
                trace::emit(get_current_thread_id(), state.id, Event::Destroyed);

                // Extract the cell while suppressing State's Drop, which
                // would otherwise emit a second Destroyed event.
                let state = std::mem::ManuallyDrop::new(state);
                // Safety: ownership moves here exactly once and the
                // automatic drop is suppressed.
                let cell = unsafe { std::ptr::read(&state.cell) };
                Ok(cell.into_inner().into_inner())
            }
            Err(state) => Err(Shared { state }),
        }
    }
}

impl<T> std::fmt::Debug for Shared<T> {
    /// Reports the lock identity and live handle count without touching
    /// (or locking) the guarded value.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("id", &self.state.id)
            .field("handles", &self.handles())
            .finish()
    }
}

impl<T> Clone for Shared<T> {
    /// Create another handle to the same value, incrementing the shared
    /// count
    fn clone(&self) -> Self {
        Shared {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Default> Default for Shared<T> {
    /// Creates a `Shared<T>` owning the default value for T
    fn default() -> Shared<T> {
        Shared::new(Default::default())
    }
}

impl<T> From<T> for Shared<T> {
    /// Creates a new shared handle owning `t`
    /// This is equivalent to Shared::new
    fn from(t: T) -> Self {
        Shared::new(t)
    }
}

impl<'a, T> SharedGuard<'a, T> {
    /// Immutable access to the guarded value
    ///
    /// # Panics
    /// Panics if a mutable borrow from another guard on this thread is
    /// still live.
    pub fn get(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    /// Mutable access to the guarded value
    ///
    /// Cross-thread exclusion comes from the lock this guard holds.
    /// Within the owning thread, reentrancy means several guards can be
    /// live at once, so borrows are checked at runtime.
    ///
    /// # Panics
    /// Panics if any borrow from another guard on this thread is still
    /// live.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Run `f` with shared access to the value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Run `f` with exclusive access to the value
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }
}

impl<T> Drop for SharedGuard<'_, T> {
    fn drop(&mut self) {
        // Report lock release; the inner guard unlocks after this
        trace::emit(self.thread_id, self.lock_id, Event::Released);
    }
}
