//! Blocking counting semaphore with a close (drain) operation.
//!
//! A [`Semaphore`] tracks a count of available permits. [`Semaphore::acquire`]
//! parks the calling thread on a condition variable until a permit can be
//! taken, and [`Semaphore::release`] returns one permit and wakes one waiter.
//!
//! # Closing
//!
//! Parked waiters cannot observe a cooperative shutdown flag on their own.
//! [`Semaphore::close`] wakes every thread parked at that instant and reports
//! how many there were. Each of them is released exactly once: it either takes
//! a real permit that was already available, or returns [`Closed`]. Closing
//! never mints permits, so it cannot hand out capacity that does not exist.
//!
//! # Example
//!
//! ```
//! use prodcon::sync::Semaphore;
//!
//! let sem = Semaphore::new(1);
//! sem.acquire().unwrap();
//! assert!(!sem.try_acquire());
//! sem.release();
//! assert_eq!(sem.available(), 1);
//!
//! assert_eq!(sem.close(), 0);
//! assert!(sem.acquire().is_ok()); // the remaining permit is still granted
//! assert!(sem.acquire().is_err());
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Returned by [`Semaphore::acquire`] when the semaphore is closed and no
/// permit is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("semaphore closed")]
pub struct Closed;

#[derive(Debug)]
struct State {
    permits: usize,
    /// Threads currently parked in `acquire`.
    waiters: usize,
    closed: bool,
}

/// Counting signal guarded by a mutex and a condition variable.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<State>,
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State {
                permits,
                waiters: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // State updates are single counter writes that cannot panic halfway,
    // so a poisoned guard still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes one permit, parking the calling thread until one is available.
    ///
    /// There is no timeout. The call returns only when a permit was taken or
    /// the semaphore was closed with none left.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the semaphore is closed and holds no permit.
    pub fn acquire(&self) -> Result<(), Closed> {
        let mut state = self.lock();
        loop {
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            if state.closed {
                return Err(Closed);
            }
            state.waiters += 1;
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiters -= 1;
        }
    }

    /// Takes one permit if one is available, without blocking.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut state = self.lock();
        if state.permits == 0 {
            return false;
        }
        state.permits -= 1;
        true
    }

    /// Returns one permit and wakes one parked waiter, if any.
    pub fn release(&self) {
        let mut state = self.lock();
        state.permits += 1;
        drop(state);
        self.available.notify_one();
    }

    /// Closes the semaphore and wakes every parked waiter.
    ///
    /// Returns the number of threads that were parked when the call was made.
    /// A second call finds nobody left to release and returns 0 for an idle
    /// semaphore.
    pub fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let parked = state.waiters;
        drop(state);
        self.available.notify_all();
        parked
    }

    /// Current number of permits.
    #[must_use]
    pub fn available(&self) -> usize {
        self.lock().permits
    }

    /// Number of threads parked in [`Semaphore::acquire`].
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.lock().waiters
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
