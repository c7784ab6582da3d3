//! Bounded buffer shared by producer and consumer threads.
//!
//! [`BoundedBuffer`] is a fixed-capacity FIFO ring gated by two counting
//! signals and one mutex:
//!
//! - `empty_slots` starts at the capacity. A producer takes one permit before
//!   writing, so it blocks while the ring is full.
//! - `full_slots` starts at zero. A consumer takes one permit before reading,
//!   so it blocks while the ring is empty.
//! - The mutex guards the ring, both cursors, the occupancy and the
//!   statistics. Every mutation happens inside it.
//!
//! Each operation waits on its signal, locks, mutates, unlocks, then releases
//! the opposite signal. Items come out in the order they went in, across all
//! producers and consumers.
//!
//! # Shutdown
//!
//! [`BoundedBuffer::close`] is the drain step. It wakes every thread parked on
//! either signal exactly once. Afterwards inserts fail with
//! [`BufferError::Closed`], and removes keep returning the remaining items
//! until the ring is empty, then fail with [`BufferError::Closed`] instead of
//! blocking.
//!
//! # Example
//!
//! ```
//! use prodcon::buffer::BoundedBuffer;
//!
//! let buffer = BoundedBuffer::new(5, false).unwrap();
//!
//! for item in [7, 42, 3] {
//!     buffer.insert(item).unwrap();
//! }
//! assert_eq!(buffer.remove(), Ok(7));
//! assert_eq!(buffer.remove(), Ok(42));
//! assert_eq!(buffer.remove(), Ok(3));
//! assert_eq!(buffer.occupancy(), 0);
//! ```

mod ring;

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use std::thread;

use crate::sync::{Closed, Semaphore};
use crate::trace::{info, trace};

use ring::SlotRing;
pub use ring::{BufferItem, Snapshot, Stats};

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 5;

/// Errors returned by buffer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// Capacity of zero requested at init.
    #[error("buffer capacity must be greater than 0")]
    InvalidCapacity,
    /// Non-blocking insert found no free slot.
    #[error("buffer is full")]
    Full,
    /// Non-blocking remove found no item.
    #[error("buffer is empty")]
    Empty,
    /// The buffer was closed by the drain step.
    #[error("buffer is closed")]
    Closed,
}

impl From<Closed> for BufferError {
    fn from(_: Closed) -> Self {
        Self::Closed
    }
}

/// Threads parked in the buffer's blocking waits.
///
/// Returned by [`BoundedBuffer::close`] for the threads it released, and by
/// [`BoundedBuffer::parked`] for the threads waiting right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Parked {
    /// Producers that were parked waiting for a free slot.
    pub producers: usize,
    /// Consumers that were parked waiting for an item.
    pub consumers: usize,
}

impl Parked {
    #[must_use]
    pub fn total(&self) -> usize {
        self.producers + self.consumers
    }
}

#[derive(Debug)]
struct Guarded {
    ring: SlotRing,
    closed: bool,
}

/// Fixed-capacity FIFO shared by any number of producers and consumers.
///
/// Share it between threads with an [`Arc`](std::sync::Arc); every operation
/// takes `&self`.
#[derive(Debug)]
pub struct BoundedBuffer {
    state: Mutex<Guarded>,
    empty_slots: Semaphore,
    full_slots: Semaphore,
    capacity: usize,
    verbose: bool,
}

impl BoundedBuffer {
    /// Creates an empty buffer holding at most `capacity` items.
    ///
    /// With `verbose` set, every insert and remove prints an event line and a
    /// ring snapshot to stdout from inside the critical section, so the
    /// output of concurrent workers never interleaves.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize, verbose: bool) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidCapacity);
        }
        Ok(Self {
            state: Mutex::new(Guarded {
                ring: SlotRing::new(capacity),
                closed: false,
            }),
            empty_slots: Semaphore::new(capacity),
            full_slots: Semaphore::new(0),
            capacity,
            verbose,
        })
    }

    /// Resets the buffer to its starting state.
    ///
    /// All slots become empty, cursors, occupancy and statistics return to
    /// zero, and both signals are rebuilt. The exclusive borrow guarantees no
    /// worker is using the buffer meanwhile.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidCapacity`] if `capacity` is zero, leaving
    /// the buffer untouched.
    pub fn init(&mut self, capacity: usize, verbose: bool) -> Result<(), BufferError> {
        *self = Self::new(capacity, verbose)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Guarded> {
        // A poisoned lock means a worker panicked mid-mutation; the ring can
        // no longer be trusted.
        self.state
            .lock()
            .expect("bounded buffer lock poisoned by a panicking worker")
    }

    /// Inserts `item`, blocking while the buffer is full.
    ///
    /// There is no timeout: the call parks until a consumer frees a slot or
    /// the buffer is closed.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Closed`] if the buffer has been closed.
    pub fn insert(&self, item: BufferItem) -> Result<(), BufferError> {
        self.empty_slots.acquire()?;
        self.commit_insert(item)
    }

    /// Inserts `item` if a slot is free, without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Full`] if no slot is free, or
    /// [`BufferError::Closed`] if the buffer has been closed.
    pub fn try_insert(&self, item: BufferItem) -> Result<(), BufferError> {
        if self.is_closed() {
            return Err(BufferError::Closed);
        }
        if !self.empty_slots.try_acquire() {
            return Err(BufferError::Full);
        }
        self.commit_insert(item)
    }

    /// Critical section of an insert. The caller holds one `empty_slots` permit.
    fn commit_insert(&self, item: BufferItem) -> Result<(), BufferError> {
        let mut state = self.lock();
        if state.closed {
            drop(state);
            // Hand the permit back so the slot accounting stays exact.
            self.empty_slots.release();
            return Err(BufferError::Closed);
        }

        state.ring.push(item);
        trace!(item, occupancy = state.ring.occupancy(), "inserted");
        if self.verbose {
            emit(&state.ring, format_args!("{} writes {item}", worker_name()));
        }
        drop(state);

        self.full_slots.release();
        Ok(())
    }

    /// Removes the oldest item, blocking while the buffer is empty.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Closed`] once the buffer has been closed and no
    /// item is left.
    pub fn remove(&self) -> Result<BufferItem, BufferError> {
        loop {
            match self.full_slots.acquire() {
                Ok(()) => return Ok(self.commit_remove()),
                Err(Closed) if self.has_unclaimed_items() => thread::yield_now(),
                Err(Closed) => return Err(BufferError::Closed),
            }
        }
    }

    /// Whether the ring still holds items after `full_slots` reported closed.
    ///
    /// Each such item is either signalled by a producer that has not yet
    /// released its `full_slots` permit or about to be taken by a consumer
    /// that holds one, so a waiting remove ends either way.
    fn has_unclaimed_items(&self) -> bool {
        self.lock().ring.occupancy() > 0
    }

    /// Removes the oldest item if there is one, without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Closed`] if the buffer is closed and empty, or
    /// [`BufferError::Empty`] if no item is available right now.
    pub fn try_remove(&self) -> Result<BufferItem, BufferError> {
        if self.full_slots.try_acquire() {
            return Ok(self.commit_remove());
        }
        let state = self.lock();
        if state.closed && state.ring.occupancy() == 0 {
            Err(BufferError::Closed)
        } else {
            Err(BufferError::Empty)
        }
    }

    /// Critical section of a remove. The caller holds one `full_slots` permit.
    fn commit_remove(&self) -> BufferItem {
        let mut state = self.lock();
        let item = state.ring.pop();
        trace!(item, occupancy = state.ring.occupancy(), "removed");
        if self.verbose {
            emit(&state.ring, format_args!("{} consumes {item}", worker_name()));
        }
        drop(state);

        self.empty_slots.release();
        item
    }

    /// Closes the buffer and releases every parked thread.
    ///
    /// Each thread parked in [`insert`](Self::insert) or
    /// [`remove`](Self::remove) is woken exactly once. Calling `close` again
    /// releases nobody.
    pub fn close(&self) -> Parked {
        let mut state = self.lock();
        let already_closed = state.closed;
        state.closed = true;
        drop(state);

        let drained = Parked {
            producers: self.empty_slots.close(),
            consumers: self.full_slots.close(),
        };
        if !already_closed {
            info!(
                producers = drained.producers,
                consumers = drained.consumers,
                "buffer closed, parked workers released"
            );
        }
        drained
    }

    /// Threads currently parked in [`insert`](Self::insert) and
    /// [`remove`](Self::remove).
    #[must_use]
    pub fn parked(&self) -> Parked {
        Parked {
            producers: self.empty_slots.waiters(),
            consumers: self.full_slots.waiters(),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Current fill level. Diagnostic only; it may be stale by the time the
    /// caller looks at it.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.lock().ring.occupancy()
    }

    /// All four counters, read together under the lock.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.lock().ring.stats()
    }

    #[must_use]
    pub fn total_produced(&self) -> u64 {
        self.stats().total_produced
    }

    #[must_use]
    pub fn total_consumed(&self) -> u64 {
        self.stats().total_consumed
    }

    #[must_use]
    pub fn times_buffer_full(&self) -> u64 {
        self.stats().times_buffer_full
    }

    #[must_use]
    pub fn times_buffer_empty(&self) -> u64 {
        self.stats().times_buffer_empty
    }

    /// Copy of the ring contents, cursors and occupancy.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.lock().ring.snapshot()
    }
}

/// Prints an event line and the ring. Called with the buffer lock held.
fn emit(ring: &SlotRing, event: fmt::Arguments<'_>) {
    let mut out = std::io::stdout().lock();
    // Diagnostic output only; a closed stdout must not take a worker down.
    let _ = write!(out, "{event}\n{}", ring.snapshot());
}

fn worker_name() -> String {
    thread::current().name().unwrap_or("worker").to_owned()
}
