//! Synchronization primitives for in-process coordination.
//!
//! This module provides the blocking counting signal that gates access to
//! the bounded buffer. Mutual exclusion itself is a plain [`std::sync::Mutex`].

pub mod semaphore;

pub use semaphore::{Closed, Semaphore};
