//! # prodcon - bounded-buffer producer/consumer coordinator
//!
//! A fixed-capacity circular queue shared by any number of producer and
//! consumer threads. Producers block while the buffer is full, consumers
//! block while it is empty, and a single mutex serializes every mutation of
//! the ring.
//!
//! - [`buffer`] - the [`BoundedBuffer`] core: ring, cursors, statistics and
//!   the blocking insert/remove protocol
//! - [`sync`] - the counting signal the buffer waits on
//! - [`runtime`] - a driver that runs producer and consumer threads against
//!   one buffer for a fixed duration and reports per-run statistics
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use prodcon::BoundedBuffer;
//!
//! let buffer = Arc::new(BoundedBuffer::new(2, false).unwrap());
//!
//! let producer = {
//!     let buffer = Arc::clone(&buffer);
//!     thread::spawn(move || {
//!         for item in 0..10 {
//!             buffer.insert(item).unwrap();
//!         }
//!     })
//! };
//!
//! let received: Vec<_> = (0..10).map(|_| buffer.remove().unwrap()).collect();
//! producer.join().unwrap();
//!
//! assert_eq!(received, (0..10).collect::<Vec<_>>());
//! ```

pub mod buffer;
pub mod runtime;
pub mod sync;
mod trace;

pub use buffer::{BoundedBuffer, BufferError, BufferItem};
pub use trace::init_tracing;
