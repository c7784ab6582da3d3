//! Producer and consumer thread loops.
//!
//! Each worker polls the shared running flag once per full cycle (pause, then
//! one buffer operation). A worker parked inside the buffer cannot see the
//! flag; it is woken by [`BoundedBuffer::close`] and leaves its loop when the
//! buffer reports [`BufferError::Closed`](crate::BufferError::Closed).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::buffer::{BoundedBuffer, BufferItem};
use crate::trace::{debug, info};

use super::simulation::ITEM_MAX;

/// Random pause between buffer operations.
pub(crate) struct Pacer {
    rng: StdRng,
    max_sleep: Duration,
}

impl Pacer {
    /// Seeded pacers are reproducible; unseeded ones draw from OS entropy.
    pub(crate) fn new(max_sleep: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, max_sleep }
    }

    /// Sleeps for a uniformly random duration in `[0, max_sleep]`.
    fn pause(&mut self) {
        let nap = self.rng.gen_range(Duration::ZERO..=self.max_sleep);
        if !nap.is_zero() {
            thread::sleep(nap);
        }
    }

    fn next_item(&mut self) -> BufferItem {
        self.rng.gen_range(0..=ITEM_MAX)
    }
}

/// Inserts random items until shutdown. Returns how many it inserted.
pub(crate) struct Producer {
    id: usize,
    buffer: Arc<BoundedBuffer>,
    running: Arc<AtomicBool>,
    pacer: Pacer,
}

impl Producer {
    pub(crate) fn new(
        id: usize,
        buffer: Arc<BoundedBuffer>,
        running: Arc<AtomicBool>,
        pacer: Pacer,
    ) -> Self {
        Self {
            id,
            buffer,
            running,
            pacer,
        }
    }

    pub(crate) fn run(&mut self) -> u64 {
        info!(id = self.id, "producer started");
        let mut produced = 0u64;

        while self.running.load(Ordering::Acquire) {
            self.pacer.pause();
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            let item = self.pacer.next_item();
            match self.buffer.insert(item) {
                Ok(()) => produced += 1,
                Err(error) => {
                    debug!(id = self.id, %error, "insert rejected");
                    break;
                }
            }
        }

        info!(id = self.id, produced, "producer exiting");
        produced
    }
}

/// Removes items until shutdown. Returns how many it removed.
pub(crate) struct Consumer {
    id: usize,
    buffer: Arc<BoundedBuffer>,
    running: Arc<AtomicBool>,
    pacer: Pacer,
}

impl Consumer {
    pub(crate) fn new(
        id: usize,
        buffer: Arc<BoundedBuffer>,
        running: Arc<AtomicBool>,
        pacer: Pacer,
    ) -> Self {
        Self {
            id,
            buffer,
            running,
            pacer,
        }
    }

    pub(crate) fn run(&mut self) -> u64 {
        info!(id = self.id, "consumer started");
        let mut consumed = 0u64;

        while self.running.load(Ordering::Acquire) {
            self.pacer.pause();
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            match self.buffer.remove() {
                Ok(_item) => consumed += 1,
                Err(error) => {
                    debug!(id = self.id, %error, "remove rejected");
                    break;
                }
            }
        }

        info!(id = self.id, consumed, "consumer exiting");
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_pacers_repeat() {
        let mut a = Pacer::new(Duration::ZERO, Some(7));
        let mut b = Pacer::new(Duration::ZERO, Some(7));

        let first: Vec<_> = (0..16).map(|_| a.next_item()).collect();
        let second: Vec<_> = (0..16).map(|_| b.next_item()).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|item| (0..=ITEM_MAX).contains(item)));
    }

    #[test]
    fn test_producer_stops_on_closed_buffer() {
        let buffer = Arc::new(BoundedBuffer::new(2, false).unwrap());
        let running = Arc::new(AtomicBool::new(true));
        buffer.close();

        let mut producer = Producer::new(
            0,
            Arc::clone(&buffer),
            running,
            Pacer::new(Duration::ZERO, Some(1)),
        );
        assert_eq!(producer.run(), 0);
        assert_eq!(buffer.occupancy(), 0);
    }

    #[test]
    fn test_consumer_drains_then_stops_on_closed_buffer() {
        let buffer = Arc::new(BoundedBuffer::new(3, false).unwrap());
        let running = Arc::new(AtomicBool::new(true));
        buffer.insert(1).unwrap();
        buffer.insert(2).unwrap();
        buffer.close();

        let mut consumer = Consumer::new(
            0,
            Arc::clone(&buffer),
            running,
            Pacer::new(Duration::ZERO, Some(1)),
        );
        assert_eq!(consumer.run(), 2);
        assert_eq!(buffer.total_consumed(), 2);
    }

    #[test]
    fn test_cleared_flag_stops_before_touching_buffer() {
        let buffer = Arc::new(BoundedBuffer::new(2, false).unwrap());
        let running = Arc::new(AtomicBool::new(false));

        let mut producer = Producer::new(
            0,
            Arc::clone(&buffer),
            running,
            Pacer::new(Duration::ZERO, None),
        );
        assert_eq!(producer.run(), 0);
        assert_eq!(buffer.stats(), crate::buffer::Stats::default());
    }
}
