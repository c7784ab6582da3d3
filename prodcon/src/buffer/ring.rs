//! Slot ring storage behind the bounded buffer's lock.
//!
//! [`SlotRing`] is the plain, unsynchronized circular array: slots, cursors,
//! occupancy and statistics. [`crate::buffer::BoundedBuffer`] owns one inside
//! its mutex and only touches it from the critical section, after the
//! matching counting signal has been acquired.
//!
//! The ring checks its own invariants on every mutation. A write into an
//! occupied slot or a read from an empty one means the signals and the ring
//! disagree, which is a contract violation and panics rather than corrupting
//! data.

use std::fmt;

/// The item type carried by the buffer.
pub type BufferItem = i32;

/// Event counters maintained inside the critical section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Items successfully inserted since init.
    pub total_produced: u64,
    /// Items successfully removed since init.
    pub total_consumed: u64,
    /// Inserts that left the buffer exactly full.
    pub times_buffer_full: u64,
    /// Removes that left the buffer exactly empty.
    pub times_buffer_empty: u64,
}

/// Fixed-capacity circular array of optional items.
#[derive(Debug)]
pub(crate) struct SlotRing {
    slots: Box<[Option<BufferItem>]>,
    write_index: usize,
    read_index: usize,
    occupancy: usize,
    stats: Stats,
}

impl SlotRing {
    /// Creates an empty ring. `capacity` must be non-zero.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "ring capacity must be non-zero");
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            write_index: 0,
            read_index: 0,
            occupancy: 0,
            stats: Stats::default(),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn occupancy(&self) -> usize {
        self.occupancy
    }

    #[inline]
    pub(crate) fn stats(&self) -> Stats {
        self.stats
    }

    /// Writes `item` at the write cursor and advances it.
    ///
    /// # Panics
    ///
    /// Panics if the ring is full or the target slot is occupied.
    pub(crate) fn push(&mut self, item: BufferItem) {
        assert!(
            self.occupancy < self.capacity(),
            "insert into a full ring (occupancy {}, capacity {})",
            self.occupancy,
            self.capacity()
        );
        let slot = &mut self.slots[self.write_index];
        assert!(
            slot.is_none(),
            "insert would overwrite occupied slot {}",
            self.write_index
        );
        *slot = Some(item);

        self.write_index = (self.write_index + 1) % self.capacity();
        self.occupancy += 1;
        self.stats.total_produced += 1;
        if self.occupancy == self.capacity() {
            self.stats.times_buffer_full += 1;
        }
    }

    /// Takes the item at the read cursor and advances it.
    ///
    /// # Panics
    ///
    /// Panics if the slot under the read cursor is empty.
    pub(crate) fn pop(&mut self) -> BufferItem {
        let Some(item) = self.slots[self.read_index].take() else {
            panic!(
                "remove from empty slot {} (occupancy {})",
                self.read_index, self.occupancy
            );
        };

        self.read_index = (self.read_index + 1) % self.capacity();
        self.occupancy -= 1;
        self.stats.total_consumed += 1;
        if self.occupancy == 0 {
            self.stats.times_buffer_empty += 1;
        }
        item
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            slots: self.slots.to_vec(),
            write_index: self.write_index,
            read_index: self.read_index,
            occupancy: self.occupancy,
        }
    }
}

/// Copy of the ring taken under the lock, for diagnostics.
///
/// The [`Display`](fmt::Display) form prints a header line followed by one
/// `[index]: value` line per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    slots: Vec<Option<BufferItem>>,
    write_index: usize,
    read_index: usize,
    occupancy: usize,
}

impl Snapshot {
    #[must_use]
    pub fn slots(&self) -> &[Option<BufferItem>] {
        &self.slots
    }

    #[must_use]
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    #[must_use]
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    /// Occupied items in removal order, starting at the read cursor.
    #[must_use]
    pub fn items(&self) -> Vec<BufferItem> {
        let capacity = self.slots.len();
        (0..self.occupancy)
            .filter_map(|offset| self.slots[(self.read_index + offset) % capacity])
            .collect()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "buffer {}/{} (read {}, write {})",
            self.occupancy,
            self.slots.len(),
            self.read_index,
            self.write_index
        )?;
        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                Some(item) => writeln!(f, "[{index}]:\t{item}")?,
                None => writeln!(f, "[{index}]:\tempty")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_fifo() {
        let mut ring = SlotRing::new(4);

        ring.push(1);
        ring.push(2);
        ring.push(3);
        assert_eq!(ring.occupancy(), 3);

        assert_eq!(ring.pop(), 1);
        assert_eq!(ring.pop(), 2);
        assert_eq!(ring.pop(), 3);
        assert_eq!(ring.occupancy(), 0);
    }

    #[test]
    fn test_wrapping_behavior() {
        let mut ring = SlotRing::new(3);

        for round in 0..5 {
            for i in 0..3 {
                ring.push(round * 10 + i);
            }
            for i in 0..3 {
                assert_eq!(ring.pop(), round * 10 + i);
            }
        }

        let stats = ring.stats();
        assert_eq!(stats.total_produced, 15);
        assert_eq!(stats.total_consumed, 15);
        assert_eq!(stats.times_buffer_full, 5);
        assert_eq!(stats.times_buffer_empty, 5);
    }

    #[test]
    fn test_threshold_counters_count_crossings() {
        let mut ring = SlotRing::new(2);

        ring.push(1);
        assert_eq!(ring.stats().times_buffer_full, 0);
        ring.push(2);
        assert_eq!(ring.stats().times_buffer_full, 1);

        assert_eq!(ring.pop(), 1);
        assert_eq!(ring.stats().times_buffer_empty, 0);
        ring.push(3);
        assert_eq!(ring.stats().times_buffer_full, 2);

        assert_eq!(ring.pop(), 2);
        assert_eq!(ring.pop(), 3);
        assert_eq!(ring.stats().times_buffer_empty, 1);
    }

    #[test]
    #[should_panic(expected = "insert into a full ring")]
    fn test_push_into_full_ring_panics() {
        let mut ring = SlotRing::new(1);
        ring.push(1);
        ring.push(2);
    }

    #[test]
    #[should_panic(expected = "remove from empty slot")]
    fn test_pop_from_empty_ring_panics() {
        let mut ring = SlotRing::new(2);
        ring.pop();
    }

    #[test]
    fn test_negative_items_are_real_items() {
        let mut ring = SlotRing::new(2);
        ring.push(-1);
        assert_eq!(ring.occupancy(), 1);
        assert_eq!(ring.pop(), -1);
    }

    #[test]
    fn test_snapshot_items_follow_read_cursor() {
        let mut ring = SlotRing::new(3);
        ring.push(7);
        ring.push(42);
        ring.pop();
        ring.push(3);
        ring.push(9);

        let snapshot = ring.snapshot();
        assert_eq!(snapshot.read_index(), 1);
        assert_eq!(snapshot.write_index(), 1);
        assert_eq!(snapshot.slots(), &[Some(9), Some(42), Some(3)]);
        assert_eq!(snapshot.items(), vec![42, 3, 9]);
    }

    #[test]
    fn test_snapshot_display() {
        let mut ring = SlotRing::new(3);
        ring.push(5);

        let rendered = ring.snapshot().to_string();
        assert_eq!(
            rendered,
            "buffer 1/3 (read 0, write 1)\n[0]:\t5\n[1]:\tempty\n[2]:\tempty\n"
        );
    }
}
