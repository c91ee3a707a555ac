//! Bounded, drop-oldest frame buffer.

use std::collections::VecDeque;

/// FIFO of encoded frames awaiting delivery.
///
/// The buffer never holds more than its capacity. Pushing onto a full buffer
/// evicts the oldest frame, so after an outage the most recent frames are
/// the ones that survive.
#[derive(Debug)]
pub struct PendingBuffer {
    frames: VecDeque<Vec<u8>>,
    capacity: usize,
    evicted: u64,
}

impl PendingBuffer {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames evicted since construction.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Append `frame`, returning the evicted frame when the buffer was full.
    pub fn push(&mut self, frame: Vec<u8>) -> Option<Vec<u8>> {
        let evicted = if self.frames.len() >= self.capacity {
            self.evicted += 1;
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    /// Remove and return every buffered frame, oldest first.
    pub fn take_all(&mut self) -> VecDeque<Vec<u8>> {
        std::mem::take(&mut self.frames)
    }

    /// Put frames that could not be written back in front of anything queued
    /// since they were taken. Returns how many frames were evicted to stay
    /// within capacity.
    pub fn restore_front(&mut self, mut unsent: VecDeque<Vec<u8>>) -> u64 {
        if unsent.is_empty() {
            return 0;
        }
        unsent.append(&mut self.frames);
        let mut evicted = 0;
        while unsent.len() > self.capacity {
            unsent.pop_front();
            evicted += 1;
        }
        self.frames = unsent;
        self.evicted += evicted;
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.frames.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn frames(buffer: &PendingBuffer) -> Vec<&[u8]> {
        buffer.iter().collect()
    }

    #[rstest]
    fn evicts_oldest_when_full() {
        let mut buffer = PendingBuffer::new(3);
        for frame in [b"A", b"B", b"C"] {
            assert!(buffer.push(frame.to_vec()).is_none());
        }
        let evicted = buffer.push(b"D".to_vec());
        assert_eq!(evicted.as_deref(), Some(&b"A"[..]));
        assert_eq!(frames(&buffer), vec![&b"B"[..], &b"C"[..], &b"D"[..]]);
        assert_eq!(buffer.evicted(), 1);
    }

    #[rstest]
    fn restore_front_keeps_order_and_bound() {
        let mut buffer = PendingBuffer::new(3);
        buffer.push(b"A".to_vec());
        buffer.push(b"B".to_vec());
        let taken = buffer.take_all();
        buffer.push(b"C".to_vec());
        buffer.push(b"D".to_vec());

        let evicted = buffer.restore_front(taken);
        assert_eq!(evicted, 1);
        assert_eq!(frames(&buffer), vec![&b"B"[..], &b"C"[..], &b"D"[..]]);
    }

    #[rstest]
    fn zero_capacity_is_raised_to_one() {
        let mut buffer = PendingBuffer::new(0);
        buffer.push(b"A".to_vec());
        buffer.push(b"B".to_vec());
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(frames(&buffer), vec![&b"B"[..]]);
    }

    proptest! {
        #[test]
        fn keeps_the_newest_frames_in_order(
            capacity in 1usize..16,
            count in 0usize..64,
        ) {
            let mut buffer = PendingBuffer::new(capacity);
            for i in 0..count {
                buffer.push(i.to_le_bytes().to_vec());
                prop_assert!(buffer.len() <= capacity);
            }
            let expected: Vec<Vec<u8>> = (count.saturating_sub(capacity)..count)
                .map(|i| i.to_le_bytes().to_vec())
                .collect();
            let actual: Vec<Vec<u8>> = buffer.iter().map(<[u8]>::to_vec).collect();
            prop_assert_eq!(actual, expected);
            prop_assert_eq!(buffer.evicted(), count.saturating_sub(capacity) as u64);
        }
    }
}
