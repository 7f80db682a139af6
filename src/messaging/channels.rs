// Inbound channel - lock-free hand-off from the MIDI callback to the polling loop
// The loop owns clock and log; the callback only reads a tick snapshot and pushes

use crate::midi::event::is_note_status;
use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Raw message stamped with the tick it arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedMessage {
    pub tick: i64,
    bytes: [u8; 3],
    len: u8,
}

impl TimedMessage {
    /// Keeps at most the first three bytes
    pub fn new(tick: i64, message: &[u8]) -> Self {
        let mut bytes = [0; 3];
        let len = message.len().min(3);
        bytes[..len].copy_from_slice(&message[..len]);
        Self {
            tick,
            bytes,
            len: len as u8,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

pub type InboundProducer = ringbuf::HeapProd<TimedMessage>;
pub type InboundConsumer = ringbuf::HeapCons<TimedMessage>;

pub fn create_inbound_channel(capacity: usize) -> (InboundProducer, InboundConsumer) {
    let rb = HeapRb::<TimedMessage>::new(capacity);
    rb.split()
}

/// Current tick as last published by the polling loop
#[derive(Debug, Clone)]
pub struct TickSnapshot {
    inner: Arc<AtomicI64>,
}

impl TickSnapshot {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AtomicI64::new(-1)),
        }
    }

    pub fn load(&self) -> i64 {
        self.inner.load(Ordering::Acquire)
    }

    pub fn store(&self, tick: i64) {
        self.inner.store(tick, Ordering::Release);
    }
}

impl Default for TickSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback side of the inbound channel
///
/// `deliver` never blocks: it stamps the message with the published tick
/// and tries to push it. Non-note messages never enter the ring.
pub struct InboundHandle {
    producer: InboundProducer,
    tick: TickSnapshot,
    dropped: Arc<AtomicU64>,
}

impl InboundHandle {
    pub fn new(producer: InboundProducer, tick: TickSnapshot) -> Self {
        Self {
            producer,
            tick,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns whether the message was queued
    pub fn deliver(&mut self, message: &[u8]) -> bool {
        match message.first() {
            Some(status) if is_note_status(*status) => {}
            _ => return false,
        }

        let timed = TimedMessage::new(self.tick.load(), message);
        if self.producer.try_push(timed).is_err() {
            // Full buffer - ignore the event
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::warn!("MIDI buffer full, event ignored");
            return false;
        }
        true
    }

    /// Shared counter of messages lost to a full ring
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::Consumer;

    #[test]
    fn test_timed_message_truncates() {
        let msg = TimedMessage::new(4, &[0x90, 60, 100, 0x80]);
        assert_eq!(msg.bytes(), &[0x90, 60, 100]);
        assert_eq!(TimedMessage::new(0, &[0xF8]).bytes(), &[0xF8]);
    }

    #[test]
    fn test_deliver_stamps_published_tick() {
        let (producer, mut consumer) = create_inbound_channel(8);
        let snapshot = TickSnapshot::new();
        let mut handle = InboundHandle::new(producer, snapshot.clone());

        assert!(handle.deliver(&[0x90, 60, 100]));
        snapshot.store(12);
        assert!(handle.deliver(&[0x80, 60, 0]));

        let received: Vec<TimedMessage> = consumer.pop_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].tick, -1);
        assert_eq!(received[1].tick, 12);
    }

    #[test]
    fn test_deliver_skips_non_note_messages() {
        let (producer, mut consumer) = create_inbound_channel(8);
        let mut handle = InboundHandle::new(producer, TickSnapshot::new());

        assert!(!handle.deliver(&[0xF8]));
        assert!(!handle.deliver(&[0xB0, 64, 127]));
        assert!(!handle.deliver(&[]));
        assert!(consumer.try_pop().is_none());
    }

    #[test]
    fn test_full_ring_drops() {
        let (producer, _consumer) = create_inbound_channel(2);
        let mut handle = InboundHandle::new(producer, TickSnapshot::new());
        let dropped = handle.dropped_counter();

        assert!(handle.deliver(&[0x90, 60, 1]));
        assert!(handle.deliver(&[0x90, 61, 1]));
        assert!(!handle.deliver(&[0x90, 62, 1]));
        assert_eq!(dropped.load(Ordering::Relaxed), 1);
    }
}
