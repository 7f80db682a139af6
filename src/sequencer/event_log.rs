// Event log - ordered capture of note messages tagged with their arrival tick

use crate::midi::event::{NoteKind, is_note_status};

/// Note message as received, stamped with the tick it arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// -1 when the message arrived before the first tick of the pass
    pub tick: i64,
    /// 128..=159
    pub status: u8,
    pub pitch: u8,
    pub velocity: u8,
}

impl RawEvent {
    pub fn kind(&self) -> NoteKind {
        // status is always in the note range, so classification cannot fail
        NoteKind::classify(self.status, self.velocity).unwrap_or(NoteKind::Off)
    }

    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }
}

/// Append-only log of one recording pass
///
/// Insertion order is arrival order, which is also non-decreasing by tick
/// because the clock never moves backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<RawEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw message if it is a note-on/note-off
    ///
    /// Anything else (control change, pitch bend, system messages, truncated
    /// messages) is dropped. Returns whether the message was kept.
    pub fn record(&mut self, message: &[u8], tick: i64) -> bool {
        if message.len() < 3 || !is_note_status(message[0]) {
            return false;
        }

        self.events.push(RawEvent {
            tick,
            status: message[0],
            pitch: message[1] & 0x7F,
            velocity: message[2] & 0x7F,
        });
        true
    }

    pub fn events(&self) -> &[RawEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl FromIterator<RawEvent> for EventLog {
    fn from_iter<I: IntoIterator<Item = RawEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}
