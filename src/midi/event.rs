// MIDI note messages - classification of raw status bytes and wire encoding

use std::ops::Range;

/// Note-off status bytes across all 16 channels
pub const NOTE_OFF_STATUS: Range<u8> = 0x80..0x90;
/// Note-on status bytes across all 16 channels
pub const NOTE_ON_STATUS: Range<u8> = 0x90..0xA0;

/// True for note-on/note-off status bytes (128..160)
pub fn is_note_status(status: u8) -> bool {
    NOTE_OFF_STATUS.start <= status && status < NOTE_ON_STATUS.end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    On,
    Off,
}

impl NoteKind {
    /// Classify a status/velocity pair
    /// Note-on with velocity 0 is a release on most keyboards
    pub fn classify(status: u8, velocity: u8) -> Option<Self> {
        if NOTE_ON_STATUS.contains(&status) {
            if velocity == 0 {
                Some(NoteKind::Off)
            } else {
                Some(NoteKind::On)
            }
        } else if NOTE_OFF_STATUS.contains(&status) {
            Some(NoteKind::Off)
        } else {
            None
        }
    }
}

/// Note message sent to an output sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMessage {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
}

impl NoteMessage {
    pub fn pitch(&self) -> u8 {
        match *self {
            NoteMessage::NoteOn { pitch, .. } | NoteMessage::NoteOff { pitch } => pitch,
        }
    }

    /// Encode for the wire on `channel` (0-15)
    pub fn to_bytes(&self, channel: u8) -> [u8; 3] {
        let channel = channel & 0x0F;
        match *self {
            NoteMessage::NoteOn { pitch, velocity } => {
                [0x90 | channel, pitch & 0x7F, velocity & 0x7F]
            }
            NoteMessage::NoteOff { pitch } => [0x80 | channel, pitch & 0x7F, 0],
        }
    }

    /// Parse a raw MIDI message, ignoring everything but notes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }

        let (status, pitch, velocity) = (bytes[0], bytes[1], bytes[2]);
        match NoteKind::classify(status, velocity)? {
            NoteKind::On => Some(NoteMessage::NoteOn { pitch, velocity }),
            NoteKind::Off => Some(NoteMessage::NoteOff { pitch }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_status_range() {
        assert!(!is_note_status(0x7F));
        assert!(is_note_status(0x80));
        assert!(is_note_status(0x9F));
        assert!(!is_note_status(0xA0));
        assert!(!is_note_status(0xB0)); // Control change
        assert!(!is_note_status(0xE0)); // Pitch bend
    }

    #[test]
    fn test_note_on() {
        let event = NoteMessage::from_bytes(&[0x90, 60, 100]).unwrap();
        assert_eq!(
            event,
            NoteMessage::NoteOn {
                pitch: 60,
                velocity: 100
            }
        );
    }

    #[test]
    fn test_note_off_velocity_zero() {
        let event = NoteMessage::from_bytes(&[0x90, 64, 0]).unwrap();
        assert_eq!(event, NoteMessage::NoteOff { pitch: 64 });
        assert_eq!(NoteKind::classify(0x93, 0), Some(NoteKind::Off));
    }

    #[test]
    fn test_note_off_explicit_keeps_kind_regardless_of_velocity() {
        assert_eq!(NoteKind::classify(0x80, 64), Some(NoteKind::Off));
        assert_eq!(NoteKind::classify(0x8F, 0), Some(NoteKind::Off));
    }

    #[test]
    fn test_midi_channel_ignored() {
        let event1 = NoteMessage::from_bytes(&[0x90, 60, 100]).unwrap();
        let event2 = NoteMessage::from_bytes(&[0x9F, 60, 100]).unwrap();
        assert_eq!(event1, event2);
    }

    #[test]
    fn test_non_note_messages_ignored() {
        assert!(NoteMessage::from_bytes(&[0xB0, 7, 127]).is_none());
        assert!(NoteMessage::from_bytes(&[0xE0, 0x00, 0x40]).is_none());
        assert!(NoteMessage::from_bytes(&[]).is_none());
        assert!(NoteMessage::from_bytes(&[0x90, 60]).is_none());
    }

    #[test]
    fn test_wire_encoding() {
        let on = NoteMessage::NoteOn {
            pitch: 60,
            velocity: 80,
        };
        assert_eq!(on.to_bytes(0), [0x90, 60, 80]);
        assert_eq!(on.to_bytes(9), [0x99, 60, 80]);
        assert_eq!(NoteMessage::NoteOff { pitch: 60 }.to_bytes(1), [0x81, 60, 0]);
        assert_eq!(on.pitch(), 60);
    }
}
