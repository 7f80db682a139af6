// liveroll - live MIDI capture to quantized piano rolls, and playback

pub mod config;
pub mod error;
pub mod messaging;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use config::{CaptureConfig, Config, MidiConfig, TimingConfig};
pub use error::{LiveRollError, Result};
pub use messaging::channels::{InboundHandle, TickSnapshot};
pub use midi::event::NoteMessage;
pub use sequencer::{
    EventLog, LiveParser, Mode, NotePairing, NoteSink, NoteSpan, PianoRoll, PlaybackDriver,
    PlaybackReport, RawEvent, SteppedTimebase, SystemTimebase, TickClock, Timebase, encode,
    encode_with,
};
