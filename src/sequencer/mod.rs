// Sequencer module
// Tick clock, event capture, piano roll codec and playback

pub mod clock;
pub mod event_log;
pub mod live_parser;
pub mod piano_roll;
pub mod playback;

pub use clock::{
    Advance, ClockState, ClockStatus, Completion, SteppedTimebase, SystemTimebase, TickClock,
    Timebase,
};
pub use event_log::{EventLog, RawEvent};
pub use live_parser::{LiveParser, Mode};
pub use piano_roll::{NotePairing, NoteSpan, PITCHES, PianoRoll, encode, encode_with};
pub use playback::{NoteSink, PlaybackDriver, PlaybackReport, play};
