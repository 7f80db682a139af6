// MIDI module
// Note message classification and the midir device adapters

pub mod device;
pub mod event;
pub mod input;
pub mod output;

pub use event::{NoteKind, NoteMessage};
pub use input::MidiInput;
pub use output::MidiOutputSink;
