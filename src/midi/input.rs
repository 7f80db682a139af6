// MIDI Input - subscribes to a device and forwards messages to the live parser

use crate::error::{LiveRollError, Result};
use crate::messaging::channels::InboundHandle;
use crate::midi::device::{CLIENT_NAME, find_input_port};
use midir::{Ignore, MidiInput as MidirInput, MidiInputConnection};

/// Open input subscription; closing happens on drop
pub struct MidiInput {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidiInput {
    /// Connect to `port_name` (first port when `None`) and deliver every
    /// message to `handle`
    ///
    /// The callback runs on the midir thread and only performs a
    /// non-blocking push.
    pub fn open(port_name: Option<&str>, mut handle: InboundHandle) -> Result<Self> {
        Self::open_with(port_name, move |message| {
            handle.deliver(message);
        })
    }

    /// Connect and hand every raw message to `callback`
    pub fn open_with<F>(port_name: Option<&str>, mut callback: F) -> Result<Self>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let mut midi_in = MidirInput::new(&format!("{} input", CLIENT_NAME))
            .map_err(|e| LiveRollError::MidiInit(e.to_string()))?;
        // Clock and active sensing would only be filtered out later
        midi_in.ignore(Ignore::All);

        let (port, port_name) = find_input_port(&midi_in, port_name)?;

        let connection = midi_in
            .connect(
                &port,
                "liveroll-input",
                move |_timestamp, message, _| callback(message),
                (),
            )
            .map_err(|e| LiveRollError::Connect(e.to_string()))?;

        log::info!("Using input port: {}", port_name);
        Ok(Self {
            _connection: connection,
            port_name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
