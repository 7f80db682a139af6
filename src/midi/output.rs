// MIDI Output - note sink backed by a midir output connection

use crate::config::MidiConfig;
use crate::error::{LiveRollError, Result};
use crate::midi::device::{CLIENT_NAME, find_output_port, find_output_port_containing};
use crate::midi::event::NoteMessage;
use crate::sequencer::playback::NoteSink;
use midir::{MidiOutput as MidirOutput, MidiOutputConnection};

pub struct MidiOutputSink {
    connection: MidiOutputConnection,
    channel: u8,
    port_name: String,
}

impl MidiOutputSink {
    /// Connect following the configured preference:
    /// the named port, else a software synth port, else a virtual port
    pub fn open(config: &MidiConfig) -> Result<Self> {
        let midi_out = MidirOutput::new(&format!("{} output", CLIENT_NAME))
            .map_err(|e| LiveRollError::MidiInit(e.to_string()))?;

        if let Some(name) = config.output_port.as_deref() {
            let (port, port_name) = find_output_port(&midi_out, name)
                .ok_or_else(|| LiveRollError::PortNotFound(name.to_string()))?;
            let connection = midi_out
                .connect(&port, "liveroll-output")
                .map_err(|e| LiveRollError::Connect(e.to_string()))?;
            log::info!("Using output port: {}", port_name);
            return Ok(Self::with_connection(connection, config.channel, port_name));
        }

        if let Some((port, port_name)) =
            find_output_port_containing(&midi_out, &config.synth_port_hint)
        {
            let connection = midi_out
                .connect(&port, "liveroll-output")
                .map_err(|e| LiveRollError::Connect(e.to_string()))?;
            log::info!("Found synth and autoconnected: {}", port_name);
            return Ok(Self::with_connection(connection, config.channel, port_name));
        }

        let connection = Self::create_virtual(midi_out, &config.virtual_port_name)?;
        log::info!(
            "Could not find a synth, created virtual MIDI port called '{}'",
            config.virtual_port_name
        );
        Ok(Self::with_connection(
            connection,
            config.channel,
            config.virtual_port_name.clone(),
        ))
    }

    #[cfg(unix)]
    fn create_virtual(midi_out: MidirOutput, name: &str) -> Result<MidiOutputConnection> {
        use midir::os::unix::VirtualOutput;
        midi_out
            .create_virtual(name)
            .map_err(|e| LiveRollError::Connect(e.to_string()))
    }

    #[cfg(not(unix))]
    fn create_virtual(_midi_out: MidirOutput, _name: &str) -> Result<MidiOutputConnection> {
        Err(LiveRollError::VirtualPortUnsupported)
    }

    fn with_connection(connection: MidiOutputConnection, channel: u8, port_name: String) -> Self {
        Self {
            connection,
            channel,
            port_name,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl NoteSink for MidiOutputSink {
    fn send(&mut self, message: NoteMessage) -> Result<()> {
        self.connection
            .send(&message.to_bytes(self.channel))
            .map_err(|e| LiveRollError::Send(e.to_string()))
    }
}
