// MIDI devices - port listing and lookup

use crate::error::{LiveRollError, Result};
use midir::{MidiInput as MidirInput, MidiInputPort, MidiOutput as MidirOutput, MidiOutputPort};

pub const CLIENT_NAME: &str = "liveroll";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}

fn describe(names: impl Iterator<Item = String>) -> Vec<MidiDeviceInfo> {
    names
        .enumerate()
        .map(|(index, name)| MidiDeviceInfo {
            index,
            name,
            // The first port is the one used when none is named
            is_default: index == 0,
        })
        .collect()
}

/// Every input port currently visible
pub fn list_input_ports() -> Result<Vec<MidiDeviceInfo>> {
    let midi_in = MidirInput::new(&format!("{} scanner", CLIENT_NAME))
        .map_err(|e| LiveRollError::MidiInit(e.to_string()))?;
    let ports = midi_in.ports();
    Ok(describe(
        ports.iter().filter_map(|port| midi_in.port_name(port).ok()),
    ))
}

/// Every output port currently visible
pub fn list_output_ports() -> Result<Vec<MidiDeviceInfo>> {
    let midi_out = MidirOutput::new(&format!("{} scanner", CLIENT_NAME))
        .map_err(|e| LiveRollError::MidiInit(e.to_string()))?;
    let ports = midi_out.ports();
    Ok(describe(
        ports.iter().filter_map(|port| midi_out.port_name(port).ok()),
    ))
}

/// Input port named `name`, or the first port when `name` is `None`
pub fn find_input_port(midi_in: &MidirInput, name: Option<&str>) -> Result<(MidiInputPort, String)> {
    let ports = midi_in.ports();
    if ports.is_empty() {
        return Err(LiveRollError::NoPorts("input"));
    }

    ports
        .into_iter()
        .filter_map(|port| midi_in.port_name(&port).ok().map(|port_name| (port, port_name)))
        .find(|(_, port_name)| name.is_none_or(|wanted| wanted == port_name))
        .ok_or_else(|| LiveRollError::PortNotFound(name.unwrap_or_default().to_string()))
}

/// Output port named exactly `name`
pub fn find_output_port(midi_out: &MidirOutput, name: &str) -> Option<(MidiOutputPort, String)> {
    midi_out
        .ports()
        .into_iter()
        .filter_map(|port| midi_out.port_name(&port).ok().map(|port_name| (port, port_name)))
        .find(|(_, port_name)| port_name == name)
}

/// First output port whose name contains `hint`
pub fn find_output_port_containing(
    midi_out: &MidirOutput,
    hint: &str,
) -> Option<(MidiOutputPort, String)> {
    if hint.is_empty() {
        return None;
    }
    midi_out
        .ports()
        .into_iter()
        .filter_map(|port| midi_out.port_name(&port).ok().map(|port_name| (port, port_name)))
        .find(|(_, port_name)| port_name.contains(hint))
}
