// Configuration - timing, MIDI port and capture settings
// Persisted as RON, the same format used for project files

use crate::error::{LiveRollError, Result};
use crate::sequencer::piano_roll::NotePairing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Quarter notes per bar (4/4 only)
pub const BEATS_PER_BAR: u32 = 4;

/// Musical timing of a recording/playback pass
///
/// Derived values (`seconds_per_tick`, `ticks_per_bar`, `sequence_length_ticks`)
/// are computed from the stored fields, so every mutator keeps them in sync.
/// Mutating timing does not reset a running clock; callers reset it themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub bpm: f64,
    pub ppq: u32,
    pub bars: u32,
    /// Terminal marker note. Carried for compatibility, not used by capture.
    pub end_seq_note: u8,
}

impl TimingConfig {
    pub fn new(bpm: f64, ppq: u32, bars: u32) -> Result<Self> {
        let config = Self {
            bpm,
            ppq,
            bars,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(LiveRollError::InvalidBpm(self.bpm));
        }
        if self.ppq == 0 {
            return Err(LiveRollError::InvalidPpq);
        }
        if self.end_seq_note > 127 {
            return Err(LiveRollError::InvalidEndSeqNote(self.end_seq_note));
        }
        Ok(())
    }

    /// Duration of one tick in seconds: 60 / (bpm * ppq)
    pub fn seconds_per_tick(&self) -> f64 {
        60.0 / (self.bpm * self.ppq as f64)
    }

    pub fn ticks_per_bar(&self) -> usize {
        self.ppq as usize * BEATS_PER_BAR as usize
    }

    /// Length of the capture window, fixed for the lifetime of a pass
    pub fn sequence_length_ticks(&self) -> usize {
        self.ticks_per_bar() * self.bars as usize
    }

    pub fn update_bpm(&mut self, bpm: f64) -> Result<()> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(LiveRollError::InvalidBpm(bpm));
        }
        self.bpm = bpm;
        Ok(())
    }

    pub fn update_bars(&mut self, bars: u32) {
        self.bars = bars;
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            ppq: 24,
            bars: 2,
            end_seq_note: 127,
        }
    }
}

/// Port selection for the midir adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Exact input port name; first available port when unset
    pub input_port: Option<String>,
    /// Exact output port name; synth lookup then virtual port when unset
    pub output_port: Option<String>,
    /// Substring identifying a software synth among the output ports
    pub synth_port_hint: String,
    pub virtual_port_name: String,
    /// Channel used for playback (0-15)
    pub channel: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_port: None,
            output_port: None,
            synth_port_hint: "Synth input".to_string(),
            virtual_port_name: "LiveParser port".to_string(),
            channel: 0,
        }
    }
}

/// Polling loop and callback channel tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Ring buffer slots between the device callback and the polling loop
    pub inbound_capacity: usize,
    /// Sleep between polls in microseconds; 0 yields instead of sleeping
    pub poll_interval_us: u64,
    pub pairing: NotePairing,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            // A MIDI wire tops out around 1000 messages/s; 512 slots cover
            // far more than one poll interval.
            inbound_capacity: 512,
            poll_interval_us: 250,
            pairing: NotePairing::ColumnScan,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timing: TimingConfig,
    pub midi: MidiConfig,
    pub capture: CaptureConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        if self.midi.channel > 15 {
            return Err(LiveRollError::InvalidChannel(self.midi.channel));
        }
        if self.capture.inbound_capacity == 0 {
            return Err(LiveRollError::InvalidCapacity);
        }
        Ok(())
    }

    /// Default location: `<config dir>/liveroll/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("liveroll").join("config.ron"))
    }

    pub fn from_ron(ron_data: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron_data).map_err(|e| {
            LiveRollError::Config(format!("Failed to deserialize from RON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            LiveRollError::Config(format!("Failed to serialize to RON: {}", e))
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_ron(&data)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Load `path` if given, else the default path if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(default_path) if default_path.exists() => {
                log::info!("Loading config from {}", default_path.display());
                Self::load(&default_path)
            }
            _ => Ok(Self::default()),
        }
    }
}
