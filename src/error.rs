// Error types shared by the library

/// Errors surfaced by the live parser and its MIDI adapters
///
/// The capture core itself never fails: irrelevant messages are dropped,
/// empty passes restart and unmatched note-offs are recovered in place.
/// Everything here comes from configuration or device I/O.
#[derive(Debug, thiserror::Error)]
pub enum LiveRollError {
    #[error("BPM must be a finite value > 0, got {0}")]
    InvalidBpm(f64),

    #[error("PPQ must be > 0")]
    InvalidPpq,

    #[error("End-of-sequence note must be in 0..=127, got {0}")]
    InvalidEndSeqNote(u8),

    #[error("MIDI channel must be in 0..=15, got {0}")]
    InvalidChannel(u8),

    #[error("Inbound buffer capacity must be > 0")]
    InvalidCapacity,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI init error: {0}")]
    MidiInit(String),

    #[error("No MIDI {0} port available")]
    NoPorts(&'static str),

    #[error("MIDI port '{0}' not found")]
    PortNotFound(String),

    #[error("MIDI connection failed: {0}")]
    Connect(String),

    #[error("MIDI send failed: {0}")]
    Send(String),

    #[error("Virtual MIDI ports are not supported on this platform")]
    VirtualPortUnsupported,
}

pub type Result<T> = std::result::Result<T, LiveRollError>;
