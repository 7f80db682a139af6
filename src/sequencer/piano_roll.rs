// Piano roll - tick x pitch matrix of sustain velocities
// and the codec that rebuilds it from a captured event log

use crate::midi::event::NoteKind;
use crate::sequencer::event_log::EventLog;
use serde::{Deserialize, Serialize};

/// Number of MIDI pitches (columns)
pub const PITCHES: usize = 128;

/// How a note-off finds the note-on it closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotePairing {
    /// Most recent non-zero cell before the note-off in the pitch column.
    /// Overlapping retriggers of one pitch can pair with an earlier run.
    #[default]
    ColumnScan,
    /// Last unmatched note-on of the pitch (LIFO per pitch)
    PerPitchStack,
}

/// One contiguous non-zero run of a pitch column (inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSpan {
    pub pitch: u8,
    pub start: usize,
    pub end: usize,
    /// Velocity of the first cell of the run
    pub velocity: u8,
}

impl NoteSpan {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// `ticks x 128` matrix, row-major; 0 means silent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PianoRoll {
    ticks: usize,
    cells: Vec<u8>,
}

impl PianoRoll {
    /// Silent roll of `ticks` rows
    pub fn new(ticks: usize) -> Self {
        Self {
            ticks,
            cells: vec![0; ticks * PITCHES],
        }
    }

    /// Build from row-major cells; `None` unless `cells.len()` is a multiple of 128
    pub fn from_cells(cells: Vec<u8>) -> Option<Self> {
        if cells.len() % PITCHES != 0 {
            return None;
        }
        let cells: Vec<u8> = cells.into_iter().map(|v| v.min(127)).collect();
        Some(Self {
            ticks: cells.len() / PITCHES,
            cells,
        })
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// # Panics
    /// If `tick` or `pitch` is out of range.
    pub fn get(&self, tick: usize, pitch: u8) -> u8 {
        self.cells[Self::index(tick, pitch)]
    }

    /// Velocities above 127 are clamped.
    ///
    /// # Panics
    /// If `tick` or `pitch` is out of range.
    pub fn set(&mut self, tick: usize, pitch: u8, velocity: u8) {
        assert!(tick < self.ticks, "tick {} outside roll of {} ticks", tick, self.ticks);
        self.cells[Self::index(tick, pitch)] = velocity.min(127);
    }

    pub fn row(&self, tick: usize) -> &[u8] {
        &self.cells[tick * PITCHES..(tick + 1) * PITCHES]
    }

    /// Pitches sounding at `tick`, ascending
    pub fn active_pitches(&self, tick: usize) -> impl Iterator<Item = u8> + '_ {
        self.row(tick)
            .iter()
            .enumerate()
            .filter(|(_, velocity)| **velocity > 0)
            .map(|(pitch, _)| pitch as u8)
    }

    pub fn column(&self, pitch: u8) -> impl Iterator<Item = u8> + '_ {
        (0..self.ticks).map(move |tick| self.get(tick, pitch))
    }

    pub fn is_silent(&self) -> bool {
        self.cells.iter().all(|v| *v == 0)
    }

    /// Every contiguous run, ordered by pitch then start tick
    pub fn spans(&self) -> Vec<NoteSpan> {
        let mut spans = Vec::new();
        for pitch in 0..PITCHES as u8 {
            let mut open: Option<(usize, u8)> = None;
            for tick in 0..self.ticks {
                let velocity = self.get(tick, pitch);
                match (open, velocity) {
                    (None, v) if v > 0 => open = Some((tick, v)),
                    (Some((start, v)), 0) => {
                        spans.push(NoteSpan {
                            pitch,
                            start,
                            end: tick - 1,
                            velocity: v,
                        });
                        open = None;
                    }
                    _ => {}
                }
            }
            if let Some((start, velocity)) = open {
                spans.push(NoteSpan {
                    pitch,
                    start,
                    end: self.ticks - 1,
                    velocity,
                });
            }
        }
        spans
    }

    fn index(tick: usize, pitch: u8) -> usize {
        tick * PITCHES + (pitch as usize & 0x7F)
    }

    /// Most recent non-zero row of `pitch` strictly before `before`
    fn last_sounding_before(&self, pitch: u8, before: usize) -> Option<usize> {
        (0..before.min(self.ticks))
            .rev()
            .find(|tick| self.get(*tick, pitch) > 0)
    }
}

/// Encode a captured log into a roll of `sequence_length_ticks` rows
/// using the column scan pairing
pub fn encode(events: &EventLog, sequence_length_ticks: usize) -> PianoRoll {
    encode_with(events, sequence_length_ticks, NotePairing::ColumnScan)
}

/// Encode a captured log into a roll of `sequence_length_ticks` rows
///
/// Events are replayed in arrival order:
/// - a note-on writes its velocity one row *before* its tick (`tick - 1`),
///   a quirk kept for compatibility with existing rolls; row -1 is clamped
///   to row 0 and rows past the window are dropped;
/// - a note-off finds its note-on row (`on`), defaulting to row 0 when none
///   exists, and fills rows `on + 1 ..= tick` with the note-off velocity, or
///   with the value stored at `on` when the note-off velocity is 0. The fill
///   is clipped to the last row.
///
/// A note-on on the final tick of the window leaves a single cell, since its
/// note-off can no longer be captured.
///
/// The scan costs O(window) per note-off in the worst case.
pub fn encode_with(
    events: &EventLog,
    sequence_length_ticks: usize,
    pairing: NotePairing,
) -> PianoRoll {
    let mut roll = PianoRoll::new(sequence_length_ticks);
    if sequence_length_ticks == 0 {
        return roll;
    }

    let last_row = sequence_length_ticks - 1;
    let mut open_notes: Vec<Vec<usize>> = vec![Vec::new(); PITCHES];

    for event in events.events() {
        let pitch = event.pitch & 0x7F;
        match event.kind() {
            NoteKind::On => {
                let row = (event.tick - 1).max(0) as usize;
                if row > last_row {
                    log::debug!(
                        "Note-on {} at tick {} outside window of {} ticks, dropped",
                        pitch,
                        event.tick,
                        sequence_length_ticks
                    );
                    continue;
                }
                roll.set(row, pitch, event.velocity);
                open_notes[pitch as usize].push(row);
            }
            NoteKind::Off => {
                let end = event.tick.max(0) as usize;
                let on_row = match pairing {
                    NotePairing::ColumnScan => roll.last_sounding_before(pitch, end),
                    NotePairing::PerPitchStack => open_notes[pitch as usize].pop(),
                }
                .unwrap_or(0);

                let sustain = if event.velocity == 0 {
                    roll.get(on_row, pitch)
                } else {
                    event.velocity
                };

                for row in (on_row + 1)..=end.min(last_row) {
                    roll.set(row, pitch, sustain);
                }
            }
        }
    }

    roll
}
