// Playback driver - walks a piano roll tick by tick and emits note transitions

use crate::error::Result;
use crate::midi::event::NoteMessage;
use crate::sequencer::clock::{Completion, TickClock, Timebase};
use crate::sequencer::piano_roll::{PITCHES, PianoRoll};

/// Destination of played notes
pub trait NoteSink {
    fn send(&mut self, message: NoteMessage) -> Result<()>;
}

/// Collects messages, for tests and offline rendering
impl NoteSink for Vec<NoteMessage> {
    fn send(&mut self, message: NoteMessage) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

/// Counts of what a pass emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub note_ons: usize,
    pub note_offs: usize,
}

/// Turns roll rows into the minimal note-on/note-off stream
///
/// Rows are processed strictly in order, each exactly once. A pitch gets a
/// note-on when it starts sounding and a note-off when it stops; a pitch
/// that is already sounding is never triggered again.
pub struct PlaybackDriver<'a> {
    roll: &'a PianoRoll,
    /// Last processed row, `None` before the first one
    last_row: Option<usize>,
    sounding: [bool; PITCHES],
    report: PlaybackReport,
}

impl<'a> PlaybackDriver<'a> {
    pub fn new(roll: &'a PianoRoll) -> Self {
        Self {
            roll,
            last_row: None,
            sounding: [false; PITCHES],
            report: PlaybackReport::default(),
        }
    }

    /// Process every unprocessed row up to and including `tick`
    ///
    /// Rows skipped by a late poll are caught up in order. Ticks past the
    /// end of the roll are ignored.
    pub fn process_until<S: NoteSink>(&mut self, tick: i64, sink: &mut S) -> Result<()> {
        if tick < 0 || self.roll.ticks() == 0 {
            return Ok(());
        }
        let target = (tick as usize).min(self.roll.ticks() - 1);
        let first = self.last_row.map_or(0, |row| row + 1);
        for row in first..=target {
            self.process_row(row, sink)?;
        }
        Ok(())
    }

    fn process_row<S: NoteSink>(&mut self, row: usize, sink: &mut S) -> Result<()> {
        let roll = self.roll;
        let current = roll.row(row);
        let previous = self.last_row.map(|prev| roll.row(prev));
        self.last_row = Some(row);

        let was_active = |pitch: usize| previous.is_some_and(|prev| prev[pitch] > 0);

        for pitch in 0..PITCHES {
            if current[pitch] > 0 && !was_active(pitch) && !self.sounding[pitch] {
                sink.send(NoteMessage::NoteOn {
                    pitch: pitch as u8,
                    velocity: current[pitch],
                })?;
                self.sounding[pitch] = true;
                self.report.note_ons += 1;
            }
        }

        for pitch in 0..PITCHES {
            if current[pitch] == 0 && was_active(pitch) && self.sounding[pitch] {
                sink.send(NoteMessage::NoteOff {
                    pitch: pitch as u8,
                })?;
                self.sounding[pitch] = false;
                self.report.note_offs += 1;
            }
        }

        if current.iter().all(|v| *v == 0) {
            self.release_all(sink)?;
        }
        Ok(())
    }

    /// Note-off for every pitch still sounding
    pub fn release_all<S: NoteSink>(&mut self, sink: &mut S) -> Result<()> {
        for pitch in 0..PITCHES {
            if self.sounding[pitch] {
                sink.send(NoteMessage::NoteOff {
                    pitch: pitch as u8,
                })?;
                self.sounding[pitch] = false;
                self.report.note_offs += 1;
            }
        }
        Ok(())
    }

    pub fn sounding(&self) -> impl Iterator<Item = u8> + '_ {
        self.sounding
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(pitch, _)| pitch as u8)
    }

    pub fn last_row(&self) -> Option<usize> {
        self.last_row
    }

    pub fn report(&self) -> PlaybackReport {
        self.report
    }
}

/// Play `roll` in real time through `sink`
///
/// The clock is reset before the pass and again once it reports done on the
/// last tick of its window. Notes still sounding at the end are released.
/// On a sink error the remaining notes are released best-effort and the
/// error is returned.
pub fn play<S: NoteSink, T: Timebase>(
    roll: &PianoRoll,
    clock: &mut TickClock,
    timebase: &mut T,
    sink: &mut S,
) -> Result<PlaybackReport> {
    let mut driver = PlaybackDriver::new(roll);
    clock.reset(timebase.now());

    loop {
        let advance = clock.advance(timebase.now(), Completion::Playback);

        if advance.new_tick {
            if let Err(e) = driver.process_until(advance.tick, sink) {
                let _ = driver.release_all(sink);
                clock.reset(timebase.now());
                return Err(e);
            }
        }

        if let Some(beat) = advance.beat {
            log::debug!("Beat {}", beat);
        }

        if advance.is_done() {
            break;
        }
        timebase.idle();
    }

    driver.release_all(sink)?;
    clock.reset(timebase.now());
    Ok(driver.report())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::error::LiveRollError;
    use crate::sequencer::clock::SteppedTimebase;
    use std::time::{Duration, Instant};

    fn roll_with(ticks: usize, runs: &[(u8, usize, usize, u8)]) -> PianoRoll {
        let mut roll = PianoRoll::new(ticks);
        for &(pitch, start, end, velocity) in runs {
            for tick in start..=end {
                roll.set(tick, pitch, velocity);
            }
        }
        roll
    }

    fn drive(roll: &PianoRoll) -> Vec<NoteMessage> {
        let mut sink = Vec::new();
        let mut driver = PlaybackDriver::new(roll);
        for tick in 0..roll.ticks() as i64 {
            driver.process_until(tick, &mut sink).unwrap();
        }
        driver.release_all(&mut sink).unwrap();
        sink
    }

    #[test]
    fn test_single_run() {
        let roll = roll_with(16, &[(60, 2, 5, 90)]);
        assert_eq!(
            drive(&roll),
            vec![
                NoteMessage::NoteOn {
                    pitch: 60,
                    velocity: 90
                },
                NoteMessage::NoteOff { pitch: 60 },
            ]
        );
    }

    #[test]
    fn test_one_on_and_one_off_per_run() {
        let roll = roll_with(32, &[
            (60, 0, 3, 100),
            (60, 8, 9, 70),
            (64, 2, 12, 80),
            (67, 12, 31, 60),
        ]);
        let messages = drive(&roll);

        for pitch in [60u8, 64, 67] {
            let runs = roll.spans().iter().filter(|s| s.pitch == pitch).count();
            let ons = messages
                .iter()
                .filter(|m| matches!(m, NoteMessage::NoteOn { pitch: p, .. } if *p == pitch))
                .count();
            let offs = messages
                .iter()
                .filter(|m| matches!(m, NoteMessage::NoteOff { pitch: p } if *p == pitch))
                .count();
            assert_eq!(ons, runs, "pitch {}", pitch);
            assert_eq!(offs, runs, "pitch {}", pitch);
        }
    }

    #[test]
    fn test_no_retrigger_inside_run() {
        // Velocity changes inside a run do not retrigger
        let mut roll = roll_with(8, &[(60, 1, 6, 80)]);
        roll.set(4, 60, 40);
        let ons = drive(&roll)
            .into_iter()
            .filter(|m| matches!(m, NoteMessage::NoteOn { .. }))
            .count();
        assert_eq!(ons, 1);
    }

    #[test]
    fn test_catch_up_after_skipped_ticks() {
        let roll = roll_with(16, &[(60, 3, 4, 90)]);
        let mut sink = Vec::new();
        let mut driver = PlaybackDriver::new(&roll);

        driver.process_until(1, &mut sink).unwrap();
        // Late poll jumps from tick 1 to tick 10
        driver.process_until(10, &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(driver.last_row(), Some(10));
        assert_eq!(driver.sounding().count(), 0);
    }

    #[test]
    fn test_same_tick_is_processed_once() {
        let roll = roll_with(8, &[(60, 0, 7, 90)]);
        let mut sink = Vec::new();
        let mut driver = PlaybackDriver::new(&roll);
        driver.process_until(2, &mut sink).unwrap();
        driver.process_until(2, &mut sink).unwrap();
        driver.process_until(1, &mut sink).unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_run_to_end_released() {
        let roll = roll_with(8, &[(72, 5, 7, 64)]);
        let messages = drive(&roll);
        assert_eq!(messages.last(), Some(&NoteMessage::NoteOff { pitch: 72 }));
    }

    #[test]
    fn test_play_in_time() {
        let timing = TimingConfig::new(120.0, 24, 1).unwrap();
        let roll = roll_with(96, &[(60, 9, 20, 80), (64, 40, 41, 50)]);

        let origin = Instant::now();
        let mut clock = TickClock::new(&timing, origin);
        // Polls ten times per tick
        let mut timebase = SteppedTimebase::new(
            origin,
            Duration::from_secs_f64(timing.seconds_per_tick() / 10.0),
        );
        let mut sink = Vec::new();

        let report = play(&roll, &mut clock, &mut timebase, &mut sink).unwrap();
        assert_eq!(report, PlaybackReport {
            note_ons: 2,
            note_offs: 2
        });
        assert_eq!(sink[0], NoteMessage::NoteOn {
            pitch: 60,
            velocity: 80
        });
        assert_eq!(clock.current_tick(), -1);
    }

    #[test]
    fn test_play_with_coarse_polling() {
        let timing = TimingConfig::new(120.0, 24, 1).unwrap();
        let roll = roll_with(96, &[(60, 10, 10, 80), (61, 11, 11, 80), (62, 94, 95, 80)]);

        let origin = Instant::now();
        let mut clock = TickClock::new(&timing, origin);
        // One poll every 7.5 ticks
        let mut timebase = SteppedTimebase::new(
            origin,
            Duration::from_secs_f64(timing.seconds_per_tick() * 7.5),
        );
        let mut sink = Vec::new();

        let report = play(&roll, &mut clock, &mut timebase, &mut sink).unwrap();
        assert_eq!(report.note_ons, 3);
        assert_eq!(report.note_offs, 3);
    }

    struct FailingSink {
        accepted: usize,
        released: Vec<u8>,
    }

    impl NoteSink for FailingSink {
        fn send(&mut self, message: NoteMessage) -> Result<()> {
            match message {
                NoteMessage::NoteOn { .. } if self.accepted >= 1 => {
                    Err(LiveRollError::Send("port closed".to_string()))
                }
                NoteMessage::NoteOn { .. } => {
                    self.accepted += 1;
                    Ok(())
                }
                NoteMessage::NoteOff { pitch } => {
                    self.released.push(pitch);
                    Ok(())
                }
            }
        }
    }

    #[test]
    fn test_sink_error_releases_notes() {
        let timing = TimingConfig::new(120.0, 24, 1).unwrap();
        let roll = roll_with(96, &[(60, 2, 50, 80), (62, 4, 50, 80)]);

        let origin = Instant::now();
        let mut clock = TickClock::new(&timing, origin);
        let mut timebase =
            SteppedTimebase::new(origin, Duration::from_secs_f64(timing.seconds_per_tick()));
        let mut sink = FailingSink {
            accepted: 0,
            released: Vec::new(),
        };

        let result = play(&roll, &mut clock, &mut timebase, &mut sink);
        assert!(matches!(result, Err(LiveRollError::Send(_))));
        assert_eq!(sink.released, vec![60]);
        assert_eq!(clock.current_tick(), -1);
    }
}
