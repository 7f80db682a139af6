// Live parser - owns config, clock and event log for recording and playback passes

use crate::config::{Config, TimingConfig};
use crate::error::Result;
use crate::messaging::channels::{InboundConsumer, InboundHandle, TickSnapshot, create_inbound_channel};
use crate::sequencer::clock::{Advance, ClockStatus, Completion, TickClock, Timebase};
use crate::sequencer::event_log::EventLog;
use crate::sequencer::piano_roll::{PianoRoll, encode_with};
use crate::sequencer::playback::{self, NoteSink, PlaybackReport};
use ringbuf::traits::Consumer;
use std::time::Instant;

/// What the shared clock is currently driving
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    Recording,
    Playing,
}

/// Records live note input into piano rolls and plays rolls back
///
/// The parser is the single owner of the clock and the event log. Device
/// callbacks talk to it through an [`InboundHandle`], which only reads the
/// published tick and queues messages; the polling loop drains the queue
/// into the log before every completion check.
pub struct LiveParser {
    config: Config,
    clock: TickClock,
    events: EventLog,
    mode: Mode,
    playback_finished: bool,
    restarts: u32,
    tick_snapshot: TickSnapshot,
    inbound: Option<InboundConsumer>,
}

impl LiveParser {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let clock = TickClock::new(&config.timing, Instant::now());
        Ok(Self {
            config,
            clock,
            events: EventLog::new(),
            mode: Mode::Idle,
            playback_finished: false,
            restarts: 0,
            tick_snapshot: TickSnapshot::new(),
            inbound: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.config.timing
    }

    /// Change the tempo. The clock is not reset.
    pub fn update_bpm(&mut self, bpm: f64) -> Result<()> {
        self.config.timing.update_bpm(bpm)?;
        self.clock.retime(&self.config.timing);
        Ok(())
    }

    /// Change the window length. The clock is not reset.
    pub fn update_bars(&mut self, bars: u32) {
        self.config.timing.update_bars(bars);
        self.clock.retime(&self.config.timing);
    }

    pub fn reset_clock(&mut self, now: Instant) {
        self.clock.reset(now);
        self.tick_snapshot.store(self.clock.current_tick());
    }

    pub fn reset_sequence(&mut self) {
        self.events.clear();
    }

    /// Create the callback side of a fresh inbound queue
    ///
    /// Replaces any previous queue; messages still pending in it are lost.
    pub fn inbound_handle(&mut self) -> InboundHandle {
        let (producer, consumer) = create_inbound_channel(self.config.capture.inbound_capacity);
        self.inbound = Some(consumer);
        InboundHandle::new(producer, self.tick_snapshot.clone())
    }

    /// Record a message on the current tick, for callers running on the
    /// polling thread itself
    pub fn record(&mut self, message: &[u8]) -> bool {
        self.events.record(message, self.clock.current_tick())
    }

    /// Move queued callback messages into the log, returns how many were kept
    ///
    /// A message stamped after the current tick was read from the snapshot
    /// of a pass that has since restarted and is discarded.
    pub fn drain_inbound(&mut self) -> usize {
        let Some(consumer) = self.inbound.as_mut() else {
            return 0;
        };
        let current = self.clock.current_tick();
        let mut kept = 0;
        while let Some(message) = consumer.try_pop() {
            if message.tick > current {
                log::debug!("Discarding message stamped {} (clock at {})", message.tick, current);
                continue;
            }
            if self.events.record(message.bytes(), message.tick) {
                kept += 1;
            }
        }
        kept
    }

    /// Drop everything still queued, returns how many messages were dropped
    pub fn discard_inbound(&mut self) -> usize {
        self.inbound
            .as_mut()
            .map_or(0, |consumer| consumer.pop_iter().count())
    }

    /// One iteration of the recording loop
    ///
    /// An empty window restarts the clock and keeps recording.
    pub fn poll_recording(&mut self, now: Instant) -> Advance {
        self.drain_inbound();
        let advance = self.clock.advance(
            now,
            Completion::Recording {
                captured: !self.events.is_empty(),
            },
        );
        self.tick_snapshot.store(advance.tick);

        if advance.status == ClockStatus::Restarted {
            self.restarts += 1;
            self.discard_inbound();
            log::warn!("No note was played - starting over!");
        }
        if let Some(beat) = advance.beat {
            log::debug!("Beat {}", beat);
        }
        advance
    }

    /// Record one pass and return its piano roll
    ///
    /// Blocks until the window is complete with at least one note captured.
    pub fn record_pass<T: Timebase>(&mut self, timebase: &mut T) -> PianoRoll {
        self.mode = Mode::Recording;
        self.playback_finished = false;
        self.restarts = 0;
        self.reset_sequence();
        let stale = self.discard_inbound();
        if stale > 0 {
            log::debug!("Dropped {} messages queued before the pass", stale);
        }
        self.reset_clock(timebase.now());
        log::info!(
            "Recording {} bars ({} ticks) at {} BPM",
            self.config.timing.bars,
            self.config.timing.sequence_length_ticks(),
            self.config.timing.bpm
        );

        while !self.poll_recording(timebase.now()).is_done() {
            timebase.idle();
        }

        log::info!("Captured {} note events", self.events.len());
        self.mode = Mode::Idle;
        self.parse_to_matrix()
    }

    /// Encode the captured log with the configured pairing
    pub fn parse_to_matrix(&self) -> PianoRoll {
        encode_with(
            &self.events,
            self.config.timing.sequence_length_ticks(),
            self.config.capture.pairing,
        )
    }

    /// Play `roll` through `sink` on the shared clock
    pub fn play<S: NoteSink, T: Timebase>(
        &mut self,
        roll: &PianoRoll,
        timebase: &mut T,
        sink: &mut S,
    ) -> Result<PlaybackReport> {
        self.mode = Mode::Playing;
        self.playback_finished = false;

        let result = playback::play(roll, &mut self.clock, timebase, sink);
        self.tick_snapshot.store(self.clock.current_tick());
        self.mode = Mode::Idle;

        let report = result?;
        self.playback_finished = true;
        log::info!(
            "Playback finished: {} note-ons, {} note-offs",
            report.note_ons,
            report.note_offs
        );
        Ok(report)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Raised when the last playback pass ran to completion
    pub fn is_playback_finished(&self) -> bool {
        self.playback_finished
    }

    /// Empty-window restarts during the last recording pass
    pub fn restart_count(&self) -> u32 {
        self.restarts
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }
}
