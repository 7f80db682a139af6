// Tick clock - converts elapsed wall-clock time into quantized ticks
// A single `advance` drives both recording and playback passes

use crate::config::TimingConfig;
use std::thread;
use std::time::{Duration, Instant};

/// Source of wall-clock time for the polling loops
pub trait Timebase {
    /// Sample the current instant
    fn now(&mut self) -> Instant;

    /// Called between two polls
    fn idle(&mut self);
}

/// Real time, polled with a short sleep (or a yield when the interval is zero)
#[derive(Debug, Clone, Copy)]
pub struct SystemTimebase {
    poll_interval: Duration,
}

impl SystemTimebase {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Timebase for SystemTimebase {
    fn now(&mut self) -> Instant {
        Instant::now()
    }

    fn idle(&mut self) {
        if self.poll_interval.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.poll_interval);
        }
    }
}

/// Deterministic time: every `now()` returns an instant `step` later than the previous one
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimebase {
    next: Instant,
    step: Duration,
}

impl SteppedTimebase {
    pub fn new(origin: Instant, step: Duration) -> Self {
        Self { next: origin, step }
    }
}

impl Timebase for SteppedTimebase {
    fn now(&mut self) -> Instant {
        let now = self.next;
        self.next += self.step;
        now
    }

    fn idle(&mut self) {}
}

/// Mutable state of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    pub start: Instant,
    /// -1 until the first tick of the pass has been observed
    pub current_tick: i64,
    /// Quarter-note boundaries crossed since the last reset
    pub beat_counter: u32,
    /// Last beat count reported to observers
    pub beat_high_water: u32,
}

impl ClockState {
    fn fresh(start: Instant) -> Self {
        Self {
            start,
            current_tick: -1,
            beat_counter: 0,
            beat_high_water: 0,
        }
    }
}

/// Completion rule applied when the last tick of the window is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Done only if something was captured, otherwise restart the pass
    Recording { captured: bool },
    /// Done unconditionally
    Playback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    Running,
    Done,
    /// Empty recording pass: the clock was reset and the pass starts over
    Restarted,
}

/// Result of one `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub tick: i64,
    /// First observation of `tick`
    pub new_tick: bool,
    /// New beat count, when it went past the last reported one
    pub beat: Option<u32>,
    pub status: ClockStatus,
}

impl Advance {
    pub fn is_done(&self) -> bool {
        self.status == ClockStatus::Done
    }
}

#[derive(Debug, Clone)]
pub struct TickClock {
    seconds_per_tick: f64,
    ppq: i64,
    sequence_length_ticks: i64,
    state: ClockState,
}

impl TickClock {
    pub fn new(timing: &TimingConfig, now: Instant) -> Self {
        Self {
            seconds_per_tick: timing.seconds_per_tick(),
            ppq: timing.ppq.max(1) as i64,
            sequence_length_ticks: timing.sequence_length_ticks() as i64,
            state: ClockState::fresh(now),
        }
    }

    /// Pick up new timing without resetting the pass
    pub fn retime(&mut self, timing: &TimingConfig) {
        self.seconds_per_tick = timing.seconds_per_tick();
        self.ppq = timing.ppq.max(1) as i64;
        self.sequence_length_ticks = timing.sequence_length_ticks() as i64;
    }

    pub fn reset(&mut self, now: Instant) {
        self.state = ClockState::fresh(now);
    }

    /// Tick index for a time offset from the start of the pass
    pub fn tick_at(&self, elapsed: Duration) -> i64 {
        (elapsed.as_secs_f64() / self.seconds_per_tick).floor() as i64
    }

    /// Sample the clock at `now`
    ///
    /// The tick never moves backwards. Beat boundaries are counted once, on
    /// the first observation of a tick; when a late poll skips ticks, every
    /// boundary in the skipped interval is counted.
    pub fn advance(&mut self, now: Instant, completion: Completion) -> Advance {
        let elapsed = now.saturating_duration_since(self.state.start);
        let tick = self.tick_at(elapsed);

        let mut new_tick = false;
        if tick > self.state.current_tick {
            let crossed =
                tick.div_euclid(self.ppq) - self.state.current_tick.div_euclid(self.ppq);
            self.state.beat_counter = self.state.beat_counter.saturating_add(crossed as u32);
            self.state.current_tick = tick;
            new_tick = true;
        }

        let mut status = ClockStatus::Running;
        if self.state.current_tick >= self.sequence_length_ticks - 1 {
            match completion {
                Completion::Playback | Completion::Recording { captured: true } => {
                    status = ClockStatus::Done;
                }
                Completion::Recording { captured: false } => {
                    self.reset(now);
                    status = ClockStatus::Restarted;
                }
            }
        }

        let mut beat = None;
        if self.state.beat_counter > self.state.beat_high_water {
            self.state.beat_high_water = self.state.beat_counter;
            beat = Some(self.state.beat_counter);
        }

        Advance {
            tick: self.state.current_tick,
            new_tick,
            beat,
            status,
        }
    }

    pub fn current_tick(&self) -> i64 {
        self.state.current_tick
    }

    pub fn beat_counter(&self) -> u32 {
        self.state.beat_counter
    }

    pub fn sequence_length_ticks(&self) -> i64 {
        self.sequence_length_ticks
    }

    pub fn state(&self) -> ClockState {
        self.state
    }
}
