//! Beat-synchronized frame selection.
//!
//! A [`BeatClock`] maps elapsed time onto a frame index so that one full pass
//! through the animation spans `speed_divisor` beats. [`PlaybackState`] wraps
//! the clock with the explicit start/stop state a host loop drives through
//! [`PlaybackState::tick`].

mod tempo;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::PlaybackConfig;

pub use tempo::{Detection, EnergyBeatDetector, TapTempo, Tempo};

/// Order in which frames are visited within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackDirection {
    #[default]
    Forward,
    Reverse,
    /// Forward on even cycles, reverse on odd ones.
    PingPong,
}

impl PlaybackDirection {
    /// Map a forward index into this direction for the given cycle number.
    ///
    /// An index outside `0..frame_count` is returned unchanged.
    pub fn apply(self, index: usize, frame_count: usize, cycle: u64) -> usize {
        if index >= frame_count {
            return index;
        }
        let reversed = frame_count - 1 - index;
        match self {
            Self::Forward => index,
            Self::Reverse => reversed,
            Self::PingPong if cycle % 2 == 1 => reversed,
            Self::PingPong => index,
        }
    }
}

/// Maps elapsed milliseconds onto frame indices for a tempo.
///
/// # Examples
/// ```
/// use bopper_core::{BeatClock, Tempo};
///
/// let clock = BeatClock::new(Tempo::new(120), 1);
/// assert_eq!(clock.beat_interval_ms(), 500.0);
/// assert_eq!(clock.frame_index(250.0, 4), Some(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatClock {
    tempo: Tempo,
    speed_divisor: u32,
}

impl BeatClock {
    /// A zero divisor is treated as one.
    pub fn new(tempo: Tempo, speed_divisor: u32) -> Self {
        Self {
            tempo,
            speed_divisor: speed_divisor.max(1),
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(Tempo::new(config.bpm), config.speed_divisor)
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn speed_divisor(&self) -> u32 {
        self.speed_divisor
    }

    /// Duration of one animation cycle in milliseconds.
    pub fn beat_interval_ms(&self) -> f64 {
        60_000.0 / self.tempo.bpm() as f64 * self.speed_divisor as f64
    }

    pub fn frame_interval_ms(&self, frame_count: usize) -> Option<f64> {
        (frame_count > 0).then(|| self.beat_interval_ms() / frame_count as f64)
    }

    /// Position within the current cycle, in `[0, 1)`.
    pub fn progress(&self, elapsed_ms: f64) -> f64 {
        let interval = self.beat_interval_ms();
        elapsed_ms.rem_euclid(interval) / interval
    }

    /// Number of completed cycles.
    pub fn cycle(&self, elapsed_ms: f64) -> u64 {
        (elapsed_ms / self.beat_interval_ms()).floor().max(0.0) as u64
    }

    pub fn frame_index(&self, elapsed_ms: f64, frame_count: usize) -> Option<usize> {
        if frame_count == 0 {
            return None;
        }
        let index = (self.progress(elapsed_ms) * frame_count as f64).floor() as usize;
        Some(index % frame_count)
    }

    /// Frame index for free-running time, honoring a playback direction.
    pub fn frame_index_directed(
        &self,
        elapsed_ms: f64,
        frame_count: usize,
        direction: PlaybackDirection,
    ) -> Option<usize> {
        let index = self.frame_index(elapsed_ms, frame_count)?;
        Some(direction.apply(index, frame_count, self.cycle(elapsed_ms)))
    }
}

/// Fractional position within the current beat for a host transport
/// position measured in quarter notes.
pub fn beat_phase(ppq_position: f64) -> f64 {
    if !ppq_position.is_finite() {
        return 0.0;
    }
    ppq_position - ppq_position.floor()
}

/// Frame index for a beat phase; out-of-range phases are clamped.
pub fn frame_index_from_phase(phase: f64, frame_count: usize) -> Option<usize> {
    if frame_count == 0 {
        return None;
    }
    let phase = if phase.is_nan() { 0.0 } else { phase.clamp(0.0, 1.0) };
    let index = (phase * frame_count as f64).floor() as usize;
    Some(index.min(frame_count - 1))
}

/// Result of one [`PlaybackState::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub frame_index: usize,
    pub frame_changed: bool,
    /// A beat boundary was crossed and the beat timer restarted.
    pub beat: bool,
}

/// Explicit playback state driven by a host loop.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    clock: BeatClock,
    direction: PlaybackDirection,
    playing: bool,
    last_beat_ms: f64,
    beat_count: u64,
    current_frame: usize,
}

impl PlaybackState {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            clock: BeatClock::from_config(config),
            direction: config.direction,
            playing: false,
            last_beat_ms: 0.0,
            beat_count: 0,
            current_frame: 0,
        }
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    pub fn start(&mut self, now_ms: f64) {
        self.playing = true;
        self.last_beat_ms = now_ms;
        debug!(bpm = self.clock.tempo().bpm(), "playback started");
    }

    pub fn stop(&mut self) {
        self.playing = false;
        debug!(frame = self.current_frame, "playback stopped");
    }

    /// Returns whether playback is running afterwards.
    pub fn toggle(&mut self, now_ms: f64) -> bool {
        if self.playing {
            self.stop();
        } else {
            self.start(now_ms);
        }
        self.playing
    }

    pub fn set_tempo(&mut self, tempo: Tempo, now_ms: f64) {
        self.clock = BeatClock::new(tempo, self.clock.speed_divisor());
        self.restart_beat(now_ms);
    }

    pub fn set_bpm(&mut self, bpm: u16, now_ms: f64) {
        self.set_tempo(Tempo::new(bpm), now_ms);
    }

    pub fn set_speed_divisor(&mut self, speed_divisor: u32, now_ms: f64) {
        self.clock = BeatClock::new(self.clock.tempo(), speed_divisor);
        self.restart_beat(now_ms);
    }

    pub fn set_direction(&mut self, direction: PlaybackDirection) {
        self.direction = direction;
    }

    fn restart_beat(&mut self, now_ms: f64) {
        if self.playing {
            self.last_beat_ms = now_ms;
        }
    }

    /// Advance to `now_ms`. Returns `None` while stopped or without frames.
    pub fn tick(&mut self, now_ms: f64, frame_count: usize) -> Option<Tick> {
        if !self.playing || frame_count == 0 {
            return None;
        }
        let elapsed = now_ms - self.last_beat_ms;
        let index = self.clock.frame_index(elapsed, frame_count)?;
        let frame_index = self.direction.apply(index, frame_count, self.beat_count);

        let frame_changed = frame_index != self.current_frame;
        self.current_frame = frame_index;

        let beat = elapsed >= self.clock.beat_interval_ms();
        if beat {
            self.last_beat_ms = now_ms;
            self.beat_count += 1;
            trace!(beat_count = self.beat_count, "beat");
        }

        Some(Tick {
            frame_index,
            frame_changed,
            beat,
        })
    }
}
