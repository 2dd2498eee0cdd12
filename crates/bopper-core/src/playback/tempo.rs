use std::collections::VecDeque;
use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};

/// Beats per minute, always within `MIN_BPM..=MAX_BPM`.
///
/// # Examples
/// ```
/// use bopper_core::Tempo;
///
/// assert_eq!(Tempo::new(500).bpm(), 300);
/// assert_eq!(Tempo::parse("95 bpm").bpm(), 95);
/// assert_eq!(Tempo::parse("fast").bpm(), 120);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct Tempo(u16);

impl Tempo {
    pub const MIN_BPM: u16 = 20;
    pub const MAX_BPM: u16 = 300;
    pub const DEFAULT_BPM: u16 = 120;

    pub fn new(bpm: u16) -> Self {
        Self(bpm.clamp(Self::MIN_BPM, Self::MAX_BPM))
    }

    fn from_i64(bpm: i64) -> Self {
        Self(bpm.clamp(Self::MIN_BPM as i64, Self::MAX_BPM as i64) as u16)
    }

    /// Parse the leading integer of a user entry. Entries without one, or
    /// whose value is zero, fall back to the default tempo; out-of-range
    /// values, however long, clamp.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim_start();
        let sign_len = usize::from(trimmed.starts_with(['-', '+']));
        let digits_len = trimmed[sign_len..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let bpm = match trimmed[..sign_len + digits_len].parse::<i64>() {
            Ok(bpm) => bpm,
            Err(err) => match err.kind() {
                IntErrorKind::PosOverflow => i64::MAX,
                IntErrorKind::NegOverflow => i64::MIN,
                _ => 0,
            },
        };
        if bpm == 0 {
            Self::default()
        } else {
            Self::from_i64(bpm)
        }
    }

    pub fn adjust(self, delta: i32) -> Self {
        Self::from_i64(self.0 as i64 + delta as i64)
    }

    pub fn bpm(self) -> u16 {
        self.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(Self::DEFAULT_BPM)
    }
}

impl From<u16> for Tempo {
    fn from(bpm: u16) -> Self {
        Self::new(bpm)
    }
}

impl From<Tempo> for u16 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

fn tempo_from_interval(interval_ms: f64) -> Option<Tempo> {
    if !(interval_ms > 0.0) {
        return None;
    }
    Some(Tempo::from_i64((60_000.0 / interval_ms).round() as i64))
}

/// Tempo estimation from manual taps.
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    taps: VecDeque<u64>,
}

impl TapTempo {
    /// A pause longer than this starts a new tap series.
    pub const RESET_MS: u64 = 2_000;
    pub const MAX_TAPS: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tap; returns the tempo once at least two taps are known.
    pub fn tap(&mut self, now_ms: u64) -> Option<Tempo> {
        if let Some(&last) = self.taps.back() {
            if now_ms.saturating_sub(last) > Self::RESET_MS {
                self.taps.clear();
            }
        }
        self.taps.push_back(now_ms);
        if self.taps.len() > Self::MAX_TAPS {
            self.taps.pop_front();
        }
        if self.taps.len() < 2 {
            return None;
        }
        let (first, last) = (self.taps.front()?, self.taps.back()?);
        let mean = last.saturating_sub(*first) as f64 / (self.taps.len() - 1) as f64;
        tempo_from_interval(mean)
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

/// Outcome of one energy sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Detection {
    pub peak: bool,
    pub suggestion: Option<Tempo>,
}

/// Bass-energy onset detector that nudges the tempo toward detected beats.
///
/// Feed it one sample per analysis frame; a sample is a peak when it clears
/// the rolling mean by 30%, an absolute floor, and a refractory interval.
/// Peak spacing from the last four seconds yields a tempo, folded into
/// `60..=180` BPM before it is compared with the current one.
#[derive(Debug, Clone, Default)]
pub struct EnergyBeatDetector {
    history: VecDeque<f64>,
    peaks: Vec<f64>,
    last_peak_ms: Option<f64>,
}

impl EnergyBeatDetector {
    pub const HISTORY_LEN: usize = 43;
    pub const THRESHOLD_RATIO: f64 = 1.3;
    pub const MIN_ENERGY: f64 = 50.0;
    pub const MIN_BEAT_INTERVAL_MS: f64 = 200.0;
    pub const PEAK_WINDOW_MS: f64 = 4_000.0;
    const MIN_PEAKS: usize = 4;
    const MEDIAN_TOLERANCE: f64 = 0.3;
    const MIN_DIFF_BPM: f64 = 5.0;
    const SMOOTHING: f64 = 0.3;

    pub fn new() -> Self {
        Self::default()
    }

    /// Mean magnitude of the lowest tenth of a frequency spectrum.
    pub fn bass_energy(spectrum: &[u8]) -> f64 {
        let bass_end = spectrum.len() / 10;
        if bass_end == 0 {
            return 0.0;
        }
        spectrum[..bass_end].iter().map(|&v| v as f64).sum::<f64>() / bass_end as f64
    }

    pub fn push(&mut self, now_ms: f64, energy: f64, current: Tempo) -> Detection {
        self.history.push_back(energy);
        if self.history.len() > Self::HISTORY_LEN {
            self.history.pop_front();
        }
        let mean = self.history.iter().sum::<f64>() / self.history.len() as f64;

        let refractory_over = self
            .last_peak_ms
            .is_none_or(|last| now_ms - last > Self::MIN_BEAT_INTERVAL_MS);
        if energy <= mean * Self::THRESHOLD_RATIO || energy <= Self::MIN_ENERGY || !refractory_over
        {
            return Detection::default();
        }

        self.last_peak_ms = Some(now_ms);
        self.peaks.push(now_ms);
        self.peaks.retain(|&t| now_ms - t < Self::PEAK_WINDOW_MS);

        Detection {
            peak: true,
            suggestion: self.suggest(current),
        }
    }

    fn suggest(&self, current: Tempo) -> Option<Tempo> {
        if self.peaks.len() < Self::MIN_PEAKS {
            return None;
        }
        let mut intervals: Vec<f64> = self.peaks.windows(2).map(|w| w[1] - w[0]).collect();
        intervals.sort_by(f64::total_cmp);
        let median = intervals[intervals.len() / 2];
        let steady: Vec<f64> = intervals
            .into_iter()
            .filter(|i| (i - median).abs() < median * Self::MEDIAN_TOLERANCE)
            .collect();
        if steady.len() < 2 {
            return None;
        }

        let mean = steady.iter().sum::<f64>() / steady.len() as f64;
        let mut detected = (60_000.0 / mean).round();
        while detected > 180.0 {
            detected /= 2.0;
        }
        while detected < 60.0 {
            detected *= 2.0;
        }

        let current_bpm = current.bpm() as f64;
        if (detected - current_bpm).abs() <= Self::MIN_DIFF_BPM {
            return None;
        }
        let nudged = current_bpm + (detected - current_bpm) * Self::SMOOTHING;
        Some(Tempo::from_i64(nudged.round() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::{EnergyBeatDetector, TapTempo, Tempo};

    #[test]
    fn tempo_clamps_and_adjusts() {
        assert_eq!(Tempo::new(5).bpm(), 20);
        assert_eq!(Tempo::new(120).adjust(-1).bpm(), 119);
        assert_eq!(Tempo::new(300).adjust(1).bpm(), 300);
    }

    #[test]
    fn tempo_parse_handles_signs_and_garbage() {
        assert_eq!(Tempo::parse(" 140").bpm(), 140);
        assert_eq!(Tempo::parse("-40").bpm(), 20);
        assert_eq!(Tempo::parse("0").bpm(), 120);
        assert_eq!(Tempo::parse("").bpm(), 120);
        assert_eq!(Tempo::parse("9000").bpm(), 300);
        assert_eq!(Tempo::parse("99999999999999999999999").bpm(), 300);
        assert_eq!(Tempo::parse("-99999999999999999999999").bpm(), 20);
    }

    #[test]
    fn two_taps_half_a_second_apart_are_120_bpm() {
        let mut taps = TapTempo::new();
        assert_eq!(taps.tap(1_000), None);
        assert_eq!(taps.tap(1_500), Some(Tempo::new(120)));
        assert_eq!(taps.tap(2_000), Some(Tempo::new(120)));
    }

    #[test]
    fn long_pause_restarts_series() {
        let mut taps = TapTempo::new();
        taps.tap(0);
        taps.tap(1_000);
        assert_eq!(taps.tap(3_500), None);
        assert_eq!(taps.tap(3_900), Some(Tempo::new(150)));
    }

    #[test]
    fn only_last_eight_taps_count() {
        let mut taps = TapTempo::new();
        // slow taps first, then eight fast ones push them out
        let mut now = 0;
        for _ in 0..4 {
            taps.tap(now);
            now += 1_000;
        }
        let mut tempo = None;
        for _ in 0..8 {
            tempo = taps.tap(now);
            now += 250;
        }
        assert_eq!(tempo, Some(Tempo::new(240)));
    }

    #[test]
    fn bass_energy_averages_lowest_tenth() {
        let mut spectrum = vec![0u8; 100];
        spectrum[..10].fill(200);
        assert_eq!(EnergyBeatDetector::bass_energy(&spectrum), 200.0);
        assert_eq!(EnergyBeatDetector::bass_energy(&[255; 5]), 0.0);
    }

    #[test]
    fn detector_nudges_toward_steady_peaks() {
        let mut detector = EnergyBeatDetector::new();
        let current = Tempo::new(90);
        let mut peaks = 0;
        let mut suggestion = None;
        for t in (0..=2_000).step_by(20) {
            let energy = if t > 0 && t % 500 == 0 { 100.0 } else { 10.0 };
            let detection = detector.push(t as f64, energy, current);
            if detection.peak {
                peaks += 1;
            }
            if detection.suggestion.is_some() {
                suggestion = detection.suggestion;
            }
        }
        assert_eq!(peaks, 4);
        // detected 120, moved 30% of the way from 90
        assert_eq!(suggestion, Some(Tempo::new(99)));
    }

    #[test]
    fn detector_ignores_quiet_spikes() {
        let mut detector = EnergyBeatDetector::new();
        let current = Tempo::default();
        for t in (0..2_000).step_by(20) {
            let energy = if t % 500 == 0 { 40.0 } else { 5.0 };
            assert!(!detector.push(t as f64, energy, current).peak);
        }
    }

    #[test]
    fn detector_keeps_tempo_when_close() {
        let mut detector = EnergyBeatDetector::new();
        let current = Tempo::new(118);
        for t in (0..=2_000).step_by(20) {
            let energy = if t > 0 && t % 500 == 0 { 100.0 } else { 10.0 };
            assert_eq!(detector.push(t as f64, energy, current).suggestion, None);
        }
    }
}
