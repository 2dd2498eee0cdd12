use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{DecodeOptions, PlaybackConfig};
use crate::gif::decode_gif;
use crate::gif::frame::{CompositedFrame, RawFrame};
use crate::playback::BeatClock;
use crate::source::{SourceError, read_file};
use crate::{AnimationSummary, FrameSummary, PlaybackSummary, Report, make_stub_report};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

pub fn analyze_gif_file(
    path: &Path,
    options: &DecodeOptions,
    playback: Option<&PlaybackConfig>,
) -> Result<Report, AnalysisError> {
    let bytes = read_file(path)?;
    analyze_gif_bytes(&path.display().to_string(), &bytes, options, playback)
}

/// Analyze an in-memory GIF; `label` is recorded as the input path.
pub fn analyze_gif_bytes(
    label: &str,
    bytes: &[u8],
    options: &DecodeOptions,
    playback: Option<&PlaybackConfig>,
) -> Result<Report, AnalysisError> {
    let decoded = decode_gif(bytes, options).map_err(SourceError::from)?;
    if decoded.truncated {
        warn!(input = label, "input ends before the trailer");
    }

    let mut report = make_stub_report(label, bytes.len() as u64);
    report.options = *options;
    report.frames = decoded
        .frames
        .iter()
        .zip(&decoded.animation.frames)
        .enumerate()
        .map(|(index, (raw, composited))| summarize_frame(index, raw, composited))
        .collect();
    report.animation = AnimationSummary {
        width: decoded.screen.width,
        height: decoded.screen.height,
        frames_count: report.frames.len() as u64,
        global_color_table_size: decoded
            .screen
            .global_color_table
            .as_ref()
            .map(|table| table.len() as u64),
        total_delay_cs: report.frames.iter().map(|f| f.delay_cs as u64).sum(),
        truncated: decoded.truncated,
    };
    report.playback = playback.map(|config| summarize_playback(config, report.frames.len()));

    debug!(
        input = label,
        frames = report.animation.frames_count,
        "analysis complete"
    );
    Ok(report)
}

fn summarize_frame(index: usize, raw: &RawFrame, composited: &CompositedFrame) -> FrameSummary {
    FrameSummary {
        index: index as u64,
        left: raw.left,
        top: raw.top,
        width: raw.width,
        height: raw.height,
        interlaced: raw.interlaced,
        local_color_table: raw.has_local_color_table,
        disposal: raw.disposal(),
        delay_cs: raw.delay_cs(),
        transparent_index: raw.transparent_index(),
        decoded_indices: raw.indices.len() as u64,
        opaque_pixels: composited.opaque_pixels() as u64,
    }
}

fn summarize_playback(config: &PlaybackConfig, frame_count: usize) -> PlaybackSummary {
    let clock = BeatClock::from_config(config);
    PlaybackSummary {
        bpm: clock.tempo().bpm(),
        speed_divisor: clock.speed_divisor(),
        direction: config.direction,
        beat_interval_ms: clock.beat_interval_ms(),
        frame_interval_ms: clock.frame_interval_ms(frame_count),
    }
}
