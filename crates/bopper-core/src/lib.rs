//! Bopper core library: GIF decoding and beat-synchronized playback.
//!
//! The decoder is layered like a protocol stack: a container parser walks
//! the GIF block structure, an LZW decompressor turns each image block into
//! color-table indices, and a compositor replays disposal, interlacing and
//! transparency onto a persistent RGBA canvas. Decoding is byte-oriented and
//! side-effect free; file I/O is isolated in the `source` layer, and the
//! `analysis` layer condenses a decode into a deterministic report.
//!
//! Invariants:
//! - Only a missing `GIF` signature is fatal; damaged input yields the
//!   frames decoded so far.
//! - Every composited frame is an independent copy of the canvas.
//! - Report outputs are deterministic and stable across runs.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use bopper_core::{DecodeOptions, analyze_gif_file};
//!
//! let report = analyze_gif_file(Path::new("loop.gif"), &DecodeOptions::default(), None)?;
//! println!("frames: {}", report.animation.frames_count);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod analysis;
mod config;
pub mod gif;
mod playback;
mod source;

pub use analysis::{AnalysisError, analyze_gif_bytes, analyze_gif_file};
pub use config::{
    BopperConfig, ConfigError, DecodeOptions, PlaybackConfig, PreviousDisposal, TransparencyMode,
    UnknownBlockPolicy,
};
pub use gif::compositor::{composite, interlace_rows};
pub use gif::error::GifError;
pub use gif::frame::{
    Animation, ColorTable, CompositedFrame, DisposalMethod, GraphicsControl, ImageBlock,
    LogicalScreen, RawFrame,
};
pub use gif::lzw::decode as decode_lzw;
pub use gif::parser::{ParsedGif, parse_gif};
pub use gif::{DecodedGif, decode_animation, decode_gif, decompress_block};
pub use playback::{
    BeatClock, Detection, EnergyBeatDetector, PlaybackDirection, PlaybackState, TapTempo, Tempo,
    Tick, beat_phase, frame_index_from_phase,
};
#[cfg(feature = "image-backend")]
pub use source::ImageCrateSource;
pub use source::{
    FrameSource, GifFrameSource, SourceError, SourcePreference, image_backend_available,
    load_frames, read_file, select_frame_source,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;

/// Decode report for one GIF input.
///
/// # Examples
/// ```
/// use bopper_core::make_stub_report;
///
/// let report = make_stub_report("loop.gif", 123);
/// assert_eq!(report.report_version, bopper_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// Input file metadata.
    pub input: InputInfo,
    /// Decode options the report was produced with.
    pub options: DecodeOptions,
    /// Logical screen and whole-animation figures.
    pub animation: AnimationSummary,
    /// Per-frame summaries in file order.
    pub frames: Vec<FrameSummary>,
    /// Beat timing, present when a tempo was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback: Option<PlaybackSummary>,
}

/// Tool metadata embedded in reports.
///
/// # Examples
/// ```
/// use bopper_core::ToolInfo;
///
/// let tool = ToolInfo {
///     name: "bopper".to_string(),
///     version: "0.1.0".to_string(),
/// };
/// assert_eq!(tool.name, "bopper");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name ("bopper").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input file metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the analyzer.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Whole-animation figures.
///
/// # Examples
/// ```
/// use bopper_core::AnimationSummary;
///
/// let summary = AnimationSummary::default();
/// assert_eq!(summary.frames_count, 0);
/// assert!(!summary.truncated);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimationSummary {
    /// Logical screen width in pixels.
    pub width: u16,
    /// Logical screen height in pixels.
    pub height: u16,
    /// Number of decoded frames.
    pub frames_count: u64,
    /// Global color table entries, when the file has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_color_table_size: Option<u64>,
    /// Sum of all frame delays in hundredths of a second.
    pub total_delay_cs: u64,
    /// Decoding stopped before the trailer (truncated data or unknown tag).
    pub truncated: bool,
}

/// Per-frame summary.
///
/// # Examples
/// ```
/// use bopper_core::{DisposalMethod, FrameSummary};
///
/// let frame = FrameSummary {
///     index: 0,
///     left: 0,
///     top: 0,
///     width: 16,
///     height: 16,
///     interlaced: false,
///     local_color_table: false,
///     disposal: DisposalMethod::None,
///     delay_cs: 10,
///     transparent_index: None,
///     decoded_indices: 256,
///     opaque_pixels: 256,
/// };
/// assert_eq!(frame.decoded_indices, 256);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Position in file order.
    pub index: u64,
    /// Frame rectangle within the logical screen.
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// Rows were stored in interlaced order.
    pub interlaced: bool,
    /// The frame carried its own color table.
    pub local_color_table: bool,
    /// Disposal applied before the next frame.
    pub disposal: DisposalMethod,
    /// Display delay in hundredths of a second.
    pub delay_cs: u16,
    /// Transparent color index, when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent_index: Option<u8>,
    /// Number of indices the LZW stream produced (may differ from the
    /// rectangle area on damaged input).
    pub decoded_indices: u64,
    /// Non-transparent pixels on the composited canvas after this frame.
    pub opaque_pixels: u64,
}

/// Beat timing for the requested tempo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSummary {
    /// Effective (clamped) tempo.
    pub bpm: u16,
    /// Beats per animation cycle.
    pub speed_divisor: u32,
    /// Frame visiting order.
    pub direction: PlaybackDirection,
    /// Duration of one animation cycle in milliseconds.
    pub beat_interval_ms: f64,
    /// Time each frame stays on screen, when there are frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_interval_ms: Option<f64>,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use bopper_core::make_stub_report;
///
/// let report = make_stub_report("loop.gif", 123);
/// assert_eq!(report.input.bytes, 123);
/// assert!(report.frames.is_empty());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "bopper".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        options: DecodeOptions::default(),
        animation: AnimationSummary::default(),
        frames: vec![],
        playback: None,
    }
}
