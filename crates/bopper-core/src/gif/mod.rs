//! GIF decoding.
//!
//! The decoder follows the same layering as the rest of the crate:
//! - `layout`: wire constants (source of truth for tags, flags and limits)
//! - `reader`: bounds-checked byte cursor and LSB-first code reader
//! - `parser`: container walk producing image blocks (no pixel work)
//! - `lzw`: code-stream decompression into color-table indices
//! - `compositor`: disposal, interlace and transparency onto a canvas
//! - `error`: explicit, actionable errors
//!
//! Decoding is a pure function of the input buffer: no I/O and no state
//! survives between calls.

pub mod compositor;
pub mod error;
pub mod frame;
pub mod layout;
pub mod lzw;
pub mod parser;
pub mod reader;

use tracing::debug;

use crate::config::DecodeOptions;
use error::GifError;
use frame::{Animation, ColorTable, ImageBlock, LogicalScreen, RawFrame};
use parser::parse_gif;

/// Everything one decode produces: container metadata, the decompressed
/// frames and their composited bitmaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGif {
    pub screen: LogicalScreen,
    pub frames: Vec<RawFrame>,
    pub animation: Animation,
    pub truncated: bool,
}

/// Decompress one image block, resolving its color table.
pub fn decompress_block(block: ImageBlock, global: Option<&ColorTable>) -> RawFrame {
    let indices = lzw::decode(block.min_code_size, &block.data);
    let has_local_color_table = block.local_color_table.is_some();
    RawFrame {
        left: block.left,
        top: block.top,
        width: block.width,
        height: block.height,
        color_table: block.local_color_table.or_else(|| global.cloned()),
        has_local_color_table,
        interlaced: block.interlaced,
        control: block.control,
        indices,
    }
}

/// Parse, decompress and composite a GIF buffer.
///
/// # Examples
/// ```
/// use bopper_core::{DecodeOptions, decode_gif};
///
/// let empty = b"GIF89a\x01\x00\x01\x00\x00\x00\x00\x3b";
/// let decoded = decode_gif(empty, &DecodeOptions::default())?;
/// assert!(decoded.animation.is_empty());
/// # Ok::<(), bopper_core::GifError>(())
/// ```
pub fn decode_gif(buffer: &[u8], options: &DecodeOptions) -> Result<DecodedGif, GifError> {
    let parsed = parse_gif(buffer, options.unknown_blocks)?;
    let screen = parsed.screen;
    let frames: Vec<RawFrame> = parsed
        .blocks
        .into_iter()
        .map(|block| decompress_block(block, screen.global_color_table.as_ref()))
        .collect();
    let composited = compositor::composite(screen.width, screen.height, &frames, options);
    debug!(
        frames = composited.len(),
        truncated = parsed.truncated,
        "GIF decoded"
    );

    Ok(DecodedGif {
        animation: Animation {
            width: screen.width,
            height: screen.height,
            frames: composited,
        },
        screen,
        frames,
        truncated: parsed.truncated,
    })
}

/// Decode a GIF buffer into its composited frames only.
pub fn decode_animation(buffer: &[u8], options: &DecodeOptions) -> Result<Animation, GifError> {
    decode_gif(buffer, options).map(|decoded| decoded.animation)
}
