use serde::{Deserialize, Serialize};

use super::layout;

/// Ordered RGB palette; its length is a power of two in `2..=256`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<[u8; 3]>,
}

impl ColorTable {
    pub fn new(entries: Vec<[u8; 3]>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve an index; indices past the end of the table yield `None`.
    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        self.entries.get(index as usize).copied()
    }
}

/// How a frame's region is treated before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalMethod {
    #[default]
    None,
    DoNotDispose,
    RestoreBackground,
    RestorePrevious,
}

impl DisposalMethod {
    /// Map the 3-bit wire value; reserved values 4..=7 behave like `None`.
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => DisposalMethod::DoNotDispose,
            2 => DisposalMethod::RestoreBackground,
            3 => DisposalMethod::RestorePrevious,
            _ => DisposalMethod::None,
        }
    }
}

/// Graphics control extension attached to the image block that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphicsControl {
    pub disposal: DisposalMethod,
    pub transparent_index: Option<u8>,
    pub delay_cs: u16,
}

/// Logical screen descriptor plus the optional global color table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogicalScreen {
    pub width: u16,
    pub height: u16,
    pub global_color_table: Option<ColorTable>,
    pub background_index: u8,
}

/// Image block as found in the container, before decompression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub local_color_table: Option<ColorTable>,
    pub control: Option<GraphicsControl>,
    pub min_code_size: u8,
    pub data: Vec<u8>,
}

/// One frame's decompressed indices with everything the compositor needs.
///
/// `color_table` is the local table when present, otherwise the global one;
/// a frame without either cannot paint any pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub color_table: Option<ColorTable>,
    pub has_local_color_table: bool,
    pub interlaced: bool,
    pub control: Option<GraphicsControl>,
    pub indices: Vec<u8>,
}

impl RawFrame {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn disposal(&self) -> DisposalMethod {
        self.control.map(|c| c.disposal).unwrap_or_default()
    }

    pub fn transparent_index(&self) -> Option<u8> {
        self.control.and_then(|c| c.transparent_index)
    }

    pub fn delay_cs(&self) -> u16 {
        self.control.map(|c| c.delay_cs).unwrap_or(0)
    }
}

/// Fully composited RGBA bitmap of the logical screen after one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositedFrame {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl CompositedFrame {
    /// Wrap row-major RGBA bytes; returns `None` when the length does not
    /// match `width * height * 4`.
    pub fn from_rgba(width: u16, height: u16, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * layout::RGBA_CHANNELS {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub(crate) fn from_canvas(width: u16, height: u16, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * layout::RGBA_CHANNELS
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Row-major RGBA bytes, `width * height * 4` long.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * layout::RGBA_CHANNELS;
        let px = &self.pixels[offset..offset + layout::RGBA_CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn opaque_pixels(&self) -> usize {
        self.pixels
            .chunks_exact(layout::RGBA_CHANNELS)
            .filter(|px| px[3] != 0)
            .count()
    }
}

/// Ordered composited frames of one decode, indexable in O(1).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Animation {
    pub width: u16,
    pub height: u16,
    pub frames: Vec<CompositedFrame>,
}

impl Animation {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&CompositedFrame> {
        self.frames.get(index)
    }
}
