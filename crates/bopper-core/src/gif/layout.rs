pub const SIGNATURE: &[u8; 3] = b"GIF";
pub const SIGNATURE_RANGE: std::ops::Range<usize> = 0..3;
pub const HEADER_LEN: usize = 6;

/// Width, height, packed flags, background index, pixel aspect.
pub const SCREEN_DESCRIPTOR_LEN: usize = 7;

pub const TAG_EXTENSION: u8 = 0x21;
pub const TAG_IMAGE: u8 = 0x2C;
pub const TAG_TRAILER: u8 = 0x3B;

pub const EXT_GRAPHICS_CONTROL: u8 = 0xF9;

pub const COLOR_TABLE_PRESENT: u8 = 0b1000_0000;
pub const COLOR_TABLE_SIZE_MASK: u8 = 0b0000_0111;
pub const INTERLACED: u8 = 0b0100_0000;

pub const DISPOSAL_SHIFT: u8 = 2;
pub const DISPOSAL_MASK: u8 = 0b0000_0111;
pub const TRANSPARENT_FLAG: u8 = 0b0000_0001;

pub const RGB_CHANNELS: usize = 3;
pub const RGBA_CHANNELS: usize = 4;

pub const LZW_MIN_CODE_SIZE: std::ops::RangeInclusive<u8> = 2..=8;
pub const LZW_MAX_CODE_WIDTH: u8 = 12;
pub const LZW_MAX_TABLE_SIZE: usize = 1 << LZW_MAX_CODE_WIDTH;

/// Interlace passes as `(first row, row stride)`.
pub const INTERLACE_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Number of entries a packed size exponent describes: `2 << n`.
pub fn color_table_entries(packed: u8) -> usize {
    2usize << (packed & COLOR_TABLE_SIZE_MASK)
}
