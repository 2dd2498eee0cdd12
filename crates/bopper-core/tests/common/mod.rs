#![allow(dead_code)]

use weezl::BitOrder;
use weezl::encode::Encoder;

pub const PALETTE: [[u8; 3]; 4] = [[0, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]];

/// Minimal GIF writer for tests; image data is compressed with `weezl`.
pub struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16, palette: &[[u8; 3]]) -> Self {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.push(0x80 | size_bits(palette.len()));
        bytes.extend_from_slice(&[0, 0]);
        for rgb in palette {
            bytes.extend_from_slice(rgb);
        }
        Self { bytes }
    }

    pub fn control(mut self, disposal: u8, delay_cs: u16, transparent: Option<u8>) -> Self {
        let packed = (disposal << 2) | u8::from(transparent.is_some());
        self.bytes.extend_from_slice(&[0x21, 0xf9, 4, packed]);
        self.bytes.extend_from_slice(&delay_cs.to_le_bytes());
        self.bytes.extend_from_slice(&[transparent.unwrap_or(0), 0]);
        self
    }

    /// Application extension with two data sub-blocks.
    pub fn application_extension(mut self) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xff, 11]);
        self.bytes.extend_from_slice(b"NETSCAPE2.0");
        self.bytes.extend_from_slice(&[3, 1, 0, 0, 2, 0xaa, 0xbb, 0]);
        self
    }

    pub fn image(self, left: u16, top: u16, width: u16, height: u16, indices: &[u8]) -> Self {
        self.image_with(left, top, width, height, false, None, 2, indices)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn image_with(
        mut self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        interlaced: bool,
        local_palette: Option<&[[u8; 3]]>,
        min_code_size: u8,
        indices: &[u8],
    ) -> Self {
        self.bytes.push(0x2c);
        for value in [left, top, width, height] {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
        let mut packed = if interlaced { 0x40 } else { 0 };
        if let Some(palette) = local_palette {
            packed |= 0x80 | size_bits(palette.len());
        }
        self.bytes.push(packed);
        if let Some(palette) = local_palette {
            for rgb in palette {
                self.bytes.extend_from_slice(rgb);
            }
        }
        self.bytes.push(min_code_size);
        let data = Encoder::new(BitOrder::Lsb, min_code_size)
            .encode(indices)
            .expect("encode indices");
        for chunk in data.chunks(255) {
            self.bytes.push(chunk.len() as u8);
            self.bytes.extend_from_slice(chunk);
        }
        self.bytes.push(0);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn trailer(mut self) -> Vec<u8> {
        self.bytes.push(0x3b);
        self.bytes
    }

    pub fn unterminated(self) -> Vec<u8> {
        self.bytes
    }
}

fn size_bits(entries: usize) -> u8 {
    (entries.max(2).next_power_of_two().trailing_zeros() - 1) as u8
}

pub fn rgba(index: usize) -> [u8; 4] {
    let [r, g, b] = PALETTE[index];
    [r, g, b, 255]
}
