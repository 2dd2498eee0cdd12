use std::fs;
use std::path::{Path, PathBuf};

const TAG_EXTENSION: u8 = 0x21;
const TAG_IMAGE: u8 = 0x2c;
const TAG_TRAILER: u8 = 0x3b;
const EXT_GRAPHICS_CONTROL: u8 = 0xf9;
const COLOR_TABLE_PRESENT: u8 = 0x80;
const INTERLACED: u8 = 0x40;
const MAX_SUB_BLOCK_LEN: usize = 255;
const MIN_CODE_SIZE: u8 = 2;

const PALETTE_4: [[u8; 3]; 4] = [[0, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]];
const PALETTE_2: [[u8; 3]; 2] = [[0, 0, 0], [255, 255, 255]];
const LOCAL_PALETTE_2: [[u8; 3]; 2] = [[10, 20, 30], [40, 50, 60]];

fn main() -> Result<(), String> {
    let root = PathBuf::from("tests/golden");
    write_fixture(&root.join("two_frames"), &two_frames())?;
    write_fixture(&root.join("interlaced"), &interlaced())?;
    write_fixture(&root.join("truncated"), &truncated())?;
    Ok(())
}

fn write_fixture(dir: &Path, bytes: &[u8]) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|err| format!("failed to create {}: {}", dir.display(), err))?;
    let path = dir.join("input.gif");
    fs::write(&path, bytes).map_err(|err| format!("failed to write {}: {}", path.display(), err))
}

/// Full frame, a transparent patch disposed to background, then a 1x1 dot.
fn two_frames() -> Vec<u8> {
    let mut gif = header(4, 4, &PALETTE_4);
    graphics_control(&mut gif, 1, 10, None);
    image(
        &mut gif,
        Rect::new(0, 0, 4, 4),
        false,
        None,
        &[1, 1, 1, 1, 1, 2, 2, 1, 1, 2, 2, 1, 1, 1, 1, 1],
    );
    graphics_control(&mut gif, 2, 20, Some(3));
    image(&mut gif, Rect::new(1, 1, 2, 2), false, None, &[3, 0, 0, 3]);
    image(&mut gif, Rect::new(0, 0, 1, 1), false, None, &[2]);
    gif.push(TAG_TRAILER);
    gif
}

/// Interlaced column followed by a frame with its own color table.
fn interlaced() -> Vec<u8> {
    let mut gif = header(1, 8, &PALETTE_2);
    image(
        &mut gif,
        Rect::new(0, 0, 1, 8),
        true,
        None,
        &[0, 1, 0, 1, 0, 1, 0, 1],
    );
    image(
        &mut gif,
        Rect::new(0, 0, 1, 1),
        false,
        Some(&LOCAL_PALETTE_2),
        &[1],
    );
    gif.push(TAG_TRAILER);
    gif
}

/// One complete frame, then data ending inside the next image descriptor.
fn truncated() -> Vec<u8> {
    let mut gif = header(2, 2, &PALETTE_4);
    graphics_control(&mut gif, 0, 5, None);
    image(&mut gif, Rect::new(0, 0, 2, 2), false, None, &[0, 1, 2, 3]);
    graphics_control(&mut gif, 0, 5, None);
    gif.extend_from_slice(&[TAG_IMAGE, 0, 0]);
    gif
}

struct Rect {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
}

impl Rect {
    fn new(left: u16, top: u16, width: u16, height: u16) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

fn header(width: u16, height: u16, palette: &[[u8; 3]]) -> Vec<u8> {
    let mut gif = b"GIF89a".to_vec();
    gif.extend_from_slice(&width.to_le_bytes());
    gif.extend_from_slice(&height.to_le_bytes());
    gif.push(COLOR_TABLE_PRESENT | table_size_bits(palette.len()));
    gif.extend_from_slice(&[0, 0]);
    push_palette(&mut gif, palette);
    gif
}

fn graphics_control(gif: &mut Vec<u8>, disposal: u8, delay_cs: u16, transparent: Option<u8>) {
    let packed = (disposal << 2) | u8::from(transparent.is_some());
    gif.extend_from_slice(&[TAG_EXTENSION, EXT_GRAPHICS_CONTROL, 4, packed]);
    gif.extend_from_slice(&delay_cs.to_le_bytes());
    gif.extend_from_slice(&[transparent.unwrap_or(0), 0]);
}

fn image(
    gif: &mut Vec<u8>,
    rect: Rect,
    interlaced: bool,
    local_palette: Option<&[[u8; 3]]>,
    indices: &[u8],
) {
    gif.push(TAG_IMAGE);
    for value in [rect.left, rect.top, rect.width, rect.height] {
        gif.extend_from_slice(&value.to_le_bytes());
    }
    let mut packed = if interlaced { INTERLACED } else { 0 };
    if let Some(palette) = local_palette {
        packed |= COLOR_TABLE_PRESENT | table_size_bits(palette.len());
    }
    gif.push(packed);
    if let Some(palette) = local_palette {
        push_palette(gif, palette);
    }
    gif.push(MIN_CODE_SIZE);
    for chunk in encode_without_compression(MIN_CODE_SIZE, indices).chunks(MAX_SUB_BLOCK_LEN) {
        gif.push(chunk.len() as u8);
        gif.extend_from_slice(chunk);
    }
    gif.push(0);
}

fn table_size_bits(entries: usize) -> u8 {
    (entries.max(2).next_power_of_two().trailing_zeros() - 1) as u8
}

fn push_palette(gif: &mut Vec<u8>, palette: &[[u8; 3]]) {
    for rgb in palette {
        gif.extend_from_slice(rgb);
    }
}

/// LZW stream made only of literals, with a clear code before the table
/// would force the code width to grow.
///
/// Kept separate from the `weezl` encoder used by the integration tests:
/// the committed fixtures must decode the same whatever encoder those tests
/// compare against.
fn encode_without_compression(min_code_size: u8, indices: &[u8]) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let end = clear + 1;
    let width = min_code_size + 1;
    let run = (clear - 2) as usize;

    let mut bits = BitWriter::default();
    for chunk in indices.chunks(run) {
        bits.write(clear, width);
        for &index in chunk {
            bits.write(index as u16, width);
        }
    }
    bits.write(end, width);
    bits.finish()
}

#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    buffer: u32,
    bits: u8,
}

impl BitWriter {
    fn write(&mut self, code: u16, width: u8) {
        self.buffer |= (code as u32) << self.bits;
        self.bits += width;
        while self.bits >= 8 {
            self.out.push(self.buffer as u8);
            self.buffer >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.out.push(self.buffer as u8);
        }
        self.out
    }
}
