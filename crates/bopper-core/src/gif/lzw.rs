//! GIF-flavoured LZW decompression.
//!
//! Codes start at `min_code_size + 1` bits, grow by one bit whenever the
//! next free code no longer fits, and stop growing at 12 bits. A clear code
//! resets the table and the width. Every code is emitted before the table
//! grows; growing first would shift the meaning of every later code.
//!
//! Decoding never fails. Running out of bits or reading a code beyond the
//! next free slot ends the stream and keeps what was emitted so far.

use tracing::{debug, trace, warn};

use super::layout;
use super::reader::BitReader;

const NO_PREFIX: u16 = u16::MAX;

#[derive(Debug, Clone, Copy)]
struct Entry {
    prefix: u16,
    first: u8,
    last: u8,
    len: u16,
}

/// String table stored as prefix links, so each entry costs a few bytes
/// instead of a full copy of its index sequence.
struct CodeTable {
    entries: Vec<Entry>,
    reserved: usize,
}

impl CodeTable {
    fn new(min_code_size: u8) -> Self {
        let clear_code = 1usize << min_code_size;
        let mut entries = Vec::with_capacity(layout::LZW_MAX_TABLE_SIZE);
        entries.extend((0..clear_code).map(|index| Entry {
            prefix: NO_PREFIX,
            first: index as u8,
            last: index as u8,
            len: 1,
        }));
        // Clear and end codes occupy a slot each but never expand.
        let control = Entry {
            prefix: NO_PREFIX,
            first: 0,
            last: 0,
            len: 0,
        };
        entries.extend([control, control]);
        let reserved = entries.len();
        Self { entries, reserved }
    }

    fn reset(&mut self) {
        self.entries.truncate(self.reserved);
    }

    fn next_code(&self) -> u16 {
        self.entries.len() as u16
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= layout::LZW_MAX_TABLE_SIZE
    }

    fn first(&self, code: u16) -> u8 {
        self.entries[code as usize].first
    }

    fn push(&mut self, prefix: u16, last: u8) {
        let parent = self.entries[prefix as usize];
        self.entries.push(Entry {
            prefix,
            first: parent.first,
            last,
            len: parent.len + 1,
        });
    }

    fn emit(&self, code: u16, out: &mut Vec<u8>) {
        let len = self.entries[code as usize].len as usize;
        let start = out.len();
        out.resize(start + len, 0);
        let mut code = code;
        for slot in out[start..].iter_mut().rev() {
            let entry = self.entries[code as usize];
            *slot = entry.last;
            code = entry.prefix;
        }
    }
}

/// Decompress a concatenated image-data stream into color-table indices.
///
/// `min_code_size` outside `2..=8` yields an empty stream.
///
/// # Examples
/// ```
/// use bopper_core::decode_lzw;
///
/// // clear, 1, 6 (repeat of the previous entry), end; 3-bit codes
/// let indices = decode_lzw(2, &[0x8c, 0x0b]);
/// assert_eq!(indices, vec![1, 1, 1]);
/// ```
pub fn decode(min_code_size: u8, data: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    if !layout::LZW_MIN_CODE_SIZE.contains(&min_code_size) {
        warn!(min_code_size, "unsupported LZW minimum code size");
        return output;
    }

    let clear_code = 1u16 << min_code_size;
    let end_code = clear_code + 1;
    let initial_width = min_code_size + 1;

    let mut width = initial_width;
    let mut table = CodeTable::new(min_code_size);
    let mut reader = BitReader::new(data);
    let mut previous: Option<u16> = None;

    loop {
        let Some(code) = reader.read_bits(width) else {
            debug!(emitted = output.len(), "LZW stream ended without end code");
            break;
        };
        if code == clear_code {
            trace!("LZW clear code");
            width = initial_width;
            table.reset();
            previous = None;
            continue;
        }
        if code == end_code {
            break;
        }

        let next_code = table.next_code();
        let prev = match previous {
            None if code < next_code => {
                table.emit(code, &mut output);
                previous = Some(code);
                continue;
            }
            Some(prev) if code <= next_code => prev,
            _ => {
                warn!(code, next_code, "corrupt LZW code, truncating frame data");
                break;
            }
        };

        let first = if code < next_code {
            table.emit(code, &mut output);
            table.first(code)
        } else {
            // Code not yet in the table: previous entry plus its own first index.
            let first = table.first(prev);
            table.emit(prev, &mut output);
            output.push(first);
            first
        };

        if !table.is_full() {
            table.push(prev, first);
            if u32::from(table.next_code()) > (1u32 << width) - 1
                && width < layout::LZW_MAX_CODE_WIDTH
            {
                width += 1;
                trace!(width, "LZW code width grew");
            }
        }
        previous = Some(code);
    }

    output
}
