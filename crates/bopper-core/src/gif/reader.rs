use super::error::GifError;
use super::layout;

/// Sequential, bounds-checked cursor over a GIF buffer.
///
/// Every read either advances past the bytes it returns or fails with
/// `GifError::TooShort` and leaves the cursor where it was.
///
/// # Examples
/// ```
/// use bopper_core::gif::reader::ByteReader;
///
/// let mut reader = ByteReader::new(&[0x0a, 0x00, 0xff]);
/// assert_eq!(reader.read_u16_le().unwrap(), 10);
/// assert_eq!(reader.read_u8().unwrap(), 0xff);
/// assert!(reader.is_empty());
/// ```
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn require(&self, needed: usize) -> Result<(), GifError> {
        if self.remaining() < needed {
            return Err(GifError::TooShort {
                needed: self.pos + needed,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, GifError> {
        self.require(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, GifError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], GifError> {
        self.require(len)?;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), GifError> {
        self.read_slice(len).map(|_| ())
    }

    /// Read `entries` RGB triples.
    pub fn read_rgb_triples(&mut self, entries: usize) -> Result<Vec<[u8; 3]>, GifError> {
        let bytes = self.read_slice(entries * layout::RGB_CHANNELS)?;
        Ok(bytes
            .chunks_exact(layout::RGB_CHANNELS)
            .map(|rgb| [rgb[0], rgb[1], rgb[2]])
            .collect())
    }

    /// Concatenate length-prefixed sub-blocks up to and including the
    /// zero-length terminator.
    pub fn read_sub_blocks(&mut self) -> Result<Vec<u8>, GifError> {
        let mut payload = Vec::new();
        loop {
            let len = self.read_u8()? as usize;
            if len == 0 {
                return Ok(payload);
            }
            payload.extend_from_slice(self.read_slice(len)?);
        }
    }

    /// Skip length-prefixed sub-blocks up to and including the terminator.
    pub fn skip_sub_blocks(&mut self) -> Result<(), GifError> {
        loop {
            let len = self.read_u8()? as usize;
            if len == 0 {
                return Ok(());
            }
            self.skip(len)?;
        }
    }
}

/// Least-significant-bit-first reader of variable-width codes.
///
/// Codes may straddle byte boundaries. A read that would run past the end
/// of the data returns `None`.
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    buffer: u32,
    bits: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            buffer: 0,
            bits: 0,
        }
    }

    pub fn read_bits(&mut self, width: u8) -> Option<u16> {
        debug_assert!(width <= layout::LZW_MAX_CODE_WIDTH);
        while self.bits < width {
            let byte = *self.data.get(self.byte_pos)?;
            self.buffer |= (byte as u32) << self.bits;
            self.bits += 8;
            self.byte_pos += 1;
        }
        let code = (self.buffer & ((1u32 << width) - 1)) as u16;
        self.buffer >>= width;
        self.bits -= width;
        Some(code)
    }
}
