use tracing::{debug, warn};

use super::error::GifError;
use super::frame::{ColorTable, DisposalMethod, GraphicsControl, ImageBlock, LogicalScreen};
use super::layout;
use super::reader::ByteReader;
use crate::config::UnknownBlockPolicy;

/// Container-level view of a GIF: the logical screen and its image blocks
/// in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedGif {
    pub screen: LogicalScreen,
    pub blocks: Vec<ImageBlock>,
    /// Parsing ended on truncated data or an unrecognized tag rather than
    /// on the trailer.
    pub truncated: bool,
}

/// Walk the block structure of a GIF buffer.
///
/// Only a missing `GIF` signature is fatal. Truncated data ends the walk
/// and keeps every image block that was read completely. An unknown block
/// tag either ends the walk the same way or fails, depending on `policy`.
pub fn parse_gif(buffer: &[u8], policy: UnknownBlockPolicy) -> Result<ParsedGif, GifError> {
    check_signature(buffer)?;

    let mut gif = ParsedGif::default();
    let mut reader = ByteReader::new(buffer);
    match parse_blocks(&mut reader, &mut gif, policy) {
        Ok(()) => {}
        Err(GifError::TooShort { needed, actual }) => {
            warn!(
                needed,
                actual,
                frames = gif.blocks.len(),
                "GIF data truncated, keeping complete frames"
            );
            gif.truncated = true;
        }
        Err(err) => return Err(err),
    }
    Ok(gif)
}

/// Fail unless the buffer starts with the `GIF` signature.
pub fn check_signature(buffer: &[u8]) -> Result<(), GifError> {
    let mut found = [0u8; 3];
    let available = buffer.len().min(found.len());
    found[..available].copy_from_slice(&buffer[..available]);
    if buffer.get(layout::SIGNATURE_RANGE) != Some(&layout::SIGNATURE[..]) {
        return Err(GifError::InvalidSignature { found });
    }
    Ok(())
}

fn parse_blocks(
    reader: &mut ByteReader<'_>,
    gif: &mut ParsedGif,
    policy: UnknownBlockPolicy,
) -> Result<(), GifError> {
    reader.skip(layout::HEADER_LEN)?;
    gif.screen = read_logical_screen(reader)?;
    debug!(
        width = gif.screen.width,
        height = gif.screen.height,
        global_colors = gif.screen.global_color_table.as_ref().map(ColorTable::len),
        "logical screen"
    );

    let mut pending_control = None;
    loop {
        if reader.is_empty() {
            debug!("end of data before trailer");
            gif.truncated = true;
            return Ok(());
        }
        let offset = reader.position();
        match reader.read_u8()? {
            layout::TAG_EXTENSION => {
                if let Some(control) = read_extension(reader)? {
                    pending_control = Some(control);
                }
            }
            layout::TAG_IMAGE => {
                let block = read_image_block(reader, pending_control.take())?;
                debug!(
                    index = gif.blocks.len(),
                    left = block.left,
                    top = block.top,
                    width = block.width,
                    height = block.height,
                    interlaced = block.interlaced,
                    compressed = block.data.len(),
                    "image block"
                );
                gif.blocks.push(block);
            }
            layout::TAG_TRAILER => return Ok(()),
            tag => match policy {
                UnknownBlockPolicy::Stop => {
                    warn!(tag, offset, "unknown block tag, stopping");
                    gif.truncated = true;
                    return Ok(());
                }
                UnknownBlockPolicy::Error => return Err(GifError::UnknownBlock { tag, offset }),
            },
        }
    }
}

fn read_logical_screen(reader: &mut ByteReader<'_>) -> Result<LogicalScreen, GifError> {
    reader.require(layout::SCREEN_DESCRIPTOR_LEN)?;
    let width = reader.read_u16_le()?;
    let height = reader.read_u16_le()?;
    let packed = reader.read_u8()?;
    let background_index = reader.read_u8()?;
    let _pixel_aspect = reader.read_u8()?;
    let global_color_table = read_color_table(reader, packed)?;
    Ok(LogicalScreen {
        width,
        height,
        global_color_table,
        background_index,
    })
}

fn read_color_table(reader: &mut ByteReader<'_>, packed: u8) -> Result<Option<ColorTable>, GifError> {
    if packed & layout::COLOR_TABLE_PRESENT == 0 {
        return Ok(None);
    }
    let entries = reader.read_rgb_triples(layout::color_table_entries(packed))?;
    Ok(Some(ColorTable::new(entries)))
}

/// Returns the graphics control for a `0xF9` extension; every other
/// extension is skipped.
fn read_extension(reader: &mut ByteReader<'_>) -> Result<Option<GraphicsControl>, GifError> {
    let label = reader.read_u8()?;
    if label != layout::EXT_GRAPHICS_CONTROL {
        debug!(label, "skipping extension");
        reader.skip_sub_blocks()?;
        return Ok(None);
    }

    // Advance by the declared size; trailing sub-blocks are skipped up to
    // the terminator.
    let size = reader.read_u8()? as usize;
    let body = reader.read_slice(size)?;
    reader.skip_sub_blocks()?;

    let byte = |i: usize| body.get(i).copied().unwrap_or(0);
    let packed = byte(0);
    let delay_cs = u16::from_le_bytes([byte(1), byte(2)]);
    let transparent_index =
        (packed & layout::TRANSPARENT_FLAG != 0 && body.len() > 3).then(|| byte(3));
    let disposal =
        DisposalMethod::from_wire((packed >> layout::DISPOSAL_SHIFT) & layout::DISPOSAL_MASK);

    Ok(Some(GraphicsControl {
        disposal,
        transparent_index,
        delay_cs,
    }))
}

fn read_image_block(
    reader: &mut ByteReader<'_>,
    control: Option<GraphicsControl>,
) -> Result<ImageBlock, GifError> {
    let left = reader.read_u16_le()?;
    let top = reader.read_u16_le()?;
    let width = reader.read_u16_le()?;
    let height = reader.read_u16_le()?;
    let packed = reader.read_u8()?;
    let local_color_table = read_color_table(reader, packed)?;
    let min_code_size = reader.read_u8()?;
    let data = reader.read_sub_blocks()?;

    Ok(ImageBlock {
        left,
        top,
        width,
        height,
        interlaced: packed & layout::INTERLACED != 0,
        local_color_table,
        control,
        min_code_size,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::parse_gif;
    use crate::config::UnknownBlockPolicy;
    use crate::gif::error::GifError;
    use crate::gif::frame::DisposalMethod;

    fn header(width: u16, height: u16) -> Vec<u8> {
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        // global table of 2 entries: black, white
        data.extend_from_slice(&[0x80, 0, 0]);
        data.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        data
    }

    fn control(packed: u8, delay: u16, transparent: u8) -> Vec<u8> {
        let mut data = vec![0x21, 0xf9, 4, packed];
        data.extend_from_slice(&delay.to_le_bytes());
        data.extend_from_slice(&[transparent, 0]);
        data
    }

    fn image(left: u16, top: u16, flags: u8) -> Vec<u8> {
        let mut data = vec![0x2c];
        for value in [left, top, 1, 1] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.push(flags);
        if flags & 0x80 != 0 {
            data.extend_from_slice(&[10, 20, 30, 40, 50, 60]);
        }
        // min code size 2: clear, 1, end
        data.extend_from_slice(&[2, 2, 0x4c, 0x01, 0]);
        data
    }

    fn parse(data: &[u8]) -> super::ParsedGif {
        parse_gif(data, UnknownBlockPolicy::Stop).unwrap()
    }

    #[test]
    fn rejects_non_gif_signature() {
        let err = parse_gif(b"\x89PNG\r\n", UnknownBlockPolicy::Stop).unwrap_err();
        assert_eq!(err, GifError::InvalidSignature { found: *b"\x89PN" });
    }

    #[test]
    fn rejects_buffer_shorter_than_signature() {
        let err = parse_gif(b"GI", UnknownBlockPolicy::Stop).unwrap_err();
        assert!(matches!(err, GifError::InvalidSignature { .. }));
    }

    #[test]
    fn header_and_trailer_yield_no_blocks() {
        let mut data = header(4, 3);
        data.push(0x3b);
        let gif = parse(&data);
        assert_eq!(gif.screen.width, 4);
        assert_eq!(gif.screen.height, 3);
        assert_eq!(gif.screen.global_color_table.as_ref().unwrap().len(), 2);
        assert!(gif.blocks.is_empty());
        assert!(!gif.truncated);
    }

    #[test]
    fn truncated_screen_descriptor_is_not_an_error() {
        let gif = parse(b"GIF89a\x04\x00");
        assert!(gif.blocks.is_empty());
        assert!(gif.truncated);
    }

    #[test]
    fn control_attaches_to_next_image_only() {
        let mut data = header(2, 2);
        data.extend(control(0b0000_1001, 7, 1));
        data.extend(image(0, 0, 0));
        data.extend(image(1, 1, 0));
        data.push(0x3b);

        let gif = parse(&data);
        assert_eq!(gif.blocks.len(), 2);
        let first = gif.blocks[0].control.unwrap();
        assert_eq!(first.disposal, DisposalMethod::RestoreBackground);
        assert_eq!(first.transparent_index, Some(1));
        assert_eq!(first.delay_cs, 7);
        assert!(gif.blocks[1].control.is_none());
        assert_eq!((gif.blocks[1].left, gif.blocks[1].top), (1, 1));
    }

    #[test]
    fn transparent_index_requires_flag() {
        let mut data = header(1, 1);
        data.extend(control(0b0000_0100, 0, 1));
        data.extend(image(0, 0, 0));
        let gif = parse(&data);
        let control = gif.blocks[0].control.unwrap();
        assert_eq!(control.disposal, DisposalMethod::DoNotDispose);
        assert_eq!(control.transparent_index, None);
    }

    #[test]
    fn dangling_control_is_dropped() {
        let mut data = header(1, 1);
        data.extend(control(0, 5, 0));
        data.push(0x3b);
        let gif = parse(&data);
        assert!(gif.blocks.is_empty());
        assert!(!gif.truncated);
    }

    #[test]
    fn control_advances_by_declared_size() {
        let mut data = header(1, 1);
        // declared size 6 with two padding bytes, then a padding sub-block
        data.extend_from_slice(&[0x21, 0xf9, 6, 0x01, 3, 0, 0, 0xaa, 0xbb, 1, 0xcc, 0]);
        data.extend(image(0, 0, 0));
        data.push(0x3b);
        let gif = parse(&data);
        assert_eq!(gif.blocks.len(), 1);
        let control = gif.blocks[0].control.unwrap();
        assert_eq!(control.delay_cs, 3);
        assert_eq!(control.transparent_index, Some(0));
    }

    #[test]
    fn other_extensions_are_skipped() {
        let mut data = header(1, 1);
        data.extend_from_slice(&[0x21, 0xff, 11]);
        data.extend_from_slice(b"NETSCAPE2.0");
        data.extend_from_slice(&[3, 1, 0, 0, 0]);
        data.extend_from_slice(&[0x21, 0xfe, 2, b'h', b'i', 0]);
        data.extend(image(0, 0, 0));
        data.push(0x3b);
        let gif = parse(&data);
        assert_eq!(gif.blocks.len(), 1);
        assert!(gif.blocks[0].control.is_none());
    }

    #[test]
    fn local_table_and_interlace_flags() {
        let mut data = header(1, 1);
        data.extend(image(0, 0, 0b1100_0000));
        data.push(0x3b);
        let gif = parse(&data);
        let block = &gif.blocks[0];
        assert!(block.interlaced);
        let table = block.local_color_table.as_ref().unwrap();
        assert_eq!(table.get(1), Some([40, 50, 60]));
        assert_eq!(block.min_code_size, 2);
        assert_eq!(block.data, vec![0x4c, 0x01]);
    }

    #[test]
    fn unknown_tag_stops_with_frames_so_far() {
        let mut data = header(1, 1);
        data.extend(image(0, 0, 0));
        data.extend_from_slice(&[0x00, 0x2c]);
        let gif = parse(&data);
        assert_eq!(gif.blocks.len(), 1);
        assert!(gif.truncated);
    }

    #[test]
    fn unknown_tag_fails_under_error_policy() {
        let mut data = header(1, 1);
        let offset = data.len();
        data.push(0x99);
        let err = parse_gif(&data, UnknownBlockPolicy::Error).unwrap_err();
        assert_eq!(err, GifError::UnknownBlock { tag: 0x99, offset });
    }

    #[test]
    fn truncated_image_data_drops_incomplete_frame() {
        let mut data = header(1, 1);
        data.extend(image(0, 0, 0));
        let mut partial = image(0, 0, 0);
        partial.truncate(partial.len() - 2);
        data.extend(partial);
        let gif = parse(&data);
        assert_eq!(gif.blocks.len(), 1);
        assert!(gif.truncated);
    }

    #[test]
    fn missing_trailer_keeps_frames() {
        let mut data = header(1, 1);
        data.extend(image(0, 0, 0));
        let gif = parse(&data);
        assert_eq!(gif.blocks.len(), 1);
        assert!(gif.truncated);
    }
}
