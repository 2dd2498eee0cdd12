//! Frame compositing onto a running logical-screen canvas.
//!
//! The canvas starts fully transparent and lives for one `composite` call.
//! Each frame applies the disposal left behind by the previous frame, draws
//! its indices at its offset, and is snapshotted as an independent copy.

use tracing::{debug, warn};

use super::frame::{CompositedFrame, DisposalMethod, RawFrame};
use super::layout;
use crate::config::{DecodeOptions, PreviousDisposal, TransparencyMode};

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Destination row for each source row of an interlaced image.
///
/// # Examples
/// ```
/// use bopper_core::interlace_rows;
///
/// assert_eq!(interlace_rows(8), vec![0, 4, 2, 6, 1, 3, 5, 7]);
/// ```
pub fn interlace_rows(height: usize) -> Vec<usize> {
    let mut rows = Vec::with_capacity(height);
    for (start, step) in layout::INTERLACE_PASSES {
        rows.extend((start..height).step_by(step));
    }
    rows
}

#[derive(Debug, Clone, Copy)]
struct Region {
    left: usize,
    top: usize,
    width: usize,
    height: usize,
}

impl Region {
    fn of(frame: &RawFrame) -> Self {
        Self {
            left: frame.left as usize,
            top: frame.top as usize,
            width: frame.width as usize,
            height: frame.height as usize,
        }
    }
}

/// Disposal owed by the previously drawn frame.
enum Pending {
    Background(Region),
    Previous(Vec<u8>),
}

struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u16, height: u16) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            pixels: vec![0; width * height * layout::RGBA_CHANNELS],
        }
    }

    fn put(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y * self.width + x) * layout::RGBA_CHANNELS;
        self.pixels[offset..offset + layout::RGBA_CHANNELS].copy_from_slice(&rgba);
    }

    fn clear(&mut self, region: Region) {
        let right = (region.left + region.width).min(self.width);
        let bottom = (region.top + region.height).min(self.height);
        for y in region.top.min(bottom)..bottom {
            for x in region.left.min(right)..right {
                self.put(x, y, TRANSPARENT);
            }
        }
    }

    fn draw(&mut self, frame: &RawFrame, transparency: TransparencyMode) {
        let width = frame.width as usize;
        let count = frame.indices.len().min(frame.pixel_count());
        if count < frame.pixel_count() {
            debug!(
                decoded = frame.indices.len(),
                expected = frame.pixel_count(),
                "frame index stream shorter than frame"
            );
        }
        let rows = frame
            .interlaced
            .then(|| interlace_rows(frame.height as usize));
        let transparent = frame.transparent_index();
        let table = frame.color_table.as_ref();

        for (i, &index) in frame.indices[..count].iter().enumerate() {
            let source_row = i / width;
            let row = rows.as_ref().map_or(source_row, |rows| rows[source_row]);
            let x = frame.left as usize + i % width;
            let y = frame.top as usize + row;

            if transparent == Some(index) {
                if transparency == TransparencyMode::Clear {
                    self.put(x, y, TRANSPARENT);
                }
                continue;
            }
            if let Some([r, g, b]) = table.and_then(|table| table.get(index)) {
                self.put(x, y, [r, g, b, 0xFF]);
            }
        }
    }

    fn snapshot(&self, width: u16, height: u16) -> CompositedFrame {
        CompositedFrame::from_canvas(width, height, self.pixels.clone())
    }
}

/// Composite decoded frames in order, one snapshot per input frame.
pub fn composite(
    width: u16,
    height: u16,
    frames: &[RawFrame],
    options: &DecodeOptions,
) -> Vec<CompositedFrame> {
    let mut canvas = Canvas::new(width, height);
    let mut pending: Option<Pending> = None;
    let mut output = Vec::with_capacity(frames.len());

    for (index, frame) in frames.iter().enumerate() {
        match pending.take() {
            Some(Pending::Background(region)) => canvas.clear(region),
            Some(Pending::Previous(saved)) => canvas.pixels = saved,
            None => {}
        }

        if frame.color_table.is_none() {
            warn!(index, "frame has no color table, only transparency is applied");
        }

        let restore_previous = frame.disposal() == DisposalMethod::RestorePrevious
            && options.previous_disposal == PreviousDisposal::Restore;
        let saved = restore_previous.then(|| canvas.pixels.clone());

        canvas.draw(frame, options.transparency);
        output.push(canvas.snapshot(width, height));

        pending = match frame.disposal() {
            DisposalMethod::RestoreBackground => Some(Pending::Background(Region::of(frame))),
            DisposalMethod::RestorePrevious => saved.map(Pending::Previous),
            DisposalMethod::None | DisposalMethod::DoNotDispose => None,
        };
    }

    output
}

#[cfg(test)]
mod tests {
    use super::{composite, interlace_rows};
    use crate::config::{DecodeOptions, PreviousDisposal, TransparencyMode};
    use crate::gif::frame::{ColorTable, DisposalMethod, GraphicsControl, RawFrame};

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    fn table() -> ColorTable {
        ColorTable::new(vec![[255, 0, 0], [0, 255, 0], [0, 0, 255], [9, 9, 9]])
    }

    fn frame(left: u16, top: u16, width: u16, height: u16, indices: Vec<u8>) -> RawFrame {
        RawFrame {
            left,
            top,
            width,
            height,
            color_table: Some(table()),
            has_local_color_table: false,
            interlaced: false,
            control: None,
            indices,
        }
    }

    fn with_control(mut frame: RawFrame, disposal: DisposalMethod, transparent: Option<u8>) -> RawFrame {
        frame.control = Some(GraphicsControl {
            disposal,
            transparent_index: transparent,
            delay_cs: 0,
        });
        frame
    }

    #[test]
    fn interlace_rows_for_small_heights() {
        assert_eq!(interlace_rows(1), vec![0]);
        assert_eq!(interlace_rows(3), vec![0, 2, 1]);
        assert_eq!(interlace_rows(8), vec![0, 4, 2, 6, 1, 3, 5, 7]);
        assert_eq!(interlace_rows(10).len(), 10);
    }

    #[test]
    fn single_frame_matches_color_lookup() {
        let frames = vec![frame(0, 0, 2, 2, vec![0, 1, 2, 0])];
        let out = composite(2, 2, &frames, &DecodeOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pixel(0, 0), Some(RED));
        assert_eq!(out[0].pixel(1, 0), Some(GREEN));
        assert_eq!(out[0].pixel(0, 1), Some(BLUE));
        assert_eq!(out[0].pixel(1, 1), Some(RED));
    }

    #[test]
    fn interlaced_rows_are_placed_by_pass() {
        // 1x8 frame: source row r carries index r % 3
        let mut f = frame(0, 0, 1, 8, (0..8).map(|r| (r % 3) as u8).collect());
        f.interlaced = true;
        let out = composite(1, 8, &[f], &DecodeOptions::default());
        let colors = [RED, GREEN, BLUE];
        for (source_row, dest_row) in [0, 4, 2, 6, 1, 3, 5, 7].into_iter().enumerate() {
            assert_eq!(out[0].pixel(0, dest_row), Some(colors[source_row % 3]));
        }
    }

    #[test]
    fn restore_background_clears_previous_region_before_next_frame() {
        let first = with_control(
            frame(0, 0, 2, 2, vec![0; 4]),
            DisposalMethod::RestoreBackground,
            None,
        );
        let second = frame(1, 1, 1, 1, vec![2]);
        let out = composite(2, 2, &[first, second], &DecodeOptions::default());
        assert_eq!(out[0].pixel(0, 0), Some(RED));
        assert_eq!(out[1].pixel(0, 0), Some(CLEAR));
        assert_eq!(out[1].pixel(1, 0), Some(CLEAR));
        assert_eq!(out[1].pixel(1, 1), Some(BLUE));
    }

    #[test]
    fn restore_background_on_current_frame_does_not_clear_before_it() {
        let first = frame(0, 0, 2, 1, vec![0, 0]);
        let second = with_control(frame(1, 0, 1, 1, vec![1]), DisposalMethod::RestoreBackground, None);
        let out = composite(2, 1, &[first, second], &DecodeOptions::default());
        assert_eq!(out[1].pixel(0, 0), Some(RED));
        assert_eq!(out[1].pixel(1, 0), Some(GREEN));
    }

    #[test]
    fn restore_previous_keeps_canvas_by_default() {
        let base = frame(0, 0, 1, 1, vec![0]);
        let overlay = with_control(frame(0, 0, 1, 1, vec![1]), DisposalMethod::RestorePrevious, None);
        let next = frame(0, 0, 0, 0, vec![]);
        let out = composite(1, 1, &[base, overlay, next], &DecodeOptions::default());
        assert_eq!(out[2].pixel(0, 0), Some(GREEN));
    }

    #[test]
    fn restore_previous_restores_snapshot_when_configured() {
        let base = frame(0, 0, 1, 1, vec![0]);
        let overlay = with_control(frame(0, 0, 1, 1, vec![1]), DisposalMethod::RestorePrevious, None);
        let next = frame(0, 0, 0, 0, vec![]);
        let options = DecodeOptions {
            previous_disposal: PreviousDisposal::Restore,
            ..DecodeOptions::default()
        };
        let out = composite(1, 1, &[base, overlay, next], &options);
        assert_eq!(out[1].pixel(0, 0), Some(GREEN));
        assert_eq!(out[2].pixel(0, 0), Some(RED));
    }

    #[test]
    fn transparent_index_shows_through_by_default() {
        let base = frame(0, 0, 2, 1, vec![0, 0]);
        let top = with_control(frame(0, 0, 2, 1, vec![3, 1]), DisposalMethod::None, Some(3));
        let out = composite(2, 1, &[base.clone(), top.clone()], &DecodeOptions::default());
        assert_eq!(out[1].pixel(0, 0), Some(RED));
        assert_eq!(out[1].pixel(1, 0), Some(GREEN));

        let options = DecodeOptions {
            transparency: TransparencyMode::Clear,
            ..DecodeOptions::default()
        };
        let out = composite(2, 1, &[base, top], &options);
        assert_eq!(out[1].pixel(0, 0), Some(CLEAR));
        assert_eq!(out[1].pixel(1, 0), Some(GREEN));
    }

    #[test]
    fn index_without_table_entry_is_skipped() {
        let base = frame(0, 0, 1, 1, vec![1]);
        let mut bad = frame(0, 0, 1, 1, vec![7]);
        bad.color_table = Some(ColorTable::new(vec![[1, 1, 1], [2, 2, 2]]));
        let mut missing = frame(0, 0, 1, 1, vec![0]);
        missing.color_table = None;
        let out = composite(1, 1, &[base, bad, missing], &DecodeOptions::default());
        assert_eq!(out[1].pixel(0, 0), Some(GREEN));
        assert_eq!(out[2].pixel(0, 0), Some(GREEN));
    }

    #[test]
    fn short_index_stream_leaves_rest_inherited() {
        let base = frame(0, 0, 2, 2, vec![0; 4]);
        let partial = frame(0, 0, 2, 2, vec![1, 1, 1]);
        let out = composite(2, 2, &[base, partial], &DecodeOptions::default());
        assert_eq!(out[1].pixel(0, 1), Some(GREEN));
        assert_eq!(out[1].pixel(1, 1), Some(RED));
    }

    #[test]
    fn pixels_outside_canvas_are_clipped() {
        let wide = frame(1, 1, 3, 1, vec![2, 2, 2]);
        let out = composite(2, 2, &[wide], &DecodeOptions::default());
        assert_eq!(out[0].pixel(1, 1), Some(BLUE));
        assert_eq!(out[0].opaque_pixels(), 1);
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let first = frame(0, 0, 1, 1, vec![0]);
        let second = frame(0, 0, 1, 1, vec![2]);
        let out = composite(1, 1, &[first, second], &DecodeOptions::default());
        assert_eq!(out[0].pixel(0, 0), Some(RED));
        assert_eq!(out[1].pixel(0, 0), Some(BLUE));
    }
}
