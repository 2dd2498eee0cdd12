use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageDecoder};
use tracing::{debug, warn};

use crate::gif::frame::{Animation, CompositedFrame};
use crate::gif::parser::check_signature;

use super::{FrameSource, SourceError};

/// Frame source backed by the `image` crate's GIF decoder.
///
/// Disposal and transparency follow that decoder's rules, which match
/// `DecodeOptions { previous_disposal: Restore, .. }` of the core decoder.
/// Error handling matches the core decoder: a bad signature is the only
/// failure, and data that breaks off mid-stream keeps the frames decoded
/// before the break.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateSource;

impl ImageCrateSource {
    pub fn new() -> Self {
        Self
    }
}

fn dimension(value: u32) -> Result<u16, SourceError> {
    u16::try_from(value)
        .map_err(|_| SourceError::Backend(format!("dimension {value} exceeds 65535")))
}

impl FrameSource for ImageCrateSource {
    fn name(&self) -> &'static str {
        "image"
    }

    fn extract_frames(&self, buffer: &[u8]) -> Result<Animation, SourceError> {
        check_signature(buffer)?;

        let decoder = match GifDecoder::new(Cursor::new(buffer)) {
            Ok(decoder) => decoder,
            Err(err) => {
                warn!(error = %err, "GIF header unreadable, no frames");
                return Ok(Animation::default());
            }
        };
        let (width, height) = decoder.dimensions();
        let (width, height) = (dimension(width)?, dimension(height)?);

        let mut frames = Vec::new();
        for frame in decoder.into_frames() {
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(
                        error = %err,
                        frames = frames.len(),
                        "GIF data broke off, keeping complete frames"
                    );
                    break;
                }
            };
            let buffer = frame.into_buffer();
            let (w, h) = buffer.dimensions();
            let composited =
                CompositedFrame::from_rgba(dimension(w)?, dimension(h)?, buffer.into_raw())
                    .ok_or_else(|| SourceError::Backend("frame buffer size mismatch".to_string()))?;
            frames.push(composited);
        }

        debug!(frames = frames.len(), "image backend decoded");
        Ok(Animation {
            width,
            height,
            frames,
        })
    }
}
