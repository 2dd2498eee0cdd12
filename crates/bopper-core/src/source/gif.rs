use crate::config::DecodeOptions;
use crate::gif::decode_animation;
use crate::gif::frame::Animation;

use super::{FrameSource, SourceError};

/// Frame source backed by the built-in decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct GifFrameSource {
    options: DecodeOptions,
}

impl GifFrameSource {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }
}

impl FrameSource for GifFrameSource {
    fn name(&self) -> &'static str {
        "core"
    }

    fn extract_frames(&self, buffer: &[u8]) -> Result<Animation, SourceError> {
        Ok(decode_animation(buffer, &self.options)?)
    }
}
