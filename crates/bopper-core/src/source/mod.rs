//! Frame sources.
//!
//! A `FrameSource` turns an encoded buffer into composited frames. The core
//! decoder is always available; an `image`-crate backed decoder can be
//! compiled in with the `image-backend` feature. All file I/O of the crate
//! lives here.

mod gif;
#[cfg(feature = "image-backend")]
mod image_crate;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DecodeOptions;
use crate::gif::error::GifError;
use crate::gif::frame::Animation;

pub use self::gif::GifFrameSource;
#[cfg(feature = "image-backend")]
pub use self::image_crate::ImageCrateSource;

pub trait FrameSource {
    /// Short backend identifier used in logs and reports.
    fn name(&self) -> &'static str;

    fn extract_frames(&self, buffer: &[u8]) -> Result<Animation, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GIF decode error: {0}")]
    Gif(#[from] GifError),
    #[error("no frames could be extracted")]
    NoFrames,
    #[error("decoder backend error: {0}")]
    Backend(String),
}

/// Which backend `select_frame_source` should hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePreference {
    /// The `image` backend when compiled in, else the core decoder.
    #[default]
    Auto,
    Core,
    Image,
}

/// Whether the `image` backend was compiled into this build.
pub const fn image_backend_available() -> bool {
    cfg!(feature = "image-backend")
}

/// Pick a backend once; callers keep the returned source for the session.
///
/// # Examples
/// ```
/// use bopper_core::{DecodeOptions, SourcePreference, select_frame_source};
///
/// let source = select_frame_source(SourcePreference::Core, DecodeOptions::default());
/// assert_eq!(source.name(), "core");
/// ```
pub fn select_frame_source(
    preference: SourcePreference,
    options: DecodeOptions,
) -> Box<dyn FrameSource> {
    let use_image = match preference {
        SourcePreference::Core => false,
        SourcePreference::Auto | SourcePreference::Image => image_backend_available(),
    };
    if preference == SourcePreference::Image && !use_image {
        info!("image backend not compiled in, using core decoder");
    }
    let source = build_source(use_image, options);
    debug!(backend = source.name(), "frame source selected");
    source
}

#[cfg(feature = "image-backend")]
fn build_source(use_image: bool, options: DecodeOptions) -> Box<dyn FrameSource> {
    if use_image {
        Box::new(ImageCrateSource::new())
    } else {
        Box::new(GifFrameSource::new(options))
    }
}

#[cfg(not(feature = "image-backend"))]
fn build_source(_use_image: bool, options: DecodeOptions) -> Box<dyn FrameSource> {
    Box::new(GifFrameSource::new(options))
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, SourceError> {
    Ok(fs::read(path)?)
}

/// Read a file and extract its frames; zero frames is an error so callers
/// can fall back to a placeholder.
pub fn load_frames(path: &Path, source: &dyn FrameSource) -> Result<Animation, SourceError> {
    let buffer = read_file(path)?;
    let animation = source.extract_frames(&buffer)?;
    if animation.is_empty() {
        return Err(SourceError::NoFrames);
    }
    debug!(
        path = %path.display(),
        backend = source.name(),
        frames = animation.len(),
        "frames loaded"
    );
    Ok(animation)
}
