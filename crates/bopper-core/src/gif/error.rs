use thiserror::Error;

/// Errors returned by GIF container parsing.
///
/// Only `InvalidSignature` is fatal for a decode. `TooShort` is used
/// internally to unwind from a truncated block; the parser turns it into a
/// partial result. `UnknownBlock` is surfaced only under
/// `UnknownBlockPolicy::Error`.
///
/// # Examples
/// ```
/// use bopper_core::GifError;
///
/// let err = GifError::InvalidSignature { found: *b"PNG" };
/// assert!(err.to_string().contains("invalid GIF signature"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GifError {
    #[error("invalid GIF signature: {found:02x?}")]
    InvalidSignature { found: [u8; 3] },
    #[error("data too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("unknown block tag 0x{tag:02x} at offset {offset}")]
    UnknownBlock { tag: u8, offset: usize },
}
