//! Render error types.

use thiserror::Error;

/// Document rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("layout error: {0}")]
    Layout(String),

    #[error("document too large: {pages} pages (max: {max})")]
    TooLarge { pages: usize, max: usize },

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<RenderError> for lodge_core::Error {
    fn from(err: RenderError) -> Self {
        lodge_core::Error::RenderFailed(err.to_string())
    }
}

/// Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
