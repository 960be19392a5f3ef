use pdf_engine::{PdfEngineError, RenderError};
use std::io;
use viewer_core::RenderState;

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("no document is open")]
    NoDocument,
    #[error("page {0} is not loaded")]
    PageNotLoaded(u32),
    #[error("page {0} has no render context attached")]
    MissingContext(u32),
    #[error("page {page} is {actual}, expected {expected}")]
    InvalidState { page: u32, expected: RenderState, actual: RenderState },
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("invalid scale {0}")]
    InvalidScale(f32),
    #[error("page {page} failed to render: {source}")]
    Render {
        page: u32,
        #[source]
        source: RenderError,
    },
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("configuration encode error: {0}")]
    Encode(#[from] toml::ser::Error),
}
