//! Virtualized, incrementally rendering document viewer.
//!
//! [`PdfViewer`] keeps one [`PageView`] per page but only renders the pages
//! the viewport shows plus their immediate neighbours. Finished pages enter a
//! bounded view buffer; the least recently used one loses its surface when the
//! buffer overflows and renders again on demand.
//!
//! Nothing here blocks. The host reports viewport changes (`on_scroll`,
//! `resize`, navigation) and calls [`PdfViewer::pump`] from its event loop to
//! move renders forward.

mod config;
mod error;
mod events;
mod page_view;
mod text_layer;
mod viewer;

pub use config::{
    ViewerConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_CANVAS_PIXELS, DEFAULT_PAGE_GAP,
};
pub use error::{ConfigError, Result, ViewerError};
pub use events::ViewerEvent;
pub use page_view::{FinishCallback, PageView, RenderContext, RenderProgress, RenderTicket};
pub use text_layer::{TextLayer, TextLayerFactory};
pub use viewer::PdfViewer;

pub use viewer_core::{RenderState, ViewMode, VisibilityResult, VisiblePage};
