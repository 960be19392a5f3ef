use serde::Serialize;
use viewer_core::ViewMode;

/// Notification queued for the host UI, drained with
/// [`PdfViewer::drain_events`](crate::PdfViewer::drain_events).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ViewerEvent {
    DocumentOpened { name: String, page_count: u32 },
    DocumentClosed,
    CurrentPageChanged { page: u32 },
    ScaleChanged { scale: f32 },
    ModeChanged { mode: ViewMode },
    /// The host should scroll its container to `top` and report back through
    /// `on_scroll`.
    ScrollRequested { top: f32 },
    PageRendered { page: u32 },
    PageEvicted { page: u32 },
    RenderFailed { page: u32, message: String },
}
