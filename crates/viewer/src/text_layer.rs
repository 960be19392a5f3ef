//! Companion layer rendered once its page finishes.

use pdf_engine::PageViewport;

pub trait TextLayer {
    /// Called on the tick after the page's render completed.
    fn render(&mut self, page: u32, viewport: PageViewport);

    /// The page lost its surface; drop whatever was drawn.
    fn cancel(&mut self);
}

/// Builds the layer for a page number.
pub type TextLayerFactory = Box<dyn Fn(u32) -> Box<dyn TextLayer>>;
