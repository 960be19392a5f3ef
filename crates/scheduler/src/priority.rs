//! Render priority classes
//!
//! Candidates handed to the queue carry the class they were selected for, so
//! callers and logs can tell on-screen work from speculative work.

/// Why a page is a render candidate
///
/// Ordered so that `Visible` compares greater than `PreRender`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPriority {
    /// Neighbour of the visible set, rendered ahead of scrolling
    PreRender = 0,

    /// On screen, must render first
    Visible = 1,
}

/// A page waiting in the render queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Page number (1-based)
    pub page: u32,

    /// Class the page was scheduled under
    pub priority: RenderPriority,
}

impl Candidate {
    pub fn visible(page: u32) -> Self {
        Self { page, priority: RenderPriority::Visible }
    }

    pub fn pre_render(page: u32) -> Self {
        Self { page, priority: RenderPriority::PreRender }
    }
}
