//! Seam between the queue and the pages it drives

use viewer_core::RenderState;

/// A page the render queue can drive through its state machine
///
/// The queue only reads state and requests transitions; it never takes
/// ownership of a page.
pub trait Renderable {
    /// Handle identifying one started render
    type Ticket: Copy + std::fmt::Debug;

    /// Error raised when a transition is refused
    type Error: std::fmt::Display;

    /// Page number (1-based, stable)
    fn id(&self) -> u32;

    fn render_state(&self) -> RenderState;

    /// Start rendering a page in the `Initial` state
    fn start_render(&mut self) -> Result<Self::Ticket, Self::Error>;

    /// Continue a `Paused` render
    fn resume(&mut self) -> Result<(), Self::Error>;

    /// Whether the render identified by `ticket` has finished, failed, been
    /// cancelled or been superseded by a newer render
    fn is_settled(&self, ticket: Self::Ticket) -> bool;
}
