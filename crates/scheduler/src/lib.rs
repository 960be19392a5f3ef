//! PDF Viewer Scheduler Library
//!
//! Serializes page render activation for a batch of candidate pages.
//!
//! Candidates are processed strictly in order (visible pages first, then
//! pre-render pages). A finished page is skipped, a paused page is resumed, a
//! page already rendering is left alone and a page in its initial state is
//! started; the queue then waits for that render to settle before moving on.
//! Pages are reached through the [`Renderable`] trait so the queue never owns
//! or relocates them.
//!
//! # Example
//!
//! ```
//! use pdfview_scheduler::{QueueEvent, RenderQueue, Renderable};
//! use viewer_core::RenderState;
//!
//! struct Page {
//!     id: u32,
//!     state: RenderState,
//! }
//!
//! impl Renderable for Page {
//!     type Ticket = u32;
//!     type Error = String;
//!
//!     fn id(&self) -> u32 {
//!         self.id
//!     }
//!
//!     fn render_state(&self) -> RenderState {
//!         self.state
//!     }
//!
//!     fn start_render(&mut self) -> Result<u32, String> {
//!         self.state = RenderState::Rendering;
//!         Ok(self.id)
//!     }
//!
//!     fn resume(&mut self) -> Result<(), String> {
//!         self.state = RenderState::Rendering;
//!         Ok(())
//!     }
//!
//!     fn is_settled(&self, _ticket: u32) -> bool {
//!         self.state != RenderState::Rendering
//!     }
//! }
//!
//! let mut pages = vec![
//!     Page { id: 1, state: RenderState::Initial },
//!     Page { id: 2, state: RenderState::Initial },
//! ];
//!
//! let mut queue = RenderQueue::new();
//! queue.schedule(&[1], &[2]);
//!
//! // Page 1 starts and the queue waits for it.
//! let events = queue.advance(&mut pages);
//! assert!(matches!(events.as_slice(), [QueueEvent::Started { page: 1, .. }]));
//!
//! // Once page 1 settles the pre-render candidate starts.
//! pages[0].state = RenderState::Finished;
//! let events = queue.advance(&mut pages);
//! assert!(matches!(events.last(), Some(QueueEvent::Started { page: 2, .. })));
//! ```

mod priority;
mod renderable;
mod scheduler;

// Re-export public API
pub use priority::{Candidate, RenderPriority};
pub use renderable::Renderable;
pub use scheduler::{QueueEvent, RenderQueue, SchedulerStats};
