//! Per-page render state machine.
//!
//! ```text
//! initial ──render──▶ rendering ──complete/fail──▶ finished
//!                      │    ▲
//!                 yield│    │resume
//!                      ▼    │
//!                     paused
//! ```
//!
//! `reset` returns any state to `initial`. A page owns its backing surface
//! and at most one render task; the page source is shared with the document.

use crate::config::DEFAULT_MAX_CANVAS_PIXELS;
use crate::error::{Result, ViewerError};
use crate::text_layer::TextLayer;
use pdf_engine::{
    Continuation, PageViewport, PdfPage, RenderError, RenderParams, RenderTask, Surface, TaskPoll,
};
use pdfview_scheduler::Renderable;
use std::fmt;
use std::rc::Rc;
use viewer_core::{OutputScale, RenderState};

/// What a page needs from its viewer before it can render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub device_pixel_ratio: f64,
    /// 0 disables the surface budget
    pub max_canvas_pixels: u64,
    /// A scheduler drives the page, so yielded renders continue immediately
    /// instead of pausing until `resume`.
    pub scheduled: bool,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
            scheduled: false,
        }
    }
}

/// Identifies one started render of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTicket {
    pub page: u32,
    pub generation: u64,
}

/// Result of driving the current render once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderProgress {
    /// No render task
    Idle,
    Pending,
    /// Waiting for `resume`
    Paused,
    Finished,
    /// The task reported cancellation; state is left for the caller to reset
    Cancelled,
}

pub type FinishCallback = Box<dyn FnOnce(&PageView)>;

pub struct PageView {
    id: u32,
    scale: f32,
    source: Option<Rc<dyn PdfPage>>,
    context: Option<RenderContext>,
    state: RenderState,
    surface: Option<Surface>,
    surface_scale: Option<f32>,
    task: Option<Box<dyn RenderTask>>,
    resume: Option<Continuation>,
    generation: u64,
    active: Option<u64>,
    on_finished: Option<FinishCallback>,
    render_error: Option<RenderError>,
    text_layer: Option<Box<dyn TextLayer>>,
    text_layer_pending: bool,
}

impl PageView {
    pub fn new(id: u32, scale: f32) -> Self {
        Self {
            id,
            scale,
            source: None,
            context: None,
            state: RenderState::Initial,
            surface: None,
            surface_scale: None,
            task: None,
            resume: None,
            generation: 0,
            active: None,
            on_finished: None,
            render_error: None,
            text_layer: None,
            text_layer_pending: false,
        }
    }

    pub fn with_source(mut self, source: Rc<dyn PdfPage>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_context(mut self, context: RenderContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_text_layer(mut self, layer: Box<dyn TextLayer>) -> Self {
        self.text_layer = Some(layer);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn take_surface(&mut self) -> Option<Surface> {
        self.surface_scale = None;
        self.surface.take()
    }

    /// The failure recorded by the last render, if any.
    pub fn render_error(&self) -> Option<&RenderError> {
        self.render_error.as_ref()
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    /// Page box at the current scale, `None` before the source is loaded.
    pub fn viewport(&self) -> Option<PageViewport> {
        self.source.as_ref().map(|source| source.viewport(self.scale))
    }

    /// Height of the page box in CSS pixels.
    pub fn css_height(&self) -> f32 {
        self.viewport().map_or(0.0, |viewport| viewport.height)
    }

    /// Factor the kept surface must be stretched by to match the current
    /// scale, when its pixels were drawn at another scale.
    pub fn css_rescale(&self) -> Option<f32> {
        let drawn_at = self.surface.as_ref().and(self.surface_scale)?;
        let ratio = self.scale / drawn_at;
        (ratio != 1.0).then_some(ratio)
    }

    /// Start rendering at the current scale.
    ///
    /// A page that is not `initial` is reset first, releasing its surface.
    /// Fails without leaving `initial` when the source or the render context
    /// is missing.
    pub fn render(&mut self, on_finished: Option<FinishCallback>) -> Result<RenderTicket> {
        if self.state != RenderState::Initial {
            self.reset(false);
        }

        let source = self.source.clone().ok_or(ViewerError::PageNotLoaded(self.id))?;
        let context = self.context.ok_or(ViewerError::MissingContext(self.id))?;

        let viewport = source.viewport(self.scale);
        let (width, height) = (f64::from(viewport.width), f64::from(viewport.height));

        let mut output = OutputScale::new(context.device_pixel_ratio);
        if output.limit_to_budget(width, height, context.max_canvas_pixels) {
            tracing::debug!(page = self.id, sx = output.sx, "output scale limited by pixel budget");
        }
        let size = output.surface_size(width, height);

        match self.surface.as_mut() {
            Some(surface) if surface.width() == size.width && surface.height() == size.height => {
                surface.set_css_size(size.css_width, size.css_height);
            }
            _ => {
                self.surface =
                    Some(Surface::new(size.width, size.height, size.css_width, size.css_height));
                self.surface_scale = None;
            }
        }

        self.generation += 1;
        self.active = Some(self.generation);
        self.state = RenderState::Rendering;
        self.render_error = None;
        self.on_finished = on_finished;
        self.task = Some(source.render(RenderParams { viewport, transform: output.transform() }));

        tracing::debug!(
            page = self.id,
            generation = self.generation,
            width = size.width,
            height = size.height,
            "page render started"
        );

        Ok(RenderTicket { page: self.id, generation: self.generation })
    }

    /// Drive the current render task by one poll.
    ///
    /// A genuine render failure is returned exactly once, after the page has
    /// moved to `finished` and its completion callback has run.
    pub fn poll_render(&mut self) -> Result<RenderProgress> {
        if self.state == RenderState::Paused {
            return Ok(RenderProgress::Paused);
        }

        let (Some(task), Some(surface)) = (self.task.as_mut(), self.surface.as_mut()) else {
            return Ok(RenderProgress::Idle);
        };

        match task.poll(surface) {
            TaskPoll::Pending => {
                tracing::trace!(page = self.id, "render pending");
                Ok(RenderProgress::Pending)
            }
            TaskPoll::Yield(resume) => {
                if self.context.is_some_and(|context| context.scheduled) {
                    resume();
                    return Ok(RenderProgress::Pending);
                }

                tracing::debug!(page = self.id, "render paused");
                self.state = RenderState::Paused;
                self.resume = Some(resume);
                Ok(RenderProgress::Paused)
            }
            TaskPoll::Complete => {
                self.finish(None);
                Ok(RenderProgress::Finished)
            }
            TaskPoll::Failed(error) if error.is_cancelled() => {
                tracing::debug!(page = self.id, "render cancelled by the engine");
                self.task = None;
                self.reset(false);
                Ok(RenderProgress::Cancelled)
            }
            TaskPoll::Failed(error) => {
                tracing::warn!(page = self.id, %error, "page render failed");
                self.finish(Some(error.clone()));
                Err(ViewerError::Render { page: self.id, source: error })
            }
        }
    }

    fn finish(&mut self, error: Option<RenderError>) {
        self.task = None;
        self.active = None;
        self.resume = None;
        self.state = RenderState::Finished;
        self.surface_scale = Some(self.scale);
        self.render_error = error;
        self.text_layer_pending = self.text_layer.is_some();

        tracing::debug!(page = self.id, generation = self.generation, "page render finished");

        if let Some(callback) = self.on_finished.take() {
            callback(self);
        }
    }

    /// Continue a paused render.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != RenderState::Paused {
            return Err(ViewerError::InvalidState {
                page: self.id,
                expected: RenderState::Paused,
                actual: self.state,
            });
        }

        self.state = RenderState::Rendering;
        if let Some(resume) = self.resume.take() {
            resume();
        }
        Ok(())
    }

    /// Cancel the active task, if any. The render state is left untouched;
    /// follow with [`reset`](Self::reset).
    pub fn cancel_render(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
            tracing::debug!(page = self.id, generation = self.generation, "render cancelled");
        }

        self.resume = None;
        self.active = None;
        self.on_finished = None;
    }

    /// Back to `initial`, cancelling any active task. The surface survives
    /// only with `keep_surface`.
    pub fn reset(&mut self, keep_surface: bool) {
        self.cancel_render();
        self.state = RenderState::Initial;

        if !keep_surface {
            self.surface = None;
            self.surface_scale = None;
            self.text_layer_pending = false;
            if let Some(layer) = self.text_layer.as_mut() {
                layer.cancel();
            }
        }
    }

    /// Apply a new scale. Returns whether it changed.
    ///
    /// A finished page keeps its surface for CSS-only stretching until it
    /// renders again; any other page drops its render entirely.
    pub fn set_scale(&mut self, scale: f32) -> bool {
        if scale == self.scale {
            return false;
        }

        let keep_surface = matches!(self.state, RenderState::Finished | RenderState::Initial);
        self.scale = scale;
        self.reset(keep_surface);
        true
    }

    /// Release the surface and the engine's page caches. The page keeps its
    /// identity and source and renders again on demand.
    pub fn destroy(&mut self) {
        self.reset(false);
        if let Some(source) = &self.source {
            source.cleanup();
        }
        tracing::debug!(page = self.id, "page destroyed");
    }

    /// Render the companion layer if the last render finished since the
    /// previous flush. Returns whether a layer rendered.
    pub fn flush_text_layer(&mut self) -> bool {
        if !std::mem::take(&mut self.text_layer_pending) {
            return false;
        }

        let Some(viewport) = self.viewport() else {
            return false;
        };
        match self.text_layer.as_mut() {
            Some(layer) => {
                layer.render(self.id, viewport);
                true
            }
            None => false,
        }
    }
}

impl Renderable for PageView {
    type Ticket = RenderTicket;
    type Error = ViewerError;

    fn id(&self) -> u32 {
        self.id
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn start_render(&mut self) -> Result<RenderTicket> {
        self.render(None)
    }

    fn resume(&mut self) -> Result<()> {
        PageView::resume(self)
    }

    fn is_settled(&self, ticket: RenderTicket) -> bool {
        ticket.page != self.id
            || self.active != Some(ticket.generation)
            || !self.state.is_in_flight()
    }
}

impl fmt::Debug for PageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageView")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("scale", &self.scale)
            .field("generation", &self.generation)
            .field("has_task", &self.task.is_some())
            .field("surface", &self.surface.as_ref().map(|s| (s.width(), s.height())))
            .finish_non_exhaustive()
    }
}
