//! Viewer controller.
//!
//! Owns the ordered page list, the view buffer and the render queue. Every
//! viewport change runs [`PdfViewer::update`]; the host then drives renders
//! forward with [`PdfViewer::pump`] from its event loop.

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::events::ViewerEvent;
use crate::page_view::{PageView, RenderContext, RenderProgress};
use crate::text_layer::TextLayerFactory;
use pdf_engine::{DocumentEngine, OpenSource, PdfDocument};
use pdfview_cache::ViewBuffer;
use pdfview_scheduler::{QueueEvent, RenderQueue, SchedulerStats};
use std::collections::{BTreeSet, VecDeque};
use viewer_core::{
    layout_continuous, single_page_visibility, visible_pages, PageBox, ScrollWindow, ViewMode,
    VisibilityResult, FIRST_PAGE,
};

/// Scroll offsets closer than this count as "already there".
const SCROLL_TOLERANCE: f32 = 0.5;

pub struct PdfViewer {
    config: ViewerConfig,
    engine: Box<dyn DocumentEngine>,
    document: Option<Box<dyn PdfDocument>>,
    display_name: Option<String>,
    pages: Vec<PageView>,
    buffer: ViewBuffer<u32>,
    queue: RenderQueue<PageView>,
    in_flight: BTreeSet<u32>,
    current_page: u32,
    scale: f32,
    mode: ViewMode,
    scroll_top: f32,
    client_height: f32,
    visibility: VisibilityResult,
    events: VecDeque<ViewerEvent>,
    text_layers: Option<TextLayerFactory>,
}

impl PdfViewer {
    pub fn new(engine: impl DocumentEngine + 'static, config: ViewerConfig) -> Self {
        let scale = if valid_scale(config.default_scale) { config.default_scale } else { 1.0 };

        Self {
            engine: Box::new(engine),
            document: None,
            display_name: None,
            pages: Vec::new(),
            buffer: ViewBuffer::new(config.buffer_capacity),
            queue: RenderQueue::new(),
            in_flight: BTreeSet::new(),
            current_page: FIRST_PAGE,
            scale,
            mode: config.view_mode,
            scroll_top: 0.0,
            client_height: 0.0,
            visibility: VisibilityResult::default(),
            events: VecDeque::new(),
            text_layers: None,
            config,
        }
    }

    /// Layers are attached to pages of documents opened afterwards, when
    /// `text_layer` is enabled in the configuration.
    pub fn with_text_layers(mut self, factory: TextLayerFactory) -> Self {
        self.text_layers = Some(factory);
        self
    }

    fn render_context(&self) -> RenderContext {
        RenderContext {
            device_pixel_ratio: self.config.device_pixel_ratio,
            max_canvas_pixels: self.config.max_canvas_pixels,
            scheduled: true,
        }
    }

    /// Open a document, replacing the current one. Returns the page count.
    pub fn open(&mut self, source: impl Into<OpenSource>, display_name: &str) -> Result<u32> {
        self.close();

        let mut document = self.engine.open(source.into())?;
        let pages = match self.build_pages(&*document) {
            Ok(pages) => pages,
            Err(error) => {
                document.destroy();
                return Err(error);
            }
        };

        let page_count = pages.len() as u32;
        self.pages = pages;
        self.document = Some(document);
        self.display_name = Some(display_name.to_owned());
        self.current_page = FIRST_PAGE;
        self.scroll_top = 0.0;

        tracing::info!(name = display_name, page_count, "document opened");
        self.events.push_back(ViewerEvent::DocumentOpened {
            name: display_name.to_owned(),
            page_count,
        });

        self.update();
        Ok(page_count)
    }

    fn build_pages(&self, document: &dyn PdfDocument) -> Result<Vec<PageView>> {
        let context = self.render_context();

        (FIRST_PAGE..=document.num_pages())
            .map(|number| {
                let mut view = PageView::new(number, self.scale)
                    .with_source(document.page(number)?)
                    .with_context(context);

                if self.config.text_layer {
                    if let Some(factory) = &self.text_layers {
                        view = view.with_text_layer(factory(number));
                    }
                }
                Ok(view)
            })
            .collect()
    }

    /// Cancel every render, release every page and drop the document.
    pub fn close(&mut self) {
        let Some(mut document) = self.document.take() else {
            return;
        };

        for page in &mut self.pages {
            page.destroy();
        }
        self.pages.clear();
        self.buffer.reset(self.config.buffer_capacity);
        self.queue.clear();
        self.in_flight.clear();
        self.visibility = VisibilityResult::default();
        self.display_name = None;
        self.current_page = FIRST_PAGE;
        document.destroy();

        tracing::info!("document closed");
        self.events.push_back(ViewerEvent::DocumentClosed);
    }

    /// Recompute visibility and hand the candidates to the render queue.
    pub fn update(&mut self) {
        if self.pages.is_empty() {
            return;
        }

        let visibility = match self.mode {
            ViewMode::SinglePage => single_page_visibility(self.current_page, self.page_count()),
            ViewMode::Continuous => visible_pages(
                ScrollWindow { top: self.scroll_top, height: self.client_height },
                &self.page_boxes(),
                true,
            ),
        };

        if self.mode == ViewMode::Continuous {
            if let Some(most_visible) = visibility.first() {
                self.set_current_page(most_visible.id);
            }
        }

        tracing::debug!(
            visible = ?visibility.visible_ids(),
            pre_render = ?visibility.pre_render,
            "viewer update"
        );

        self.queue.schedule(&visibility.visible_ids(), &visibility.pre_render);
        self.visibility = visibility;
        self.advance_queue();
    }

    /// One event-loop tick: poll in-flight renders, advance the queue and
    /// flush pending text layers. Returns whether anything happened.
    pub fn pump(&mut self) -> bool {
        if self.pages.is_empty() {
            return false;
        }

        let mut progressed = self.poll_in_flight();
        progressed |= self.advance_queue();
        for page in &mut self.pages {
            progressed |= page.flush_text_layer();
        }

        progressed
    }

    /// Pump until nothing progresses or `max_ticks` is reached. Returns the
    /// number of ticks that made progress.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.pump() {
            ticks += 1;
        }
        ticks
    }

    fn poll_in_flight(&mut self) -> bool {
        let mut progressed = false;

        for id in self.in_flight.clone() {
            let Some(page) = self.pages.iter_mut().find(|page| page.id() == id) else {
                self.in_flight.remove(&id);
                continue;
            };

            match page.poll_render() {
                Ok(RenderProgress::Pending) => progressed = true,
                Ok(RenderProgress::Finished) => {
                    self.in_flight.remove(&id);
                    self.events.push_back(ViewerEvent::PageRendered { page: id });
                    self.track_rendered(id);
                    progressed = true;
                }
                Ok(RenderProgress::Idle | RenderProgress::Paused | RenderProgress::Cancelled) => {
                    self.in_flight.remove(&id);
                }
                Err(error) => {
                    self.in_flight.remove(&id);
                    let message = error.to_string();
                    self.events.push_back(ViewerEvent::RenderFailed { page: id, message });
                    self.track_rendered(id);
                    progressed = true;
                }
            }
        }

        progressed
    }

    fn advance_queue(&mut self) -> bool {
        let events = self.queue.advance(&mut self.pages);
        let progressed = !events.is_empty();

        for event in events {
            match event {
                QueueEvent::Started { page, .. } | QueueEvent::Resumed { page } => {
                    self.in_flight.insert(page);
                }
                QueueEvent::Skipped { page } => {
                    // Finished pages are always tracked, so this only touches.
                    self.track_rendered(page);
                }
                QueueEvent::Failed { page, error } => {
                    self.events
                        .push_back(ViewerEvent::RenderFailed { page, message: error.to_string() });
                }
                QueueEvent::InFlight { .. }
                | QueueEvent::Settled { .. }
                | QueueEvent::Missing { .. } => {}
            }
        }

        progressed
    }

    /// Pages on screen are never evicted to make room for a pre-render page;
    /// such a page is released again instead.
    fn track_rendered(&mut self, id: u32) {
        let visible = self.visibility.visible_ids();
        let Some(evicted) = self.buffer.push_keeping(id, |page| visible.contains(page)) else {
            return;
        };

        if let Some(page) = self.pages.iter_mut().find(|page| page.id() == evicted) {
            page.destroy();
        }
        self.in_flight.remove(&evicted);
        self.events.push_back(ViewerEvent::PageEvicted { page: evicted });
    }

    fn set_current_page(&mut self, page: u32) {
        if page != self.current_page {
            self.current_page = page;
            self.events.push_back(ViewerEvent::CurrentPageChanged { page });
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.document.is_some() {
            Ok(())
        } else {
            Err(ViewerError::NoDocument)
        }
    }

    /// Single-page mode shows `page` directly. Continuous mode asks the host to
    /// scroll to the page's box, and refreshes right away only when the
    /// viewport is already there.
    pub fn jump_to_page(&mut self, page: u32) -> Result<()> {
        self.ensure_open()?;

        let page_count = self.page_count();
        if !(FIRST_PAGE..=page_count).contains(&page) {
            return Err(ViewerError::PageOutOfRange { page, page_count });
        }

        match self.mode {
            ViewMode::SinglePage => {
                self.set_current_page(page);
                self.update();
            }
            ViewMode::Continuous => {
                let target = self.scroll_target(page);
                if (target - self.scroll_top).abs() < SCROLL_TOLERANCE {
                    self.update();
                } else {
                    tracing::debug!(page, top = target, "scroll requested");
                    self.events.push_back(ViewerEvent::ScrollRequested { top: target });
                }
            }
        }

        Ok(())
    }

    /// Scroll offset that puts `page` at the top of the viewport.
    pub fn scroll_target(&self, page: u32) -> f32 {
        self.page_boxes()
            .iter()
            .find(|candidate| candidate.id == page)
            .map_or(0.0, |candidate| (candidate.top - self.config.page_gap).max(0.0))
    }

    pub fn next_page(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.current_page >= self.page_count() {
            return Ok(());
        }
        self.step_to(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.current_page <= FIRST_PAGE {
            return Ok(());
        }
        self.step_to(self.current_page - 1)
    }

    fn step_to(&mut self, page: u32) -> Result<()> {
        match self.mode {
            ViewMode::SinglePage => {
                self.set_current_page(page);
                self.update();
                Ok(())
            }
            ViewMode::Continuous => self.jump_to_page(page),
        }
    }

    /// Rescale every page. Finished pages keep stretching their old surface
    /// until they render again; the current page stays anchored.
    pub fn set_scale(&mut self, scale: f32) -> Result<()> {
        if !valid_scale(scale) {
            return Err(ViewerError::InvalidScale(scale));
        }
        if scale == self.scale {
            return Ok(());
        }

        tracing::debug!(from = self.scale, to = scale, "scale changed");
        self.scale = scale;
        for page in &mut self.pages {
            page.set_scale(scale);
        }
        self.in_flight.clear();
        self.queue.clear();
        self.events.push_back(ViewerEvent::ScaleChanged { scale });

        if self.document.is_some() {
            self.jump_to_page(self.current_page)?;
        }
        Ok(())
    }

    pub fn set_mode(&mut self, mode: ViewMode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }

        tracing::debug!(%mode, "view mode changed");
        self.mode = mode;
        self.events.push_back(ViewerEvent::ModeChanged { mode });

        if self.document.is_some() {
            self.jump_to_page(self.current_page)?;
        }
        Ok(())
    }

    /// Toggle between single-page and continuous mode.
    pub fn next_render_mode(&mut self) -> Result<ViewMode> {
        let mode = self.mode.next();
        self.set_mode(mode)?;
        Ok(mode)
    }

    /// The host's container scrolled to `top`.
    pub fn on_scroll(&mut self, top: f32) {
        self.scroll_top = if top.is_finite() { top.max(0.0) } else { 0.0 };
        self.update();
    }

    /// The host's viewport now shows `client_height` CSS pixels.
    pub fn resize(&mut self, client_height: f32) {
        self.client_height = if client_height.is_finite() { client_height.max(0.0) } else { 0.0 };
        self.update();
    }

    /// Pages attached to the container, in display order.
    pub fn children(&self) -> Vec<u32> {
        if self.pages.is_empty() {
            return Vec::new();
        }

        match self.mode {
            ViewMode::SinglePage => vec![self.current_page],
            ViewMode::Continuous => self.pages.iter().map(PageView::id).collect(),
        }
    }

    /// Continuous layout of every page at the current scale.
    pub fn page_boxes(&self) -> Vec<PageBox> {
        layout_continuous(
            self.pages.iter().map(|page| (page.id(), page.css_height())),
            self.config.page_gap,
        )
    }

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    /// No render in flight and nothing left in the queue.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.queue.is_idle()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    pub fn client_height(&self) -> f32 {
        self.client_height
    }

    pub fn pages(&self) -> &[PageView] {
        &self.pages
    }

    pub fn page(&self, id: u32) -> Option<&PageView> {
        self.pages.iter().find(|page| page.id() == id)
    }

    /// Visibility computed by the last update.
    pub fn visibility(&self) -> &VisibilityResult {
        &self.visibility
    }

    pub fn buffer(&self) -> &ViewBuffer<u32> {
        &self.buffer
    }

    pub fn in_flight(&self) -> Vec<u32> {
        self.in_flight.iter().copied().collect()
    }

    pub fn highest_priority_page(&self) -> Option<u32> {
        self.queue.highest_priority_page()
    }

    pub fn queue_stats(&self) -> SchedulerStats {
        self.queue.stats()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

fn valid_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_layer::TextLayer;
    use pdf_engine::testing::StubEngine;
    use pdf_engine::PageViewport;
    use std::cell::RefCell;
    use std::rc::Rc;
    use viewer_core::RenderState;

    fn open(engine: StubEngine, config: ViewerConfig) -> PdfViewer {
        let mut viewer = PdfViewer::new(engine, config);
        viewer.open(Vec::<u8>::new(), "doc.pdf").unwrap();
        viewer
    }

    fn states(viewer: &PdfViewer) -> Vec<RenderState> {
        viewer.pages().iter().map(PageView::state).collect()
    }

    #[test]
    fn test_open_renders_current_page_and_neighbour() {
        let mut viewer = open(StubEngine::uniform(4, 100.0, 100.0), ViewerConfig::default());

        assert_eq!(viewer.page_count(), 4);
        assert_eq!(viewer.current_page(), 1);
        assert_eq!(viewer.in_flight(), vec![1]);

        viewer.run_until_idle(50);
        assert!(viewer.is_idle());
        assert_eq!(
            states(&viewer),
            vec![
                RenderState::Finished,
                RenderState::Finished,
                RenderState::Initial,
                RenderState::Initial
            ]
        );
        assert_eq!(viewer.buffer().keys(), vec![1, 2]);

        let events = viewer.drain_events();
        assert_eq!(
            events,
            vec![
                ViewerEvent::DocumentOpened { name: "doc.pdf".to_owned(), page_count: 4 },
                ViewerEvent::PageRendered { page: 1 },
                ViewerEvent::PageRendered { page: 2 },
            ]
        );
    }

    #[test]
    fn test_operations_require_document() {
        let engine = StubEngine::uniform(2, 10.0, 10.0);
        let mut viewer = PdfViewer::new(engine, ViewerConfig::default());

        assert!(matches!(viewer.jump_to_page(1), Err(ViewerError::NoDocument)));
        assert!(matches!(viewer.next_page(), Err(ViewerError::NoDocument)));
        assert!(viewer.children().is_empty());
        assert!(!viewer.pump());

        viewer.close();
        assert!(viewer.drain_events().is_empty());
    }

    #[test]
    fn test_jump_out_of_range() {
        let mut viewer = open(StubEngine::uniform(3, 10.0, 10.0), ViewerConfig::default());

        assert!(matches!(
            viewer.jump_to_page(0),
            Err(ViewerError::PageOutOfRange { page: 0, page_count: 3 })
        ));
        assert!(matches!(
            viewer.jump_to_page(4),
            Err(ViewerError::PageOutOfRange { page: 4, page_count: 3 })
        ));
    }

    #[test]
    fn test_next_and_prev_stop_at_edges() {
        let mut viewer = open(StubEngine::uniform(2, 10.0, 10.0), ViewerConfig::default());

        viewer.prev_page().unwrap();
        assert_eq!(viewer.current_page(), 1);

        viewer.next_page().unwrap();
        assert_eq!(viewer.current_page(), 2);
        assert_eq!(viewer.children(), vec![2]);

        viewer.next_page().unwrap();
        assert_eq!(viewer.current_page(), 2);

        viewer.prev_page().unwrap();
        assert_eq!(viewer.current_page(), 1);
    }

    #[test]
    fn test_continuous_layout_and_scroll_target() {
        let config = ViewerConfig::default().with_view_mode(ViewMode::Continuous);
        let mut viewer = open(StubEngine::uniform(3, 100.0, 200.0), config);

        let tops: Vec<f32> = viewer.page_boxes().iter().map(|page| page.top).collect();
        assert_eq!(tops, vec![10.0, 220.0, 430.0]);
        assert_eq!(viewer.scroll_target(1), 0.0);
        assert_eq!(viewer.scroll_target(3), 420.0);
        assert_eq!(viewer.children(), vec![1, 2, 3]);

        viewer.drain_events();
        viewer.jump_to_page(3).unwrap();
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::ScrollRequested { top: 420.0 }]);
    }

    #[test]
    fn test_jump_to_current_position_updates_directly() {
        let config = ViewerConfig::default().with_view_mode(ViewMode::Continuous);
        let mut viewer = open(StubEngine::uniform(3, 100.0, 200.0), config);
        viewer.resize(150.0);
        viewer.run_until_idle(50);
        viewer.drain_events();

        viewer.jump_to_page(1).unwrap();
        assert!(viewer.drain_events().is_empty());
        assert_eq!(viewer.visibility().visible_ids(), vec![1]);
    }

    #[test]
    fn test_scroll_updates_current_page() {
        let config =
            ViewerConfig::default().with_view_mode(ViewMode::Continuous).with_page_gap(0.0);
        let mut viewer = open(StubEngine::uniform(5, 100.0, 100.0), config);
        viewer.resize(100.0);
        viewer.drain_events();

        viewer.on_scroll(230.0);
        assert_eq!(viewer.current_page(), 3);
        assert_eq!(viewer.visibility().visible_ids(), vec![3, 4]);
        assert_eq!(viewer.visibility().pre_render, vec![5, 2]);
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::CurrentPageChanged { page: 3 }]);
    }

    #[test]
    fn test_set_scale_validation() {
        let mut viewer = open(StubEngine::uniform(1, 10.0, 10.0), ViewerConfig::default());

        assert!(matches!(viewer.set_scale(0.0), Err(ViewerError::InvalidScale(_))));
        assert!(matches!(viewer.set_scale(f32::INFINITY), Err(ViewerError::InvalidScale(_))));

        viewer.drain_events();
        viewer.set_scale(1.0).unwrap();
        assert!(viewer.drain_events().is_empty());

        viewer.set_scale(2.0).unwrap();
        assert_eq!(viewer.scale(), 2.0);
        assert_eq!(viewer.pages()[0].scale(), 2.0);
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::ScaleChanged { scale: 2.0 }]);
    }

    #[test]
    fn test_mode_cycles_and_rebuilds_children() {
        let mut viewer = open(StubEngine::uniform(3, 10.0, 10.0), ViewerConfig::default());
        assert_eq!(viewer.children(), vec![1]);
        viewer.drain_events();

        assert_eq!(viewer.next_render_mode().unwrap(), ViewMode::Continuous);
        assert_eq!(viewer.children(), vec![1, 2, 3]);
        assert_eq!(
            viewer.drain_events(),
            vec![ViewerEvent::ModeChanged { mode: ViewMode::Continuous }]
        );

        assert_eq!(viewer.next_render_mode().unwrap(), ViewMode::SinglePage);
        assert_eq!(viewer.children(), vec![1]);
    }

    #[test]
    fn test_render_failure_is_reported_and_not_retried() {
        let engine = StubEngine::uniform(2, 10.0, 10.0).failing_page(1, "corrupt content");
        let counters = engine.counters();
        let mut viewer = open(engine, ViewerConfig::default());

        viewer.run_until_idle(50);
        let events = viewer.drain_events();
        assert!(events.contains(&ViewerEvent::RenderFailed {
            page: 1,
            message: "page 1 failed to render: rendering failed: corrupt content".to_owned(),
        }));
        assert_eq!(viewer.page(1).map(PageView::state), Some(RenderState::Finished));
        assert_eq!(viewer.page(2).map(PageView::state), Some(RenderState::Finished));

        viewer.update();
        viewer.run_until_idle(50);
        assert_eq!(counters.renders_started(), 2);
    }

    #[test]
    fn test_engine_cancellation_leaves_page_ready_to_rerender() {
        let engine = StubEngine::uniform(2, 10.0, 10.0).aborting_page(1);
        let counters = engine.counters();
        let mut viewer = open(engine, ViewerConfig::default());

        viewer.run_until_idle(50);
        assert!(viewer.is_idle());
        assert_eq!(states(&viewer), vec![RenderState::Initial, RenderState::Finished]);
        assert_eq!(viewer.buffer().keys(), vec![2]);
        assert!(!viewer.drain_events().iter().any(|event| matches!(
            event,
            ViewerEvent::RenderFailed { .. } | ViewerEvent::PageRendered { page: 1 }
        )));

        viewer.update();
        assert_eq!(viewer.in_flight(), vec![1]);
        viewer.run_until_idle(50);
        assert_eq!(counters.renders_started(), 3);
        assert_eq!(counters.cancels(), 0);
    }

    #[test]
    fn test_prerender_never_evicts_a_visible_page() {
        let config = ViewerConfig::default()
            .with_view_mode(ViewMode::Continuous)
            .with_page_gap(0.0)
            .with_buffer_capacity(2);
        let mut viewer = open(StubEngine::uniform(3, 100.0, 100.0), config);
        viewer.resize(200.0);
        viewer.run_until_idle(50);

        assert_eq!(viewer.visibility().visible_ids(), vec![1, 2]);
        assert_eq!(viewer.visibility().pre_render, vec![3]);
        assert_eq!(
            states(&viewer),
            vec![RenderState::Finished, RenderState::Finished, RenderState::Initial]
        );
        assert_eq!(viewer.buffer().keys(), vec![1, 2]);
        assert!(viewer.drain_events().contains(&ViewerEvent::PageEvicted { page: 3 }));
    }

    #[test]
    fn test_close_cancels_and_destroys() {
        let engine = StubEngine::uniform(3, 10.0, 10.0).with_slices(5);
        let counters = engine.counters();
        let mut viewer = open(engine, ViewerConfig::default());
        viewer.pump();

        viewer.close();
        assert!(!viewer.is_open());
        assert_eq!(viewer.page_count(), 0);
        assert!(viewer.buffer().is_empty());
        assert!(viewer.is_idle());
        assert_eq!(counters.cancels(), 1);
        assert_eq!(counters.cleanups(), 3);
        assert_eq!(counters.documents_destroyed(), 1);
        assert_eq!(viewer.drain_events().last(), Some(&ViewerEvent::DocumentClosed));

        viewer.close();
        assert!(viewer.drain_events().is_empty());
    }

    #[test]
    fn test_reopen_closes_previous_document() {
        let engine = StubEngine::uniform(2, 10.0, 10.0);
        let counters = engine.counters();
        let mut viewer = open(engine, ViewerConfig::default());
        viewer.jump_to_page(2).unwrap();

        assert_eq!(viewer.open(Vec::<u8>::new(), "again.pdf").unwrap(), 2);
        assert_eq!(viewer.current_page(), 1);
        assert_eq!(viewer.display_name(), Some("again.pdf"));
        assert_eq!(counters.opens(), 2);
        assert_eq!(counters.documents_destroyed(), 1);
    }

    struct Recorder(Rc<RefCell<Vec<u32>>>);

    impl TextLayer for Recorder {
        fn render(&mut self, page: u32, _viewport: PageViewport) {
            self.0.borrow_mut().push(page);
        }

        fn cancel(&mut self) {}
    }

    #[test]
    fn test_text_layers_follow_rendered_pages() {
        let rendered = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&rendered);
        let factory: TextLayerFactory = Box::new(move |_page: u32| {
            Box::new(Recorder(Rc::clone(&sink))) as Box<dyn TextLayer>
        });

        let mut viewer = PdfViewer::new(
            StubEngine::uniform(3, 10.0, 10.0),
            ViewerConfig::default().with_text_layer(true),
        )
        .with_text_layers(factory);
        viewer.open(Vec::<u8>::new(), "doc.pdf").unwrap();
        viewer.run_until_idle(50);

        assert_eq!(*rendered.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_text_layers_disabled_by_config() {
        let rendered = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&rendered);
        let factory: TextLayerFactory = Box::new(move |_page: u32| {
            Box::new(Recorder(Rc::clone(&sink))) as Box<dyn TextLayer>
        });

        let mut viewer =
            PdfViewer::new(StubEngine::uniform(2, 10.0, 10.0), ViewerConfig::default())
                .with_text_layers(factory);
        viewer.open(Vec::<u8>::new(), "doc.pdf").unwrap();
        viewer.run_until_idle(50);

        assert!(rendered.borrow().is_empty());
    }
}
