//! Scripted engine and fixture builders for tests.
//!
//! [`StubEngine`] ignores its source and opens a document made of
//! [`StubPage`]s whose renders take a fixed number of polls, may yield between
//! slices and may fail on the last slice. Every page shares one
//! [`StubCounters`] so tests can observe engine traffic.

use crate::{
    DocumentEngine, OpenSource, PageSize, PageViewport, PdfDocument, PdfEngineError, PdfPage,
    RenderError, RenderParams, RenderTask, Surface, TaskPoll, YieldGate,
};
use image::Rgba;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::cell::Cell;
use std::rc::Rc;

const INK: Rgba<u8> = Rgba([40, 40, 40, 255]);

/// Builds a real PDF in memory with one empty page per `(width, height)`.
pub fn sample_pdf(sizes: &[(f32, f32)]) -> Result<Vec<u8>, PdfEngineError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = sizes
        .iter()
        .map(|&(width, height)| {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ],
                "Contents" => content_id,
            });
            Object::Reference(page_id)
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|error| PdfEngineError::Backend(error.to_string()))?;
    Ok(bytes)
}

/// Engine traffic shared by every stub page of one engine.
#[derive(Debug, Default)]
pub struct StubCounters {
    opens: Cell<u32>,
    renders_started: Cell<u32>,
    cancels: Cell<u32>,
    cleanups: Cell<u32>,
    documents_destroyed: Cell<u32>,
}

impl StubCounters {
    pub fn opens(&self) -> u32 {
        self.opens.get()
    }

    pub fn renders_started(&self) -> u32 {
        self.renders_started.get()
    }

    pub fn cancels(&self) -> u32 {
        self.cancels.get()
    }

    pub fn cleanups(&self) -> u32 {
        self.cleanups.get()
    }

    pub fn documents_destroyed(&self) -> u32 {
        self.documents_destroyed.get()
    }
}

fn bump(counter: &Cell<u32>) {
    counter.set(counter.get() + 1);
}

#[derive(Debug, Clone)]
pub struct StubPage {
    number: u32,
    size: PageSize,
    slices: u32,
    yields: bool,
    failure: Option<RenderError>,
    counters: Rc<StubCounters>,
}

impl StubPage {
    /// A page whose render completes on its first poll.
    pub fn new(number: u32, width_pt: f32, height_pt: f32) -> Self {
        Self {
            number,
            size: PageSize { width_pt, height_pt },
            slices: 1,
            yields: false,
            failure: None,
            counters: Rc::default(),
        }
    }

    /// Polls needed before the render settles.
    pub fn with_slices(mut self, slices: u32) -> Self {
        self.slices = slices.max(1);
        self
    }

    /// Offer a continuation between slices.
    pub fn yielding(mut self) -> Self {
        self.yields = true;
        self
    }

    /// Fail on the last slice with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(RenderError::Failed(message.into()));
        self
    }

    /// The engine gives up on its own and reports a cancellation on the last
    /// slice, without anyone calling `cancel`.
    pub fn aborting(mut self) -> Self {
        self.failure = Some(RenderError::Cancelled);
        self
    }

    pub fn with_counters(mut self, counters: Rc<StubCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn counters(&self) -> Rc<StubCounters> {
        Rc::clone(&self.counters)
    }
}

impl PdfPage for StubPage {
    fn page_number(&self) -> u32 {
        self.number
    }

    fn viewport(&self, scale: f32) -> PageViewport {
        PageViewport::new(self.size, scale)
    }

    fn render(&self, _params: RenderParams) -> Box<dyn RenderTask> {
        bump(&self.counters.renders_started);

        Box::new(StubRender {
            slices_left: self.slices,
            yields: self.yields,
            failure: self.failure.clone(),
            cancelled: false,
            gate: YieldGate::default(),
            counters: Rc::clone(&self.counters),
        })
    }

    fn cleanup(&self) {
        bump(&self.counters.cleanups);
    }
}

struct StubRender {
    slices_left: u32,
    yields: bool,
    failure: Option<RenderError>,
    cancelled: bool,
    gate: YieldGate,
    counters: Rc<StubCounters>,
}

impl RenderTask for StubRender {
    fn poll(&mut self, surface: &mut Surface) -> TaskPoll {
        if self.cancelled {
            return TaskPoll::Failed(RenderError::Cancelled);
        }
        if !self.gate.is_open() {
            return TaskPoll::Pending;
        }

        self.slices_left = self.slices_left.saturating_sub(1);
        if self.slices_left > 0 {
            return if self.yields { TaskPoll::Yield(self.gate.close()) } else { TaskPoll::Pending };
        }

        if let Some(error) = self.failure.take() {
            return TaskPoll::Failed(error);
        }

        for pixel in surface.image_mut().pixels_mut() {
            *pixel = INK;
        }
        TaskPoll::Complete
    }

    fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            bump(&self.counters.cancels);
        }
    }
}

#[derive(Debug)]
pub struct StubDocument {
    pages: Vec<Rc<StubPage>>,
    counters: Rc<StubCounters>,
    destroyed: bool,
}

impl StubDocument {
    pub fn new(pages: Vec<StubPage>) -> Self {
        let counters = Rc::new(StubCounters::default());
        let pages = pages
            .into_iter()
            .map(|page| Rc::new(page.with_counters(Rc::clone(&counters))))
            .collect();

        Self { pages, counters, destroyed: false }
    }

    pub fn counters(&self) -> Rc<StubCounters> {
        Rc::clone(&self.counters)
    }
}

impl PdfDocument for StubDocument {
    fn num_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, number: u32) -> Result<Rc<dyn PdfPage>, PdfEngineError> {
        if self.destroyed {
            return Err(PdfEngineError::Backend("document was destroyed".to_owned()));
        }

        let page = (number as usize)
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .ok_or(PdfEngineError::PageOutOfRange { page: number, page_count: self.num_pages() })?;

        Ok(Rc::clone(page) as Rc<dyn PdfPage>)
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            bump(&self.counters.documents_destroyed);
        }
    }
}

/// Opens the same scripted document for every source.
#[derive(Debug, Clone)]
pub struct StubEngine {
    pages: Vec<StubPage>,
    counters: Rc<StubCounters>,
}

impl StubEngine {
    pub fn new(pages: Vec<StubPage>) -> Self {
        let counters = Rc::new(StubCounters::default());
        let pages =
            pages.into_iter().map(|page| page.with_counters(Rc::clone(&counters))).collect();

        Self { pages, counters }
    }

    /// `count` pages of `width_pt × height_pt`.
    pub fn uniform(count: u32, width_pt: f32, height_pt: f32) -> Self {
        Self::new((1..=count).map(|number| StubPage::new(number, width_pt, height_pt)).collect())
    }

    pub fn with_slices(mut self, slices: u32) -> Self {
        self.pages = self.pages.into_iter().map(|page| page.with_slices(slices)).collect();
        self
    }

    pub fn yielding(mut self) -> Self {
        self.pages = self.pages.into_iter().map(StubPage::yielding).collect();
        self
    }

    pub fn failing_page(mut self, number: u32, message: &str) -> Self {
        self.pages = self
            .pages
            .into_iter()
            .map(|page| if page.number == number { page.failing(message) } else { page })
            .collect();
        self
    }

    pub fn aborting_page(mut self, number: u32) -> Self {
        self.pages = self
            .pages
            .into_iter()
            .map(|page| if page.number == number { page.aborting() } else { page })
            .collect();
        self
    }

    pub fn counters(&self) -> Rc<StubCounters> {
        Rc::clone(&self.counters)
    }
}

impl DocumentEngine for StubEngine {
    fn open(&mut self, _source: OpenSource) -> Result<Box<dyn PdfDocument>, PdfEngineError> {
        bump(&self.counters.opens);

        let pages = self.pages.iter().cloned().map(Rc::new).collect();
        Ok(Box::new(StubDocument { pages, counters: Rc::clone(&self.counters), destroyed: false }))
    }
}
