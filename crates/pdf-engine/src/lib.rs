//! Document engine seam for the viewer.
//!
//! A [`DocumentEngine`] opens a document; the document hands out shared
//! [`PdfPage`] sources; each page starts cooperative [`RenderTask`]s that draw
//! into a caller-owned [`Surface`] one slice per poll.

use image::{ImageBuffer, Rgba};
use lopdf::Document;
use std::cell::Cell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Rows painted per poll by the lopdf backend.
pub const DEFAULT_ROWS_PER_SLICE: u32 = 64;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BORDER: Rgba<u8> = Rgba([220, 220, 220, 255]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// US Letter, used when a page carries no usable MediaBox.
    pub const LETTER: Self = Self { width_pt: 612.0, height_pt: 792.0 };
}

/// A page's intrinsic size multiplied by a scale, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl PageViewport {
    pub fn new(size: PageSize, scale: f32) -> Self {
        Self { width: size.width_pt * scale, height: size.height_pt * scale, scale }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub viewport: PageViewport,
    /// Device-pixel transform, `None` when drawing 1:1.
    pub transform: Option<[f32; 6]>,
}

/// Backing pixels of one page plus the CSS box they are shown in.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    image: RgbaImage,
    css_width: u32,
    css_height: u32,
}

impl Surface {
    pub fn new(width: u32, height: u32, css_width: u32, css_height: u32) -> Self {
        Self { image: RgbaImage::new(width, height), css_width, css_height }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn css_width(&self) -> u32 {
        self.css_width
    }

    pub fn css_height(&self) -> u32 {
        self.css_height
    }

    pub fn set_css_size(&mut self, css_width: u32, css_height: u32) {
        self.css_width = css_width;
        self.css_height = css_height;
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Zero-argument action that lets a yielded task continue.
pub type Continuation = Box<dyn FnOnce()>;

/// Outcome of polling a render task once
pub enum TaskPoll {
    /// Still working, or waiting for its continuation to be invoked
    Pending,
    /// The task offers to yield; it makes no progress until the continuation runs
    Yield(Continuation),
    Complete,
    Failed(RenderError),
}

impl fmt::Debug for TaskPoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Yield(_) => f.write_str("Yield(..)"),
            Self::Complete => f.write_str("Complete"),
            Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
        }
    }
}

/// A cancellable, cooperatively scheduled page render.
pub trait RenderTask {
    fn poll(&mut self, surface: &mut Surface) -> TaskPoll;

    /// The next poll reports [`RenderError::Cancelled`].
    fn cancel(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("rendering cancelled")]
    Cancelled,
    #[error("rendering failed: {0}")]
    Failed(String),
}

impl RenderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait DocumentEngine {
    fn open(&mut self, source: OpenSource) -> Result<Box<dyn PdfDocument>, PdfEngineError>;
}

pub trait PdfDocument {
    fn num_pages(&self) -> u32;

    /// Page source for a 1-based page number.
    fn page(&self, number: u32) -> Result<Rc<dyn PdfPage>, PdfEngineError>;

    /// Release the document. Pages already handed out stay usable for cleanup.
    fn destroy(&mut self);
}

pub trait PdfPage {
    fn page_number(&self) -> u32;

    fn viewport(&self, scale: f32) -> PageViewport;

    fn render(&self, params: RenderParams) -> Box<dyn RenderTask>;

    /// Drop engine-side caches held for this page.
    fn cleanup(&self);
}

/// Shared open/closed flag behind a task's continuation.
#[derive(Debug, Clone, Default)]
pub(crate) struct YieldGate(Rc<Cell<bool>>);

impl YieldGate {
    /// Block the task and hand out the continuation that unblocks it.
    pub(crate) fn close(&self) -> Continuation {
        self.0.set(true);
        let blocked = Rc::clone(&self.0);
        Box::new(move || blocked.set(false))
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.0.get()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LopdfEngine {
    rows_per_slice: u32,
}

impl Default for LopdfEngine {
    fn default() -> Self {
        Self { rows_per_slice: DEFAULT_ROWS_PER_SLICE }
    }
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows_per_slice(mut self, rows: u32) -> Self {
        self.rows_per_slice = rows.max(1);
        self
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or(PageSize::LETTER);

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }
}

impl DocumentEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<Box<dyn PdfDocument>, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let sizes = Self::parse_sizes(&bytes)?;
        tracing::debug!(pages = sizes.len(), "opened document");

        let pages = sizes
            .into_iter()
            .zip(1..)
            .map(|(size, number)| {
                Rc::new(LopdfPage { number, size, rows_per_slice: self.rows_per_slice })
            })
            .collect();

        Ok(Box::new(LopdfDocument { pages, destroyed: false }))
    }
}

#[derive(Debug)]
pub struct LopdfDocument {
    pages: Vec<Rc<LopdfPage>>,
    destroyed: bool,
}

impl PdfDocument for LopdfDocument {
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
        self.destroyed = true;
    }
}

#[derive(Debug)]
pub struct LopdfPage {
    number: u32,
    size: PageSize,
    rows_per_slice: u32,
}

impl LopdfPage {
    pub fn size(&self) -> PageSize {
        self.size
    }
}

impl PdfPage for LopdfPage {
    fn page_number(&self) -> u32 {
        self.number
    }

    fn viewport(&self, scale: f32) -> PageViewport {
        PageViewport::new(self.size, scale)
    }

    fn render(&self, params: RenderParams) -> Box<dyn RenderTask> {
        tracing::trace!(page = self.number, scale = params.viewport.scale, "placeholder render");

        Box::new(PlaceholderRender {
            rows_per_slice: self.rows_per_slice,
            next_row: 0,
            cancelled: false,
            gate: YieldGate::default(),
        })
    }

    fn cleanup(&self) {}
}

/// Paints a blank sheet with a grey frame, one band of rows per poll.
struct PlaceholderRender {
    rows_per_slice: u32,
    next_row: u32,
    cancelled: bool,
    gate: YieldGate,
}

impl RenderTask for PlaceholderRender {
    fn poll(&mut self, surface: &mut Surface) -> TaskPoll {
        if self.cancelled {
            return TaskPoll::Failed(RenderError::Cancelled);
        }
        if !self.gate.is_open() {
            return TaskPoll::Pending;
        }

        let (width, height) = (surface.width(), surface.height());
        let end = self.next_row.saturating_add(self.rows_per_slice).min(height);
        let framed = width >= 4 && height >= 4;
        let image = surface.image_mut();

        for y in self.next_row..end {
            for x in 0..width {
                let edge = framed && (x == 0 || y == 0 || x == width - 1 || y == height - 1);
                image.put_pixel(x, y, if edge { BORDER } else { PAPER });
            }
        }
        self.next_row = end;

        if end >= height {
            TaskPoll::Complete
        } else {
            TaskPoll::Yield(self.gate.close())
        }
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}
