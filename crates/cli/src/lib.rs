use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdf_engine::{default_engine, DocumentEngine, OpenSource};
use pdfview::{
    PageView, PdfViewer, RenderContext, RenderProgress, RenderState, ViewMode, ViewerConfig,
    ViewerEvent, VisiblePage,
};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Upper bound on event-loop ticks per settle step.
const MAX_TICKS: usize = 10_000;

#[derive(Debug, Parser)]
#[command(name = "pdfview-cli")]
#[command(about = "Headless driver for the pdfview page viewer")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Open a PDF in a headless viewer, apply viewport events and report the
    /// resulting render state as JSON.
    Simulate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        args: SimulateArgs,
    },
    /// Render one page to a PNG file.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    page_sizes_pt: Vec<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    path: String,
    page_count: u32,
    mode: ViewMode,
    scale: f32,
    current_page: u32,
    scroll_top: f32,
    visible: Vec<VisiblePage>,
    pre_render: Vec<u32>,
    pages: Vec<PageReport>,
    buffer: Vec<u32>,
    events: Vec<ViewerEvent>,
}

#[derive(Debug, Serialize)]
struct PageReport {
    page: u32,
    state: RenderState,
    surface_px: Option<[u32; 2]>,
    /// CSS stretch applied to a surface drawn at an older scale
    css_rescale: Option<f32>,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// `single` or `continuous`
    #[arg(long)]
    mode: Option<ViewMode>,
    #[arg(long)]
    scale: Option<f32>,
    /// Viewport height in CSS pixels
    #[arg(long, default_value_t = 800.0)]
    viewport_height: f32,
    #[arg(long)]
    scroll: Option<f32>,
    #[arg(long)]
    jump: Option<u32>,
    #[arg(long)]
    buffer_capacity: Option<usize>,
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Simulate { file, args } => run_simulate(&file, &args),
        Commands::Render { file, page, scale, output } => {
            run_render(&file, page, scale, output.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let mut document = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let mut page_sizes_pt = Vec::new();
    for number in 1..=document.num_pages() {
        let viewport = document.page(number)?.viewport(1.0);
        page_sizes_pt.push(PageSizeOutput { width: viewport.width, height: viewport.height });
    }
    document.destroy();

    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count: page_sizes_pt.len() as u32,
        page_sizes_pt,
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_simulate(file: &Path, args: &SimulateArgs) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut config = ViewerConfig::from_env().context("invalid PDFVIEW_* environment")?;
    if let Some(mode) = args.mode {
        config = config.with_view_mode(mode);
    }
    if let Some(capacity) = args.buffer_capacity {
        config = config.with_buffer_capacity(capacity);
    }
    config.validate().context("invalid viewer configuration")?;

    let name = match file.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => file.display().to_string(),
    };

    let mut viewer = PdfViewer::new(default_engine(), config);
    let mut events = Vec::new();

    viewer.open(file, &name).context("failed to open PDF")?;
    viewer.resize(args.viewport_height);
    settle(&mut viewer, &mut events);

    if let Some(scale) = args.scale {
        viewer.set_scale(scale).context("failed to apply scale")?;
        settle(&mut viewer, &mut events);
    }
    if let Some(page) = args.jump {
        viewer.jump_to_page(page).with_context(|| format!("failed to jump to page {page}"))?;
        settle(&mut viewer, &mut events);
    }
    if let Some(top) = args.scroll {
        viewer.on_scroll(top);
        settle(&mut viewer, &mut events);
    }

    let visibility = viewer.visibility().clone();
    let report = SimulationReport {
        path: file.display().to_string(),
        page_count: viewer.page_count(),
        mode: viewer.mode(),
        scale: viewer.scale(),
        current_page: viewer.current_page(),
        scroll_top: viewer.scroll_top(),
        visible: visibility.visible,
        pre_render: visibility.pre_render,
        pages: viewer
            .pages()
            .iter()
            .map(|page| PageReport {
                page: page.id(),
                state: page.state(),
                surface_px: page.surface().map(|surface| [surface.width(), surface.height()]),
                css_rescale: page.css_rescale(),
            })
            .collect(),
        buffer: viewer.buffer().keys(),
        events,
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");

    viewer.close();
    Ok(())
}

/// Run renders to completion, acting as the host for scroll requests.
fn settle(viewer: &mut PdfViewer, log: &mut Vec<ViewerEvent>) {
    loop {
        let ticks = viewer.run_until_idle(MAX_TICKS);
        tracing::debug!(ticks, "viewer idle");

        let events = viewer.drain_events();
        let scroll = events.iter().rev().find_map(|event| match event {
            ViewerEvent::ScrollRequested { top } => Some(*top),
            _ => None,
        });
        log.extend(events);

        match scroll {
            Some(top) => viewer.on_scroll(top),
            None => break,
        }
    }
}

fn run_render(file: &Path, page: u32, scale: f32, output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    if !(scale.is_finite() && scale > 0.0) {
        anyhow::bail!("--scale must be a positive number");
    }

    let mut engine = default_engine();
    let mut document = engine.open(OpenSource::from(file)).context("failed to open PDF")?;
    let source = document.page(page).with_context(|| format!("failed to load page {page}"))?;

    let mut view =
        PageView::new(page, scale).with_source(source).with_context(RenderContext::default());
    view.render(None)?;

    loop {
        match view.poll_render().context("failed to render page")? {
            RenderProgress::Pending => {}
            RenderProgress::Paused => view.resume()?,
            RenderProgress::Finished => break,
            RenderProgress::Idle | RenderProgress::Cancelled => {
                anyhow::bail!("render of page {page} stopped before finishing")
            }
        }
    }

    let surface = view.take_surface().context("rendered page has no surface")?;
    view.destroy();
    document.destroy();

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_page_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    surface
        .into_image()
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_page_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
