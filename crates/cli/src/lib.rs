use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pdf_ink_core::SerializedDocument;
use pdf_ink_render::{flatten_page, save_png, DEFAULT_EXPORT_SCALE};
use pdf_ink_storage::{SidecarLayout, SidecarStore};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "pdf-ink")]
#[command(about = "Inspect and flatten ink annotation sidecars")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a machine-readable summary of a sidecar file.
    Info {
        #[arg(value_name = "SIDECAR")]
        file: PathBuf,
    },
    /// Render every annotated page of a sidecar to PNG.
    Flatten {
        #[arg(value_name = "SIDECAR")]
        file: PathBuf,
        /// Page width in points.
        #[arg(long)]
        width: f32,
        /// Page height in points.
        #[arg(long)]
        height: f32,
        #[arg(long, default_value_t = DEFAULT_EXPORT_SCALE)]
        scale: f32,
        /// Defaults to the folder of the sidecar.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the sidecar path used for a document.
    Locate {
        #[arg(value_name = "DOCUMENT")]
        document: String,
        #[arg(long, value_enum, default_value_t = LayoutArg::Flat)]
        layout: LayoutArg,
        /// Sidecar root; defaults to the local data directory.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Sibling,
    Mirror,
    Flat,
}

impl From<LayoutArg> for SidecarLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Sibling => SidecarLayout::Sibling,
            LayoutArg::Mirror => SidecarLayout::Mirror,
            LayoutArg::Flat => SidecarLayout::Flat,
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    version: u32,
    page_count: usize,
    stroke_count: usize,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    index: u32,
    strokes: usize,
    points: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Flatten { file, width, height, scale, output_dir } => {
            run_flatten(&file, width, height, scale, output_dir.as_deref())
        }
        Commands::Locate { document, layout, root } => run_locate(&document, layout, root),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    let document = read_sidecar(file)?;

    let pages = document
        .pages
        .iter()
        .map(|(&index, page)| PageOutput {
            index,
            strokes: page.strokes.len(),
            points: page.strokes.iter().map(|stroke| stroke.points.len()).sum(),
        })
        .collect();
    let payload = InfoOutput {
        version: document.version,
        page_count: document.pages.len(),
        stroke_count: document.stroke_count(),
        pages,
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_flatten(
    file: &Path,
    width: f32,
    height: f32,
    scale: f32,
    output_dir: Option<&Path>,
) -> Result<()> {
    for (name, value) in [("--width", width), ("--height", height), ("--scale", scale)] {
        if !value.is_finite() || value <= 0.0 {
            anyhow::bail!("{name} must be a positive number");
        }
    }
    let document = read_sidecar(file)?;

    let output_dir = output_dir
        .map(ToOwned::to_owned)
        .or_else(|| file.parent().map(ToOwned::to_owned))
        .unwrap_or_default();
    if !output_dir.as_os_str().is_empty() {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;
    }

    for (index, page) in document.pages.iter().filter(|(_, page)| !page.is_empty()) {
        let pixmap = flatten_page(&page.strokes, width, height, scale)
            .with_context(|| format!("failed to rasterize page {}", index + 1))?;
        let output = output_dir.join(format!("page-{}.png", index + 1));
        save_png(&pixmap, &output)
            .with_context(|| format!("failed to write image to {}", output.display()))?;
        log::info!("flattened {} strokes of page {}", page.strokes.len(), index + 1);
        println!("{}", output.display());
    }

    Ok(())
}

fn run_locate(document: &str, layout: LayoutArg, root: Option<PathBuf>) -> Result<()> {
    let store = match root {
        Some(root) => SidecarStore::with_root(root, layout.into()),
        None => SidecarStore::from_default_project(layout.into())?,
    };
    println!("{}", store.resolve_path(document).display());
    Ok(())
}

fn read_sidecar(path: &Path) -> Result<SerializedDocument> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    SerializedDocument::from_json_lenient(&text).context("failed to parse annotation document")
}
