//! cfi-navigator - probe visibility and pagination of EPUB chapters
//!
//! Lays a chapter out with the monospace reflow oracle and prints what a
//! reading system would record for one of its pages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cfi_navigator::cfi::compare_cfi_strings;
use cfi_navigator::config::{PageIndexMethod, ProbeConfig, VisibleContentOffsets};
use cfi_navigator::dom::{parse_markup, Document};
use cfi_navigator::layout::FlowLayout;
use cfi_navigator::navigation::{Bookmark, CfiNavigator};
use cfi_navigator::package::EpubPackage;

#[derive(Parser)]
#[command(name = "cfi-navigator")]
#[command(version, about = "Probe CFI visibility and pagination", long_about = None)]
#[command(after_help = "EXAMPLES:
    cfi-navigator probe book.epub --spine 2 --page 3
    cfi-navigator locate chapter.xhtml /4/2/1:120

Layout defaults come from CFI_NAV_* environment variables (or .env).")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the first and last visible CFIs and the bookmark for a page
    Probe {
        #[command(flatten)]
        input: InputArgs,

        /// Page to inspect (0-based)
        #[arg(short, long, default_value_t = 0)]
        page: usize,
    },
    /// Print the page a CFI lands on under both page-index methods
    Locate {
        #[command(flatten)]
        input: InputArgs,

        /// Content CFI, e.g. /4/2/1:120
        #[arg(value_name = "CFI")]
        cfi: String,
    },
}

#[derive(Args)]
struct InputArgs {
    /// EPUB archive or XHTML content document
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Spine item to load from an EPUB (0-based)
    #[arg(short, long, default_value_t = 0)]
    spine: usize,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<f64>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<f64>,
}

/// A loaded chapter and, for EPUBs, where it sits in the spine
struct Chapter {
    doc: Document,
    package: Option<EpubPackage>,
    spine: usize,
}

impl Chapter {
    fn load(args: &InputArgs) -> Result<Self> {
        let is_epub = args
            .input
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("epub"))
            .unwrap_or(false);

        if is_epub {
            let mut package = EpubPackage::from_path(&args.input)
                .with_context(|| format!("Failed to open {}", args.input.display()))?;
            let doc = package
                .spine_document(args.spine)
                .with_context(|| format!("Failed to load spine item {}", args.spine))?;
            return Ok(Self {
                doc,
                package: Some(package),
                spine: args.spine,
            });
        }

        Ok(Self {
            doc: read_markup(&args.input)?,
            package: None,
            spine: args.spine,
        })
    }

    /// Package-level form of a content CFI, when the chapter came from an EPUB
    fn package_cfi(&self, content_cfi: &str) -> Option<String> {
        let package = self.package.as_ref()?;
        match package.package_cfi(self.spine, content_cfi) {
            Ok(cfi) => Some(cfi.to_string()),
            Err(e) => {
                tracing::warn!("Failed to build package CFI for {}: {}", content_cfi, e);
                None
            }
        }
    }
}

fn read_markup(path: &Path) -> Result<Document> {
    let markup = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_markup(&markup))
}

fn probe_config(args: &InputArgs) -> ProbeConfig {
    let mut config = ProbeConfig::from_env();
    if let Some(width) = args.width.filter(|w| *w > 0.0) {
        config.frame.width = width;
    }
    if let Some(height) = args.height.filter(|h| *h > 0.0) {
        config.frame.height = height;
    }
    config
}

fn paginated_layout(config: &ProbeConfig) -> FlowLayout {
    FlowLayout::paginated(
        config.frame,
        config.metrics,
        config.frame.width - config.column_gap,
        config.column_gap,
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProbeReport {
    page: usize,
    page_count: usize,
    first_cfi: Option<String>,
    last_cfi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    package_cfi: Option<String>,
    bookmark: Bookmark,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocateReport {
    cfi: String,
    by_offsets: Option<usize>,
    by_rectangles: Option<usize>,
    selected: PageIndexMethod,
}

fn probe(input: &InputArgs, page: usize) -> Result<()> {
    let mut chapter = Chapter::load(input)?;
    let config = probe_config(input);

    let page_count = paginated_layout(&config).column_count(&chapter.doc);
    if page >= page_count {
        tracing::warn!("Page {} is past the last page ({})", page, page_count - 1);
    }

    let mut pagination = config.pagination(page_count);
    pagination.current_spread_index = page;
    pagination.page_offset = page as f64 * config.frame.width;

    let layout = FlowLayout::from_pagination(config.frame, config.metrics, &pagination);
    let navigator = CfiNavigator::new(&layout, config.navigator_options(pagination));

    let doc = &mut chapter.doc;
    let first_cfi = navigator.first_visible_text_offset_cfi(doc, VisibleContentOffsets::default());
    let last_cfi = navigator.last_visible_text_offset_cfi(doc, VisibleContentOffsets::default());
    if let (Some(first), Some(last)) = (&first_cfi, &last_cfi) {
        if compare_cfi_strings(first, last) == Some(std::cmp::Ordering::Greater) {
            tracing::warn!("First visible CFI {} sorts after last visible CFI {}", first, last);
        }
    }
    let bookmark = navigator.bookmark(doc, true);

    let package_cfi = first_cfi
        .as_deref()
        .and_then(|cfi| chapter.package_cfi(cfi));
    let report = ProbeReport {
        page,
        page_count,
        first_cfi,
        last_cfi,
        package_cfi,
        bookmark,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn locate(input: &InputArgs, cfi: &str) -> Result<()> {
    let mut chapter = Chapter::load(input)?;
    let config = probe_config(input);
    let content_cfi = cfi
        .trim_start_matches("epubcfi(")
        .trim_end_matches(')')
        .to_string();

    let page_count = paginated_layout(&config).column_count(&chapter.doc);
    let pagination = config.pagination(page_count);
    let layout = paginated_layout(&config);

    let [by_offsets, by_rectangles] =
        [PageIndexMethod::Offsets, PageIndexMethod::Rectangles].map(|method| {
            let mut options = config.navigator_options(pagination.clone());
            options.page_index_method = method;
            CfiNavigator::new(&layout, options).page_for_element_cfi(&mut chapter.doc, &content_cfi)
        });
    if by_offsets != by_rectangles {
        tracing::info!(
            "Page methods disagree for {}: offsets {:?}, rectangles {:?}",
            content_cfi,
            by_offsets,
            by_rectangles
        );
    }

    let report = LocateReport {
        cfi: content_cfi,
        by_offsets,
        by_rectangles,
        selected: config.page_index_method,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cfi_navigator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Probe { input, page } => probe(&input, page),
        Command::Locate { input, cfi } => locate(&input, &cfi),
    }
}
