//! Orchestration: drive segmentation and classification page by page, then
//! assemble the output.
//!
//! Everything here is synchronous and single-threaded. Pages are processed
//! strictly in input order and bands in detection order; all receipts are
//! collected before assembly starts. No state outlives a call, so
//! independent documents can be sorted on separate threads.
//!
//! [`sort_document`] is the backend-agnostic core: `(document, config) →
//! (sink, report)`. [`sort_receipts`] and [`sort_receipts_from_bytes`] wire
//! it to pdfium and the filesystem.

use crate::config::{ReceiptConfig, SortOptions, OTHERS_CATEGORY};
use crate::error::SortError;
use crate::output::{CategorizedReceipts, Receipt, ReceiptPlan, SortReport};
use crate::pipeline::assemble::{assemble, write_atomically};
use crate::pipeline::classify::classify;
use crate::pipeline::document::{ReceiptDocument, ReceiptSink};
use crate::pipeline::input;
use crate::pipeline::pdf::{bind_pdfium, PdfiumDocument, PdfiumSink};
use crate::pipeline::segment::find_boundaries;
use crate::pipeline::transform::to_crop_rect;
use crate::progress::SortProgressCallback;
use pdfium_render::prelude::Pdfium;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Sort the receipts of a PDF file into a new PDF at `output`.
///
/// # Errors
/// - [`SortError::InputNotFound`] / [`SortError::NotAPdf`] before any page is read
/// - [`SortError::Extraction`] if the PDF or one of its pages cannot be parsed
/// - [`SortError::Write`] if the output cannot be assembled or written; the
///   destination is left untouched
pub fn sort_receipts(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ReceiptConfig,
    options: &SortOptions,
) -> Result<SortReport, SortError> {
    let start = Instant::now();
    let output_path = output_path.as_ref();
    info!("Sorting receipts: {}", input_path.as_ref().display());

    // ── Step 1: Validate input ───────────────────────────────────────────
    let pdf_path = input::resolve_local(input_path.as_ref())?;

    // ── Step 2: Open with pdfium ─────────────────────────────────────────
    let pdfium = bind_pdfium(options.pdfium_library.as_deref())?;
    let source = PdfiumDocument::open(&pdfium, &pdf_path, options.password.as_deref())?;

    run_pdfium(&pdfium, &source, output_path, config, options, start)
}

/// Sort the receipts of an in-memory PDF into a new PDF at `output`.
pub fn sort_receipts_from_bytes(
    bytes: &[u8],
    output_path: impl AsRef<Path>,
    config: &ReceiptConfig,
    options: &SortOptions,
) -> Result<SortReport, SortError> {
    let start = Instant::now();
    info!("Sorting receipts from {} in-memory bytes", bytes.len());

    let pdfium = bind_pdfium(options.pdfium_library.as_deref())?;
    let source = PdfiumDocument::from_bytes(&pdfium, bytes, options.password.as_deref())?;

    run_pdfium(&pdfium, &source, output_path.as_ref(), config, options, start)
}

fn run_pdfium<'a>(
    pdfium: &'a Pdfium,
    source: &PdfiumDocument<'a>,
    output_path: &Path,
    config: &ReceiptConfig,
    options: &SortOptions,
    start: Instant,
) -> Result<SortReport, SortError> {
    let progress = options.progress_callback.as_deref();

    // ── Step 3: Segment, classify, assemble ──────────────────────────────
    let mut sink = PdfiumSink::new(pdfium, source, output_path)?;
    let mut report = sort_document(source, &mut sink, config, progress)?;

    // ── Step 4: Serialise and replace the destination ────────────────────
    let bytes = sink.to_bytes()?;
    write_atomically(output_path, &bytes)?;

    report.output_path = Some(output_path.to_path_buf());
    report.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Sort complete: {} receipts from {} pages in {}ms → {}",
        report.total_count,
        report.pages_scanned,
        report.duration_ms,
        output_path.display()
    );

    if let Some(cb) = progress {
        cb.on_sort_complete(&report);
    }
    Ok(report)
}

/// Segment, classify and assemble without touching the filesystem.
///
/// Returns the report with `total_count`, counts and `pages_scanned` set.
pub fn sort_document<D, S>(
    document: &D,
    sink: &mut S,
    config: &ReceiptConfig,
    progress: Option<&dyn SortProgressCallback>,
) -> Result<SortReport, SortError>
where
    D: ReceiptDocument + ?Sized,
    S: ReceiptSink + ?Sized,
{
    let receipts = collect_receipts(document, config, progress)?;
    let mut report = assemble(sink, &receipts, &config.effective_output_order())?;
    report.pages_scanned = document.page_count();
    Ok(report)
}

/// Segment and classify every page, bucketing receipts by category.
///
/// Buckets for every declared category and for `"others"` exist up front,
/// so an empty `output_order` writes categories in declaration order.
pub fn collect_receipts<D>(
    document: &D,
    config: &ReceiptConfig,
    progress: Option<&dyn SortProgressCallback>,
) -> Result<CategorizedReceipts, SortError>
where
    D: ReceiptDocument + ?Sized,
{
    let total_pages = document.page_count();
    let mut receipts = CategorizedReceipts::with_categories(
        config
            .category_keywords
            .categories()
            .chain(std::iter::once(OTHERS_CATEGORY)),
    );

    if let Some(cb) = progress {
        cb.on_sort_start(total_pages);
    }

    for page_index in 0..total_pages {
        let page_num = page_index + 1;
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total_pages);
        }
        debug!("Analysing page {}/{}", page_num, total_pages);

        let layout = document.page_layout(page_index)?;
        let boundaries = find_boundaries(&layout, config);

        for boundary in &boundaries {
            let text = document.band_text(page_index, *boundary)?;
            let category = classify(&text, &config.category_keywords);
            let rect = to_crop_rect(*boundary, layout.height, layout.width);

            debug!(
                "Page {}: band {:.1}–{:.1} classified as '{}'",
                page_num, boundary.y_start, boundary.y_end, category
            );
            if let Some(cb) = progress {
                cb.on_receipt(page_num, category);
            }

            receipts.push(Receipt {
                page_index,
                rect,
                category: category.to_string(),
            });
        }

        if let Some(cb) = progress {
            cb.on_page_complete(page_num, total_pages, boundaries.len());
        }
    }

    info!(
        "Detected {} receipts on {} pages of {}",
        receipts.total(),
        total_pages,
        document.name()
    );
    Ok(receipts)
}

/// Segment and classify a PDF file without writing any output.
pub fn plan_receipts(
    input_path: impl AsRef<Path>,
    config: &ReceiptConfig,
    options: &SortOptions,
) -> Result<ReceiptPlan, SortError> {
    let pdf_path = input::resolve_local(input_path.as_ref())?;
    let pdfium = bind_pdfium(options.pdfium_library.as_deref())?;
    let source = PdfiumDocument::open(&pdfium, &pdf_path, options.password.as_deref())?;
    plan_document(&source, config, options.progress_callback.as_deref())
}

/// Backend-agnostic counterpart of [`plan_receipts`].
pub fn plan_document<D>(
    document: &D,
    config: &ReceiptConfig,
    progress: Option<&dyn SortProgressCallback>,
) -> Result<ReceiptPlan, SortError>
where
    D: ReceiptDocument + ?Sized,
{
    let receipts = collect_receipts(document, config, progress)?;
    let output_order = config.effective_output_order();
    Ok(ReceiptPlan {
        pages_scanned: document.page_count(),
        output_order,
        receipts,
    })
}
