//! The page abstraction shared by every pipeline stage.
//!
//! Segmentation needs word positions, classification needs the text of a
//! band, and assembly needs to copy a page and rewrite its page boxes.
//! [`ReceiptDocument`] covers the read side and [`ReceiptSink`] the write
//! side, so the orchestrator and assembler work the same against pdfium
//! ([`crate::pipeline::pdf`]) or an in-memory document in tests.

use crate::error::SortError;
use crate::pipeline::segment::Boundary;
use crate::pipeline::transform::CropRect;

/// A piece of extracted text with its vertical extent in top-down space.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub top: f32,
    pub bottom: f32,
}

/// Geometry and words of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub words: Vec<Word>,
}

/// Random-access, read-only view of the input document.
pub trait ReceiptDocument {
    /// Human-readable name used in error messages (usually the file path).
    fn name(&self) -> &str;

    fn page_count(&self) -> usize;

    /// Page size and words, in top-down coordinates.
    fn page_layout(&self, page_index: usize) -> Result<PageLayout, SortError>;

    /// Text inside a full-width band of the page.
    fn band_text(&self, page_index: usize, boundary: Boundary) -> Result<String, SortError>;
}

/// Output document under construction.
pub trait ReceiptSink {
    /// Append a copy of source page `page_index` with both its crop box and
    /// its media box set to `rect`. Setting only the crop box is not enough:
    /// some viewers display the media box.
    fn push_cropped_page(&mut self, page_index: usize, rect: CropRect) -> Result<(), SortError>;

    /// Pages appended so far.
    fn page_count(&self) -> usize;
}
