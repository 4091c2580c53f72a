//! pdfium-backed implementation of the page abstraction.
//!
//! pdfium text segments (runs of text sharing a baseline and font) play the
//! role of words. Their bounds come back in bottom-up page space and are
//! flipped to top-down here, so everything above this module sees the same
//! coordinates as the segmenter expects.

use crate::error::SortError;
use crate::pipeline::document::{PageLayout, ReceiptDocument, ReceiptSink, Word};
use crate::pipeline::segment::Boundary;
use crate::pipeline::transform::{to_crop_rect, CropRect};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an existing pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to a pdfium shared library.
///
/// Resolution order: `explicit` path, `PDFIUM_LIB_PATH`, the platform
/// library in the current directory, then the system library search path.
/// A path may name the library file itself or the directory holding it.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, SortError> {
    if let Some(path) = explicit {
        return bind_at(path);
    }

    if let Ok(env_path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !env_path.is_empty() {
            return bind_at(Path::new(&env_path));
        }
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| SortError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

fn bind_at(path: &Path) -> Result<Pdfium, SortError> {
    let lib = if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    };
    debug!("Binding pdfium from {}", lib.display());
    Pdfium::bind_to_library(&lib)
        .map(Pdfium::new)
        .map_err(|e| SortError::PdfiumBindingFailed(format!("'{}': {e:?}", lib.display())))
}

/// Map a pdfium load failure onto the error taxonomy.
fn load_error(source_name: &str, password: Option<&str>, detail: String) -> SortError {
    if detail.contains("Password") || detail.contains("password") {
        if password.is_some() {
            SortError::WrongPassword {
                source_name: source_name.to_string(),
            }
        } else {
            SortError::PasswordRequired {
                source_name: source_name.to_string(),
            }
        }
    } else {
        SortError::Extraction {
            source_name: source_name.to_string(),
            page: None,
            detail,
        }
    }
}

fn checked_page_index(index: usize, total: usize, name: &str) -> Result<PdfPageIndex, SortError> {
    if index >= total {
        return Err(SortError::page_extraction(
            name,
            index,
            format!("page out of range (document has {total} pages)"),
        ));
    }
    PdfPageIndex::try_from(index).map_err(|e| SortError::page_extraction(name, index, e))
}

fn to_pdf_rect(rect: CropRect) -> PdfRect {
    PdfRect::new_from_values(rect.bottom, rect.left, rect.top, rect.right)
}

// ── Source document ──────────────────────────────────────────────────────

/// An input PDF opened through pdfium.
pub struct PdfiumDocument<'a> {
    name: String,
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    /// Open a PDF file. pdfium keeps the password for the document's lifetime.
    pub fn open(
        pdfium: &'a Pdfium,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Self, SortError> {
        let name = path.display().to_string();
        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| load_error(&name, password, format!("{e:?}")))?;
        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Self { name, document })
    }

    /// Open a PDF held in memory.
    pub fn from_bytes(
        pdfium: &'a Pdfium,
        bytes: &'a [u8],
        password: Option<&str>,
    ) -> Result<Self, SortError> {
        let name = "<memory>".to_string();
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| load_error(&name, password, format!("{e:?}")))?;
        info!("PDF loaded from memory: {} pages", document.pages().len());
        Ok(Self { name, document })
    }

    fn page(&self, index: usize) -> Result<PdfPage<'a>, SortError> {
        let idx = checked_page_index(index, self.page_count(), &self.name)?;
        self.document
            .pages()
            .get(idx)
            .map_err(|e| SortError::page_extraction(&self.name, index, format!("{e:?}")))
    }
}

impl ReceiptDocument for PdfiumDocument<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_layout(&self, page_index: usize) -> Result<PageLayout, SortError> {
        let page = self.page(page_index)?;
        let width = page.width().value;
        let height = page.height().value;

        let text = page
            .text()
            .map_err(|e| SortError::page_extraction(&self.name, page_index, format!("{e:?}")))?;

        let mut words = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            words.push(Word {
                text: content.to_string(),
                top: height - bounds.top().value,
                bottom: height - bounds.bottom().value,
            });
        }

        debug!(
            "Page {}: {}x{} pt, {} text segments",
            page_index + 1,
            width,
            height,
            words.len()
        );
        Ok(PageLayout {
            width,
            height,
            words,
        })
    }

    fn band_text(&self, page_index: usize, boundary: Boundary) -> Result<String, SortError> {
        let page = self.page(page_index)?;
        let rect = to_crop_rect(boundary, page.height().value, page.width().value);
        let text = page
            .text()
            .map_err(|e| SortError::page_extraction(&self.name, page_index, format!("{e:?}")))?;
        Ok(text.inside_rect(to_pdf_rect(rect)))
    }
}

// ── Output document ──────────────────────────────────────────────────────

/// A new PDF assembled from cropped copies of source pages.
pub struct PdfiumSink<'s, 'a> {
    source: &'s PdfiumDocument<'a>,
    target: PdfDocument<'a>,
    destination: PathBuf,
}

impl<'s, 'a> PdfiumSink<'s, 'a> {
    /// Start an empty output document. `destination` is only used in
    /// error messages; nothing is written until [`Self::to_bytes`].
    pub fn new(
        pdfium: &'a Pdfium,
        source: &'s PdfiumDocument<'a>,
        destination: &Path,
    ) -> Result<Self, SortError> {
        let target = pdfium.create_new_pdf().map_err(|e| SortError::Write {
            path: destination.to_path_buf(),
            detail: format!("failed to create output PDF: {e:?}"),
        })?;
        Ok(Self {
            source,
            target,
            destination: destination.to_path_buf(),
        })
    }

    /// Serialise the assembled document.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SortError> {
        self.target.save_to_bytes().map_err(|e| SortError::Write {
            path: self.destination.clone(),
            detail: format!("serialisation failed: {e:?}"),
        })
    }
}

impl ReceiptSink for PdfiumSink<'_, '_> {
    fn push_cropped_page(&mut self, page_index: usize, rect: CropRect) -> Result<(), SortError> {
        let destination = self.destination.clone();
        let write_err = |detail: String| SortError::Write {
            path: destination.clone(),
            detail: format!("source page {}: {detail}", page_index + 1),
        };

        let src_idx = checked_page_index(page_index, self.source.page_count(), &self.source.name)?;
        let dest_idx = self.target.pages().len();

        self.target
            .pages_mut()
            .copy_page_from_document(&self.source.document, src_idx, dest_idx)
            .map_err(|e| write_err(format!("copy failed: {e:?}")))?;

        let mut page = self
            .target
            .pages()
            .get(dest_idx)
            .map_err(|e| write_err(format!("{e:?}")))?;

        let pdf_rect = to_pdf_rect(rect);
        page.boundaries_mut()
            .set_crop(pdf_rect)
            .map_err(|e| write_err(format!("set crop box: {e:?}")))?;
        page.boundaries_mut()
            .set_media(pdf_rect)
            .map_err(|e| write_err(format!("set media box: {e:?}")))?;

        Ok(())
    }

    fn page_count(&self) -> usize {
        self.target.pages().len() as usize
    }
}
