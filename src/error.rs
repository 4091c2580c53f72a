//! Error types for the receipt-sorter library.
//!
//! Every failure is fatal for the run that hit it. Sorting is a
//! single-document batch transform: one unreadable page or one failed write
//! means the output would be incomplete, so the whole call returns
//! `Err(SortError)` and no output file is finalised.
//!
//! The variants group into four families:
//!
//! * **Configuration**: [`SortError::ConfigLoad`], [`SortError::InvalidConfig`].
//!   Raised before the input is opened.
//! * **Input**: [`SortError::InputNotFound`], [`SortError::PermissionDenied`],
//!   [`SortError::NotAPdf`]. Also raised before any page is processed.
//! * **Extraction**: [`SortError::Extraction`], [`SortError::PasswordRequired`],
//!   [`SortError::WrongPassword`]. The PDF could not be parsed or a page's
//!   text/geometry could not be read.
//! * **Output**: [`SortError::Write`]. Assembling or saving the output failed;
//!   the destination path is left untouched.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the receipt-sorter library.
#[derive(Debug, Error)]
pub enum SortError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The configuration file is missing, unreadable or not valid JSON.
    #[error("Failed to load configuration '{path}': {detail}")]
    ConfigLoad { path: PathBuf, detail: String },

    /// The configuration parsed but violates a constraint.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The PDF is malformed, or a page's text or geometry could not be read.
    ///
    /// `page` is 1-indexed when the failure is tied to a specific page.
    #[error("Failed to extract {}from '{source_name}': {detail}", .page.map(|p| format!("page {p} ")).unwrap_or_default())]
    Extraction {
        source_name: String,
        page: Option<usize>,
        detail: String,
    },

    /// PDF requires a password but none was provided.
    #[error("PDF '{source_name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { source_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{source_name}'")]
    WrongPassword { source_name: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Copying, cropping or serialising the output document failed.
    #[error("Failed to write output file '{path}': {detail}")]
    Write { path: PathBuf, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
The pdfium shared library is loaded at runtime. You can:\n\
  • Pass --pdfium-lib /path/to/libpdfium.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
  • Place libpdfium next to the working directory or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),
}

impl SortError {
    /// Build an [`SortError::Extraction`] tied to a 0-indexed page.
    pub(crate) fn page_extraction(source_name: &str, page_index: usize, detail: impl ToString) -> Self {
        SortError::Extraction {
            source_name: source_name.to_string(),
            page: Some(page_index + 1),
            detail: detail.to_string(),
        }
    }
}
