//! # receipt-sorter
//!
//! Split scanned bank-receipt PDFs into one receipt per page and group the
//! receipts by bank.
//!
//! ## Why this crate?
//!
//! Online banking exports often pack two or three transfer receipts onto a
//! single A4 page, and a month of exports from several banks ends up in one
//! PDF. Bookkeeping wants the opposite: one receipt per page, grouped by
//! bank, in a fixed order. This crate finds each receipt from the position
//! of anchor text (e.g. "转账凭证"), classifies it by keywords found inside
//! its band, and writes a new PDF of cropped pages. The source pages are
//! copied, not rasterised, so text stays selectable.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path and %PDF magic
//!  ├─ 2. Segment   header/footer anchors → vertical bands per page
//!  ├─ 3. Classify  band text → first matching category, else "others"
//!  ├─ 4. Transform top-down band → bottom-up crop rectangle
//!  └─ 5. Assemble  copy + crop pages in output order, atomic write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use receipt_sorter::{sort_receipts, ReceiptConfig, SortOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReceiptConfig::from_file("config.json")?;
//!     let report = sort_receipts("receipts.pdf", "sorted.pdf", &config, &SortOptions::default())?;
//!     for c in &report.per_category_counts {
//!         eprintln!("{}: {}", c.category, c.count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sort-receipts` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! receipt-sorter = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod sort;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CategoryKeywords, CropMargins, ReceiptConfig, ReceiptConfigBuilder, SortOptions,
    SortOptionsBuilder, OTHERS_CATEGORY,
};
pub use error::SortError;
pub use output::{CategorizedReceipts, CategoryCount, Receipt, ReceiptPlan, SortReport};
pub use progress::{NoopProgressCallback, ProgressCallback, SortProgressCallback};
pub use sort::{
    collect_receipts, plan_document, plan_receipts, sort_document, sort_receipts,
    sort_receipts_from_bytes,
};
