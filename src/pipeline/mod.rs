//! Pipeline stages for receipt sorting.
//!
//! Each submodule implements exactly one step, so each can be tested
//! against plain data without a PDF backend.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ segment ──▶ classify ──▶ transform ──▶ assemble
//! (path)    (bands)     (category)   (crop rect)   (output PDF)
//! ```
//!
//! 1. [`input`]    : validate the input path, derive output names
//! 2. [`segment`]  : cut a page into receipt bands from anchor positions
//! 3. [`classify`] : first-match keyword classification of a band's text
//! 4. [`transform`]: top-down band → bottom-up crop rectangle
//! 5. [`assemble`] : copy, crop and order pages; atomic write
//!
//! [`document`] defines the page abstraction the stages share and [`pdf`]
//! implements it on top of pdfium.

pub mod assemble;
pub mod classify;
pub mod document;
pub mod input;
pub mod pdf;
pub mod segment;
pub mod transform;
