//! Input resolution: validate the input file and derive output names.
//!
//! The `%PDF` magic bytes are checked before pdfium ever sees the file, so
//! callers get a clear "not a PDF" error instead of a generic parse failure.

use crate::error::SortError;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Marker inserted into generated output file names.
pub const SORTED_MARKER: &str = "_sorted";

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<PathBuf, SortError> {
    if !path.exists() {
        return Err(SortError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(SortError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SortError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(SortError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}

/// `<dir>/<stem>_sorted_<YYYYmmdd_HHMMSS>.pdf` next to the input.
pub fn default_output_path<Tz>(input: &Path, now: DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "receipts".to_string());
    let name = format!("{stem}{SORTED_MARKER}_{}.pdf", now.format("%Y%m%d_%H%M%S"));
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Whether a file name looks like a previous run's output.
pub fn is_generated_output(path: &Path) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .is_some_and(|stem| {
            stem.ends_with(SORTED_MARKER) || stem.contains(&format!("{SORTED_MARKER}_"))
        })
}

/// PDF files in `dir` that could be sorted, by file name.
///
/// Previous outputs (see [`is_generated_output`]) are excluded.
pub fn discover_inputs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .filter(|p| !is_generated_output(p))
        .collect();
    found.sort();
    Ok(found)
}
