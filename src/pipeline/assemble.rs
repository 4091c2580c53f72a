//! Output assembly: copy, crop and order receipt pages.
//!
//! Categories are written in output order and receipts keep detection
//! order within a category. Categories absent from the output order are
//! dropped; they are reported, never an error.
//!
//! The finished document is written to a temporary file in the destination
//! directory and renamed over the destination only once fully serialised,
//! so a failed run never leaves a truncated PDF at the output path.

use crate::error::SortError;
use crate::output::{CategorizedReceipts, CategoryCount, SortReport};
use crate::pipeline::document::ReceiptSink;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Append every receipt to `sink` in `order`, as produced by
/// [`crate::config::ReceiptConfig::effective_output_order`].
///
/// Returns a report with `total_count`, `per_category_counts` and
/// `excluded_counts` filled in. Any copy/crop failure aborts the assembly.
pub fn assemble<S: ReceiptSink + ?Sized>(
    sink: &mut S,
    receipts: &CategorizedReceipts,
    order: &[String],
) -> Result<SortReport, SortError> {
    let mut report = SortReport::default();

    for category in order {
        let Some(items) = receipts.get(category) else {
            debug!("Category '{}' has no bucket; skipping", category);
            continue;
        };

        for receipt in items {
            sink.push_cropped_page(receipt.page_index, receipt.rect)?;
        }

        report.per_category_counts.push(CategoryCount {
            category: category.to_string(),
            count: items.len(),
        });
        report.total_count += items.len();
    }

    for (category, items) in receipts.iter() {
        if !items.is_empty() && !order.iter().any(|c| c == category) {
            warn!(
                "{} receipt(s) classified as '{}' are not in output_order and were dropped",
                items.len(),
                category
            );
            report.excluded_counts.push(CategoryCount {
                category: category.to_string(),
                count: items.len(),
            });
        }
    }

    info!(
        "Assembled {} receipt pages ({} in sink)",
        report.total_count,
        sink.page_count()
    );
    Ok(report)
}

/// Write `bytes` to `destination` through a temporary file in the same
/// directory, replacing the destination only on success.
pub fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<(), SortError> {
    let write_err = |detail: String| SortError::Write {
        path: destination.to_path_buf(),
        detail,
    };

    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".receipt-sorter-")
        .suffix(".pdf.tmp")
        .tempfile_in(parent)
        .map_err(|e| write_err(format!("cannot create temporary file: {e}")))?;

    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| write_err(e.to_string()))?;

    tmp.persist(destination)
        .map_err(|e| write_err(e.error.to_string()))?;

    debug!("Wrote {} bytes to {}", bytes.len(), destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReceiptConfig;
    use crate::output::Receipt;
    use crate::pipeline::transform::CropRect;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingSink {
        pages: Vec<(usize, CropRect)>,
        fail_on: Option<usize>,
    }

    impl ReceiptSink for RecordingSink {
        fn push_cropped_page(&mut self, page_index: usize, rect: CropRect) -> Result<(), SortError> {
            if self.fail_on == Some(page_index) {
                return Err(SortError::Write {
                    path: "out.pdf".into(),
                    detail: "boom".into(),
                });
            }
            self.pages.push((page_index, rect));
            Ok(())
        }

        fn page_count(&self) -> usize {
            self.pages.len()
        }
    }

    fn rect(top: f32) -> CropRect {
        CropRect { left: 0.0, bottom: top - 100.0, right: 595.0, top }
    }

    fn receipts(entries: &[(usize, &str)]) -> CategorizedReceipts {
        let mut r = CategorizedReceipts::with_categories(["CCB", "ICBC", "others"]);
        for (i, (page, category)) in entries.iter().enumerate() {
            r.push(Receipt {
                page_index: *page,
                rect: rect(800.0 - i as f32 * 10.0),
                category: category.to_string(),
            });
        }
        r
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn writes_in_output_order_then_detection_order() {
        let r = receipts(&[(0, "CCB"), (0, "ICBC"), (1, "CCB"), (2, "others")]);
        let mut sink = RecordingSink::default();
        let report = assemble(&mut sink, &r, &order(&["ICBC", "CCB", "others"])).unwrap();

        let pages: Vec<usize> = sink.pages.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![0, 0, 1, 2]);
        assert_eq!(sink.pages[0].1, rect(790.0));
        assert_eq!(sink.pages[1].1, rect(800.0));
        assert_eq!(report.total_count, 4);
        assert_eq!(report.count_for("CCB"), Some(2));
        assert!(report.excluded_counts.is_empty());
    }

    #[test]
    fn category_missing_from_order_is_dropped() {
        let r = receipts(&[(0, "CCB"), (1, "ICBC"), (2, "ICBC")]);
        let mut sink = RecordingSink::default();
        let report = assemble(&mut sink, &r, &order(&["CCB", "others"])).unwrap();

        assert_eq!(sink.page_count(), 1);
        assert_eq!(report.total_count, 1);
        assert_eq!(report.count_for("ICBC"), None);
        assert_eq!(
            report.excluded_counts,
            vec![CategoryCount { category: "ICBC".into(), count: 2 }]
        );
    }

    #[test]
    fn unknown_category_in_order_is_skipped() {
        let r = receipts(&[(0, "CCB")]);
        let mut sink = RecordingSink::default();
        let report = assemble(&mut sink, &r, &order(&["BOC", "CCB"])).unwrap();
        assert_eq!(report.total_count, 1);
        assert_eq!(report.count_for("BOC"), None);
    }

    #[test]
    fn empty_config_order_writes_declaration_order() {
        let config = ReceiptConfig::builder()
            .category("CCB", ["建设银行"])
            .category("ICBC", ["工商银行"])
            .build()
            .unwrap();
        let r = receipts(&[(3, "others"), (1, "ICBC"), (2, "CCB")]);
        let mut sink = RecordingSink::default();
        let report = assemble(&mut sink, &r, &config.effective_output_order()).unwrap();
        let pages: Vec<usize> = sink.pages.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![2, 1, 3]);
        assert_eq!(report.per_category_counts.len(), 3);
    }

    #[test]
    fn repeated_config_entry_is_written_once() {
        let config = ReceiptConfig::builder()
            .category("CCB", ["建设银行"])
            .output_order(["CCB", "CCB"])
            .build()
            .unwrap();
        let r = receipts(&[(0, "CCB")]);
        let mut sink = RecordingSink::default();
        let report = assemble(&mut sink, &r, &config.effective_output_order()).unwrap();
        assert_eq!(sink.page_count(), 1);
        assert_eq!(report.total_count, 1);
    }

    #[test]
    fn zero_count_categories_are_reported() {
        let r = receipts(&[(0, "CCB")]);
        let mut sink = RecordingSink::default();
        let report = assemble(&mut sink, &r, &order(&["CCB", "ICBC"])).unwrap();
        assert_eq!(report.count_for("ICBC"), Some(0));
    }

    #[test]
    fn sink_failure_aborts() {
        let r = receipts(&[(0, "CCB"), (1, "CCB")]);
        let mut sink = RecordingSink {
            fail_on: Some(1),
            ..Default::default()
        };
        let err = assemble(&mut sink, &r, &order(&["CCB"])).unwrap_err();
        assert!(matches!(err, SortError::Write { .. }));
    }

    #[test]
    fn atomic_write_creates_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("sorted.pdf");
        write_atomically(&dest, b"%PDF-1.7 first").unwrap();
        write_atomically(&dest, b"%PDF-1.7 second").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.7 second");

        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn atomic_write_failure_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the destination path makes the final rename fail.
        let dest = dir.path().join("sorted.pdf");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("keep"), b"x").unwrap();

        let err = write_atomically(&dest, b"%PDF").unwrap_err();
        assert!(matches!(err, SortError::Write { .. }));
        assert!(dest.join("keep").exists());
    }
}
