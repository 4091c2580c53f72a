//! Progress-callback trait for per-page sorting events.
//!
//! Inject an [`Arc<dyn SortProgressCallback>`] via
//! [`crate::config::SortOptionsBuilder::progress_callback`] to receive events
//! as the orchestrator walks the document. Pages are processed strictly in
//! order on the calling thread, so events arrive in page order.
//!
//! # Example
//!
//! ```rust
//! use receipt_sorter::{SortOptions, SortProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     receipts: AtomicUsize,
//! }
//!
//! impl SortProgressCallback for CountingCallback {
//!     fn on_receipt(&self, page_num: usize, category: &str) {
//!         self.receipts.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}: {category}");
//!     }
//! }
//!
//! let options = SortOptions::builder()
//!     .progress_callback(Arc::new(CountingCallback { receipts: AtomicUsize::new(0) }))
//!     .build();
//! ```

use crate::output::SortReport;
use std::sync::Arc;

/// Called by the orchestrator as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The trait is `Send + Sync` so one callback can be
/// shared by hosts that run independent sorts on several threads.
pub trait SortProgressCallback: Send + Sync {
    /// Called once after the input is opened, before any page is segmented.
    fn on_sort_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is segmented.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called for every receipt as soon as it is classified.
    fn on_receipt(&self, page_num: usize, category: &str) {
        let _ = (page_num, category);
    }

    /// Called after all receipts of a page are classified.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, receipts_on_page: usize) {
        let _ = (page_num, total_pages, receipts_on_page);
    }

    /// Called once after the output document has been written.
    fn on_sort_complete(&self, report: &SortReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SortProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SortOptions`].
pub type ProgressCallback = Arc<dyn SortProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        categories: Mutex<Vec<String>>,
        started_total: AtomicUsize,
    }

    impl SortProgressCallback for TrackingCallback {
        fn on_sort_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_receipt(&self, _page_num: usize, category: &str) {
            self.categories.lock().unwrap().push(category.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_sort_start(2);
        cb.on_page_start(1, 2);
        cb.on_receipt(1, "CCB");
        cb.on_page_complete(1, 2, 1);
        cb.on_sort_complete(&SortReport::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_sort_start(2);
        tracker.on_page_start(1, 2);
        tracker.on_receipt(1, "CCB");
        tracker.on_receipt(1, "others");
        tracker.on_page_start(2, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(*tracker.categories.lock().unwrap(), vec!["CCB", "others"]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_page_start(1, 10);
        cb.on_page_complete(1, 10, 3);
    }
}
