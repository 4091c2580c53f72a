//! Result types: detected receipts and the run report.

use crate::pipeline::transform::CropRect;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// One detected receipt: which source page it comes from, where to crop
/// it (bottom-up PDF space) and how it was classified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    /// 0-indexed source page.
    pub page_index: usize,
    pub rect: CropRect,
    pub category: String,
}

/// Receipts bucketed by category.
///
/// Buckets keep their creation order and receipts keep detection order
/// within a bucket. Serialises as a JSON object in bucket order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedReceipts {
    buckets: Vec<(String, Vec<Receipt>)>,
}

impl CategorizedReceipts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create empty buckets in the given order.
    pub fn with_categories<S: Into<String>>(categories: impl IntoIterator<Item = S>) -> Self {
        let mut receipts = Self::new();
        for category in categories {
            receipts.bucket_mut(category.into());
        }
        receipts
    }

    /// Append a receipt to its category's bucket, creating the bucket if needed.
    pub fn push(&mut self, receipt: Receipt) {
        self.bucket_mut(receipt.category.clone()).push(receipt);
    }

    fn bucket_mut(&mut self, category: String) -> &mut Vec<Receipt> {
        let pos = match self.buckets.iter().position(|(c, _)| *c == category) {
            Some(pos) => pos,
            None => {
                self.buckets.push((category, Vec::new()));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[pos].1
    }

    /// Receipts of one category in detection order, if the bucket exists.
    pub fn get(&self, category: &str) -> Option<&[Receipt]> {
        self.buckets
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, r)| r.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Receipt])> {
        self.buckets.iter().map(|(c, r)| (c.as_str(), r.as_slice()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(c, _)| c.as_str())
    }

    /// Total number of receipts across all buckets.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, r)| r.len()).sum()
    }
}

impl Serialize for CategorizedReceipts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.buckets.iter().map(|(c, r)| (c, r)))
    }
}

/// Number of receipts in one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

fn serialize_counts<S: Serializer>(counts: &[CategoryCount], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(counts.iter().map(|c| (&c.category, c.count)))
}

/// Summary of a completed sort.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SortReport {
    /// Pages written to the output document.
    pub total_count: usize,

    /// Receipts written per category, in output order. Categories listed in
    /// the output order with no receipts are reported with a zero count.
    #[serde(serialize_with = "serialize_counts")]
    pub per_category_counts: Vec<CategoryCount>,

    /// Receipts that were detected but dropped because their category is
    /// not in the output order.
    #[serde(serialize_with = "serialize_counts")]
    pub excluded_counts: Vec<CategoryCount>,

    /// Pages scanned in the input document.
    pub pages_scanned: usize,

    /// Final output path, once written.
    pub output_path: Option<PathBuf>,

    /// Wall-clock duration of the whole run.
    pub duration_ms: u64,
}

impl SortReport {
    /// Written count for `category`, or `None` if it was not in the output order.
    pub fn count_for(&self, category: &str) -> Option<usize> {
        self.per_category_counts
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.count)
    }
}

/// Result of segmentation and classification without writing anything.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptPlan {
    pub pages_scanned: usize,
    pub output_order: Vec<String>,
    pub receipts: CategorizedReceipts,
}

impl ReceiptPlan {
    /// Receipts in the order they would be written.
    pub fn ordered(&self) -> impl Iterator<Item = &Receipt> {
        self.output_order
            .iter()
            .filter_map(|category| self.receipts.get(category))
            .flatten()
    }
}
