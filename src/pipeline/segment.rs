//! Page segmentation: locate receipt boundaries from anchor text positions.
//!
//! A page of concatenated receipts is cut into vertical bands. Each band
//! starts a margin above a header anchor (e.g. "转账凭证") and ends either
//! just below the first footer anchor under that header or, failing that,
//! a margin above the next header. The last band on a page with no footer
//! below it runs to the bottom edge.
//!
//! No minimum-height check is applied: two header hits just over
//! [`HEADER_DEDUP_DISTANCE`] apart produce a very thin band. That band is
//! still emitted.

use crate::config::ReceiptConfig;
use crate::pipeline::document::{PageLayout, Word};
use serde::Serialize;
use tracing::{debug, warn};

/// Header hits closer than this (in points) to an already recorded header
/// are treated as the same header. Multi-token anchor text can otherwise
/// produce near-duplicate hits.
pub const HEADER_DEDUP_DISTANCE: f32 = 20.0;

/// Space kept below a footer anchor's bounding box.
pub const FOOTER_PADDING: f32 = 5.0;

/// A vertical band of a page in top-down space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Boundary {
    pub y_start: f32,
    pub y_end: f32,
}

impl Boundary {
    pub fn full_page(height: f32) -> Self {
        Self {
            y_start: 0.0,
            y_end: height,
        }
    }

    pub fn height(&self) -> f32 {
        self.y_end - self.y_start
    }
}

/// Split one page into receipt boundaries, in header order.
///
/// Falls back to a single full-page boundary when no header anchor matches.
pub fn find_boundaries(page: &PageLayout, config: &ReceiptConfig) -> Vec<Boundary> {
    let margin_top = config.crop_margins.top;
    let headers = header_positions(&page.words, &config.header_anchors);
    let footers = footer_words(&page.words, &config.footer_anchors);

    if headers.is_empty() {
        warn!("No header anchor found on page; treating the whole page as one receipt");
        return vec![Boundary::full_page(page.height)];
    }

    debug!(
        "Found {} header anchors and {} footer anchors",
        headers.len(),
        footers.len()
    );

    headers
        .iter()
        .enumerate()
        .map(|(i, &header_y)| {
            let y_start = (header_y - margin_top).max(0.0);

            let next_footer = footers
                .iter()
                .filter(|f| f.top > header_y)
                .min_by(|a, b| a.top.total_cmp(&b.top));

            let y_end = match (next_footer, headers.get(i + 1)) {
                (Some(footer), _) => footer.bottom + FOOTER_PADDING,
                (None, Some(&next_header)) => next_header - margin_top,
                (None, None) => page.height,
            };

            Boundary { y_start, y_end }
        })
        .collect()
}

/// Top coordinates of header hits for the first anchor that matches at all,
/// deduplicated and sorted ascending.
fn header_positions(words: &[Word], anchors: &[String]) -> Vec<f32> {
    for anchor in anchors {
        let mut positions: Vec<f32> = Vec::new();
        for word in words.iter().filter(|w| w.text.contains(anchor.as_str())) {
            if positions
                .iter()
                .all(|&y| (word.top - y).abs() > HEADER_DEDUP_DISTANCE)
            {
                positions.push(word.top);
            }
        }
        if !positions.is_empty() {
            debug!("Header anchor '{}' matched {} times", anchor, positions.len());
            positions.sort_by(f32::total_cmp);
            return positions;
        }
    }
    Vec::new()
}

/// Every word matching any footer anchor. All anchors are searched.
fn footer_words<'w>(words: &'w [Word], anchors: &[String]) -> Vec<&'w Word> {
    anchors
        .iter()
        .flat_map(|anchor| words.iter().filter(move |w| w.text.contains(anchor.as_str())))
        .collect()
}
