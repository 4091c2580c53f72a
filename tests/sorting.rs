//! Integration tests for the sort pipeline against an in-memory document.
//!
//! `MemoryDocument` lays words out in top-down page space and answers band
//! text queries from the words whose top lies inside the band, so the whole
//! segment → classify → transform → assemble chain runs without pdfium.

use pretty_assertions::assert_eq;
use receipt_sorter::pipeline::document::{PageLayout, ReceiptDocument, ReceiptSink, Word};
use receipt_sorter::pipeline::segment::Boundary;
use receipt_sorter::pipeline::transform::CropRect;
use receipt_sorter::{plan_document, sort_document, ReceiptConfig, SortError};
use std::io;
use std::sync::{Arc, Mutex};

const WIDTH: f32 = 595.0;
const HEIGHT: f32 = 842.0;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct MemoryDocument {
    pages: Vec<Vec<Word>>,
    unreadable_page: Option<usize>,
}

impl MemoryDocument {
    fn new(pages: Vec<Vec<Word>>) -> Self {
        Self {
            pages,
            unreadable_page: None,
        }
    }
}

impl ReceiptDocument for MemoryDocument {
    fn name(&self) -> &str {
        "memory.pdf"
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_layout(&self, page_index: usize) -> Result<PageLayout, SortError> {
        if self.unreadable_page == Some(page_index) {
            return Err(SortError::Extraction {
                source_name: "memory.pdf".into(),
                page: Some(page_index + 1),
                detail: "corrupt content stream".into(),
            });
        }
        Ok(PageLayout {
            width: WIDTH,
            height: HEIGHT,
            words: self.pages[page_index].clone(),
        })
    }

    fn band_text(&self, page_index: usize, boundary: Boundary) -> Result<String, SortError> {
        Ok(self.pages[page_index]
            .iter()
            .filter(|w| w.top >= boundary.y_start && w.top < boundary.y_end)
            .map(|w| w.text.clone())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

#[derive(Default)]
struct MemorySink {
    pages: Vec<(usize, CropRect)>,
}

impl ReceiptSink for MemorySink {
    fn push_cropped_page(&mut self, page_index: usize, rect: CropRect) -> Result<(), SortError> {
        self.pages.push((page_index, rect));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }
}

fn word(text: &str, top: f32) -> Word {
    Word {
        text: text.to_string(),
        top,
        bottom: top + 12.0,
    }
}

fn bank_config() -> ReceiptConfig {
    ReceiptConfig::from_json_str(
        r#"{
            "header_anchors": ["转账凭证"],
            "footer_anchors": ["打印时间"],
            "crop_margins": {"top": 20},
            "category_keywords": {
                "ICBC": ["工商银行"],
                "CCB": ["建设银行"]
            },
            "output_order": ["ICBC", "CCB", "others"]
        }"#,
    )
    .unwrap()
}

/// Rect for a band `y_start..y_end` (top-down) on a full-width page.
fn rect(y_start: f32, y_end: f32) -> CropRect {
    CropRect {
        left: 0.0,
        bottom: HEIGHT - y_end,
        right: WIDTH,
        top: HEIGHT - y_start,
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn two_headers_without_footers_become_two_pages_in_header_order() {
    let config = ReceiptConfig::builder()
        .header_anchor("转账凭证")
        .margin_top(20.0)
        .category("CCB", ["建设银行"])
        .build()
        .unwrap();
    let doc = MemoryDocument::new(vec![vec![
        word("转账凭证", 100.0),
        word("付款人 张三", 130.0),
        word("转账凭证", 450.0),
        word("付款人 李四", 480.0),
    ]]);

    let mut sink = MemorySink::default();
    let report = sort_document(&doc, &mut sink, &config, None).unwrap();

    assert_eq!(report.total_count, 2);
    assert_eq!(sink.pages, vec![(0, rect(80.0, 430.0)), (0, rect(430.0, HEIGHT))]);
}

#[test]
fn footer_below_header_ends_the_band() {
    let doc = MemoryDocument::new(vec![vec![
        word("转账凭证", 100.0),
        word("中国工商银行", 150.0),
        word("打印时间 2024-03-01", 300.0),
        word("页脚广告", 600.0),
    ]]);

    let mut sink = MemorySink::default();
    sort_document(&doc, &mut sink, &bank_config(), None).unwrap();

    // footer bottom (312) + 5
    assert_eq!(sink.pages, vec![(0, rect(80.0, 317.0))]);
}

#[test]
fn receipt_text_is_classified_by_keyword() {
    let doc = MemoryDocument::new(vec![
        vec![word("中国建设银行转账凭证", 60.0)],
        vec![word("转账凭证", 60.0), word("某农村信用社", 90.0)],
    ]);

    let plan = plan_document(&doc, &bank_config(), None).unwrap();
    let categories: Vec<&str> = plan.ordered().map(|r| r.category.as_str()).collect();
    assert_eq!(categories, vec!["CCB", "others"]);
}

#[test]
fn no_header_anchors_fall_back_to_full_page() {
    let config = ReceiptConfig::builder()
        .category("CCB", ["建设银行"])
        .build()
        .unwrap();
    let doc = MemoryDocument::new(vec![vec![
        word("转账凭证", 100.0),
        word("中国建设银行", 130.0),
        word("转账凭证", 450.0),
    ]]);

    let mut sink = MemorySink::default();
    let report = sort_document(&doc, &mut sink, &config, None).unwrap();

    assert_eq!(sink.pages, vec![(0, rect(0.0, HEIGHT))]);
    assert_eq!(report.count_for("CCB"), Some(1));
}

// ── Ordering and exclusion ───────────────────────────────────────────────────

#[test]
fn pages_are_grouped_by_output_order() {
    let doc = MemoryDocument::new(vec![
        vec![
            word("转账凭证", 50.0),
            word("建设银行", 80.0),
            word("转账凭证", 400.0),
            word("工商银行", 430.0),
        ],
        vec![word("转账凭证", 50.0), word("建设银行", 80.0)],
        vec![word("转账凭证", 50.0), word("招商银行", 80.0)],
    ]);

    let mut sink = MemorySink::default();
    let report = sort_document(&doc, &mut sink, &bank_config(), None).unwrap();

    let pages: Vec<usize> = sink.pages.iter().map(|(p, _)| *p).collect();
    // ICBC (page 0), then CCB (pages 0, 1), then others (page 2)
    assert_eq!(pages, vec![0, 0, 1, 2]);
    assert_eq!(sink.pages[0].1, rect(380.0, HEIGHT));
    assert_eq!(sink.pages[1].1, rect(30.0, 380.0));
    assert_eq!(report.count_for("ICBC"), Some(1));
    assert_eq!(report.count_for("CCB"), Some(2));
    assert_eq!(report.count_for("others"), Some(1));
    assert_eq!(report.pages_scanned, 3);
}

#[test]
fn category_missing_from_output_order_writes_no_pages() {
    let mut config = bank_config();
    config.output_order = vec!["CCB".into()];

    let doc = MemoryDocument::new(vec![
        vec![word("转账凭证", 50.0), word("工商银行", 80.0)],
        vec![word("转账凭证", 50.0), word("建设银行", 80.0)],
        vec![word("转账凭证", 50.0), word("工商银行", 80.0)],
    ]);

    let mut sink = MemorySink::default();
    let report = sort_document(&doc, &mut sink, &config, None).unwrap();

    assert_eq!(sink.page_count(), 1);
    assert_eq!(report.total_count, 1);
    assert_eq!(report.count_for("ICBC"), None);
    let excluded: Vec<(&str, usize)> = report
        .excluded_counts
        .iter()
        .map(|c| (c.category.as_str(), c.count))
        .collect();
    assert_eq!(excluded, vec![("ICBC", 2)]);
}

#[test]
fn output_page_count_matches_receipts_in_order() {
    let mut config = bank_config();
    config.output_order = vec!["others".into(), "ICBC".into()];

    let doc = MemoryDocument::new(vec![
        vec![
            word("转账凭证", 50.0),
            word("工商银行", 80.0),
            word("转账凭证", 300.0),
            word("建设银行", 330.0),
            word("转账凭证", 550.0),
            word("光大银行", 580.0),
        ],
        vec![word("空白页", 200.0)],
    ]);

    let plan = plan_document(&doc, &config, None).unwrap();
    let expected = plan
        .receipts
        .iter()
        .filter(|(category, _)| config.output_order.iter().any(|o| o.as_str() == *category))
        .map(|(_, items)| items.len())
        .sum::<usize>();

    let mut sink = MemorySink::default();
    let report = sort_document(&doc, &mut sink, &config, None).unwrap();

    assert_eq!(expected, 3);
    assert_eq!(sink.page_count(), expected);
    assert_eq!(report.total_count, expected);
}

// ── Error propagation ────────────────────────────────────────────────────────

#[test]
fn unreadable_page_aborts_the_run() {
    let mut doc = MemoryDocument::new(vec![
        vec![word("转账凭证", 50.0), word("工商银行", 80.0)],
        vec![word("转账凭证", 50.0)],
    ]);
    doc.unreadable_page = Some(1);

    let mut sink = MemorySink::default();
    let err = sort_document(&doc, &mut sink, &bank_config(), None).unwrap_err();

    assert!(matches!(err, SortError::Extraction { page: Some(2), .. }));
    assert!(err.to_string().contains("corrupt content stream"));
    assert_eq!(sink.page_count(), 0);
}

// ── Logging ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn run_logs_document_name_and_warnings() {
    let mut config = bank_config();
    config.output_order = vec!["CCB".into(), "others".into()];
    let doc = MemoryDocument::new(vec![
        vec![word("转账凭证", 50.0), word("工商银行", 80.0)],
        vec![word("没有锚点", 50.0)],
    ]);

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let mut sink = MemorySink::default();
    tracing::subscriber::with_default(subscriber, || {
        sort_document(&doc, &mut sink, &config, None).unwrap();
    });

    let out = logs.contents();
    assert!(out.contains("on 2 pages of memory.pdf"), "logs: {out}");
    assert!(out.contains("No header anchor found"), "logs: {out}");
    assert!(out.contains("'ICBC' are not in output_order"), "logs: {out}");
    assert_eq!(sink.page_count(), 1);
}
