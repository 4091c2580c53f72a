//! Receipt classification by ordered keyword containment.
//!
//! Categories are tried in declaration order and the first keyword hit
//! wins. This is deliberately not longest-match: a receipt mentioning both
//! "建设银行" and "中国建设银行股份有限公司" goes to whichever category was
//! declared first. Matching is plain substring containment, so a short
//! keyword can match inside unrelated text.

use crate::config::{CategoryKeywords, OTHERS_CATEGORY};

/// Remove every whitespace character (spaces, tabs, newlines, full-width
/// spaces). Text extracted from a crop often breaks a bank name across
/// lines or pads it with spaces.
pub fn normalise_text(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Return the first declared category with a keyword contained in `text`,
/// or [`OTHERS_CATEGORY`].
pub fn classify<'k>(text: &str, keywords: &'k CategoryKeywords) -> &'k str {
    let clean = normalise_text(text);
    keywords
        .iter()
        .find(|(_, words)| words.iter().any(|k| clean.contains(k.as_str())))
        .map(|(category, _)| category)
        .unwrap_or(OTHERS_CATEGORY)
}
