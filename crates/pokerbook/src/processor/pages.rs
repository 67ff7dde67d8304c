//! Page-number detection for imported file names.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static RE_PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)page[_-]0*(\d+)").unwrap());
static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());

/// Extracts a page number from a file name: `page_007` / `page-7` first,
/// otherwise the first run of digits.
pub fn extract_page_number(filename: &str) -> Option<u32> {
    RE_PAGE_MARKER
        .captures(filename)
        .or_else(|| RE_DIGITS.captures(filename))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Sorts paths by detected page number. Files without a number keep their
/// relative order after all numbered files.
pub fn sort_by_page_number(paths: &mut [PathBuf]) {
    paths.sort_by_key(|p| {
        let number = file_name(p).as_deref().and_then(extract_page_number);
        (number.is_none(), number.unwrap_or(0))
    });
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
