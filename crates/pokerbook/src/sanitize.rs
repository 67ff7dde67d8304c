//! Helpers for cleaning values before they reach span fields, file names
//! or PDF content streams.

use std::path::Path;

/// Returns only the filename component of a path.
///
/// Used for span fields so traces do not carry full directory paths.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Turns a book title into a safe file stem.
///
/// Alphanumerics (any script) are kept, whitespace becomes `_`, everything
/// else is dropped. An empty result becomes `book`.
pub fn file_stem(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_underscore = false;
    for c in title.trim().chars() {
        if c.is_alphanumeric() || c == '-' {
            out.push(c);
            last_underscore = false;
        } else if (c.is_whitespace() || c == '_') && !last_underscore && !out.is_empty() {
            out.push('_');
            last_underscore = true;
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "book".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Strips characters that break or pollute PDF text: control characters
/// other than newline and tab, zero-width characters, the replacement
/// character and box-drawing placeholders produced by OCR.
pub fn text_for_pdf(text: &str) -> String {
    text.chars()
        .filter(|&c| match c {
            '\n' | '\t' => true,
            '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}' => false,
            '\u{FFFD}' | '\u{25A1}' | '\u{25A0}' => false,
            c => !c.is_control(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/home/user/books/page_001.png")),
            "page_001.png"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Harrington on Hold'em"), "Harrington_on_Holdem");
        assert_eq!(file_stem("  Теория   покера  "), "Теория_покера");
        assert_eq!(file_stem("Vol. 2 / Part-1"), "Vol_2_Part-1");
        assert_eq!(file_stem("???"), "book");
    }

    #[test]
    fn test_text_for_pdf_drops_invisible_characters() {
        let dirty = "Pot\u{200B} odds\u{0007} \u{FFFD}are\tkey\n\u{25A1}";
        assert_eq!(text_for_pdf(dirty), "Pot odds are\tkey\n");
    }

    #[test]
    fn test_text_for_pdf_keeps_cyrillic() {
        assert_eq!(text_for_pdf("Шансы банка"), "Шансы банка");
    }
}
