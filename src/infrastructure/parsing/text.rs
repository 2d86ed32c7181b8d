//! Small text helpers shared by the extractors

/// Collapse runs of whitespace (including NBSP and zero-width marks) into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{200e}' || c == '\u{200f}' || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-sensitive substring search that only matches on word boundaries.
/// Callers lower-case both sides first.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    find_word(haystack, needle).is_some()
}

/// Byte offset of the first word-bounded occurrence of `needle`
pub fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let at = start + pos;
        let end = at + needle.len();
        let before_ok = haystack[..at].chars().next_back().is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..].chars().next().is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(at);
        }
        start = at + haystack[at..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Whole-term equality; a trailing plural `s`/`es` on `term` is tolerated
pub fn is_term_or_plural(term: &str, word: &str) -> bool {
    match term.strip_prefix(word) {
        Some(rest) => rest.is_empty() || rest == "s" || rest == "es",
        None => false,
    }
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Parse a number that may use `,` as a decimal or thousands separator
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized = if raw.contains(',') && raw.contains('.') {
        raw.replace(',', "")
    } else if let Some((head, tail)) = raw.split_once(',') {
        if tail.len() == 3 && !tail.contains(',') && !head.is_empty() {
            format!("{head}{tail}")
        } else {
            format!("{head}.{tail}")
        }
    } else {
        raw.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn collapses_whitespace_and_marks() {
        assert_eq!(normalize_whitespace("  Item\u{a0}Weight \u{200e}:\n 727 g "), "Item Weight : 727 g");
    }

    #[rstest]
    #[case("made in usa today", "usa", true)]
    #[case("usage notes", "usa", false)]
    #[case("notebook stand", "book", false)]
    #[case("a book, signed", "book", true)]
    #[case("usa", "usa", true)]
    fn word_boundary_matching(#[case] haystack: &str, #[case] needle: &str, #[case] expected: bool) {
        assert_eq!(contains_word(haystack, needle), expected);
    }

    #[rstest]
    #[case("pan", "pan", true)]
    #[case("pans", "pan", true)]
    #[case("glasses", "glass", true)]
    #[case("headphones", "phone", false)]
    #[case("japanese", "pan", false)]
    #[case("toyota", "toy", false)]
    #[case("husband", "usb", false)]
    fn plural_tolerant_term_matching(#[case] term: &str, #[case] word: &str, #[case] expected: bool) {
        assert_eq!(is_term_or_plural(term, word), expected);
    }

    #[rstest]
    #[case("727", Some(727.0))]
    #[case("1,5", Some(1.5))]
    #[case("1,000", Some(1000.0))]
    #[case("2,250.5", Some(2250.5))]
    #[case("abc", None)]
    fn decimal_parsing(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_decimal(raw), expected);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("Müller Milch", 3), "Mül");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
