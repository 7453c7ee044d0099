use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.\-]").unwrap());

/// Parse a number as the DBD tables print it.
///
/// Thousands separators, currency words and `%` are dropped, `(1,234.50)`
/// is negative, and placeholders such as `-` or an empty cell give `None`.
/// A percentage cell yields the percentage itself: `"12.5%"` is `12.5`.
pub fn parse_number(text: &str) -> Option<f64> {
    let mut s = text.trim().replace('\u{2212}', "-");
    if s.is_empty() {
        return None;
    }

    let negative = s.starts_with('(') && s.ends_with(')');
    if negative {
        s = s[1..s.len() - 1].to_string();
    }

    let cleaned = NON_NUMERIC.replace_all(&s, "");
    if cleaned.chars().all(|c| c == '-' || c == '.') {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Collapse every run of whitespace (including NBSP) to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical form for label comparisons: NFC, whitespace removed.
///
/// Thai labels render with inconsistent spacing (`% เปลี่ยนแปลง` vs
/// `%เปลี่ยนแปลง`) and sometimes decomposed vowel marks.
pub fn canonical(text: &str) -> String {
    text.nfc().filter(|c| !c.is_whitespace()).collect()
}

/// Whether `haystack` contains every fragment, compared in canonical form.
pub fn contains_all(haystack: &str, fragments: &[String]) -> bool {
    let haystack = canonical(haystack);
    !fragments.is_empty()
        && fragments
            .iter()
            .all(|fragment| haystack.contains(&canonical(fragment)))
}

/// First `max` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(parse_number("1,234,567.89"), Some(1_234_567.89));
        assert_eq!(parse_number("  42 "), Some(42.0));
    }

    #[test]
    fn parentheses_mean_negative() {
        assert_eq!(parse_number("(1,234.50)"), Some(-1234.5));
        assert_eq!(parse_number("(3.40%)"), Some(-3.4));
    }

    #[test]
    fn percent_suffix_is_dropped() {
        assert_eq!(parse_number("12.5%"), Some(12.5));
        assert_eq!(parse_number("-7.25 %"), Some(-7.25));
        assert_eq!(parse_number("\u{2212}7.25%"), Some(-7.25));
    }

    #[test]
    fn placeholders_are_none() {
        for text in ["", "   ", "-", ".", "--", "()", "N/A", "ไม่มีข้อมูล"] {
            assert_eq!(parse_number(text), None, "{text:?}");
        }
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(parse_number("5-3"), None);
    }

    #[test]
    fn currency_words_are_ignored() {
        assert_eq!(parse_number("5,000,000.00 บาท"), Some(5_000_000.0));
    }

    #[test]
    fn idempotent_on_its_own_output() {
        for text in ["1,234.50", "(99.9)", "12.5%", "-0.01", "0", "(0.00%)", "1e3", "-", ""] {
            let once = parse_number(text);
            let twice = once.and_then(|v| parse_number(&v.to_string()));
            assert_eq!(once, twice, "{text:?}");
        }
    }

    #[test]
    fn canonical_ignores_spacing() {
        assert!(contains_all(
            "จำนวนเงิน % เปลี่ยนแปลง",
            &["จำนวนเงิน".into(), "%เปลี่ยนแปลง".into()]
        ));
        assert!(!contains_all("จำนวนเงิน", &["%เปลี่ยนแปลง".into()]));
        assert!(!contains_all("anything", &[]));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("บริษัท", 3), "บริ");
        assert_eq!(collapse_whitespace(" a \n\t b\u{a0}c "), "a b c");
    }
}
