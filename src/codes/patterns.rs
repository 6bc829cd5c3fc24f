//! Pay-code recognition and normalization.
//!
//! All regex patterns are compile-time validated via the `lazy_regex!`
//! macro. Recognition is priority-ordered: the prefixed canonical form
//! wins over labelled and URI-wrapped forms, and a bare digit run is only
//! accepted provisionally (the validator rejects it with a corrective
//! message naming the prefix).

#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;

/// Canonical prefix immediately followed by six digits; whitespace,
/// dashes and dots between prefix and digits are tolerated.
static RE_PREFIXED: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)\bPAY(?:[\s.\-]*[0-9]){6}\b");

/// Labelling phrase (`code:`, `paycode:`) followed by the canonical form.
static RE_LABELED: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)\b(?:pay\s*code|code)\s*[:\-]?\s*PAY(?:[\s.\-]*[0-9]){6}\b");

/// URI-style wrapper (`paydesk://<verb>/`) followed by the canonical form.
static RE_URI: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)\bpaydesk://[a-z]+/\s*PAY(?:[\s.\-]*[0-9]){6}\b");

/// Bare run of exactly six digits with no prefix.
static RE_BARE_DIGITS: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\b[0-9]{6}\b");

/// Labelling keyword on its own, without a code attached.
static RE_LABEL_MARKER: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)\bpay\s*code\b|\bcode\s*:");

/// Deep-link scheme on its own.
static RE_URI_MARKER: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?i)\bpaydesk://");

/// Scan free text for a pay-code candidate.
///
/// Patterns are tried in a fixed priority order; the first match wins:
/// prefixed canonical form, labelled form, URI wrapper, then a bare
/// six-digit run. The returned candidate is already cleaned (separators
/// stripped, uppercased). A bare digit run comes back without the prefix
/// and is expected to fail validation with a corrective message.
///
/// # Examples
///
/// ```
/// use paydesk::codes::patterns::extract;
/// assert_eq!(extract("my code: pay 123-456 thanks"), Some("PAY123456".into()));
/// assert_eq!(extract("paydesk://pay/PAY654321"), Some("PAY654321".into()));
/// assert_eq!(extract("123456"), Some("123456".into()));
/// assert_eq!(extract("no code here"), None);
/// ```
#[must_use]
pub fn extract(text: &str) -> Option<String> {
    if let Some(m) = RE_PREFIXED.find(text) {
        return clean(m.as_str());
    }
    if let Some(m) = RE_LABELED.find(text) {
        // Strip the label, keep the canonical part
        if let Some(inner) = RE_PREFIXED.find(m.as_str()) {
            return clean(inner.as_str());
        }
    }
    if let Some(m) = RE_URI.find(text) {
        if let Some(inner) = RE_PREFIXED.find(m.as_str()) {
            return clean(inner.as_str());
        }
    }
    if let Some(m) = RE_BARE_DIGITS.find(text) {
        return Some(m.as_str().to_string());
    }
    None
}

/// Normalize raw input to candidate form: trim, drop everything outside
/// the alphanumeric set, uppercase. Returns `None` when nothing remains.
///
/// # Examples
///
/// ```
/// use paydesk::codes::patterns::clean;
/// assert_eq!(clean("  pay 123-456 "), Some("PAY123456".into()));
/// assert_eq!(clean("--- ..."), None);
/// ```
#[must_use]
pub fn clean(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Whether the text contains anything that should route to code handling:
/// the canonical prefixed pattern, a labelling keyword (even alone), or
/// the deep-link scheme.
///
/// Bare digit runs are deliberately NOT markers; they would hijack every
/// numeric amount entry. They are handled by the session-aware routing
/// rules and the no-session heuristics instead.
#[must_use]
pub fn has_code_marker(text: &str) -> bool {
    RE_PREFIXED.is_match(text) || RE_LABEL_MARKER.is_match(text) || RE_URI_MARKER.is_match(text)
}

/// Check the digit section against the suspicious-pattern denylist:
/// all-same-digit runs, strictly ascending or descending consecutive
/// sequences, and all-zero (a special case of all-same).
#[must_use]
pub fn is_suspicious_digits(digits: &str) -> bool {
    let bytes: Vec<u8> = digits.bytes().filter(u8::is_ascii_digit).collect();
    if bytes.len() < 2 {
        return false;
    }

    let all_same = bytes.windows(2).all(|w| w[0] == w[1]);
    let ascending = bytes.windows(2).all(|w| w[1] == w[0].wrapping_add(1));
    let descending = bytes.windows(2).all(|w| w[0] == w[1].wrapping_add(1));

    all_same || ascending || descending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefixed_variants() {
        assert_eq!(extract("PAY123456"), Some("PAY123456".into()));
        assert_eq!(extract("pay123456"), Some("PAY123456".into()));
        assert_eq!(extract("Pay 123 456"), Some("PAY123456".into()));
        assert_eq!(extract("PAY-123-456"), Some("PAY123456".into()));
        assert_eq!(extract("PAY.123.456"), Some("PAY123456".into()));
        assert_eq!(extract("please use PAY123456 today"), Some("PAY123456".into()));
    }

    #[test]
    fn test_extract_labeled_and_uri() {
        assert_eq!(extract("paycode: PAY111222"), Some("PAY111222".into()));
        assert_eq!(extract("code: pay 111-222"), Some("PAY111222".into()));
        assert_eq!(extract("paydesk://pay/PAY999888"), Some("PAY999888".into()));
        assert_eq!(extract("paydesk://redeem/pay 999 888"), Some("PAY999888".into()));
    }

    #[test]
    fn test_extract_bare_digits_provisional() {
        assert_eq!(extract("123456"), Some("123456".into()));
        // Prefixed form wins over a bare run elsewhere in the text
        assert_eq!(extract("654321 or PAY123456"), Some("PAY123456".into()));
    }

    #[test]
    fn test_extract_rejects_wrong_digit_counts() {
        // Five or seven digits after the prefix is not the canonical form
        assert_eq!(extract("PAY12345"), None);
        assert_eq!(extract("PAY1234567"), None);
        assert_eq!(extract("12345"), None);
        assert_eq!(extract("1234567"), None);
        // Embedded in a word, the prefix does not count
        assert_eq!(extract("REPAY123456"), None);
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("  pay-123.456  "), Some("PAY123456".into()));
        assert_eq!(clean(""), None);
        assert_eq!(clean(" .-- "), None);
    }

    #[test]
    fn test_code_markers() {
        assert!(has_code_marker("PAY123456"));
        assert!(has_code_marker("paycode"));
        assert!(has_code_marker("pay code please"));
        assert!(has_code_marker("code: whatever"));
        assert!(has_code_marker("paydesk://pay/"));
        // Bare digits and ordinary words are not markers
        assert!(!has_code_marker("123456"));
        assert!(!has_code_marker("pay 20"));
        assert!(!has_code_marker("decode this"));
    }

    #[test]
    fn test_suspicious_digits() {
        assert!(is_suspicious_digits("111111"));
        assert!(is_suspicious_digits("000000"));
        assert!(is_suspicious_digits("123456"));
        assert!(is_suspicious_digits("234567"));
        assert!(is_suspicious_digits("654321"));
        assert!(!is_suspicious_digits("135790"));
        assert!(!is_suspicious_digits("118822"));
    }
}
