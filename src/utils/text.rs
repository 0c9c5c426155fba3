//! Text normalization helpers shared by the extractors.
//!
//! All of these are pure and tolerate empty input. Scraped text is messy
//! (line breaks inside badges, runs of `&nbsp;`), so every field that ends up
//! in a record passes through [`clean_text`] first.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

static INTEGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// A digit run that sits between a `/` and a path separator, query,
/// fragment or the end of the URL.
static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+)(?:[/?#]|$)").unwrap());

/// Collapse whitespace runs to a single space and trim both ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First decimal or integer token in the text.
pub fn first_number(text: &str) -> Option<f64> {
    NUMBER_PATTERN
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// First integer token in the text, parsed base 10.
pub fn first_integer(text: &str) -> Option<u64> {
    INTEGER_PATTERN
        .find(text)
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Extract the numeric profile id from a profile URL.
///
/// `https://oladoc.com/pakistan/lahore/dr/dermatologist/jane-doe/4821?x=1#y`
/// yields `"4821"`.
pub fn id_from_url(url: &str) -> Option<String> {
    ID_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Resolve an href against a base URL. Empty hrefs resolve to nothing.
pub fn to_absolute(href: &str, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Dr.\n\t Jane   Doe  "), "Dr. Jane Doe");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text(" \n\t "), "");
    }

    #[test]
    fn test_clean_text_idempotent() {
        let samples = [
            "  a  b  ",
            "\u{a0}Rs.\u{a0}1,500\u{a0}",
            "line\r\nbreak",
            "already clean",
        ];
        for sample in samples {
            let once = clean_text(sample);
            assert_eq!(clean_text(&once), once);
            assert!(!once.starts_with(' ') && !once.ends_with(' '));
            assert!(!once.contains("  "));
        }
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("Rated 4.8 out of 5"), Some(4.8));
        assert_eq!(first_number("98% satisfied"), Some(98.0));
        assert_eq!(first_number("no digits"), None);
    }

    #[test]
    fn test_first_integer() {
        assert_eq!(first_integer("(1,234 reviews)"), Some(1));
        assert_eq!(first_integer("245 Reviews"), Some(245));
        assert_eq!(first_integer("4.5"), Some(4));
        assert_eq!(first_integer(""), None);
    }

    #[test]
    fn test_id_from_url_ignores_query_and_fragment() {
        let base = "https://oladoc.com/pakistan/lahore/dr/dermatologist/jane-doe/4821";
        assert_eq!(id_from_url(base), Some("4821".to_string()));
        assert_eq!(id_from_url(&format!("{base}?x=1#y")), Some("4821".to_string()));
        assert_eq!(id_from_url(&format!("{base}/")), Some("4821".to_string()));
        assert_eq!(id_from_url(&format!("{base}#reviews")), Some("4821".to_string()));
    }

    #[test]
    fn test_id_from_url_requires_segment_boundary() {
        assert_eq!(id_from_url("https://oladoc.com/dr/jane-doe"), None);
        assert_eq!(id_from_url("https://oladoc.com/dr/jane4821"), None);
        assert_eq!(id_from_url(""), None);
    }

    #[test]
    fn test_to_absolute() {
        assert_eq!(
            to_absolute("/dr/x/12", "https://oladoc.com/pakistan/lahore"),
            Some("https://oladoc.com/dr/x/12".to_string())
        );
        assert_eq!(
            to_absolute("https://other.com/a", "https://oladoc.com/"),
            Some("https://other.com/a".to_string())
        );
        assert_eq!(to_absolute("", "https://oladoc.com/"), None);
        assert_eq!(to_absolute("/a", "not a url"), None);
    }
}
