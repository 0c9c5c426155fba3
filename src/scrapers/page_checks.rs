//! Page-level sanity checks run before extraction.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::listing::PROFILE_LINK_SELECTOR;
use super::metadata::extract_physicians;
use crate::utils::clean_text;

/// Title fragments that indicate an anti-bot or access-denied page.
pub const BLOCKED_TITLE_MARKERS: &[&str] = &["access denied", "forbidden", "robot"];

/// Body phrases a genuine, empty listing page shows.
pub const NO_RESULTS_PHRASES: &[&str] = &[
    "no doctors found",
    "no doctor found",
    "no results found",
    "could not find",
];

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Cleaned, lowercased document title, empty when missing.
pub fn page_title(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| clean_text(&t.text().collect::<String>()).to_lowercase())
        .unwrap_or_default()
}

pub fn is_blocked_title(title: &str) -> bool {
    let title = clean_text(title).to_lowercase();
    BLOCKED_TITLE_MARKERS.iter().any(|m| title.contains(m))
}

/// Whether the page carries anything that looks like doctor content.
pub fn has_doctor_markers(document: &Html) -> bool {
    document.select(&PROFILE_LINK_SELECTOR).next().is_some()
        || !extract_physicians(document).is_empty()
}

/// A genuine listing page that reports zero matches.
pub fn is_no_results_listing(document: &Html) -> bool {
    let body = document
        .select(&BODY_SELECTOR)
        .next()
        .map(|b| clean_text(&b.text().collect::<String>()).to_lowercase())
        .unwrap_or_default();
    NO_RESULTS_PHRASES.iter().any(|p| body.contains(p))
}

/// Outcome of checking a listing page before extracting from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingPageCheck {
    /// Extract candidates normally.
    Usable,
    /// The site says there is nothing to list; stop paginating.
    NoResults,
    /// Anti-bot page or unrelated content.
    Blocked(String),
}

/// Classify a listing page.
///
/// A blocked title always wins. A page without doctor markers is accepted as
/// empty when it shows a no-results phrase, otherwise it is treated as
/// blocked or wrong.
pub fn check_listing_page(document: &Html) -> ListingPageCheck {
    let title = page_title(document);
    if is_blocked_title(&title) {
        return ListingPageCheck::Blocked(format!("blocked page title \"{}\"", title));
    }
    if has_doctor_markers(document) {
        return ListingPageCheck::Usable;
    }
    if is_no_results_listing(document) {
        return ListingPageCheck::NoResults;
    }
    ListingPageCheck::Blocked("no doctor content on listing page".to_string())
}

/// Blocked title, or no doctor content at all.
pub fn is_likely_blocked_or_wrong_page(document: &Html) -> bool {
    is_blocked_title(&page_title(document)) || !has_doctor_markers(document)
}
