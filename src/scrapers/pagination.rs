//! Listing pagination.
//!
//! Listing URLs page by a numeric offset path segment
//! (`/pakistan/lahore/dermatologist/10`). An explicit "next" link on the page
//! always wins over the offset arithmetic.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::markup::{attr_contains, class_contains, document_elements};
use crate::utils::to_absolute;

/// Offset stride between consecutive listing pages.
pub const PAGE_STRIDE: u64 = 10;

static REL_NEXT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [r#"link[rel="next"]"#, r#"a[rel="next"]"#]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Compute the URL of the next listing page, if any.
pub fn next_listing_url(document: &Html, current_url: &str) -> Option<String> {
    if let Some(href) = explicit_next_href(document) {
        if let Some(url) = to_absolute(&href, current_url) {
            return Some(url);
        }
    }
    next_offset_url(current_url)
}

/// Href of an explicit next-page link: `link[rel=next]`, `a[rel=next]`, or a
/// pagination anchor labelled or classed "next".
pub fn explicit_next_href(document: &Html) -> Option<String> {
    for selector in REL_NEXT_SELECTORS.iter() {
        let href = document
            .select(selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .filter(|href| !href.trim().is_empty());
        if let Some(href) = href {
            return Some(href.to_string());
        }
    }

    let pagination_anchors = || {
        document_elements(document)
            .filter(|el| class_contains(el, &["pagination"]))
            .flat_map(|container| {
                container
                    .descendants()
                    .skip(1)
                    .filter_map(scraper::ElementRef::wrap)
                    .filter(|el| el.value().name() == "a")
            })
    };

    let by_label = pagination_anchors().find(|a| attr_contains(a, "aria-label", &["next"]));
    let by_class = || pagination_anchors().find(|a| class_contains(a, &["next"]));

    by_label
        .or_else(by_class)
        .and_then(|a| a.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .map(str::to_string)
}

/// Derive the next page from the URL's offset segment.
///
/// - trailing numeric segment: advance it by [`PAGE_STRIDE`]
/// - no numeric segment at all: append the first offset
/// - numeric segment elsewhere in the path: no next page
pub fn next_offset_url(current_url: &str) -> Option<String> {
    let mut url = Url::parse(current_url).ok()?;
    url.set_fragment(None);

    let segments: Vec<String> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let is_offset = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let mut next: Vec<String> = segments.clone();
    match segments.last() {
        Some(last) if is_offset(last) => {
            let offset: u64 = last.parse().ok()?;
            let bumped = offset.checked_add(PAGE_STRIDE)?;
            if let Some(slot) = next.last_mut() {
                *slot = bumped.to_string();
            }
        }
        _ if segments.iter().any(|s| is_offset(s)) => return None,
        _ => next.push(PAGE_STRIDE.to_string()),
    }

    url.path_segments_mut().ok()?.clear().extend(next.iter());
    Some(url.to_string())
}
