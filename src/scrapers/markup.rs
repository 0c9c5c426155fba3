//! Markup heuristics for pages without usable structured metadata.
//!
//! Fields are located by case-insensitive substring matches on `class`
//! attributes (the equivalent of `[class*="rating" i]`). Each field has a
//! ranked chain of extractors; the first one that yields non-empty text wins.

use scraper::{ElementRef, Html};

use crate::utils::clean_text;

pub const NAME_CLASSES: &[&str] = &["doctor-name", "name"];
pub const SPECIALTY_CLASSES: &[&str] = &["specialty", "specialization"];
pub const RATING_CLASSES: &[&str] = &["rating"];
pub const REVIEW_CLASSES: &[&str] = &["review"];
pub const EXPERIENCE_CLASSES: &[&str] = &["experience"];
pub const FEE_CLASSES: &[&str] = &["fee", "price"];
pub const QUALIFICATION_CLASSES: &[&str] = &["qualification", "degree"];
pub const WAIT_CLASSES: &[&str] = &["wait"];
pub const AVAILABILITY_CLASSES: &[&str] = &["available", "availability"];
pub const VERIFIED_CLASSES: &[&str] = &["pmdc", "verified"];
pub const SERVICE_CLASSES: &[&str] = &["service", "treatment"];

/// One ranked strategy for a field.
pub type Extractor<S> = fn(S) -> Option<String>;

/// Run extractors in order and return the first non-empty result.
pub fn first_non_empty<S: Copy>(scope: S, chain: &[Extractor<S>]) -> Option<String> {
    chain
        .iter()
        .filter_map(|extract| extract(scope))
        .find(|value| !value.is_empty())
}

/// True if the element's class attribute contains any needle, ignoring case.
pub fn class_contains(element: &ElementRef<'_>, needles: &[&str]) -> bool {
    attr_contains(element, "class", needles)
}

/// True if the named attribute contains any needle, ignoring case.
pub fn attr_contains(element: &ElementRef<'_>, attr: &str, needles: &[&str]) -> bool {
    element
        .value()
        .attr(attr)
        .map(|value| {
            let value = value.to_lowercase();
            needles.iter().any(|needle| value.contains(needle))
        })
        .unwrap_or(false)
}

/// Element descendants of `scope` (excluding `scope`) in document order.
pub fn descendant_elements<'a>(scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    scope.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// Every element in the document, in document order.
pub fn document_elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document.root_element().descendants().filter_map(ElementRef::wrap)
}

/// Cleaned text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Text of the first descendant whose class matches. Empty when the first
/// match has no text, like jQuery's `.first().text()`.
pub fn first_text_by_class(scope: ElementRef<'_>, needles: &[&str]) -> Option<String> {
    descendant_elements(scope)
        .find(|el| class_contains(el, needles))
        .map(element_text)
}

/// Text of the first descendant with the given tag name.
pub fn first_text_by_tag(scope: ElementRef<'_>, tags: &[&str]) -> Option<String> {
    descendant_elements(scope)
        .find(|el| tags.contains(&el.value().name()))
        .map(element_text)
}

/// Cleaned, non-empty texts of every descendant whose class matches.
pub fn all_texts_by_class(scope: ElementRef<'_>, needles: &[&str]) -> Vec<String> {
    descendant_elements(scope)
        .filter(|el| class_contains(el, needles))
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Whether any descendant's class matches.
pub fn any_class(scope: ElementRef<'_>, needles: &[&str]) -> bool {
    descendant_elements(scope).any(|el| class_contains(&el, needles))
}

/// Nearest `article`, `section` or `div` ancestor of an element.
pub fn enclosing_card(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "article" | "section" | "div"))
}
