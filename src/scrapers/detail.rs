//! Profile (detail) page extraction.

use std::collections::HashSet;

use scraper::{ElementRef, Html};

use super::markup::{
    all_texts_by_class, any_class, attr_contains, descendant_elements, element_text,
    first_non_empty, first_text_by_class, first_text_by_tag, Extractor, AVAILABILITY_CLASSES,
    EXPERIENCE_CLASSES, FEE_CLASSES, QUALIFICATION_CLASSES, RATING_CLASSES, REVIEW_CLASSES,
    SERVICE_CLASSES, SPECIALTY_CLASSES, VERIFIED_CLASSES, WAIT_CLASSES,
};
use super::metadata::{extract_physicians, PhysicianMetadata};
use crate::models::DetailProfile;
use crate::utils::{first_integer, first_number, id_from_url, to_absolute};

pub const MAX_QUALIFICATIONS: usize = 20;
pub const MAX_SERVICES: usize = 50;

/// Pick the physician whose URL matches the page, else the first one.
pub fn select_physician<'a>(
    physicians: &'a [PhysicianMetadata],
    page_url: &str,
) -> Option<&'a PhysicianMetadata> {
    physicians
        .iter()
        .find(|p| {
            p.url
                .as_deref()
                .and_then(|href| to_absolute(href, page_url))
                .is_some_and(|url| url == page_url)
        })
        .or_else(|| physicians.first())
}

/// Non-empty metadata text, if any.
fn metadata_text(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

fn markup_name(root: ElementRef<'_>) -> Option<String> {
    first_text_by_tag(root, &["h1"])
}

fn markup_specialty(root: ElementRef<'_>) -> Option<String> {
    first_text_by_class(root, SPECIALTY_CLASSES)
}

fn markup_specialty_test_id(root: ElementRef<'_>) -> Option<String> {
    descendant_elements(root)
        .find(|el| attr_contains(el, "data-testid", &["specialty"]))
        .map(element_text)
}

fn markup_fee(root: ElementRef<'_>) -> Option<String> {
    first_text_by_class(root, FEE_CLASSES)
}

/// Extract a profile from a detail page.
///
/// Metadata wins where present; everything else falls back to markup scoped
/// to the whole document. `city`, `url` and `id` always come from the
/// request.
pub fn extract_detail(document: &Html, page_url: &str, default_city: &str) -> DetailProfile {
    let physicians = extract_physicians(document);
    let physician = select_physician(&physicians, page_url);
    let root = document.root_element();

    let name_chain: [Extractor<ElementRef<'_>>; 1] = [markup_name];
    let specialty_chain: [Extractor<ElementRef<'_>>; 2] =
        [
            markup_specialty as Extractor<ElementRef<'_>>,
            markup_specialty_test_id as Extractor<ElementRef<'_>>,
        ];
    let fee_chain: [Extractor<ElementRef<'_>>; 1] = [markup_fee];

    let name = metadata_text(physician.map(|p| &p.name))
        .or_else(|| first_non_empty(root, &name_chain))
        .unwrap_or_default();
    let specialty = metadata_text(physician.map(|p| &p.specialty))
        .or_else(|| first_non_empty(root, &specialty_chain))
        .unwrap_or_default();
    let consultation_fee = metadata_text(physician.map(|p| &p.price_range))
        .or_else(|| first_non_empty(root, &fee_chain))
        .unwrap_or_default();

    let rating = physician.and_then(|p| p.rating).or_else(|| {
        first_text_by_class(root, RATING_CLASSES).and_then(|text| first_number(&text))
    });
    let reviews_count = physician.and_then(|p| p.reviews_count).or_else(|| {
        first_text_by_class(root, REVIEW_CLASSES).and_then(|text| first_integer(&text))
    });

    DetailProfile {
        id: id_from_url(page_url),
        url: page_url.to_string(),
        name,
        specialty,
        consultation_fee,
        rating,
        reviews_count,
        qualifications: qualifications(root),
        experience: first_text_by_class(root, EXPERIENCE_CLASSES).unwrap_or_default(),
        wait_time: first_text_by_class(root, WAIT_CLASSES).unwrap_or_default(),
        availability: first_text_by_class(root, AVAILABILITY_CLASSES).unwrap_or_default(),
        verified: any_class(root, VERIFIED_CLASSES),
        services: services(root),
        phone: metadata_text(physician.map(|p| &p.telephone)).unwrap_or_default(),
        description: metadata_text(physician.map(|p| &p.description)).unwrap_or_default(),
        city: default_city.to_string(),
    }
}

/// De-duplicated qualification entries joined with `", "`.
fn qualifications(root: ElementRef<'_>) -> String {
    let mut seen = HashSet::new();
    all_texts_by_class(root, QUALIFICATION_CLASSES)
        .into_iter()
        .filter(|q| seen.insert(q.clone()))
        .take(MAX_QUALIFICATIONS)
        .collect::<Vec<_>>()
        .join(", ")
}

fn services(root: ElementRef<'_>) -> Vec<String> {
    all_texts_by_class(root, SERVICE_CLASSES)
        .into_iter()
        .take(MAX_SERVICES)
        .collect()
}
