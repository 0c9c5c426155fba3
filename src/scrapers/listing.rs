//! Listing page extraction.
//!
//! Two strategies are tried in order: embedded physician metadata, then
//! profile links found in the markup. The first non-empty result is used
//! exclusively.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::markup::{
    class_contains, descendant_elements, element_text, enclosing_card, first_non_empty,
    first_text_by_class, first_text_by_tag, Extractor, EXPERIENCE_CLASSES, FEE_CLASSES,
    NAME_CLASSES, RATING_CLASSES, REVIEW_CLASSES, SPECIALTY_CLASSES,
};
use super::metadata::{extract_physicians, PhysicianMetadata};
use crate::models::CandidateRecord;
use crate::utils::{clean_text, first_integer, first_number, id_from_url, to_absolute};

/// Path segment that marks a doctor profile URL.
pub const DETAIL_PATH_MARKER: &str = "/dr/";

pub(crate) static PROFILE_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/dr/"]"#).unwrap());

/// Which strategy produced a listing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    Metadata,
    Markup,
}

/// Candidates from one listing page, de-duplicated by id.
#[derive(Debug, Clone)]
pub struct ListingExtraction {
    pub source: ListingSource,
    pub candidates: Vec<CandidateRecord>,
}

/// Extract doctor candidates from a listing page.
pub fn extract_listing(document: &Html, page_url: &str, city: &str) -> ListingExtraction {
    let physicians = extract_physicians(document);
    let from_metadata = candidates_from_metadata(&physicians, page_url, city);

    let (source, candidates) = if from_metadata.is_empty() {
        (
            ListingSource::Markup,
            candidates_from_markup(document, page_url, city),
        )
    } else {
        (ListingSource::Metadata, from_metadata)
    };

    debug!(
        "Listing {} yielded {} candidates via {:?}",
        page_url,
        candidates.len(),
        source
    );

    ListingExtraction {
        source,
        candidates: dedupe_by_id(candidates),
    }
}

/// Build candidates from physician metadata whose URL points at a profile.
pub fn candidates_from_metadata(
    physicians: &[PhysicianMetadata],
    page_url: &str,
    city: &str,
) -> Vec<CandidateRecord> {
    physicians
        .iter()
        .filter_map(|physician| {
            let url = physician
                .url
                .as_deref()
                .and_then(|href| to_absolute(href, page_url))
                .filter(|url| url.contains(DETAIL_PATH_MARKER))?;
            let id = id_from_url(&url)?;
            Some(CandidateRecord {
                id,
                url,
                name: physician.name.clone(),
                specialty: physician.specialty.clone(),
                consultation_fee: physician.price_range.clone(),
                rating: physician.rating,
                reviews_count: physician.reviews_count,
                city: city.to_string(),
                ..Default::default()
            })
        })
        .collect()
}

/// A profile link together with the card that surrounds it.
#[derive(Clone, Copy)]
struct LinkScope<'a> {
    link: ElementRef<'a>,
    card: Option<ElementRef<'a>>,
}

fn heading_in_link(scope: LinkScope<'_>) -> Option<String> {
    first_text_by_tag(scope.link, &["h2", "h3"])
}

fn link_text(scope: LinkScope<'_>) -> Option<String> {
    Some(element_text(scope.link))
}

fn heading_or_name_in_card(scope: LinkScope<'_>) -> Option<String> {
    descendant_elements(scope.card?)
        .find(|el| matches!(el.value().name(), "h2" | "h3") || class_contains(el, NAME_CLASSES))
        .map(element_text)
}

/// Text of the first class match inside the card, or empty.
fn card_text(card: Option<ElementRef<'_>>, needles: &[&str]) -> String {
    card.and_then(|card| first_text_by_class(card, needles))
        .unwrap_or_default()
}

/// Build candidates from profile links and their surrounding cards.
pub fn candidates_from_markup(document: &Html, page_url: &str, city: &str) -> Vec<CandidateRecord> {
    let mut candidates = Vec::new();

    for link in document.select(&PROFILE_LINK_SELECTOR) {
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|href| to_absolute(href, page_url))
            .filter(|url| url.contains(DETAIL_PATH_MARKER))
        else {
            continue;
        };
        let Some(id) = id_from_url(&url) else {
            continue;
        };

        let card = enclosing_card(link);
        let scope = LinkScope { link, card };
        let name = name_for(scope);

        candidates.push(CandidateRecord {
            id,
            url,
            name,
            specialty: card_text(card, SPECIALTY_CLASSES),
            rating: first_number(&card_text(card, RATING_CLASSES)),
            reviews_count: first_integer(&card_text(card, REVIEW_CLASSES)),
            experience: card_text(card, EXPERIENCE_CLASSES),
            consultation_fee: card_text(card, FEE_CLASSES),
            city: city.to_string(),
            ..Default::default()
        });
    }

    candidates
}

/// Heading inside the link, else the link text, else a heading or
/// name-like element in the card.
fn name_for(scope: LinkScope<'_>) -> String {
    let chain: [Extractor<LinkScope<'_>>; 3] =
        [
        heading_in_link as Extractor<LinkScope<'_>>,
        link_text as Extractor<LinkScope<'_>>,
        heading_or_name_in_card as Extractor<LinkScope<'_>>,
    ];
    clean_text(&first_non_empty(scope, &chain).unwrap_or_default())
}

/// Keep the first occurrence of each id, preserving order.
pub fn dedupe_by_id(candidates: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}
