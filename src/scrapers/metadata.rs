//! JSON-LD structured metadata extraction.
//!
//! Profile and listing pages embed `application/ld+json` blocks describing
//! each doctor. The payload schema is not ours, so blocks are read as loose
//! `serde_json::Value`s and projected into [`PhysicianMetadata`] right here;
//! nothing downstream sees the untyped shape.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::utils::{clean_text, first_integer, first_number};

/// `@type` values that describe a doctor.
pub const PHYSICIAN_TYPES: &[&str] = &["Physician", "Doctor"];

static JSON_LD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// Typed view of a physician JSON-LD object. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicianMetadata {
    /// `url` exactly as published (may be relative).
    pub url: Option<String>,
    pub name: String,
    pub specialty: String,
    pub price_range: String,
    pub telephone: String,
    pub description: String,
    pub rating: Option<f64>,
    pub reviews_count: Option<u64>,
}

impl PhysicianMetadata {
    /// Project a JSON-LD object, returning `None` when it is not a physician.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if !has_physician_type(obj.get("@type")) {
            return None;
        }

        let rating_block = obj.get("aggregateRating");
        Some(Self {
            url: obj
                .get("url")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            name: text_field(obj.get("name")),
            specialty: normalize_specialty(value),
            price_range: text_field(obj.get("priceRange")),
            telephone: text_field(obj.get("telephone")),
            description: text_field(obj.get("description")),
            rating: rating_block
                .and_then(|r| r.get("ratingValue"))
                .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(first_number))),
            reviews_count: rating_block
                .and_then(|r| r.get("reviewCount").or_else(|| r.get("ratingCount")))
                .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(first_integer))),
        })
    }
}

fn has_physician_type(type_field: Option<&Value>) -> bool {
    match type_field {
        Some(Value::String(t)) => PHYSICIAN_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| PHYSICIAN_TYPES.contains(&t)),
        _ => false,
    }
}

/// Scalar JSON value as cleaned text.
fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => clean_text(s),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Resolve a physician's specialty from JSON-LD.
///
/// `medicalSpecialty` may be a plain string or an object carrying `name`
/// (string or list) and a `sameAs` alias list. Names are cleaned,
/// de-duplicated in first-seen order and joined with `", "`. Without a
/// `medicalSpecialty`, a flat `specialty` string is used.
pub fn normalize_specialty(value: &Value) -> String {
    let medical = match value.get("medicalSpecialty") {
        None | Some(Value::Null) => return text_field(value.get("specialty")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return text_field(value.get("specialty"))
        }
        Some(Value::String(s)) => return clean_text(s),
        Some(other) => other,
    };

    let mut names: Vec<String> = Vec::new();
    match medical {
        Value::Array(entries) => {
            for entry in entries {
                collect_specialty_names(entry, &mut names);
            }
        }
        entry => collect_specialty_names(entry, &mut names),
    }

    let mut seen = HashSet::new();
    let unique: Vec<String> = names
        .into_iter()
        .map(|n| clean_text(&n))
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect();
    unique.join(", ")
}

fn collect_specialty_names(entry: &Value, names: &mut Vec<String>) {
    match entry {
        Value::String(s) => names.push(s.clone()),
        Value::Object(obj) => {
            match obj.get("name") {
                Some(Value::String(s)) => names.push(s.clone()),
                Some(Value::Array(list)) => {
                    names.extend(list.iter().filter_map(Value::as_str).map(str::to_string))
                }
                _ => {}
            }
            if let Some(Value::Array(aliases)) = obj.get("sameAs") {
                names.extend(aliases.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }
        _ => {}
    }
}

/// All physician objects embedded in the page, in document order.
///
/// Blocks that fail to parse are skipped. Each block may hold one object, an
/// array of objects, or an `@graph` container.
pub fn extract_physicians(document: &Html) -> Vec<PhysicianMetadata> {
    let mut physicians = Vec::new();

    for script in document.select(&JSON_LD_SELECTOR) {
        let raw: String = script.text().collect();
        if raw.trim().is_empty() {
            continue;
        }

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                debug!("Skipping malformed JSON-LD block: {}", e);
                continue;
            }
        };

        for item in flatten_blocks(&parsed) {
            if let Some(physician) = PhysicianMetadata::from_value(item) {
                physicians.push(physician);
            }
        }
    }

    physicians
}

fn flatten_blocks(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten_blocks).collect(),
        Value::Object(map) => match map.get("@graph") {
            Some(Value::Array(graph)) => graph.iter().collect(),
            _ => vec![value],
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(blocks: &[&str]) -> Html {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{}</script>"#, b))
            .collect();
        Html::parse_document(&format!("<html><head>{}</head><body></body></html>", scripts))
    }

    #[test]
    fn test_extract_physicians_filters_types_and_flattens() {
        let doc = page(&[
            r#"{"@type":"Physician","name":"Dr. One","url":"/dr/a/1"}"#,
            r#"[{"@type":"Doctor","name":"Dr. Two"},{"@type":"Hospital","name":"City"}]"#,
            r#"{"@type":"BreadcrumbList"}"#,
        ]);
        let found = extract_physicians(&doc);
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. One", "Dr. Two"]);
        assert_eq!(found[0].url.as_deref(), Some("/dr/a/1"));
    }

    #[test]
    fn test_extract_physicians_skips_malformed_blocks() {
        let doc = page(&[
            r#"{"@type":"Physician", "name": "#,
            r#"{"@type":"Physician","name":"Dr. Valid"}"#,
        ]);
        let found = extract_physicians(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Dr. Valid");
    }

    #[test]
    fn test_extract_physicians_reads_graph() {
        let doc = page(&[r#"{"@graph":[{"@type":"WebPage"},{"@type":["Physician"],"name":"Dr. G"}]}"#]);
        let found = extract_physicians(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Dr. G");
    }

    #[test]
    fn test_normalize_specialty_object_dedupes() {
        let value = json!({
            "medicalSpecialty": {
                "name": ["Dermatologist", " Dermatologist ", "Cosmetologist"],
                "sameAs": ["Skin Specialist", "Cosmetologist"]
            }
        });
        assert_eq!(
            normalize_specialty(&value),
            "Dermatologist, Cosmetologist, Skin Specialist"
        );
    }

    #[test]
    fn test_normalize_specialty_string_and_fallback() {
        assert_eq!(
            normalize_specialty(&json!({"medicalSpecialty": "  Dermatology "})),
            "Dermatology"
        );
        assert_eq!(
            normalize_specialty(&json!({"specialty": "Skin  Specialist"})),
            "Skin Specialist"
        );
        assert_eq!(normalize_specialty(&json!({})), "");
    }

    #[test]
    fn test_physician_rating_projection() {
        let value = json!({
            "@type": "Physician",
            "name": "Dr. R",
            "priceRange": "Rs. 2,000",
            "aggregateRating": {"ratingValue": "4.7", "reviewCount": 312}
        });
        let physician = PhysicianMetadata::from_value(&value).unwrap();
        assert_eq!(physician.rating, Some(4.7));
        assert_eq!(physician.reviews_count, Some(312));
        assert_eq!(physician.price_range, "Rs. 2,000");
    }
}
