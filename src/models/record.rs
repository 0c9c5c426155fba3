//! Doctor records produced by the crawl.
//!
//! A [`CandidateRecord`] is what a listing page tells us about a doctor. When
//! detail pages are collected it rides along with the detail request and is
//! merged with the [`DetailProfile`] extracted from the profile page.

use serde::{Deserialize, Serialize};

use crate::utils::clean_text;

/// Partial record extracted from a listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub consultation_fee: String,
    #[serde(default)]
    pub qualifications: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews_count: Option<u64>,
    #[serde(default)]
    pub city: String,
}

/// Fields extracted from a doctor's profile page.
///
/// Text fields are empty when neither metadata nor markup supplied them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailProfile {
    pub id: Option<String>,
    pub url: String,
    pub name: String,
    pub specialty: String,
    pub experience: String,
    pub consultation_fee: String,
    pub availability: String,
    pub wait_time: String,
    pub qualifications: String,
    pub rating: Option<f64>,
    pub reviews_count: Option<u64>,
    pub verified: bool,
    pub services: Vec<String>,
    pub phone: String,
    pub description: String,
    pub city: String,
}

/// A doctor record as written to the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRecord {
    pub id: String,
    pub url: String,
    pub name: String,
    pub specialty: String,
    pub experience: String,
    pub consultation_fee: String,
    pub availability: String,
    pub wait_time: String,
    pub qualifications: String,
    pub rating: Option<f64>,
    pub reviews_count: Option<u64>,
    #[serde(rename = "verifiedFlag")]
    pub verified: bool,
    pub services: Vec<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl DoctorRecord {
    /// Build a record straight from listing data (shallow crawls).
    pub fn from_candidate(candidate: &CandidateRecord, default_city: &str) -> Self {
        Self {
            id: candidate.id.clone(),
            url: candidate.url.clone(),
            name: clean_text(&candidate.name),
            specialty: clean_text(&candidate.specialty),
            experience: clean_text(&candidate.experience),
            consultation_fee: clean_text(&candidate.consultation_fee),
            availability: clean_text(&candidate.availability),
            qualifications: clean_text(&candidate.qualifications),
            rating: candidate.rating,
            reviews_count: candidate.reviews_count,
            city: prefer_text(&candidate.city, default_city),
            ..Default::default()
        }
    }

    /// Merge a profile with the listing data that led to it.
    ///
    /// Each field independently takes the profile's non-empty value, then the
    /// candidate's, then an empty default.
    pub fn merge(candidate: &CandidateRecord, profile: DetailProfile, default_city: &str) -> Self {
        let city = prefer_text(&profile.city, &prefer_text(&candidate.city, default_city));
        Self {
            id: profile
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| candidate.id.clone()),
            url: prefer_text(&profile.url, &candidate.url),
            name: prefer_text(&profile.name, &candidate.name),
            specialty: prefer_text(&profile.specialty, &candidate.specialty),
            experience: prefer_text(&profile.experience, &candidate.experience),
            consultation_fee: prefer_text(&profile.consultation_fee, &candidate.consultation_fee),
            availability: prefer_text(&profile.availability, &candidate.availability),
            qualifications: prefer_text(&profile.qualifications, &candidate.qualifications),
            wait_time: clean_text(&profile.wait_time),
            rating: profile.rating.or(candidate.rating),
            reviews_count: profile.reviews_count.or(candidate.reviews_count),
            verified: profile.verified,
            services: profile.services,
            city,
            phone: clean_text(&profile.phone),
            description: clean_text(&profile.description),
        }
    }

    /// Whether the record may be written to the dataset: it needs a name,
    /// and an id to be addressable.
    pub fn is_emittable(&self) -> bool {
        !self.name.is_empty() && !self.id.is_empty()
    }
}

/// Cleaned `primary` if non-empty, else cleaned `fallback`.
fn prefer_text(primary: &str, fallback: &str) -> String {
    let primary = clean_text(primary);
    if primary.is_empty() {
        clean_text(fallback)
    } else {
        primary
    }
}
