//! oladoc-scraper - doctor directory crawler for oladoc.com.
//!
//! Walks specialty listing pages, optionally visits each doctor's profile,
//! and emits one normalized [`models::DoctorRecord`] per doctor.

pub mod config;
pub mod crawler;
pub mod dataset;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod scrapers;
pub mod utils;
