//! Data models for doctor records.

mod record;

pub use record::{CandidateRecord, DetailProfile, DoctorRecord};
