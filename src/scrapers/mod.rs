//! Page fetching and oladoc page extractors.

pub mod detail;
mod http_client;
pub mod listing;
pub mod markup;
pub mod metadata;
pub mod page_checks;
pub mod pagination;
pub mod rate_limiter;

pub use detail::extract_detail;
pub use http_client::{user_agent_for, HttpClient, DEFAULT_HEADERS, IMPERSONATE_USER_AGENTS};
pub use listing::{extract_listing, ListingExtraction, ListingSource};
pub use metadata::{extract_physicians, PhysicianMetadata};
pub use page_checks::{check_listing_page, is_likely_blocked_or_wrong_page, ListingPageCheck};
pub use pagination::{next_listing_url, PAGE_STRIDE};
pub use rate_limiter::RateLimiter;
