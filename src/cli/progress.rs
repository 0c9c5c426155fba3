//! Progress bar for a running crawl.

use indicatif::{ProgressBar, ProgressStyle};

use super::icons::dim_arrow;

/// Tracks saved records against the results budget.
pub struct CrawlProgress {
    bar: ProgressBar,
}

impl CrawlProgress {
    pub fn new(results_wanted: u64) -> Self {
        let bar = ProgressBar::new(results_wanted);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})")
                .unwrap()
                .progress_chars("█▓░"),
        );
        bar.set_message("Crawling");
        Self { bar }
    }

    pub fn record_saved(&self, name: &str) {
        self.bar.inc(1);
        self.bar.set_message(truncate_name(name, 30));
    }

    pub fn listing_processed(&self, page_index: u32, new_candidates: usize) {
        self.bar.println(format!(
            "  {} Listing page {}: {} new doctors",
            dim_arrow(),
            page_index,
            new_candidates
        ));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Shorten a name for display, appending "..." when cut.
fn truncate_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let kept: String = name.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
