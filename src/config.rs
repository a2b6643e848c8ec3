//! Configuration for the cache, the statistics reporter and the CSV loader.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

// Cache sizing
pub const DEFAULT_CACHE_PREALLOC: usize = 64;

// Report formatting
pub const REPORT_PERCENT_DECIMALS: usize = 5;
pub const OVERLAP_TIMING_DECIMALS: usize = 3;

// CSV defaults
pub const DEFAULT_DELIMITER: u8 = b',';

/// Storage policy for a memoizing cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Keep every computed entry for the lifetime of the cache.
    #[default]
    Unbounded,
    /// Keep at most `capacity` entries, evicting the least recently used.
    Lru(NonZeroUsize),
}

impl CachePolicy {
    /// Bounded policy, or `None` when `capacity` is zero.
    pub fn lru(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(CachePolicy::Lru)
    }
}

/// Options for [`crate::stats::StatsReporter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Compute new users/items of the test set relative to the training set.
    pub compute_overlap: bool,
    /// Emit every rendered line through `log::info!`.
    pub log_lines: bool,
    /// Render timestamps as `YYYY-MM-DD HH:MM:SS` instead of raw epoch seconds.
    pub format_times: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            compute_overlap: false,
            log_lines: true,
            format_times: true,
        }
    }
}

/// Column layout of a ratings CSV file. Column indices are zero based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvLayout {
    pub user_column: usize,
    pub item_column: usize,
    pub rating_column: usize,
    pub time_column: Option<usize>,
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            user_column: 0,
            item_column: 1,
            rating_column: 2,
            time_column: None,
            has_header: false,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl CsvLayout {
    /// Layout with a fourth timestamp column, as in MovieLens-style exports.
    pub fn timed() -> Self {
        Self {
            time_column: Some(3),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_policy_rejects_zero_capacity() {
        assert_eq!(CachePolicy::lru(0), None);
        assert!(matches!(CachePolicy::lru(3), Some(CachePolicy::Lru(n)) if n.get() == 3));
        assert_eq!(CachePolicy::default(), CachePolicy::Unbounded);
    }

    #[test]
    fn timed_layout_reads_fourth_column() {
        let layout = CsvLayout::timed();
        assert_eq!(layout.time_column, Some(3));
        assert_eq!(layout.rating_column, 2);
    }

    #[test]
    fn report_config_field_names_are_stable() {
        let json = serde_json::to_value(ReportConfig::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "compute_overlap": false,
                "log_lines": true,
                "format_times": true,
            })
        );
    }
}
