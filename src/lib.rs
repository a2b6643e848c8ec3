//! Analytical building blocks for collaborative-filtering datasets.
//!
//! - [`cache`]: memoizing wrappers for pure functions, unbounded or LRU.
//! - [`shuffle`]: in-place Fisher-Yates shuffle with an injectable generator.
//! - [`stats`]: density, overlap and attribute coverage reports computed from
//!   summary counts, without materializing the user x item matrix.
//!
//! The remaining modules supply the data views those pieces read
//! ([`data`]), CSV loading ([`loader`]) and timestamp handling ([`time`]).
//!
//! ```
//! use rating_stats::data::Ratings;
//! use rating_stats::stats::report_statistics;
//!
//! let mut train = Ratings::new();
//! train.add(1, 10, 4.0);
//! train.add(2, 10, 3.0);
//! train.add(2, 11, 5.0);
//!
//! let report = report_statistics(train.dataset(), None, None, None, false);
//! assert_eq!(report.lines().len(), 1);
//! ```

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod loader;
pub mod shuffle;
pub mod stats;
pub mod time;

pub use cache::{memoize, memoize_with_policy, CacheStats, Memoized, SharedMemoized};
pub use config::{CachePolicy, CsvLayout, ReportConfig};
pub use data::{AttributeMatrix, Dataset, RatingCollection, TimedRatingCollection};
pub use error::{Result, StatsError, TimeParseError};
pub use shuffle::{seed_default_rng, shuffle, shuffle_with};
pub use stats::{report_statistics, StatsReport, StatsReporter};
