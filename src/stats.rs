//! Descriptive statistics over sparse rating matrices.
//!
//! Everything here is derived from summary counts (distinct users, distinct
//! items, stored interactions, attribute assignments); the user x item matrix
//! is never materialized.
//!
//! A report has up to five independent sections:
//! - training data: users, items, interactions, sparsity, optional time range
//! - test data: same as training, skipped when no test set is given
//! - overlap: users/items of the test set unseen in training
//! - user attributes and item attributes: coverage of each attribute matrix
//!
//! A section that cannot be computed is logged and left out; it never stops
//! the others from being reported.

use crate::config::{ReportConfig, OVERLAP_TIMING_DECIMALS, REPORT_PERCENT_DECIMALS};
use crate::data::{AttributeMatrix, Dataset, RatingCollection, Timestamp};
use crate::error::{Result, StatsError};
use crate::time::format_timestamp;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::time::{Duration, Instant};

/// Size and fill of a conceptual user x item matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Density {
    pub num_users: u64,
    pub num_items: u64,
    pub interactions: u64,
    /// `num_users * num_items`
    pub matrix_size: u64,
    /// Cells without an interaction.
    pub empty_size: u64,
}

impl Density {
    /// Compute matrix and empty sizes in 64-bit arithmetic.
    ///
    /// Fails with `InvalidArgument` if the product overflows `u64` or if there
    /// are more interactions than cells.
    pub fn compute(num_users: u64, num_items: u64, interactions: u64) -> Result<Self> {
        let matrix_size = num_users.checked_mul(num_items).ok_or_else(|| {
            StatsError::InvalidArgument(format!(
                "matrix size {} x {} overflows 64 bits",
                num_users, num_items
            ))
        })?;
        let empty_size = matrix_size.checked_sub(interactions).ok_or_else(|| {
            StatsError::InvalidArgument(format!(
                "{} interactions exceed matrix size {}",
                interactions, matrix_size
            ))
        })?;
        Ok(Self {
            num_users,
            num_items,
            interactions,
            matrix_size,
            empty_size,
        })
    }

    pub fn of(ratings: &dyn RatingCollection) -> Result<Self> {
        Self::compute(
            ratings.user_count() as u64,
            ratings.item_count() as u64,
            ratings.interaction_count() as u64,
        )
    }

    /// Percentage of empty cells, or `DivisionUndefined` for a zero-size matrix.
    pub fn checked_sparsity_percent(&self) -> Result<f64> {
        if self.matrix_size == 0 {
            return Err(StatsError::DivisionUndefined {
                users: self.num_users,
                items: self.num_items,
            });
        }
        Ok(100.0 * self.empty_size as f64 / self.matrix_size as f64)
    }

    /// Percentage of empty cells. A zero-size matrix reports `0.0`.
    pub fn sparsity_percent(&self) -> f64 {
        self.checked_sparsity_percent().unwrap_or_else(|e| {
            debug!("{}; reporting sparsity as 0", e);
            0.0
        })
    }
}

/// Statistics for one dataset partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionStats {
    pub label: String,
    pub density: Density,
    pub sparsity_percent: f64,
    /// `(earliest, latest)` for timed datasets.
    pub time_range: Option<(Timestamp, Timestamp)>,
}

impl SectionStats {
    pub fn compute(label: &str, dataset: &Dataset<'_>) -> Result<Self> {
        let density = Density::of(dataset.ratings())?;
        Ok(Self {
            label: label.to_string(),
            sparsity_percent: density.sparsity_percent(),
            density,
            time_range: dataset.time_range(),
        })
    }

    fn render(&self, format_times: bool) -> String {
        let mut line = format!(
            "{} data: {} users, {} items, {} ratings, sparsity {:.*}",
            self.label,
            self.density.num_users,
            self.density.num_items,
            self.density.interactions,
            REPORT_PERCENT_DECIMALS,
            self.sparsity_percent
        );
        if let Some((earliest, latest)) = self.time_range {
            let (from, to) = if format_times {
                (format_timestamp(earliest), format_timestamp(latest))
            } else {
                (earliest.to_string(), latest.to_string())
            };
            line.push_str(&format!(", time range {} - {}", from, to));
        }
        line
    }
}

/// Entities of the test set that never occur in the training set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapStats {
    pub new_users: usize,
    pub new_items: usize,
    /// Wall-clock time spent computing both set differences.
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl OverlapStats {
    pub fn compute(training: &dyn RatingCollection, test: &dyn RatingCollection) -> Self {
        let start = Instant::now();
        let new_users = test.user_ids().difference(training.user_ids()).count();
        let new_items = test.item_ids().difference(training.item_ids()).count();
        Self {
            new_users,
            new_items,
            elapsed: start.elapsed(),
        }
    }

    fn render(&self) -> String {
        format!(
            "{} new users, {} new items (overlap computed in {:.*} seconds)",
            self.new_users,
            self.new_items,
            OVERLAP_TIMING_DECIMALS,
            self.elapsed.as_secs_f64()
        )
    }
}

fn serialize_secs<S>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

/// Which entity an attribute matrix describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    User,
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Item => write!(f, "item"),
        }
    }
}

/// Coverage of one attribute matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeCoverage {
    pub kind: EntityKind,
    pub attributes: usize,
    pub entities: usize,
    pub assignments: usize,
    pub non_empty_rows: usize,
    pub non_empty_columns: usize,
}

impl AttributeCoverage {
    pub fn compute(kind: EntityKind, matrix: &dyn AttributeMatrix) -> Self {
        Self {
            kind,
            attributes: matrix.column_count(),
            entities: matrix.row_count(),
            assignments: matrix.entry_count(),
            non_empty_rows: matrix.non_empty_row_ids().len(),
            non_empty_columns: matrix.non_empty_column_ids().len(),
        }
    }

    /// The "entities with attributes" figure printed in the report.
    ///
    /// User matrices report non-empty rows; item matrices report non-empty
    /// columns, matching the established output of the item report.
    pub fn reported_covered(&self) -> usize {
        match self.kind {
            EntityKind::User => self.non_empty_rows,
            EntityKind::Item => self.non_empty_columns,
        }
    }

    /// `(attributes, entities, assignments, covered)` in report order.
    pub fn summary(&self) -> (usize, usize, usize, usize) {
        (
            self.attributes,
            self.entities,
            self.assignments,
            self.reported_covered(),
        )
    }

    fn render(&self) -> String {
        format!(
            "{} {} attributes for {} {}s, {} assignments, {} {}s with attribute assignments",
            self.attributes,
            self.kind,
            self.entities,
            self.kind,
            self.assignments,
            self.reported_covered(),
            self.kind
        )
    }
}

/// All sections of one statistics run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub training: Option<SectionStats>,
    pub test: Option<SectionStats>,
    pub overlap: Option<OverlapStats>,
    pub user_attributes: Option<AttributeCoverage>,
    pub item_attributes: Option<AttributeCoverage>,
    #[serde(skip)]
    format_times: bool,
}

impl StatsReport {
    /// Human-readable lines, one per present section.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(training) = &self.training {
            lines.push(training.render(self.format_times));
        }
        if let Some(test) = &self.test {
            lines.push(test.render(self.format_times));
        }
        if let Some(overlap) = &self.overlap {
            lines.push(overlap.render());
        }
        if let Some(users) = &self.user_attributes {
            lines.push(users.render());
        }
        if let Some(items) = &self.item_attributes {
            lines.push(items.render());
        }
        lines
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        for line in self.lines() {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Builds [`StatsReport`]s from read-only datasets.
#[derive(Debug, Clone, Default)]
pub struct StatsReporter {
    config: ReportConfig,
}

impl StatsReporter {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Compute every section that the inputs allow.
    ///
    /// Overlap is only computed when a test set is given and
    /// `compute_overlap` is enabled. With `log_lines` enabled each rendered
    /// line is also emitted through `log::info!`.
    pub fn report(
        &self,
        training: Dataset<'_>,
        test: Option<Dataset<'_>>,
        user_attributes: Option<&dyn AttributeMatrix>,
        item_attributes: Option<&dyn AttributeMatrix>,
    ) -> StatsReport {
        let training_stats = section_or_warn("training", &training);
        let test_stats = test.as_ref().and_then(|t| section_or_warn("test", t));

        let overlap = match test {
            Some(t) if self.config.compute_overlap => {
                Some(OverlapStats::compute(training.ratings(), t.ratings()))
            }
            _ => None,
        };

        let user_coverage =
            user_attributes.map(|m| AttributeCoverage::compute(EntityKind::User, m));
        let item_coverage =
            item_attributes.map(|m| AttributeCoverage::compute(EntityKind::Item, m));

        let report = StatsReport {
            training: training_stats,
            test: test_stats,
            overlap,
            user_attributes: user_coverage,
            item_attributes: item_coverage,
            format_times: self.config.format_times,
        };

        if self.config.log_lines {
            for line in report.lines() {
                info!("{}", line);
            }
        }
        report
    }
}

fn section_or_warn(label: &str, dataset: &Dataset<'_>) -> Option<SectionStats> {
    match SectionStats::compute(label, dataset) {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!("Skipping {} statistics: {}", label, e);
            None
        }
    }
}

/// Report statistics with the default configuration and the given overlap flag.
pub fn report_statistics(
    training: Dataset<'_>,
    test: Option<Dataset<'_>>,
    user_attributes: Option<&dyn AttributeMatrix>,
    item_attributes: Option<&dyn AttributeMatrix>,
    compute_overlap: bool,
) -> StatsReport {
    let config = ReportConfig {
        compute_overlap,
        ..ReportConfig::default()
    };
    StatsReporter::new(config).report(training, test, user_attributes, item_attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BooleanMatrix, Rating, Ratings, UserId};
    use std::collections::HashSet;

    /// Collection that only knows its counts, like a huge external store.
    struct CountsOnly {
        users: HashSet<UserId>,
        items: HashSet<u32>,
        count: usize,
    }

    impl RatingCollection for CountsOnly {
        fn user_ids(&self) -> &HashSet<UserId> {
            &self.users
        }
        fn item_ids(&self) -> &HashSet<u32> {
            &self.items
        }
        fn interaction_count(&self) -> usize {
            self.count
        }
    }

    fn ratings(pairs: &[(u32, u32)]) -> Ratings {
        pairs
            .iter()
            .map(|&(user, item)| Rating {
                user,
                item,
                value: 1.0,
                time: None,
            })
            .collect()
    }

    #[test]
    fn density_of_small_matrix() {
        let density = Density::compute(4, 5, 10).unwrap();
        assert_eq!(density.matrix_size, 20);
        assert_eq!(density.empty_size, 10);
        assert_eq!(density.sparsity_percent(), 50.0);
    }

    #[test]
    fn density_uses_wide_arithmetic() {
        let density = Density::compute(100_000, 100_000, 1_000_000).unwrap();
        assert_eq!(density.matrix_size, 10_000_000_000);
        assert_eq!(density.empty_size, 9_999_000_000);
        assert!((density.sparsity_percent() - 99.99).abs() < 1e-9);
    }

    #[test]
    fn zero_size_matrix_reports_sentinel() {
        for (users, items) in [(0, 5), (4, 0), (0, 0)] {
            let density = Density::compute(users, items, 0).unwrap();
            assert_eq!(density.matrix_size, 0);
            assert_eq!(density.sparsity_percent(), 0.0);
            assert!(matches!(
                density.checked_sparsity_percent(),
                Err(StatsError::DivisionUndefined { .. })
            ));
        }
    }

    #[test]
    fn inconsistent_counts_are_rejected() {
        assert!(matches!(
            Density::compute(2, 2, 5),
            Err(StatsError::InvalidArgument(_))
        ));
        assert!(matches!(
            Density::compute(u64::MAX, 2, 0),
            Err(StatsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn overlap_counts_unseen_entities() {
        let train = ratings(&[(1, 10), (2, 20), (3, 30)]);
        let test = ratings(&[(2, 30), (3, 40), (4, 50), (5, 10)]);
        let overlap = OverlapStats::compute(&train, &test);
        assert_eq!(overlap.new_users, 2);
        assert_eq!(overlap.new_items, 2);
    }

    #[test]
    fn attribute_coverage_in_report_order() {
        let mut matrix = BooleanMatrix::with_dimensions(10, 3);
        for (row, col) in [(0, 0), (0, 1), (2, 2), (5, 0), (5, 2), (7, 1), (9, 0)] {
            matrix.set(row, col);
        }
        let coverage = AttributeCoverage::compute(EntityKind::User, &matrix);
        assert_eq!(coverage.summary(), (3, 10, 7, 5));
        assert_eq!(
            coverage.render(),
            "3 user attributes for 10 users, 7 assignments, 5 users with attribute assignments"
        );
    }

    #[test]
    fn item_coverage_reports_non_empty_columns() {
        let matrix: BooleanMatrix = [(0, 4), (1, 4), (2, 4), (3, 1)].into_iter().collect();
        let coverage = AttributeCoverage::compute(EntityKind::Item, &matrix);
        assert_eq!(coverage.non_empty_rows, 4);
        assert_eq!(coverage.non_empty_columns, 2);
        assert_eq!(coverage.reported_covered(), 2);
    }

    #[test]
    fn training_only_emits_one_line() {
        let train = ratings(&[(1, 1), (1, 2), (2, 1)]);
        let report = report_statistics(train.dataset(), None, None, None, true);
        let lines = report.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "training data: 2 users, 2 items, 3 ratings, sparsity 25.00000");
        assert!(report.overlap.is_none());
        assert!(report.test.is_none());
    }

    #[test]
    fn overlap_requires_flag() {
        let train = ratings(&[(1, 1)]);
        let test = ratings(&[(2, 2)]);
        let without = report_statistics(train.dataset(), Some(test.dataset()), None, None, false);
        assert_eq!(without.lines().len(), 2);
        assert!(without.overlap.is_none());

        let with = report_statistics(train.dataset(), Some(test.dataset()), None, None, true);
        assert_eq!(with.lines().len(), 3);
        assert_eq!(with.overlap.map(|o| (o.new_users, o.new_items)), Some((1, 1)));
    }

    #[test]
    fn failed_section_does_not_block_others() {
        let broken = CountsOnly {
            users: HashSet::from([1]),
            items: HashSet::from([1]),
            count: 3,
        };
        let matrix: BooleanMatrix = [(0, 0)].into_iter().collect();
        let report =
            StatsReporter::default().report(Dataset::plain(&broken), None, Some(&matrix), None);
        assert!(report.training.is_none());
        assert!(report.user_attributes.is_some());
        assert_eq!(report.lines().len(), 1);
    }

    #[test]
    fn timed_section_shows_time_range() {
        let mut train = Ratings::new();
        train.add_timed(1, 1, 4.0, 874_724_710);
        train.add_timed(2, 1, 3.0, 874_811_110);
        let report = StatsReporter::default().report(train.dataset(), None, None, None);
        let lines = report.lines();
        let line = &lines[0];
        assert!(line.ends_with("time range 1997-09-20 03:05:10 - 1997-09-21 03:05:10"), "{}", line);

        let raw = StatsReporter::new(ReportConfig {
            format_times: false,
            ..ReportConfig::default()
        })
        .report(train.dataset(), None, None, None);
        assert!(raw.lines()[0].ends_with("time range 874724710 - 874811110"));
    }

    #[test]
    fn report_serializes_to_json() {
        let train = ratings(&[(1, 1), (2, 2)]);
        let report = report_statistics(train.dataset(), None, None, None, false);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["training"]["density"]["matrix_size"], 4);
        assert_eq!(json["training"]["sparsity_percent"], 50.0);
        assert!(json["test"].is_null());
    }
}
