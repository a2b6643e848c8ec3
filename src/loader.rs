//! CSV readers for rating data and attribute assignments.
//!
//! These are conveniences for building the in-memory [`Ratings`] and
//! [`BooleanMatrix`] views from files; the statistics, cache and shuffle
//! modules do not depend on them and accept any implementation of the
//! collection traits.
//!
//! Malformed rows are skipped with a warning so one bad line does not lose a
//! whole file; I/O and encoding failures abort the read.

use crate::config::{CsvLayout, DEFAULT_DELIMITER};
use crate::data::{AttributeMatrix, BooleanMatrix, Rating, RatingCollection, Ratings};
use crate::error::{Result, StatsError};
use crate::time::parse_timestamp;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{info, warn};
use serde::Deserialize;
use std::io::Read;

/// One `entity,attribute` line of an attribute file.
#[derive(Debug, Deserialize)]
struct AttributeRow {
    entity: u32,
    attribute: u32,
}

fn reader_builder(has_header: bool, delimiter: u8) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(has_header)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All);
    builder
}

fn line_of(record: &StringRecord, fallback: usize) -> u64 {
    record.position().map_or(fallback as u64, |p| p.line())
}

fn field<'r>(record: &'r StringRecord, column: usize, name: &str) -> Result<&'r str> {
    record.get(column).ok_or_else(|| {
        StatsError::InvalidArgument(format!(
            "{} column {} missing (row has {} fields)",
            name,
            column,
            record.len()
        ))
    })
}

fn parse_rating(record: &StringRecord, layout: &CsvLayout) -> Result<Rating> {
    let user_str = field(record, layout.user_column, "user")?;
    let item_str = field(record, layout.item_column, "item")?;
    let value_str = field(record, layout.rating_column, "rating")?;

    let user = user_str
        .parse::<u32>()
        .map_err(|_| StatsError::InvalidArgument(format!("invalid user id '{}'", user_str)))?;
    let item = item_str
        .parse::<u32>()
        .map_err(|_| StatsError::InvalidArgument(format!("invalid item id '{}'", item_str)))?;
    let value = value_str
        .parse::<f32>()
        .map_err(|_| StatsError::InvalidArgument(format!("invalid rating '{}'", value_str)))?;
    let time = match layout.time_column {
        Some(column) => Some(parse_timestamp(field(record, column, "time")?)?),
        None => None,
    };

    Ok(Rating {
        user,
        item,
        value,
        time,
    })
}

/// Read ratings from any reader. Duplicate (user, item) rows keep the last rating.
pub fn read_ratings<R: Read>(reader: R, layout: &CsvLayout) -> Result<Ratings> {
    let mut csv_reader = reader_builder(layout.has_header, layout.delimiter).from_reader(reader);
    let mut ratings = Ratings::new();
    let mut skipped = 0usize;

    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        match parse_rating(&record, layout) {
            Ok(rating) => ratings.push(rating),
            Err(e) => {
                warn!("Skipping line {}: {}", line_of(&record, i + 1), e);
                skipped += 1;
            }
        }
    }

    info!(
        "Loaded {} ratings from {} users and {} items ({} lines skipped)",
        ratings.interaction_count(),
        ratings.user_count(),
        ratings.item_count(),
        skipped
    );
    Ok(ratings)
}

pub fn read_ratings_from_csv_string(content: &str, layout: &CsvLayout) -> Result<Ratings> {
    read_ratings(content.as_bytes(), layout)
}

/// Read `entity,attribute` pairs into a boolean matrix.
pub fn read_attributes<R: Read>(
    reader: R,
    has_header: bool,
    delimiter: u8,
) -> Result<BooleanMatrix> {
    let mut csv_reader = reader_builder(has_header, delimiter).from_reader(reader);
    let mut matrix = BooleanMatrix::new();
    let mut skipped = 0usize;

    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        match record.deserialize::<AttributeRow>(None) {
            Ok(row) => {
                matrix.set(row.entity, row.attribute);
            }
            Err(e) => {
                warn!("Skipping line {}: {}", line_of(&record, i + 1), e);
                skipped += 1;
            }
        }
    }

    info!(
        "Loaded {} attribute assignments for {} entities ({} lines skipped)",
        matrix.entry_count(),
        matrix.non_empty_row_ids().len(),
        skipped
    );
    Ok(matrix)
}

pub fn read_attributes_from_csv_string(content: &str) -> Result<BooleanMatrix> {
    read_attributes(content.as_bytes(), false, DEFAULT_DELIMITER)
}
