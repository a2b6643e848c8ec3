//! Read-only views of rating collections and attribute matrices, plus simple
//! in-memory implementations.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type UserId = u32;
pub type ItemId = u32;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

/// A sparse user x item rating matrix, seen through its summary counts.
pub trait RatingCollection {
    /// Distinct users with at least one rating.
    fn user_ids(&self) -> &HashSet<UserId>;

    /// Distinct items with at least one rating.
    fn item_ids(&self) -> &HashSet<ItemId>;

    /// Number of stored (user, item) entries.
    fn interaction_count(&self) -> usize;

    fn user_count(&self) -> usize {
        self.user_ids().len()
    }

    fn item_count(&self) -> usize {
        self.item_ids().len()
    }
}

/// Rating collections that also record when each interaction happened.
pub trait TimedRatingCollection: RatingCollection {
    /// `None` when the collection holds no timed interactions.
    fn earliest_time(&self) -> Option<Timestamp>;
    fn latest_time(&self) -> Option<Timestamp>;
}

/// A sparse boolean (entity, attribute) matrix.
pub trait AttributeMatrix {
    fn row_count(&self) -> usize;
    fn column_count(&self) -> usize;
    /// Number of true cells.
    fn entry_count(&self) -> usize;
    fn non_empty_row_ids(&self) -> HashSet<u32>;
    fn non_empty_column_ids(&self) -> HashSet<u32>;
}

/// A rating collection together with its optional time capability.
///
/// Whether a dataset is timed is fixed when it is built, by choosing
/// [`Dataset::plain`] or [`Dataset::timed`].
#[derive(Clone, Copy)]
pub struct Dataset<'a> {
    ratings: &'a dyn RatingCollection,
    timeline: Option<&'a dyn TimedRatingCollection>,
}

impl<'a> Dataset<'a> {
    pub fn plain<R: RatingCollection>(ratings: &'a R) -> Self {
        Self {
            ratings,
            timeline: None,
        }
    }

    pub fn timed<R: TimedRatingCollection>(ratings: &'a R) -> Self {
        Self {
            ratings,
            timeline: Some(ratings),
        }
    }

    pub fn ratings(&self) -> &'a dyn RatingCollection {
        self.ratings
    }

    pub fn is_timed(&self) -> bool {
        self.timeline.is_some()
    }

    /// `(earliest, latest)` for timed datasets that contain at least one timestamp.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        let timeline = self.timeline?;
        Some((timeline.earliest_time()?, timeline.latest_time()?))
    }
}

/// A single user-item interaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user: UserId,
    pub item: ItemId,
    pub value: f32,
    pub time: Option<Timestamp>,
}

/// In-memory ratings keyed by (user, item). Adding a pair twice replaces the
/// earlier rating.
#[derive(Debug, Clone, Default)]
pub struct Ratings {
    records: Vec<Rating>,
    index: HashMap<(UserId, ItemId), usize>,
    users: HashSet<UserId>,
    items: HashSet<ItemId>,
    earliest: Option<Timestamp>,
    latest: Option<Timestamp>,
}

impl Ratings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, user: UserId, item: ItemId, value: f32) {
        self.push(Rating {
            user,
            item,
            value,
            time: None,
        });
    }

    pub fn add_timed(&mut self, user: UserId, item: ItemId, value: f32, time: Timestamp) {
        self.push(Rating {
            user,
            item,
            value,
            time: Some(time),
        });
    }

    pub fn push(&mut self, rating: Rating) {
        self.users.insert(rating.user);
        self.items.insert(rating.item);
        let replaced = match self.index.get(&(rating.user, rating.item)) {
            Some(&pos) => std::mem::replace(&mut self.records[pos], rating).time,
            None => {
                self.index.insert((rating.user, rating.item), self.records.len());
                self.records.push(rating);
                None
            }
        };

        // A replaced timestamp that sat on a bound may no longer be stored.
        if replaced.is_some() && (replaced == self.earliest || replaced == self.latest) {
            self.recompute_time_bounds();
        } else if let Some(t) = rating.time {
            self.earliest = Some(self.earliest.map_or(t, |e| e.min(t)));
            self.latest = Some(self.latest.map_or(t, |l| l.max(t)));
        }
    }

    fn recompute_time_bounds(&mut self) {
        let times = self.records.iter().filter_map(|r| r.time);
        self.earliest = times.clone().min();
        self.latest = times.max();
    }

    pub fn get(&self, user: UserId, item: ItemId) -> Option<f32> {
        self.index.get(&(user, item)).map(|&pos| self.records[pos].value)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rating> {
        self.records.iter()
    }

    /// View as a [`Dataset`], timed when any rating carries a timestamp.
    pub fn dataset(&self) -> Dataset<'_> {
        if self.earliest.is_some() {
            Dataset::timed(self)
        } else {
            Dataset::plain(self)
        }
    }
}

impl RatingCollection for Ratings {
    fn user_ids(&self) -> &HashSet<UserId> {
        &self.users
    }

    fn item_ids(&self) -> &HashSet<ItemId> {
        &self.items
    }

    fn interaction_count(&self) -> usize {
        self.records.len()
    }
}

impl TimedRatingCollection for Ratings {
    fn earliest_time(&self) -> Option<Timestamp> {
        self.earliest
    }

    fn latest_time(&self) -> Option<Timestamp> {
        self.latest
    }
}

impl FromIterator<Rating> for Ratings {
    fn from_iter<I: IntoIterator<Item = Rating>>(iter: I) -> Self {
        let mut ratings = Ratings::new();
        for rating in iter {
            ratings.push(rating);
        }
        ratings
    }
}

/// Sparse boolean matrix stored as one column set per non-empty row.
///
/// Row and column counts cover the highest id seen plus one, or the declared
/// dimensions when those are larger.
#[derive(Debug, Clone, Default)]
pub struct BooleanMatrix {
    rows: HashMap<u32, HashSet<u32>>,
    row_count: usize,
    column_count: usize,
    entries: usize,
}

impl BooleanMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(row_count: usize, column_count: usize) -> Self {
        Self {
            row_count,
            column_count,
            ..Self::default()
        }
    }

    /// Mark `(row, column)` true. Returns `false` if it already was.
    pub fn set(&mut self, row: u32, column: u32) -> bool {
        self.row_count = self.row_count.max(row as usize + 1);
        self.column_count = self.column_count.max(column as usize + 1);
        let inserted = self.rows.entry(row).or_default().insert(column);
        if inserted {
            self.entries += 1;
        }
        inserted
    }

    pub fn contains(&self, row: u32, column: u32) -> bool {
        self.rows.get(&row).is_some_and(|cols| cols.contains(&column))
    }

    pub fn row(&self, row: u32) -> Option<&HashSet<u32>> {
        self.rows.get(&row)
    }
}

impl AttributeMatrix for BooleanMatrix {
    fn row_count(&self) -> usize {
        self.row_count
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn entry_count(&self) -> usize {
        self.entries
    }

    fn non_empty_row_ids(&self) -> HashSet<u32> {
        self.rows.keys().copied().collect()
    }

    fn non_empty_column_ids(&self) -> HashSet<u32> {
        self.rows.values().flatten().copied().collect()
    }
}

impl FromIterator<(u32, u32)> for BooleanMatrix {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        let mut matrix = BooleanMatrix::new();
        for (row, column) in iter {
            matrix.set(row, column);
        }
        matrix
    }
}
