//! Session Store
//!
//! Most-recent-first history capped at a fixed capacity. Statistics are
//! recomputed with a full pass after every mutation, never patched
//! incrementally.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

use crate::analysis::{AnalysisRecord, Sentiment};

/// Number of analyses kept by default
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Aggregate view of the current history
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SessionStatistics {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    /// Mean probability as a percentage, rounded to two decimals
    pub average_confidence_percent: f64,
}

impl SessionStatistics {
    /// Compute statistics over a set of records
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AnalysisRecord>,
    {
        let mut stats = SessionStatistics::default();
        let mut probability_sum = 0.0;

        for record in records {
            stats.total += 1;
            match record.sentiment {
                Sentiment::Positive => stats.positive += 1,
                Sentiment::Negative => stats.negative += 1,
            }
            probability_sum += record.probability;
        }

        if stats.total > 0 {
            let percent = probability_sum / stats.total as f64 * 100.0;
            stats.average_confidence_percent = (percent * 100.0).round() / 100.0;
        }

        stats
    }
}

impl fmt::Display for SessionStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={}, positive={}, negative={}, avg_confidence={:.2}%",
            self.total, self.positive, self.negative, self.average_confidence_percent
        )
    }
}

/// Bounded history of analyses
#[derive(Debug)]
pub struct SessionStore {
    /// Newest first
    records: VecDeque<AnalysisRecord>,
    capacity: usize,
    last_id: i64,
    stats: SessionStatistics,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create an empty store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an empty store keeping at most `capacity` records, clamped to
    /// `1..=DEFAULT_HISTORY_CAPACITY`
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, DEFAULT_HISTORY_CAPACITY);
        Self {
            records: VecDeque::with_capacity(capacity + 1),
            capacity,
            last_id: 0,
            stats: SessionStatistics::default(),
        }
    }

    /// Insert a record at the front, evicting the oldest beyond capacity
    ///
    /// Returns the id under which the record was stored. Ids are creation
    /// timestamps; one that collides with an earlier id is bumped so that
    /// [`remove`](Self::remove) only ever targets a single record.
    pub fn record(&mut self, mut record: AnalysisRecord) -> i64 {
        if record.id <= self.last_id {
            record.id = self.last_id + 1;
        }
        self.last_id = record.id;
        let id = record.id;

        self.records.push_front(record);
        while self.records.len() > self.capacity {
            if let Some(evicted) = self.records.pop_back() {
                tracing::debug!(id = evicted.id, "Evicted oldest analysis from history");
            }
        }

        self.refresh();
        id
    }

    /// Delete the record with the given id; returns whether one was removed
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let removed = self.records.len() != before;
        self.refresh();
        removed
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.records.clear();
        self.refresh();
    }

    /// Current statistics
    pub fn statistics(&self) -> SessionStatistics {
        self.stats
    }

    /// Records, newest first
    pub fn records(&self) -> impl Iterator<Item = &AnalysisRecord> + '_ {
        self.records.iter()
    }

    /// Look up a record by id
    pub fn get(&self, id: i64) -> Option<&AnalysisRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn refresh(&mut self) {
        self.stats = SessionStatistics::from_records(&self.records);
    }
}
