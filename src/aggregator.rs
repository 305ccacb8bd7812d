//! Streaming top-K aggregation.
//!
//! The aggregator scans a [RecordStream](crate::source::RecordStream), extracts zero or more keys
//! from every record, counts the keys and ranks them once the stream is exhausted.
//!
//! Counting is O(1) per key occurrence: each key maps to the position of its entry in an ordered
//! entry list, so repeated keys are updated in place. Ranking is a stable sort by descending
//! count, which leaves keys with equal counts in the order of their first appearance.

use crate::error::StatsError;
use crate::extractor::KeyExtractor;
use crate::metrics::{MALFORMED_RECORDS, RECORDS_SCANNED};
use crate::models::{RankedEntry, Record};

use hashbrown::HashMap;
use tokio_stream::{Stream, StreamExt};
use tracing::{event, Level};

/// Running count per key for a single aggregation pass.
#[derive(Debug, Default)]
pub struct MentionTally {
    /// Position of each key's entry in `entries`.
    positions: HashMap<String, usize>,
    /// Entries in order of first appearance.
    entries: Vec<RankedEntry>,
}

impl MentionTally {
    /// Returns an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `key`.
    pub fn observe(&mut self, key: &str) {
        match self.positions.get(key) {
            Some(&position) => self.entries[position].count += 1,
            None => {
                self.positions.insert(key.to_owned(), self.entries.len());
                self.entries.push(RankedEntry::new(key, 1));
            }
        }
    }

    /// Returns the current count for `key`, if it has been observed.
    pub fn count(&self, key: &str) -> Option<u64> {
        self.positions
            .get(key)
            .map(|&position| self.entries[position].count)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no key has been observed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of occurrences observed across all keys.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// Consume the tally and return the `limit` highest ranked entries.
    pub fn into_ranked(self, limit: usize) -> Vec<RankedEntry> {
        let mut entries = self.entries;
        rank(&mut entries);
        entries.truncate(limit);
        entries
    }
}

/// Sort entries by descending count.
///
/// The sort is stable: entries with equal counts keep their relative order.
pub fn rank(entries: &mut [RankedEntry]) {
    entries.sort_by(|a, b| b.count.cmp(&a.count));
}

/// Tally the keys extracted from every record in `records` and return the top `limit`.
///
/// Malformed records are logged and skipped. Any other error from the stream aborts the
/// aggregation and the partial tally is discarded.
///
/// # Arguments
///
/// * `records`: Stream of records to scan, in the order they should be tallied
/// * `extractor`: Maps each record to its keys
/// * `limit`: Maximum number of entries to return
#[tracing::instrument(level = "DEBUG", skip(records, extractor))]
pub async fn aggregate<S, E>(
    mut records: S,
    extractor: &E,
    limit: usize,
) -> Result<Vec<RankedEntry>, StatsError>
where
    S: Stream<Item = Result<Record, StatsError>> + Unpin,
    E: KeyExtractor + ?Sized,
{
    let mut tally = MentionTally::new();
    let mut scanned: u64 = 0;
    let mut skipped: u64 = 0;
    while let Some(record) = records.next().await {
        match record {
            Ok(record) => {
                scanned += 1;
                for key in extractor.extract(&record) {
                    tally.observe(key);
                }
            }
            Err(error @ StatsError::MalformedRecord { .. }) => {
                event!(Level::WARN, "Skipping record: {}", error);
                skipped += 1;
            }
            Err(error) => return Err(error),
        }
    }
    RECORDS_SCANNED.inc_by(scanned);
    MALFORMED_RECORDS.inc_by(skipped);
    event!(
        Level::DEBUG,
        scanned,
        skipped,
        distinct = tally.len(),
        "aggregation complete"
    );
    Ok(tally.into_ranked(limit))
}
