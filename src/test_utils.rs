use crate::aggregator::aggregate;
use crate::error::StatsError;
use crate::extractor::OwnerExtractor;
use crate::models::{RankedEntry, Record};
use crate::source::{Filter, RecordSource, RecordStream};
use crate::store::SqliteStore;

use async_trait::async_trait;
use std::collections::HashSet;

/// A small corpus with mentions, ties and every polarity.
pub(crate) fn sample_records() -> Vec<Record> {
    vec![
        Record::new("alice", "@a hi", 0),
        Record::new("bob", "@b @a", 2),
        Record::new("alice", "no mention here", 0),
        Record::new("carol", "positive vibes", 4),
        Record::new("dave", "thanks @b!", 4),
    ]
}

/// Create an in-memory store holding [sample_records].
pub(crate) fn sample_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert_records(sample_records()).unwrap();
    store
}

/// In-memory record source that fails queries for selected filters.
pub(crate) struct MemorySource {
    records: Vec<Record>,
    failing: Vec<Filter>,
}

impl MemorySource {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            failing: vec![],
        }
    }

    /// Make every query using `filter` fail with a source error.
    pub(crate) fn failing(mut self, filter: Filter) -> Self {
        self.failing.push(filter);
        self
    }

    fn check(&self, filter: Filter) -> Result<(), StatsError> {
        if self.failing.contains(&filter) {
            Err(StatsError::Source(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
                Some("disk I/O error".to_string()),
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    fn records(&self, filter: Filter) -> RecordStream {
        let items: Vec<Result<Record, StatsError>> = match self.check(filter) {
            Ok(()) => self
                .records
                .iter()
                .filter(|record| filter.matches(record))
                .cloned()
                .map(Ok)
                .collect(),
            Err(error) => vec![Err(error)],
        };
        Box::pin(tokio_stream::iter(items))
    }

    async fn distinct_users(&self) -> Result<u64, StatsError> {
        self.check(Filter::All)?;
        let users: HashSet<&str> = self.records.iter().map(|r| r.user.as_str()).collect();
        Ok(users.len() as u64)
    }

    async fn group_count(
        &self,
        filter: Filter,
        limit: usize,
    ) -> Result<Vec<RankedEntry>, StatsError> {
        aggregate(self.records(filter), &OwnerExtractor, limit).await
    }
}
