//! Record source interface.
//!
//! A [RecordSource] is the only way the rest of the crate reads the corpus. It streams matching
//! records for in-process aggregation and runs the aggregations the store can compute itself.

use crate::error::StatsError;
use crate::models::{Polarity, RankedEntry, Record};

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Lazily produced sequence of records.
///
/// A [StatsError::MalformedRecord] item describes a single unreadable record and the stream may
/// continue after it. Any other error ends the stream.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record, StatsError>> + Send>>;

/// Predicate selecting the records a query operates on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Filter {
    /// Every record
    All,
    /// Records whose text contains at least one mention
    Mentions,
    /// Records with the given polarity
    Polarity(Polarity),
}

impl Filter {
    /// Returns whether `record` is selected by this filter.
    ///
    /// Stores translate filters into queries; this is for in-memory sources that filter records
    /// themselves.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Mentions => crate::extractor::contains_mention(&record.text),
            Self::Polarity(polarity) => record.polarity == polarity.value(),
        }
    }
}

/// Trait for corpus stores.
///
/// This forms the contract between the query layer and the corpus. Implementations are shared
/// between concurrent requests and must never modify the corpus.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Stream the records matching `filter`, in a stable order.
    ///
    /// # Arguments
    ///
    /// * `filter`: Predicate selecting the records
    fn records(&self, filter: Filter) -> RecordStream;

    /// Count the distinct authors in the corpus.
    async fn distinct_users(&self) -> Result<u64, StatsError>;

    /// Count the records matching `filter` per author.
    ///
    /// Returns at most `limit` entries ordered by descending count. Authors with equal counts are
    /// ordered by their first record.
    ///
    /// # Arguments
    ///
    /// * `filter`: Predicate selecting the records
    /// * `limit`: Maximum number of entries to return
    async fn group_count(
        &self,
        filter: Filter,
        limit: usize,
    ) -> Result<Vec<RankedEntry>, StatsError>;
}
