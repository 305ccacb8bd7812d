//! Aggregation requests.
//!
//! An [AggregationRequest] describes one ranked query: which records to select, how to group
//! them and how many groups to return. Grouping by author is delegated to the record source;
//! grouping by mention target needs the text of each record and runs in-process through
//! [aggregate](crate::aggregator::aggregate).

use crate::aggregator::aggregate;
use crate::error::StatsError;
use crate::extractor::MentionExtractor;
use crate::models::{Polarity, RankedEntry};
use crate::source::{Filter, RecordSource};

/// Number of users returned by the top-N queries.
pub const TOP_LIMIT: usize = 10;

/// Number of users returned per polarity group.
pub const POLARITY_LIMIT: usize = 5;

/// Grouping key of a ranked query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupKey {
    /// The author of each record
    Owner,
    /// Each user mentioned in the text of a record
    MentionTarget,
}

/// A ranked query against a [RecordSource].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AggregationRequest {
    pub filter: Filter,
    pub group_key: GroupKey,
    pub limit: usize,
}

impl AggregationRequest {
    /// Return a new AggregationRequest object.
    pub fn new(filter: Filter, group_key: GroupKey, limit: usize) -> Self {
        AggregationRequest {
            filter,
            group_key,
            limit,
        }
    }

    /// Users who mention other users the most.
    pub fn top_mentioners() -> Self {
        Self::new(Filter::Mentions, GroupKey::Owner, TOP_LIMIT)
    }

    /// Users who are mentioned the most.
    pub fn top_mentioned() -> Self {
        Self::new(Filter::Mentions, GroupKey::MentionTarget, TOP_LIMIT)
    }

    /// Users with the most tweets.
    pub fn most_active() -> Self {
        Self::new(Filter::All, GroupKey::Owner, TOP_LIMIT)
    }

    /// Users with the most tweets of the given polarity.
    pub fn polarity(polarity: Polarity) -> Self {
        Self::new(Filter::Polarity(polarity), GroupKey::Owner, POLARITY_LIMIT)
    }

    /// Execute the query.
    ///
    /// # Arguments
    ///
    /// * `source`: Corpus to query
    #[tracing::instrument(level = "DEBUG", skip(source))]
    pub async fn execute(&self, source: &dyn RecordSource) -> Result<Vec<RankedEntry>, StatsError> {
        match self.group_key {
            GroupKey::Owner => source.group_count(self.filter, self.limit).await,
            GroupKey::MentionTarget => {
                aggregate(source.records(self.filter), &MentionExtractor, self.limit).await
            }
        }
    }
}
