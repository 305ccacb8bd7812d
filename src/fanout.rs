//! Parallel fan-out of independent queries.
//!
//! Each branch runs on its own task and delivers its outcome on a dedicated one-shot channel.
//! The caller waits until every branch has delivered before anything is returned, so a response
//! always contains every branch.

use crate::error::StatsError;
use crate::models::{FanOutResponse, RankedEntry};
use crate::query::AggregationRequest;
use crate::source::RecordSource;

use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{event, Instrument, Level};

/// A named query executed as one branch of a fan-out.
#[derive(Clone, Copy, Debug)]
pub struct Branch {
    pub name: &'static str,
    pub request: AggregationRequest,
}

impl Branch {
    /// Return a new Branch object.
    pub fn new(name: &'static str, request: AggregationRequest) -> Self {
        Branch { name, request }
    }
}

/// Outcome of a single branch.
pub type BranchOutcome = Result<Vec<RankedEntry>, StatsError>;

/// Run every branch concurrently and wait for all of them.
///
/// Returns the outcome of each branch, in the order the branches were given. A branch that fails
/// does not affect the others.
///
/// # Arguments
///
/// * `source`: Corpus shared by all branches
/// * `branches`: Queries to run
#[tracing::instrument(level = "DEBUG", skip(source))]
pub async fn fan_out(
    source: Arc<dyn RecordSource>,
    branches: Vec<Branch>,
) -> Vec<(&'static str, BranchOutcome)> {
    let pending: Vec<_> = branches
        .into_iter()
        .map(|branch| {
            let (tx, rx) = oneshot::channel();
            let source = Arc::clone(&source);
            let span = tracing::debug_span!("branch", name = branch.name);
            tokio::spawn(
                async move {
                    let outcome = branch.request.execute(source.as_ref()).await;
                    // Only fails if the joining request has gone away.
                    let _ = tx.send(outcome);
                }
                .instrument(span),
            );
            (branch.name, rx)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(pending.len());
    for (name, rx) in pending {
        let outcome = rx
            .await
            .unwrap_or(Err(StatsError::BranchCancelled { branch: name }));
        if let Err(error) = &outcome {
            event!(Level::WARN, branch = name, "Query failed: {}", error);
        }
        outcomes.push((name, outcome));
    }
    outcomes
}

/// Join branch outcomes into a single response.
///
/// Failed branches are `null` in the response and their error is reported under `errors`. If
/// every branch failed, the first error is returned instead.
pub fn join(outcomes: Vec<(&'static str, BranchOutcome)>) -> Result<FanOutResponse, StatsError> {
    let count = outcomes.len();
    let mut response = FanOutResponse::default();
    let mut first_error = None;
    for (name, outcome) in outcomes {
        match outcome {
            Ok(entries) => {
                response.branches.insert(name.to_string(), Some(entries));
            }
            Err(error) => {
                response.branches.insert(name.to_string(), None);
                response.errors.insert(name.to_string(), error.to_string());
                first_error.get_or_insert(error);
            }
        }
    }
    match first_error {
        Some(first) if response.errors.len() == count => Err(StatsError::AllBranchesFailed {
            count,
            first: Box::new(first),
        }),
        _ => Ok(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Polarity, Record};
    use crate::source::Filter;
    use crate::test_utils;

    fn polarity_branches() -> Vec<Branch> {
        vec![
            Branch::new("negative", AggregationRequest::polarity(Polarity::Negative)),
            Branch::new("positive", AggregationRequest::polarity(Polarity::Positive)),
        ]
    }

    #[tokio::test]
    async fn all_branches_succeed() {
        let source: Arc<dyn RecordSource> = Arc::new(test_utils::sample_store());
        let outcomes = fan_out(source, polarity_branches()).await;
        let names: Vec<_> = outcomes.iter().map(|(name, _)| *name).collect();
        assert_eq!(vec!["negative", "positive"], names);
        let response = join(outcomes).unwrap();
        assert!(response.errors.is_empty());
        assert_eq!(
            Some(&Some(vec![RankedEntry::new("alice", 2)])),
            response.branches.get("negative")
        );
        assert_eq!(
            Some(&Some(vec![
                RankedEntry::new("carol", 1),
                RankedEntry::new("dave", 1)
            ])),
            response.branches.get("positive")
        );
    }

    #[tokio::test]
    async fn empty_branch_is_empty_list() {
        let source: Arc<dyn RecordSource> =
            Arc::new(test_utils::MemorySource::new(vec![Record::new("a", "", 0)]));
        let response = join(fan_out(source, polarity_branches()).await).unwrap();
        assert_eq!(Some(&Some(vec![])), response.branches.get("positive"));
    }

    #[tokio::test]
    async fn failed_branch_is_isolated() {
        let records = vec![
            Record::new("x", "", 0),
            Record::new("y", "", 0),
            Record::new("x", "", 0),
            Record::new("z", "", 4),
        ];
        let source: Arc<dyn RecordSource> = Arc::new(
            test_utils::MemorySource::new(records)
                .failing(Filter::Polarity(Polarity::Positive)),
        );
        let response = join(fan_out(source, polarity_branches()).await).unwrap();
        assert_eq!(
            Some(&Some(vec![RankedEntry::new("x", 2), RankedEntry::new("y", 1)])),
            response.branches.get("negative")
        );
        assert_eq!(Some(&None), response.branches.get("positive"));
        assert_eq!(
            Some(&"corpus query failed".to_string()),
            response.errors.get("positive")
        );
    }

    #[tokio::test]
    async fn all_branches_fail() {
        let source: Arc<dyn RecordSource> = Arc::new(
            test_utils::MemorySource::new(vec![])
                .failing(Filter::Polarity(Polarity::Negative))
                .failing(Filter::Polarity(Polarity::Positive)),
        );
        let error = join(fan_out(source, polarity_branches()).await).unwrap_err();
        assert!(matches!(
            error,
            StatsError::AllBranchesFailed { count: 2, .. }
        ));
    }

    #[test]
    fn join_cancelled_branch() {
        let outcomes = vec![
            ("left", Ok(vec![RankedEntry::new("a", 1)])),
            ("right", Err(StatsError::BranchCancelled { branch: "right" })),
        ];
        let response = join(outcomes).unwrap();
        assert_eq!(
            Some(&"query right was cancelled before completing".to_string()),
            response.errors.get("right")
        );
    }

    #[test]
    fn join_nothing() {
        let response = join(vec![]).unwrap();
        assert!(response.branches.is_empty());
    }
}
