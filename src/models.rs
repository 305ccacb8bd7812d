//! Data types and associated functions and methods

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, IntoStaticStr};

/// Sentiment polarity classes.
///
/// Polarity is precomputed for each tweet and stored as a small integer.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, IntoStaticStr, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Polarity {
    /// Stored as 0
    Negative,
    /// Stored as 2
    Neutral,
    /// Stored as 4
    Positive,
}

impl Polarity {
    /// Returns the integer used to store this polarity in the corpus.
    pub fn value(self) -> i64 {
        match self {
            Self::Negative => 0,
            Self::Neutral => 2,
            Self::Positive => 4,
        }
    }
}

/// A single tweet read from the corpus.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Screen name of the author
    pub user: String,
    /// Tweet body
    pub text: String,
    /// Raw polarity value
    pub polarity: i64,
}

impl Record {
    /// Return a new Record object.
    pub fn new(user: impl Into<String>, text: impl Into<String>, polarity: i64) -> Self {
        Record {
            user: user.into(),
            text: text.into(),
            polarity,
        }
    }
}

/// A user and the number of times they were counted by a query.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RankedEntry {
    /// Grouping key. For mention queries this is the mentioned screen name.
    pub user: String,
    /// Number of occurrences
    pub count: u64,
}

impl RankedEntry {
    /// Return a new RankedEntry object.
    pub fn new(user: impl Into<String>, count: u64) -> Self {
        RankedEntry {
            user: user.into(),
            count,
        }
    }
}

/// Response body for the distinct user count.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct UserCount {
    pub users: u64,
}

/// Response body joining the results of several independent queries.
///
/// Every branch appears as a key. A branch that failed is `null` and has a matching entry in
/// `errors`.
#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FanOutResponse {
    /// Ranked results by branch name
    #[serde(flatten)]
    pub branches: BTreeMap<String, Option<Vec<RankedEntry>>>,
    /// Error messages by branch name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_ser_tokens, Token};

    #[test]
    fn polarity_values() {
        assert_eq!(0, Polarity::Negative.value());
        assert_eq!(2, Polarity::Neutral.value());
        assert_eq!(4, Polarity::Positive.value());
    }

    #[test]
    fn polarity_names() {
        let name: &'static str = Polarity::Negative.into();
        assert_eq!("negative", name);
        assert_eq!("positive", Polarity::Positive.to_string());
    }

    #[test]
    fn ranked_entry_serialise() {
        assert_ser_tokens(
            &RankedEntry::new("alice", 3),
            &[
                Token::Struct {
                    name: "RankedEntry",
                    len: 2,
                },
                Token::Str("user"),
                Token::Str("alice"),
                Token::Str("count"),
                Token::U64(3),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn fan_out_response_without_errors() {
        let mut response = FanOutResponse::default();
        response
            .branches
            .insert("negative".to_string(), Some(vec![RankedEntry::new("a", 1)]));
        response.branches.insert("positive".to_string(), Some(vec![]));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            serde_json::json!({
                "negative": [{"user": "a", "count": 1}],
                "positive": [],
            }),
            json
        );
    }

    #[test]
    fn fan_out_response_with_errors() {
        let mut response = FanOutResponse::default();
        response.branches.insert("negative".to_string(), Some(vec![]));
        response.branches.insert("positive".to_string(), None);
        response
            .errors
            .insert("positive".to_string(), "corpus query failed".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            serde_json::json!({
                "negative": [],
                "positive": null,
                "errors": {"positive": "corpus query failed"},
            }),
            json
        );
    }
}
