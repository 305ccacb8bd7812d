//! This crate provides a small analytics server over a corpus of tweets. It answers a fixed set of
//! questions about the corpus: how many users there are, who mentions other users the most, who
//! is mentioned the most, who is the most active and who posts the most negative and positive
//! tweets.
//!
//! Most questions are answered by delegating a `GROUP BY` query to the corpus store. The most
//! mentioned users cannot be computed that way, because the grouping key is extracted from the
//! free text of each tweet. That question is answered by a streaming top-K reduction over the
//! matching records, implemented in [aggregator].
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs serialisation of JSON response data.
//! * [rusqlite] provides access to the SQLite corpus store.
//! * [regex] extracts @-mentions from tweet text.

pub mod aggregator;
pub mod app;
pub mod app_state;
pub mod cli;
pub mod error;
pub mod extractor;
pub mod fanout;
pub mod import;
pub mod metrics;
pub mod models;
pub mod query;
pub mod server;
pub mod source;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
