//! Error handling.

use axum::{
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{event, Level};

/// Tweet statistics server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Every branch of a fan-out query failed
    #[error("all {count} queries failed")]
    AllBranchesFailed {
        count: usize,
        #[source]
        first: Box<StatsError>,
    },

    /// A fan-out branch ended without delivering a result
    #[error("query {branch} was cancelled before completing")]
    BranchCancelled { branch: &'static str },

    /// Error parsing a corpus CSV file
    #[error("failed to read corpus CSV")]
    Csv(#[from] csv::Error),

    /// Error accessing a file
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// A background task panicked or was aborted
    #[error("background task failed")]
    Join(#[from] JoinError),

    /// The shared corpus connection lock was poisoned by a panicking holder
    #[error("corpus connection lock poisoned")]
    LockPoisoned,

    /// A corpus row that does not have the shape of a tweet
    #[error("malformed record at row {rowid}: {reason}")]
    MalformedRecord { rowid: i64, reason: String },

    /// Error encoding Prometheus metrics
    #[error("failed to encode metrics")]
    Metrics(#[from] prometheus::Error),

    /// Error querying the corpus store
    #[error("corpus query failed")]
    Source(#[from] rusqlite::Error),
}

impl IntoResponse for StatsError {
    /// Convert from a `StatsError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        causes.dedup();
        let caused_by = if causes.is_empty() {
            None
        } else {
            Some(causes)
        };
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    /// Return a 503 service unavailable ErrorResponse
    fn service_unavailable<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error)
    }
}

impl From<StatsError> for ErrorResponse {
    /// Convert from a `StatsError` into an `ErrorResponse`.
    fn from(error: StatsError) -> Self {
        let response = match &error {
            // The store could not be reached, or is held by another writer.
            StatsError::Source(sqlite_error) => match sqlite_error.sqlite_error_code() {
                Some(ErrorCode::DatabaseBusy)
                | Some(ErrorCode::DatabaseLocked)
                | Some(ErrorCode::CannotOpen) => Self::service_unavailable(&error),
                _ => Self::internal_server_error(&error),
            },

            StatsError::AllBranchesFailed { count: _, first: _ }
            | StatsError::BranchCancelled { branch: _ }
            | StatsError::Csv(_)
            | StatsError::Io(_)
            | StatsError::Join(_)
            | StatsError::LockPoisoned
            | StatsError::MalformedRecord {
                rowid: _,
                reason: _,
            }
            | StatsError::Metrics(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
