use crate::source::RecordSource;

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Corpus queried by every endpoint.
    pub source: Arc<dyn RecordSource>,
}

impl AppState {
    /// Create and return an [AppState].
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
