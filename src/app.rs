//! HTTP API.

use crate::app_state::{AppState, SharedAppState};
use crate::error::StatsError;
use crate::fanout::{self, Branch};
use crate::metrics;
use crate::models::{self, Polarity, RankedEntry};
use crate::query::AggregationRequest;
use crate::source::RecordSource;

use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tower::{Layer, ServiceBuilder};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Service type served by the web server.
pub type Service = NormalizePath<Router>;

/// Returns a [axum::Router] with all routes.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/", get(endpoints))
        .route("/users", get(users))
        .route("/mentioners", get(top_mentioners))
        .route("/mentioned", get(top_mentioned))
        .route("/active", get(most_active))
        .route("/polarity", get(top_polarity))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(metrics::request_counter)
                    .on_response(metrics::record_response_metrics),
            ),
        )
        .with_state(state)
}

/// Returns the service to serve, with trailing slashes removed from request paths.
///
/// # Arguments
///
/// * `source`: Corpus queried by the endpoints
pub fn service(source: Arc<dyn RecordSource>) -> Service {
    let state = Arc::new(AppState::new(source));
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Index of the available questions.
async fn endpoints() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "users": "/users",
        "top mentioners": "/mentioners",
        "top mentioned": "/mentioned",
        "most active": "/active",
        "most grumpy and happy": "/polarity",
    }))
}

/// How many users are in the corpus?
async fn users(State(state): State<SharedAppState>) -> Result<Json<models::UserCount>, StatsError> {
    let users = state.source.distinct_users().await?;
    Ok(Json(models::UserCount { users }))
}

/// Which users mention other users the most?
async fn top_mentioners(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<RankedEntry>>, StatsError> {
    ranked(&state, AggregationRequest::top_mentioners()).await
}

/// Which users are mentioned the most?
async fn top_mentioned(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<RankedEntry>>, StatsError> {
    ranked(&state, AggregationRequest::top_mentioned()).await
}

/// Which users post the most?
async fn most_active(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<RankedEntry>>, StatsError> {
    ranked(&state, AggregationRequest::most_active()).await
}

/// Which users post the most negative and the most positive tweets?
async fn top_polarity(
    State(state): State<SharedAppState>,
) -> Result<Json<models::FanOutResponse>, StatsError> {
    let branches = [Polarity::Negative, Polarity::Positive]
        .into_iter()
        .map(|polarity| Branch::new(polarity.into(), AggregationRequest::polarity(polarity)))
        .collect();
    let outcomes = fanout::fan_out(Arc::clone(&state.source), branches).await;
    Ok(Json(fanout::join(outcomes)?))
}

async fn ranked(
    state: &AppState,
    request: AggregationRequest,
) -> Result<Json<Vec<RankedEntry>>, StatsError> {
    Ok(Json(request.execute(state.source.as_ref()).await?))
}
