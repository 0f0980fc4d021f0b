//! HTTP routes and handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::classifier::{ClassificationService, ClassifierError};

pub fn create_router(service: Arc<ClassificationService>) -> Router {
    Router::new()
        .route("/topTeams", get(top_teams))
        .route("/TeamClassifier", get(top_teams))
        .route("/health", get(health_check))
        .route("/info", get(info))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct TopTeamsQuery {
    description: Option<String>,
    k: Option<usize>,
}

async fn health_check() -> &'static str {
    "OK"
}

async fn info(State(service): State<Arc<ClassificationService>>) -> Response {
    Json(service.info()).into_response()
}

async fn top_teams(
    State(service): State<Arc<ClassificationService>>,
    Query(query): Query<TopTeamsQuery>,
) -> Response {
    let description = query.description.unwrap_or_default();
    if description.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, ClassifierError::EmptyInput.to_string()).into_response();
    }
    let k = query.k.unwrap_or_else(|| service.default_k());

    // The blocking task keeps running if the client goes away; the gated
    // native call is never interrupted and its result is simply dropped.
    let worker = Arc::clone(&service);
    let outcome = tokio::task::spawn_blocking(move || worker.classify(&description, k)).await;

    match outcome {
        Ok(Ok(labels)) => Json(labels).into_response(),
        Ok(Err(e)) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        Ok(Err(e)) => {
            log::error!("Classification failed (k = {}): {}", k, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            log::error!("Classification worker panicked: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
