//! IS-04/IS-05 HTTP surface (spec.md §4.6), built on `axum`.

pub mod connection_api;
pub mod node_api;

use std::sync::Arc;

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use tower_http::trace::TraceLayer;

use crate::connection::ConnectionEngine;
use crate::error::ApiError;
use crate::model::NodeModel;

/// Shared state behind every route (spec.md §4.6: one read lock per GET,
/// the engine handles its own write-lock discipline for PATCH).
pub struct AppState {
    pub model: Arc<NodeModel>,
    pub engine: Arc<ConnectionEngine>,
}

/// Builds the combined IS-04 + IS-05 router, with the `TRACE`-rejecting
/// layer applied ahead of dispatch (axum has no router-level method
/// allow-list, so this is a dedicated middleware).
pub fn router(model: Arc<NodeModel>, engine: Arc<ConnectionEngine>) -> Router {
    let state = Arc::new(AppState { model, engine });
    Router::new()
        .nest("/x-nmos/node/v1.3", node_api::router())
        .nest("/x-nmos/connection/v1.1", connection_api::router())
        .layer(middleware::from_fn(reject_trace))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn reject_trace(req: Request, next: Next) -> Response {
    if req.method() == Method::TRACE {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    next.run(req).await
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Model(crate::error::ModelError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Model(_) => StatusCode::BAD_REQUEST,
            ApiError::Connection(crate::error::ConnectionError::UnknownResource(_)) => StatusCode::NOT_FOUND,
            ApiError::Connection(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
