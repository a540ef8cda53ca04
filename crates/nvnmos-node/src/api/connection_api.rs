//! IS-05 Connection API v1.1 routes (spec.md §4.6): read endpoints plus the
//! single `PATCH .../staged` endpoint that drives the ConnectionEngine.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::AppState;
use crate::connection::engine::StagedPatch;
use crate::error::ApiError;
use crate::model::resource::ResourceBody;
use crate::model::types::{ConstraintSet, EndpointParams};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/single/senders", get(list_senders))
        .route("/single/senders/:id", get(sender_index))
        .route("/single/senders/:id/constraints", get(sender_constraints))
        .route("/single/senders/:id/staged", get(sender_staged).patch(patch_sender_staged))
        .route("/single/senders/:id/active", get(sender_active))
        .route("/single/senders/:id/transportfile", get(sender_transportfile))
        .route("/single/senders/:id/transporttype", get(transport_type))
        .route("/single/receivers", get(list_receivers))
        .route("/single/receivers/:id", get(receiver_index))
        .route("/single/receivers/:id/constraints", get(receiver_constraints))
        .route("/single/receivers/:id/staged", get(receiver_staged).patch(patch_receiver_staged))
        .route("/single/receivers/:id/active", get(receiver_active))
        .route("/single/receivers/:id/transporttype", get(transport_type))
}

async fn list_senders(State(state): State<Arc<AppState>>) -> Json<Vec<Uuid>> {
    Json(
        state
            .model
            .resources
            .iter(crate::model::resource::ResourceType::Sender)
            .into_iter()
            .map(|r| r.id)
            .collect(),
    )
}

async fn list_receivers(State(state): State<Arc<AppState>>) -> Json<Vec<Uuid>> {
    Json(
        state
            .model
            .resources
            .iter(crate::model::resource::ResourceType::Receiver)
            .into_iter()
            .map(|r| r.id)
            .collect(),
    )
}

async fn sender_index() -> Json<Value> {
    Json(json!(["constraints/", "staged/", "active/", "transportfile", "transporttype"]))
}

async fn receiver_index() -> Json<Value> {
    Json(json!(["constraints/", "staged/", "active/", "transporttype"]))
}

async fn transport_type() -> Json<Value> {
    Json(json!("urn:x-nmos:transport:rtp"))
}

fn connection_sender(state: &AppState, id: Uuid) -> Result<crate::model::types::ConnectionSenderBody, ApiError> {
    let resource = state.model.connections.find(id).ok_or(ApiError::NotFound)?;
    match resource.data {
        ResourceBody::ConnectionSender(body) => Ok(body),
        _ => Err(ApiError::NotFound),
    }
}

fn connection_receiver(state: &AppState, id: Uuid) -> Result<crate::model::types::ConnectionReceiverBody, ApiError> {
    let resource = state.model.connections.find(id).ok_or(ApiError::NotFound)?;
    match resource.data {
        ResourceBody::ConnectionReceiver(body) => Ok(body),
        _ => Err(ApiError::NotFound),
    }
}

async fn sender_constraints(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Vec<ConstraintSet>>, ApiError> {
    let body = connection_sender(&state, id)?;
    Ok(Json(vec![ConstraintSet::new(); body.endpoint_staged.transport_params.len()]))
}

async fn receiver_constraints(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Vec<ConstraintSet>>, ApiError> {
    let resource = state.model.resources.find(id).ok_or(ApiError::NotFound)?;
    match resource.data {
        ResourceBody::Receiver(body) => Ok(Json(body.caps.constraint_sets)),
        _ => Err(ApiError::NotFound),
    }
}

async fn sender_staged(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<EndpointParams>, ApiError> {
    Ok(Json(connection_sender(&state, id)?.endpoint_staged))
}

async fn sender_active(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<EndpointParams>, ApiError> {
    Ok(Json(connection_sender(&state, id)?.endpoint_active))
}

async fn receiver_staged(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<EndpointParams>, ApiError> {
    Ok(Json(connection_receiver(&state, id)?.endpoint_staged))
}

async fn receiver_active(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<EndpointParams>, ApiError> {
    Ok(Json(connection_receiver(&state, id)?.endpoint_active))
}

async fn sender_transportfile(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<String, ApiError> {
    connection_sender(&state, id)?.transport_file_cache.ok_or(ApiError::NotFound)
}

async fn patch_sender_staged(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<StagedPatch>,
) -> Result<Json<EndpointParams>, ApiError> {
    state.engine.patch_staged(id, &patch)?;
    if should_activate_immediately(&patch) {
        state.engine.activate_now(id)?;
    }
    Ok(Json(connection_sender(&state, id)?.endpoint_staged))
}

async fn patch_receiver_staged(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<StagedPatch>,
) -> Result<Json<EndpointParams>, ApiError> {
    state.engine.patch_staged(id, &patch)?;
    if should_activate_immediately(&patch) {
        state.engine.activate_now(id)?;
    }
    Ok(Json(connection_receiver(&state, id)?.endpoint_staged))
}

fn should_activate_immediately(patch: &StagedPatch) -> bool {
    patch
        .activation
        .as_ref()
        .map(|a| a.mode == Some(crate::model::types::ActivationMode::ActivateImmediate))
        .unwrap_or(false)
}
