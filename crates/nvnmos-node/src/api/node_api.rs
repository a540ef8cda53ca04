//! IS-04 Node API v1.3 read-only routes (spec.md §4.6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::ApiError;
use crate::model::resource::{Resource, ResourceType};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/self", get(node_self))
        .route("/devices", get(list_devices))
        .route("/devices/:id", get(get_device))
        .route("/sources", get(list_sources))
        .route("/sources/:id", get(get_source))
        .route("/flows", get(list_flows))
        .route("/flows/:id", get(get_flow))
        .route("/senders", get(list_senders))
        .route("/senders/:id", get(get_sender))
        .route("/receivers", get(list_receivers))
        .route("/receivers/:id", get(get_receiver))
}

async fn index() -> Json<Value> {
    Json(json!(["self/", "devices/", "sources/", "flows/", "senders/", "receivers/"]))
}

async fn node_self(State(state): State<Arc<AppState>>) -> Result<Json<Resource>, ApiError> {
    state.model.resources.find(state.model.node_id()).map(Json).ok_or(ApiError::NotFound)
}

fn list_ids(state: &AppState, resource_type: ResourceType) -> Json<Vec<Uuid>> {
    Json(state.model.resources.iter(resource_type).into_iter().map(|r| r.id).collect())
}

fn get_one(state: &AppState, resource_type: ResourceType, id: Uuid) -> Result<Json<Resource>, ApiError> {
    let resource = state.model.resources.find(id).ok_or(ApiError::NotFound)?;
    if resource.resource_type != resource_type {
        return Err(ApiError::NotFound);
    }
    Ok(Json(resource))
}

async fn list_devices(State(state): State<Arc<AppState>>) -> Json<Vec<Uuid>> {
    list_ids(&state, ResourceType::Device)
}

async fn get_device(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Resource>, ApiError> {
    get_one(&state, ResourceType::Device, id)
}

async fn list_sources(State(state): State<Arc<AppState>>) -> Json<Vec<Uuid>> {
    list_ids(&state, ResourceType::Source)
}

async fn get_source(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Resource>, ApiError> {
    get_one(&state, ResourceType::Source, id)
}

async fn list_flows(State(state): State<Arc<AppState>>) -> Json<Vec<Uuid>> {
    list_ids(&state, ResourceType::Flow)
}

async fn get_flow(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Resource>, ApiError> {
    get_one(&state, ResourceType::Flow, id)
}

async fn list_senders(State(state): State<Arc<AppState>>) -> Json<Vec<Uuid>> {
    list_ids(&state, ResourceType::Sender)
}

async fn get_sender(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Resource>, ApiError> {
    get_one(&state, ResourceType::Sender, id)
}

async fn list_receivers(State(state): State<Arc<AppState>>) -> Json<Vec<Uuid>> {
    list_ids(&state, ResourceType::Receiver)
}

async fn get_receiver(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Resource>, ApiError> {
    get_one(&state, ResourceType::Receiver, id)
}
