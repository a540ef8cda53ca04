//! Exercises the IS-04/IS-05 HTTP surface directly against the `axum`
//! router, without binding a real socket (spec.md §4.6).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use nvnmos_node::config::{NodeConfig, Settings};
use nvnmos_node::connection::ConnectionEngine;
use nvnmos_node::model::NodeModel;
use parking_lot::RwLock;
use tower::ServiceExt;
use uuid::Uuid;

const VIDEO_SDP: &str = "v=0\r\n\
o=- 123456 1 IN IP4 192.0.2.10\r\n\
s=sink-0\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
m=video 5020 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.0/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=mediaclk:direct=0\r\n";

fn router_with_sender() -> (axum::Router, Uuid) {
    let mut config = NodeConfig::minimal("nmos-api.local:8080", "nmos-api.local");
    config.host_addresses = vec!["192.0.2.10".to_string()];
    let settings = Arc::new(RwLock::new(Settings::default()));
    let model = Arc::new(NodeModel::init(&config, Arc::clone(&settings)).unwrap());
    let sender_id = model.add_sender(VIDEO_SDP).unwrap();
    let engine = ConnectionEngine::new(
        Arc::clone(&model.resources),
        Arc::clone(&model.connections),
        settings,
        Arc::new(|_: &str, _: &str| {}),
    );
    (nvnmos_node::api::router(model, engine), sender_id)
}

#[tokio::test]
async fn node_self_returns_the_node_resource() {
    let (router, _sender_id) = router_with_sender();
    let response = router
        .oneshot(Request::builder().uri("/x-nmos/node/v1.3/self").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_sender_returns_404() {
    let (router, _sender_id) = router_with_sender();
    let uri = format!("/x-nmos/node/v1.3/senders/{}", Uuid::new_v4());
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trace_method_is_rejected() {
    let (router, _sender_id) = router_with_sender();
    let response = router
        .oneshot(
            Request::builder()
                .method(Method::TRACE)
                .uri("/x-nmos/node/v1.3/self")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn patch_staged_with_immediate_activation_drives_the_engine() {
    let (router, sender_id) = router_with_sender();
    let body = serde_json::json!({
        "master_enable": true,
        "activation": { "mode": "activate_immediate" },
    });
    let uri = format!("/x-nmos/connection/v1.1/single/senders/{sender_id}/staged");
    let response = router
        .oneshot(
            Request::builder()
                .method(Method::PATCH)
                .uri(&uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
