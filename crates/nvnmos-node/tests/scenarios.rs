//! End-to-end versions of spec.md §8's concrete scenarios that cross more
//! than one module (the single-module scenarios are covered by unit tests
//! colocated with `idgen`, `model::node_model`, and `connection::engine`).

use std::sync::Arc;

use nvnmos_node::config::{NodeConfig, Settings};
use nvnmos_node::connection::ConnectionEngine;
use nvnmos_node::model::{NodeModel, ResourceBody};
use parking_lot::RwLock;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

const VIDEO_SDP: &str = "v=0\r\n\
o=- 123456 1 IN IP4 192.0.2.10\r\n\
s=sink-0\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
m=video 5020 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.0/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=mediaclk:direct=0\r\n";

const DUAL_LEG_SDP: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.10\r\n\
s=sink-1\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-1\r\n\
m=video 5030 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.1/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=mediaclk:direct=0\r\n\
m=video 5040 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.2/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.11\r\n\
a=mediaclk:direct=0\r\n";

fn model_and_engine(interfaces: Vec<&str>) -> (Arc<NodeModel>, Arc<ConnectionEngine>, Arc<AtomicUsize>) {
    let mut config = NodeConfig::minimal("nmos-api.local:8080", "nmos-api.local");
    config.host_addresses = interfaces.into_iter().map(str::to_string).collect();
    let settings = Arc::new(RwLock::new(Settings::default()));
    let model = Arc::new(NodeModel::init(&config, Arc::clone(&settings)).unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    let engine = ConnectionEngine::new(
        Arc::clone(&model.resources),
        Arc::clone(&model.connections),
        settings,
        Arc::new(move |_id: &str, _sdp: &str| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }),
    );
    (model, engine, calls)
}

#[test]
fn scenario_3_activate_sender_strips_custom_attributes_and_sets_destination() {
    let (model, engine, calls) = model_and_engine(vec!["192.0.2.10"]);
    let sender_id = model.add_sender(VIDEO_SDP).unwrap();

    engine.activate_now(sender_id).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let resource = model.connections.find(sender_id).unwrap();
    let ResourceBody::ConnectionSender(body) = resource.data else {
        panic!("expected a connection-sender body")
    };
    assert!(body.endpoint_active.master_enable);
    assert_eq!(body.endpoint_active.transport_params[0]["destination_ip"], json!("233.252.0.0"));
    let file = body.transport_file_cache.unwrap();
    assert!(!file.contains("x-nvnmos"));
    assert!(file.contains("a=mediaclk:direct=0"));
}

#[test]
fn scenario_6_dual_leg_deactivation_only_flips_master_enable() {
    let (model, engine, _calls) = model_and_engine(vec!["192.0.2.10", "192.0.2.11"]);
    let sender_id = model.add_sender(DUAL_LEG_SDP).unwrap();
    engine.activate_now(sender_id).unwrap();

    let before = model.connections.find(sender_id).unwrap();
    let ResourceBody::ConnectionSender(before_body) = before.data else {
        panic!("expected a connection-sender body")
    };
    let legs_before = before_body.endpoint_active.transport_params.clone();
    assert_eq!(legs_before.len(), 2);

    engine
        .patch_staged(
            sender_id,
            &nvnmos_node::connection::StagedPatch {
                master_enable: Some(false),
                activation: None,
                transport_params: None,
            },
        )
        .unwrap();
    engine.activate_now(sender_id).unwrap();

    let after = model.connections.find(sender_id).unwrap();
    let ResourceBody::ConnectionSender(after_body) = after.data else {
        panic!("expected a connection-sender body")
    };
    assert!(!after_body.endpoint_active.master_enable);
    for (before_leg, after_leg) in legs_before.iter().zip(after_body.endpoint_active.transport_params.iter()) {
        assert_eq!(before_leg.get("rtp_enabled"), after_leg.get("rtp_enabled"));
    }
}

#[test]
fn interface_invariant_holds_after_add_and_remove() {
    let (model, _engine, _calls) = model_and_engine(vec!["192.0.2.10", "192.0.2.11"]);
    model.add_sender(VIDEO_SDP).unwrap();
    model.add_sender(DUAL_LEG_SDP).unwrap();

    let node = model.resources.find(model.node_id()).unwrap();
    let ResourceBody::Node(body) = node.data else { panic!() };
    let mut observed: Vec<String> = body.interfaces.clone();
    observed.sort();
    assert_eq!(observed, vec!["192.0.2.10".to_string(), "192.0.2.11".to_string()]);

    model.remove_sender("sink-1").unwrap();
    let node = model.resources.find(model.node_id()).unwrap();
    let ResourceBody::Node(body) = node.data else { panic!() };
    assert_eq!(body.interfaces, vec!["192.0.2.10".to_string()]);
}
