//! The "auto" parameter resolver (spec.md §4.5): fills in any transport
//! parameter the host left as the literal string `"auto"` once a sender or
//! receiver is activated.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::idgen;

const DEFAULT_RTP_PORT: u64 = 5004;

fn is_auto(value: Option<&Value>) -> bool {
    matches!(value.and_then(Value::as_str), Some("auto")) || value.is_none()
}

/// Resolves `"auto"` fields for one sender leg: `source_ip` comes from the
/// single value in `endpoint_constraints[leg].source_ip.enum` — realized
/// here as the sender's own `interface_bindings[leg]`, since that is the
/// only value ever enumerated there — and `destination_ip` comes from
/// [`idgen::source_specific_multicast_v4`]. Anything else left unresolved
/// falls back to the node's spec default.
pub fn resolve_sender_leg(
    params: &mut Map<String, Value>,
    sender_id: Uuid,
    leg: usize,
    interface_binding: &str,
) {
    if is_auto(params.get("source_ip")) {
        params.insert("source_ip".to_string(), json!(interface_binding));
    }
    if is_auto(params.get("destination_ip")) {
        let addr = idgen::source_specific_multicast_v4(&sender_id, leg);
        params.insert("destination_ip".to_string(), json!(addr));
    }
    if is_auto(params.get("destination_port")) {
        params.insert("destination_port".to_string(), json!(DEFAULT_RTP_PORT));
    }
    if is_auto(params.get("source_port")) {
        params.insert("source_port".to_string(), json!(DEFAULT_RTP_PORT));
    }
    params.entry("rtp_enabled").or_insert(json!(true));
}

/// Resolves `"auto"` fields for one receiver leg: `interface_ip` from the
/// matching `interface_bindings[leg]`; anything else unresolved falls back
/// to the node's spec default.
pub fn resolve_receiver_leg(params: &mut Map<String, Value>, interface_binding: &str) {
    if is_auto(params.get("interface_ip")) {
        params.insert("interface_ip".to_string(), json!(interface_binding));
    }
    if is_auto(params.get("destination_port")) {
        params.insert("destination_port".to_string(), json!(DEFAULT_RTP_PORT));
    }
    params.entry("rtp_enabled").or_insert(json!(true));
}

pub fn resolve_sender(params: &mut [Map<String, Value>], sender_id: Uuid, interface_bindings: &[String]) {
    for (leg, (p, binding)) in params.iter_mut().zip(interface_bindings.iter()).enumerate() {
        resolve_sender_leg(p, sender_id, leg, binding);
    }
}

pub fn resolve_receiver(params: &mut [Map<String, Value>], interface_bindings: &[String]) {
    for (p, binding) in params.iter_mut().zip(interface_bindings.iter()) {
        resolve_receiver_leg(p, binding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_auto_source_and_destination_ip() {
        let mut params = Map::new();
        params.insert("source_ip".to_string(), json!("auto"));
        params.insert("destination_ip".to_string(), json!("auto"));
        let sender_id = Uuid::new_v4();
        resolve_sender_leg(&mut params, sender_id, 0, "192.0.2.10");
        assert_eq!(params["source_ip"], json!("192.0.2.10"));
        assert!(params["destination_ip"].as_str().unwrap().starts_with("232."));
    }

    #[test]
    fn leaves_explicit_values_untouched() {
        let mut params = Map::new();
        params.insert("source_ip".to_string(), json!("10.0.0.5"));
        resolve_sender_leg(&mut params, Uuid::new_v4(), 0, "192.0.2.10");
        assert_eq!(params["source_ip"], json!("10.0.0.5"));
    }
}
