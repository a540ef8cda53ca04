//! Transport-file synthesis (spec.md §4.5): rebuilds a sender's
//! `/transportfile` body, or the SDP delivered to the activation callback,
//! from the original SDP skeleton plus the now-active transport params.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::sdp::emitter;
use crate::sdp::types::{ConnectionData, MediaLeg, ParsedSdp};

/// Seconds elapsed between the NTP epoch (1900-01-01) and the Unix epoch.
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

pub fn ntp_seconds_now() -> u64 {
    let unix = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    unix + NTP_UNIX_OFFSET
}

fn apply_leg_params(leg: &mut MediaLeg, params: &Map<String, Value>) {
    if let Some(sender) = &mut leg.sender {
        if let Some(v) = params.get("source_ip").and_then(Value::as_str) {
            sender.source_ip = Some(v.to_string());
        }
        if let Some(v) = params.get("destination_ip").and_then(Value::as_str) {
            sender.destination_ip = Some(v.to_string());
            let ttl = leg.connection.as_ref().and_then(|c| c.ttl).or(Some(32));
            leg.connection = Some(ConnectionData {
                net_type: "IN".to_string(),
                addr_type: "IP4".to_string(),
                connection_address: v.to_string(),
                ttl,
            });
        }
        if let Some(v) = params.get("destination_port").and_then(Value::as_u64) {
            sender.destination_port = v as u16;
            leg.port = v as u16;
        }
        if let Some(v) = params.get("source_port") {
            sender.source_port = v.as_u64().map(|p| p as u16);
        }
        if let Some(v) = params.get("rtp_enabled").and_then(Value::as_bool) {
            sender.rtp_enabled = v;
        }
    }
    if let Some(receiver) = &mut leg.receiver {
        if let Some(v) = params.get("interface_ip").and_then(Value::as_str) {
            receiver.interface_ip = Some(v.to_string());
        }
        if let Some(v) = params.get("multicast_ip").and_then(Value::as_str) {
            receiver.multicast_ip = Some(v.to_string());
        }
        if let Some(v) = params.get("source_ip").and_then(Value::as_str) {
            receiver.source_ip = Some(v.to_string());
        }
        if let Some(v) = params.get("destination_port").and_then(Value::as_u64) {
            receiver.destination_port = v as u16;
            leg.port = v as u16;
        }
        if let Some(v) = params.get("rtp_enabled").and_then(Value::as_bool) {
            receiver.rtp_enabled = v;
        }
    }
}

/// Merges `active_params` onto a clone of `skeleton`. If `active_params` has
/// more entries than the skeleton has media descriptions, extends by
/// duplicating the first leg and replicating its first `ts-refclk` across
/// the new legs (spec.md §4.5 "duplication-group semantics").
pub fn apply_active_params(skeleton: &ParsedSdp, active_params: &[Map<String, Value>]) -> ParsedSdp {
    let mut sdp = skeleton.clone();
    if active_params.len() > sdp.legs.len() {
        if let Some(template) = sdp.legs.first().cloned() {
            let shared_refclk = template.ts_refclk.first().cloned();
            while sdp.legs.len() < active_params.len() {
                let mut leg = template.clone();
                if let Some(clk) = &shared_refclk {
                    leg.ts_refclk = vec![clk.clone()];
                }
                sdp.legs.push(leg);
            }
        }
    }
    for (leg, params) in sdp.legs.iter_mut().zip(active_params.iter()) {
        apply_leg_params(leg, params);
    }
    sdp
}

/// Rebuilds the external-form `/transportfile` SDP for a sender (spec.md
/// §4.5). `ptp_domain` is folded in implicitly: the skeleton already carries
/// whatever domain the original SDP specified, and clock maintenance keeps
/// the node clock (not this SDP) in step with `ptp_domain_number`.
pub fn synthesize_transport_file(skeleton: &ParsedSdp, active_params: &[Map<String, Value>]) -> String {
    let merged = apply_active_params(skeleton, active_params);
    emitter::emit_external(&merged, ntp_seconds_now())
}

/// Rebuilds the internal-form SDP delivered to the host activation callback
/// (spec.md §4.5 "Activation callback").
pub fn synthesize_internal(skeleton: &ParsedSdp, active_params: &[Map<String, Value>]) -> String {
    let merged = apply_active_params(skeleton, active_params);
    emitter::emit_internal(&merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::parser::parse;
    use crate::sdp::types::Role;
    use serde_json::json;

    const VIDEO_SDP: &str = "v=0\r\n\
o=- 123456 1 IN IP4 192.0.2.10\r\n\
s=sink-0\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
m=video 5020 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.0/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
a=mediaclk:direct=0\r\n";

    #[test]
    fn strips_custom_attrs_and_applies_new_destination() {
        let skeleton = parse(VIDEO_SDP, Role::Sender).unwrap();
        let mut params = Map::new();
        params.insert("destination_ip".to_string(), json!("233.252.0.1"));
        params.insert("rtp_enabled".to_string(), json!(true));
        let file = synthesize_transport_file(&skeleton, &[params]);
        assert!(!file.contains("x-nvnmos"));
        assert!(file.contains("233.252.0.1"));
        assert!(file.contains("a=mediaclk:direct=0"));
    }

    #[test]
    fn duplicates_legs_beyond_skeleton_count_and_shares_refclk() {
        let skeleton = parse(VIDEO_SDP, Role::Sender).unwrap();
        let mut leg0 = Map::new();
        leg0.insert("destination_ip".to_string(), json!("233.252.0.0"));
        let mut leg1 = Map::new();
        leg1.insert("destination_ip".to_string(), json!("233.252.0.1"));
        let merged = apply_active_params(&skeleton, &[leg0, leg1]);
        assert_eq!(merged.legs.len(), 2);
        assert_eq!(merged.legs[1].ts_refclk, merged.legs[0].ts_refclk);
    }
}
