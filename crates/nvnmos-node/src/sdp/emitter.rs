//! SDP emission: the internal form (carries every `x-nvnmos-*` attribute)
//! and the external/"transport file" form (the same SDP with those
//! attributes stripped and the origin version refreshed), per spec.md §4.2
//! "Emit".

use crate::sdp::types::{MediaLeg, ParsedSdp};

const ATTR_ID: &str = "x-nvnmos-id";
const ATTR_GROUP_HINT: &str = "x-nvnmos-group-hint";
const ATTR_IFACE_IP: &str = "x-nvnmos-iface-ip";
const ATTR_SRC_PORT: &str = "x-nvnmos-src-port";
const FMTP_FORMAT_BIT_RATE: &str = "x-nvnmos-format-bit-rate";
const FMTP_TRANSPORT_BIT_RATE: &str = "x-nvnmos-transport-bit-rate";

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push_str("\r\n");
}

fn ts_refclk_value(clk: &crate::sdp::types::TsRefClk) -> String {
    use crate::sdp::types::TsRefClk::*;
    match clk {
        Ptp {
            version,
            gmid,
            domain: Some(d),
        } => format!("ptp={version}:{gmid}:{d}"),
        Ptp {
            version,
            gmid,
            domain: None,
        } => format!("ptp={version}:{gmid}"),
        PtpTraceable => "ptp=traceable".to_string(),
        LocalMac(mac) => format!("localmac={mac}"),
        Other(raw) => raw.clone(),
    }
}

fn emit_fmtp(leg: &MediaLeg, strip_nvnmos: bool) -> Option<String> {
    if leg.fmtp.is_empty() {
        return None;
    }
    let mut keys: Vec<&String> = leg
        .fmtp
        .keys()
        .filter(|k| !(strip_nvnmos && (k.as_str() == FMTP_FORMAT_BIT_RATE || k.as_str() == FMTP_TRANSPORT_BIT_RATE)))
        .collect();
    if keys.is_empty() {
        return None;
    }
    keys.sort();
    let params = keys
        .iter()
        .map(|k| {
            let v = &leg.fmtp[*k];
            if v.is_empty() {
                (*k).clone()
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ");
    Some(format!("a=fmtp:{} {}\r\n", leg.fmt, params))
}

fn emit_leg(out: &mut String, leg: &MediaLeg, strip_nvnmos: bool) {
    push_line(out, format!("m={} {} {} {}", leg.media_type, leg.port, leg.proto, leg.fmt));
    if let Some(c) = &leg.connection {
        let addr = match c.ttl {
            Some(ttl) => format!("{}/{}", c.connection_address, ttl),
            None => c.connection_address.clone(),
        };
        push_line(out, format!("c={} {} {}", c.net_type, c.addr_type, addr));
    }
    if let Some(b) = leg.bandwidth_as {
        push_line(out, format!("b=AS:{b}"));
    }
    if !strip_nvnmos {
        let iface_ip = leg
            .sender
            .as_ref()
            .and_then(|s| s.source_ip.as_ref())
            .or_else(|| leg.receiver.as_ref().and_then(|r| r.interface_ip.as_ref()));
        if let Some(ip) = iface_ip {
            push_line(out, format!("a={ATTR_IFACE_IP}:{ip}"));
        }
        if let Some(sender) = &leg.sender {
            if let Some(port) = sender.source_port {
                push_line(out, format!("a={ATTR_SRC_PORT}:{port}"));
            }
        }
    }
    if let Some(fmtp_line) = emit_fmtp(leg, strip_nvnmos) {
        out.push_str(&fmtp_line);
    }
    if let Some(sf) = &leg.source_filter {
        let mode = match sf.mode {
            crate::sdp::types::SourceFilterMode::Incl => "incl",
            crate::sdp::types::SourceFilterMode::Excl => "excl",
        };
        let srcs = sf.source_addresses.join(" ");
        push_line(
            out,
            format!("a=source-filter: {mode} IN IP4 {} {srcs}", sf.destination_address),
        );
    }
    for clk in &leg.ts_refclk {
        push_line(out, format!("a=ts-refclk:{}", ts_refclk_value(clk)));
    }
    if let Some(mc) = &leg.media_clock {
        push_line(out, format!("a=mediaclk:{mc}"));
    }
    let rtp_enabled = leg
        .sender
        .as_ref()
        .map(|s| s.rtp_enabled)
        .or_else(|| leg.receiver.as_ref().map(|r| r.rtp_enabled))
        .unwrap_or(true);
    if !rtp_enabled {
        push_line(out, "a=inactive");
    }
    for attr in &leg.other_attributes {
        match &attr.value {
            Some(v) => push_line(out, format!("a={}:{v}", attr.name)),
            None => push_line(out, format!("a={}", attr.name)),
        }
    }
}

fn emit(parsed: &ParsedSdp, strip_nvnmos: bool, sess_version_override: Option<&str>) -> String {
    let mut out = String::new();
    push_line(&mut out, "v=0");
    let o = &parsed.session.origin;
    let sess_version = sess_version_override.unwrap_or(&o.sess_version);
    push_line(
        &mut out,
        format!(
            "o={} {} {} {} {} {}",
            o.username, o.sess_id, sess_version, o.net_type, o.addr_type, o.unicast_address
        ),
    );
    push_line(&mut out, format!("s={}", parsed.session.session_name));
    if let Some(info) = &parsed.session_info {
        push_line(&mut out, format!("i={info}"));
    }
    if let Some(c) = &parsed.session.connection {
        push_line(&mut out, format!("c={} {} {}", c.net_type, c.addr_type, c.connection_address));
    }
    push_line(
        &mut out,
        format!("t={} {}", parsed.session.time_active.0, parsed.session.time_active.1),
    );
    if !strip_nvnmos {
        push_line(&mut out, format!("a={ATTR_ID}:{}", parsed.internal_id));
        if let Some(hint) = &parsed.group_hint {
            push_line(&mut out, format!("a={ATTR_GROUP_HINT}:{hint}"));
        }
    }
    if let Some((sem, ids)) = &parsed.session.group {
        push_line(&mut out, format!("a=group:{} {}", sem, ids.join(" ")));
    }
    for clk in &parsed.session.ts_refclk {
        push_line(&mut out, format!("a=ts-refclk:{}", ts_refclk_value(clk)));
    }
    if let Some(mc) = &parsed.session.media_clock {
        push_line(&mut out, format!("a=mediaclk:{mc}"));
    }
    for attr in &parsed.session.other_attributes {
        match &attr.value {
            Some(v) => push_line(&mut out, format!("a={}:{v}", attr.name)),
            None => push_line(&mut out, format!("a={}", attr.name)),
        }
    }
    for leg in &parsed.legs {
        emit_leg(&mut out, leg, strip_nvnmos);
    }
    out
}

/// Internal form: carries every `x-nvnmos-*` attribute (spec.md §4.2 "Emit
/// (internal form)").
pub fn emit_internal(parsed: &ParsedSdp) -> String {
    emit(parsed, false, None)
}

/// External/transport-file form: `x-nvnmos-*` stripped, origin version
/// refreshed to `ntp_seconds` (spec.md §4.2 "Emit (external form)"). Calling
/// this twice with the same `ntp_seconds` on an unchanged sender yields a
/// bit-equal SDP.
pub fn emit_external(parsed: &ParsedSdp, ntp_seconds: u64) -> String {
    emit(parsed, true, Some(&ntp_seconds.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::parser::parse;
    use crate::sdp::types::Role;

    const VIDEO_SDP: &str = "v=0\r\n\
o=- 123456 1 IN IP4 192.0.2.10\r\n\
s=sink-0\r\n\
i=Example video flow\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
m=video 5020 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.0/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
a=mediaclk:direct=0\r\n";

    #[test]
    fn round_trip_internal_preserves_semantics() {
        let parsed = parse(VIDEO_SDP, Role::Sender).unwrap();
        let emitted = emit_internal(&parsed);
        let reparsed = parse(&emitted, Role::Sender).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn external_form_strips_custom_attributes_and_keeps_mediaclk() {
        let parsed = parse(VIDEO_SDP, Role::Sender).unwrap();
        let emitted = emit_external(&parsed, 1_800_000_000);
        assert!(!emitted.contains("x-nvnmos"));
        assert!(emitted.contains("a=mediaclk:direct=0"));
        assert!(emitted.contains("o=- 123456 1800000000 IN IP4 192.0.2.10"));
    }

    #[test]
    fn external_form_is_stable_within_same_ntp_second() {
        let parsed = parse(VIDEO_SDP, Role::Sender).unwrap();
        let a = emit_external(&parsed, 1_800_000_000);
        let b = emit_external(&parsed, 1_800_000_000);
        assert_eq!(a, b);
    }
}
