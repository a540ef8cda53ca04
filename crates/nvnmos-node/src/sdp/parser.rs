//! SDP parsing (spec.md §4.2 "Parse").
//!
//! This is a hand-written line parser — SDP is strictly line-oriented per
//! RFC 4566, one `<type>=<value>` per line, so a general-purpose grammar
//! parser buys nothing at the line level. `nom` is used for the two
//! attribute values with real internal structure: `a=source-filter` (RFC
//! 4570) and `a=ts-refclk`, matching how `rvoip_sip_core::sdp::parser` reaches
//! for `nom` at exactly that granularity rather than for line splitting.

use std::collections::HashMap;

use nom::bytes::complete::{tag, take_till, take_while1};
use nom::character::complete::{char, digit1, space1};
use nom::combinator::{map, opt};
use nom::sequence::{preceded, tuple};
use nom::IResult;

use crate::error::SdpError;
use crate::sdp::types::{
    ConnectionData, MediaLeg, Origin, ParsedSdp, RawAttribute, Role, SenderTransportParams,
    SessionParams, SourceFilter, SourceFilterMode, TsRefClk,
};

const ATTR_ID: &str = "x-nvnmos-id";
const ATTR_GROUP_HINT: &str = "x-nvnmos-group-hint";
const ATTR_IFACE_IP: &str = "x-nvnmos-iface-ip";
const ATTR_SRC_PORT: &str = "x-nvnmos-src-port";

struct Line<'a> {
    kind: char,
    value: &'a str,
}

fn lines(input: &str) -> Vec<Line<'_>> {
    input
        .split(['\n'])
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.is_empty())
        .filter_map(|l| {
            let mut chars = l.chars();
            let kind = chars.next()?;
            let rest = l.get(2..).unwrap_or("");
            if l.as_bytes().get(1) != Some(&b'=') {
                return None;
            }
            Some(Line { kind, value: rest })
        })
        .collect()
}

fn parse_origin(v: &str) -> Result<Origin, SdpError> {
    let parts: Vec<&str> = v.split_whitespace().collect();
    if parts.len() != 6 {
        return Err(SdpError::Malformed(format!("bad o= line: {v}")));
    }
    Ok(Origin {
        username: parts[0].to_string(),
        sess_id: parts[1].to_string(),
        sess_version: parts[2].to_string(),
        net_type: parts[3].to_string(),
        addr_type: parts[4].to_string(),
        unicast_address: parts[5].to_string(),
    })
}

fn parse_connection(v: &str) -> Result<ConnectionData, SdpError> {
    let parts: Vec<&str> = v.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(SdpError::Malformed(format!("bad c= line: {v}")));
    }
    let (addr, ttl) = match parts[2].split_once('/') {
        Some((addr, ttl)) => (
            addr.to_string(),
            ttl.parse::<u8>().ok().filter(|_| parts[1] == "IP4"),
        ),
        None => (parts[2].to_string(), None),
    };
    Ok(ConnectionData {
        net_type: parts[0].to_string(),
        addr_type: parts[1].to_string(),
        connection_address: addr,
        ttl,
    })
}

fn parse_time(v: &str) -> Result<(String, String), SdpError> {
    let parts: Vec<&str> = v.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(SdpError::Malformed(format!("bad t= line: {v}")));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

fn parse_group(v: &str) -> Option<(String, Vec<String>)> {
    let mut parts = v.split_whitespace();
    let semantics = parts.next()?.to_string();
    Some((semantics, parts.map(str::to_string).collect()))
}

// `incl` | `excl`
fn source_filter_mode(i: &str) -> IResult<&str, SourceFilterMode> {
    map(nom::branch::alt((tag("incl"), tag("excl"))), |m: &str| {
        if m == "incl" {
            SourceFilterMode::Incl
        } else {
            SourceFilterMode::Excl
        }
    })(i)
}

fn token(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(i)
}

/// `<mode> <nettype> <addrtype> <dest-addr> <src-addr>*`
fn parse_source_filter_nom(i: &str) -> IResult<&str, SourceFilter> {
    let (i, (mode, _, _net_type, _, _addr_type, _, dest)) = tuple((
        source_filter_mode,
        space1,
        token,
        space1,
        token,
        space1,
        token,
    ))(i)?;
    let mut rest = i;
    let mut sources = Vec::new();
    loop {
        match preceded(space1, token)(rest) {
            Ok((r, s)) => {
                sources.push(s.to_string());
                rest = r;
            }
            Err(_) => break,
        }
    }
    Ok((
        rest,
        SourceFilter {
            mode,
            destination_address: dest.to_string(),
            source_addresses: sources,
        },
    ))
}

fn parse_source_filter(v: &str) -> Result<SourceFilter, SdpError> {
    // `a=source-filter: incl IN IP4 <dest> <src> [<src> ...]`
    let v = v.trim_start_matches(':').trim();
    parse_source_filter_nom(v)
        .map(|(_, sf)| sf)
        .map_err(|e| SdpError::Malformed(format!("bad source-filter: {e}")))
}

fn hex_octet(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_hexdigit())(i)
}

/// `ptp=<version>:<gmid>[:<domain>]`
fn parse_ts_refclk_ptp(i: &str) -> IResult<&str, TsRefClk> {
    let (i, _) = tag("ptp=")(i)?;
    let (i, version) = take_till(|c| c == ':')(i)?;
    let (i, _) = char(':')(i)?;
    let (i, gmid) = take_till(|c: char| c == ':' || c.is_whitespace())(i)?;
    let (i, domain) = opt(preceded(char(':'), digit1))(i)?;
    Ok((
        i,
        TsRefClk::Ptp {
            version: version.to_string(),
            gmid: gmid.to_string(),
            domain: domain.and_then(|d: &str| d.parse().ok()),
        },
    ))
}

fn parse_ts_refclk(v: &str) -> TsRefClk {
    let v = v.trim_start_matches(':').trim();
    if v == "ptp=traceable" {
        return TsRefClk::PtpTraceable;
    }
    if let Ok((_, clk)) = parse_ts_refclk_ptp(v) {
        return clk;
    }
    if let Some(mac) = v.strip_prefix("localmac=") {
        return TsRefClk::LocalMac(mac.to_string());
    }
    TsRefClk::Other(v.to_string())
}

fn parse_fmtp(v: &str, expected_fmt: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Some((fmt, params)) = v.split_once(' ') else {
        return map;
    };
    if fmt != expected_fmt {
        return map;
    }
    for kv in params.split(';') {
        let kv = kv.trim();
        if kv.is_empty() {
            continue;
        }
        if let Some((k, val)) = kv.split_once('=') {
            map.insert(k.trim().to_string(), val.trim().to_string());
        } else {
            map.insert(kv.to_string(), String::new());
        }
    }
    map
}

struct ParsedAttr<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

fn split_attr(v: &str) -> ParsedAttr<'_> {
    match v.split_once(':') {
        Some((name, value)) => ParsedAttr {
            name,
            value: Some(value),
        },
        None => ParsedAttr {
            name: v,
            value: None,
        },
    }
}

/// Parses an SDP payload into session parameters, per-leg transport params,
/// and the custom internal id / group hint / session info (spec.md §4.2).
pub fn parse(sdp_text: &str, role: Role) -> Result<ParsedSdp, SdpError> {
    let lines = lines(sdp_text);

    let mut origin = None;
    let mut session_name = String::new();
    let mut session_info = None;
    let mut session_connection = None;
    let mut time_active = ("0".to_string(), "0".to_string());
    let mut group = None;
    let mut session_ts_refclk = Vec::new();
    let mut session_media_clock = None;
    let mut internal_id = None;
    let mut group_hint = None;
    let mut session_other = Vec::new();

    let mut legs: Vec<MediaLeg> = Vec::new();

    for line in &lines {
        if line.kind == 'm' {
            break; // everything from here on is media-level, handled below
        }
        match line.kind {
            'o' => origin = Some(parse_origin(line.value)?),
            's' => session_name = line.value.to_string(),
            'i' => session_info = Some(line.value.to_string()),
            'c' => session_connection = Some(parse_connection(line.value)?),
            't' => time_active = parse_time(line.value)?,
            'a' => {
                let attr = split_attr(line.value);
                match attr.name {
                    ATTR_ID => internal_id = attr.value.map(str::to_string),
                    ATTR_GROUP_HINT => group_hint = attr.value.map(str::to_string),
                    "group" => group = attr.value.and_then(parse_group),
                    "ts-refclk" => session_ts_refclk.push(parse_ts_refclk(attr.value.unwrap_or(""))),
                    "mediaclk" => session_media_clock = attr.value.map(str::to_string),
                    _ => session_other.push(RawAttribute {
                        name: attr.name.to_string(),
                        value: attr.value.map(str::to_string),
                    }),
                }
            }
            _ => {}
        }
    }

    let origin = origin.ok_or_else(|| SdpError::Malformed("missing o= line".to_string()))?;
    let internal_id =
        internal_id.ok_or(SdpError::MissingAttribute("x-nvnmos-id"))?;

    // Second pass: media descriptions, each terminated by the next `m=` or EOF.
    let mut idx = 0;
    while idx < lines.len() {
        if lines[idx].kind != 'm' {
            idx += 1;
            continue;
        }
        let m_parts: Vec<&str> = lines[idx].value.split_whitespace().collect();
        if m_parts.len() < 4 {
            return Err(SdpError::Malformed(format!("bad m= line: {}", lines[idx].value)));
        }
        let media_type = m_parts[0].to_string();
        let format = crate::sdp::format::detect(&media_type)?;
        let port: u16 = m_parts[1]
            .parse()
            .map_err(|_| SdpError::InvalidValue { field: "m=port", value: m_parts[1].to_string() })?;
        let proto = m_parts[2].to_string();
        let fmt = m_parts[3].to_string();

        let mut connection = session_connection.clone();
        let mut source_filter = None;
        let mut bandwidth_as = None;
        let mut fmtp = HashMap::new();
        let mut ts_refclk = Vec::new();
        let mut media_clock = None;
        let mut iface_ip = None;
        let mut src_port = None;
        let mut rtp_enabled = true;
        let mut other_attributes = Vec::new();

        idx += 1;
        while idx < lines.len() && lines[idx].kind != 'm' {
            let line = &lines[idx];
            match line.kind {
                'c' => connection = Some(parse_connection(line.value)?),
                'b' => {
                    if let Some(rest) = line.value.strip_prefix("AS:") {
                        bandwidth_as = rest.parse::<u64>().ok();
                    }
                }
                'a' => {
                    let attr = split_attr(line.value);
                    match attr.name {
                        ATTR_IFACE_IP => iface_ip = attr.value.map(str::to_string),
                        ATTR_SRC_PORT => {
                            src_port = attr.value.and_then(|v| v.parse::<u16>().ok())
                        }
                        "fmtp" => fmtp = parse_fmtp(attr.value.unwrap_or(""), &fmt),
                        "ts-refclk" => {
                            ts_refclk.push(parse_ts_refclk(attr.value.unwrap_or("")))
                        }
                        "mediaclk" => media_clock = attr.value.map(str::to_string),
                        "source-filter" => {
                            source_filter = Some(parse_source_filter(attr.value.unwrap_or(""))?)
                        }
                        "inactive" => rtp_enabled = false,
                        _ => other_attributes.push(RawAttribute {
                            name: attr.name.to_string(),
                            value: attr.value.map(str::to_string),
                        }),
                    }
                }
                _ => {}
            }
            idx += 1;
        }

        let destination_ip = connection
            .as_ref()
            .map(|c| c.connection_address.clone())
            .or_else(|| source_filter.as_ref().map(|s| s.destination_address.clone()));

        let (sender, receiver) = match role {
            Role::Sender => (
                Some(SenderTransportParams {
                    source_ip: iface_ip.clone(),
                    destination_ip,
                    destination_port: port,
                    source_port: src_port,
                    rtp_enabled,
                }),
                None,
            ),
            Role::Receiver => (
                None,
                Some(crate::sdp::types::ReceiverTransportParams {
                    interface_ip: iface_ip.clone(),
                    multicast_ip: destination_ip,
                    source_ip: source_filter
                        .as_ref()
                        .and_then(|s| s.source_addresses.first().cloned()),
                    destination_port: port,
                    rtp_enabled,
                }),
            ),
        };

        legs.push(MediaLeg {
            media_type,
            format,
            port,
            proto,
            fmt,
            connection,
            source_filter,
            bandwidth_as,
            fmtp,
            ts_refclk,
            media_clock,
            sender,
            receiver,
            other_attributes,
        });
    }

    Ok(ParsedSdp {
        session: SessionParams {
            origin,
            session_name,
            connection: session_connection,
            time_active,
            group,
            ts_refclk: session_ts_refclk,
            media_clock: session_media_clock,
            other_attributes: session_other,
        },
        legs,
        internal_id,
        group_hint,
        session_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_SDP: &str = "v=0\r\n\
o=- 123456 1 IN IP4 192.0.2.10\r\n\
s=sink-0\r\n\
i=Example video flow\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
a=x-nvnmos-group-hint:tag1\r\n\
m=video 5020 RTP/AVP 96\r\n\
c=IN IP4 233.252.0.0/32\r\n\
a=x-nvnmos-iface-ip:192.0.2.10\r\n\
a=x-nvnmos-src-port:5020\r\n\
a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
a=mediaclk:direct=0\r\n\
a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080\r\n";

    #[test]
    fn parses_session_and_leg_basics() {
        let parsed = parse(VIDEO_SDP, Role::Sender).unwrap();
        assert_eq!(parsed.internal_id, "sink-0");
        assert_eq!(parsed.group_hint.as_deref(), Some("tag1"));
        assert_eq!(parsed.session_info.as_deref(), Some("Example video flow"));
        assert_eq!(parsed.legs.len(), 1);
        let leg = &parsed.legs[0];
        assert_eq!(leg.port, 5020);
        let sender = leg.sender.as_ref().unwrap();
        assert_eq!(sender.source_ip.as_deref(), Some("192.0.2.10"));
        assert_eq!(sender.destination_ip.as_deref(), Some("233.252.0.0"));
        assert_eq!(sender.source_port, Some(5020));
        assert!(sender.rtp_enabled);
        assert_eq!(leg.fmtp.get("width").map(String::as_str), Some("1920"));
    }

    #[test]
    fn inactive_media_disables_rtp() {
        let sdp = VIDEO_SDP.replace(
            "a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080\r\n",
            "a=inactive\r\n",
        );
        let parsed = parse(&sdp, Role::Sender).unwrap();
        assert!(!parsed.legs[0].sender.as_ref().unwrap().rtp_enabled);
    }

    #[test]
    fn missing_internal_id_is_an_error() {
        let sdp = VIDEO_SDP.replace("a=x-nvnmos-id:sink-0\r\n", "");
        assert!(parse(&sdp, Role::Sender).is_err());
    }

    #[test]
    fn unsupported_media_type_is_an_error() {
        let sdp = VIDEO_SDP.replace("m=video", "m=text");
        assert!(parse(&sdp, Role::Sender).is_err());
    }

    #[test]
    fn source_filter_recovers_receiver_source_ip() {
        let sdp = "v=0\r\no=- 1 1 IN IP4 192.0.2.20\r\ns=r-0\r\nt=0 0\r\n\
a=x-nvnmos-id:r-0\r\nm=audio 6000 RTP/AVP 97\r\nc=IN IP4 239.1.1.1/32\r\n\
a=source-filter: incl IN IP4 239.1.1.1 192.0.2.10\r\n\
a=x-nvnmos-iface-ip:192.0.2.20\r\n";
        let parsed = parse(sdp, Role::Receiver).unwrap();
        let recv = parsed.legs[0].receiver.as_ref().unwrap();
        assert_eq!(recv.multicast_ip.as_deref(), Some("239.1.1.1"));
        assert_eq!(recv.source_ip.as_deref(), Some("192.0.2.10"));
        assert_eq!(recv.interface_ip.as_deref(), Some("192.0.2.20"));
    }
}
