//! Clock reference derivation from `a=ts-refclk` attributes (spec.md §4.2
//! "Clock"), feeding the node's `clocks[]` array (spec.md §3 invariant 3,
//! §4.4 "Clock maintenance").

use crate::sdp::types::{ParsedSdp, TsRefClk};

/// A derived clock descriptor, matching the NMOS node `clocks[]` entry
/// shapes (`internal` / `ptp`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "ref_type", rename_all = "lowercase")]
pub enum NodeClock {
    Internal {
        name: String,
    },
    Ptp {
        name: String,
        gmid: String,
        domain: u8,
        traceable: bool,
    },
}

impl NodeClock {
    pub fn name(&self) -> &str {
        match self {
            NodeClock::Internal { name } => name,
            NodeClock::Ptp { name, .. } => name,
        }
    }
}

/// The gmid used for a traceable-only PTP reference (spec.md §4.2).
pub const TRACEABLE_GMID: &str = "ff-ff-ff-ff-ff-ff-ff-ff";

/// Derives the clock descriptor implied by a parsed SDP's `ts-refclk`
/// attributes (session-level default applied per leg, spec.md §4.2).
///
/// `carried_over_domain` is the PTP domain number currently recorded for
/// `clock_name` (if any); it is used whenever a `ptp=<ver>:<gmid>` attribute
/// omits the domain.
pub fn derive_clock(sdp: &ParsedSdp, clock_name: &str, carried_over_domain: u8) -> NodeClock {
    let mut saw_localmac = false;
    let mut saw_traceable = false;

    for leg in &sdp.legs {
        for refclk in sdp.effective_ts_refclk(leg) {
            match refclk {
                TsRefClk::Ptp { gmid, domain, .. } => {
                    return NodeClock::Ptp {
                        name: clock_name.to_string(),
                        gmid: gmid.to_lowercase(),
                        domain: domain.unwrap_or(carried_over_domain),
                        traceable: false,
                    };
                }
                TsRefClk::PtpTraceable => saw_traceable = true,
                TsRefClk::LocalMac(_) => saw_localmac = true,
                TsRefClk::Other(_) => {}
            }
        }
    }

    if saw_traceable {
        return NodeClock::Ptp {
            name: clock_name.to_string(),
            gmid: TRACEABLE_GMID.to_string(),
            domain: carried_over_domain,
            traceable: true,
        };
    }

    let _ = saw_localmac;
    NodeClock::Internal {
        name: clock_name.to_string(),
    }
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
    fn ptp_gmid_is_lowercased_and_domain_parsed() {
        let parsed = parse(VIDEO_SDP, Role::Sender).unwrap();
        let clock = derive_clock(&parsed, "clk0", 0);
        assert_eq!(
            clock,
            NodeClock::Ptp {
                name: "clk0".to_string(),
                gmid: "ac-de-48-23-45-67-01-9f".to_string(),
                domain: 42,
                traceable: false,
            }
        );
    }

    #[test]
    fn no_ts_refclk_stays_internal() {
        let sdp = "v=0\r\no=- 1 1 IN IP4 192.0.2.10\r\ns=s\r\nt=0 0\r\n\
a=x-nvnmos-id:r-0\r\nm=audio 6000 RTP/AVP 97\r\na=x-nvnmos-iface-ip:192.0.2.10\r\n";
        let parsed = parse(sdp, Role::Sender).unwrap();
        let clock = derive_clock(&parsed, "clk0", 0);
        assert_eq!(
            clock,
            NodeClock::Internal {
                name: "clk0".to_string()
            }
        );
    }
}
