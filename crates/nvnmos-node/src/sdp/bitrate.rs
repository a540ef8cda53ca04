//! Format/transport bit-rate resolution for JPEG XS flows (spec.md §4.2
//! "Bit rate"). All values are expressed in Mbps, matching the published
//! JPEG XS flow/receiver-capability schemas this node targets.

use std::collections::HashMap;

const FORMAT_BIT_RATE_FMTP: &str = "x-nvnmos-format-bit-rate";
const TRANSPORT_BIT_RATE_FMTP: &str = "x-nvnmos-transport-bit-rate";

/// Resolves the format (payload) bit rate: the custom fmtp parameter if
/// present, else derived from the custom transport bit rate or the `b=AS:`
/// line (both divided by 1.05 to back out transport overhead).
pub fn format_bit_rate(fmtp: &HashMap<String, String>, b_as_mbps: Option<f64>) -> Option<f64> {
    if let Some(v) = fmtp.get(FORMAT_BIT_RATE_FMTP) {
        return v.parse().ok();
    }
    if let Some(v) = fmtp.get(TRANSPORT_BIT_RATE_FMTP) {
        let transport: f64 = v.parse().ok()?;
        return Some(transport / 1.05);
    }
    b_as_mbps.map(|as_mbps| as_mbps / 1.05)
}

/// Resolves the transport bit rate: the custom fmtp parameter if present,
/// else `ceil(format_bit_rate * 1.05)` rounded to the nearest whole Mbps,
/// else the `b=AS:` value.
pub fn transport_bit_rate(
    fmtp: &HashMap<String, String>,
    format_bit_rate: Option<f64>,
    b_as_mbps: Option<f64>,
) -> Option<f64> {
    if let Some(v) = fmtp.get(TRANSPORT_BIT_RATE_FMTP) {
        return v.parse().ok();
    }
    if let Some(format_rate) = format_bit_rate {
        return Some((format_rate * 1.05).ceil());
    }
    b_as_mbps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_explicit_format_bit_rate() {
        let mut fmtp = HashMap::new();
        fmtp.insert(FORMAT_BIT_RATE_FMTP.to_string(), "10.5".to_string());
        assert_eq!(format_bit_rate(&fmtp, Some(20.0)), Some(10.5));
    }

    #[test]
    fn derives_format_from_transport() {
        let mut fmtp = HashMap::new();
        fmtp.insert(TRANSPORT_BIT_RATE_FMTP.to_string(), "10.5".to_string());
        let rate = format_bit_rate(&fmtp, None).unwrap();
        assert!((rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn derives_format_from_b_as() {
        let fmtp = HashMap::new();
        let rate = format_bit_rate(&fmtp, Some(10.5)).unwrap();
        assert!((rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn transport_prefers_explicit_then_derives_then_b_as() {
        let mut fmtp = HashMap::new();
        fmtp.insert(TRANSPORT_BIT_RATE_FMTP.to_string(), "12.0".to_string());
        assert_eq!(transport_bit_rate(&fmtp, Some(5.0), Some(99.0)), Some(12.0));

        let fmtp = HashMap::new();
        let t = transport_bit_rate(&fmtp, Some(10.0), Some(99.0)).unwrap();
        assert_eq!(t, 11.0);

        let t2 = transport_bit_rate(&fmtp, None, Some(7.0)).unwrap();
        assert_eq!(t2, 7.0);
    }
}
