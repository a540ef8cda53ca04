//! Media-type to [`MediaFormat`] classification (spec.md §4.2 "Format
//! detection").

use crate::error::SdpError;
use crate::sdp::types::MediaFormat;

/// Maps an `m=` media type token to the coarse format this node
/// understands. Unrecognized media types are a hard error — spec.md §1
/// scopes support to uncompressed video, JPEG XS video, L16/L24 audio,
/// SMPTE 291 ancillary data, and SMPTE 2022-6 mux.
pub fn detect(media_type: &str) -> Result<MediaFormat, SdpError> {
    match media_type {
        "video" => Ok(MediaFormat::Video),
        "audio" => Ok(MediaFormat::Audio),
        // SMPTE 291 ancillary data rides on RTP payload type "smpte291"
        // carried as an `application` media type in practice, per ST 2110-40.
        "application" => Ok(MediaFormat::Data),
        // SMPTE 2022-6 mux streams are commonly signalled as a "video"
        // media type too, but some sources use the unofficial "mux" token;
        // accept it explicitly rather than forcing a format-specific fmtp
        // probe here.
        "mux" => Ok(MediaFormat::Mux),
        other => Err(SdpError::UnsupportedMediaType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_types() {
        assert_eq!(detect("video").unwrap(), MediaFormat::Video);
        assert_eq!(detect("audio").unwrap(), MediaFormat::Audio);
        assert_eq!(detect("application").unwrap(), MediaFormat::Data);
        assert_eq!(detect("mux").unwrap(), MediaFormat::Mux);
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(detect("text").is_err());
        assert!(detect("message").is_err());
    }
}
