//! yt-dlp `-J` output parser.

use relink_fetch::{FormatEntry, RawExtraction};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ProviderError;

// ============================================================================
// JSON Response Structs
// ============================================================================

/// Top-level info dict printed by `yt-dlp -J`.
#[derive(Debug, Default, Deserialize)]
pub struct YtDlpInfo {
    /// Video or stream id.
    #[serde(default)]
    pub id: Option<String>,

    /// URL of the selected format, when a single format was picked.
    #[serde(default)]
    pub url: Option<String>,

    /// Master manifest of the selected format.
    #[serde(default)]
    pub manifest_url: Option<String>,

    /// Every format the extractor found.
    #[serde(default)]
    pub formats: Vec<YtDlpFormat>,

    /// Headers yt-dlp would send when downloading.
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,

    /// `is_live`, `is_upcoming`, `was_live`, `not_live`, ...
    #[serde(default)]
    pub live_status: Option<String>,
}

/// One entry of `formats[]`.
#[derive(Debug, Default, Deserialize)]
pub struct YtDlpFormat {
    /// Format identifier, e.g. `96` or `hls-1080p`.
    #[serde(default)]
    pub format_id: Option<String>,
    /// Media URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Master manifest the format was taken from.
    #[serde(default)]
    pub manifest_url: Option<String>,
    /// `https`, `m3u8`, `m3u8_native`, ...
    #[serde(default)]
    pub protocol: Option<String>,
    /// Video height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
    /// Total bitrate in kbit/s.
    #[serde(default)]
    pub tbr: Option<f64>,
    /// Audio codec, `none` for video-only.
    #[serde(default)]
    pub acodec: Option<String>,
    /// Video codec, `none` for audio-only.
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Per-format request headers.
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

impl YtDlpFormat {
    fn is_hls(&self) -> bool {
        self.protocol
            .as_deref()
            .is_some_and(|p| p.starts_with("m3u8"))
    }

    fn to_entry(&self) -> Option<FormatEntry> {
        let url = self.url.as_deref().filter(|u| !u.trim().is_empty())?;
        Some(FormatEntry {
            url: url.to_string(),
            protocol: self.protocol.clone().unwrap_or_default(),
            height: self.height,
            bitrate: self.tbr,
            has_audio: codec_present(self.acodec.as_deref()),
            has_video: codec_present(self.vcodec.as_deref()),
        })
    }
}

/// yt-dlp writes `"none"` for an absent track; a missing field means unknown.
fn codec_present(codec: Option<&str>) -> bool {
    codec.is_none_or(|c| c != "none")
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses `yt-dlp -J` stdout into a raw extraction.
pub fn parse_info(json: &str) -> Result<RawExtraction, ProviderError> {
    let info: YtDlpInfo = serde_json::from_str(json.trim())?;

    if info.live_status.as_deref() == Some("is_upcoming") {
        return Err(ProviderError::ParseError(
            "live event has not started yet".to_string(),
        ));
    }

    let manifest_url = non_blank(info.manifest_url.as_ref()).or_else(|| {
        info.formats
            .iter()
            .filter(|f| f.is_hls())
            .find_map(|f| non_blank(f.manifest_url.as_ref()))
    });
    let formats: Vec<FormatEntry> = info.formats.iter().filter_map(YtDlpFormat::to_entry).collect();
    let direct_url = non_blank(info.url.as_ref());

    if manifest_url.is_none() && formats.is_empty() && direct_url.is_none() {
        return Err(ProviderError::NoStreams);
    }

    let headers_observed = if info.http_headers.is_empty() {
        info.formats
            .iter()
            .find(|f| !f.http_headers.is_empty())
            .map(|f| f.http_headers.clone())
            .unwrap_or_default()
    } else {
        info.http_headers
    };

    debug!(
        id = info.id.as_deref().unwrap_or("?"),
        formats = formats.len(),
        has_manifest = manifest_url.is_some(),
        has_direct = direct_url.is_some(),
        "Parsed yt-dlp info"
    );

    Ok(RawExtraction {
        manifest_url,
        formats,
        direct_url,
        headers_observed,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const LIVE_INFO: &str = r#"{
        "id": "abc123",
        "live_status": "is_live",
        "formats": [
            {
                "format_id": "91",
                "url": "https://rr1.googlevideo.com/videoplayback/91/index.m3u8",
                "manifest_url": "https://manifest.googlevideo.com/api/manifest/hls_variant/master.m3u8",
                "protocol": "m3u8_native",
                "height": 144,
                "tbr": 290.3,
                "acodec": "mp4a.40.5",
                "vcodec": "avc1.42c00b"
            },
            {
                "format_id": "95",
                "url": "https://rr1.googlevideo.com/videoplayback/95/index.m3u8",
                "manifest_url": "https://manifest.googlevideo.com/api/manifest/hls_variant/master.m3u8",
                "protocol": "m3u8_native",
                "height": 720,
                "tbr": 2500.0,
                "acodec": "mp4a.40.2",
                "vcodec": "avc1.4d401f"
            }
        ],
        "http_headers": {
            "User-Agent": "Mozilla/5.0 (yt-dlp)",
            "Accept-Language": "en-us,en;q=0.5"
        }
    }"#;

    #[test]
    fn test_parse_live_info() {
        let raw = parse_info(LIVE_INFO).unwrap();

        assert_eq!(
            raw.manifest_url.as_deref(),
            Some("https://manifest.googlevideo.com/api/manifest/hls_variant/master.m3u8")
        );
        assert_eq!(raw.formats.len(), 2);
        assert_eq!(raw.formats[1].height, Some(720));
        assert_eq!(raw.formats[1].bitrate, Some(2500.0));
        assert!(raw.formats[1].is_muxed());
        assert!(raw.direct_url.is_none());
        assert_eq!(
            raw.headers_observed.get("User-Agent").map(String::as_str),
            Some("Mozilla/5.0 (yt-dlp)")
        );
    }

    #[test]
    fn test_parse_video_only_and_unknown_codecs() {
        let json = r#"{
            "url": "https://cdn.example/v.mp4",
            "formats": [
                {"url": "https://cdn.example/v.mp4", "protocol": "https", "acodec": "none", "vcodec": "vp9"},
                {"url": "https://cdn.example/x.m3u8", "protocol": "m3u8"},
                {"protocol": "https", "acodec": "opus"}
            ]
        }"#;

        let raw = parse_info(json).unwrap();

        assert_eq!(raw.formats.len(), 2);
        assert!(!raw.formats[0].has_audio);
        assert!(raw.formats[0].has_video);
        assert!(raw.formats[1].is_muxed());
        assert_eq!(raw.direct_url.as_deref(), Some("https://cdn.example/v.mp4"));
        assert!(raw.manifest_url.is_none());
    }

    #[test]
    fn test_top_level_manifest_wins() {
        let json = r#"{
            "manifest_url": "https://top/master.m3u8",
            "formats": [
                {"url": "https://f/index.m3u8", "manifest_url": "https://other/master.m3u8", "protocol": "m3u8_native"}
            ]
        }"#;

        let raw = parse_info(json).unwrap();
        assert_eq!(raw.manifest_url.as_deref(), Some("https://top/master.m3u8"));
    }

    #[test]
    fn test_headers_fall_back_to_format() {
        let json = r#"{
            "formats": [
                {"url": "https://f/a.mp4", "protocol": "https", "http_headers": {"Referer": "https://site/"}}
            ]
        }"#;

        let raw = parse_info(json).unwrap();
        assert_eq!(
            raw.headers_observed.get("Referer").map(String::as_str),
            Some("https://site/")
        );
    }

    #[test]
    fn test_empty_info_has_no_streams() {
        assert!(matches!(
            parse_info(r#"{"id": "x", "formats": []}"#),
            Err(ProviderError::NoStreams)
        ));
        assert!(matches!(
            parse_info(r#"{"url": "   "}"#),
            Err(ProviderError::NoStreams)
        ));
    }

    #[test]
    fn test_upcoming_event_is_an_error() {
        let json = r#"{"live_status": "is_upcoming", "url": "https://x/y"}"#;
        match parse_info(json) {
            Err(ProviderError::ParseError(msg)) => assert!(msg.contains("not started")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            parse_info("WARNING: something\n"),
            Err(ProviderError::ParseError(_))
        ));
    }
}
