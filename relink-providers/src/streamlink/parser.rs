//! streamlink `--json` output parser.

use relink_fetch::RawExtraction;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ProviderError;

/// Qualities tried after the requested one, in order.
const QUALITY_PRIORITY: &[&str] = &["best", "1080p", "720p", "480p", "worst"];

// ============================================================================
// JSON Response Structs
// ============================================================================

/// Output of `streamlink --json <url>`.
#[derive(Debug, Default, Deserialize)]
pub struct StreamlinkOutput {
    /// Plugin that handled the URL.
    #[serde(default)]
    pub plugin: Option<String>,

    /// Streams keyed by quality name.
    #[serde(default)]
    pub streams: BTreeMap<String, StreamlinkStream>,

    /// Set instead of `streams` when resolution failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// One stream entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamlinkStream {
    /// `hls`, `http`, `dash`, `muxed`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Stream URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Master playlist for `hls` streams.
    #[serde(default)]
    pub master: Option<String>,
    /// Request headers streamlink would send.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl StreamlinkStream {
    fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

impl StreamlinkOutput {
    /// Picks the requested quality, then the fixed priority list, then any stream.
    pub fn select(&self, preferred: &str) -> Option<(&str, &StreamlinkStream)> {
        std::iter::once(preferred)
            .chain(QUALITY_PRIORITY.iter().copied())
            .filter_map(|q| self.streams.get_key_value(q))
            .chain(self.streams.iter())
            .find(|(_, s)| s.url().is_some())
            .map(|(q, s)| (q.as_str(), s))
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Extracts the error message from a `--json` failure document, if stdout holds one.
pub fn parse_error(json: &str) -> Option<String> {
    serde_json::from_str::<StreamlinkOutput>(json.trim())
        .ok()
        .and_then(|o| o.error)
}

/// Parses `streamlink --json` stdout into a raw extraction.
pub fn parse_output(json: &str, preferred: &str) -> Result<RawExtraction, ProviderError> {
    let output: StreamlinkOutput = serde_json::from_str(json.trim())?;

    if let Some(error) = output.error {
        return Err(ProviderError::ParseError(error));
    }

    let (quality, stream) = output.select(preferred).ok_or(ProviderError::NoStreams)?;
    let url = stream.url().map(str::to_string);

    debug!(
        plugin = output.plugin.as_deref().unwrap_or("?"),
        quality,
        kind = %stream.kind,
        "Parsed streamlink output"
    );

    let mut raw = RawExtraction {
        headers_observed: stream.headers.clone(),
        ..Default::default()
    };
    if stream.kind == "hls" {
        raw.manifest_url = url;
    } else {
        raw.direct_url = url;
    }
    Ok(raw)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"{
        "plugin": "youtube",
        "metadata": {"id": "abc", "author": "Channel", "title": "Live"},
        "streams": {
            "480p": {"type": "hls", "url": "https://cdn/480.m3u8", "headers": {}, "master": "https://cdn/master.m3u8"},
            "720p": {"type": "hls", "url": "https://cdn/720.m3u8", "headers": {"User-Agent": "SL"}, "master": "https://cdn/master.m3u8"},
            "best": {"type": "hls", "url": "https://cdn/720.m3u8", "headers": {"User-Agent": "SL"}, "master": "https://cdn/master.m3u8"},
            "worst": {"type": "hls", "url": "https://cdn/480.m3u8", "headers": {}, "master": "https://cdn/master.m3u8"}
        }
    }"#;

    #[test]
    fn test_parse_best_hls() {
        let raw = parse_output(OUTPUT, "best").unwrap();

        assert_eq!(raw.manifest_url.as_deref(), Some("https://cdn/720.m3u8"));
        assert!(raw.direct_url.is_none());
        assert_eq!(
            raw.headers_observed.get("User-Agent").map(String::as_str),
            Some("SL")
        );
    }

    #[test]
    fn test_requested_quality_preferred() {
        let raw = parse_output(OUTPUT, "480p").unwrap();
        assert_eq!(raw.manifest_url.as_deref(), Some("https://cdn/480.m3u8"));
    }

    #[test]
    fn test_unknown_quality_falls_back_to_priority() {
        let raw = parse_output(OUTPUT, "4k").unwrap();
        assert_eq!(raw.manifest_url.as_deref(), Some("https://cdn/720.m3u8"));
    }

    #[test]
    fn test_any_stream_when_no_priority_match() {
        let json = r#"{"streams": {"live": {"type": "http", "url": "https://cdn/live.ts"}}}"#;

        let raw = parse_output(json, "best").unwrap();

        assert!(raw.manifest_url.is_none());
        assert_eq!(raw.direct_url.as_deref(), Some("https://cdn/live.ts"));
    }

    #[test]
    fn test_error_document() {
        let json = r#"{"error": "No playable streams found on this URL: https://x"}"#;

        assert_eq!(
            parse_error(json).as_deref(),
            Some("No playable streams found on this URL: https://x")
        );
        assert!(matches!(
            parse_output(json, "best"),
            Err(ProviderError::ParseError(ref m)) if m.starts_with("No playable streams")
        ));
    }

    #[test]
    fn test_no_streams() {
        assert!(matches!(
            parse_output(r#"{"plugin": "youtube", "streams": {}}"#, "best"),
            Err(ProviderError::NoStreams)
        ));
        assert!(parse_error("not json").is_none());
    }
}
