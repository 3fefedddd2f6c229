//! Candidate URL selection and header assembly.
//!
//! Turns a [`RawExtraction`] into the single URL worth validating and the
//! exact headers the player will send with it.

use relink_core::{COOKIE, CredentialBundle, StreamHeaders, USER_AGENT, UrlKind};
use std::cmp::Ordering;

use crate::provider::{FormatEntry, RawExtraction};

/// A URL picked from an extraction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// URL to validate.
    pub url: String,
    /// How it was picked.
    pub kind: UrlKind,
}

/// Picks the best URL from `raw`.
///
/// Master manifest first, then the best manifest-protocol format, then the
/// backend's direct URL.
pub fn select_candidate(raw: &RawExtraction) -> Option<Candidate> {
    if let Some(url) = non_empty(raw.manifest_url.as_deref()) {
        return Some(Candidate {
            url: url.to_string(),
            kind: UrlKind::Manifest,
        });
    }

    if let Some(best) = raw
        .formats
        .iter()
        .filter(|f| f.is_manifest_protocol() && !f.url.trim().is_empty())
        .max_by(|a, b| compare_formats(a, b))
    {
        return Some(Candidate {
            url: best.url.clone(),
            kind: UrlKind::MediaFormat,
        });
    }

    non_empty(raw.direct_url.as_deref()).map(|url| Candidate {
        url: url.to_string(),
        kind: UrlKind::Direct,
    })
}

/// Muxed beats single-track, then height, then bitrate.
fn compare_formats(a: &FormatEntry, b: &FormatEntry) -> Ordering {
    a.is_muxed()
        .cmp(&b.is_muxed())
        .then(a.height.unwrap_or(0).cmp(&b.height.unwrap_or(0)))
        .then(
            a.bitrate
                .unwrap_or(0.0)
                .partial_cmp(&b.bitrate.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal),
        )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Defaults added to headers when the backend did not set them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderDefaults {
    /// Default `Referer`.
    pub referer: Option<String>,
    /// Default `Origin`.
    pub origin: Option<String>,
}

/// Builds the playback headers for a candidate.
///
/// Observed headers win. The bundle supplies `User-Agent`, `Cookie` and
/// `Accept-Language` when missing, so the result always carries a user agent
/// and carries a cookie whenever the bundle had one.
pub fn build_headers(
    raw: &RawExtraction,
    bundle: &CredentialBundle,
    defaults: &HeaderDefaults,
) -> StreamHeaders {
    let mut headers: StreamHeaders = raw
        .headers_observed
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .collect();

    headers.insert_if_absent(USER_AGENT, bundle.user_agent.clone());
    if let Some(cookies) = bundle.cookies.as_deref().filter(|c| !c.trim().is_empty()) {
        headers.insert_if_absent(COOKIE, cookies);
    }
    if !bundle.locale.trim().is_empty() {
        headers.insert_if_absent("Accept-Language", bundle.locale.clone());
    }
    if let Some(referer) = &defaults.referer {
        headers.insert_if_absent("Referer", referer.clone());
    }
    if let Some(origin) = &defaults.origin {
        headers.insert_if_absent("Origin", origin.clone());
    }
    headers
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn hls(url: &str, height: u32, bitrate: f64, muxed: bool) -> FormatEntry {
        FormatEntry {
            url: url.to_string(),
            protocol: "m3u8_native".to_string(),
            height: Some(height),
            bitrate: Some(bitrate),
            has_audio: true,
            has_video: muxed,
        }
    }

    #[test]
    fn test_manifest_wins() {
        let raw = RawExtraction {
            manifest_url: Some("https://m/master.m3u8".into()),
            formats: vec![hls("https://f/1080.m3u8", 1080, 5000.0, true)],
            direct_url: Some("https://d/video".into()),
            ..Default::default()
        };
        let c = select_candidate(&raw).unwrap();
        assert_eq!(c.url, "https://m/master.m3u8");
        assert_eq!(c.kind, UrlKind::Manifest);
    }

    #[test]
    fn test_best_manifest_format() {
        let raw = RawExtraction {
            formats: vec![
                hls("https://f/720.m3u8", 720, 2500.0, true),
                hls("https://f/1080-audio-only.m3u8", 1080, 6000.0, false),
                hls("https://f/1080-low.m3u8", 1080, 4000.0, true),
                hls("https://f/1080-high.m3u8", 1080, 4500.0, true),
                FormatEntry {
                    url: "https://f/2160.mp4".into(),
                    protocol: "https".into(),
                    height: Some(2160),
                    has_audio: true,
                    has_video: true,
                    ..Default::default()
                },
            ],
            direct_url: Some("https://d/video".into()),
            ..Default::default()
        };
        let c = select_candidate(&raw).unwrap();
        assert_eq!(c.url, "https://f/1080-high.m3u8");
        assert_eq!(c.kind, UrlKind::MediaFormat);
    }

    #[test]
    fn test_direct_fallback() {
        let raw = RawExtraction {
            manifest_url: Some(" ".into()),
            direct_url: Some("https://d/video".into()),
            ..Default::default()
        };
        let c = select_candidate(&raw).unwrap();
        assert_eq!(c.kind, UrlKind::Direct);
    }

    #[test]
    fn test_nothing_usable() {
        assert!(select_candidate(&RawExtraction::default()).is_none());
    }

    #[test]
    fn test_headers_from_bundle() {
        let bundle = CredentialBundle::new("Bundle-UA")
            .with_cookies("SID=1")
            .with_locale("pt-BR");
        let defaults = HeaderDefaults {
            referer: Some("https://www.youtube.com/".into()),
            origin: Some("https://www.youtube.com".into()),
        };
        let headers = build_headers(&RawExtraction::default(), &bundle, &defaults);

        assert_eq!(headers.get("User-Agent"), Some("Bundle-UA"));
        assert_eq!(headers.get("Cookie"), Some("SID=1"));
        assert_eq!(headers.get("Accept-Language"), Some("pt-BR"));
        assert_eq!(headers.get("Origin"), Some("https://www.youtube.com"));
    }

    #[test]
    fn test_observed_headers_win() {
        let mut observed = BTreeMap::new();
        observed.insert("user-agent".to_string(), "Backend-UA".to_string());
        observed.insert("referer".to_string(), "https://backend/".to_string());
        observed.insert("X-Empty".to_string(), String::new());
        let raw = RawExtraction {
            headers_observed: observed,
            ..Default::default()
        };
        let defaults = HeaderDefaults {
            referer: Some("https://default/".into()),
            origin: None,
        };
        let headers = build_headers(&raw, &CredentialBundle::new("Bundle-UA"), &defaults);

        assert_eq!(headers.get("User-Agent"), Some("Backend-UA"));
        assert_eq!(headers.get("Referer"), Some("https://backend/"));
        assert!(!headers.contains("X-Empty"));
        assert!(!headers.contains("Cookie"));
    }
}
