//! yt-dlp backend.
//!
//! Runs `yt-dlp -J` with a player client profile and parses the info dict.
//! The player client, proof token and visitor data are passed through
//! `--extractor-args youtube:...`; cookies and locale go in as request
//! headers.

pub mod parser;

use relink_core::{CredentialBundle, SourceRef};
use relink_fetch::ClientProfile;

pub use parser::{YtDlpFormat, YtDlpInfo, parse_info};

/// Extractor namespace the player client arguments belong to.
const EXTRACTOR: &str = "youtube";

/// Builds the `yt-dlp` argument list for one attempt.
pub fn build_args(
    profile: &ClientProfile,
    source: &SourceRef,
    bundle: &CredentialBundle,
) -> Vec<String> {
    let mut args = vec![
        "-J".to_string(),
        "--no-warnings".to_string(),
        "--no-playlist".to_string(),
        "--format".to_string(),
        bundle.preferred_format.clone(),
        "--user-agent".to_string(),
        bundle.user_agent.clone(),
        "--add-header".to_string(),
        format!("Accept-Language:{}", bundle.locale),
    ];

    if let Some(cookies) = &bundle.cookies {
        args.push("--add-header".to_string());
        args.push(format!("Cookie:{cookies}"));
    }

    if let Some(extractor_args) = extractor_args(profile, bundle) {
        args.push("--extractor-args".to_string());
        args.push(extractor_args);
    }

    args.push("--".to_string());
    args.push(source.key().to_string());
    args
}

/// `youtube:player_client=...;po_token=...` or `None` when there is nothing to pass.
fn extractor_args(profile: &ClientProfile, bundle: &CredentialBundle) -> Option<String> {
    let client = profile.client.trim();
    let mut parts = Vec::new();

    if !client.is_empty() {
        parts.push(format!("player_client={client}"));
    }
    if profile.send_proof_token {
        if let Some(token) = &bundle.proof_token {
            let context = if client.is_empty() { "web" } else { client };
            parts.push(format!("po_token={context}.gvs+{token}"));
        }
    }
    if let Some(visitor_data) = &bundle.visitor_data {
        parts.push(format!("visitor_data={visitor_data}"));
    }
    for (key, value) in &profile.options {
        parts.push(format!("{key}={value}"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("{EXTRACTOR}:{}", parts.join(";")))
    }
}
