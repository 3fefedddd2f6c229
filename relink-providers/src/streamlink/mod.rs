//! streamlink backend.
//!
//! Runs `streamlink --json <url>` and picks a stream from the listed
//! qualities. The profile's client name is the preferred quality.

pub mod parser;

use relink_core::{CredentialBundle, SourceRef};
use relink_fetch::ClientProfile;

pub use parser::{StreamlinkOutput, StreamlinkStream, parse_error, parse_output};

/// Quality used when the profile names none.
pub const DEFAULT_QUALITY: &str = "best";

/// Preferred quality for a profile.
pub fn preferred_quality(profile: &ClientProfile) -> &str {
    let client = profile.client.trim();
    if client.is_empty() {
        DEFAULT_QUALITY
    } else {
        client
    }
}

/// Builds the `streamlink` argument list for one attempt.
pub fn build_args(
    profile: &ClientProfile,
    source: &SourceRef,
    bundle: &CredentialBundle,
) -> Vec<String> {
    let mut args = vec![
        "--json".to_string(),
        "--http-header".to_string(),
        format!("User-Agent={}", bundle.user_agent),
        "--http-header".to_string(),
        format!("Accept-Language={}", bundle.locale),
    ];

    if let Some(cookies) = &bundle.cookies {
        args.push("--http-header".to_string());
        args.push(format!("Cookie={cookies}"));
    }

    for (key, value) in &profile.options {
        args.push(format!("--{key}={value}"));
    }

    args.push(source.key().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use relink_fetch::Backend;

    #[test]
    fn test_args() {
        let profile =
            ClientProfile::new(Backend::Streamlink, "best").with_option("http-timeout", "20");
        let bundle = CredentialBundle::new("UA/2").with_cookies("a=1; b=2");

        let args = build_args(&profile, &SourceRef::from_url(" https://twitch.example/x "), &bundle);

        assert_eq!(
            args,
            vec![
                "--json",
                "--http-header",
                "User-Agent=UA/2",
                "--http-header",
                "Accept-Language=en-US",
                "--http-header",
                "Cookie=a=1; b=2",
                "--http-timeout=20",
                "https://twitch.example/x",
            ]
        );
    }

    #[test]
    fn test_preferred_quality() {
        assert_eq!(preferred_quality(&ClientProfile::new(Backend::Streamlink, "720p")), "720p");
        assert_eq!(preferred_quality(&ClientProfile::default()), DEFAULT_QUALITY);
    }
}
