// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Relink Providers
//!
//! Concrete implementations of the extraction and token capabilities.
//!
//! | Provider | Backend | Notes |
//! |----------|---------|-------|
//! | [`CommandExtractor`] | `yt-dlp -J` | player client, proof token and visitor data via `--extractor-args` |
//! | [`CommandExtractor`] | `streamlink --json` | profile client name is the preferred quality |
//! | [`FileTokenProvider`] | credential JSON file | `RELINK_*` environment overrides |
//!
//! ## Usage
//!
//! ```ignore
//! use relink_fetch::FetchContext;
//! use relink_providers::{CommandExtractor, FileTokenProvider};
//!
//! let ctx = FetchContext::new()?;
//! let extractor = CommandExtractor::new(&ctx);
//! let tokens = FileTokenProvider::from_env(settings.credentials_file());
//! ```

pub mod error;
pub mod extractor;
pub mod streamlink;
pub mod tokens;
pub mod ytdlp;

pub use error::ProviderError;
pub use extractor::{BackendCommand, CommandExtractor};
pub use tokens::{
    COOKIES_ENV, CredentialFile, CredentialOverrides, FileTokenProvider, PROOF_TOKEN_ENV,
    USER_AGENT_ENV, VISITOR_DATA_ENV,
};
