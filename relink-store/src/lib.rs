// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Relink Store
//!
//! Caches and configuration for the resolver.
//!
//! This crate provides:
//!
//! - **StreamCache**: validated streams keyed by source, 6 h TTL
//! - **TokenCache**: the last credential bundle, 45 min TTL
//! - **Settings**: resolver configuration with validation
//! - **Persistence**: owner-only, atomic JSON files
//!
//! ## Usage
//!
//! ```ignore
//! use relink_store::{Settings, StreamCache, TokenCache, streams_path, tokens_path};
//!
//! let settings = Settings::load_default().await?;
//! let dir = settings.cache_dir();
//! let streams = StreamCache::load(settings.stream_ttl(), streams_path(&dir)).await;
//! let tokens = TokenCache::load(settings.token_ttl(), tokens_path(&dir)).await;
//! ```

pub mod error;
pub mod persistence;
pub mod settings;
pub mod stream_cache;
pub mod token_cache;
pub mod ttl_cache;

pub use error::StoreError;
pub use persistence::{
    default_cache_dir, default_config_dir, default_credentials_path, default_settings_path,
    ensure_dir, load_json, load_json_or_default, save_json, streams_path, tokens_path,
};
pub use settings::Settings;
pub use stream_cache::{DEFAULT_STREAM_TTL, StreamCache, StreamRecord};
pub use token_cache::{DEFAULT_TOKEN_TTL, TokenCache, TokenRecord};
pub use ttl_cache::{CacheEntry, TtlCache};
