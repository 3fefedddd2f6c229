// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # relink Core
//!
//! Core types and models shared by every `relink` crate.
//!
//! ## Key Types
//!
//! ### Sources & Credentials
//! - [`SourceRef`] - A resolvable item (URL plus pass-through metadata)
//! - [`CredentialBundle`] - Session identity captured from a browser
//! - [`CredentialField`] - Addressable fields of a bundle
//!
//! ### Resolution Results
//! - [`ResolvedStream`] - A validated, playable URL with its headers
//! - [`StreamHeaders`] - Case-insensitive, unique header map
//! - [`UrlKind`] - What kind of URL was selected
//!
//! ### Status
//! - [`ResolverStatus`] - Diagnostic summary of both caches
//! - [`CacheStats`] - Live vs. total entry counts

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    // Cache status
    CacheStats,
    // Credentials
    CredentialBundle,
    CredentialField,
    ResolverStatus,
    // Results
    ResolvedStream,
    // Sources
    SourceRef,
    StreamHeaders,
    UrlKind,
    // Constants
    COOKIE,
    FALLBACK_USER_AGENT,
    USER_AGENT,
};
