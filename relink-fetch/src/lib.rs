// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Relink Fetch
//!
//! Everything between a credential bundle and a validated URL.
//!
//! ## Strategies
//!
//! - [`strategy::StrategyCatalog`] - The configurable set of strategies
//! - [`strategy::StrategyPlanner`] - Orders the catalog for a bundle
//!
//! ## Provider Contracts
//!
//! - [`provider::ExtractionProvider`] - Runs one strategy against one source
//! - [`provider::TokenProvider`] - Harvests credential bundles
//!
//! ## Selection and Validation
//!
//! - [`select`] - Picks the candidate URL and assembles its headers
//! - [`validator::StreamValidator`] - Checks a URL+headers pair is playable
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client for probes
//! - [`host::process`] - Subprocess execution for backend commands
//! - [`context::FetchContext`] - Bundles host APIs with call timeouts

pub mod context;
pub mod error;
pub mod host;
pub mod provider;
pub mod select;
pub mod strategy;
pub mod validator;

// Errors
pub use error::{FetchError, HttpError, ProcessError};

// Host APIs
pub use host::{
    http::HttpClient,
    process::{ProcessOutput, ProcessRunner},
};

// Context
pub use context::{FetchContext, FetchContextBuilder, FetchSettings};

// Strategies & providers
pub use provider::{
    ExtractionOutcome, ExtractionProvider, FormatEntry, RawExtraction, TokenProvider,
};
pub use select::{Candidate, HeaderDefaults, build_headers, select_candidate};
pub use strategy::{
    Backend, ClientProfile, StrategyCatalog, StrategyDescriptor, StrategyPlanner,
    WEAK_AUTH_SUFFIX,
};
pub use validator::{
    HttpValidator, StreamValidator, Validation, ValidationMethod, ValidationPolicy,
};
