//! Host APIs used by validators and extraction providers.
//!
//! - [`http`] - HTTP client for reachability probes
//! - [`process`] - Subprocess execution for backend commands

pub mod http;
pub mod process;

pub use http::{HttpClient, host_matches};
pub use process::{ProcessOutput, ProcessRunner};
