//! Domain models for relink.
//!
//! ## Submodules
//!
//! - [`source`] - The item being resolved
//! - [`credentials`] - Harvested session identity
//! - [`stream`] - Resolved streams and their headers
//! - [`status`] - Cache and credential diagnostics

mod credentials;
mod source;
mod status;
mod stream;

pub use credentials::{CredentialBundle, CredentialField, FALLBACK_USER_AGENT};
pub use source::SourceRef;
pub use status::{CacheStats, ResolverStatus};
pub use stream::{COOKIE, ResolvedStream, StreamHeaders, USER_AGENT, UrlKind};
