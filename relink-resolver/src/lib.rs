// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Relink Resolver
//!
//! Turns a source into a validated, playable stream.
//!
//! The [`Resolver`] checks the stream cache, acquires credentials, walks the
//! planned strategies through a [`StrategyPass`], and on a fully failed pass
//! refreshes credentials and tries once more.
//!
//! ## Example
//!
//! ```ignore
//! use relink_resolver::Resolver;
//!
//! let resolver = Resolver::from_settings(&settings, extractor, tokens, validator).await;
//! match resolver.resolve(&source, false).await {
//!     Ok(stream) => println!("{}", stream.player_url()),
//!     Err(e) => {
//!         for attempt in e.attempts() {
//!             eprintln!("{attempt}");
//!         }
//!     }
//! }
//! ```

pub mod error;
pub mod orchestrator;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use error::{AttemptOutcome, AttemptRecord, Pass, ResolveError};
pub use orchestrator::{DEFAULT_DEADLINE, PurgeReport, Resolver, ResolverBuilder};
pub use pipeline::StrategyPass;
