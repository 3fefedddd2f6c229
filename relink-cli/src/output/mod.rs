//! Output formatting for CLI.

mod json;
mod text;

pub use json::{JsonFormatter, ResolveOutput, StatusOutput};
pub use text::TextFormatter;
