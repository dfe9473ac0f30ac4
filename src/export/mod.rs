//! Export of merged documents for inspection (plain text, JSON, statistics).

mod json;
mod stats;
mod text;

pub use json::{to_json, JsonFormat};
pub use stats::DocumentStats;
pub use text::{to_text, PAGE_BREAK};
