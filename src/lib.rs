//! Batch pipeline that turns mentoring-session transcripts into structured
//! summaries and appends them to an xlsx log template.
//!
//! Flow per file: sanitize → model call (strict-JSON mode, plain-text
//! fallback) → lenient parse (loose JSON, then `<<TAG>>` marker blocks) →
//! append one spreadsheet row.

pub mod batch;
pub mod config;
pub mod error;
pub mod excel;
pub mod gemini;
pub mod parse;
pub mod record;
pub mod sanitize;
pub mod summarize;

pub use error::{Error, Result};
pub use record::{ActionItem, TranscriptRecord};
