//! Output generation for scraped records
//!
//! Records are written as JSON objects, either back to back (the historical
//! format consumers of this scraper expect) or one per line.

mod json;

pub use json::{JsonLayout, JsonRecordWriter, WriteSummary};
