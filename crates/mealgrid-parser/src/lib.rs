//! # mealgrid-parser
//!
//! Decoding and normalization of catering payloads.
//!
//! This crate provides:
//! - The loosely typed wire payload (`RawPayload`)
//! - Shape validation and normalization into canonical entities ([`normalize`])
//! - Merging of people catalogs into one directory ([`directory`])
//!
//! ## Example
//!
//! ```rust
//! use mealgrid_parser::parse_payload;
//!
//! let input = r#"{
//!     "eventName": "Summit",
//!     "dates": [{ "date": "2025-08-06T00:00:00.000Z", "description": "Arrivals" }],
//!     "slots": [{ "slot": 1, "abb": "B", "name": "Breakfast" }],
//!     "names": [{ "id": "p1", "name": "Alice", "company": "Acme" }],
//!     "data":  [{ "name": "p1", "Date": "2025-08-06T00:00:00.000Z", "slot1": 2 }]
//! }"#;
//!
//! let input = parse_payload(input).unwrap();
//! assert_eq!(input.event_name, "Summit");
//! assert_eq!(input.records[0].quantities[&1], 2);
//! ```

pub mod directory;
pub mod normalize;

pub use directory::DirectoryResolver;
pub use normalize::Normalizer;

use mealgrid_core::{PivotInput, ValidationError};
use serde::Deserialize;
use serde_json::Value;

/// Event name used when the payload carries none
pub const DEFAULT_EVENT_NAME: &str = "Event";

/// Inbound request body before any validation.
///
/// Every collection is kept as a raw JSON value so that shape errors surface
/// as `ValidationError`s instead of deserializer messages.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub dates: Value,
    #[serde(default)]
    pub slots: Value,
    #[serde(default)]
    pub names: Value,
    #[serde(default)]
    pub tags: Value,
    #[serde(default)]
    pub data: Value,
}

/// Parse and normalize a JSON payload
pub fn parse_payload(input: &str) -> Result<PivotInput, ValidationError> {
    let raw: RawPayload =
        serde_json::from_str(input).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    Normalizer::new().normalize(raw)
}

/// Normalize an already decoded JSON value
pub fn parse_value(value: Value) -> Result<PivotInput, ValidationError> {
    let raw: RawPayload =
        serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    Normalizer::new().normalize(raw)
}
