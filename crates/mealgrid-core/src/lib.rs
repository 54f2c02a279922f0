//! # mealgrid-core
//!
//! Core domain model and traits for the mealgrid catering pivot engine.
//!
//! This crate provides:
//! - Domain types: `Slot`, `DateEntry`, `Person`, `AttendanceRecord`, `Directory`
//! - The renderer-agnostic `CanonicalGrid` (see [`grid`])
//! - Core traits: `Renderer`, `Sink`
//! - Error types shared by every pipeline stage
//!
//! ## Example
//!
//! ```rust
//! use mealgrid_core::{Directory, Person, Slot};
//!
//! let mut directory = Directory::new();
//! directory.insert(Person::new("p1").name("Alice").company("Acme"));
//! // First write wins
//! directory.insert(Person::new("p1").name("Someone Else"));
//! assert_eq!(directory.get("p1").unwrap().name, "Alice");
//!
//! let breakfast = Slot::new(1, "B").name("Breakfast").location("Hall");
//! assert_eq!(breakfast.sort_key, 1);
//! ```

pub mod grid;

pub use grid::{
    CanonicalGrid, Column, DateBlock, GridRow, LegendEntry, RenderedTotals, Section, SectionKind,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Identifier of a person (or tag) in the directory
pub type PersonId = String;

/// Identifier of a meal slot, referenced as `slot<id>` in attendance rows
pub type SlotId = u32;

/// Number of portions. Always non-negative; sums are exact integer additions.
pub type Quantity = u64;

/// Largest quantity a single attendance cell may carry.
///
/// Spreadsheet cells hold IEEE doubles, so every total must stay well inside
/// the exactly representable integer range.
pub const MAX_QUANTITY: Quantity = 1_000_000;

// ============================================================================
// Catalog entities
// ============================================================================

/// A meal or service occasion (breakfast, lunch, ...)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Identifier used by attendance rows (`slot1`, `slot2`, ...)
    pub id: SlotId,
    /// Author-supplied ordering key
    pub sort_key: i64,
    /// Short header label, e.g. `B`
    pub abbreviation: String,
    /// Display name, e.g. `Breakfast`
    pub name: String,
    /// Where the meal is served (may be empty)
    pub location: String,
}

impl Slot {
    /// Create a slot whose sort key defaults to its id
    pub fn new(id: SlotId, abbreviation: impl Into<String>) -> Self {
        Self {
            id,
            sort_key: i64::from(id),
            abbreviation: abbreviation.into(),
            name: String::new(),
            location: String::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn sort_key(mut self, key: i64) -> Self {
        self.sort_key = key;
        self
    }

    /// Key under which attendance rows carry this slot's quantity
    pub fn record_key(&self) -> String {
        format!("slot{}", self.id)
    }
}

/// A calendar day of the event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEntry {
    /// The day, normalized to an absolute instant
    pub date: DateTime<Utc>,
    /// Free-text description shown under the date header
    pub description: String,
}

impl DateEntry {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            date,
            description: String::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Header label, e.g. `Wed 6 Aug`
    pub fn label(&self) -> String {
        self.date.format("%a %-d %b").to_string()
    }
}

/// A person (or tag) who can be served meals
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub company: String,
    pub role: String,
    /// Derived from attendance data, never supplied by a catalog
    pub accommodated: bool,
}

impl Person {
    pub fn new(id: impl Into<PersonId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            company: String::new(),
            role: String::new(),
            accommodated: false,
        }
    }

    /// Entry for an id seen only in attendance data: display name is the id
    pub fn synthesized(id: impl Into<PersonId>) -> Self {
        let id = id.into();
        Self::new(id.clone()).name(id)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

/// One normalized attendance row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub person_id: PersonId,
    /// `None` when the row's date was missing or unparseable
    pub date: Option<DateTime<Utc>>,
    /// Positive quantities keyed by slot id; absent slots are simply missing
    pub quantities: BTreeMap<SlotId, Quantity>,
    pub accommodated: Option<bool>,
}

impl AttendanceRecord {
    pub fn new(person_id: impl Into<PersonId>, date: DateTime<Utc>) -> Self {
        Self {
            person_id: person_id.into(),
            date: Some(date),
            quantities: BTreeMap::new(),
            accommodated: None,
        }
    }

    pub fn quantity(mut self, slot: SlotId, qty: Quantity) -> Self {
        self.quantities.insert(slot, qty);
        self
    }

    pub fn accommodated(mut self, flag: bool) -> Self {
        self.accommodated = Some(flag);
        self
    }
}

// ============================================================================
// Directory
// ============================================================================

/// Id-keyed people lookup that preserves insertion order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Directory {
    people: Vec<Person>,
    #[serde(skip)]
    index: HashMap<PersonId, usize>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a person unless the id is already known. Returns `true` if inserted.
    pub fn insert(&mut self, person: Person) -> bool {
        if self.index.contains_key(&person.id) {
            return false;
        }
        self.index.insert(person.id.clone(), self.people.len());
        self.people.push(person);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Person> {
        self.index.get(id).map(|&i| &self.people[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.people.iter()
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}

/// A complete, normalized request snapshot
#[derive(Clone, Debug, Serialize)]
pub struct PivotInput {
    pub event_name: String,
    /// Sorted ascending by instant
    pub dates: Vec<DateEntry>,
    /// Sorted ascending by sort key
    pub slots: Vec<Slot>,
    /// Closed over every id referenced by the attendance records
    pub directory: Directory,
    pub records: Vec<AttendanceRecord>,
}

// ============================================================================
// Traits
// ============================================================================

/// Output rendering
pub trait Renderer {
    type Output;

    /// Render the grid. Implementations must not depend on anything but the grid.
    fn render(&self, grid: &CanonicalGrid) -> Result<Self::Output, RenderError>;
}

/// Destination for finished documents (filesystem, blob store, ...)
pub trait Sink {
    /// Store `content` under `name` and return where it ended up
    fn write(&self, name: &str, content: &[u8], content_type: &str) -> Result<String, SinkError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Malformed or missing input arrays
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing 'dates' array in payload")]
    MissingDates,

    #[error("Invalid or missing '{0}': expected a list")]
    NotAList(&'static str),

    #[error("Invalid date '{value}' in '{field}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("Quantity {value} for '{person}' in slot{slot} exceeds the maximum of {max}", max = MAX_QUANTITY)]
    QuantityOutOfRange {
        person: PersonId,
        slot: SlotId,
        value: Quantity,
    },

    #[error("Invalid payload: {0}")]
    Malformed(String),
}

/// Missing or unusable static asset
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Required asset not found: {0}")]
    MissingAsset(String),

    #[error("Required asset is empty: {0}")]
    EmptyAsset(String),

    #[error("Invalid asset {name}: {message}")]
    InvalidAsset { name: String, message: String },
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("{renderer} totals disagree with the aggregated grid: {detail}")]
    TotalsMismatch {
        renderer: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Failure to store a finished document
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error writing {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sink rejected {name}: {reason}")]
    Rejected { name: String, reason: String },
}

/// Any failure of the end-to-end pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slot_sort_key_defaults_to_id() {
        let slot = Slot::new(3, "D").name("Dinner");
        assert_eq!(slot.sort_key, 3);
        assert_eq!(slot.record_key(), "slot3");
        assert_eq!(slot.sort_key(-1).sort_key, -1);
    }

    #[test]
    fn date_label_format() {
        let entry = DateEntry::new(Utc.with_ymd_and_hms(2025, 8, 6, 0, 0, 0).unwrap());
        assert_eq!(entry.label(), "Wed 6 Aug");
    }

    #[test]
    fn synthesized_person_uses_id_as_name() {
        let person = Person::synthesized("tag-42");
        assert_eq!(person.name, "tag-42");
        assert!(person.company.is_empty());
        assert!(person.role.is_empty());
        assert!(!person.accommodated);
    }

    #[test]
    fn directory_first_write_wins() {
        let mut directory = Directory::new();
        assert!(directory.insert(Person::new("a").name("First")));
        assert!(!directory.insert(Person::new("a").name("Second")));
        assert!(directory.insert(Person::new("b").name("Other")));

        assert_eq!(directory.len(), 2);
        assert_eq!(directory.get("a").unwrap().name, "First");
        let ids: Vec<_> = directory.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn pipeline_error_wraps_stages() {
        let err: PipelineError = ValidationError::MissingDates.into();
        assert_eq!(err.to_string(), "Missing 'dates' array in payload");

        let err: PipelineError = RenderError::from(ConfigurationError::EmptyAsset("x.css".into())).into();
        assert!(err.to_string().contains("x.css"));
    }
}
