//! Directory resolution
//!
//! Merges people catalogs (`names`, then `tags`) into one id-keyed lookup.
//! The first catalog to mention an id wins. Ids that only appear in
//! attendance data get a synthesized entry whose display name is the id.

use mealgrid_core::{AttendanceRecord, Directory, Person};
use serde_json::Value;
use tracing::debug;

/// Display name for catalog entries that carry none
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Default)]
pub struct DirectoryResolver<'a> {
    catalogs: Vec<&'a [Value]>,
}

impl<'a> DirectoryResolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog; earlier catalogs take precedence
    pub fn catalog(mut self, entries: &'a [Value]) -> Self {
        self.catalogs.push(entries);
        self
    }

    /// Build the directory, closing it over every id referenced by `records`
    pub fn resolve(&self, records: &[AttendanceRecord]) -> Directory {
        let mut directory = Directory::new();

        for entry in self.catalogs.iter().flat_map(|c| c.iter()) {
            if let Some(person) = person_from_entry(entry) {
                directory.insert(person);
            }
        }

        let mut synthesized = 0usize;
        for record in records {
            if directory.insert(Person::synthesized(record.person_id.as_str())) {
                synthesized += 1;
            }
        }

        debug!(
            people = directory.len(),
            synthesized, "resolved people directory"
        );
        directory
    }
}

fn field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn person_from_entry(entry: &Value) -> Option<Person> {
    let obj = entry.as_object()?;
    let id = match obj.get("id")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(
        Person::new(id)
            .name(field(obj, "name").unwrap_or_else(|| UNKNOWN_NAME.to_string()))
            .company(field(obj, "company").unwrap_or_default())
            .role(field(obj, "role").unwrap_or_default()),
    )
}
