//! Input normalization
//!
//! Turns the raw payload into canonical entities:
//! - dates parsed to UTC instants and sorted ascending (stable on ties)
//! - slots sorted by sort key (stable on ties), first definition of an id wins
//! - attendance rows reduced to `AttendanceRecord`s with an explicit
//!   slot-id → quantity map built from the `slot<N>` keys
//!
//! Quantities that are not positive whole numbers are treated as absent;
//! quantities above `MAX_QUANTITY` reject the payload.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use mealgrid_core::{
    AttendanceRecord, DateEntry, PivotInput, Quantity, Slot, SlotId, ValidationError, MAX_QUANTITY,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::directory::DirectoryResolver;
use crate::{RawPayload, DEFAULT_EVENT_NAME};

/// Validates and reshapes a `RawPayload`
#[derive(Clone, Debug, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: RawPayload) -> Result<PivotInput, ValidationError> {
        // Shape checks first so nothing is built from a partially valid payload
        let dates = match &raw.dates {
            Value::Array(items) if !items.is_empty() => items.as_slice(),
            _ => return Err(ValidationError::MissingDates),
        };
        let slots = list(&raw.slots, "slots")?;
        let data = list(&raw.data, "data")?;
        let names = list(&raw.names, "names")?;
        let tags = list(&raw.tags, "tags")?;

        let dates = normalize_dates(dates)?;
        let slots = normalize_slots(slots);
        let records = normalize_records(data)?;

        let directory = DirectoryResolver::new()
            .catalog(names)
            .catalog(tags)
            .resolve(&records);

        debug!(
            dates = dates.len(),
            slots = slots.len(),
            people = directory.len(),
            records = records.len(),
            "normalized payload"
        );

        Ok(PivotInput {
            event_name: raw
                .event_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            dates,
            slots,
            directory,
            records,
        })
    }
}

/// Absent collections are empty; anything other than a list is rejected
fn list<'a>(value: &'a Value, field: &'static str) -> Result<&'a [Value], ValidationError> {
    match value {
        Value::Null => Ok(&[]),
        Value::Array(items) => Ok(items.as_slice()),
        _ => Err(ValidationError::NotAList(field)),
    }
}

/// Parse an ISO-8601 instant, naive date-time (taken as UTC) or plain date
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn normalize_dates(items: &[Value]) -> Result<Vec<DateEntry>, ValidationError> {
    let mut dates = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let raw = match obj.get("date") {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => continue,
        };
        let date = parse_instant(raw).ok_or_else(|| ValidationError::InvalidDate {
            field: "dates",
            value: raw.clone(),
        })?;
        dates.push(DateEntry::new(date).description(text(obj, "description")));
    }

    if dates.is_empty() {
        return Err(ValidationError::MissingDates);
    }
    dates.sort_by_key(|d| d.date);
    Ok(dates)
}

fn normalize_slots(items: &[Value]) -> Vec<Slot> {
    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else {
            warn!("skipping slot entry that is not an object");
            continue;
        };
        let Some(id) = obj
            .get("slot")
            .and_then(Value::as_u64)
            .and_then(|n| SlotId::try_from(n).ok())
        else {
            warn!(entry = %item, "skipping slot without a numeric 'slot' id");
            continue;
        };
        if !seen.insert(id) {
            warn!(slot = id, "duplicate slot id, keeping first definition");
            continue;
        }

        let mut slot = Slot::new(id, text(obj, "abb"))
            .name(text(obj, "name"))
            .location(text(obj, "location"));
        if let Some(key) = obj.get("sort").and_then(Value::as_i64) {
            slot = slot.sort_key(key);
        }
        slots.push(slot);
    }
    slots.sort_by_key(|s| s.sort_key);
    slots
}

/// Positive whole numbers only; everything else is absent
pub fn coerce_quantity(value: &Value) -> Option<Quantity> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(q) = n.as_u64() {
        return (q > 0).then_some(q);
    }
    let f = n.as_f64()?;
    if f.is_finite() && f > 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as Quantity)
    } else {
        None
    }
}

fn person_ref(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn normalize_records(items: &[Value]) -> Result<Vec<AttendanceRecord>, ValidationError> {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else {
            warn!("skipping attendance row that is not an object");
            continue;
        };
        let Some(person_id) = person_ref(obj.get("name")) else {
            warn!(row = %item, "skipping attendance row without a person id");
            continue;
        };

        let date = match obj.get("Date").and_then(Value::as_str) {
            Some(raw) => {
                let parsed = parse_instant(raw);
                if parsed.is_none() {
                    warn!(person = %person_id, date = raw, "unparseable attendance date");
                }
                parsed
            }
            None => None,
        };

        let mut quantities = BTreeMap::new();
        for (key, value) in obj {
            let Some(slot) = key.strip_prefix("slot").and_then(|n| n.parse::<SlotId>().ok()) else {
                continue;
            };
            match coerce_quantity(value) {
                Some(qty) if qty > MAX_QUANTITY => {
                    return Err(ValidationError::QuantityOutOfRange {
                        person: person_id,
                        slot,
                        value: qty,
                    });
                }
                Some(qty) => {
                    quantities.insert(slot, qty);
                }
                None if !value.is_null() => {
                    debug!(person = %person_id, key = %key, value = %value, "ignoring non-positive quantity");
                }
                None => {}
            }
        }

        records.push(AttendanceRecord {
            person_id,
            date,
            quantities,
            accommodated: obj.get("accommodated").and_then(Value::as_bool),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_value;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(extra: Value) -> Value {
        let mut base = json!({
            "eventName": "Summit",
            "dates": [{ "date": "2025-08-06T00:00:00.000Z" }],
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        base
    }

    #[test]
    fn missing_dates_fails() {
        let err = parse_value(json!({ "slots": [] })).unwrap_err();
        assert_eq!(err, ValidationError::MissingDates);
    }

    #[test]
    fn empty_dates_fails() {
        let err = parse_value(json!({ "dates": [] })).unwrap_err();
        assert_eq!(err, ValidationError::MissingDates);
    }

    #[test]
    fn dates_without_date_field_are_skipped() {
        let err = parse_value(json!({ "dates": [{ "description": "x" }, null] })).unwrap_err();
        assert_eq!(err, ValidationError::MissingDates);
    }

    #[test]
    fn invalid_date_fails() {
        let err = parse_value(json!({ "dates": [{ "date": "someday" }] })).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidDate {
                field: "dates",
                value: "someday".into()
            }
        );
    }

    #[test]
    fn non_list_collections_fail() {
        for field in ["slots", "data", "names", "tags"] {
            let err = parse_value(payload(json!({ field: { "oops": true } }))).unwrap_err();
            assert_eq!(err, ValidationError::NotAList(field));
        }
    }

    #[test]
    fn dates_sorted_and_described() {
        let input = parse_value(json!({
            "dates": [
                { "date": "2025-08-07", "description": "Main day" },
                { "date": "2025-08-06T09:00:00+01:00" },
            ]
        }))
        .unwrap();

        assert_eq!(input.dates.len(), 2);
        assert_eq!(input.dates[0].date, Utc.with_ymd_and_hms(2025, 8, 6, 8, 0, 0).unwrap());
        assert_eq!(input.dates[0].description, "");
        assert_eq!(input.dates[1].description, "Main day");
    }

    #[test]
    fn slots_sorted_by_sort_key() {
        let input = parse_value(payload(json!({
            "slots": [
                { "slot": 1, "abb": "L", "name": "Lunch", "sort": 2 },
                { "slot": 2, "abb": "B", "name": "Breakfast", "sort": 1, "location": "Hall" },
                { "slot": 3, "abb": "D", "name": "Dinner" },
                { "abb": "X" },
            ]
        })))
        .unwrap();

        let abbs: Vec<_> = input.slots.iter().map(|s| s.abbreviation.as_str()).collect();
        assert_eq!(abbs, vec!["B", "L", "D"]);
        assert_eq!(input.slots[0].location, "Hall");
        assert_eq!(input.slots[0].id, 2);
    }

    #[test]
    fn quantity_coercion() {
        assert_eq!(coerce_quantity(&json!(3)), Some(3));
        assert_eq!(coerce_quantity(&json!(2.0)), Some(2));
        assert_eq!(coerce_quantity(&json!(0)), None);
        assert_eq!(coerce_quantity(&json!(-1)), None);
        assert_eq!(coerce_quantity(&json!(1.5)), None);
        assert_eq!(coerce_quantity(&json!("2")), None);
        assert_eq!(coerce_quantity(&Value::Null), None);
    }

    #[test]
    fn records_build_slot_map() {
        let input = parse_value(payload(json!({
            "data": [
                { "name": "p1", "Date": "2025-08-06T00:00:00.000Z", "slot1": 2, "slot2": "x",
                  "slot3": 0, "slots": 9, "accommodated": true },
                { "Date": "2025-08-06T00:00:00.000Z", "slot1": 1 },
                { "name": "p2", "Date": "not a date", "slot1": 1 },
            ]
        })))
        .unwrap();

        assert_eq!(input.records.len(), 2);
        let first = &input.records[0];
        assert_eq!(first.person_id, "p1");
        assert_eq!(first.quantities.len(), 1);
        assert_eq!(first.quantities[&1], 2);
        assert_eq!(first.accommodated, Some(true));

        let second = &input.records[1];
        assert_eq!(second.date, None);
        assert_eq!(second.accommodated, None);
    }

    #[test]
    fn oversized_quantity_is_rejected() {
        let err = parse_value(payload(json!({
            "data": [
                { "name": "p1", "Date": "2025-08-06", "slot1": 18446744073709551615u64 },
                { "name": "p1", "Date": "2025-08-06", "slot1": 1 },
            ]
        })))
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::QuantityOutOfRange {
                person: "p1".into(),
                slot: 1,
                value: u64::MAX,
            }
        );
        assert!(err.to_string().contains("exceeds the maximum of 1000000"));
    }

    #[test]
    fn largest_quantity_is_accepted() {
        let input = parse_value(payload(json!({
            "data": [{ "name": "p1", "Date": "2025-08-06", "slot1": MAX_QUANTITY }]
        })))
        .unwrap();
        assert_eq!(input.records[0].quantities[&1], MAX_QUANTITY);
    }

    #[test]
    fn parse_instant_forms() {
        let midnight = Utc.with_ymd_and_hms(2025, 8, 6, 0, 0, 0).unwrap();
        assert_eq!(parse_instant("2025-08-06"), Some(midnight));
        assert_eq!(parse_instant("2025-08-06T00:00:00.000Z"), Some(midnight));
        assert_eq!(parse_instant("2025-08-06T00:00:00"), Some(midnight));
        assert_eq!(parse_instant("06/08/2025"), None);
    }
}
