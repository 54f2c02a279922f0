//! Layout planning
//!
//! Columns are the full cross product of sorted dates × sorted slots
//! (date-major, slot-minor) followed by one Total column. They never depend
//! on attendance content; only cells are sparse.
//!
//! Rows are partitioned into two sections by the sticky accommodation flag
//! and ordered by (company, name, role), case-insensitively.

use chrono::{DateTime, Utc};
use mealgrid_core::{
    AttendanceRecord, Column, DateBlock, DateEntry, Directory, Person, PersonId, SectionKind, Slot,
    SlotId,
};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Ordered column plan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnPlan {
    pub date_blocks: Vec<DateBlock>,
    /// Data columns then `Column::Total`
    pub columns: Vec<Column>,
    index: HashMap<(DateTime<Utc>, SlotId), usize>,
}

impl ColumnPlan {
    /// Plan columns for dates and slots that are already in canonical order
    pub fn new(dates: &[DateEntry], slots: &[Slot]) -> Self {
        let width = slots.len();
        let mut date_blocks = Vec::with_capacity(dates.len());
        let mut columns = Vec::with_capacity(dates.len() * width + 1);
        let mut index = HashMap::new();

        for (date_index, entry) in dates.iter().enumerate() {
            date_blocks.push(DateBlock {
                entry: entry.clone(),
                label: entry.label(),
                first_column: columns.len(),
                width,
            });
            for (slot_index, slot) in slots.iter().enumerate() {
                // Duplicate instants resolve to the first date in input order
                index.entry((entry.date, slot.id)).or_insert(columns.len());
                columns.push(Column::Slot {
                    date_index,
                    slot_index,
                });
            }
        }
        columns.push(Column::Total);

        Self {
            date_blocks,
            columns,
            index,
        }
    }

    pub fn data_column_count(&self) -> usize {
        self.columns.len() - 1
    }

    /// Data column for a (date, slot) pair, if both are in the catalogs
    pub fn column_for(&self, date: DateTime<Utc>, slot: SlotId) -> Option<usize> {
        self.index.get(&(date, slot)).copied()
    }
}

/// Person ids with at least one `accommodated = true` record (any true wins)
pub fn accommodated_ids(records: &[AttendanceRecord]) -> HashSet<PersonId> {
    records
        .iter()
        .filter(|r| r.accommodated == Some(true))
        .map(|r| r.person_id.clone())
        .collect()
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Company, then name, then role; each compared case-insensitively
pub fn compare_people(a: &Person, b: &Person) -> Ordering {
    cmp_ignore_case(&a.company, &b.company)
        .then_with(|| cmp_ignore_case(&a.name, &b.name))
        .then_with(|| cmp_ignore_case(&a.role, &b.role))
}

/// Ordered row plan: always `[Accommodated, Others]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowPlan {
    pub sections: Vec<(SectionKind, Vec<Person>)>,
}

impl RowPlan {
    pub fn new(directory: &Directory, accommodated: &HashSet<PersonId>) -> Self {
        let (mut housed, mut others): (Vec<Person>, Vec<Person>) = directory
            .iter()
            .cloned()
            .map(|mut p| {
                p.accommodated = accommodated.contains(&p.id);
                p
            })
            .partition(|p| p.accommodated);

        // Stable sorts: full ties keep directory order
        housed.sort_by(compare_people);
        others.sort_by(compare_people);

        Self {
            sections: vec![
                (SectionKind::Accommodated, housed),
                (SectionKind::Others, others),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> DateEntry {
        DateEntry::new(Utc.with_ymd_and_hms(2025, 8, d, 0, 0, 0).unwrap())
    }

    #[test]
    fn columns_are_date_major() {
        let dates = vec![day(6), day(7)];
        let slots = vec![Slot::new(1, "B"), Slot::new(2, "L")];
        let plan = ColumnPlan::new(&dates, &slots);

        assert_eq!(plan.columns.len(), 5);
        assert_eq!(
            plan.columns[1],
            Column::Slot {
                date_index: 0,
                slot_index: 1
            }
        );
        assert_eq!(
            plan.columns[2],
            Column::Slot {
                date_index: 1,
                slot_index: 0
            }
        );
        assert_eq!(plan.columns[4], Column::Total);
        assert_eq!(plan.date_blocks[1].first_column, 2);
        assert_eq!(plan.date_blocks[1].label, "Thu 7 Aug");
        assert_eq!(plan.column_for(day(7).date, 2), Some(3));
        assert_eq!(plan.column_for(day(8).date, 2), None);
        assert_eq!(plan.column_for(day(6).date, 9), None);
    }

    #[test]
    fn zero_slots_degenerates_to_total_only() {
        let plan = ColumnPlan::new(&[day(6), day(7)], &[]);
        assert_eq!(plan.columns, vec![Column::Total]);
        assert_eq!(plan.data_column_count(), 0);
        assert_eq!(plan.date_blocks.len(), 2);
        assert!(plan.date_blocks.iter().all(|b| b.width == 0));
    }

    #[test]
    fn accommodation_is_sticky() {
        let d = day(6).date;
        let records = vec![
            AttendanceRecord::new("a", d).accommodated(true),
            AttendanceRecord::new("a", d).accommodated(false),
            AttendanceRecord::new("b", d).accommodated(false),
            AttendanceRecord::new("c", d),
        ];
        let ids = accommodated_ids(&records);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("a"));
    }

    #[test]
    fn people_ordered_by_company_name_role_ignoring_case() {
        let mut directory = Directory::new();
        directory.insert(Person::new("1").name("zoe").company("acme"));
        directory.insert(Person::new("2").name("Adam").company("Beta"));
        directory.insert(Person::new("3").name("Bob").company("ACME").role("waiter"));
        directory.insert(Person::new("4").name("bob").company("Acme").role("Chef"));
        directory.insert(Person::new("5").name("Ann").company(""));

        let plan = RowPlan::new(&directory, &HashSet::new());
        let (kind, others) = &plan.sections[1];
        assert_eq!(*kind, SectionKind::Others);
        let ids: Vec<_> = others.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "4", "3", "1", "2"]);
        assert!(plan.sections[0].1.is_empty());
    }

    #[test]
    fn sections_partition_directory() {
        let mut directory = Directory::new();
        for id in ["a", "b", "c"] {
            directory.insert(Person::synthesized(id));
        }
        let accommodated: HashSet<PersonId> = ["b".to_string()].into_iter().collect();
        let plan = RowPlan::new(&directory, &accommodated);

        let housed: Vec<_> = plan.sections[0].1.iter().map(|p| p.id.as_str()).collect();
        let others: Vec<_> = plan.sections[1].1.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(housed, vec!["b"]);
        assert_eq!(others, vec!["a", "c"]);
        assert!(plan.sections[0].1[0].accommodated);
    }
}
