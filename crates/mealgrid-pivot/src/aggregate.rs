//! Aggregation
//!
//! Duplicate records for the same (person, date, slot) are additive. Records
//! whose date or slot is not in the catalogs have no column and are dropped
//! (with a warning) so that every total stays consistent with the cells.
//! Sums saturate instead of wrapping; the renderers refuse any cell above
//! `MAX_QUANTITY`, so a saturated grid never reaches a document.

use mealgrid_core::{AttendanceRecord, PersonId, Quantity};
use std::collections::HashMap;
use tracing::warn;

use crate::layout::ColumnPlan;

/// Sparse per-person cells, dense over the data columns
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellMap {
    width: usize,
    rows: HashMap<PersonId, Vec<Option<Quantity>>>,
}

impl CellMap {
    /// Cells for a person; people without records get an all-empty row
    pub fn row(&self, person: &str) -> Vec<Option<Quantity>> {
        self.rows
            .get(person)
            .cloned()
            .unwrap_or_else(|| vec![None; self.width])
    }

    pub fn get(&self, person: &str, column: usize) -> Option<Quantity> {
        self.rows.get(person).and_then(|r| r.get(column).copied().flatten())
    }
}

/// Sums attendance quantities into grid cells
pub struct Aggregator<'a> {
    plan: &'a ColumnPlan,
}

impl<'a> Aggregator<'a> {
    pub fn new(plan: &'a ColumnPlan) -> Self {
        Self { plan }
    }

    pub fn aggregate(&self, records: &[AttendanceRecord]) -> CellMap {
        let width = self.plan.data_column_count();
        let mut rows: HashMap<PersonId, Vec<Option<Quantity>>> = HashMap::new();
        let mut dropped = 0usize;

        for record in records {
            if record.quantities.is_empty() {
                continue;
            }
            let Some(date) = record.date else {
                dropped += record.quantities.len();
                continue;
            };
            for (&slot, &qty) in &record.quantities {
                let Some(column) = self.plan.column_for(date, slot) else {
                    dropped += 1;
                    continue;
                };
                let row = rows
                    .entry(record.person_id.clone())
                    .or_insert_with(|| vec![None; width]);
                let cell = &mut row[column];
                *cell = Some(cell.unwrap_or(0).saturating_add(qty));
            }
        }

        if dropped > 0 {
            warn!(dropped, "attendance quantities outside the date/slot catalogs were ignored");
        }
        CellMap { width, rows }
    }
}

/// Sum of a row's cells
pub fn row_total(cells: &[Option<Quantity>]) -> Quantity {
    cells.iter().flatten().fold(0, |sum, &q| sum.saturating_add(q))
}

/// Per-column sums over the given rows, and their grand total
pub fn column_totals<'r>(
    width: usize,
    rows: impl IntoIterator<Item = &'r [Option<Quantity>]>,
) -> (Vec<Quantity>, Quantity) {
    let mut totals: Vec<Quantity> = vec![0; width];
    for cells in rows {
        for (total, cell) in totals.iter_mut().zip(cells) {
            *total = total.saturating_add(cell.unwrap_or(0));
        }
    }
    let grand = totals.iter().fold(0, |sum: Quantity, &t| sum.saturating_add(t));
    (totals, grand)
}
