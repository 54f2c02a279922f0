//! # mealgrid-pivot
//!
//! Builds the `CanonicalGrid` from a normalized `PivotInput`.
//!
//! This crate provides:
//! - Column and row planning ([`layout`])
//! - Cell, row, column and grand totals ([`aggregate`])
//! - The slot legend ([`legend`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use mealgrid_parser::parse_payload;
//! use mealgrid_pivot::GridBuilder;
//!
//! let input = parse_payload(&json)?;
//! let grid = GridBuilder::new(&input).build();
//! assert_eq!(grid.grand_total, grid.row_totals().iter().sum());
//! ```

pub mod aggregate;
pub mod layout;
pub mod legend;

pub use aggregate::{Aggregator, CellMap};
pub use layout::{ColumnPlan, RowPlan};
pub use legend::build_legend;

use chrono::{DateTime, Utc};
use mealgrid_core::{CanonicalGrid, GridRow, PivotInput, Section};
use tracing::debug;

/// Assembles a grid; the generation timestamp defaults to now
pub struct GridBuilder<'a> {
    input: &'a PivotInput,
    generated_at: Option<DateTime<Utc>>,
}

impl<'a> GridBuilder<'a> {
    pub fn new(input: &'a PivotInput) -> Self {
        Self {
            input,
            generated_at: None,
        }
    }

    /// Pin the generation timestamp (the only non-deterministic grid field)
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    pub fn build(self) -> CanonicalGrid {
        let input = self.input;
        let plan = ColumnPlan::new(&input.dates, &input.slots);
        let accommodated = layout::accommodated_ids(&input.records);
        let row_plan = RowPlan::new(&input.directory, &accommodated);
        let cells = Aggregator::new(&plan).aggregate(&input.records);

        let sections: Vec<Section> = row_plan
            .sections
            .into_iter()
            .map(|(kind, people)| Section {
                kind,
                rows: people
                    .into_iter()
                    .map(|person| {
                        let cells = cells.row(&person.id);
                        let total = aggregate::row_total(&cells);
                        GridRow {
                            person,
                            cells,
                            total,
                        }
                    })
                    .collect(),
            })
            .collect();

        let width = plan.data_column_count();
        let (column_totals, grand_total) = aggregate::column_totals(
            width,
            sections
                .iter()
                .flat_map(|s| s.rows.iter())
                .map(|r| r.cells.as_slice()),
        );

        debug!(
            columns = plan.columns.len(),
            accommodated = sections[0].rows.len(),
            others = sections[1].rows.len(),
            grand_total,
            "built grid"
        );

        let ColumnPlan {
            date_blocks,
            columns,
            ..
        } = plan;

        CanonicalGrid {
            event_name: input.event_name.clone(),
            generated_at: self.generated_at.unwrap_or_else(Utc::now),
            slots: input.slots.clone(),
            date_blocks,
            columns,
            sections,
            column_totals,
            grand_total,
            legend: build_legend(&input.slots),
        }
    }
}

/// Build a grid stamped with the current time
pub fn build_grid(input: &PivotInput) -> CanonicalGrid {
    GridBuilder::new(input).build()
}
