//! Canonical pivot grid
//!
//! The grid is the single value both renderers consume. It is built once per
//! request by `mealgrid-pivot` and never mutated afterwards.
//!
//! ```text
//!              | Wed 6 Aug   | Thu 7 Aug   |
//!              | B  | L | D  | B  | L | D  | Total
//! Accommodated |    |   |    |    |   |    |
//!   Alice      | 2  |   | 1  |    |   |    |   3
//! Others       |    |   |    |    |   |    |
//!   Bob        |    | 1 |    |    | 1 |    |   2
//! TOTAL        | 2  | 1 | 1  |    | 1 |    |   5
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{DateEntry, Person, Quantity, RenderError, Slot};

/// One column of the grid, in date-major, slot-minor order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    /// Quantity column for one (date, slot) pair; indices into `dates`/`slots`
    Slot { date_index: usize, slot_index: usize },
    /// Trailing per-row total
    Total,
}

/// A date header spanning that date's slot columns
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DateBlock {
    pub entry: DateEntry,
    pub label: String,
    /// Index of the first data column belonging to this date
    pub first_column: usize,
    /// Number of slot columns (equal for every block)
    pub width: usize,
}

/// Row grouping bucket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    Accommodated,
    Others,
}

impl SectionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Accommodated => "Accommodated",
            SectionKind::Others => "Others",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            SectionKind::Accommodated => "accommodated",
            SectionKind::Others => "others",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One person's row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub person: Person,
    /// One entry per data column; `None` renders as an empty cell
    pub cells: Vec<Option<Quantity>>,
    pub total: Quantity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub rows: Vec<GridRow>,
}

impl Section {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Key row describing a slot
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub name: String,
    pub abbreviation: String,
    pub location: String,
}

/// Totals as a renderer produced them, for cross-checking against the grid
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderedTotals {
    /// Per data column (the Total column is reported as `grand_total`)
    pub column_totals: Vec<Quantity>,
    /// Per person row, in grid order
    pub row_totals: Vec<Quantity>,
    pub grand_total: Quantity,
}

/// Renderer-agnostic pivot grid
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CanonicalGrid {
    pub event_name: String,
    pub generated_at: DateTime<Utc>,
    /// Slots in canonical order
    pub slots: Vec<Slot>,
    /// Dates in ascending order with their column spans
    pub date_blocks: Vec<DateBlock>,
    /// Data columns followed by exactly one `Column::Total`
    pub columns: Vec<Column>,
    /// Always `[Accommodated, Others]`; either may be empty
    pub sections: Vec<Section>,
    /// Per data column
    pub column_totals: Vec<Quantity>,
    pub grand_total: Quantity,
    pub legend: Vec<LegendEntry>,
}

impl CanonicalGrid {
    /// Number of (date, slot) columns, excluding the trailing Total
    pub fn data_column_count(&self) -> usize {
        self.columns.len().saturating_sub(1)
    }

    /// All person rows in section order
    pub fn rows(&self) -> impl Iterator<Item = &GridRow> {
        self.sections.iter().flat_map(|s| s.rows.iter())
    }

    /// Sections that have at least one row (empty sections are not rendered)
    pub fn visible_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| !s.is_empty())
    }

    pub fn row_totals(&self) -> Vec<Quantity> {
        self.rows().map(|r| r.total).collect()
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Deterministic document base name: `<event>_Catering_<unix millis>`
    pub fn base_name(&self) -> String {
        let event: String = self
            .event_name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{}_Catering_{}", event, self.generated_at.timestamp_millis())
    }

    /// e.g. `Wednesday 6 Aug 2025, 2:05 PM`
    pub fn generated_at_text(&self) -> String {
        self.generated_at.format("%A %-d %b %Y, %-I:%M %p").to_string()
    }

    /// Compare a renderer's totals against the aggregated ones
    pub fn check_totals(
        &self,
        renderer: &'static str,
        totals: &RenderedTotals,
    ) -> Result<(), RenderError> {
        let mismatch = |detail: String| RenderError::TotalsMismatch { renderer, detail };

        if totals.column_totals != self.column_totals {
            return Err(mismatch(format!(
                "column totals {:?} != {:?}",
                totals.column_totals, self.column_totals
            )));
        }
        let rows = self.row_totals();
        if totals.row_totals != rows {
            return Err(mismatch(format!("row totals {:?} != {:?}", totals.row_totals, rows)));
        }
        if totals.grand_total != self.grand_total {
            return Err(mismatch(format!(
                "grand total {} != {}",
                totals.grand_total, self.grand_total
            )));
        }
        Ok(())
    }
}
