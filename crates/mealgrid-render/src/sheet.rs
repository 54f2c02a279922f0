//! Planned worksheet
//!
//! The spreadsheet renderer first lays the grid out into a `SheetPlan`: a
//! sparse map of cells with values, styles and borders, plus merged ranges.
//! The plan is then written to XLSX. Keeping the plan separate lets SUM
//! formulas be evaluated against exactly what is written, which is how the
//! spreadsheet totals are cross-checked against the aggregated grid.

use mealgrid_core::{Quantity, RenderError};
use std::collections::BTreeMap;

/// Zero-based row index (as used by the XLSX writer)
pub type Row = u32;
/// Zero-based column index
pub type Col = u16;

/// Convert column number to Excel letter (0 -> A, 25 -> Z, 26 -> AA)
pub fn col_to_letter(col: Col) -> String {
    let mut result = String::new();
    let mut n = col as u32;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Rectangular `SUM` range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SumRange {
    pub first_row: Row,
    pub first_col: Col,
    pub last_row: Row,
    pub last_col: Col,
}

impl SumRange {
    /// Fails when the range would be empty (inverted bounds)
    pub fn new(first_row: Row, first_col: Col, last_row: Row, last_col: Col) -> Result<Self, RenderError> {
        if last_row < first_row || last_col < first_col {
            return Err(RenderError::InvalidData(format!(
                "empty SUM range {}{}:{}{}",
                col_to_letter(first_col),
                first_row + 1,
                col_to_letter(last_col),
                last_row + 1
            )));
        }
        Ok(Self {
            first_row,
            first_col,
            last_row,
            last_col,
        })
    }

    pub fn contains(&self, row: Row, col: Col) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }

    /// A1-style formula text, e.g. `=SUM(D9:D12)`
    pub fn to_formula(&self) -> String {
        format!(
            "=SUM({}{}:{}{})",
            col_to_letter(self.first_col),
            self.first_row + 1,
            col_to_letter(self.last_col),
            self.last_row + 1
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellValue {
    Blank,
    Text(String),
    Number(Quantity),
    Formula(SumRange),
}

/// Visual role of a cell; mapped to an XLSX format by the renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellStyle {
    Title,
    Subtitle,
    Generated,
    Header,
    Description,
    SlotHeader,
    SectionLabel,
    SectionFill,
    Text,
    Quantity,
    RowTotal,
    TotalLabel,
    Total,
    KeyTitle,
    KeyHeader,
    KeyText,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderWeight {
    Thin,
    Medium,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Borders {
    pub top: Option<BorderWeight>,
    pub bottom: Option<BorderWeight>,
    pub left: Option<BorderWeight>,
    pub right: Option<BorderWeight>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Borders {
    /// Set an edge; a heavier existing weight is kept
    fn apply(&mut self, edge: Edge, weight: BorderWeight) {
        let slot = match edge {
            Edge::Top => &mut self.top,
            Edge::Bottom => &mut self.bottom,
            Edge::Left => &mut self.left,
            Edge::Right => &mut self.right,
        };
        if *slot != Some(BorderWeight::Medium) {
            *slot = Some(weight);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedCell {
    pub value: CellValue,
    pub style: CellStyle,
    pub borders: Borders,
}

/// Merged range; its value and format come from the top-left cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Merge {
    pub first_row: Row,
    pub first_col: Col,
    pub last_row: Row,
    pub last_col: Col,
}

impl Merge {
    pub fn covers(&self, row: Row, col: Col) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetPlan {
    cells: BTreeMap<(Row, Col), PlannedCell>,
    merges: Vec<Merge>,
    column_widths: BTreeMap<Col, f64>,
    row_heights: BTreeMap<Row, f64>,
}

impl SheetPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a cell, keeping any borders already applied to it
    pub fn set(&mut self, row: Row, col: Col, value: CellValue, style: CellStyle) {
        let borders = self.cells.get(&(row, col)).map(|c| c.borders).unwrap_or_default();
        self.cells.insert((row, col), PlannedCell { value, style, borders });
    }

    pub fn text(&mut self, row: Row, col: Col, text: impl Into<String>, style: CellStyle) {
        self.set(row, col, CellValue::Text(text.into()), style);
    }

    pub fn blank(&mut self, row: Row, col: Col, style: CellStyle) {
        self.set(row, col, CellValue::Blank, style);
    }

    /// Merge a horizontal run. Runs of one cell are left unmerged; empty runs are ignored.
    pub fn merge_across(&mut self, row: Row, first_col: Col, width: usize) {
        if width < 2 {
            return;
        }
        self.merges.push(Merge {
            first_row: row,
            first_col,
            last_row: row,
            last_col: first_col + (width - 1) as Col,
        });
    }

    pub fn border(&mut self, row: Row, col: Col, edge: Edge, weight: BorderWeight) {
        let cell = self.cells.entry((row, col)).or_insert(PlannedCell {
            value: CellValue::Blank,
            style: CellStyle::Text,
            borders: Borders::default(),
        });
        cell.borders.apply(edge, weight);
    }

    /// Outline a rectangle with `weight` borders
    pub fn outline(&mut self, first_row: Row, first_col: Col, last_row: Row, last_col: Col, weight: BorderWeight) {
        for col in first_col..=last_col {
            self.border(first_row, col, Edge::Top, weight);
            self.border(last_row, col, Edge::Bottom, weight);
        }
        for row in first_row..=last_row {
            self.border(row, first_col, Edge::Left, weight);
            self.border(row, last_col, Edge::Right, weight);
        }
    }

    pub fn set_column_width(&mut self, col: Col, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn set_row_height(&mut self, row: Row, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn get(&self, row: Row, col: Col) -> Option<&PlannedCell> {
        self.cells.get(&(row, col))
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (Row, Col, &PlannedCell)> {
        self.cells.iter().map(|(&(r, c), cell)| (r, c, cell))
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (Col, f64)> + '_ {
        self.column_widths.iter().map(|(&c, &w)| (c, w))
    }

    pub fn row_heights(&self) -> impl Iterator<Item = (Row, f64)> + '_ {
        self.row_heights.iter().map(|(&r, &h)| (r, h))
    }

    /// Whether a cell is part of any merged range (it is written by the merge)
    pub fn is_merged(&self, row: Row, col: Col) -> bool {
        self.merges.iter().any(|m| m.covers(row, col))
    }

    /// Formula text of a cell, if it holds one
    pub fn formula(&self, row: Row, col: Col) -> Option<String> {
        match self.get(row, col).map(|c| &c.value) {
            Some(CellValue::Formula(range)) => Some(range.to_formula()),
            _ => None,
        }
    }

    /// Numeric value of a cell the way a spreadsheet would compute it.
    ///
    /// Text and blanks count as zero inside `SUM`. A formula whose range
    /// reaches back into its own cell is rejected.
    pub fn evaluate(&self, row: Row, col: Col) -> Result<Quantity, RenderError> {
        self.evaluate_guarded(row, col, &mut Vec::new())
    }

    fn evaluate_guarded(&self, row: Row, col: Col, stack: &mut Vec<(Row, Col)>) -> Result<Quantity, RenderError> {
        let Some(cell) = self.get(row, col) else {
            return Ok(0);
        };
        match &cell.value {
            CellValue::Blank | CellValue::Text(_) => Ok(0),
            CellValue::Number(n) => Ok(*n),
            CellValue::Formula(range) => {
                if stack.contains(&(row, col)) {
                    return Err(RenderError::InvalidData(format!(
                        "circular reference at {}{}",
                        col_to_letter(col),
                        row + 1
                    )));
                }
                stack.push((row, col));
                let mut sum = 0;
                for (&(r, c), _) in self
                    .cells
                    .range((range.first_row, 0)..=(range.last_row, Col::MAX))
                {
                    if range.contains(r, c) {
                        let value = self.evaluate_guarded(r, c, stack)?;
                        sum = Quantity::checked_add(sum, value).ok_or_else(|| {
                            RenderError::InvalidData(format!(
                                "{} overflows at {}{}",
                                range.to_formula(),
                                col_to_letter(col),
                                row + 1
                            ))
                        })?;
                    }
                }
                stack.pop();
                Ok(sum)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn col_to_letter_works() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(3), "D");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(27), "AB");
        assert_eq!(col_to_letter(51), "AZ");
        assert_eq!(col_to_letter(702), "AAA");
    }

    #[test]
    fn sum_range_formula_text() {
        let range = SumRange::new(8, 3, 11, 3).unwrap();
        assert_eq!(range.to_formula(), "=SUM(D9:D12)");
        let row = SumRange::new(8, 3, 8, 28).unwrap();
        assert_eq!(row.to_formula(), "=SUM(D9:AC9)");
    }

    #[test]
    fn inverted_range_is_render_error() {
        let err = SumRange::new(8, 3, 7, 3).unwrap_err();
        assert!(matches!(err, RenderError::InvalidData(_)));
        assert!(err.to_string().contains("D9:D8"));
    }

    #[test]
    fn evaluates_nested_sums() {
        let mut plan = SheetPlan::new();
        plan.set(0, 0, CellValue::Number(2), CellStyle::Quantity);
        plan.text(0, 1, "ignored", CellStyle::Text);
        plan.set(0, 2, CellValue::Number(3), CellStyle::Quantity);
        plan.set(0, 3, CellValue::Formula(SumRange::new(0, 0, 0, 2).unwrap()), CellStyle::RowTotal);
        plan.set(1, 3, CellValue::Number(4), CellStyle::Quantity);
        plan.set(2, 3, CellValue::Formula(SumRange::new(0, 3, 1, 3).unwrap()), CellStyle::Total);

        assert_eq!(plan.evaluate(0, 3).unwrap(), 5);
        assert_eq!(plan.evaluate(2, 3).unwrap(), 9);
        assert_eq!(plan.evaluate(5, 5).unwrap(), 0);
        assert_eq!(plan.formula(2, 3).as_deref(), Some("=SUM(D1:D2)"));
    }

    #[test]
    fn self_reference_is_rejected() {
        let mut plan = SheetPlan::new();
        plan.set(0, 0, CellValue::Formula(SumRange::new(0, 0, 1, 0).unwrap()), CellStyle::Total);
        assert!(plan.evaluate(0, 0).is_err());
    }

    #[test]
    fn overflowing_sum_is_rejected() {
        let mut plan = SheetPlan::new();
        plan.set(0, 0, CellValue::Number(u64::MAX), CellStyle::Quantity);
        plan.set(1, 0, CellValue::Number(1), CellStyle::Quantity);
        plan.set(2, 0, CellValue::Formula(SumRange::new(0, 0, 1, 0).unwrap()), CellStyle::Total);

        let err = plan.evaluate(2, 0).unwrap_err();
        assert!(matches!(&err, RenderError::InvalidData(msg) if msg.contains("=SUM(A1:A2) overflows at A3")));
    }

    #[test]
    fn borders_keep_heavier_weight() {
        let mut plan = SheetPlan::new();
        plan.border(0, 0, Edge::Left, BorderWeight::Medium);
        plan.border(0, 0, Edge::Left, BorderWeight::Thin);
        plan.text(0, 0, "x", CellStyle::Text);
        let cell = plan.get(0, 0).unwrap();
        assert_eq!(cell.borders.left, Some(BorderWeight::Medium));
        assert_eq!(cell.value, CellValue::Text("x".into()));
    }

    #[test]
    fn single_cell_runs_are_not_merged() {
        let mut plan = SheetPlan::new();
        plan.merge_across(4, 3, 3);
        plan.merge_across(4, 6, 1);
        plan.merge_across(4, 7, 0);
        assert_eq!(plan.merges().len(), 1);
        assert!(plan.is_merged(4, 3));
        assert!(plan.is_merged(4, 5));
        assert!(!plan.is_merged(4, 6));
        assert!(!plan.is_merged(5, 3));
    }
}
