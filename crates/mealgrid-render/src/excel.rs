//! Spreadsheet renderer
//!
//! Produces a single-sheet XLSX workbook:
//! - Title, subtitle and generation timestamp
//! - Header row with one merged label per date, a description row and a
//!   slot-abbreviation row
//! - Accommodated / Others sections, one row per person, with a live
//!   `SUM` per person in the Total column
//! - A `TOTAL` row of `SUM` formulas down every column
//! - A key block listing each slot
//!
//! The totals reported back for cross-checking are obtained by evaluating
//! the written formulas, never by re-adding the grid.

use mealgrid_core::{
    CanonicalGrid, Column, Quantity, RenderError, RenderedTotals, Renderer, MAX_QUANTITY,
};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Formula, Workbook, Worksheet};
use tracing::debug;

use crate::sheet::{
    BorderWeight, CellStyle, CellValue, Col, Edge, PlannedCell, Row, SheetPlan, SumRange,
};
use crate::style::SheetStyle;

/// MIME type of the rendered workbook
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Name, Company, Role
const NAME_COLUMNS: Col = 3;
const HEADER_ROW: Row = 4;
const DESCRIPTION_ROW: Row = HEADER_ROW + 1;
const SLOT_ROW: Row = HEADER_ROW + 2;
/// Excel's column limit (XFD)
const MAX_COLUMNS: usize = 16_384;

/// Rendered workbook and the totals its formulas evaluate to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpreadsheetDocument {
    pub bytes: Vec<u8>,
    pub totals: RenderedTotals,
}

/// Planned sheet plus the coordinates needed to read totals back
#[derive(Clone, Debug, PartialEq)]
pub struct SheetLayout {
    pub plan: SheetPlan,
    pub first_data_col: Col,
    pub total_col: Col,
    pub person_rows: Vec<Row>,
    pub totals_row: Row,
    pub key_row: Row,
}

impl SheetLayout {
    /// Evaluate the `SUM` formulas of the Total column and the `TOTAL` row
    pub fn totals(&self) -> Result<RenderedTotals, RenderError> {
        let column_totals = (self.first_data_col..self.total_col)
            .map(|col| self.plan.evaluate(self.totals_row, col))
            .collect::<Result<Vec<_>, _>>()?;
        let row_totals = self
            .person_rows
            .iter()
            .map(|&row| self.plan.evaluate(row, self.total_col))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RenderedTotals {
            column_totals,
            row_totals,
            grand_total: self.plan.evaluate(self.totals_row, self.total_col)?,
        })
    }
}

/// XLSX renderer
#[derive(Clone, Debug, Default)]
pub struct ExcelRenderer {
    style: SheetStyle,
}

impl ExcelRenderer {
    pub fn new(style: SheetStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &SheetStyle {
        &self.style
    }

    /// Lay the grid out into a planned sheet
    pub fn layout(&self, grid: &CanonicalGrid) -> Result<SheetLayout, RenderError> {
        let data_cols = grid.data_column_count();
        if NAME_COLUMNS as usize + data_cols >= MAX_COLUMNS {
            return Err(RenderError::InvalidData(format!(
                "{} meal columns exceed the worksheet width",
                data_cols
            )));
        }
        let first_data_col = NAME_COLUMNS;
        let total_col = NAME_COLUMNS + data_cols as Col;
        let mut plan = SheetPlan::new();

        // Title block
        plan.text(0, 0, grid.event_name.as_str(), CellStyle::Title);
        plan.text(1, 0, self.style.subtitle.as_str(), CellStyle::Subtitle);
        plan.text(
            2,
            0,
            format!("Generated {}", grid.generated_at_text()),
            CellStyle::Generated,
        );

        self.plan_headers(grid, &mut plan, total_col);

        // Sections
        let first_body_row = SLOT_ROW + 1;
        let mut row = first_body_row;
        let mut person_rows = Vec::new();
        for section in grid.visible_sections() {
            plan.text(row, 0, section.kind.label(), CellStyle::SectionLabel);
            for col in 1..=total_col {
                plan.blank(row, col, CellStyle::SectionFill);
            }
            row += 1;

            for grid_row in &section.rows {
                let person = &grid_row.person;
                plan.text(row, 0, person.name.as_str(), CellStyle::Text);
                plan.text(row, 1, person.company.as_str(), CellStyle::Text);
                plan.text(row, 2, person.role.as_str(), CellStyle::Text);
                for (i, cell) in grid_row.cells.iter().enumerate() {
                    let col = first_data_col + i as Col;
                    match cell {
                        Some(qty) if *qty > MAX_QUANTITY => {
                            return Err(RenderError::InvalidData(format!(
                                "quantity {} for '{}' exceeds {}",
                                qty, person.id, MAX_QUANTITY
                            )));
                        }
                        Some(qty) => plan.set(row, col, CellValue::Number(*qty), CellStyle::Quantity),
                        None => plan.blank(row, col, CellStyle::Quantity),
                    }
                }
                let total = if data_cols > 0 {
                    CellValue::Formula(SumRange::new(row, first_data_col, row, total_col - 1)?)
                } else {
                    CellValue::Number(0)
                };
                plan.set(row, total_col, total, CellStyle::RowTotal);
                person_rows.push(row);
                row += 1;
            }
        }

        // TOTAL row; the Total column sums the per-person totals
        let totals_row = row;
        plan.text(totals_row, 0, "TOTAL", CellStyle::TotalLabel);
        plan.blank(totals_row, 1, CellStyle::TotalLabel);
        plan.blank(totals_row, 2, CellStyle::TotalLabel);
        for col in first_data_col..=total_col {
            let value = if totals_row > first_body_row {
                CellValue::Formula(SumRange::new(first_body_row, col, totals_row - 1, col)?)
            } else {
                CellValue::Number(0)
            };
            plan.set(totals_row, col, value, CellStyle::Total);
        }

        self.plan_borders(grid, &mut plan, total_col, first_body_row, totals_row);

        let key_row = totals_row + 2;
        self.plan_key(grid, &mut plan, key_row);

        for col in 0..NAME_COLUMNS {
            plan.set_column_width(col, self.style.columns.name);
        }
        for col in first_data_col..total_col {
            plan.set_column_width(col, self.style.columns.slot);
        }
        plan.set_column_width(total_col, self.style.columns.total);
        plan.set_row_height(DESCRIPTION_ROW, self.style.description.row_height);

        Ok(SheetLayout {
            plan,
            first_data_col,
            total_col,
            person_rows,
            totals_row,
            key_row,
        })
    }

    fn plan_headers(&self, grid: &CanonicalGrid, plan: &mut SheetPlan, total_col: Col) {
        for (col, label) in ["Name", "Company", "Role"].into_iter().enumerate() {
            plan.text(HEADER_ROW, col as Col, label, CellStyle::Header);
            plan.blank(DESCRIPTION_ROW, col as Col, CellStyle::Description);
            plan.blank(SLOT_ROW, col as Col, CellStyle::SlotHeader);
        }

        // Date label and description, each merged over the date's slots.
        // Zero-width blocks (no slots) have no columns to head.
        for block in grid.date_blocks.iter().filter(|b| b.width > 0) {
            let start = NAME_COLUMNS + block.first_column as Col;
            plan.text(HEADER_ROW, start, block.label.as_str(), CellStyle::Header);
            plan.text(
                DESCRIPTION_ROW,
                start,
                block.entry.description.as_str(),
                CellStyle::Description,
            );
            for col in start + 1..start + block.width as Col {
                plan.blank(HEADER_ROW, col, CellStyle::Header);
                plan.blank(DESCRIPTION_ROW, col, CellStyle::Description);
            }
            plan.merge_across(HEADER_ROW, start, block.width);
            plan.merge_across(DESCRIPTION_ROW, start, block.width);
        }
        plan.text(HEADER_ROW, total_col, "Total", CellStyle::Header);
        plan.blank(DESCRIPTION_ROW, total_col, CellStyle::Description);

        for (i, column) in grid.columns.iter().enumerate() {
            let col = NAME_COLUMNS + i as Col;
            match *column {
                Column::Slot { slot_index, .. } => plan.text(
                    SLOT_ROW,
                    col,
                    grid.slots[slot_index].abbreviation.as_str(),
                    CellStyle::SlotHeader,
                ),
                Column::Total => plan.text(SLOT_ROW, col, "Total", CellStyle::SlotHeader),
            }
        }
    }

    fn plan_borders(
        &self,
        grid: &CanonicalGrid,
        plan: &mut SheetPlan,
        total_col: Col,
        first_body_row: Row,
        totals_row: Row,
    ) {
        use BorderWeight::{Medium, Thin};

        for col in 0..=total_col {
            plan.border(SLOT_ROW, col, Edge::Bottom, Thin);
            if totals_row > first_body_row {
                plan.border(totals_row - 1, col, Edge::Bottom, Thin);
            }
        }
        for row in HEADER_ROW..=totals_row {
            for block in grid.date_blocks.iter().filter(|b| b.width > 0) {
                plan.border(row, NAME_COLUMNS + block.first_column as Col, Edge::Left, Thin);
            }
            plan.border(row, total_col, Edge::Left, Medium);
            plan.border(row, total_col, Edge::Right, Medium);
        }
        plan.outline(HEADER_ROW, 0, totals_row, total_col, Medium);
    }

    fn plan_key(&self, grid: &CanonicalGrid, plan: &mut SheetPlan, key_row: Row) {
        let last_col = self.style.legend.width - 1;

        plan.text(key_row, 0, "Key", CellStyle::KeyTitle);
        fill_key_row(plan, key_row, 1, last_col);

        let header_row = key_row + 1;
        for (col, label) in ["Meal", "Abbreviation", "Location"].into_iter().enumerate() {
            plan.text(header_row, col as Col, label, CellStyle::KeyHeader);
        }
        fill_key_row(plan, header_row, 3, last_col);

        for (i, entry) in grid.legend.iter().enumerate() {
            let row = header_row + 1 + i as Row;
            plan.text(row, 0, entry.name.as_str(), CellStyle::KeyText);
            plan.text(row, 1, entry.abbreviation.as_str(), CellStyle::KeyText);
            plan.text(row, 2, entry.location.as_str(), CellStyle::KeyText);
            fill_key_row(plan, row, 3, last_col);
            plan.merge_across(row, 2, (last_col - 1) as usize);
        }

        let last_row = header_row + grid.legend.len() as Row;
        plan.outline(key_row, 0, last_row, last_col, BorderWeight::Medium);
    }

    /// Render to XLSX bytes along with the evaluated totals
    pub fn render_to_bytes(&self, grid: &CanonicalGrid) -> Result<SpreadsheetDocument, RenderError> {
        let layout = self.layout(grid)?;
        let totals = layout.totals()?;
        let formats = self.create_formats()?;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.style.sheet_name).map_err(format_error)?;

        let plan = &layout.plan;
        for (row, col, cell) in plan.cells() {
            if plan.is_merged(row, col) {
                continue;
            }
            write_cell(sheet, plan, row, col, cell, &formats.for_cell(cell))?;
        }
        for merge in plan.merges() {
            let Some(cell) = plan.get(merge.first_row, merge.first_col) else {
                continue;
            };
            let text = match &cell.value {
                CellValue::Text(text) => text.as_str(),
                _ => "",
            };
            sheet
                .merge_range(
                    merge.first_row,
                    merge.first_col,
                    merge.last_row,
                    merge.last_col,
                    text,
                    &formats.for_cell(cell),
                )
                .map_err(format_error)?;
        }

        for (col, width) in plan.column_widths() {
            sheet.set_column_width(col, width).map_err(format_error)?;
        }
        for (row, height) in plan.row_heights() {
            sheet.set_row_height(row, height).map_err(format_error)?;
        }
        // Keep names and headers visible while scrolling
        sheet
            .set_freeze_panes(SLOT_ROW + 1, NAME_COLUMNS)
            .map_err(format_error)?;

        let bytes = workbook.save_to_buffer().map_err(format_error)?;
        debug!(
            bytes = bytes.len(),
            people = layout.person_rows.len(),
            grand_total = totals.grand_total,
            "rendered spreadsheet"
        );
        Ok(SpreadsheetDocument { bytes, totals })
    }

    fn create_formats(&self) -> Result<ExcelFormats, RenderError> {
        let fill = self.style.legend.fill_rgb()?;
        let centered = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let left = Format::new()
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter);

        Ok(ExcelFormats {
            title: Format::new().set_bold(),
            subtitle: Format::new(),
            generated: Format::new().set_bold(),
            header: centered.clone().set_bold(),
            description: centered
                .clone()
                .set_text_wrap()
                .set_font_size(self.style.description.font_size),
            slot_header: centered.clone().set_bold(),
            section_label: left.clone().set_bold(),
            section_fill: left.clone(),
            text: left,
            quantity: centered.clone(),
            row_total: centered.clone().set_bold(),
            total_label: Format::new().set_bold().set_align(FormatAlign::VerticalCenter),
            total: centered.set_bold(),
            key_title: Format::new().set_bold().set_background_color(fill),
            key_header: Format::new().set_italic().set_background_color(fill),
            key_text: Format::new().set_background_color(fill),
        })
    }
}

fn fill_key_row(plan: &mut SheetPlan, row: Row, from: Col, last_col: Col) {
    for col in from..=last_col {
        plan.blank(row, col, CellStyle::KeyText);
    }
}

fn format_error(e: rust_xlsxwriter::XlsxError) -> RenderError {
    RenderError::Format(e.to_string())
}

fn write_cell(
    sheet: &mut Worksheet,
    plan: &SheetPlan,
    row: Row,
    col: Col,
    cell: &PlannedCell,
    format: &Format,
) -> Result<(), RenderError> {
    match &cell.value {
        CellValue::Blank => sheet.write_blank(row, col, format),
        CellValue::Text(text) => sheet.write_string_with_format(row, col, text.as_str(), format),
        CellValue::Number(qty) => sheet.write_number_with_format(row, col, *qty as f64, format),
        CellValue::Formula(range) => {
            // Cached result for viewers that do not recalculate
            let result: Quantity = plan.evaluate(row, col)?;
            let formula = Formula::new(range.to_formula()).set_result(result.to_string());
            sheet.write_formula_with_format(row, col, formula, format)
        }
    }
    .map_err(format_error)?;
    Ok(())
}

/// Base format per cell role; borders are layered on per cell
struct ExcelFormats {
    title: Format,
    subtitle: Format,
    generated: Format,
    header: Format,
    description: Format,
    slot_header: Format,
    section_label: Format,
    section_fill: Format,
    text: Format,
    quantity: Format,
    row_total: Format,
    total_label: Format,
    total: Format,
    key_title: Format,
    key_header: Format,
    key_text: Format,
}

impl ExcelFormats {
    fn base(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Title => &self.title,
            CellStyle::Subtitle => &self.subtitle,
            CellStyle::Generated => &self.generated,
            CellStyle::Header => &self.header,
            CellStyle::Description => &self.description,
            CellStyle::SlotHeader => &self.slot_header,
            CellStyle::SectionLabel => &self.section_label,
            CellStyle::SectionFill => &self.section_fill,
            CellStyle::Text => &self.text,
            CellStyle::Quantity => &self.quantity,
            CellStyle::RowTotal => &self.row_total,
            CellStyle::TotalLabel => &self.total_label,
            CellStyle::Total => &self.total,
            CellStyle::KeyTitle => &self.key_title,
            CellStyle::KeyHeader => &self.key_header,
            CellStyle::KeyText => &self.key_text,
        }
    }

    fn for_cell(&self, cell: &PlannedCell) -> Format {
        let weight = |w: BorderWeight| match w {
            BorderWeight::Thin => FormatBorder::Thin,
            BorderWeight::Medium => FormatBorder::Medium,
        };
        let mut format = self.base(cell.style).clone();
        if let Some(w) = cell.borders.top {
            format = format.set_border_top(weight(w));
        }
        if let Some(w) = cell.borders.bottom {
            format = format.set_border_bottom(weight(w));
        }
        if let Some(w) = cell.borders.left {
            format = format.set_border_left(weight(w));
        }
        if let Some(w) = cell.borders.right {
            format = format.set_border_right(weight(w));
        }
        format
    }
}

impl Renderer for ExcelRenderer {
    type Output = SpreadsheetDocument;

    fn render(&self, grid: &CanonicalGrid) -> Result<SpreadsheetDocument, RenderError> {
        self.render_to_bytes(grid)
    }
}
