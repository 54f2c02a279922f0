//! HTML snapshot renderer
//!
//! Fills the `meals_pivot.html` template with table fragments built from the
//! grid and inlines `meals_pivot.css`. Every aggregate shown is computed here
//! by summing the grid cells, independently of the spreadsheet formulas.

use mealgrid_core::{
    CanonicalGrid, Column, ConfigurationError, GridRow, Quantity, RenderError, RenderedTotals,
    Renderer, MAX_QUANTITY,
};
use tracing::debug;

pub const HTML_TEMPLATE_ASSET: &str = "meals_pivot.html";
pub const HTML_CSS_ASSET: &str = "meals_pivot.css";
pub const HTML_CONTENT_TYPE: &str = "text/html";

const CSS_PLACEHOLDER: &str = "/* {{CSS}} */";

/// Placeholders the template must contain for the table to be complete
const REQUIRED_PLACEHOLDERS: [&str; 7] = [
    CSS_PLACEHOLDER,
    "{{GROUP_HEADERS}}",
    "{{SLOT_HEADERS}}",
    "{{DESC_HEADERS}}",
    "{{BODY_ROWS}}",
    "{{TOTALS_ROW}}",
    "{{KEY_ROWS}}",
];

/// Validated template and stylesheet text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtmlAssets {
    template: String,
    css: String,
}

impl HtmlAssets {
    /// Both assets are trimmed; empty text or a template missing one of the
    /// table placeholders is a configuration error.
    pub fn new(template: &str, css: &str) -> Result<Self, ConfigurationError> {
        let template = template.trim();
        if template.is_empty() {
            return Err(ConfigurationError::EmptyAsset(HTML_TEMPLATE_ASSET.to_string()));
        }
        let css = css.trim();
        if css.is_empty() {
            return Err(ConfigurationError::EmptyAsset(HTML_CSS_ASSET.to_string()));
        }
        if let Some(missing) = REQUIRED_PLACEHOLDERS.iter().find(|p| !template.contains(*p)) {
            return Err(ConfigurationError::InvalidAsset {
                name: HTML_TEMPLATE_ASSET.to_string(),
                message: format!("missing placeholder {}", missing),
            });
        }

        let mut css = css.to_string();
        if !has_left_rule(&css) {
            css.push_str("\n.left { text-align: left; }\n");
        }
        Ok(Self {
            template: template.to_string(),
            css,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn css(&self) -> &str {
        &self.css
    }
}

/// Whether the stylesheet already left-aligns `.left`
fn has_left_rule(css: &str) -> bool {
    let css = css.to_ascii_lowercase();
    css.match_indices(".left").any(|(at, m)| {
        let rest = css[at + m.len()..].trim_start();
        let Some(body) = rest.strip_prefix('{') else {
            return false;
        };
        let block = body.split('}').next().unwrap_or("");
        let compact: String = block.chars().filter(|c| !c.is_whitespace()).collect();
        compact.contains("text-align:left")
    })
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Rendered page and the totals it displays
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtmlDocument {
    pub html: String,
    pub totals: RenderedTotals,
}

/// HTML snapshot renderer
#[derive(Clone, Debug)]
pub struct HtmlRenderer {
    assets: HtmlAssets,
    spreadsheet_href: Option<String>,
}

impl HtmlRenderer {
    pub fn new(assets: HtmlAssets) -> Self {
        Self {
            assets,
            spreadsheet_href: None,
        }
    }

    /// Link target for the spreadsheet; defaults to `<base name>.xlsx`
    pub fn spreadsheet_href(mut self, href: impl Into<String>) -> Self {
        self.spreadsheet_href = Some(href.into());
        self
    }

    pub fn render_document(&self, grid: &CanonicalGrid) -> Result<HtmlDocument, RenderError> {
        let (body_rows, row_totals) = self.body_rows(grid)?;
        let (totals_row, column_totals, grand_total) = self.totals_row(grid)?;
        let href = self
            .spreadsheet_href
            .clone()
            .unwrap_or_else(|| format!("{}.xlsx", grid.base_name()));

        let html = self
            .assets
            .template
            .replacen(CSS_PLACEHOLDER, &self.assets.css, 1)
            .replace("{{EVENT_NAME}}", &html_escape(&grid.event_name))
            .replacen("{{GENERATED_AT}}", &html_escape(&grid.generated_at_text()), 1)
            .replacen("{{GROUP_HEADERS}}", &self.group_headers(grid), 1)
            .replacen("{{SLOT_HEADERS}}", &self.slot_headers(grid), 1)
            .replacen("{{DESC_HEADERS}}", &self.description_headers(grid), 1)
            .replacen("{{BODY_ROWS}}", &body_rows, 1)
            .replacen("{{TOTALS_ROW}}", &totals_row, 1)
            .replacen("{{KEY_ROWS}}", &self.key_rows(grid), 1)
            .replacen("{{EXCEL_URL}}", &html_escape(&href), 1);

        debug!(bytes = html.len(), grand_total, "rendered html snapshot");
        Ok(HtmlDocument {
            html,
            totals: RenderedTotals {
                column_totals,
                row_totals,
                grand_total,
            },
        })
    }

    fn group_headers(&self, grid: &CanonicalGrid) -> String {
        let mut out = String::from(
            r#"<th class="sticky name" style="text-align:left;">Name</th><th class="sticky company" style="text-align:left;">Company</th><th class="sticky role" style="text-align:left;">Role</th>"#,
        );
        for block in grid.date_blocks.iter().filter(|b| b.width > 0) {
            out.push_str(&format!(
                r#"<th class="group-header group" colspan="{}">{}</th>"#,
                block.width,
                html_escape(&block.label)
            ));
        }
        out.push_str(r#"<th class="group-header total-col">Total</th>"#);
        out
    }

    fn slot_headers(&self, grid: &CanonicalGrid) -> String {
        let mut out = String::from("<th></th><th></th><th></th>");
        for column in &grid.columns {
            if let Column::Slot { slot_index, .. } = *column {
                out.push_str(&format!(
                    r#"<th class="slot-header slot{}">{}</th>"#,
                    first_slot_class(slot_index),
                    html_escape(&grid.slots[slot_index].abbreviation)
                ));
            }
        }
        out.push_str(r#"<th class="slot-header total-col">Total</th>"#);
        out
    }

    fn description_headers(&self, grid: &CanonicalGrid) -> String {
        let mut out = String::from("<th></th><th></th><th></th>");
        for block in grid.date_blocks.iter().filter(|b| b.width > 0) {
            out.push_str(&format!(
                r#"<th class="date-desc" colspan="{}"><span class="desc-text">{}</span></th>"#,
                block.width,
                html_escape(&block.entry.description)
            ));
        }
        out.push_str(r#"<th class="total-col"></th>"#);
        out
    }

    /// Section and person rows, plus each person's summed total
    fn body_rows(&self, grid: &CanonicalGrid) -> Result<(String, Vec<Quantity>), RenderError> {
        let mut out = String::new();
        let mut row_totals = Vec::new();

        for section in grid.visible_sections() {
            out.push_str(&format!(
                r#"<tr class="section-row"><td class="section-header {}">{}</td><td class="meal-num"></td><td class="meal-num"></td>"#,
                section.kind.css_class(),
                html_escape(section.kind.label())
            ));
            for column in &grid.columns {
                match *column {
                    Column::Slot { slot_index, .. } => out.push_str(&format!(
                        r#"<td class="meal-num num{}"></td>"#,
                        first_slot_class(slot_index)
                    )),
                    Column::Total => out.push_str(r#"<td class="meal-num total-col"></td>"#),
                }
            }
            out.push_str("</tr>");

            for row in &section.rows {
                let total = self.person_row(grid, row, &mut out)?;
                row_totals.push(total);
            }
        }
        Ok((out, row_totals))
    }

    fn person_row(
        &self,
        grid: &CanonicalGrid,
        row: &GridRow,
        out: &mut String,
    ) -> Result<Quantity, RenderError> {
        let person = &row.person;
        out.push_str(&format!(
            r#"<tr><td class="left">{}</td><td class="left">{}</td><td class="left">{}</td>"#,
            html_escape(&person.name),
            html_escape(&person.company),
            html_escape(&person.role)
        ));

        let mut total = 0;
        for (column, cell) in grid.columns.iter().zip(&row.cells) {
            let Column::Slot { slot_index, .. } = *column else {
                continue;
            };
            let value = match cell {
                Some(qty) => {
                    if *qty > MAX_QUANTITY {
                        return Err(RenderError::InvalidData(format!(
                            "quantity {} for '{}' exceeds {}",
                            qty, person.id, MAX_QUANTITY
                        )));
                    }
                    total = checked_sum(total, *qty)?;
                    qty.to_string()
                }
                None => String::new(),
            };
            out.push_str(&format!(
                r#"<td class="meal-num num{}">{}</td>"#,
                first_slot_class(slot_index),
                value
            ));
        }
        out.push_str(&format!(
            r#"<td class="meal-num num total-col">{}</td></tr>"#,
            total
        ));
        Ok(total)
    }

    /// Totals row with column sums; the grand total is their sum
    fn totals_row(
        &self,
        grid: &CanonicalGrid,
    ) -> Result<(String, Vec<Quantity>, Quantity), RenderError> {
        let mut out = String::from(
            r#"<tr class="totals-row"><td class="total left meal-total-label" colspan="3">TOTAL</td>"#,
        );
        let mut column_totals = Vec::with_capacity(grid.data_column_count());
        for (index, column) in grid.columns.iter().enumerate() {
            let Column::Slot { slot_index, .. } = *column else {
                continue;
            };
            let sum = grid
                .rows()
                .filter_map(|row| row.cells.get(index).copied().flatten())
                .try_fold(0, checked_sum)?;
            out.push_str(&format!(
                r#"<td class="total num meal-total{}">{}</td>"#,
                first_slot_class(slot_index),
                sum
            ));
            column_totals.push(sum);
        }
        let grand_total = column_totals.iter().copied().try_fold(0, checked_sum)?;
        out.push_str(&format!(
            r#"<td class="total num total-col grand-total">{}</td></tr>"#,
            grand_total
        ));
        Ok((out, column_totals, grand_total))
    }

    fn key_rows(&self, grid: &CanonicalGrid) -> String {
        grid.legend
            .iter()
            .map(|entry| {
                format!(
                    r#"<tr class="key-row"><td class="key-meal">{}</td><td class="key-abb">{}</td><td class="key-loc loc">{}</td></tr>"#,
                    html_escape(&entry.name),
                    html_escape(&entry.abbreviation),
                    html_escape(&entry.location)
                )
            })
            .collect()
    }
}

fn first_slot_class(slot_index: usize) -> &'static str {
    if slot_index == 0 {
        " first-slot"
    } else {
        ""
    }
}

fn checked_sum(sum: Quantity, qty: Quantity) -> Result<Quantity, RenderError> {
    sum.checked_add(qty)
        .ok_or_else(|| RenderError::InvalidData(format!("total overflows adding {} to {}", qty, sum)))
}

impl Renderer for HtmlRenderer {
    type Output = HtmlDocument;

    fn render(&self, grid: &CanonicalGrid) -> Result<HtmlDocument, RenderError> {
        self.render_document(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mealgrid_parser::parse_value;
    use mealgrid_pivot::GridBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const TEMPLATE: &str = "<html><title>{{EVENT_NAME}}</title><style>/* {{CSS}} */</style>\
        <h1>{{EVENT_NAME}}</h1><p>{{GENERATED_AT}}</p><a href=\"{{EXCEL_URL}}\">xlsx</a>\
        <table><thead><tr>{{GROUP_HEADERS}}</tr><tr>{{DESC_HEADERS}}</tr><tr>{{SLOT_HEADERS}}</tr></thead>\
        <tbody>{{BODY_ROWS}}{{TOTALS_ROW}}</tbody></table><table>{{KEY_ROWS}}</table></html>";

    fn renderer() -> HtmlRenderer {
        HtmlRenderer::new(HtmlAssets::new(TEMPLATE, "td { padding: 0; }").unwrap())
    }

    fn grid() -> CanonicalGrid {
        let input = parse_value(json!({
            "eventName": "R&D <Summit>",
            "dates": [{ "date": "2025-08-06T00:00:00.000Z", "description": "Arrivals" }],
            "slots": [
                { "slot": 1, "abb": "B", "name": "Breakfast" },
                { "slot": 2, "abb": "L", "name": "Lunch", "location": "Tent" }
            ],
            "names": [
                { "id": "a", "name": "Alice", "company": "Acme" },
                { "id": "b", "name": "Bob", "company": "Zed" }
            ],
            "data": [
                { "name": "a", "Date": "2025-08-06T00:00:00.000Z", "slot1": 2, "slot2": 1, "accommodated": true },
                { "name": "b", "Date": "2025-08-06T00:00:00.000Z", "slot2": 3 }
            ]
        }))
        .unwrap();
        GridBuilder::new(&input)
            .generated_at(Utc.with_ymd_and_hms(2025, 8, 6, 14, 5, 0).unwrap())
            .build()
    }

    #[test]
    fn html_escape_works() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & \"b\""), "a &amp; &quot;b&quot;");
    }

    #[test]
    fn left_rule_detection() {
        assert!(has_left_rule(".left { text-align: left; }"));
        assert!(has_left_rule("td.x{}\n.LEFT{color:red;TEXT-ALIGN : left}"));
        assert!(!has_left_rule(".left { color: red; } p { text-align: left; }"));
        assert!(!has_left_rule(".leftish { text-align: left; }"));
    }

    #[test]
    fn left_rule_appended_once() {
        let assets = HtmlAssets::new(TEMPLATE, "td { padding: 0; }").unwrap();
        assert!(assets.css().ends_with(".left { text-align: left; }\n"));

        let assets = HtmlAssets::new(TEMPLATE, ".left { text-align: left }").unwrap();
        assert_eq!(assets.css(), ".left { text-align: left }");
    }

    #[test]
    fn empty_or_incomplete_assets_rejected() {
        assert_eq!(
            HtmlAssets::new("  ", "td {}").unwrap_err(),
            ConfigurationError::EmptyAsset("meals_pivot.html".into())
        );
        assert_eq!(
            HtmlAssets::new(TEMPLATE, "\n").unwrap_err(),
            ConfigurationError::EmptyAsset("meals_pivot.css".into())
        );
        let err = HtmlAssets::new("<html>{{BODY_ROWS}}</html>", "td {}").unwrap_err();
        assert!(err.to_string().contains("/* {{CSS}} */"));

        let without_descriptions = TEMPLATE.replace("<tr>{{DESC_HEADERS}}</tr>", "");
        assert_eq!(
            HtmlAssets::new(&without_descriptions, "td {}").unwrap_err(),
            ConfigurationError::InvalidAsset {
                name: "meals_pivot.html".into(),
                message: "missing placeholder {{DESC_HEADERS}}".into(),
            }
        );
    }

    #[test]
    fn oversized_cell_is_rejected() {
        let mut grid = grid();
        grid.sections[0].rows[0].cells[0] = Some(MAX_QUANTITY + 1);

        let err = renderer().render(&grid).unwrap_err();
        assert!(matches!(&err, RenderError::InvalidData(msg) if msg.contains("exceeds 1000000")));
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        assert_eq!(checked_sum(2, 3).unwrap(), 5);
        assert!(matches!(checked_sum(u64::MAX, 1), Err(RenderError::InvalidData(_))));
    }

    #[test]
    fn fills_every_placeholder() {
        let doc = renderer().render_document(&grid()).unwrap();
        assert!(!doc.html.contains("{{"));
        assert!(doc.html.contains("<title>R&amp;D &lt;Summit&gt;</title>"));
        assert!(doc.html.contains("<h1>R&amp;D &lt;Summit&gt;</h1>"));
        assert!(doc.html.contains("Wednesday 6 Aug 2025, 2:05 PM"));
        assert!(doc.html.contains("href=\"R&amp;D &lt;Summit&gt;_Catering_1754489100000.xlsx\""));
        assert!(doc.html.contains("td { padding: 0; }"));
    }

    #[test]
    fn table_structure() {
        let html = renderer().render_document(&grid()).unwrap().html;
        assert!(html.contains(r#"<th class="group-header group" colspan="2">Wed 6 Aug</th>"#));
        assert!(html.contains(r#"<th class="slot-header slot first-slot">B</th><th class="slot-header slot">L</th>"#));
        assert!(html.contains(r#"<span class="desc-text">Arrivals</span>"#));
        assert!(html.contains(r#"<td class="section-header accommodated">Accommodated</td>"#));
        assert!(html.contains(r#"<td class="section-header others">Others</td>"#));
        assert!(html.contains(
            r#"<td class="left">Alice</td><td class="left">Acme</td><td class="left"></td><td class="meal-num num first-slot">2</td><td class="meal-num num">1</td><td class="meal-num num total-col">3</td>"#
        ));
        assert!(html.contains(r#"<td class="total num total-col grand-total">6</td>"#));
        assert!(html.contains(r#"<td class="key-abb">L</td><td class="key-loc loc">Tent</td>"#));

        // Accommodated section precedes Others
        let housed = html.find("Accommodated</td>").unwrap();
        let others = html.find("Others</td>").unwrap();
        assert!(housed < others);
    }

    #[test]
    fn totals_from_own_summation() {
        let grid = grid();
        let doc = renderer().render(&grid).unwrap();
        assert_eq!(doc.totals.column_totals, vec![2, 4]);
        assert_eq!(doc.totals.row_totals, vec![3, 3]);
        assert_eq!(doc.totals.grand_total, 6);
        assert!(grid.check_totals("html", &doc.totals).is_ok());
    }

    #[test]
    fn explicit_spreadsheet_href() {
        let doc = renderer()
            .spreadsheet_href("https://files.example/grid.xlsx")
            .render_document(&grid())
            .unwrap();
        assert!(doc.html.contains("href=\"https://files.example/grid.xlsx\""));
    }

    #[test]
    fn zero_slots_render_total_only() {
        let mut grid = grid();
        grid.columns = vec![Column::Total];
        grid.date_blocks.iter_mut().for_each(|b| b.width = 0);
        grid.column_totals.clear();
        for section in &mut grid.sections {
            for row in &mut section.rows {
                row.cells.clear();
                row.total = 0;
            }
        }
        grid.grand_total = 0;

        let doc = renderer().render_document(&grid).unwrap();
        assert!(!doc.html.contains("group-header group"));
        assert!(doc.totals.column_totals.is_empty());
        assert_eq!(doc.totals.row_totals, vec![0, 0]);
        assert_eq!(doc.totals.grand_total, 0);
    }
}
