//! # mealgrid-render
//!
//! Rendering backends for mealgrid pivot grids.
//!
//! This crate provides:
//! - XLSX spreadsheet rendering with live `SUM` formulas ([`excel`])
//! - HTML snapshot rendering from a template with computed totals ([`html`])
//! - The planned-sheet model and formula evaluator behind the spreadsheet ([`sheet`])
//! - Spreadsheet styling rules loaded from TOML ([`style`])
//!
//! Both renderers report the totals they produced so callers can check them
//! against the grid (and therefore against each other).
//!
//! ## Example
//!
//! ```rust,ignore
//! use mealgrid_core::Renderer;
//! use mealgrid_render::{ExcelRenderer, HtmlAssets, HtmlRenderer, SheetStyle};
//!
//! let excel = ExcelRenderer::new(SheetStyle::from_toml_str(&style_toml)?);
//! let sheet = excel.render(&grid)?;
//! grid.check_totals("spreadsheet", &sheet.totals)?;
//!
//! let html = HtmlRenderer::new(HtmlAssets::new(&template, &css)?);
//! let page = html.render(&grid)?;
//! grid.check_totals("html", &page.totals)?;
//! std::fs::write("grid.xlsx", sheet.bytes)?;
//! ```

pub mod excel;
pub mod html;
pub mod sheet;
pub mod style;

pub use excel::{ExcelRenderer, SheetLayout, SpreadsheetDocument, XLSX_CONTENT_TYPE};
pub use html::{
    html_escape, HtmlAssets, HtmlDocument, HtmlRenderer, HTML_CONTENT_TYPE, HTML_CSS_ASSET,
    HTML_TEMPLATE_ASSET,
};
pub use sheet::{col_to_letter, SheetPlan, SumRange};
pub use style::{SheetStyle, SHEET_STYLE_ASSET};
