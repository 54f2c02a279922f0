//! Request pipeline: payload in, two documents out.
//!
//! Parse, build the grid once, render both documents in parallel, check that
//! both renderers' totals agree with the grid, then hand the spreadsheet and
//! the snapshot to the sink in that order. Nothing reaches the sink unless
//! every earlier step succeeded.

use chrono::{DateTime, Utc};
use mealgrid_core::{CanonicalGrid, PipelineError, Quantity, Renderer, Sink};
use mealgrid_parser::parse_payload;
use mealgrid_pivot::GridBuilder;
use mealgrid_render::{ExcelRenderer, HtmlRenderer, HTML_CONTENT_TYPE, XLSX_CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, info};

use crate::assets::Assets;

/// Result reported back to the caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PivotOutcome {
    pub status: &'static str,
    pub event: String,
    /// Sink location of the spreadsheet
    pub spreadsheet: String,
    /// Sink location of the HTML snapshot
    pub html: String,
    pub people: usize,
    pub grand_total: Quantity,
}

pub struct Pipeline {
    excel: ExcelRenderer,
    html: HtmlRenderer,
    generated_at: Option<DateTime<Utc>>,
}

impl Pipeline {
    pub fn new(assets: Assets) -> Self {
        Self {
            excel: ExcelRenderer::new(assets.style),
            html: HtmlRenderer::new(assets.html),
            generated_at: None,
        }
    }

    /// Pin the generation timestamp instead of using the current time
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    pub fn build_grid(&self, payload: &str) -> Result<CanonicalGrid, PipelineError> {
        let input = parse_payload(payload)?;
        let mut builder = GridBuilder::new(&input);
        if let Some(at) = self.generated_at {
            builder = builder.generated_at(at);
        }
        Ok(builder.build())
    }

    pub fn run(&self, payload: &str, sink: &dyn Sink) -> Result<PivotOutcome, PipelineError> {
        let grid = self.build_grid(payload)?;

        let (sheet, page) = rayon::join(|| self.excel.render(&grid), || self.html.render(&grid));
        let (sheet, page) = (sheet?, page?);
        grid.check_totals("spreadsheet", &sheet.totals)?;
        grid.check_totals("html", &page.totals)?;
        debug!(grand_total = grid.grand_total, "renderer totals agree");

        let base = grid.base_name();
        let spreadsheet = sink.write(&format!("{}.xlsx", base), &sheet.bytes, XLSX_CONTENT_TYPE)?;
        let html = sink.write(&format!("{}.html", base), page.html.as_bytes(), HTML_CONTENT_TYPE)?;
        info!(%spreadsheet, %html, "catering grid written");

        Ok(PivotOutcome {
            status: "success",
            event: grid.event_name.clone(),
            spreadsheet,
            html,
            people: grid.rows().count(),
            grand_total: grid.grand_total,
        })
    }
}
