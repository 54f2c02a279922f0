//! Integration tests: spreadsheet formulas and HTML totals agree with the grid
//!
//! Uses the assets shipped at the workspace root.

use chrono::{TimeZone, Utc};
use mealgrid_core::{CanonicalGrid, Renderer};
use mealgrid_parser::parse_value;
use mealgrid_pivot::GridBuilder;
use mealgrid_render::{ExcelRenderer, HtmlAssets, HtmlRenderer, SheetStyle};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const TEMPLATE: &str = include_str!("../../../assets/meals_pivot.html");
const CSS: &str = include_str!("../../../assets/meals_pivot.css");
const STYLE: &str = include_str!("../../../assets/sheet_style.toml");

fn grid(payload: Value) -> CanonicalGrid {
    let input = parse_value(payload).unwrap();
    GridBuilder::new(&input)
        .generated_at(Utc.with_ymd_and_hms(2025, 8, 6, 9, 0, 0).unwrap())
        .build()
}

fn renderers() -> (ExcelRenderer, HtmlRenderer) {
    (
        ExcelRenderer::new(SheetStyle::from_toml_str(STYLE).unwrap()),
        HtmlRenderer::new(HtmlAssets::new(TEMPLATE, CSS).unwrap()),
    )
}

/// Three days, four slots, a mix of housed and day guests with duplicates
fn conference() -> Value {
    json!({
        "eventName": "Harbour Conference",
        "dates": [
            { "date": "2025-09-03", "description": "Workshops" },
            { "date": "2025-09-01", "description": "Arrivals and registration" },
            { "date": "2025-09-02" },
        ],
        "slots": [
            { "slot": 4, "abb": "TC", "name": "Tea & Coffee", "sort": 2 },
            { "slot": 1, "abb": "B", "name": "Breakfast", "location": "Hotel" },
            { "slot": 2, "abb": "L", "name": "Lunch", "location": "Main hall" },
            { "slot": 3, "abb": "D", "name": "Dinner", "location": "Quay <Terrace>" },
        ],
        "names": [
            { "id": "s1", "name": "Priya", "company": "Northwind", "role": "Speaker" },
            { "id": "s2", "name": "Tom", "company": "northwind", "role": "Speaker" },
            { "id": "v1", "name": "Lee", "company": "Catering Co", "role": "Volunteer" },
        ],
        "tags": [
            { "id": 7, "name": "Press", "company": "Gazette" },
        ],
        "data": [
            { "name": "s1", "Date": "2025-09-01", "slot1": 1, "slot3": 1, "accommodated": true },
            { "name": "s1", "Date": "2025-09-02", "slot1": 1, "slot2": 1, "slot3": 1, "slot4": 2 },
            { "name": "s1", "Date": "2025-09-03", "slot1": 1, "slot4": 1 },
            { "name": "s2", "Date": "2025-09-02", "slot2": 1, "slot4": 1 },
            { "name": "s2", "Date": "2025-09-02", "slot2": 2 },
            { "name": "v1", "Date": "2025-09-01", "slot2": 12, "slot4": 30 },
            { "name": "v1", "Date": "2025-09-03", "slot2": 10, "accommodated": false },
            { "name": 7, "Date": "2025-09-02", "slot4": 3 },
            { "name": "walkin", "Date": "2025-09-03", "slot3": 2, "accommodated": true },
            { "name": "s2", "Date": "2025-10-01", "slot2": 5 },
        ]
    })
}

#[test]
fn both_renderers_agree_with_grid() {
    let grid = grid(conference());
    let (excel, html) = renderers();

    let sheet = excel.render(&grid).unwrap();
    let page = html.render(&grid).unwrap();

    grid.check_totals("spreadsheet", &sheet.totals).unwrap();
    grid.check_totals("html", &page.totals).unwrap();
    assert_eq!(sheet.totals, page.totals);

    // s1 9, s2 4 (October record dropped), v1 52, press 3, walkin 2
    assert_eq!(grid.grand_total, 70);
}

#[test]
fn formulas_reference_expected_ranges() {
    let grid = grid(conference());
    let (excel, _) = renderers();
    let layout = excel.layout(&grid).unwrap();

    // 3 dates x 4 slots: data columns D..O, Total in P
    assert_eq!(layout.total_col, 15);
    let first = layout.person_rows[0];
    assert_eq!(
        layout.plan.formula(first, 15),
        Some(format!("=SUM(D{}:O{})", first + 1, first + 1))
    );
    assert_eq!(
        layout.plan.formula(layout.totals_row, 15),
        Some(format!("=SUM(P8:P{})", layout.totals_row))
    );
    assert_eq!(layout.totals().unwrap().row_totals, grid.row_totals());
}

#[test]
fn tampered_grid_is_detected() {
    let mut grid = grid(conference());
    let (_, html) = renderers();
    let page = html.render(&grid).unwrap();

    grid.grand_total += 1;
    let err = grid.check_totals("html", &page.totals).unwrap_err();
    assert!(err.to_string().contains("html totals disagree"));
}

#[test]
fn html_snapshot_uses_shipped_template() {
    let grid = grid(conference());
    let (_, html) = renderers();
    let page = html.render(&grid).unwrap().html;

    assert!(!page.contains("{{"));
    assert!(!page.contains("/* {{CSS}} */"));
    assert!(page.contains("Harbour Conference"));
    assert!(page.contains("Harbour Conference_Catering_1754470800000.xlsx"));
    assert!(page.contains("Quay &lt;Terrace&gt;"));
    assert!(page.contains("Tea &amp; Coffee"));
    assert!(page.contains("Arrivals and registration"));
}

#[test]
fn degenerate_grids_still_render() {
    let (excel, html) = renderers();

    let mut no_slots = conference();
    no_slots["slots"] = json!([]);
    let no_people = json!({ "dates": [{ "date": "2025-09-01" }], "slots": [{ "slot": 1, "abb": "B" }] });

    for payload in [no_slots, no_people] {
        let grid = grid(payload);
        let sheet = excel.render(&grid).unwrap();
        let page = html.render(&grid).unwrap();
        grid.check_totals("spreadsheet", &sheet.totals).unwrap();
        grid.check_totals("html", &page.totals).unwrap();
        assert_eq!(sheet.totals.grand_total, 0);
    }
}
