//! Slot key shown beneath both renderings

use mealgrid_core::{LegendEntry, Slot};

/// Project slots (already in canonical order) into legend rows
pub fn build_legend(slots: &[Slot]) -> Vec<LegendEntry> {
    slots
        .iter()
        .map(|s| LegendEntry {
            name: s.name.clone(),
            abbreviation: s.abbreviation.clone(),
            location: s.location.clone(),
        })
        .collect()
}
