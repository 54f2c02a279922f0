//! Spreadsheet styling rules, loaded from the `sheet_style.toml` asset.

use mealgrid_core::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Asset file name the styling rules are read from
pub const SHEET_STYLE_ASSET: &str = "sheet_style.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetStyle {
    /// Worksheet tab name
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Second title line
    #[serde(default = "default_subtitle")]
    pub subtitle: String,

    #[serde(default)]
    pub columns: ColumnWidths,

    #[serde(default)]
    pub description: DescriptionStyle,

    #[serde(default)]
    pub legend: LegendStyle,
}

fn default_sheet_name() -> String {
    "Meals".to_string()
}

fn default_subtitle() -> String {
    "Catering Grid".to_string()
}

impl Default for SheetStyle {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
            subtitle: default_subtitle(),
            columns: ColumnWidths::default(),
            description: DescriptionStyle::default(),
            legend: LegendStyle::default(),
        }
    }
}

/// Column widths in character units
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnWidths {
    /// Name, Company and Role columns
    pub name: f64,
    pub slot: f64,
    pub total: f64,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            name: 20.0,
            slot: 3.0,
            total: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DescriptionStyle {
    pub font_size: f64,
    pub row_height: f64,
}

impl Default for DescriptionStyle {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            row_height: 42.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegendStyle {
    /// Fill colour as `RRGGBB`, with or without a leading `#`
    pub fill: String,
    /// Number of columns the key block spans (location is merged up to it)
    pub width: u16,
}

impl Default for LegendStyle {
    fn default() -> Self {
        Self {
            fill: "EFEFEF".to_string(),
            width: 12,
        }
    }
}

impl LegendStyle {
    /// Fill colour as a packed RGB value
    pub fn fill_rgb(&self) -> Result<u32, ConfigurationError> {
        let hex = self.fill.trim_start_matches('#');
        if hex.len() != 6 {
            return Err(invalid(format!("legend fill '{}' is not RRGGBB", self.fill)));
        }
        u32::from_str_radix(hex, 16)
            .map_err(|_| invalid(format!("legend fill '{}' is not RRGGBB", self.fill)))
    }
}

fn invalid(message: String) -> ConfigurationError {
    ConfigurationError::InvalidAsset {
        name: SHEET_STYLE_ASSET.to_string(),
        message,
    }
}

impl SheetStyle {
    /// Parse and validate the asset text; empty text is a configuration error
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        if text.trim().is_empty() {
            return Err(ConfigurationError::EmptyAsset(SHEET_STYLE_ASSET.to_string()));
        }
        let style: SheetStyle = toml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        style.validate()?;
        Ok(style)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.legend.fill_rgb()?;
        // Meal, Abbreviation and at least one Location column
        if self.legend.width < 3 {
            return Err(invalid(format!(
                "legend width {} is narrower than 3 columns",
                self.legend.width
            )));
        }
        let widths = [
            self.columns.name,
            self.columns.slot,
            self.columns.total,
            self.description.font_size,
            self.description.row_height,
        ];
        if widths.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(invalid("widths, font size and row height must be positive".into()));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(invalid("sheet_name is empty".into()));
        }
        Ok(())
    }
}
