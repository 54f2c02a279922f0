//! Template and style assets
//!
//! All three files are mandatory. They are read once and shared read-only
//! by every render.

use mealgrid_core::ConfigurationError;
use mealgrid_render::{HtmlAssets, SheetStyle, HTML_CSS_ASSET, HTML_TEMPLATE_ASSET, SHEET_STYLE_ASSET};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Assets {
    pub html: HtmlAssets,
    pub style: SheetStyle,
}

impl Assets {
    pub fn load(dir: &Path) -> Result<Self, ConfigurationError> {
        let template = read_asset(dir, HTML_TEMPLATE_ASSET)?;
        let css = read_asset(dir, HTML_CSS_ASSET)?;
        let style = read_asset(dir, SHEET_STYLE_ASSET)?;

        let assets = Self {
            html: HtmlAssets::new(&template, &css)?,
            style: SheetStyle::from_toml_str(&style)?,
        };
        debug!(dir = %dir.display(), "loaded assets");
        Ok(assets)
    }
}

fn read_asset(dir: &Path, name: &str) -> Result<String, ConfigurationError> {
    let path = dir.join(name);
    std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigurationError::MissingAsset(path.display().to_string()),
        _ => ConfigurationError::InvalidAsset {
            name: name.to_string(),
            message: e.to_string(),
        },
    })
}
