//! Editor configuration loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock canvas and sub-view box.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas: CanvasConfig,
    pub sub_view: SubViewConfig,
}

/// Size of the drawing surface. Sizes below the minimums are raised to them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            min_width: 300.0,
            min_height: 420.0,
        }
    }
}

impl CanvasConfig {
    /// Effective canvas size after applying the minimums.
    pub fn bounds(&self) -> (f64, f64) {
        (
            self.width.max(self.min_width),
            self.height.max(self.min_height),
        )
    }
}

/// Box drawn around the interior of an entered group.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SubViewConfig {
    pub x: f64,
    pub y: f64,
    pub padding: f64,
}

impl Default for SubViewConfig {
    fn default() -> Self {
        Self {
            x: 40.0,
            y: 40.0,
            padding: 16.0,
        }
    }
}

impl EditorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config {}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let cfg = EditorConfig::from_toml("").unwrap();
        assert_eq!(cfg, EditorConfig::default());
        assert_eq!(cfg.canvas.bounds(), (800.0, 420.0));
    }

    #[test]
    fn test_partial_override() {
        let cfg = EditorConfig::from_toml(
            r#"
            [canvas]
            width = 1200.0
            height = 900.0

            [sub_view]
            padding = 24.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.canvas.bounds(), (1200.0, 900.0));
        assert_eq!(cfg.sub_view.padding, 24.0);
        assert_eq!(cfg.sub_view.x, 40.0);
    }

    #[test]
    fn test_unknown_file_is_an_error() {
        assert!(EditorConfig::load("/definitely/not/here.toml").is_err());
    }
}
