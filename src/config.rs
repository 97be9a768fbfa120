//! ## Structure
//! A render profile bundles layout options and style overrides.
//!
//! ```text
//! RenderProfile
//!   ├── options: Option<RenderOptionsConfig>
//!   │   ├── title: Option<String>
//!   │   ├── orientation: Option<Orientation>   (TB | LR)
//!   │   ├── rank_separation / node_separation: Option<f64>
//!   │   ├── font_name / font_size / title_font_size
//!   │   ├── node_width / node_height: Option<f64>
//!   │   ├── dpi: Option<u32>
//!   │   ├── show_class_names: Option<bool>
//!   │   ├── show_shapes: Option<bool>
//!   │   ├── expand_nested: Option<bool>    (nested models as clusters)
//!   │   └── concentrate: Option<bool>
//!   └── styles: Option<StyleRules>
//!       ├── default: NodeStyle
//!       ├── rules: category -> NodeStyle
//!       ├── classes: class name -> NodeStyle
//!       └── edge_color: String
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ConfigError;
use crate::style::StyleRules;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    TB,
    LR,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::TB => "TB",
            Orientation::LR => "LR",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RenderOptionsConfig {
    pub title: Option<String>,
    pub orientation: Option<Orientation>,
    pub rank_separation: Option<f64>,
    pub node_separation: Option<f64>,
    pub font_name: Option<String>,
    pub font_size: Option<u32>,
    pub title_font_size: Option<u32>,
    pub node_width: Option<f64>,
    pub node_height: Option<f64>,
    pub dpi: Option<u32>,
    pub show_class_names: Option<bool>,
    pub show_shapes: Option<bool>,
    pub expand_nested: Option<bool>,
    pub concentrate: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub title: Option<String>,
    pub orientation: Orientation,
    pub rank_separation: f64,
    pub node_separation: f64,
    pub font_name: String,
    pub font_size: u32,
    pub title_font_size: u32,
    pub node_width: f64,
    pub node_height: f64,
    pub dpi: u32,
    pub show_class_names: bool,
    pub show_shapes: bool,
    pub expand_nested: bool,
    pub concentrate: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptionsConfig::default().resolve()
    }
}

impl RenderOptions {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

impl RenderOptionsConfig {
    pub fn resolve(&self) -> RenderOptions {
        RenderOptions {
            title: self.title.clone().filter(|t| !t.trim().is_empty()),
            orientation: self.orientation.unwrap_or_default(),
            rank_separation: self.rank_separation.unwrap_or(0.4),
            node_separation: self.node_separation.unwrap_or(0.25),
            font_name: self
                .font_name
                .clone()
                .unwrap_or_else(|| "Roboto Light".to_string()),
            font_size: self.font_size.unwrap_or(12),
            title_font_size: self.title_font_size.unwrap_or(16),
            node_width: self.node_width.unwrap_or(1.4),
            node_height: self.node_height.unwrap_or(0.5),
            dpi: self.dpi.unwrap_or(96),
            show_class_names: self.show_class_names.unwrap_or(false),
            show_shapes: self.show_shapes.unwrap_or(false),
            expand_nested: self.expand_nested.unwrap_or(false),
            concentrate: self.concentrate.unwrap_or(true),
        }
    }
}

/// Layout options plus style overrides, loadable from one file
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RenderProfile {
    pub options: Option<RenderOptionsConfig>,
    pub styles: Option<StyleRules>,
}

impl RenderProfile {
    pub fn get_render_options(&self) -> RenderOptions {
        self.options.clone().unwrap_or_default().resolve()
    }

    /// Profile styles layered over the built-in rules
    pub fn get_style_rules(&self) -> Result<StyleRules, ConfigError> {
        match &self.styles {
            Some(overrides) => {
                let overrides = overrides.clone().validated()?;
                Ok(StyleRules::builtin().merged_with(&overrides))
            }
            None => Ok(StyleRules::builtin().clone()),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        load_document(path, ConfigFormat::from_path(path)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub(crate) fn load_document<T: DeserializeOwned>(
    path: &Path,
    format: ConfigFormat,
) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let document = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
        ConfigFormat::Json => serde_json::from_str(&content)?,
        ConfigFormat::Toml => toml::from_str(&content)?,
    };
    Ok(document)
}
