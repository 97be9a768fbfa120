//! Style rules: how each layer category is drawn.
//!
//! Colours are stored as Graphviz colours: `#rrggbb`, `#rrggbbaa` or a named
//! colour such as `grey`. Bare hex values (`f7d7a8`) are accepted and
//! normalised with a leading `#` by [`StyleRules::validated`], which runs for
//! rules loaded from files and for rules handed to a `Renderer`.
//!
//! A rule keyed by framework class name (`AveragePooling2D`) takes precedence
//! over the rule for the layer's category.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::config::{load_document, ConfigFormat};
use crate::errors::ConfigError;
use crate::model::LayerCategory;

static BUILTIN_RULES: Lazy<StyleRules> = Lazy::new(StyleRules::default_palette);

static BARE_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{6}([0-9a-fA-F]{2})?$").expect("valid regex"));
static HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}([0-9a-fA-F]{2})?$").expect("valid regex"));
static NAMED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]+[0-9]*$").expect("valid regex"));

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Bold,
}

/// Visual attributes of one node
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct NodeStyle {
    /// Graphviz node shape, e.g. `box`, `ellipse`, `octagon`
    pub shape: String,
    pub fill_color: String,
    /// Falls back to the fill colour
    pub border_color: Option<String>,
    pub font_color: String,
    pub rounded: bool,
    pub border_style: BorderStyle,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            shape: "box".to_string(),
            fill_color: "grey".to_string(),
            border_color: None,
            font_color: "white".to_string(),
            rounded: true,
            border_style: BorderStyle::Solid,
        }
    }
}

impl NodeStyle {
    pub fn filled(fill_color: &str) -> Self {
        Self {
            fill_color: fill_color.to_string(),
            ..Self::default()
        }
    }

    pub fn with_shape(mut self, shape: &str) -> Self {
        self.shape = shape.to_string();
        self
    }

    pub fn with_font_color(mut self, font_color: &str) -> Self {
        self.font_color = font_color.to_string();
        self
    }

    pub fn with_border(mut self, border_color: &str, border_style: BorderStyle) -> Self {
        self.border_color = Some(border_color.to_string());
        self.border_style = border_style;
        self
    }

    pub fn border_color(&self) -> &str {
        self.border_color.as_deref().unwrap_or(&self.fill_color)
    }

    /// Value of the Graphviz `style` attribute
    pub fn dot_style(&self) -> String {
        let mut parts = vec!["filled"];
        if self.rounded {
            parts.push("rounded");
        }
        match self.border_style {
            BorderStyle::Solid => {}
            BorderStyle::Dashed => parts.push("dashed"),
            BorderStyle::Dotted => parts.push("dotted"),
            BorderStyle::Bold => parts.push("bold"),
        }
        parts.join(",")
    }

    fn normalised(mut self, field: &str) -> Result<Self, ConfigError> {
        self.fill_color = normalise_colour(&format!("{field}.fill_color"), &self.fill_color)?;
        self.font_color = normalise_colour(&format!("{field}.font_color"), &self.font_color)?;
        self.border_color = self
            .border_color
            .map(|c| normalise_colour(&format!("{field}.border_color"), &c))
            .transpose()?;
        Ok(self)
    }
}

fn normalise_colour(field: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if BARE_HEX.is_match(trimmed) {
        return Ok(format!("#{}", trimmed.to_lowercase()));
    }
    if HEX.is_match(trimmed) {
        return Ok(trimmed.to_lowercase());
    }
    if NAMED.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }
    Err(ConfigError::InvalidColour {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Mapping from layer category to node style.
///
/// Categories without an entry resolve to `default`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct StyleRules {
    pub default: NodeStyle,
    pub rules: IndexMap<LayerCategory, NodeStyle>,
    /// Per-class overrides, keyed by framework class name
    pub classes: IndexMap<String, NodeStyle>,
    pub edge_color: String,
}

impl Default for StyleRules {
    fn default() -> Self {
        Self {
            default: NodeStyle::default(),
            rules: IndexMap::new(),
            classes: IndexMap::new(),
            edge_color: "grey".to_string(),
        }
    }
}

impl StyleRules {
    /// The built-in rules, initialised once per process
    pub fn builtin() -> &'static StyleRules {
        &BUILTIN_RULES
    }

    /// Rules with no category entries: every node gets the default style
    pub fn empty() -> Self {
        Self::default()
    }

    fn default_palette() -> Self {
        let rules: IndexMap<LayerCategory, NodeStyle> = [
            (LayerCategory::Input, "grey"),
            (LayerCategory::Reshape, "#f5a286"),
            (LayerCategory::Convolution, "#f7d7a8"),
            (LayerCategory::Pooling, "#aadfa2"),
            (LayerCategory::Padding, "grey"),
            (LayerCategory::Dropout, "#9896c8"),
            (LayerCategory::Dense, "#c66aa7"),
            (LayerCategory::Merge, "#f5a286"),
            (LayerCategory::Model, "#292d30"),
            (LayerCategory::Normalization, "#add8e6"),
            (LayerCategory::Recurrent, "#a8cfe7"),
            (LayerCategory::Activation, "#9896c8"),
        ]
        .into_iter()
        .map(|(category, colour)| (category, NodeStyle::filled(colour)))
        .collect();

        // classes whose colour differs from their category's
        let classes: IndexMap<String, NodeStyle> = [
            ("Flatten", "#d44ddb"),
            ("AveragePooling2D", "#a8cfe7"),
            ("GlobalAveragePooling2D", "#a8cfe7"),
            ("ReLU", "#c66aa7"),
            ("Add", "grey"),
            ("Multiply", "grey"),
            ("RepeatVector", "grey"),
            ("GRU", "#ff6961"),
        ]
        .into_iter()
        .map(|(class_name, colour)| (class_name.to_string(), NodeStyle::filled(colour)))
        .collect();

        Self {
            rules,
            classes,
            ..Self::default()
        }
    }

    pub fn with_class_rule(mut self, class_name: &str, style: NodeStyle) -> Self {
        self.classes.insert(class_name.to_string(), style);
        self
    }

    pub fn class_rule(&self, class_name: &str) -> Option<&NodeStyle> {
        self.classes.get(class_name)
    }

    /// Style for a layer: its class rule, else its category rule, else the default
    pub fn resolve_layer(&self, category: &LayerCategory, class_name: Option<&str>) -> &NodeStyle {
        class_name
            .and_then(|name| self.class_rule(name))
            .unwrap_or_else(|| self.resolve(category))
    }

    pub fn with_rule(mut self, category: LayerCategory, style: NodeStyle) -> Self {
        self.rules.insert(category, style);
        self
    }

    pub fn with_default(mut self, style: NodeStyle) -> Self {
        self.default = style;
        self
    }

    /// Style for a category, or the default style when no rule exists
    pub fn resolve(&self, category: &LayerCategory) -> &NodeStyle {
        match self.rules.get(category) {
            Some(style) => style,
            None => {
                debug!("No style rule for category '{}', using default", category);
                &self.default
            }
        }
    }

    pub fn has_rule(&self, category: &LayerCategory) -> bool {
        self.rules.contains_key(category)
    }

    /// Layers `overrides` on top of these rules.
    ///
    /// Category entries in `overrides` replace existing ones; the default
    /// style and edge colour are taken from `overrides`.
    pub fn merged_with(&self, overrides: &StyleRules) -> StyleRules {
        let mut merged = self.clone();
        for (category, style) in &overrides.rules {
            merged.rules.insert(*category, style.clone());
        }
        for (class_name, style) in &overrides.classes {
            merged.classes.insert(class_name.clone(), style.clone());
        }
        merged.default = overrides.default.clone();
        merged.edge_color = overrides.edge_color.clone();
        merged
    }

    /// Normalises and checks every colour
    pub fn validated(self) -> Result<Self, ConfigError> {
        let default = self.default.normalised("default")?;
        let rules = self
            .rules
            .into_iter()
            .map(|(category, style)| {
                let field = format!("rules.{}", category);
                style.normalised(&field).map(|s| (category, s))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;
        let classes = self
            .classes
            .into_iter()
            .map(|(class_name, style)| {
                let field = format!("classes.{}", class_name);
                style.normalised(&field).map(|s| (class_name, s))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;
        let edge_color = normalise_colour("edge_color", &self.edge_color)?;

        Ok(Self {
            default,
            rules,
            classes,
            edge_color,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let rules: StyleRules = serde_yaml::from_str(content)?;
        rules.validated()
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let rules: StyleRules = serde_json::from_str(content)?;
        rules.validated()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let rules: StyleRules = toml::from_str(content)?;
        rules.validated()
    }

    /// Loads rules from a YAML, JSON or TOML file, chosen by extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let rules: StyleRules = load_document(path, format)?;
        rules.validated()
    }
}
