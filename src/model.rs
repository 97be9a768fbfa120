use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::errors::UnsupportedModelError;
use crate::keras;

/// The kind of computation a layer performs, used to pick its style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayerCategory {
    Input,
    Convolution,
    Pooling,
    Dense,
    Normalization,
    Activation,
    Dropout,
    Reshape,
    Merge,
    Recurrent,
    Padding,
    Embedding,
    Attention,
    /// A nested model used as a layer
    Model,
    Other,
}

impl LayerCategory {
    pub const ALL: [LayerCategory; 15] = [
        LayerCategory::Input,
        LayerCategory::Convolution,
        LayerCategory::Pooling,
        LayerCategory::Dense,
        LayerCategory::Normalization,
        LayerCategory::Activation,
        LayerCategory::Dropout,
        LayerCategory::Reshape,
        LayerCategory::Merge,
        LayerCategory::Recurrent,
        LayerCategory::Padding,
        LayerCategory::Embedding,
        LayerCategory::Attention,
        LayerCategory::Model,
        LayerCategory::Other,
    ];

    /// Parses a category name, accepting common aliases.
    ///
    /// Unrecognised names map to [`LayerCategory::Other`].
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "input" | "input_layer" | "inputlayer" => Self::Input,
            "convolution" | "conv" | "convolutional" => Self::Convolution,
            "pooling" | "pool" => Self::Pooling,
            "dense" | "linear" | "fully_connected" | "fc" => Self::Dense,
            "normalization" | "normalisation" | "norm" | "batch_norm" => Self::Normalization,
            "activation" | "act" => Self::Activation,
            "dropout" => Self::Dropout,
            "reshape" | "flatten" => Self::Reshape,
            "merge" | "concatenate" | "add" => Self::Merge,
            "recurrent" | "rnn" => Self::Recurrent,
            "padding" | "pad" => Self::Padding,
            "embedding" | "embed" => Self::Embedding,
            "attention" | "attn" => Self::Attention,
            "model" | "submodel" | "nested_model" => Self::Model,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Convolution => "convolution",
            Self::Pooling => "pooling",
            Self::Dense => "dense",
            Self::Normalization => "normalization",
            Self::Activation => "activation",
            Self::Dropout => "dropout",
            Self::Reshape => "reshape",
            Self::Merge => "merge",
            Self::Recurrent => "recurrent",
            Self::Padding => "padding",
            Self::Embedding => "embedding",
            Self::Attention => "attention",
            Self::Model => "model",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for LayerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for LayerCategory {
    fn from(value: String) -> Self {
        LayerCategory::from_str_loose(&value)
    }
}

impl From<LayerCategory> for String {
    fn from(value: LayerCategory) -> Self {
        value.as_str().to_string()
    }
}

/// A single layer as seen through model introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    /// Unique within its model
    pub name: String,
    pub category: LayerCategory,
    /// Framework class, e.g. `Conv2D`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Names of the layers feeding this one, in call order
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Shape of the tensors entering the layer, e.g. `(None, 32, 32, 3)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_shape: Option<String>,
    /// The model this layer runs, for nested models and wrappers around one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submodel: Option<Box<ModelDescription>>,
}

impl LayerInfo {
    pub fn new(name: &str, category: LayerCategory) -> Self {
        Self {
            name: name.to_string(),
            category,
            class_name: None,
            inputs: Vec::new(),
            input_shape: None,
            output_shape: None,
            submodel: None,
        }
    }

    pub fn with_class_name(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_shapes(mut self, input_shape: Option<&str>, output_shape: Option<&str>) -> Self {
        self.input_shape = input_shape.map(str::to_string);
        self.output_shape = output_shape.map(str::to_string);
        self
    }

    pub fn with_submodel(mut self, submodel: ModelDescription) -> Self {
        self.submodel = Some(Box::new(submodel));
        self
    }

    /// True when the layer carries a model with at least one layer
    pub fn has_submodel(&self) -> bool {
        self.submodel
            .as_ref()
            .is_some_and(|submodel| !submodel.layers.is_empty())
    }

    /// Layers without declared inputs are graph sources
    pub fn is_source(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Read-only access to a model's layer graph.
///
/// This is the only capability the renderer needs from a host framework:
/// list the layers in order, and for each layer its category and inputs.
pub trait ModelIntrospection {
    fn model_name(&self) -> Option<String> {
        None
    }

    /// Returns the layers in model order.
    ///
    /// Implementors that cannot expose a layer graph return
    /// [`UnsupportedModelError::MissingLayerGraph`].
    fn layers(&self) -> Result<Vec<LayerInfo>, UnsupportedModelError>;
}

/// A framework-independent model description.
///
/// Can be built in code, deserialised from YAML or JSON, or imported from a
/// Keras architecture document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub layers: Vec<LayerInfo>,
}

impl ModelDescription {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            layers: Vec::new(),
        }
    }

    pub fn layer(mut self, layer: LayerInfo) -> Self {
        self.layers.push(layer);
        self
    }

    /// Builds a description from an untyped document.
    ///
    /// Keras architecture documents (`class_name` + `config`, or a
    /// `model_config` wrapper) are imported through [`keras`]; anything else
    /// must carry a `layers` list.
    pub fn from_value(value: Value) -> Result<Self, UnsupportedModelError> {
        if keras::is_keras_document(&value) {
            debug!("Reading model as Keras architecture");
            return keras::parse_architecture(&value);
        }

        match value.get("layers") {
            Some(Value::Array(_)) => Ok(serde_json::from_value(value)?),
            Some(_) => Err(UnsupportedModelError::MissingLayerGraph(
                "'layers' is not a list".to_string(),
            )),
            None => Err(UnsupportedModelError::MissingLayerGraph(
                "document has no 'layers' entry".to_string(),
            )),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, UnsupportedModelError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, UnsupportedModelError> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(value)
    }

    /// Loads a description from a `.json`, `.yaml` or `.yml` file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, UnsupportedModelError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| UnsupportedModelError::Read {
                path: path.display().to_string(),
                source,
            })?;

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }
}

impl ModelIntrospection for ModelDescription {
    fn model_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn layers(&self) -> Result<Vec<LayerInfo>, UnsupportedModelError> {
        Ok(self.layers.clone())
    }
}

impl ModelIntrospection for Value {
    fn model_name(&self) -> Option<String> {
        if keras::is_keras_document(self) {
            return keras::model_name(self);
        }
        self.get("name").and_then(Value::as_str).map(str::to_string)
    }

    fn layers(&self) -> Result<Vec<LayerInfo>, UnsupportedModelError> {
        ModelDescription::from_value(self.clone()).map(|description| description.layers)
    }
}

impl<M: ModelIntrospection + ?Sized> ModelIntrospection for &M {
    fn model_name(&self) -> Option<String> {
        (**self).model_name()
    }

    fn layers(&self) -> Result<Vec<LayerInfo>, UnsupportedModelError> {
        (**self).layers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_from_str() {
        assert_eq!(LayerCategory::from_str_loose("conv"), LayerCategory::Convolution);
        assert_eq!(LayerCategory::from_str_loose("Batch-Norm"), LayerCategory::Normalization);
        assert_eq!(LayerCategory::from_str_loose("FC"), LayerCategory::Dense);
        assert_eq!(LayerCategory::from_str_loose("squeeze"), LayerCategory::Other);
    }

    #[test]
    fn test_category_names_round_trip_through_loose_parsing() {
        for category in LayerCategory::ALL {
            assert_eq!(LayerCategory::from_str_loose(category.as_str()), category);
        }
    }

    #[test]
    fn test_description_from_yaml() {
        let yaml = r#"
name: tiny
layers:
  - name: input_1
    category: input
  - name: conv1
    category: convolution
    class_name: Conv2D
    inputs: [input_1]
  - name: fc
    category: dense
    inputs: [conv1]
"#;
        let model = ModelDescription::from_yaml_str(yaml).unwrap();
        assert_eq!(model.name.as_deref(), Some("tiny"));
        assert_eq!(model.layers.len(), 3);
        assert_eq!(model.layers[1].category, LayerCategory::Convolution);
        assert_eq!(model.layers[1].class_name.as_deref(), Some("Conv2D"));
        assert!(model.layers[0].is_source());
        assert_eq!(model.layers[2].inputs, vec!["conv1".to_string()]);
    }

    #[test]
    fn test_unknown_category_in_document_is_other() {
        let model = ModelDescription::from_value(json!({
            "layers": [{"name": "squeeze", "category": "squeeze_excite"}]
        }))
        .unwrap();
        assert_eq!(model.layers[0].category, LayerCategory::Other);
    }

    #[test]
    fn test_document_without_layers_is_unsupported() {
        let err = ModelDescription::from_value(json!({"name": "no graph"})).unwrap_err();
        assert!(matches!(err, UnsupportedModelError::MissingLayerGraph(_)));

        let err = ModelDescription::from_value(json!({"layers": 3})).unwrap_err();
        assert!(matches!(err, UnsupportedModelError::MissingLayerGraph(_)));
    }

    #[test]
    fn test_value_introspection() {
        let value = json!({
            "name": "from_value",
            "layers": [
                {"name": "a", "category": "input"},
                {"name": "b", "category": "dense", "inputs": ["a"]}
            ]
        });
        assert_eq!(value.model_name().as_deref(), Some("from_value"));
        assert_eq!(value.layers().unwrap().len(), 2);
    }

    #[test]
    fn test_builder() {
        let model = ModelDescription::new("built")
            .layer(LayerInfo::new("x", LayerCategory::Input))
            .layer(
                LayerInfo::new("y", LayerCategory::Dense)
                    .with_class_name("Dense")
                    .with_inputs(["x"]),
            );
        let layers = model.layers().unwrap();
        assert_eq!(layers[1].inputs, vec!["x".to_string()]);
        assert_eq!(model.model_name().as_deref(), Some("built"));
    }

    #[test]
    fn test_nested_description_from_yaml() {
        let yaml = r#"
name: outer
layers:
  - name: in
    category: input
    output_shape: "(None, 8)"
  - name: encoder
    category: model
    inputs: [in]
    submodel:
      name: encoder
      layers:
        - name: hidden
          category: dense
"#;
        let model = ModelDescription::from_yaml_str(yaml).unwrap();
        assert_eq!(model.layers[0].output_shape.as_deref(), Some("(None, 8)"));
        assert!(model.layers[1].has_submodel());
        assert!(!model.layers[0].has_submodel());
        let encoder = model.layers[1].submodel.as_ref().unwrap();
        assert_eq!(encoder.layers[0].name, "hidden");
    }
}
