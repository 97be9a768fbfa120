//! Import of Keras architecture documents.
//!
//! Keras serialises a model's topology as JSON (`model.to_json()`, the
//! `model_config` attribute of HDF5 files, `config.json` inside `.keras`
//! archives). Only the topology is read: layer names, classes and inbound
//! connections. Weights and layer hyper-parameters are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::UnsupportedModelError;
use crate::model::{LayerCategory, LayerInfo, ModelDescription};

static CATEGORY_PATTERNS: Lazy<Vec<(Regex, LayerCategory)>> = Lazy::new(|| {
    [
        (r"^InputLayer$", LayerCategory::Input),
        (r"^(Sequential|Functional|Model)$", LayerCategory::Model),
        (r"^(Bidirectional|ConvLSTM\dD|LSTM|GRU|SimpleRNN|RNN)(Cell)?$", LayerCategory::Recurrent),
        (r"^(Separable|Depthwise)?Conv(olution)?\d?D(Transpose)?$", LayerCategory::Convolution),
        (r"Pooling\dD$", LayerCategory::Pooling),
        (r"^(ZeroPadding|Cropping)\dD$", LayerCategory::Padding),
        (r"^(Spatial|Gaussian|Alpha)?Dropout(\dD)?$", LayerCategory::Dropout),
        (r"^(Dense|EinsumDense)$", LayerCategory::Dense),
        (r"^(Concatenate|Add|Subtract|Multiply|Average|Maximum|Minimum|Dot)$", LayerCategory::Merge),
        (r"Normalization$", LayerCategory::Normalization),
        (r"^(Activation|ReLU|LeakyReLU|PReLU|ELU|Softmax|ThresholdedReLU)$", LayerCategory::Activation),
        (r"^(Reshape|Flatten|RepeatVector|Permute|UpSampling\dD)$", LayerCategory::Reshape),
        (r"^Embedding$", LayerCategory::Embedding),
        (r"Attention$", LayerCategory::Attention),
    ]
    .into_iter()
    .filter_map(|(pattern, category)| Regex::new(pattern).ok().map(|re| (re, category)))
    .collect()
});

/// Maps a Keras layer class name to a layer category
pub fn category_for_class(class_name: &str) -> LayerCategory {
    CATEGORY_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(class_name))
        .map(|(_, category)| *category)
        .unwrap_or(LayerCategory::Other)
}

/// True when the document looks like a serialised Keras model
pub fn is_keras_document(value: &Value) -> bool {
    let root = model_root(value);
    root.get("class_name").and_then(Value::as_str).is_some() && root.get("config").is_some()
}

/// Name recorded in a Keras architecture document, if any
pub fn model_name(value: &Value) -> Option<String> {
    let config = model_root(value).get("config")?;
    config.get("name").and_then(Value::as_str).map(str::to_string)
}

/// Reads the topology of a Keras architecture document
pub fn parse_architecture(value: &Value) -> Result<ModelDescription, UnsupportedModelError> {
    let root = model_root(value);
    let class_name = root
        .get("class_name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let config = root.get("config").ok_or_else(|| {
        UnsupportedModelError::MissingLayerGraph("Keras document has no 'config'".to_string())
    })?;

    let layer_entries = match config {
        Value::Array(entries) => entries,
        _ => match config.get("layers") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(UnsupportedModelError::MissingLayerGraph(format!(
                    "Keras '{}' config has no layer list",
                    class_name
                )))
            }
        },
    };

    let layers = if class_name == "Sequential" {
        sequential_layers(layer_entries)?
    } else {
        functional_layers(layer_entries)?
    };

    debug!(
        "Read {} layers from Keras {} architecture",
        layers.len(),
        if class_name.is_empty() { "model" } else { class_name }
    );

    Ok(ModelDescription {
        name: model_name(value),
        layers,
    })
}

fn model_root(value: &Value) -> &Value {
    value.get("model_config").unwrap_or(value)
}

fn layer_header(entry: &Value, position: usize) -> Result<(String, String), UnsupportedModelError> {
    let class_name = entry
        .get("class_name")
        .and_then(Value::as_str)
        .unwrap_or("Layer")
        .to_string();
    let name = entry
        .get("name")
        .or_else(|| entry.get("config").and_then(|c| c.get("name")))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if name.is_empty() {
        return Err(UnsupportedModelError::UnnamedLayer(position));
    }

    Ok((name, class_name))
}

/// Builds one layer from a `config.layers` entry, without its inputs
fn layer_from_entry(entry: &Value, position: usize) -> Result<LayerInfo, UnsupportedModelError> {
    let (name, class_name) = layer_header(entry, position)?;
    let config = entry.get("config");
    let mut layer = LayerInfo::new(&name, category_for_class(&class_name));

    // wrappers such as TimeDistributed keep the wrapped layer under `config.layer`
    let wrapped = config
        .and_then(|c| c.get("layer"))
        .filter(|inner| inner.get("class_name").and_then(Value::as_str).is_some());

    match wrapped {
        Some(inner) => {
            let inner_class = inner
                .get("class_name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            layer = layer.with_class_name(&format!("{}({})", class_name, inner_class));
            layer.submodel = nested_model(inner)?;
        }
        None => {
            layer = layer.with_class_name(&class_name);
            if layer.category == LayerCategory::Model {
                layer.submodel = nested_model(entry)?;
            }
        }
    }

    let declared_shape = config
        .and_then(|c| c.get("batch_input_shape").or_else(|| c.get("batch_shape")))
        .and_then(format_shape);
    if let Some(shape) = declared_shape {
        if layer.category == LayerCategory::Input {
            layer.output_shape = Some(shape.clone());
        }
        layer.input_shape = Some(shape);
    }

    Ok(layer)
}

/// The inner model of a nested model or wrapper entry, if it carries layers
fn nested_model(entry: &Value) -> Result<Option<Box<ModelDescription>>, UnsupportedModelError> {
    let class_name = entry
        .get("class_name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if category_for_class(class_name) != LayerCategory::Model {
        return Ok(None);
    }

    let has_layers = match entry.get("config") {
        Some(Value::Array(_)) => true,
        Some(config) => matches!(config.get("layers"), Some(Value::Array(_))),
        None => false,
    };
    if !has_layers {
        debug!("Nested {} has no layer list, drawing it as one node", class_name);
        return Ok(None);
    }

    parse_architecture(entry).map(|model| Some(Box::new(model)))
}

fn sequential_layers(entries: &[Value]) -> Result<Vec<LayerInfo>, UnsupportedModelError> {
    let mut layers: Vec<LayerInfo> = Vec::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        let mut layer = layer_from_entry(entry, position)?;
        if let Some(previous) = layers.last() {
            layer.inputs.push(previous.name.clone());
        }
        layers.push(layer);
    }

    Ok(layers)
}

fn functional_layers(entries: &[Value]) -> Result<Vec<LayerInfo>, UnsupportedModelError> {
    let mut layers = Vec::with_capacity(entries.len());
    let mut produced_shapes: HashMap<String, String> = HashMap::new();

    for (position, entry) in entries.iter().enumerate() {
        let mut layer = layer_from_entry(entry, position)?;

        let mut inbound = Vec::new();
        if let Some(nodes) = entry.get("inbound_nodes") {
            collect_inbound(nodes, &mut inbound);
        }

        let shapes: Vec<&str> = inbound.iter().filter_map(|r| r.shape.as_deref()).collect();
        if !shapes.is_empty() && shapes.len() == inbound.len() {
            layer.input_shape = Some(shapes.join(", "));
        }
        for reference in &inbound {
            if let Some(shape) = &reference.shape {
                produced_shapes
                    .entry(reference.layer.clone())
                    .or_insert_with(|| shape.clone());
            }
        }

        layer.inputs = inbound.into_iter().map(|r| r.layer).collect();
        layers.push(layer);
    }

    for layer in &mut layers {
        if layer.output_shape.is_none() {
            layer.output_shape = produced_shapes.get(&layer.name).cloned();
        }
    }

    Ok(layers)
}

/// A tensor flowing into a layer: the producing layer and, in Keras 3
/// documents, the tensor's shape
struct InboundRef {
    layer: String,
    shape: Option<String>,
}

/// Collects producer references from `inbound_nodes`.
///
/// Keras 2 stores each reference as `[layer_name, node_index, tensor_index, kwargs]`,
/// where `kwargs` may hold further references for tensor keyword arguments.
/// Keras 3 stores tensors carrying `keras_history: [layer_name, node_index, tensor_index]`.
fn collect_inbound(value: &Value, refs: &mut Vec<InboundRef>) {
    match value {
        Value::Array(items) => {
            if let Some(name) = history_reference(items) {
                refs.push(InboundRef {
                    layer: name.to_string(),
                    shape: None,
                });
                if let Some(kwargs) = items.get(3) {
                    collect_inbound(kwargs, refs);
                }
                return;
            }
            for item in items {
                collect_inbound(item, refs);
            }
        }
        Value::Object(map) => {
            if let Some(Value::Array(history)) = map.get("keras_history") {
                if let Some(name) = history.first().and_then(Value::as_str) {
                    refs.push(InboundRef {
                        layer: name.to_string(),
                        shape: map.get("shape").and_then(format_shape),
                    });
                }
                return;
            }
            for item in map.values() {
                collect_inbound(item, refs);
            }
        }
        _ => {}
    }
}

fn history_reference(items: &[Value]) -> Option<&str> {
    match items {
        [Value::String(name), Value::Number(_), Value::Number(_), ..] => Some(name.as_str()),
        _ => None,
    }
}

/// Formats a shape list the way Keras prints it: `[null, 32]` -> `(None, 32)`
fn format_shape(value: &Value) -> Option<String> {
    let dims = value
        .as_array()?
        .iter()
        .map(|dim| match dim {
            Value::Null => Some("None".to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect::<Option<Vec<String>>>()?;

    Some(match dims.as_slice() {
        [single] => format!("({},)", single),
        _ => format!("({})", dims.join(", ")),
    })
}
