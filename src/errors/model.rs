//! Errors raised while reading a model's layer graph

use thiserror::Error;

/// The supplied model does not expose a usable layer graph
#[derive(Error, Debug)]
pub enum UnsupportedModelError {
    /// The object has no layer collection to introspect
    #[error("Model does not expose a layer graph: {0}")]
    MissingLayerGraph(String),

    /// The layer collection is empty
    #[error("Model contains no layers")]
    EmptyModel,

    /// A layer at the given position has no name
    #[error("Layer at position {0} has an empty name")]
    UnnamedLayer(usize),

    /// Two layers share a name
    #[error("Layer name '{0}' is used more than once")]
    DuplicateLayer(String),

    /// An input refers to a layer that is not part of the model
    #[error("Layer '{layer}' declares unknown input '{input}'")]
    UnknownInput {
        /// Consuming layer
        layer: String,
        /// Referenced input that could not be resolved
        input: String,
    },

    /// A model document could not be read
    #[error("Failed to read model '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A model document could not be parsed
    #[error("Failed to parse model: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for UnsupportedModelError {
    fn from(err: serde_json::Error) -> Self {
        UnsupportedModelError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for UnsupportedModelError {
    fn from(err: serde_yaml::Error) -> Self {
        UnsupportedModelError::Parse(err.to_string())
    }
}
