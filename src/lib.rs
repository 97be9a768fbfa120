//! Draws the layer graph of a neural network model as a diagram.
//!
//! A model is read through [`ModelIntrospection`], each layer is styled by
//! its [`LayerCategory`] using [`StyleRules`], and the result is written to a
//! single file whose format follows the output path's extension: DOT or
//! Mermaid text, or an image produced by Graphviz.
//!
//! ```no_run
//! use netvis::{render, LayerCategory, LayerInfo, ModelDescription};
//!
//! let model = ModelDescription::new("mlp")
//!     .layer(LayerInfo::new("input_1", LayerCategory::Input))
//!     .layer(LayerInfo::new("dense", LayerCategory::Dense).with_inputs(["input_1"]));
//! render(&model, "out/mlp.png", None)?;
//! # Ok::<(), netvis::NetvisError>(())
//! ```

pub mod backend;
pub mod common;
pub mod config;
pub mod errors;
pub mod export;
pub mod graph;
pub mod keras;
pub mod model;
pub mod render;
pub mod style;

pub use config::{Orientation, RenderOptions, RenderOptionsConfig, RenderProfile};
pub use errors::{
    ConfigError, NetvisError, NetvisResult, RenderBackendError, UnsupportedModelError,
};
pub use export::OutputFormat;
pub use graph::{Cluster, RenderedGraph};
pub use model::{LayerCategory, LayerInfo, ModelDescription, ModelIntrospection};
pub use render::{render, render_legend, RenderOutput, Renderer};
pub use style::{BorderStyle, NodeStyle, StyleRules};
