//! Errors raised while laying out and writing a diagram

use std::path::PathBuf;
use thiserror::Error;

/// The rendering backend could not produce the output file
#[derive(Error, Debug)]
pub enum RenderBackendError {
    /// The output path has no extension or one no backend understands
    #[error("Unsupported output format: '{0}'")]
    UnsupportedFormat(String),

    /// The layer graph is not acyclic and cannot be laid out hierarchically
    #[error("Cycle detected in layer graph through: {}", .0.join(", "))]
    CyclicGraph(Vec<String>),

    /// The diagram template failed to render
    #[error("Template rendering failed: {0}")]
    Template(String),

    /// Writing the output failed
    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The Graphviz executable could not be started
    #[error(
        "Graphviz executable '{}' is not available, install Graphviz and make sure it is on PATH",
        executable.display()
    )]
    GraphvizUnavailable { executable: PathBuf },

    /// Graphviz ran but rejected the graph or failed to write the file
    #[error("Graphviz exited with {status}: {stderr}")]
    GraphvizFailed { status: String, stderr: String },
}

impl RenderBackendError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderBackendError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<handlebars::RenderError> for RenderBackendError {
    fn from(err: handlebars::RenderError) -> Self {
        RenderBackendError::Template(err.to_string())
    }
}
