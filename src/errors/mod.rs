//! Error types for netvis
//!
//! Rendering surfaces two kinds of failure to the caller:
//!
//! - **UnsupportedModelError**: the supplied model does not expose a readable,
//!   well-formed layer graph
//! - **RenderBackendError**: the output could not be produced (format, layout,
//!   template, I/O or Graphviz failure)
//!
//! Loading style rules, render options or profiles from files reports
//! **ConfigError**. [`NetvisError`] wraps all three so `?` works across the
//! crate.
//!
//! # Examples
//!
//! ```rust
//! use netvis::errors::{NetvisError, UnsupportedModelError};
//!
//! let err: NetvisError = UnsupportedModelError::EmptyModel.into();
//! assert!(err.is_model_error());
//! ```

pub mod config;
pub mod model;
pub mod render;

pub use config::ConfigError;
pub use model::UnsupportedModelError;
pub use render::RenderBackendError;

use thiserror::Error;

/// Crate-level error
#[derive(Error, Debug)]
pub enum NetvisError {
    #[error(transparent)]
    UnsupportedModel(#[from] UnsupportedModelError),

    #[error(transparent)]
    RenderBackend(#[from] RenderBackendError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl NetvisError {
    /// The input model was rejected
    pub fn is_model_error(&self) -> bool {
        matches!(self, NetvisError::UnsupportedModel(_))
    }

    /// Layout, serialisation or output failed
    pub fn is_backend_error(&self) -> bool {
        matches!(self, NetvisError::RenderBackend(_))
    }
}

/// Result type alias for the crate
pub type NetvisResult<T> = Result<T, NetvisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err: NetvisError = RenderBackendError::UnsupportedFormat("bmp".to_string()).into();
        assert!(err.is_backend_error());
        assert!(!err.is_model_error());
        assert_eq!(err.to_string(), "Unsupported output format: 'bmp'");
    }

    #[test]
    fn model_errors_are_classified() {
        let err: NetvisError = UnsupportedModelError::DuplicateLayer("conv1".to_string()).into();
        assert!(err.is_model_error());
        assert!(err.to_string().contains("conv1"));
    }
}
