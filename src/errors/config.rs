//! Errors raised while loading style rules, render options and profiles

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file extension does not name a supported configuration format
    #[error("Unsupported configuration format for '{0}', expected yaml, yml, json or toml")]
    UnsupportedFormat(String),

    #[error("Invalid colour '{value}' for {field}")]
    InvalidColour { field: String, value: String },
}
