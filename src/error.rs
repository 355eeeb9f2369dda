// src/error.rs

//! Unified error handling for the crawler application.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A collector could not produce its records
    #[error("Collection error for {collector}: {message}")]
    Collection { collector: String, message: String },

    /// History could not be loaded or persisted
    #[error("Storage error for {collector}: {message}")]
    Storage { collector: String, message: String },

    /// Template could not be parsed or rendered against a record
    #[error("Template error in '{template}': {message}")]
    Template { template: String, message: String },

    /// A notification channel failed to deliver a message
    #[error("Transport error on {channel}: {message}")]
    Transport { channel: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a collection error for a collector.
    pub fn collection(collector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Collection {
            collector: collector.into(),
            message: message.to_string(),
        }
    }

    /// Create a storage error for a collector's history.
    pub fn storage(collector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Storage {
            collector: collector.into(),
            message: message.to_string(),
        }
    }

    /// Create a template error.
    pub fn template(template: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Template {
            template: template.into(),
            message: message.to_string(),
        }
    }

    /// Create a transport error for a channel.
    pub fn transport(channel: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            channel: channel.into(),
            message: message.to_string(),
        }
    }
}
