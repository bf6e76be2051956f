//! Error types for every layer of a request.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while binding or running a controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Action '{action}' is not implemented by controller '{controller}'")]
    UnknownAction { controller: String, action: String },

    #[error("Verb method '{method}' is not implemented by controller '{controller}'")]
    UnknownVerbMethod { controller: String, method: String },

    #[error("{stage} failed: {message}")]
    Stage {
        stage: &'static str,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Returned by hooks and actions that load configuration with `?`.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Returned by hooks and actions that touch the filesystem with `?`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    pub fn stage(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Misconfiguration of the route/controller pairing, never a runtime condition.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownAction { .. } | Self::UnknownVerbMethod { .. }
        )
    }
}

/// Errors raised while loading project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Unknown output '{0}', expected one of: view, json, file")]
    InvalidOutput(String),
}

/// Errors raised by the view helper. These point at a bug in a template.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Cannot print {namespace} data without at least one key")]
    MissingKeys { namespace: &'static str },

    #[error("Cannot print {namespace} data at '{path}': value is a {type_name}, not a scalar")]
    NotScalar {
        namespace: &'static str,
        path: String,
        type_name: &'static str,
    },

    #[error("Template error in {path}: {message}")]
    Template { path: String, message: String },

    #[error("Import of {path} exceeds the nesting limit of {depth}")]
    ImportDepth { path: String, depth: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewError {
    pub fn template(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by output renderers.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Controller has not completed construction")]
    NotConstructed,

    #[error("File output requested but the controller provided no file contents")]
    NoFileContents,

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A unified error type for all layers.
#[derive(Debug, Error)]
pub enum MvcError {
    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}
