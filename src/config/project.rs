//! Project configuration files.
//!
//! Loads `config.yml` from the project folder, then `config.{APP_ENV}.yml` on
//! top of it if `APP_ENV` is set. Missing files are skipped.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Settings read from the project configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub title: Option<String>,
    pub url_root: Option<String>,
    pub output: Option<String>,
    /// Template (layout) file, relative to the project folder
    pub template: Option<String>,
    /// Default view file, relative to the project folder
    pub views: Option<String>,
}

impl ProjectConfig {
    /// Parse a YAML document.
    pub fn from_yaml(source: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: ProjectConfig) -> Self {
        Self {
            title: other.title.or(self.title),
            url_root: other.url_root.or(self.url_root),
            output: other.output.or(self.output),
            template: other.template.or(self.template),
            views: other.views.or(self.views),
        }
    }
}

/// Load the project configuration for `folder`, honoring `APP_ENV`.
pub fn load_project_config(folder: &Path) -> Result<ProjectConfig, ConfigError> {
    let app_env = std::env::var("APP_ENV").ok();
    load_project_config_for(folder, app_env.as_deref())
}

/// Load `config.yml`, then `config.{env}.yml` when `env` is given.
pub fn load_project_config_for(
    folder: &Path,
    env: Option<&str>,
) -> Result<ProjectConfig, ConfigError> {
    let mut config = load_config_file(folder, "config.yml")?.unwrap_or_default();

    if let Some(env) = env {
        if let Some(overlay) = load_config_file(folder, &format!("config.{}.yml", env))? {
            config = config.merge(overlay);
        }
    }

    Ok(config)
}

fn load_config_file(folder: &Path, filename: &str) -> Result<Option<ProjectConfig>, ConfigError> {
    let path = folder.join(filename);
    if !path.exists() {
        return Ok(None);
    }

    let source = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;

    ProjectConfig::from_yaml(&source, &path).map(Some)
}
