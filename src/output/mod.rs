//! Output renderers.
//!
//! The `output` parameter picks how a finished controller is rendered:
//! - `view` - the template file (or the view file) through a [`ViewHelper`]
//! - `json` - the result data as `{"controller": ..., "framework": ...}`
//! - `file` - the raw file contents set by the action

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::controller::{Controller, FileContents, LifecycleRunner};
use crate::error::{ConfigError, OutputError};
use crate::perf::Instrumentation;
use crate::view::{ViewHelper, VIEW_IMPORT};

/// Supported output targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    View,
    Json,
    File,
}

impl OutputKind {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(OutputKind::View),
            "json" => Ok(OutputKind::Json),
            "file" => Ok(OutputKind::File),
            _ => Err(ConfigError::InvalidOutput(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::View => "view",
            OutputKind::Json => "json",
            OutputKind::File => "file",
        }
    }

    /// `Content-Type` of the rendered body. File output uses the file's own type.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            OutputKind::View => Some("text/html; charset=utf-8"),
            OutputKind::Json => Some("application/json"),
            OutputKind::File => None,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Render a finished controller with the output named in its parameters.
pub fn render<C: Controller, I: Instrumentation>(
    runner: &LifecycleRunner<C, I>,
    out: &mut dyn Write,
) -> Result<OutputKind, OutputError> {
    let kind = OutputKind::from_name(&runner.context().output())?;
    render_as(kind, runner, out)?;
    Ok(kind)
}

/// Render a finished controller with an explicit output.
pub fn render_as<C: Controller, I: Instrumentation>(
    kind: OutputKind,
    runner: &LifecycleRunner<C, I>,
    out: &mut dyn Write,
) -> Result<(), OutputError> {
    let data = runner.result_data().ok_or(OutputError::NotConstructed)?;
    tracing::debug!(output = kind.as_str(), "rendering controller output");

    match kind {
        OutputKind::View => {
            let ctx = runner.context();
            let base_folder = ctx.base_folder();
            let helper = ViewHelper::new(data, &base_folder).with_view_file(ctx.view_path());
            match ctx.template_file() {
                Some(template) => {
                    let template = base_folder.join(template);
                    if template.is_file() {
                        helper.import_file(&template, out)?;
                    } else {
                        tracing::trace!(
                            path = %template.display(),
                            "template not found, nothing rendered"
                        );
                    }
                }
                None => {
                    helper.import(VIEW_IMPORT, out)?;
                }
            }
        }
        OutputKind::Json => {
            serde_json::to_writer(&mut *out, data)?;
        }
        OutputKind::File => {
            let file = runner.file_contents().ok_or(OutputError::NoFileContents)?;
            out.write_all(&file.bytes)?;
        }
    }

    Ok(())
}

/// MIME types guessed from the file extension when an action gives none.
pub const MIME_TYPES: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("gif", "image/gif"),
    ("html", "text/html"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("zip", "application/zip"),
];

/// Guess a MIME type from a file name.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    ext.and_then(|ext| {
        MIME_TYPES
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, mime)| *mime)
    })
    .unwrap_or("application/octet-stream")
}

/// Response headers for file output.
pub fn file_headers(file: &FileContents, downloadable: bool) -> Vec<(String, String)> {
    let disposition = if downloadable { "attachment" } else { "inline" };
    let file_name = file.file_name.replace('"', "");
    let content_type = if file.content_type.is_empty() {
        mime_type_for(&file.file_name).to_string()
    } else {
        file.content_type.clone()
    };
    vec![
        ("Content-Type".to_string(), content_type),
        (
            "Content-Disposition".to_string(),
            format!("{}; filename=\"{}\"", disposition, file_name),
        ),
        ("Content-Length".to_string(), file.bytes.len().to_string()),
    ]
}
