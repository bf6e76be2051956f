//! View helper: exposes finished controller data to view fragments.
//!
//! Lookups walk nested hashes key by key and yield `None` as soon as a key is
//! missing. Prints require a scalar and escape it for HTML. Imports render
//! another fragment with the same helper bound as `helper`, so nested
//! fragments see the same data.

pub mod html;
pub mod parser;

use std::cell::Cell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::controller::ResultData;
use crate::error::ViewError;
use crate::value::Value;

pub use html::html_escape;
pub use parser::{parse_fragment, FragmentNode, HelperCall, HelperMethod, HELPER_NAME};

/// Import path that stands for the configured view file.
pub const VIEW_IMPORT: &str = "view";

/// Maximum nesting of imports before rendering is aborted.
pub const MAX_IMPORT_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy)]
enum Namespace {
    Controller,
    Framework,
}

impl Namespace {
    fn as_str(&self) -> &'static str {
        match self {
            Namespace::Controller => "controller",
            Namespace::Framework => "framework",
        }
    }
}

/// Read-only access to result data from inside views.
#[derive(Debug)]
pub struct ViewHelper<'a> {
    data: &'a ResultData,
    base_folder: PathBuf,
    view_file: Option<PathBuf>,
    depth: Cell<usize>,
}

impl<'a> ViewHelper<'a> {
    /// Create a helper resolving imports relative to `base_folder`.
    pub fn new(data: &'a ResultData, base_folder: impl Into<PathBuf>) -> Self {
        Self {
            data,
            base_folder: base_folder.into(),
            view_file: None,
            depth: Cell::new(0),
        }
    }

    /// Set the file that `import("view")` renders.
    pub fn with_view_file(mut self, view_file: Option<PathBuf>) -> Self {
        self.view_file = view_file;
        self
    }

    /// Look up controller data. No keys returns the whole namespace.
    pub fn get_data<S: AsRef<str>>(&self, keys: &[S]) -> Option<&'a Value> {
        self.data.controller().lookup(keys)
    }

    /// Look up framework data. No keys returns the whole namespace.
    pub fn get_framework_data<S: AsRef<str>>(&self, keys: &[S]) -> Option<&'a Value> {
        self.data.framework().lookup(keys)
    }

    /// Write an escaped controller value. Missing values write nothing.
    pub fn print_data<S: AsRef<str>>(
        &self,
        out: &mut dyn Write,
        keys: &[S],
    ) -> Result<(), ViewError> {
        self.print(Namespace::Controller, out, keys)
    }

    /// Write an escaped framework value. Missing values write nothing.
    pub fn print_framework_data<S: AsRef<str>>(
        &self,
        out: &mut dyn Write,
        keys: &[S],
    ) -> Result<(), ViewError> {
        self.print(Namespace::Framework, out, keys)
    }

    fn print<S: AsRef<str>>(
        &self,
        namespace: Namespace,
        out: &mut dyn Write,
        keys: &[S],
    ) -> Result<(), ViewError> {
        if keys.is_empty() {
            return Err(ViewError::MissingKeys {
                namespace: namespace.as_str(),
            });
        }
        self.write_value(namespace, out, keys, true)
    }

    fn write_value<S: AsRef<str>>(
        &self,
        namespace: Namespace,
        out: &mut dyn Write,
        keys: &[S],
        escaped: bool,
    ) -> Result<(), ViewError> {
        let value = match namespace {
            Namespace::Controller => self.get_data(keys),
            Namespace::Framework => self.get_framework_data(keys),
        };

        let Some(value) = value else {
            return Ok(());
        };

        if value.is_composite() {
            let path: Vec<&str> = keys.iter().map(|k| k.as_ref()).collect();
            return Err(ViewError::NotScalar {
                namespace: namespace.as_str(),
                path: path.join("."),
                type_name: value.type_name(),
            });
        }

        let text = value.to_string();
        if escaped {
            out.write_all(html_escape(&text).as_bytes())?;
        } else {
            out.write_all(text.as_bytes())?;
        }
        Ok(())
    }

    /// Resolve an import path to an existing file.
    pub fn resolve_import(&self, path: &str) -> Option<PathBuf> {
        let candidate = if path == VIEW_IMPORT {
            self.view_file.clone()?
        } else {
            self.base_folder.join(path)
        };
        candidate.is_file().then_some(candidate)
    }

    /// Render the fragment at `path` into `out`.
    ///
    /// Returns `Ok(false)` without writing anything when the file does not
    /// exist; optional fragments are simply skipped.
    pub fn import(&self, path: &str, out: &mut dyn Write) -> Result<bool, ViewError> {
        let Some(file) = self.resolve_import(path) else {
            tracing::trace!(path, "fragment not found, skipping import");
            return Ok(false);
        };
        self.import_file(&file, out).map(|_| true)
    }

    /// Render the fragment at a path already resolved by the caller.
    ///
    /// `file` is taken as-is: neither `base_folder` nor the `view` alias
    /// applies. A missing file is an IO error here.
    pub fn import_file(&self, file: &Path, out: &mut dyn Write) -> Result<(), ViewError> {
        let depth = self.depth.get();
        if depth >= MAX_IMPORT_DEPTH {
            return Err(ViewError::ImportDepth {
                path: file.display().to_string(),
                depth: MAX_IMPORT_DEPTH,
            });
        }

        self.depth.set(depth + 1);
        let result = self.render_file(file, out);
        self.depth.set(depth);
        result
    }

    fn render_file(&self, file: &Path, out: &mut dyn Write) -> Result<(), ViewError> {
        let source = fs::read_to_string(file)?;
        let nodes = parse_fragment(&source)
            .map_err(|message| ViewError::template(file.display().to_string(), message))?;
        self.render_nodes(&nodes, out)
    }

    /// Render already parsed fragment nodes into `out`.
    pub fn render_nodes(
        &self,
        nodes: &[FragmentNode],
        out: &mut dyn Write,
    ) -> Result<(), ViewError> {
        for node in nodes {
            match node {
                FragmentNode::Literal(text) => out.write_all(text.as_bytes())?,
                FragmentNode::Output { call, escaped } => {
                    let namespace = match call.method {
                        HelperMethod::GetFrameworkData => Namespace::Framework,
                        _ => Namespace::Controller,
                    };
                    self.write_value(namespace, out, call.args.as_slice(), *escaped)?;
                }
                FragmentNode::Statement(call) => self.call(call, out)?,
            }
        }
        Ok(())
    }

    fn call(&self, call: &HelperCall, out: &mut dyn Write) -> Result<(), ViewError> {
        match call.method {
            HelperMethod::PrintData => self.print_data(out, call.args.as_slice()),
            HelperMethod::PrintFrameworkData => {
                self.print_framework_data(out, call.args.as_slice())
            }
            HelperMethod::Import => {
                let [path] = call.args.as_slice() else {
                    return Err(ViewError::template(
                        HELPER_NAME,
                        format!("import expects one path, got {}", call.args.len()),
                    ));
                };
                self.import(path, out).map(|_| ())
            }
            HelperMethod::GetData | HelperMethod::GetFrameworkData => Ok(()),
        }
    }
}
