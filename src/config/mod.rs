//! Request-scoped parameters shared by the controller, its hooks and the renderers.
//!
//! A single [`Parameters`] store lives for one request. It is handed around as
//! [`SharedParameters`] so that a title set from inside an action is what the
//! view renderer later reads back.

pub mod project;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::value::{Data, Value};

pub use project::{load_project_config, ProjectConfig};

/// Output used when nothing else is configured.
pub const DEFAULT_OUTPUT: &str = "view";

/// URL root used when nothing else is configured.
pub const DEFAULT_URL_ROOT: &str = "/";

/// Shared handle to the parameters of the current request.
pub type SharedParameters = Rc<RefCell<Parameters>>;

/// Mutable project and request parameters.
#[derive(Debug, Clone)]
pub struct Parameters {
    downloadable: bool,
    base_folder: PathBuf,
    view_path: Option<PathBuf>,
    project_title: String,
    page_title: String,
    output: String,
    template_file: Option<PathBuf>,
    url_root: String,
    url_parameters: Data,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            downloadable: false,
            base_folder: PathBuf::new(),
            view_path: None,
            project_title: String::new(),
            page_title: String::new(),
            output: DEFAULT_OUTPUT.to_string(),
            template_file: None,
            url_root: DEFAULT_URL_ROOT.to_string(),
            url_parameters: Data::new(),
        }
    }
}

impl Parameters {
    /// Create parameters rooted at the given project folder.
    pub fn new(base_folder: impl Into<PathBuf>) -> Self {
        Self {
            base_folder: base_folder.into(),
            ..Self::default()
        }
    }

    /// Seed parameters from a loaded project configuration.
    ///
    /// Relative `views` and `template` paths are resolved against `base_folder`.
    pub fn from_project(base_folder: impl Into<PathBuf>, config: &ProjectConfig) -> Self {
        let base_folder = base_folder.into();
        let mut params = Self::new(&base_folder);
        if let Some(title) = &config.title {
            params.project_title = title.clone();
        }
        if let Some(url_root) = &config.url_root {
            params.url_root = url_root.clone();
        }
        if let Some(output) = &config.output {
            params.output = output.clone();
        }
        params.template_file = config.template.as_ref().map(|t| base_folder.join(t));
        params.view_path = config.views.as_ref().map(|v| base_folder.join(v));
        params
    }

    /// Replace the URL parameters with those parsed from a query string.
    pub fn with_query(mut self, query: &str) -> Self {
        self.url_parameters = parse_query(query);
        self
    }

    /// Wrap into a shared handle.
    pub fn shared(self) -> SharedParameters {
        Rc::new(RefCell::new(self))
    }

    pub fn downloadable(&self) -> bool {
        self.downloadable
    }

    pub fn set_downloadable(&mut self, downloadable: bool) {
        self.downloadable = downloadable;
    }

    pub fn base_folder(&self) -> &Path {
        &self.base_folder
    }

    pub fn set_base_folder(&mut self, folder: impl Into<PathBuf>) {
        self.base_folder = folder.into();
    }

    pub fn view_path(&self) -> Option<&Path> {
        self.view_path.as_deref()
    }

    pub fn set_view_path(&mut self, path: impl Into<PathBuf>) {
        self.view_path = Some(path.into());
    }

    pub fn project_title(&self) -> &str {
        &self.project_title
    }

    pub fn set_project_title(&mut self, title: impl Into<String>) {
        self.project_title = title.into();
    }

    pub fn page_title(&self) -> &str {
        &self.page_title
    }

    pub fn set_page_title(&mut self, title: impl Into<String>) {
        self.page_title = title.into();
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn set_output(&mut self, output: impl Into<String>) {
        self.output = output.into();
    }

    pub fn template_file(&self) -> Option<&Path> {
        self.template_file.as_deref()
    }

    pub fn set_template_file(&mut self, path: impl Into<PathBuf>) {
        self.template_file = Some(path.into());
    }

    pub fn url_root(&self) -> &str {
        &self.url_root
    }

    pub fn set_url_root(&mut self, url_root: impl Into<String>) {
        self.url_root = url_root.into();
    }

    pub fn url_parameters(&self) -> &Data {
        &self.url_parameters
    }

    pub fn url_parameter(&self, name: &str) -> Option<&Value> {
        self.url_parameters.get(name)
    }

    pub fn set_url_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.url_parameters.insert(name.into(), value.into());
    }
}

/// Parse `a=1&b=x%20y` into an ordered mapping. Repeated keys keep the last value.
pub fn parse_query(query: &str) -> Data {
    let query = query.trim_start_matches('?');
    let mut params = Data::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        params.insert(key, Value::String(decode_component(value)));
    }

    params
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}
