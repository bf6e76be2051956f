//! Controller trait, action registration and the per-request stage context.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;

use super::result::FileContents;
use crate::config::SharedParameters;
use crate::error::ControllerError;
use crate::route::Route;
use crate::value::{Data, Value};

/// What every stage returns: a mapping merged into the result data.
pub type StageResult = Result<Data, ControllerError>;

/// An action or verb method registered on a controller.
pub type Handler<C> = fn(&mut C, &mut Context) -> StageResult;

/// A request controller.
///
/// Implementors register their actions in [`Controller::actions`] and may
/// override the `before`/`after` hooks, which default to empty mappings.
///
/// ```ignore
/// struct PostsController;
///
/// impl Controller for PostsController {
///     fn actions() -> ActionTable<Self> {
///         ActionTable::new().action("index", Self::index)
///     }
/// }
///
/// impl PostsController {
///     fn index(&mut self, ctx: &mut Context) -> StageResult {
///         ctx.set_page_title("Posts");
///         Ok(Data::from([("posts".to_string(), Value::Array(vec![]))]))
///     }
/// }
/// ```
pub trait Controller: Sized {
    /// Registration table mapping route action names to methods.
    fn actions() -> ActionTable<Self>;

    /// Name used in logs and error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs first, unconditionally.
    fn before(&mut self, _ctx: &mut Context) -> StageResult {
        Ok(Data::new())
    }

    /// Runs last, unless a previous stage called [`Context::skip`].
    fn after(&mut self, _ctx: &mut Context) -> StageResult {
        Ok(Data::new())
    }
}

/// Maps method names to controller methods.
pub struct ActionTable<C> {
    handlers: IndexMap<String, Handler<C>>,
}

impl<C> Default for ActionTable<C> {
    fn default() -> Self {
        Self {
            handlers: IndexMap::new(),
        }
    }
}

impl<C> fmt::Debug for ActionTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTable")
            .field("actions", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> ActionTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`. A later registration replaces an earlier one.
    pub fn action(mut self, name: impl Into<String>, handler: Handler<C>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler<C>> {
        self.handlers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Per-request state handed to every stage.
///
/// Parameter accessors read and write the shared store, so a value set here
/// is seen by every other holder of the same request's parameters.
pub struct Context {
    parameters: SharedParameters,
    route: Box<dyn Route>,
    skip: bool,
    file_contents: Option<FileContents>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("action", &self.route.action_name())
            .field("verb_method", &self.route.verb_method_name())
            .field("skip", &self.skip)
            .field("has_file_contents", &self.file_contents.is_some())
            .finish()
    }
}

impl Context {
    pub fn new(parameters: SharedParameters, route: Box<dyn Route>) -> Self {
        Self {
            parameters,
            route,
            skip: false,
            file_contents: None,
        }
    }

    /// Suppress every stage that has not started yet. Cannot be undone.
    pub fn skip(&mut self) {
        self.skip = true;
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Hand raw file output to the file renderer.
    pub fn set_file_contents(
        &mut self,
        bytes: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
        file_name: impl Into<String>,
    ) {
        self.file_contents = Some(FileContents {
            bytes: bytes.into(),
            content_type: content_type.into(),
            file_name: file_name.into(),
        });
    }

    pub fn file_contents(&self) -> Option<&FileContents> {
        self.file_contents.as_ref()
    }

    pub fn parameters(&self) -> &SharedParameters {
        &self.parameters
    }

    pub fn route(&self) -> &dyn Route {
        self.route.as_ref()
    }

    pub fn downloadable(&self) -> bool {
        self.parameters.borrow().downloadable()
    }

    pub fn set_downloadable(&self, downloadable: bool) {
        self.parameters.borrow_mut().set_downloadable(downloadable);
    }

    pub fn base_folder(&self) -> PathBuf {
        self.parameters.borrow().base_folder().to_path_buf()
    }

    pub fn set_base_folder(&self, folder: impl Into<PathBuf>) {
        self.parameters.borrow_mut().set_base_folder(folder);
    }

    pub fn view_path(&self) -> Option<PathBuf> {
        self.parameters.borrow().view_path().map(|p| p.to_path_buf())
    }

    pub fn set_view_path(&self, path: impl Into<PathBuf>) {
        self.parameters.borrow_mut().set_view_path(path);
    }

    pub fn project_title(&self) -> String {
        self.parameters.borrow().project_title().to_string()
    }

    pub fn set_project_title(&self, title: impl Into<String>) {
        self.parameters.borrow_mut().set_project_title(title);
    }

    pub fn page_title(&self) -> String {
        self.parameters.borrow().page_title().to_string()
    }

    pub fn set_page_title(&self, title: impl Into<String>) {
        self.parameters.borrow_mut().set_page_title(title);
    }

    pub fn output(&self) -> String {
        self.parameters.borrow().output().to_string()
    }

    pub fn set_output(&self, output: impl Into<String>) {
        self.parameters.borrow_mut().set_output(output);
    }

    pub fn template_file(&self) -> Option<PathBuf> {
        self.parameters
            .borrow()
            .template_file()
            .map(|p| p.to_path_buf())
    }

    pub fn set_template_file(&self, path: impl Into<PathBuf>) {
        self.parameters.borrow_mut().set_template_file(path);
    }

    pub fn url_parameters(&self) -> Data {
        self.parameters.borrow().url_parameters().clone()
    }

    pub fn url_parameter(&self, name: &str) -> Option<Value> {
        self.parameters.borrow().url_parameter(name).cloned()
    }

    pub fn dynamic_nodes(&self) -> &Data {
        self.route.dynamic_nodes()
    }

    pub fn dynamic_node(&self, name: &str) -> Option<&Value> {
        self.route.dynamic_node(name)
    }
}
