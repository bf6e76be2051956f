//! Merged controller output handed to renderers.

use serde::Serialize;

use crate::value::{Data, Value};

/// Key holding the project title in the `controller` namespace.
pub const PROJECT_TITLE_KEY: &str = "projectTitle";

/// Key holding the page title in the `controller` namespace.
pub const PAGE_TITLE_KEY: &str = "pageTitle";

/// Key holding the URL root in the `framework` namespace.
pub const URL_ROOT_KEY: &str = "urlRoot";

/// The two result namespaces, frozen once the lifecycle completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultData {
    controller: Value,
    framework: Value,
}

impl Default for ResultData {
    fn default() -> Self {
        Self::new(Data::new(), Data::new())
    }
}

impl ResultData {
    pub fn new(controller: Data, framework: Data) -> Self {
        Self {
            controller: Value::Hash(controller),
            framework: Value::Hash(framework),
        }
    }

    /// Merged stage output plus the derived titles.
    pub fn controller(&self) -> &Value {
        &self.controller
    }

    /// Values derived by the framework itself.
    pub fn framework(&self) -> &Value {
        &self.framework
    }
}

/// Raw file output set by an action.
#[derive(Debug, Clone, PartialEq)]
pub struct FileContents {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}
