//! Route binding for controllers.
//!
//! A matched [`RouteNode`] names the controller action to run and, optionally,
//! a method per HTTP verb that runs after it:
//! - `RouteNode::new("index")` → only `index` runs
//! - `.verb(HttpMethod::Post, "create")` → `index` then `create` on POST
//!
//! Resolving a node against the request method and the dynamic path segments
//! produces a [`ResolvedRoute`], the [`Route`] a controller runs against.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::value::{Data, Value};

/// Route data a controller needs while it runs.
pub trait Route {
    /// Name of the action bound to the matched route node.
    fn action_name(&self) -> &str;

    /// Name of the method bound to the request's HTTP verb, if one is declared.
    fn verb_method_name(&self) -> Option<&str>;

    /// Dynamic path segments captured while matching (e.g. `:id`).
    fn dynamic_nodes(&self) -> &Data;

    fn dynamic_node(&self, name: &str) -> Option<&Value> {
        self.dynamic_nodes().get(name)
    }
}

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(format!("Unknown HTTP method: {}", s)),
        }
    }
}

/// A route node as declared by the application.
#[derive(Debug, Clone)]
pub struct RouteNode {
    pub action: String,
    pub verbs: IndexMap<HttpMethod, String>,
}

impl RouteNode {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            verbs: IndexMap::new(),
        }
    }

    /// Bind `method_name` to run after the action for requests using `method`.
    pub fn verb(mut self, method: HttpMethod, method_name: impl Into<String>) -> Self {
        self.verbs.insert(method, method_name.into());
        self
    }

    /// Resolve this node for one request.
    pub fn resolve(&self, method: HttpMethod, dynamic_nodes: Data) -> ResolvedRoute {
        ResolvedRoute {
            action: self.action.clone(),
            verb_method: self.verbs.get(&method).cloned(),
            dynamic_nodes,
        }
    }
}

/// The route of the current request.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRoute {
    action: String,
    verb_method: Option<String>,
    dynamic_nodes: Data,
}

impl ResolvedRoute {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_verb_method(mut self, method_name: impl Into<String>) -> Self {
        self.verb_method = Some(method_name.into());
        self
    }

    pub fn with_node(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.dynamic_nodes.insert(name.into(), value.into());
        self
    }
}

impl Route for ResolvedRoute {
    fn action_name(&self) -> &str {
        &self.action
    }

    fn verb_method_name(&self) -> Option<&str> {
        self.verb_method.as_deref()
    }

    fn dynamic_nodes(&self) -> &Data {
        &self.dynamic_nodes
    }
}
