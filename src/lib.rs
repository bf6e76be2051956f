//! Soli MVC: the controller lifecycle behind Soli web applications.
//!
//! This is the library root that exports all modules.
//!
//! # Request Flow
//!
//! A matched route is bound to a controller, which then runs through a fixed
//! lifecycle:
//! - **before**: always runs first
//! - **action**: the method bound to the route, followed by the verb method
//!   declared for the request's HTTP method, if any
//! - **after**: runs last
//!
//! Stage results are merged in that order into [`ResultData`], which the
//! renderers in [`output`] turn into a view, JSON or a file download.

#![allow(clippy::module_inception)]
#![allow(clippy::result_large_err)]
#![allow(clippy::new_without_default)]

pub mod config;
pub mod controller;
pub mod error;
pub mod output;
pub mod perf;
pub mod route;
pub mod value;
pub mod view;

pub use config::{Parameters, SharedParameters};
pub use controller::{
    ActionTable, Context, Controller, FileContents, LifecycleRunner, ResultData, Stage,
    StageResult,
};
pub use error::MvcError;
pub use output::OutputKind;
pub use route::{HttpMethod, ResolvedRoute, Route, RouteNode};
pub use value::{Data, Value};
pub use view::ViewHelper;

use std::io::Write;

/// Bind `controller` to `route`, run it and render it with the configured output.
///
/// Returns the finished runner so callers can build file headers or read
/// the result data after rendering.
pub fn handle<C: Controller>(
    controller: C,
    route: impl Route + 'static,
    parameters: SharedParameters,
    out: &mut dyn Write,
) -> Result<LifecycleRunner<C>, MvcError> {
    let runner = LifecycleRunner::build(controller, route, parameters)?;
    output::render(&runner, out)?;
    Ok(runner)
}
