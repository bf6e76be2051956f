//! Controllers for Soli MVC.
//!
//! A controller provides:
//! - Actions, registered by name in an [`ActionTable`]
//! - Optional `before`/`after` hooks around the action
//! - Optional verb methods, run after the action for a given HTTP method
//!
//! # Example Usage
//!
//! ```ignore
//! struct PostsController;
//!
//! impl Controller for PostsController {
//!     fn actions() -> ActionTable<Self> {
//!         ActionTable::new()
//!             .action("show", Self::show)
//!             .action("update", Self::update)
//!     }
//!
//!     fn before(&mut self, ctx: &mut Context) -> StageResult {
//!         if ctx.dynamic_node("id").is_none() {
//!             ctx.skip();
//!         }
//!         Ok(Data::new())
//!     }
//! }
//!
//! let route = RouteNode::new("show")
//!     .verb(HttpMethod::Post, "update")
//!     .resolve(HttpMethod::Post, nodes);
//! let runner = LifecycleRunner::build(PostsController, route, params)?;
//! let data = runner.result_data();
//! ```

pub mod controller;
pub mod lifecycle;
pub mod result;

pub use controller::{ActionTable, Context, Controller, Handler, StageResult};
pub use lifecycle::{LifecycleRunner, Stage, CHECKPOINT_MERGE};
pub use result::{FileContents, ResultData, PAGE_TITLE_KEY, PROJECT_TITLE_KEY, URL_ROOT_KEY};
