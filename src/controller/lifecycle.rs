//! The controller lifecycle.
//!
//! A runner binds one controller to one request and executes, exactly once:
//!
//! 1. `before` (always)
//! 2. the route action, then the verb method if the route declares one
//! 3. `after`
//! 4. merge into [`ResultData`]
//!
//! Stages 2 and 3 do not start once a previous stage called
//! [`Context::skip`]; the merge always runs with whatever was collected.

use std::fmt;

use super::controller::{Context, Controller, Handler};
use super::result::{
    FileContents, ResultData, PAGE_TITLE_KEY, PROJECT_TITLE_KEY, URL_ROOT_KEY,
};
use crate::config::SharedParameters;
use crate::error::ControllerError;
use crate::perf::{Instrumentation, NoopInstrumentation};
use crate::route::Route;
use crate::value::{Data, Value};

/// Checkpoint label reported after the merge.
pub const CHECKPOINT_MERGE: &str = "controller.merge";

/// A lifecycle stage with its own result buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Before,
    Action,
    Verb,
    After,
}

impl Stage {
    /// Stages in merge order.
    pub const ALL: [Stage; 4] = [Stage::Before, Stage::Action, Stage::Verb, Stage::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Before => "before",
            Stage::Action => "action",
            Stage::Verb => "verb",
            Stage::After => "after",
        }
    }

    /// Label of the checkpoint reported when the stage completes.
    /// The verb method shares the action's checkpoint.
    pub fn checkpoint(&self) -> &'static str {
        match self {
            Stage::Before => "controller.before",
            Stage::Action | Stage::Verb => "controller.action",
            Stage::After => "controller.after",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Pending,
    Constructed,
    Aborted,
}

#[derive(Debug, Default)]
struct StageBuffers {
    before: Data,
    action: Data,
    verb: Data,
    after: Data,
}

impl StageBuffers {
    fn get(&self, stage: Stage) -> &Data {
        match stage {
            Stage::Before => &self.before,
            Stage::Action => &self.action,
            Stage::Verb => &self.verb,
            Stage::After => &self.after,
        }
    }
}

/// Runs a controller through its lifecycle and holds the outcome.
pub struct LifecycleRunner<C: Controller, I: Instrumentation = NoopInstrumentation> {
    controller: C,
    context: Context,
    instrumentation: I,
    action: Handler<C>,
    verb: Option<Handler<C>>,
    state: LifecycleState,
    buffers: StageBuffers,
    result_data: Option<ResultData>,
}

impl<C: Controller> LifecycleRunner<C> {
    /// Bind `controller` to `route` without instrumentation.
    pub fn new(
        controller: C,
        route: impl Route + 'static,
        parameters: SharedParameters,
    ) -> Result<Self, ControllerError> {
        Self::with_instrumentation(controller, route, parameters, NoopInstrumentation)
    }

    /// Bind and run in one step.
    pub fn build(
        controller: C,
        route: impl Route + 'static,
        parameters: SharedParameters,
    ) -> Result<Self, ControllerError> {
        let mut runner = Self::new(controller, route, parameters)?;
        runner.construct()?;
        Ok(runner)
    }
}

impl<C: Controller, I: Instrumentation> LifecycleRunner<C, I> {
    /// Bind `controller` to `route`.
    ///
    /// The action and the verb method are looked up in the controller's
    /// [`ActionTable`](super::ActionTable) here; a name with no registered
    /// method is a configuration error and nothing runs.
    pub fn with_instrumentation(
        controller: C,
        route: impl Route + 'static,
        parameters: SharedParameters,
        instrumentation: I,
    ) -> Result<Self, ControllerError> {
        let table = C::actions();

        let action_name = route.action_name();
        let action = table
            .get(action_name)
            .ok_or_else(|| ControllerError::UnknownAction {
                controller: controller.name().to_string(),
                action: action_name.to_string(),
            })?;

        let verb = match route.verb_method_name() {
            Some(method) => Some(table.get(method).ok_or_else(|| {
                ControllerError::UnknownVerbMethod {
                    controller: controller.name().to_string(),
                    method: method.to_string(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            controller,
            context: Context::new(parameters, Box::new(route)),
            instrumentation,
            action,
            verb,
            state: LifecycleState::Pending,
            buffers: StageBuffers::default(),
            result_data: None,
        })
    }

    /// Run the lifecycle. Only the first call does anything.
    ///
    /// A stage error propagates immediately; no result data is produced and
    /// the runner will not run again.
    pub fn construct(&mut self) -> Result<(), ControllerError> {
        if self.state != LifecycleState::Pending {
            tracing::warn!(
                controller = self.controller.name(),
                "lifecycle already ran, ignoring construct"
            );
            return Ok(());
        }

        self.state = LifecycleState::Aborted;
        self.run()?;
        self.state = LifecycleState::Constructed;
        Ok(())
    }

    fn run(&mut self) -> Result<(), ControllerError> {
        tracing::debug!(
            controller = self.controller.name(),
            action = self.context.route().action_name(),
            "running controller lifecycle"
        );

        self.buffers.before = self.controller.before(&mut self.context)?;
        self.instrumentation.checkpoint(Stage::Before.checkpoint());

        if self.context.is_skipped() {
            tracing::debug!("skip set, not running action");
        } else {
            self.buffers.action = (self.action)(&mut self.controller, &mut self.context)?;

            if let Some(verb) = self.verb {
                if self.context.is_skipped() {
                    tracing::debug!("skip set, not running verb method");
                } else {
                    self.buffers.verb = verb(&mut self.controller, &mut self.context)?;
                }
            }
            self.instrumentation.checkpoint(Stage::Action.checkpoint());
        }

        if self.context.is_skipped() {
            tracing::debug!("skip set, not running after");
        } else {
            self.buffers.after = self.controller.after(&mut self.context)?;
            self.instrumentation.checkpoint(Stage::After.checkpoint());
        }

        self.result_data = Some(self.merge());
        self.instrumentation.checkpoint(CHECKPOINT_MERGE);
        Ok(())
    }

    /// Combine the stage buffers in order, later keys replacing earlier ones.
    fn merge(&self) -> ResultData {
        let mut controller = Data::new();
        for stage in Stage::ALL {
            for (key, value) in self.buffers.get(stage) {
                controller.insert(key.clone(), value.clone());
            }
        }

        let params = self.context.parameters().borrow();
        controller.insert(
            PROJECT_TITLE_KEY.to_string(),
            Value::from(params.project_title()),
        );
        controller.insert(PAGE_TITLE_KEY.to_string(), Value::from(params.page_title()));

        let mut framework = Data::new();
        framework.insert(URL_ROOT_KEY.to_string(), Value::from(params.url_root()));

        ResultData::new(controller, framework)
    }

    pub fn is_constructed(&self) -> bool {
        self.state == LifecycleState::Constructed
    }

    /// The merged result, once the lifecycle has completed.
    pub fn result_data(&self) -> Option<&ResultData> {
        self.result_data.as_ref()
    }

    pub fn file_contents(&self) -> Option<&FileContents> {
        self.context.file_contents()
    }

    /// What a single stage returned. Empty if the stage did not run.
    pub fn stage_data(&self, stage: Stage) -> &Data {
        self.buffers.get(stage)
    }

    /// Read-only view of the request context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn instrumentation(&self) -> &I {
        &self.instrumentation
    }

    pub fn url_parameters(&self) -> Data {
        self.context.url_parameters()
    }

    pub fn url_parameter(&self, name: &str) -> Option<Value> {
        self.context.url_parameter(name)
    }

    pub fn dynamic_nodes(&self) -> &Data {
        self.context.dynamic_nodes()
    }

    pub fn dynamic_node(&self, name: &str) -> Option<&Value> {
        self.context.dynamic_node(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Parameters, ProjectConfig};
    use crate::controller::{ActionTable, StageResult};
    use crate::error::ConfigError;
    use crate::perf::PerformanceAnalysis;
    use crate::route::ResolvedRoute;
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    fn data<const N: usize>(pairs: [(&str, Value); N]) -> Data {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Records the order stages ran in and returns fixed data per stage.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        skip_in: Option<Stage>,
        fail_in: Option<Stage>,
    }

    impl Recorder {
        fn skipping(stage: Stage) -> Self {
            Self {
                skip_in: Some(stage),
                ..Self::default()
            }
        }

        fn failing(stage: Stage) -> Self {
            Self {
                fail_in: Some(stage),
                ..Self::default()
            }
        }

        fn stage(&mut self, stage: Stage, ctx: &mut Context, out: Data) -> StageResult {
            self.calls.push(stage.as_str());
            if self.fail_in == Some(stage) {
                return Err(ControllerError::stage(stage.as_str(), "boom"));
            }
            if self.skip_in == Some(stage) {
                ctx.skip();
            }
            Ok(out)
        }

        fn index(&mut self, ctx: &mut Context) -> StageResult {
            self.stage(Stage::Action, ctx, data([("y", Value::from(2))]))
        }

        fn create(&mut self, ctx: &mut Context) -> StageResult {
            self.stage(Stage::Verb, ctx, data([("created", Value::from(true))]))
        }

        fn download(&mut self, ctx: &mut Context) -> StageResult {
            ctx.set_file_contents(b"a,b\n1,2\n".to_vec(), "text/csv", "report.csv");
            ctx.set_downloadable(true);
            Ok(Data::new())
        }
    }

    impl Controller for Recorder {
        fn actions() -> ActionTable<Self> {
            ActionTable::new()
                .action("index", Self::index)
                .action("create", Self::create)
                .action("download", Self::download)
        }

        fn name(&self) -> &str {
            "recorder"
        }

        fn before(&mut self, ctx: &mut Context) -> StageResult {
            self.stage(Stage::Before, ctx, data([("x", Value::from(1))]))
        }

        fn after(&mut self, ctx: &mut Context) -> StageResult {
            self.stage(Stage::After, ctx, data([("x", Value::from(3))]))
        }
    }

    fn params() -> SharedParameters {
        let mut params = Parameters::new("/srv/app");
        params.set_project_title("Blog");
        params.set_page_title("Home");
        params.set_url_root("/blog/");
        params.shared()
    }

    #[test]
    fn test_end_to_end_merge() {
        let runner =
            LifecycleRunner::build(Recorder::default(), ResolvedRoute::new("index"), params())
                .unwrap();

        let expected = data([
            ("x", Value::from(3)),
            ("y", Value::from(2)),
            ("projectTitle", Value::from("Blog")),
            ("pageTitle", Value::from("Home")),
        ]);
        let result = runner.result_data().unwrap();
        assert_eq!(result.controller(), &Value::Hash(expected));
        assert_eq!(
            result.framework(),
            &Value::Hash(data([("urlRoot", Value::from("/blog/"))]))
        );
        assert_eq!(runner.controller().calls, vec!["before", "action", "after"]);
        assert!(runner.stage_data(Stage::Verb).is_empty());
    }

    #[test]
    fn test_verb_method_runs_after_action() {
        let route = ResolvedRoute::new("index").with_verb_method("create");
        let runner = LifecycleRunner::build(Recorder::default(), route, params()).unwrap();

        assert_eq!(
            runner.controller().calls,
            vec!["before", "action", "verb", "after"]
        );
        let controller = runner.result_data().unwrap().controller();
        assert_eq!(controller.lookup(&["created"]), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_merge_precedence() {
        struct Collide;

        impl Controller for Collide {
            fn actions() -> ActionTable<Self> {
                ActionTable::new()
                    .action("index", Self::index)
                    .action("post", Self::post)
            }

            fn before(&mut self, _ctx: &mut Context) -> StageResult {
                Ok(data([("k", Value::from("before")), ("b", Value::from(1))]))
            }
        }

        impl Collide {
            fn index(&mut self, _ctx: &mut Context) -> StageResult {
                Ok(data([("k", Value::from("action"))]))
            }

            fn post(&mut self, _ctx: &mut Context) -> StageResult {
                Ok(data([("k", Value::from("verb")), ("v", Value::from(1))]))
            }
        }

        let runner = LifecycleRunner::build(Collide, ResolvedRoute::new("index"), params()).unwrap();
        let controller = runner.result_data().unwrap().controller();
        assert_eq!(controller.lookup(&["k"]), Some(&Value::from("action")));

        let route = ResolvedRoute::new("index").with_verb_method("post");
        let runner = LifecycleRunner::build(Collide, route, params()).unwrap();
        let controller = runner.result_data().unwrap().controller();
        assert_eq!(controller.lookup(&["k"]), Some(&Value::from("verb")));
        assert_eq!(controller.lookup(&["b"]), Some(&Value::Int(1)));
    }

    #[test]
    fn test_titles_override_stage_keys() {
        struct Titled;

        impl Controller for Titled {
            fn actions() -> ActionTable<Self> {
                ActionTable::new().action("index", Self::index)
            }
        }

        impl Titled {
            fn index(&mut self, ctx: &mut Context) -> StageResult {
                ctx.set_page_title("From action");
                Ok(data([("pageTitle", Value::from("shadowed"))]))
            }
        }

        let runner = LifecycleRunner::build(Titled, ResolvedRoute::new("index"), params()).unwrap();
        let controller = runner.result_data().unwrap().controller();
        assert_eq!(
            controller.lookup(&["pageTitle"]),
            Some(&Value::from("From action"))
        );
    }

    #[test]
    fn test_skip_in_action_leaves_verb_and_after_empty() {
        let route = ResolvedRoute::new("index").with_verb_method("create");
        let runner =
            LifecycleRunner::build(Recorder::skipping(Stage::Action), route, params()).unwrap();

        assert_eq!(runner.controller().calls, vec!["before", "action"]);
        assert!(runner.stage_data(Stage::Verb).is_empty());
        assert!(runner.stage_data(Stage::After).is_empty());

        let controller = runner.result_data().unwrap().controller();
        assert_eq!(controller.lookup(&["x"]), Some(&Value::Int(1)));
        assert_eq!(controller.lookup(&["y"]), Some(&Value::Int(2)));
        assert_eq!(controller.lookup(&["created"]), None);
    }

    #[test]
    fn test_skip_in_before_still_merges() {
        let runner = LifecycleRunner::build(
            Recorder::skipping(Stage::Before),
            ResolvedRoute::new("index"),
            params(),
        )
        .unwrap();

        assert_eq!(runner.controller().calls, vec!["before"]);
        let controller = runner.result_data().unwrap().controller();
        assert_eq!(controller.lookup(&["x"]), Some(&Value::Int(1)));
        assert_eq!(controller.lookup(&["y"]), None);
        assert_eq!(controller.lookup(&["projectTitle"]), Some(&Value::from("Blog")));
    }

    #[test]
    fn test_skip_in_verb_suppresses_after() {
        let route = ResolvedRoute::new("index").with_verb_method("create");
        let runner =
            LifecycleRunner::build(Recorder::skipping(Stage::Verb), route, params()).unwrap();

        assert_eq!(runner.controller().calls, vec!["before", "action", "verb"]);
        assert!(runner.stage_data(Stage::After).is_empty());
    }

    #[test]
    fn test_construct_twice_is_noop() {
        let mut runner =
            LifecycleRunner::new(Recorder::default(), ResolvedRoute::new("index"), params())
                .unwrap();
        runner.construct().unwrap();
        let first = runner.result_data().cloned();

        runner.construct().unwrap();
        assert_eq!(runner.result_data().cloned(), first);
        assert_eq!(runner.controller().calls, vec!["before", "action", "after"]);
        assert!(runner.is_constructed());
    }

    #[test]
    fn test_unknown_action_is_configuration_error() {
        let err = LifecycleRunner::new(Recorder::default(), ResolvedRoute::new("missing"), params())
            .err()
            .unwrap();
        assert!(err.is_configuration());
        assert!(matches!(err, ControllerError::UnknownAction { ref action, .. } if action == "missing"));
    }

    #[test]
    fn test_unknown_verb_method_is_configuration_error() {
        let route = ResolvedRoute::new("index").with_verb_method("nope");
        let err = LifecycleRunner::new(Recorder::default(), route, params())
            .err()
            .unwrap();
        assert!(matches!(err, ControllerError::UnknownVerbMethod { ref method, .. } if method == "nope"));
    }

    #[test]
    fn test_stage_error_aborts_without_result() {
        let mut runner = LifecycleRunner::new(
            Recorder::failing(Stage::Action),
            ResolvedRoute::new("index"),
            params(),
        )
        .unwrap();

        let err = runner.construct().unwrap_err();
        assert!(matches!(err, ControllerError::Stage { stage: "action", .. }));
        assert!(runner.result_data().is_none());
        assert!(!runner.is_constructed());

        runner.construct().unwrap();
        assert!(runner.result_data().is_none());
        assert_eq!(runner.controller().calls, vec!["before", "action"]);
    }

    #[test]
    fn test_checkpoints() {
        let route = ResolvedRoute::new("index").with_verb_method("create");
        let mut runner = LifecycleRunner::with_instrumentation(
            Recorder::default(),
            route,
            params(),
            PerformanceAnalysis::new(),
        )
        .unwrap();
        runner.construct().unwrap();

        assert_eq!(
            runner.instrumentation().labels(),
            vec![
                "controller.before",
                "controller.action",
                "controller.after",
                "controller.merge"
            ]
        );
    }

    #[test]
    fn test_checkpoints_when_skipped_in_before() {
        let mut runner = LifecycleRunner::with_instrumentation(
            Recorder::skipping(Stage::Before),
            ResolvedRoute::new("index"),
            params(),
            PerformanceAnalysis::new(),
        )
        .unwrap();
        runner.construct().unwrap();

        assert_eq!(
            runner.instrumentation().labels(),
            vec!["controller.before", "controller.merge"]
        );
    }

    #[test]
    fn test_file_contents_and_shared_parameters() {
        let shared = params();
        let runner = LifecycleRunner::build(
            Recorder::default(),
            ResolvedRoute::new("download"),
            Rc::clone(&shared),
        )
        .unwrap();

        let file = runner.file_contents().unwrap();
        assert_eq!(file.file_name, "report.csv");
        assert_eq!(file.content_type, "text/csv");
        assert!(shared.borrow().downloadable());
        assert!(runner.context().downloadable());
    }

    #[test]
    fn test_route_and_url_accessors() {
        let shared = Parameters::new("/srv/app").with_query("q=rust").shared();
        let route = ResolvedRoute::new("index").with_node("id", 9);
        let runner = LifecycleRunner::build(Recorder::default(), route, shared).unwrap();

        assert_eq!(runner.url_parameter("q"), Some(Value::from("rust")));
        assert_eq!(runner.url_parameter("page"), None);
        assert_eq!(runner.url_parameters().len(), 1);
        assert_eq!(runner.dynamic_node("id"), Some(&Value::Int(9)));
        assert_eq!(runner.dynamic_node("slug"), None);
        assert_eq!(runner.dynamic_nodes().len(), 1);
    }

    struct Loader;

    impl Controller for Loader {
        fn actions() -> ActionTable<Self> {
            ActionTable::new()
                .action("settings", Self::settings)
                .action("attachment", Self::attachment)
        }
    }

    impl Loader {
        fn settings(&mut self, ctx: &mut Context) -> StageResult {
            let config = ProjectConfig::from_yaml(
                "title: [unclosed",
                &ctx.base_folder().join("config.yml"),
            )?;
            ctx.set_project_title(config.title.unwrap_or_default());
            Ok(Data::new())
        }

        fn attachment(&mut self, ctx: &mut Context) -> StageResult {
            let bytes = std::fs::read(ctx.base_folder().join("missing.bin"))?;
            ctx.set_file_contents(bytes, "application/octet-stream", "missing.bin");
            Ok(Data::new())
        }
    }

    #[test]
    fn test_action_errors_propagate_with_question_mark() {
        let dir = tempfile::tempdir().unwrap();
        let shared = Parameters::new(dir.path()).shared();

        let err = LifecycleRunner::build(Loader, ResolvedRoute::new("settings"), Rc::clone(&shared))
            .err()
            .unwrap();
        assert!(matches!(err, ControllerError::Config(ConfigError::Yaml { .. })));
        assert!(!err.is_configuration());

        let err = LifecycleRunner::build(Loader, ResolvedRoute::new("attachment"), shared)
            .err()
            .unwrap();
        assert!(matches!(err, ControllerError::Io(_)));
    }

    struct Configure;

    impl Controller for Configure {
        fn actions() -> ActionTable<Self> {
            ActionTable::new().action("edit", Self::edit)
        }
    }

    impl Configure {
        fn edit(&mut self, ctx: &mut Context) -> StageResult {
            ctx.set_downloadable(true);
            ctx.set_base_folder("/srv/site");
            ctx.set_view_path("/srv/site/edit.html");
            ctx.set_project_title("Site");
            ctx.set_page_title("Edit");
            ctx.set_output("file");
            ctx.set_template_file("layout.html");
            Ok(Data::new())
        }
    }

    #[test]
    fn test_settings_written_by_action_reach_every_holder() {
        let shared = params();
        let runner =
            LifecycleRunner::build(Configure, ResolvedRoute::new("edit"), Rc::clone(&shared))
                .unwrap();

        let stored = shared.borrow();
        assert!(stored.downloadable());
        assert_eq!(stored.base_folder(), Path::new("/srv/site"));
        assert_eq!(stored.view_path(), Some(Path::new("/srv/site/edit.html")));
        assert_eq!(stored.project_title(), "Site");
        assert_eq!(stored.page_title(), "Edit");
        assert_eq!(stored.output(), "file");
        assert_eq!(stored.template_file(), Some(Path::new("layout.html")));
        drop(stored);

        let ctx = runner.context();
        assert!(ctx.downloadable());
        assert_eq!(ctx.base_folder(), PathBuf::from("/srv/site"));
        assert_eq!(ctx.view_path(), Some(PathBuf::from("/srv/site/edit.html")));
        assert_eq!(ctx.project_title(), "Site");
        assert_eq!(ctx.page_title(), "Edit");
        assert_eq!(ctx.output(), "file");
        assert_eq!(ctx.template_file(), Some(PathBuf::from("layout.html")));

        let controller = runner.result_data().unwrap().controller();
        assert_eq!(controller.lookup(&["projectTitle"]), Some(&Value::from("Site")));
        assert_eq!(controller.lookup(&["pageTitle"]), Some(&Value::from("Edit")));
    }
}
