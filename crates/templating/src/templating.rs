//! The registry object and render pipeline.
//!
//! [`Templating`] owns the template registry, the engine registry and the
//! locals store, and turns "render template X with arguments Y" into output:
//!
//! 1. Merge the stored locals with the arguments (arguments win)
//! 2. Resolve the name to the active source's engine and code
//! 3. Look up that engine
//! 4. Delegate to the engine
//!
//! Each step's failure is returned unchanged; the pipeline never retries.
//!
//! # Instances
//!
//! [`Templating::global`] is the process-wide instance, created on first
//! access. [`Templating::new`] and [`Templating::with_config`] build isolated
//! instances, which is what tests and embedded uses should prefer. All of
//! them start with the built-ins: [`MiniJinjaEngine`] under the configured
//! default engine name and the dynamic `now` local.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use templating::{TemplateTarget, Templating};
//!
//! # #[tokio::main]
//! # async fn main() -> templating::Result<()> {
//! let templating = Templating::new();
//! templating
//!     .register("greeting", TemplateTarget::code("Hello {{ name }}"))
//!     .add_local("name", "World");
//!
//! assert_eq!(templating.render("greeting", &json!({})).await?, "Hello World");
//! assert_eq!(
//!     templating.render("greeting", &json!({"name": "John"})).await?,
//!     "Hello John"
//! );
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::config::TemplatingConfig;
use crate::error::{BoxError, Result, TemplatingError};
use crate::locals::{LocalValue, Locals, LocalsStore};
use crate::template::{
    Engine, EngineDescription, EngineRegistry, MiniJinjaEngine, ResolvedTemplate, TemplateLoader,
    TemplateRegistry, TemplateSource, TemplateTarget,
};
use crate::util::merge_json;

static GLOBAL: Lazy<Templating> = Lazy::new(Templating::new);

/// Template, engine and locals registries plus the render pipeline.
///
/// All methods take `&self`; each store serializes its own mutations, so an
/// instance can be shared between tasks and threads (directly, behind an
/// `Arc`, or through [`Templating::global`]).
pub struct Templating {
    config: TemplatingConfig,
    templates: Arc<TemplateRegistry>,
    engines: EngineRegistry,
    locals: LocalsStore,
}

impl Templating {
    /// Creates an instance with the default configuration and built-ins.
    pub fn new() -> Self {
        Self::with_config(TemplatingConfig::default())
    }

    /// Creates an instance with `config` and the built-ins.
    pub fn with_config(config: TemplatingConfig) -> Self {
        let templating = Self::bare(config);
        templating.install_builtins();
        templating
    }

    /// Creates an instance with no engines and no locals.
    pub fn bare(config: TemplatingConfig) -> Self {
        Self {
            templates: Arc::new(TemplateRegistry::new(config.default_engine.clone())),
            engines: EngineRegistry::new(),
            locals: LocalsStore::new(),
            config,
        }
    }

    /// The process-wide instance, created with defaults on first access.
    pub fn global() -> &'static Templating {
        &GLOBAL
    }

    fn install_builtins(&self) {
        let name = &self.config.default_engine;
        if let Err(err) = self
            .engines
            .register(name.clone(), Arc::new(MiniJinjaEngine::new()))
        {
            warn!(engine = %name, error = %err, "default engine not installed");
        }
        self.locals
            .insert_local(crate::locals::NOW_LOCAL, LocalValue::dynamic(crate::locals::now));
    }

    /// The configuration this instance was built with.
    pub fn config(&self) -> &TemplatingConfig {
        &self.config
    }

    /// Registers an engine instance, replacing any engine of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`TemplatingError::InvalidEngine`] if the engine cannot render.
    pub fn register_engine<E>(&self, name: impl Into<String>, engine: E) -> Result<&Self>
    where
        E: Engine + 'static,
    {
        self.engines.register(name, Arc::new(engine))?;
        Ok(self)
    }

    /// Builds an engine with `factory` and registers it.
    ///
    /// # Errors
    ///
    /// Returns [`TemplatingError::InvalidEngine`] if the factory fails or the
    /// engine cannot render.
    pub fn register_engine_with<E, F>(&self, name: impl Into<String>, factory: F) -> Result<&Self>
    where
        E: Engine + 'static,
        F: FnOnce() -> std::result::Result<E, BoxError>,
    {
        self.engines.register_with(name, factory)?;
        Ok(self)
    }

    /// Returns true if an engine is registered under `name`.
    pub fn registered_engine(&self, name: &str) -> bool {
        self.engines.is_registered(name)
    }

    /// Removes an engine. Unknown names are ignored.
    pub fn unregister_engine(&self, name: &str) -> &Self {
        self.engines.unregister(name);
        self
    }

    /// Returns the engine registered under `name`.
    pub fn engine(&self, name: &str) -> Option<Arc<dyn Engine>> {
        self.engines.get(name)
    }

    /// Returns a snapshot of the registered engines.
    pub fn engines(&self) -> HashMap<String, Arc<dyn Engine>> {
        self.engines.all()
    }

    /// Titles, descriptions and capabilities of every engine, sorted by name.
    pub fn engine_descriptions(&self) -> Vec<EngineDescription> {
        self.engines.describe()
    }

    /// Sets a local variable passed to every render.
    pub fn add_local(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.locals.insert(name, value);
        self
    }

    /// Sets a local variable computed afresh for every render.
    pub fn add_dynamic_local<F>(&self, name: impl Into<String>, f: F) -> &Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.locals.insert_dynamic(name, f);
        self
    }

    /// Removes a local variable. Unknown names are ignored.
    pub fn del_local(&self, name: &str) -> &Self {
        self.locals.remove(name);
        self
    }

    /// Returns a snapshot of the stored local definitions.
    pub fn locals(&self) -> HashMap<String, LocalValue> {
        self.locals.snapshot()
    }

    /// Returns the locals as a render would see them before its arguments.
    pub fn resolved_locals(&self) -> Locals {
        self.locals.resolve()
    }

    /// Registers a template source with weight 0 and the default engine.
    pub fn register(&self, name: impl Into<String>, target: impl Into<TemplateTarget>) -> &Self {
        self.register_with(name, target, 0, None)
    }

    /// Registers a template source with an explicit weight and engine.
    ///
    /// `engine: None` selects the configured default engine.
    pub fn register_with(
        &self,
        name: impl Into<String>,
        target: impl Into<TemplateTarget>,
        weight: i32,
        engine: Option<&str>,
    ) -> &Self {
        self.templates.register(name, target, weight, engine);
        self
    }

    /// Returns true if at least one source is registered for `name`.
    pub fn registered(&self, name: &str) -> bool {
        self.templates.is_registered(name)
    }

    /// Removes every source for `name`, or only those matching `target`.
    pub fn unregister(&self, name: &str, target: Option<&TemplateTarget>) -> &Self {
        self.templates.unregister(name, target);
        self
    }

    /// Returns the sources registered for `name`, lowest weight first.
    pub fn templates(&self, name: &str) -> Vec<TemplateSource> {
        self.templates.list(name)
    }

    /// Returns a snapshot of every template name and its sources.
    pub fn all_templates(&self) -> HashMap<String, Vec<TemplateSource>> {
        self.templates.all()
    }

    /// The underlying template registry.
    pub fn template_registry(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    /// A loader engines can use to resolve nested templates.
    pub fn loader(&self) -> TemplateLoader {
        TemplateLoader::new(self.templates.clone(), self.config.load_timeout())
    }

    /// Resolves `name` to the active source's engine and code.
    ///
    /// # Errors
    ///
    /// Returns [`TemplatingError::UnknownTemplate`] if nothing is registered
    /// under `name`; file and producer failures are returned as-is.
    pub async fn template(&self, name: &str) -> Result<ResolvedTemplate> {
        self.templates.resolve(name).await
    }

    /// Renders `name` with `args` merged over the locals.
    ///
    /// `args` must serialize to a map (or to `null` for no arguments).
    /// The stored locals are not modified.
    ///
    /// # Errors
    ///
    /// - [`TemplatingError::InvalidArguments`] if `args` is not a map
    /// - [`TemplatingError::UnknownTemplate`] if `name` is not registered
    /// - [`TemplatingError::UnknownEngine`] if the source's engine is not registered
    /// - Any failure from the file, producer or engine, unchanged
    pub async fn render<T>(&self, name: &str, args: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let locals = self.merge_locals(serde_json::to_value(args)?)?;
        self.render_locals(name, locals).await
    }

    /// Renders `name` with an already-merged variable set.
    pub async fn render_locals(&self, name: &str, locals: Locals) -> Result<String> {
        trace!(template = %name, "resolving template for render");
        let resolved = self.template(name).await?;

        let engine = self
            .engines
            .get(&resolved.engine)
            .ok_or_else(|| TemplatingError::unknown_engine(&resolved.engine))?;

        trace!(template = %name, engine = %resolved.engine, "delegating to engine");
        engine.render(&resolved.code, &locals, &self.loader()).await
    }

    fn merge_locals(&self, args: Value) -> Result<Locals> {
        let mut locals = self.locals.resolve();
        match args {
            Value::Object(args) => merge_json(&mut locals, &args),
            Value::Null => {}
            other => {
                return Err(TemplatingError::InvalidArguments {
                    reason: format!("got {}", json_kind(&other)),
                })
            }
        }
        Ok(locals)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Default for Templating {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Templating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Templating")
            .field("config", &self.config)
            .field("templates", &self.templates)
            .field("engines", &self.engines)
            .field("locals", &self.locals)
            .finish()
    }
}
