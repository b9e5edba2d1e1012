//! Engine contract and the built-in engines.
//!
//! This module defines the [`Engine`] trait every rendering engine satisfies.
//! An engine is an opaque capability: the registry and pipeline never look at
//! template syntax, they hand an engine the resolved code plus the merged
//! locals and return whatever it produces.
//!
//! Built-in implementations:
//!
//! - [`MiniJinjaEngine`]: the default engine, Jinja2-compatible, with
//!   `{% include %}` resolved through the template registry
//! - [`PlainEngine`]: returns the code unchanged (the contract's default)
//! - [`FnEngine`]: wraps a closure, for ad-hoc engines
//! - [`SimpleEngine`](super::SimpleEngine): `{name}` substitution

use async_trait::async_trait;
use minijinja::{Environment, ErrorKind, Value};
use tracing::trace;

use super::loader::TemplateLoader;
use crate::error::{Result, TemplatingError};
use crate::locals::Locals;

/// What an engine can do.
///
/// Registration rejects a candidate that reports `renders: false`: such a
/// value describes an engine but cannot produce output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the engine produces output from code.
    pub renders: bool,
    /// Whether templates can include other templates by name.
    pub includes: bool,
    /// Whether templates support filters (`{{ value | filter }}`).
    pub filters: bool,
    /// Whether templates support control flow (`{% for %}`, `{% if %}`).
    pub control_flow: bool,
}

impl Capabilities {
    /// Rendering plus every template-language feature.
    pub const fn full() -> Self {
        Self {
            renders: true,
            includes: true,
            filters: true,
            control_flow: true,
        }
    }

    /// No capabilities at all, not even rendering.
    pub const fn none() -> Self {
        Self {
            renders: false,
            includes: false,
            filters: false,
            control_flow: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            renders: true,
            ..Self::none()
        }
    }
}

/// A pluggable template renderer.
///
/// Every method has a default, so `impl Engine for MyType {}` is a valid
/// identity engine. Failures are reported through the returned `Result`;
/// implementations must not panic on bad templates.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use templating::template::{Engine, TemplateLoader};
/// use templating::{Locals, Result};
///
/// struct Shout;
///
/// #[async_trait]
/// impl Engine for Shout {
///     fn title(&self) -> String {
///         "Shout".into()
///     }
///
///     async fn render(&self, code: &str, _locals: &Locals, _loader: &TemplateLoader) -> Result<String> {
///         Ok(code.to_uppercase())
///     }
/// }
/// ```
#[async_trait]
pub trait Engine: Send + Sync {
    /// Display name.
    fn title(&self) -> String {
        String::new()
    }

    /// Display description.
    fn description(&self) -> String {
        String::new()
    }

    /// Feature descriptor checked at registration.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Renders `code` with `locals`.
    ///
    /// `loader` resolves templates this code refers to by name. The default
    /// implementation returns the code unchanged.
    async fn render(&self, code: &str, locals: &Locals, loader: &TemplateLoader) -> Result<String> {
        let _ = (locals, loader);
        Ok(code.to_string())
    }
}

/// Identity engine: output equals the template code.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainEngine;

impl Engine for PlainEngine {
    fn title(&self) -> String {
        "Plain".into()
    }

    fn description(&self) -> String {
        "Outputs template code unchanged.".into()
    }
}

/// Engine backed by a closure.
///
/// ```rust
/// use templating::template::FnEngine;
///
/// let engine = FnEngine::new("Reverse", |code, _locals| Ok(code.chars().rev().collect()));
/// ```
pub struct FnEngine<F> {
    title: String,
    description: String,
    render: F,
}

impl<F> FnEngine<F>
where
    F: Fn(&str, &Locals) -> Result<String> + Send + Sync,
{
    /// Creates an engine with the given title.
    pub fn new(title: impl Into<String>, render: F) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            render,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl<F> Engine for FnEngine<F>
where
    F: Fn(&str, &Locals) -> Result<String> + Send + Sync,
{
    fn title(&self) -> String {
        self.title.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    async fn render(&self, code: &str, locals: &Locals, _loader: &TemplateLoader) -> Result<String> {
        (self.render)(code, locals)
    }
}

/// MiniJinja-based template engine.
///
/// This is the default engine, providing:
/// - Jinja2-compatible syntax
/// - Loops, conditionals, macros
/// - Filters and functions
/// - `{% include %}`, `{% extends %}` and `{% import %}` of registered templates
///
/// MiniJinja calls its loader synchronously in the middle of a render, so
/// rendering runs on a blocking thread and nested names are resolved with
/// [`TemplateLoader::load_blocking`]. Included templates see the same locals
/// as the including template.
///
/// # Example
///
/// ```rust
/// use templating::template::MiniJinjaEngine;
///
/// let mut engine = MiniJinjaEngine::new();
/// engine
///     .environment_mut()
///     .add_filter("shout", |value: String| value.to_uppercase());
/// ```
#[derive(Debug, Clone)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// Creates a new MiniJinja engine.
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Returns a reference to the underlying MiniJinja environment.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Returns a mutable reference to the underlying MiniJinja environment.
    ///
    /// Filters, functions and syntax settings configured here apply to every
    /// render. Any loader set here is replaced by the registry loader.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for MiniJinjaEngine {
    fn title(&self) -> String {
        "MiniJinja".into()
    }

    fn description(&self) -> String {
        "A templating engine using Jinja2 syntax via MiniJinja.".into()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    async fn render(&self, code: &str, locals: &Locals, loader: &TemplateLoader) -> Result<String> {
        let mut env = self.env.clone();
        let nested = loader.clone();
        env.set_loader(move |name| match nested.load_blocking(name) {
            Ok(code) => Ok(Some(code)),
            Err(err) if err.is_unknown_template() => Err(minijinja::Error::new(
                ErrorKind::TemplateNotFound,
                format!("template \"{}\" is not registered", name),
            )
            .with_source(err)),
            Err(err) => Err(minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to load template \"{}\"", name),
            )
            .with_source(err)),
        });

        trace!(bytes = code.len(), "rendering with minijinja");
        let code = code.to_string();
        let ctx = Value::from_serialize(locals);
        tokio::task::spawn_blocking(move || env.render_str(&code, ctx))
            .await
            .map_err(TemplatingError::engine)?
            .map_err(TemplatingError::engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{TemplateRegistry, TemplateTarget};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn locals(value: serde_json::Value) -> Locals {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn loader_with(templates: &[(&str, &str)]) -> TemplateLoader {
        let registry = TemplateRegistry::new("jinja");
        for (name, code) in templates {
            registry.register(*name, TemplateTarget::code(*code), 0, None);
        }
        TemplateLoader::new(Arc::new(registry), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_plain_engine_returns_code() {
        let output = PlainEngine
            .render("Hello {{ name }}", &Locals::new(), &loader_with(&[]))
            .await
            .unwrap();
        assert_eq!(output, "Hello {{ name }}");
        assert_eq!(PlainEngine.capabilities(), Capabilities::default());
    }

    #[tokio::test]
    async fn test_fn_engine() {
        let engine = FnEngine::new("Upper", |code, locals| {
            let suffix = locals.get("suffix").and_then(|v| v.as_str()).unwrap_or("");
            Ok(format!("{}{}", code.to_uppercase(), suffix))
        })
        .with_description("Uppercases code");

        let output = engine
            .render("abc", &locals(json!({"suffix": "!"})), &loader_with(&[]))
            .await
            .unwrap();
        assert_eq!(output, "ABC!");
        assert_eq!(engine.title(), "Upper");
        assert_eq!(engine.description(), "Uppercases code");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_minijinja_engine_simple() {
        let engine = MiniJinjaEngine::new();
        let output = engine
            .render(
                "Hello {{ name }}",
                &locals(json!({"name": "John"})),
                &loader_with(&[]),
            )
            .await
            .unwrap();
        assert_eq!(output, "Hello John");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_minijinja_engine_with_loop() {
        let engine = MiniJinjaEngine::new();
        let output = engine
            .render(
                "{% for item in items %}{{ item }},{% endfor %}",
                &locals(json!({"items": ["a", "b", "c"]})),
                &loader_with(&[]),
            )
            .await
            .unwrap();
        assert_eq!(output, "a,b,c,");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_minijinja_engine_include_sees_locals() {
        let engine = MiniJinjaEngine::new();
        let loader = loader_with(&[("test", "Hello {{ name }}")]);
        let output = engine
            .render(
                "{% include \"test\" %}, {{ name}}",
                &locals(json!({"name": "John"})),
                &loader,
            )
            .await
            .unwrap();
        assert_eq!(output, "Hello John, John");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_minijinja_engine_missing_include() {
        let engine = MiniJinjaEngine::new();
        let err = engine
            .render("{% include \"nope\" %}", &Locals::new(), &loader_with(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, TemplatingError::Engine(_)));

        let mut source = std::error::Error::source(&err);
        let mut unknown = false;
        while let Some(cause) = source {
            if let Some(inner) = cause.downcast_ref::<TemplatingError>() {
                unknown |= inner.is_unknown_template();
            }
            source = cause.source();
        }
        assert!(unknown, "expected UnknownTemplate in {:?}", err);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_minijinja_engine_ignore_missing_include() {
        let engine = MiniJinjaEngine::new();
        let output = engine
            .render(
                "[{% include \"nope\" ignore missing %}]",
                &Locals::new(),
                &loader_with(&[]),
            )
            .await
            .unwrap();
        assert_eq!(output, "[]");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_minijinja_engine_template_error() {
        let engine = MiniJinjaEngine::new();
        let result = engine
            .render("{{ unclosed", &Locals::new(), &loader_with(&[]))
            .await;
        assert!(matches!(result, Err(TemplatingError::Engine(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_minijinja_engine_custom_filter() {
        let mut engine = MiniJinjaEngine::new();
        engine
            .environment_mut()
            .add_filter("shout", |value: String| value.to_uppercase());

        let output = engine
            .render(
                "{{ name | shout }}",
                &locals(json!({"name": "john"})),
                &loader_with(&[]),
            )
            .await
            .unwrap();
        assert_eq!(output, "JOHN");
    }

    #[test]
    fn test_minijinja_engine_metadata() {
        let engine = MiniJinjaEngine::new();
        assert_eq!(engine.title(), "MiniJinja");
        assert!(!engine.description().is_empty());
        assert_eq!(engine.capabilities(), Capabilities::full());
    }
}
