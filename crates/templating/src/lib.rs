//! # Templating - Weighted Template Registry with Pluggable Engines
//!
//! `templating` lets an application register named templates from several
//! sources, register interchangeable rendering engines behind one contract,
//! and render a template by name. When a name has several sources, the one
//! with the highest weight wins, and the engine it declares renders it.
//!
//! ## Core Concepts
//!
//! - [`Templating`]: owns the registries and runs the render pipeline
//! - [`TemplateTarget`]: inline code, a file path, or a [`Producer`]
//! - [`Engine`]: the contract every engine satisfies (title, description, render)
//! - [`TemplateLoader`]: how engines resolve `include`d templates by name
//! - Locals: default variables merged under every render's arguments
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use templating::{TemplateTarget, Templating};
//!
//! # #[tokio::main]
//! # async fn main() -> templating::Result<()> {
//! let templating = Templating::new();
//! templating.register("test", TemplateTarget::code("Hello {{ name }}"));
//!
//! let output = templating.render("test", &json!({"name": "John"})).await?;
//! assert_eq!(output, "Hello John");
//! # Ok(())
//! # }
//! ```
//!
//! ## Weighted Override
//!
//! ```rust
//! use serde_json::json;
//! use templating::{TemplateTarget, Templating};
//!
//! # #[tokio::main]
//! # async fn main() -> templating::Result<()> {
//! let templating = Templating::new();
//! templating
//!     .register_with("page", TemplateTarget::code("theme"), 2, None)
//!     .register_with("page", TemplateTarget::code("core"), 0, None)
//!     .register_with("page", TemplateTarget::code("fallback"), -2, None);
//!
//! assert_eq!(templating.render("page", &json!({})).await?, "theme");
//! # Ok(())
//! # }
//! ```
//!
//! ## Nested Templates
//!
//! The default engine resolves `{% include %}` through the same registry, and
//! the included template sees the same variables:
//!
//! ```rust
//! use serde_json::json;
//! use templating::{TemplateTarget, Templating};
//!
//! # #[tokio::main]
//! # async fn main() -> templating::Result<()> {
//! let templating = Templating::new();
//! templating
//!     .register("test", TemplateTarget::code("Hello {{ name }}"))
//!     .register("test2", TemplateTarget::code("{% include \"test\" %}, {{ name }}"));
//!
//! let output = templating.render("test2", &json!({"name": "John"})).await?;
//! assert_eq!(output, "Hello John, John");
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events (registration at `debug`, resolution at
//! `trace`, blocking-load timeouts at `warn`) and never installs a subscriber.

mod config;
mod error;
mod locals;
pub mod template;
mod templating;
mod util;

pub use config::{TemplatingConfig, DEFAULT_ENGINE, DEFAULT_LOAD_TIMEOUT};
pub use error::{BoxError, Result, TemplatingError};
pub use locals::{now, LocalValue, Locals, LocalsStore, NOW_LOCAL};
pub use template::{
    Capabilities, Engine, EngineDescription, FnEngine, MiniJinjaEngine, PlainEngine,
    ProduceRequest, Producer, ResolvedTemplate, SimpleEngine, TemplateLoader, TemplateSource,
    TemplateTarget,
};
pub use templating::Templating;
pub use util::merge_json;
