//! Template sources, engines and nested loading.
//!
//! ## Key Types
//!
//! - [`TemplateRegistry`]: weighted, multi-source template resolution
//! - [`Engine`]: the contract every rendering engine satisfies
//! - [`EngineRegistry`]: named engines, validated at registration
//! - [`TemplateLoader`]: nested template resolution for engines, with an
//!   async entry point and a bounded blocking bridge
//!
//! ## Built-in Engines
//!
//! | Engine | Syntax | Includes |
//! |--------|--------|----------|
//! | [`MiniJinjaEngine`] | Jinja2 (`{{ name }}`, `{% for %}`) | `{% include "name" %}` via the blocking bridge |
//! | [`SimpleEngine`] | `{name}` | `{> name}` via the async loader |
//! | [`PlainEngine`] | none, code is output as-is | no |
//! | [`FnEngine`] | whatever the closure does | no |

mod engine;
mod engines;
mod loader;
mod registry;
mod simple;

pub use engine::{Capabilities, Engine, FnEngine, MiniJinjaEngine, PlainEngine};
pub use engines::{EngineDescription, EngineRegistry};
pub use loader::TemplateLoader;
pub use registry::{
    ProduceRequest, Producer, ResolvedTemplate, TemplateRegistry, TemplateSource, TemplateTarget,
};
pub use simple::{SimpleEngine, SimpleSyntaxError, MAX_INCLUDE_DEPTH};
