//! Template registry with weighted, multi-source resolution.
//!
//! This module provides [`TemplateRegistry`], which maps a template name to
//! every source registered for it. A source is one of:
//!
//! - Inline code held in memory ([`TemplateTarget::Code`])
//! - A file read on each resolution ([`TemplateTarget::File`])
//! - A [`Producer`] that supplies code asynchronously ([`TemplateTarget::Producer`])
//!
//! # Weighted Override
//!
//! Sources for a name are kept sorted ascending by weight with a stable sort,
//! so sources of equal weight stay in registration order. The last source is
//! the active one: the highest weight wins, and among equal weights the most
//! recent registration wins.
//!
//! ```rust
//! use templating::template::{TemplateRegistry, TemplateTarget};
//!
//! let registry = TemplateRegistry::new("jinja");
//! registry.register("greeting", TemplateTarget::code("A"), 2, None);
//! registry.register("greeting", TemplateTarget::code("B"), 0, None);
//! registry.register("greeting", TemplateTarget::code("C"), -2, None);
//!
//! let codes: Vec<_> = registry
//!     .list("greeting")
//!     .iter()
//!     .map(|s| s.target.as_code().unwrap().to_string())
//!     .collect();
//! assert_eq!(codes, ["C", "B", "A"]);
//! ```
//!
//! # Thread Safety
//!
//! The registry serializes mutations behind a single lock. Resolution copies
//! the active source out of the lock before loading it, so slow files or
//! producers never block registration.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tracing::{debug, trace};

use crate::error::{BoxError, Result, TemplatingError};
use crate::util::{read_lock, write_lock};

/// Describes the source a [`Producer`] is asked to supply code for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceRequest {
    /// The template name being resolved
    pub name: String,
    /// Weight of the source being produced
    pub weight: i32,
    /// Engine the source declares
    pub engine: String,
}

type ProduceFn = dyn Fn(ProduceRequest) -> BoxFuture<'static, std::result::Result<String, BoxError>>
    + Send
    + Sync;

/// A deferred operation that supplies template code.
///
/// Producers compare by identity: two producers are equal only if one is a
/// clone of the other.
///
/// ```rust
/// use templating::template::Producer;
///
/// let async_producer = Producer::new(|req| async move {
///     Ok(format!("Page {}", req.name))
/// });
/// let sync_producer = Producer::from_fn(|_req| Ok("Hello {{ name }}".to_string()));
///
/// assert_eq!(async_producer, async_producer.clone());
/// assert_ne!(async_producer, sync_producer);
/// ```
#[derive(Clone)]
pub struct Producer {
    inner: Arc<ProduceFn>,
}

impl Producer {
    /// Creates a producer from an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ProduceRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<String, BoxError>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |req| Box::pin(f(req))),
        }
    }

    /// Creates a producer from a synchronous closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(ProduceRequest) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |req| {
                let result = f(req);
                Box::pin(async move { result })
            }),
        }
    }

    /// Invokes the producer.
    pub async fn produce(&self, req: ProduceRequest) -> std::result::Result<String, BoxError> {
        (self.inner)(req).await
    }

    /// Returns true if both handles refer to the same producer.
    pub fn ptr_eq(&self, other: &Producer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Producer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Producer {}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Producer({:p})", Arc::as_ptr(&self.inner) as *const ())
    }
}

/// Where a template's code comes from.
///
/// The payload is fixed when a source is created. Equality is structural for
/// code and paths and by identity for producers, which is what
/// [`TemplateRegistry::unregister`] matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateTarget {
    /// Template code held in memory.
    Code(String),
    /// Path of a file whose contents are the template code.
    File(PathBuf),
    /// Deferred code supplier.
    Producer(Producer),
}

impl TemplateTarget {
    /// Inline code target.
    pub fn code(code: impl Into<String>) -> Self {
        TemplateTarget::Code(code.into())
    }

    /// File target.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        TemplateTarget::File(path.into())
    }

    /// Returns the inline code, if this is a code target.
    pub fn as_code(&self) -> Option<&str> {
        match self {
            TemplateTarget::Code(code) => Some(code),
            _ => None,
        }
    }

    /// Returns the file path, if this is a file target.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            TemplateTarget::File(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the producer, if this is a producer target.
    pub fn as_producer(&self) -> Option<&Producer> {
        match self {
            TemplateTarget::Producer(producer) => Some(producer),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TemplateTarget::Code(_) => "code",
            TemplateTarget::File(_) => "file",
            TemplateTarget::Producer(_) => "producer",
        }
    }
}

impl From<PathBuf> for TemplateTarget {
    fn from(path: PathBuf) -> Self {
        TemplateTarget::File(path)
    }
}

impl From<&Path> for TemplateTarget {
    fn from(path: &Path) -> Self {
        TemplateTarget::File(path.to_path_buf())
    }
}

impl From<Producer> for TemplateTarget {
    fn from(producer: Producer) -> Self {
        TemplateTarget::Producer(producer)
    }
}

/// One registered origin for a template name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    /// Override priority; higher wins.
    pub weight: i32,
    /// Engine used to render this source.
    pub engine: String,
    /// Where the code comes from.
    pub target: TemplateTarget,
}

/// A template name resolved to concrete code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    /// Engine declared by the active source
    pub engine: String,
    /// The template code
    pub code: String,
}

/// Registry mapping template names to weighted sources.
pub struct TemplateRegistry {
    default_engine: String,
    templates: RwLock<HashMap<String, Vec<TemplateSource>>>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    ///
    /// Sources registered without an engine are assigned `default_engine`.
    pub fn new(default_engine: impl Into<String>) -> Self {
        Self {
            default_engine: default_engine.into(),
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// The engine assigned to sources registered without one.
    pub fn default_engine(&self) -> &str {
        &self.default_engine
    }

    /// Adds a source for `name`.
    ///
    /// The name's sources are re-sorted ascending by weight. The sort is
    /// stable, so a new source lands after existing sources of equal weight.
    pub fn register(
        &self,
        name: impl Into<String>,
        target: impl Into<TemplateTarget>,
        weight: i32,
        engine: Option<&str>,
    ) {
        let name = name.into();
        let source = TemplateSource {
            weight,
            engine: engine.unwrap_or(&self.default_engine).to_string(),
            target: target.into(),
        };
        debug!(
            template = %name,
            engine = %source.engine,
            weight,
            kind = source.target.kind(),
            "registering template source"
        );

        let mut templates = write_lock(&self.templates);
        let sources = templates.entry(name).or_default();
        sources.push(source);
        sources.sort_by_key(|s| s.weight);
    }

    /// Returns true if at least one source is registered for `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        read_lock(&self.templates)
            .get(name)
            .is_some_and(|sources| !sources.is_empty())
    }

    /// Removes sources for `name`.
    ///
    /// Without a target every source is dropped. With a target, each source
    /// whose payload equals it is removed and the rest keep their order. A
    /// name left with no sources is removed entirely.
    pub fn unregister(&self, name: &str, target: Option<&TemplateTarget>) {
        let mut templates = write_lock(&self.templates);
        let Some(target) = target else {
            debug!(template = %name, "unregistering all template sources");
            templates.remove(name);
            return;
        };

        if let Some(sources) = templates.get_mut(name) {
            let before = sources.len();
            sources.retain(|s| &s.target != target);
            debug!(
                template = %name,
                removed = before - sources.len(),
                "unregistering matching template sources"
            );
            if sources.is_empty() {
                templates.remove(name);
            }
        }
    }

    /// Returns the sources for `name`, lowest weight first.
    ///
    /// Unknown names yield an empty list.
    pub fn list(&self, name: &str) -> Vec<TemplateSource> {
        read_lock(&self.templates)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns a copy of every name and its sources.
    pub fn all(&self) -> HashMap<String, Vec<TemplateSource>> {
        read_lock(&self.templates).clone()
    }

    /// Returns all registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = read_lock(&self.templates).keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the source that resolution would use for `name`.
    pub fn active(&self, name: &str) -> Option<TemplateSource> {
        read_lock(&self.templates)
            .get(name)
            .and_then(|sources| sources.last().cloned())
    }

    /// Resolves `name` to its engine and code.
    ///
    /// Inline code is returned directly, files are read, and producers are
    /// awaited. File and producer failures are returned as-is.
    ///
    /// # Errors
    ///
    /// Returns [`TemplatingError::UnknownTemplate`] if nothing is registered
    /// under `name`.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedTemplate> {
        let source = self
            .active(name)
            .ok_or_else(|| TemplatingError::unknown_template(name))?;
        trace!(
            template = %name,
            engine = %source.engine,
            kind = source.target.kind(),
            "resolving template"
        );

        let code = match &source.target {
            TemplateTarget::Code(code) => code.clone(),
            TemplateTarget::File(path) => tokio::fs::read_to_string(path).await?,
            TemplateTarget::Producer(producer) => {
                let req = ProduceRequest {
                    name: name.to_string(),
                    weight: source.weight,
                    engine: source.engine.clone(),
                };
                producer
                    .produce(req)
                    .await
                    .map_err(TemplatingError::Producer)?
            }
        };

        Ok(ResolvedTemplate {
            engine: source.engine,
            code,
        })
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("default_engine", &self.default_engine)
            .field("templates", &*read_lock(&self.templates))
            .finish()
    }
}
