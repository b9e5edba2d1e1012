//! Nested template loading for engines.
//!
//! Engines that support includes resolve the included name through a
//! [`TemplateLoader`], which goes back to the same [`TemplateRegistry`] the
//! render started from. Two calling conventions are offered over one
//! asynchronous resolver:
//!
//! - [`TemplateLoader::load`]: the normal, non-blocking future.
//! - [`TemplateLoader::load_blocking`]: a compatibility shim for engine
//!   internals that call their loader from synchronous code and cannot be
//!   made async. It blocks the calling thread for at most the configured
//!   timeout and then fails with [`TemplatingError::LoadTimeout`].
//!
//! Prefer [`load`](TemplateLoader::load) wherever the caller can await.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{trace, warn};

use super::registry::{ResolvedTemplate, TemplateRegistry};
use crate::error::{Result, TemplatingError};

/// Resolves nested templates by name on behalf of an engine.
#[derive(Clone)]
pub struct TemplateLoader {
    registry: Arc<TemplateRegistry>,
    timeout: Duration,
    handle: Option<Handle>,
}

impl TemplateLoader {
    /// Creates a loader over `registry`.
    ///
    /// The current tokio runtime, if any, is captured so that
    /// [`load_blocking`](Self::load_blocking) can run resolution on it from
    /// threads outside the runtime.
    pub fn new(registry: Arc<TemplateRegistry>, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            handle: Handle::try_current().ok(),
        }
    }

    /// The wall-clock budget of [`load_blocking`](Self::load_blocking).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The registry nested names are resolved against.
    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Resolves `name` to its engine and code.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedTemplate> {
        trace!(template = %name, "loading nested template");
        self.registry.resolve(name).await
    }

    /// Resolves `name` to its code.
    pub async fn load(&self, name: &str) -> Result<String> {
        self.resolve(name).await.map(|resolved| resolved.code)
    }

    /// Resolves `name` to its code, blocking the current thread.
    ///
    /// Resolution runs on the captured runtime (or, with none available, on
    /// a private current-thread runtime). The wait is bounded by
    /// [`timeout`](Self::timeout); calling this from the only worker of a
    /// current-thread runtime therefore fails with a timeout instead of
    /// hanging.
    ///
    /// # Errors
    ///
    /// Returns [`TemplatingError::LoadTimeout`] when the budget is exhausted,
    /// or whatever resolution itself failed with.
    pub fn load_blocking(&self, name: &str) -> Result<String> {
        let handle = self.handle.clone().or_else(|| Handle::try_current().ok());
        match handle {
            Some(handle) => self.load_on_handle(&handle, name),
            None => self.load_on_private_runtime(name),
        }
    }

    fn load_on_handle(&self, handle: &Handle, name: &str) -> Result<String> {
        let (tx, rx) = mpsc::sync_channel(1);
        let loader = self.clone();
        let owned = name.to_string();
        handle.spawn(async move {
            let result = loader.load(&owned).await;
            // The receiver is gone once the caller has timed out.
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out(name)),
            Err(RecvTimeoutError::Disconnected) => Err(TemplatingError::Io(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                format!("resolution of template \"{}\" was cancelled", name),
            ))),
        }
    }

    fn load_on_private_runtime(&self, name: &str) -> Result<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime
            .block_on(async { tokio::time::timeout(self.timeout, self.load(name)).await })
            .unwrap_or_else(|_| Err(self.timed_out(name)))
    }

    fn timed_out(&self, name: &str) -> TemplatingError {
        warn!(template = %name, timeout = ?self.timeout, "blocking template load timed out");
        TemplatingError::LoadTimeout {
            name: name.to_string(),
            timeout: self.timeout,
        }
    }
}

impl fmt::Debug for TemplateLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateLoader")
            .field("timeout", &self.timeout)
            .field("has_runtime", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Producer, TemplateTarget};

    fn registry() -> Arc<TemplateRegistry> {
        let registry = TemplateRegistry::new("jinja");
        registry.register("inner", TemplateTarget::code("Hello {{ name }}"), 0, None);
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_load_async() {
        let loader = TemplateLoader::new(registry(), Duration::from_secs(1));
        assert_eq!(loader.load("inner").await.unwrap(), "Hello {{ name }}");
        assert!(loader.load("missing").await.unwrap_err().is_unknown_template());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_load_blocking_from_blocking_thread() {
        let loader = TemplateLoader::new(registry(), Duration::from_secs(1));
        let code = tokio::task::spawn_blocking(move || loader.load_blocking("inner"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code, "Hello {{ name }}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_load_blocking_unknown_is_not_timeout() {
        let loader = TemplateLoader::new(registry(), Duration::from_secs(1));
        let err = tokio::task::spawn_blocking(move || loader.load_blocking("missing"))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_unknown_template());
        assert!(!err.is_timeout());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_load_blocking_times_out() {
        let registry = registry();
        registry.register(
            "slow",
            Producer::new(|_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }),
            0,
            None,
        );

        let loader = TemplateLoader::new(registry, Duration::from_millis(50));
        let err = tokio::task::spawn_blocking(move || loader.load_blocking("slow"))
            .await
            .unwrap()
            .unwrap_err();
        match err {
            TemplatingError::LoadTimeout { name, timeout } => {
                assert_eq!(name, "slow");
                assert_eq!(timeout, Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_load_blocking_without_runtime() {
        let loader = TemplateLoader::new(registry(), Duration::from_secs(1));
        assert_eq!(loader.load_blocking("inner").unwrap(), "Hello {{ name }}");
    }

    #[test]
    fn test_load_blocking_on_current_thread_worker_times_out() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = runtime.block_on(async {
            let loader = TemplateLoader::new(registry(), Duration::from_millis(50));
            // The only worker is blocked, so the spawned resolution cannot run.
            loader.load_blocking("inner")
        });
        assert!(err.unwrap_err().is_timeout());
    }
}
