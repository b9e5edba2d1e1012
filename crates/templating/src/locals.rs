//! Default variables merged into every render.
//!
//! A local is either a static JSON value or a dynamic value computed on each
//! render. Dynamic locals are evaluated once per render call, before the
//! render arguments are merged over them, so every template in that render
//! (including nested ones) sees the same value.
//!
//! ```rust
//! use serde_json::json;
//! use templating::LocalsStore;
//!
//! let store = LocalsStore::new();
//! store.insert("site", json!("Docs"));
//! store.insert_dynamic("answer", || json!(42));
//!
//! let resolved = store.resolve();
//! assert_eq!(resolved["site"], json!("Docs"));
//! assert_eq!(resolved["answer"], json!(42));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::util::{read_lock, write_lock};

/// The evaluated variable set handed to engines.
pub type Locals = Map<String, Value>;

/// Name of the built-in timestamp local.
pub const NOW_LOCAL: &str = "now";

/// A stored local variable.
#[derive(Clone)]
pub enum LocalValue {
    /// A fixed value.
    Static(Value),
    /// A value computed every time locals are resolved.
    Dynamic(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl LocalValue {
    /// Creates a dynamic local from a closure.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        LocalValue::Dynamic(Arc::new(f))
    }

    /// Produces the value this local contributes to a render.
    pub fn resolve(&self) -> Value {
        match self {
            LocalValue::Static(value) => value.clone(),
            LocalValue::Dynamic(f) => f(),
        }
    }

    /// Returns true if the value is recomputed on each render.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, LocalValue::Dynamic(_))
    }
}

impl fmt::Debug for LocalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            LocalValue::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<Value> for LocalValue {
    fn from(value: Value) -> Self {
        LocalValue::Static(value)
    }
}

/// Returns the current time as an RFC 3339 string.
pub fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

/// Thread-safe map of local variables.
#[derive(Default)]
pub struct LocalsStore {
    values: RwLock<HashMap<String, LocalValue>>,
}

impl LocalsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the built-in `now` local.
    pub fn with_builtins() -> Self {
        let store = Self::new();
        store.insert_local(NOW_LOCAL, LocalValue::dynamic(now));
        store
    }

    /// Sets a static local, replacing any previous value.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.insert_local(name, LocalValue::Static(value.into()));
    }

    /// Sets a dynamic local, replacing any previous value.
    pub fn insert_dynamic<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.insert_local(name, LocalValue::dynamic(f));
    }

    /// Sets a local of either kind.
    pub fn insert_local(&self, name: impl Into<String>, value: LocalValue) {
        write_lock(&self.values).insert(name.into(), value);
    }

    /// Removes a local. Absent names are ignored.
    pub fn remove(&self, name: &str) {
        write_lock(&self.values).remove(name);
    }

    /// Returns the stored definition of a local.
    pub fn get(&self, name: &str) -> Option<LocalValue> {
        read_lock(&self.values).get(name).cloned()
    }

    /// Returns a copy of every stored definition.
    pub fn snapshot(&self) -> HashMap<String, LocalValue> {
        read_lock(&self.values).clone()
    }

    /// Evaluates every local into a fresh variable set.
    pub fn resolve(&self) -> Locals {
        // Evaluate outside the lock so dynamic locals may touch the store.
        let snapshot = self.snapshot();
        snapshot
            .into_iter()
            .map(|(name, value)| {
                let resolved = value.resolve();
                (name, resolved)
            })
            .collect()
    }
}

impl fmt::Debug for LocalsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(read_lock(&self.values).iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_insert_and_update() {
        let store = LocalsStore::new();
        store.insert("test", true);
        assert_eq!(store.resolve()["test"], json!(true));

        store.insert("test", "hello");
        assert_eq!(store.resolve()["test"], json!("hello"));
    }

    #[test]
    fn test_remove() {
        let store = LocalsStore::new();
        store.insert("test", true);
        store.remove("test");
        store.remove("never-set");
        assert!(store.get("test").is_none());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_dynamic_local_evaluated_per_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let store = LocalsStore::new();
        store.insert_dynamic("tick", move || json!(counter.fetch_add(1, Ordering::SeqCst)));

        assert_eq!(store.resolve()["tick"], json!(0));
        assert_eq!(store.resolve()["tick"], json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_builtins_include_now() {
        let store = LocalsStore::with_builtins();
        let local = store.get(NOW_LOCAL).unwrap();
        assert!(local.is_dynamic());

        let value = store.resolve()[NOW_LOCAL].clone();
        let stamp = value.as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = LocalsStore::new();
        store.insert("a", 1);
        let mut snapshot = store.snapshot();
        snapshot.insert("b".into(), LocalValue::from(json!(2)));
        assert!(store.get("b").is_none());
    }
}
