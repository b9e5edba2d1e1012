//! Registry of named rendering engines.
//!
//! Engines are stored as shared trait objects. Registration checks the
//! candidate's [`Capabilities`] and rejects anything that cannot render; a
//! rejected registration leaves the registry untouched. Registering under an
//! existing name replaces the previous engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::engine::{Capabilities, Engine};
use crate::error::{BoxError, Result, TemplatingError};
use crate::util::{read_lock, write_lock};

/// Display information about a registered engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDescription {
    /// Name the engine is registered under
    pub name: String,
    /// The engine's display title
    pub title: String,
    /// The engine's display description
    pub description: String,
    /// What the engine supports
    pub capabilities: Capabilities,
}

/// Thread-safe map of engine name to engine.
#[derive(Default)]
pub struct EngineRegistry {
    engines: RwLock<HashMap<String, Arc<dyn Engine>>>,
}

impl EngineRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an engine instance under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplatingError::InvalidEngine`] if the name is empty or the
    /// engine reports that it cannot render.
    pub fn register(&self, name: impl Into<String>, engine: Arc<dyn Engine>) -> Result<()> {
        let name = name.into();
        validate(&name, engine.as_ref())?;

        debug!(engine = %name, title = %engine.title(), "registering engine");
        write_lock(&self.engines).insert(name, engine);
        Ok(())
    }

    /// Builds an engine with `factory` and registers it under `name`.
    ///
    /// # Errors
    ///
    /// A failing factory is reported as [`TemplatingError::InvalidEngine`],
    /// as is any engine [`register`](Self::register) would reject.
    pub fn register_with<E, F>(&self, name: impl Into<String>, factory: F) -> Result<()>
    where
        E: Engine + 'static,
        F: FnOnce() -> std::result::Result<E, BoxError>,
    {
        let name = name.into();
        let engine = factory().map_err(|err| TemplatingError::invalid_engine(&name, err.to_string()))?;
        self.register(name, Arc::new(engine))
    }

    /// Returns true if an engine is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        read_lock(&self.engines).contains_key(name)
    }

    /// Removes the engine registered under `name`, if any.
    pub fn unregister(&self, name: &str) {
        if write_lock(&self.engines).remove(name).is_some() {
            debug!(engine = %name, "unregistered engine");
        }
    }

    /// Returns the engine registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Engine>> {
        read_lock(&self.engines).get(name).cloned()
    }

    /// Returns a copy of the name-to-engine map.
    pub fn all(&self) -> HashMap<String, Arc<dyn Engine>> {
        read_lock(&self.engines).clone()
    }

    /// Describes every registered engine, sorted by name.
    pub fn describe(&self) -> Vec<EngineDescription> {
        let mut descriptions: Vec<EngineDescription> = self
            .all()
            .into_iter()
            .map(|(name, engine)| EngineDescription {
                name,
                title: engine.title(),
                description: engine.description(),
                capabilities: engine.capabilities(),
            })
            .collect();
        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }
}

fn validate(name: &str, engine: &dyn Engine) -> Result<()> {
    if name.is_empty() {
        return Err(TemplatingError::invalid_engine(name, "engine name must not be empty"));
    }
    if !engine.capabilities().renders {
        return Err(TemplatingError::invalid_engine(
            name,
            "the candidate does not provide a render operation",
        ));
    }
    Ok(())
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = read_lock(&self.engines).keys().cloned().collect();
        names.sort();
        f.debug_struct("EngineRegistry").field("engines", &names).finish()
    }
}
