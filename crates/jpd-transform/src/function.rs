//! User-supplied transform functions
//!
//! Mappings can name a function by path. The path is resolved once through a
//! [`FunctionLoader`] and the result cached for the lifetime of the registry.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// A pure function from the record view to any JSON value
pub type TransformFn = Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Resolves a function path to a callable
pub trait FunctionLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<TransformFn>;
}

/// Loader backed by functions registered in code.
#[derive(Default, Clone)]
pub struct BuiltinFunctions {
    functions: HashMap<String, TransformFn>,
}

impl BuiltinFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under `path`, replacing any previous entry.
    pub fn register<F>(&mut self, path: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(path.into(), Arc::new(f));
        self
    }
}

impl FunctionLoader for BuiltinFunctions {
    fn load(&self, path: &str) -> Result<TransformFn> {
        self.functions
            .get(path)
            .cloned()
            .ok_or_else(|| Error::FunctionLoad {
                path: path.to_string(),
                reason: "no function registered at this path".to_string(),
            })
    }
}

/// Caching front for a [`FunctionLoader`].
///
/// Successful loads are cached by path. Failed loads are not cached, so a
/// loader that recovers is picked up on the next call.
pub struct FunctionRegistry {
    loader: Box<dyn FunctionLoader>,
    cache: RwLock<HashMap<String, TransformFn>>,
}

impl FunctionRegistry {
    pub fn new(loader: impl FunctionLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `path`, loading it on first use.
    pub fn get(&self, path: &str) -> Result<TransformFn> {
        if let Ok(cache) = self.cache.read()
            && let Some(f) = cache.get(path)
        {
            return Ok(f.clone());
        }

        let f = self.loader.load(path)?;
        tracing::debug!(path, "Loaded transform function");
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(path.to_string(), f.clone());
        }
        Ok(f)
    }

    /// Load and invoke the function at `path`.
    pub fn call(&self, path: &str, record: &Value) -> Result<Value> {
        let f = self.get(path)?;
        f(record).map_err(|message| Error::FunctionFailed {
            path: path.to_string(),
            message,
        })
    }

    /// Number of functions currently cached.
    pub fn cached(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new(BuiltinFunctions::new())
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("cached", &self.cached())
            .finish()
    }
}
