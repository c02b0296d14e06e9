//! Injected values: ambient data read by key instead of from the tokens.
//!
//! A host passes an [`InjectedValueAccess`] to
//! [`CommandManager::execute`](crate::CommandManager::execute). Converters and
//! actions read from it by key.
//! Each dispatch wraps the host's access in a [`MemoizingValueAccess`], so a
//! key is resolved at most once per dispatch however often it is read.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::key::{AnyKey, Key};

/// A shared, type-erased injected value.
pub type InjectedValue = Arc<dyn Any + Send + Sync>;

/// Key-based lookup of ambient values.
pub trait InjectedValueAccess: Send + Sync {
    /// Look up the value bound to `key`, if any.
    fn injected_value(&self, key: &AnyKey) -> Option<InjectedValue>;
}

impl dyn InjectedValueAccess + '_ {
    /// Typed lookup. Returns `None` when the key is unbound or the stored
    /// value is not a `T`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &Key<T>) -> Option<Arc<T>> {
        self.injected_value(key.as_any())?.downcast::<T>().ok()
    }
}

/// A map-backed [`InjectedValueAccess`].
#[derive(Clone, Default)]
pub struct InjectedValueStore {
    values: HashMap<AnyKey, InjectedValue>,
}

impl InjectedValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `key`, replacing any previous binding.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: Key<T>, value: T) {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<T: Send + Sync + 'static>(mut self, key: Key<T>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys are bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl InjectedValueAccess for InjectedValueStore {
    fn injected_value(&self, key: &AnyKey) -> Option<InjectedValue> {
        self.values.get(key).cloned()
    }
}

impl std::fmt::Debug for InjectedValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Caches every lookup against a delegate, including misses.
pub struct MemoizingValueAccess<'a> {
    delegate: &'a dyn InjectedValueAccess,
    cache: Mutex<HashMap<AnyKey, Option<InjectedValue>>>,
}

impl<'a> MemoizingValueAccess<'a> {
    /// Wrap `delegate`.
    pub fn wrap(delegate: &'a dyn InjectedValueAccess) -> Self {
        Self {
            delegate,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl InjectedValueAccess for MemoizingValueAccess<'_> {
    fn injected_value(&self, key: &AnyKey) -> Option<InjectedValue> {
        // A poisoned cache only ever holds completed lookups.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(key.clone())
            .or_insert_with(|| self.delegate.injected_value(key))
            .clone()
    }
}
