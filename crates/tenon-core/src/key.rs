//! Typed identifiers for converters and injected values.
//!
//! A [`Key<T>`] names a Rust type plus an optional qualifier. Two keys are
//! equal when both the type and the qualifier match, so `Key::<String>::of()`
//! and `Key::<String>::qualified("world")` address different converters.
//!
//! Parts and registries store the type-erased [`AnyKey`]; the typed wrapper
//! exists so callers get their value type back without casting.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Type-erased key: a type tag plus an optional qualifier.
#[derive(Clone, Debug)]
pub struct AnyKey {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<String>,
}

impl AnyKey {
    /// The key's type tag.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Human-readable name of the keyed type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The qualifier, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Whether this key addresses values of type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

// The type name is diagnostic only; identity is the type tag and qualifier.
impl PartialEq for AnyKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl fmt::Display for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}@{}", self.type_name, q),
            None => f.write_str(self.type_name),
        }
    }
}

/// Typed key addressing values of type `T`.
pub struct Key<T> {
    inner: AnyKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Key<T> {
    /// Key for `T` with no qualifier.
    pub fn of() -> Self {
        Self::build(None)
    }

    /// Key for `T` distinguished by `qualifier`.
    pub fn qualified(qualifier: impl Into<String>) -> Self {
        Self::build(Some(qualifier.into()))
    }

    fn build(qualifier: Option<String>) -> Self {
        Self {
            inner: AnyKey {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                qualifier,
            },
            _marker: PhantomData,
        }
    }
}

impl<T> Key<T> {
    /// Borrow the type-erased form.
    pub fn as_any(&self) -> &AnyKey {
        &self.inner
    }

    /// Convert into the type-erased form.
    pub fn erase(&self) -> AnyKey {
        self.inner.clone()
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.inner)
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl<T> From<Key<T>> for AnyKey {
    fn from(key: Key<T>) -> Self {
        key.inner
    }
}

impl<T> From<&Key<T>> for AnyKey {
    fn from(key: &Key<T>) -> Self {
        key.inner.clone()
    }
}
