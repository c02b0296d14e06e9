//! Argument converters and the key-indexed converter registry.
//!
//! A converter maps one raw token to zero or more typed values, or reports a
//! [`ConversionFailure`]. Unparseable input is an ordinary outcome, never a
//! panic. The dispatcher only asks converters whether a token is acceptable;
//! actions perform the real conversion when they read a bound part through
//! [`CommandValue`](crate::CommandValue).
//!
//! [`ConverterRegistry::with_defaults`] binds the built-in set: `String`, the
//! signed integers, `f32`, `f64`, `char` and `bool`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::error::{Error, Result};
use crate::inject::InjectedValueAccess;
use crate::key::{AnyKey, Key};

/// Explanation of why a token could not be converted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConversionFailure {
    message: String,
}

impl ConversionFailure {
    /// Create a failure with a human-readable reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The reason.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of a conversion: the ordered values, or why there are none.
pub type ConversionResult<T> = std::result::Result<Vec<T>, ConversionFailure>;

/// Converts user input into values of type `T`.
pub trait ArgumentConverter<T>: Send + Sync {
    /// Convert `argument`, possibly consulting injected values.
    fn convert(&self, argument: &str, context: &dyn InjectedValueAccess) -> ConversionResult<T>;

    /// Describe acceptable input, for display to the user.
    fn describe_acceptable_arguments(&self) -> String;

    /// Completion candidates for partial input. Never used during dispatch.
    fn suggestions(&self, _input: &str) -> Vec<String> {
        Vec::new()
    }
}

// ============================================================================
// Type erasure
// ============================================================================

trait ErasedConverter: Send + Sync {
    fn accepts(&self, argument: &str, context: &dyn InjectedValueAccess) -> bool;
    fn describe(&self) -> String;
    fn suggestions(&self, input: &str) -> Vec<String>;
    fn as_any(&self) -> &dyn Any;
}

struct Typed<T: 'static>(Arc<dyn ArgumentConverter<T>>);

impl<T: 'static> ErasedConverter for Typed<T> {
    fn accepts(&self, argument: &str, context: &dyn InjectedValueAccess) -> bool {
        self.0.convert(argument, context).is_ok()
    }

    fn describe(&self) -> String {
        self.0.describe_acceptable_arguments()
    }

    fn suggestions(&self, input: &str) -> Vec<String> {
        self.0.suggestions(input)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Maps keys to converters. Last registration for a key wins.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<AnyKey, Arc<dyn ErasedConverter>>,
}

impl ConverterRegistry {
    /// Create a registry with no converters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in converters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Key::<String>::of(), StringConverter);
        registry.register(Key::<i8>::of(), FromStrConverter::<i8>::integer());
        registry.register(Key::<i16>::of(), FromStrConverter::<i16>::integer());
        registry.register(Key::<i32>::of(), FromStrConverter::<i32>::integer());
        registry.register(Key::<i64>::of(), FromStrConverter::<i64>::integer());
        registry.register(Key::<f32>::of(), FromStrConverter::<f32>::new("any number"));
        registry.register(Key::<f64>::of(), FromStrConverter::<f64>::new("any number"));
        registry.register(
            Key::<char>::of(),
            FromStrConverter::<char>::new("any single character"),
        );
        registry.register(Key::<bool>::of(), BoolConverter);
        registry
    }

    /// Bind `converter` to `key`, replacing any previous binding.
    pub fn register<T: 'static>(
        &mut self,
        key: Key<T>,
        converter: impl ArgumentConverter<T> + 'static,
    ) {
        self.register_arc(key, Arc::new(converter));
    }

    /// Bind an already shared converter to `key`.
    pub fn register_arc<T: 'static>(&mut self, key: Key<T>, converter: Arc<dyn ArgumentConverter<T>>) {
        log::debug!("Registering converter for {key}");
        self.converters
            .insert(key.into(), Arc::new(Typed(converter)));
    }

    /// The converter bound to `key`.
    pub fn get<T: 'static>(&self, key: &Key<T>) -> Option<Arc<dyn ArgumentConverter<T>>> {
        self.converters
            .get(key.as_any())?
            .as_any()
            .downcast_ref::<Typed<T>>()
            .map(|typed| Arc::clone(&typed.0))
    }

    /// Whether a converter is bound to `key`.
    pub fn contains(&self, key: &AnyKey) -> bool {
        self.converters.contains_key(key)
    }

    /// Every bound key.
    pub fn keys(&self) -> impl Iterator<Item = &AnyKey> {
        self.converters.keys()
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Whether no converters are bound.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Whether the converter for `key` accepts `argument`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingConverter`] if nothing is bound to `key`.
    pub fn accepts(
        &self,
        key: &AnyKey,
        argument: &str,
        context: &dyn InjectedValueAccess,
    ) -> Result<bool> {
        let converter = self
            .converters
            .get(key)
            .ok_or_else(|| Error::MissingConverter { key: key.clone() })?;
        Ok(converter.accepts(argument, context))
    }

    /// Acceptable-input description for `key`.
    pub fn describe(&self, key: &AnyKey) -> Option<String> {
        self.converters.get(key).map(|c| c.describe())
    }

    /// Completion candidates for `input` from the converter for `key`.
    pub fn suggestions(&self, key: &AnyKey, input: &str) -> Vec<String> {
        self.converters
            .get(key)
            .map(|c| c.suggestions(input))
            .unwrap_or_default()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.converters.keys()).finish()
    }
}

// ============================================================================
// Built-in converters
// ============================================================================

/// Accepts any token as itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringConverter;

impl ArgumentConverter<String> for StringConverter {
    fn convert(&self, argument: &str, _context: &dyn InjectedValueAccess) -> ConversionResult<String> {
        Ok(vec![argument.to_string()])
    }

    fn describe_acceptable_arguments(&self) -> String {
        "any string".to_string()
    }
}

/// Converts through the type's [`FromStr`] implementation.
pub struct FromStrConverter<T> {
    description: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrConverter<T> {
    /// Create a converter described by `description`.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            _marker: PhantomData,
        }
    }
}

impl<T: Bounded> FromStrConverter<T> {
    /// Integer converter whose description names the type's range.
    pub fn integer() -> Self {
        Self::new(format!(
            "any integer between {} and {}",
            T::MIN_TEXT,
            T::MAX_TEXT
        ))
    }
}

impl<T> ArgumentConverter<T> for FromStrConverter<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn convert(&self, argument: &str, _context: &dyn InjectedValueAccess) -> ConversionResult<T> {
        argument
            .parse::<T>()
            .map(|value| vec![value])
            .map_err(|e| ConversionFailure::new(format!("{e} (expected {})", self.description)))
    }

    fn describe_acceptable_arguments(&self) -> String {
        self.description.clone()
    }
}

/// Integer types with printable bounds.
pub trait Bounded {
    /// Smallest value, as text.
    const MIN_TEXT: &'static str;
    /// Largest value, as text.
    const MAX_TEXT: &'static str;
}

macro_rules! bounded {
    ($($t:ty => $min:literal, $max:literal;)*) => {
        $(impl Bounded for $t {
            const MIN_TEXT: &'static str = $min;
            const MAX_TEXT: &'static str = $max;
        })*
    };
}

bounded! {
    i8 => "-128", "127";
    i16 => "-32768", "32767";
    i32 => "-2147483648", "2147483647";
    i64 => "-9223372036854775808", "9223372036854775807";
}

/// Accepts `true/false`, `yes/no` and `on/off`, case-insensitively.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoolConverter;

const TRUE_WORDS: &[&str] = &["true", "yes", "on"];
const FALSE_WORDS: &[&str] = &["false", "no", "off"];

impl ArgumentConverter<bool> for BoolConverter {
    fn convert(&self, argument: &str, _context: &dyn InjectedValueAccess) -> ConversionResult<bool> {
        let lower = argument.to_ascii_lowercase();
        if TRUE_WORDS.contains(&lower.as_str()) {
            Ok(vec![true])
        } else if FALSE_WORDS.contains(&lower.as_str()) {
            Ok(vec![false])
        } else {
            Err(ConversionFailure::new(format!("'{argument}' is not a boolean")))
        }
    }

    fn describe_acceptable_arguments(&self) -> String {
        "true or false".to_string()
    }

    fn suggestions(&self, input: &str) -> Vec<String> {
        let lower = input.to_ascii_lowercase();
        ["true", "false"]
            .iter()
            .filter(|word| word.starts_with(&lower))
            .map(|word| word.to_string())
            .collect()
    }
}
