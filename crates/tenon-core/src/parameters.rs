//! The per-dispatch parameter binding handed to conditions and actions.
//!
//! [`CommandParameters`] maps parts to the raw tokens bound to them and
//! records which parts were bound. A part filled from its declared defaults
//! counts as present, the same as one the user supplied. Typed access goes through
//! [`CommandValue`], which converts with the registered converters at read time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::converter::ConverterRegistry;
use crate::error::{Error, Result};
use crate::inject::InjectedValueAccess;
use crate::key::Key;
use crate::part::{Part, PartId};

/// What a command level was invoked with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandMetadata {
    called_name: String,
    arguments: Vec<String>,
}

impl CommandMetadata {
    /// Metadata for a level called as `called_name` with `arguments`.
    pub fn new(called_name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            called_name: called_name.into(),
            arguments,
        }
    }

    /// The name or alias the command was reached by.
    pub fn called_name(&self) -> &str {
        &self.called_name
    }

    /// Raw tokens handed to this level.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

/// Bound values for one dispatch.
pub struct CommandParameters<'a> {
    values: HashMap<PartId, Vec<String>>,
    present: HashSet<PartId>,
    metadata: CommandMetadata,
    converters: &'a ConverterRegistry,
    injected: &'a dyn InjectedValueAccess,
}

impl<'a> CommandParameters<'a> {
    /// Create an empty binding.
    pub fn new(
        converters: &'a ConverterRegistry,
        injected: &'a dyn InjectedValueAccess,
        metadata: CommandMetadata,
    ) -> Self {
        Self {
            values: HashMap::new(),
            present: HashSet::new(),
            metadata,
            converters,
            injected,
        }
    }

    pub(crate) fn set_metadata(&mut self, metadata: CommandMetadata) {
        self.metadata = metadata;
    }

    /// Record that the user supplied a value-less part, such as a switch.
    pub fn mark_present(&mut self, part: PartId) {
        self.present.insert(part);
    }

    /// Bind user-supplied tokens to a part and mark it present.
    pub fn bind(&mut self, part: PartId, values: Vec<String>) {
        self.present.insert(part);
        self.values.insert(part, values);
    }

    /// Bind a part's declared defaults. The part is marked present.
    pub fn bind_default(&mut self, part: PartId, values: Vec<String>) {
        self.bind(part, values);
    }

    /// Whether `part` was bound, from tokens or from its defaults, or is a
    /// switch the user supplied.
    pub fn is_present(&self, part: &impl Part) -> bool {
        self.present.contains(&part.id())
    }

    /// Raw tokens bound to `part`, empty if none.
    pub fn raw_values(&self, part: &impl Part) -> &[String] {
        self.values
            .get(&part.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Typed access to the tokens bound to `part`.
    pub fn value<P: Part>(&self, part: &P) -> CommandValue<'_> {
        CommandValue {
            part: part.text_representation(),
            values: self.raw_values(part),
            converters: self.converters,
            injected: self.injected,
        }
    }

    /// Look up an injected value.
    pub fn injected<T: Send + Sync + 'static>(&self, key: &Key<T>) -> Option<Arc<T>> {
        self.injected.get(key)
    }

    /// The injected-value access for this dispatch.
    pub fn injected_values(&self) -> &dyn InjectedValueAccess {
        self.injected
    }

    /// Converters available to this dispatch.
    pub fn converters(&self) -> &ConverterRegistry {
        self.converters
    }

    /// Metadata of the level being executed.
    pub fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}

impl std::fmt::Debug for CommandParameters<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandParameters")
            .field("values", &self.values)
            .field("present", &self.present)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// The tokens bound to one part, with conversion on demand.
pub struct CommandValue<'p> {
    part: String,
    values: &'p [String],
    converters: &'p ConverterRegistry,
    injected: &'p dyn InjectedValueAccess,
}

impl CommandValue<'_> {
    /// The raw tokens.
    pub fn as_strings(&self) -> &[String] {
        self.values
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert every bound token with the converter for `key`, concatenating
    /// the results in order.
    ///
    /// # Errors
    ///
    /// [`Error::MissingConverter`] if `key` is unbound, [`Error::Conversion`]
    /// if any token is rejected.
    pub fn as_multiple<T: 'static>(&self, key: &Key<T>) -> Result<Vec<T>> {
        let converter = self
            .converters
            .get(key)
            .ok_or_else(|| Error::MissingConverter { key: key.erase() })?;
        let mut out = Vec::with_capacity(self.values.len());
        for argument in self.values {
            let converted =
                converter
                    .convert(argument, self.injected)
                    .map_err(|failure| Error::Conversion {
                        part: self.part.clone(),
                        argument: argument.clone(),
                        message: failure.message().to_string(),
                    })?;
            out.extend(converted);
        }
        Ok(out)
    }

    /// Convert to exactly one value.
    ///
    /// # Errors
    ///
    /// As [`as_multiple`](Self::as_multiple), plus [`Error::Conversion`] when
    /// conversion yields zero or several values.
    pub fn as_single<T: 'static>(&self, key: &Key<T>) -> Result<T> {
        let mut values = self.as_multiple(key)?;
        if values.len() != 1 {
            return Err(Error::Conversion {
                part: self.part.clone(),
                argument: self.values.join(" "),
                message: format!("expected exactly one value, got {}", values.len()),
            });
        }
        values
            .pop()
            .ok_or_else(|| Error::operation("value vanished after length check"))
    }

    /// Convert to at most one value. `None` when nothing is bound.
    pub fn as_optional<T: 'static>(&self, key: &Key<T>) -> Result<Option<T>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.as_single(key).map(Some)
    }
}
