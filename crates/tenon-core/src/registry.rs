//! Name-to-command lookup for root commands.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::command::Command;
use crate::error::{Error, Result};

/// Root commands indexed by every name and alias.
///
/// Registration is all-or-nothing: if any of a command's names is taken,
/// none of them are bound.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<Command>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `command` under its name and aliases.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateName`] if a name is already bound, or if the command
    /// lists the same name twice. The registry is unchanged on error.
    pub fn register(&mut self, command: Arc<Command>) -> Result<()> {
        let mut claimed = HashSet::new();
        for name in command.names() {
            if let Some(existing) = self.commands.get(name) {
                log::warn!(
                    "Rejecting command '{}': '{name}' is bound to '{}'",
                    command.name(),
                    existing.name()
                );
                return Err(Error::DuplicateName {
                    name: name.to_string(),
                    existing: existing.name().to_string(),
                    rejected: command.name().to_string(),
                });
            }
            if !claimed.insert(name) {
                log::warn!("Rejecting command '{}': '{name}' listed twice", command.name());
                return Err(Error::DuplicateName {
                    name: name.to_string(),
                    existing: command.name().to_string(),
                    rejected: command.name().to_string(),
                });
            }
        }

        for name in command.names() {
            self.commands.insert(name.to_string(), Arc::clone(&command));
        }
        log::debug!(
            "Registered command '{}' ({} alias(es))",
            command.name(),
            command.aliases().len()
        );
        Ok(())
    }

    /// The command bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<Command>> {
        self.commands.get(name)
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Every distinct command, ordered by primary name.
    pub fn all(&self) -> Vec<Arc<Command>> {
        let mut seen = HashSet::new();
        let mut out: Vec<Arc<Command>> = self
            .commands
            .values()
            .filter(|c| seen.insert(c.id()))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    /// Number of bound names, aliases included.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
