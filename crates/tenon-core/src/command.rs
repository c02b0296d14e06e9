//! Command descriptors and the execution path.
//!
//! A [`Command`] is immutable once built: a name, aliases, a description,
//! ordered parts, an action and a run-condition. Commands are shared as
//! `Arc<Command>` so the same descriptor can be registered at the root and
//! nested inside sub-command slots.
//!
//! # Example
//!
//! ```
//! use tenon_core::{Command, CommandArgument, Key};
//!
//! let name = CommandArgument::builder("name", "Who to greet")
//!     .of_type(Key::<String>::of())
//!     .build();
//! let greet = Command::builder("greet")
//!     .alias("hi")
//!     .description("Say hello")
//!     .part(name.clone())
//!     .action(move |params| {
//!         let who = params.value(&name).as_single(&Key::<String>::of())?;
//!         println!("Hello, {who}!");
//!         Ok(0)
//!     })
//!     .build();
//!
//! assert_eq!(greet.name(), "greet");
//! assert_eq!(greet.aliases(), ["hi"]);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::parameters::CommandParameters;
use crate::part::CommandPart;

/// The work a command performs. Returns an integer status.
pub type Action = Arc<dyn Fn(&CommandParameters<'_>) -> anyhow::Result<i32> + Send + Sync>;

/// Predicate deciding whether a command may run.
pub type Condition = Arc<dyn Fn(&CommandParameters<'_>) -> bool + Send + Sync>;

/// Identity of a command, assigned when it is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An immutable command descriptor.
pub struct Command {
    id: CommandId,
    name: String,
    aliases: Vec<String>,
    description: String,
    parts: Vec<CommandPart>,
    action: Action,
    condition: Condition,
}

impl Command {
    /// Start building a command called `name`.
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            parts: Vec::new(),
            action: None,
            condition: None,
        }
    }

    /// The command's identity.
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Primary name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative names.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The primary name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parts in declaration order.
    pub fn parts(&self) -> &[CommandPart] {
        &self.parts
    }

    /// Run the action.
    pub fn run(&self, params: &CommandParameters<'_>) -> anyhow::Result<i32> {
        (self.action)(params)
    }

    /// Evaluate the run-condition.
    pub fn is_satisfied(&self, params: &CommandParameters<'_>) -> bool {
        (self.condition)(params)
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parts", &self.parts)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for [`Command`].
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    parts: Vec<CommandPart>,
    action: Option<Action>,
    condition: Option<Condition>,
}

impl CommandBuilder {
    /// Add an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add several aliases.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a part.
    pub fn part(mut self, part: impl Into<CommandPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    /// Append several parts.
    pub fn parts<I, P>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<CommandPart>,
    {
        self.parts.extend(parts.into_iter().map(Into::into));
        self
    }

    /// Set the action. Without one, the command returns status 0.
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&CommandParameters<'_>) -> anyhow::Result<i32> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Set the run-condition. Without one, the command always may run.
    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&CommandParameters<'_>) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Finish the command.
    ///
    /// The part layout is validated when the command is registered, not here.
    pub fn build(self) -> Arc<Command> {
        Arc::new(Command {
            id: CommandId::next(),
            name: self.name,
            aliases: self.aliases,
            description: self.description,
            parts: self.parts,
            action: self.action.unwrap_or_else(|| Arc::new(no_op)),
            condition: self.condition.unwrap_or_else(|| Arc::new(always)),
        })
    }
}

fn no_op(_: &CommandParameters<'_>) -> anyhow::Result<i32> {
    Ok(0)
}

fn always(_: &CommandParameters<'_>) -> bool {
    true
}

// ============================================================================
// ExecutionPath
// ============================================================================

/// Commands traversed from the root to the current one.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExecutionPath {
    commands: Vec<Arc<Command>>,
}

impl ExecutionPath {
    /// A path holding only `root`.
    pub fn new(root: Arc<Command>) -> Self {
        Self {
            commands: vec![root],
        }
    }

    /// A copy of this path extended by `command`.
    pub fn with(&self, command: Arc<Command>) -> Self {
        let mut commands = self.commands.clone();
        commands.push(command);
        Self { commands }
    }

    /// The traversed commands, root first.
    pub fn commands(&self) -> &[Arc<Command>] {
        &self.commands
    }

    /// The innermost command.
    pub fn last(&self) -> Option<&Arc<Command>> {
        self.commands.last()
    }

    /// Primary names, root first.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// Number of traversed commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command has been traversed.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(" "))
    }
}

impl fmt::Debug for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
