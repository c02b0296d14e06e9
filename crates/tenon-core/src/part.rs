//! Command parts: the grammar slots a command is composed of.
//!
//! Three kinds exist:
//!
//! - [`CommandArgument`]: a positional argument, required or optional,
//!   single or variable-arity, with optional accepted types and defaults.
//! - [`CommandFlag`]: a single-character flag, either a bare switch or one
//!   that takes the next token as its value.
//! - [`SubCommandPart`]: a slot selecting one of several nested commands.
//!
//! Every part carries a [`PartId`] assigned when it is built. Clones share
//! the id, so an action can keep a clone of its part and read the bound value
//! back through [`CommandParameters`](crate::CommandParameters).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::command::Command;
use crate::key::{AnyKey, Key};

/// Identity of a part. Clones of a part share the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(u64);

impl PartId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Common view over every part kind.
pub trait Part {
    /// The part's identity.
    fn id(&self) -> PartId;

    /// Whether dispatch fails when the part is not supplied.
    fn is_required(&self) -> bool;

    /// Usage-style rendering, such as `<name>` or `-f <value>`.
    fn text_representation(&self) -> String;
}

// ============================================================================
// Positional arguments
// ============================================================================

/// A positional argument.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandArgument {
    id: PartId,
    name: String,
    description: String,
    required: bool,
    variable: bool,
    types: Vec<AnyKey>,
    defaults: Vec<String>,
}

impl CommandArgument {
    /// Start building an argument. Arguments are required by default.
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ArgumentBuilder {
        ArgumentBuilder {
            name: name.into(),
            description: description.into(),
            required: true,
            variable: false,
            types: Vec::new(),
            defaults: Vec::new(),
        }
    }

    /// Argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the argument consumes every remaining positional token.
    pub fn is_variable(&self) -> bool {
        self.variable
    }

    /// Types a token must convert to. Empty means any token is accepted.
    pub fn types(&self) -> &[AnyKey] {
        &self.types
    }

    /// Values bound when the argument is not supplied.
    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }
}

impl Part for CommandArgument {
    fn id(&self) -> PartId {
        self.id
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn text_representation(&self) -> String {
        let dots = if self.variable { "..." } else { "" };
        if self.required {
            format!("<{}{dots}>", self.name)
        } else {
            format!("[{}{dots}]", self.name)
        }
    }
}

/// Builder for [`CommandArgument`].
#[derive(Debug)]
pub struct ArgumentBuilder {
    name: String,
    description: String,
    required: bool,
    variable: bool,
    types: Vec<AnyKey>,
    defaults: Vec<String>,
}

impl ArgumentBuilder {
    /// Make the argument optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Let the argument consume every remaining positional token.
    pub fn variable(mut self) -> Self {
        self.variable = true;
        self
    }

    /// Accept tokens convertible to `T` under `key`.
    pub fn of_type<T>(mut self, key: Key<T>) -> Self {
        self.types.push(key.into());
        self
    }

    /// Bind `defaults` when the argument is not supplied. Implies optional.
    pub fn defaults_to<I, S>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = defaults.into_iter().map(Into::into).collect();
        self.required = false;
        self
    }

    /// Finish the argument.
    pub fn build(self) -> CommandArgument {
        CommandArgument {
            id: PartId::next(),
            name: self.name,
            description: self.description,
            required: self.required,
            variable: self.variable,
            types: self.types,
            defaults: self.defaults,
        }
    }
}

// ============================================================================
// Flags
// ============================================================================

/// The value slot of an argument-accepting flag.
#[derive(Clone, Debug, PartialEq)]
pub struct FlagArgument {
    name: String,
    types: Vec<AnyKey>,
    defaults: Vec<String>,
}

impl FlagArgument {
    /// Name of the value, as shown in usage.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Types the value should convert to.
    pub fn types(&self) -> &[AnyKey] {
        &self.types
    }

    /// Value bound when the flag is not given.
    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }
}

/// A single-character flag.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandFlag {
    id: PartId,
    name: char,
    description: String,
    argument: Option<FlagArgument>,
}

impl CommandFlag {
    /// Start building a flag. Without [`FlagBuilder::argument`] it is a
    /// bare switch.
    pub fn builder(name: char, description: impl Into<String>) -> FlagBuilder {
        FlagBuilder {
            name,
            description: description.into(),
            argument: None,
        }
    }

    /// The flag character.
    pub fn name(&self) -> char {
        self.name
    }

    /// Flag description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The value slot, for argument-accepting flags.
    pub fn argument(&self) -> Option<&FlagArgument> {
        self.argument.as_ref()
    }

    /// Whether the flag consumes the following token.
    pub fn accepts_argument(&self) -> bool {
        self.argument.is_some()
    }

    /// Default value, empty for switches.
    pub fn defaults(&self) -> &[String] {
        self.argument
            .as_ref()
            .map(|a| a.defaults.as_slice())
            .unwrap_or(&[])
    }
}

impl Part for CommandFlag {
    fn id(&self) -> PartId {
        self.id
    }

    fn is_required(&self) -> bool {
        false
    }

    fn text_representation(&self) -> String {
        match &self.argument {
            Some(arg) => format!("-{} <{}>", self.name, arg.name),
            None => format!("-{}", self.name),
        }
    }
}

/// Builder for [`CommandFlag`].
#[derive(Debug)]
pub struct FlagBuilder {
    name: char,
    description: String,
    argument: Option<FlagArgument>,
}

impl FlagBuilder {
    /// Make the flag take a value called `name`.
    pub fn argument(mut self, name: impl Into<String>) -> Self {
        self.value_slot().name = name.into();
        self
    }

    /// Declare a value type. Turns a switch into an argument-accepting flag
    /// named after the flag character if [`argument`](Self::argument) was not called.
    pub fn of_type<T>(mut self, key: Key<T>) -> Self {
        self.value_slot().types.push(key.into());
        self
    }

    /// Default value when the flag is absent.
    pub fn defaults_to<I, S>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_slot().defaults = defaults.into_iter().map(Into::into).collect();
        self
    }

    fn value_slot(&mut self) -> &mut FlagArgument {
        let name = self.name;
        self.argument.get_or_insert_with(|| FlagArgument {
            name: name.to_string(),
            types: Vec::new(),
            defaults: Vec::new(),
        })
    }

    /// Finish the flag.
    pub fn build(self) -> CommandFlag {
        CommandFlag {
            id: PartId::next(),
            name: self.name,
            description: self.description,
            argument: self.argument,
        }
    }
}

// ============================================================================
// Sub-commands
// ============================================================================

/// A slot selecting one nested command. Must be the last part.
#[derive(Clone, Debug, PartialEq)]
pub struct SubCommandPart {
    id: PartId,
    name: String,
    description: String,
    commands: Vec<Arc<Command>>,
    required: bool,
}

impl SubCommandPart {
    /// Start building a slot. Slots are required by default.
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> SubCommandBuilder {
        SubCommandBuilder {
            name: name.into(),
            description: description.into(),
            commands: Vec::new(),
            required: true,
        }
    }

    /// Slot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The nested commands, in declaration order.
    pub fn commands(&self) -> &[Arc<Command>] {
        &self.commands
    }
}

impl Part for SubCommandPart {
    fn id(&self) -> PartId {
        self.id
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn text_representation(&self) -> String {
        let names: Vec<&str> = self.commands.iter().map(|c| c.name()).collect();
        if self.required {
            format!("<{}>", names.join("|"))
        } else {
            format!("[{}]", names.join("|"))
        }
    }
}

/// Builder for [`SubCommandPart`].
#[derive(Debug)]
pub struct SubCommandBuilder {
    name: String,
    description: String,
    commands: Vec<Arc<Command>>,
    required: bool,
}

impl SubCommandBuilder {
    /// Add a nested command.
    pub fn command(mut self, command: Arc<Command>) -> Self {
        self.commands.push(command);
        self
    }

    /// Add several nested commands.
    pub fn commands(mut self, commands: impl IntoIterator<Item = Arc<Command>>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Allow the command to run without selecting a sub-command.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Finish the slot.
    pub fn build(self) -> SubCommandPart {
        SubCommandPart {
            id: PartId::next(),
            name: self.name,
            description: self.description,
            commands: self.commands,
            required: self.required,
        }
    }
}

// ============================================================================
// CommandPart
// ============================================================================

/// Any part of a command.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandPart {
    /// A positional argument.
    Argument(CommandArgument),
    /// A flag.
    Flag(CommandFlag),
    /// A sub-command slot.
    SubCommands(SubCommandPart),
}

impl CommandPart {
    /// Values bound when the part is not supplied.
    pub fn defaults(&self) -> &[String] {
        match self {
            Self::Argument(arg) => arg.defaults(),
            Self::Flag(flag) => flag.defaults(),
            Self::SubCommands(_) => &[],
        }
    }
}

impl Part for CommandPart {
    fn id(&self) -> PartId {
        match self {
            Self::Argument(p) => p.id(),
            Self::Flag(p) => p.id(),
            Self::SubCommands(p) => p.id(),
        }
    }

    fn is_required(&self) -> bool {
        match self {
            Self::Argument(p) => p.is_required(),
            Self::Flag(p) => p.is_required(),
            Self::SubCommands(p) => p.is_required(),
        }
    }

    fn text_representation(&self) -> String {
        match self {
            Self::Argument(p) => p.text_representation(),
            Self::Flag(p) => p.text_representation(),
            Self::SubCommands(p) => p.text_representation(),
        }
    }
}

impl From<CommandArgument> for CommandPart {
    fn from(part: CommandArgument) -> Self {
        Self::Argument(part)
    }
}

impl From<CommandFlag> for CommandPart {
    fn from(part: CommandFlag) -> Self {
        Self::Flag(part)
    }
}

impl From<SubCommandPart> for CommandPart {
    fn from(part: SubCommandPart) -> Self {
        Self::SubCommands(part)
    }
}
