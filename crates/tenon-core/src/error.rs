//! Error types for Tenon operations.
//!
//! Provides the crate-wide [`Error`] type and [`Result<T>`] alias. Uses
//! `thiserror` for derive macros.
//!
//! Failures fall into four groups:
//!
//! - **Usage**: the tokens do not fit the command's parts ([`UsageKind`]).
//! - **Condition**: a command's run-condition rejected the invocation.
//! - **Execution**: an action failed with something that is not a Tenon error.
//! - **Registration**: duplicate names or a malformed part layout, raised
//!   synchronously by [`CommandManager::register`](crate::CommandManager::register).
//!
//! Dispatch failures carry the [`ExecutionPath`] that was being walked.

use std::fmt;

use thiserror::Error;

use crate::command::ExecutionPath;
use crate::key::AnyKey;

/// Why a token sequence was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsageKind {
    /// Fewer tokens than the required parts need.
    NotEnoughArguments {
        /// Text representation of the first required part left unfilled,
        /// e.g. `<url>` or `<add|remove>`.
        missing: String,
    },
    /// Tokens left over after every positional part was filled.
    TooManyArguments {
        /// The unconsumed tokens, in input order.
        extra: Vec<String>,
    },
    /// A flag character that the command does not declare.
    NoSuchFlag(char),
    /// An argument-accepting flag that is not last in its combined group.
    FlagNotLastInGroup(char),
    /// A sub-command selector that matches no nested command.
    InvalidSubCommand {
        /// The offending token.
        token: String,
        /// Primary names of the valid sub-commands, in declaration order.
        options: Vec<String>,
    },
    /// A required argument whose declared types all rejected the token.
    MissingArgument {
        /// Text representation of the part, e.g. `<count>`.
        part: String,
    },
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughArguments { missing } => {
                write!(f, "Not enough arguments: missing {missing}")
            }
            Self::TooManyArguments { extra } => {
                write!(f, "Too many arguments: {}", extra.join(" "))
            }
            Self::NoSuchFlag(c) => write!(f, "No such flag: -{c}"),
            Self::FlagNotLastInGroup(c) => write!(
                f,
                "Argument-accepting flag -{c} must be at the end of its combined flag group"
            ),
            Self::InvalidSubCommand { token, options } => write!(
                f,
                "Invalid sub-command '{token}'. Options: {}",
                options.join(", ")
            ),
            Self::MissingArgument { part } => write!(f, "Missing argument for {part}"),
        }
    }
}

/// Errors that can occur while registering or dispatching commands.
#[derive(Error, Debug)]
pub enum Error {
    /// The tokens do not match the command's parts.
    #[error("{kind} (in '{path}')")]
    Usage {
        /// What went wrong.
        kind: UsageKind,
        /// Commands traversed up to the failure.
        path: ExecutionPath,
    },

    /// A run-condition evaluated to false.
    #[error("Condition not satisfied for '{path}'")]
    ConditionFailed {
        /// Commands traversed up to the failure.
        path: ExecutionPath,
    },

    /// The first token named no registered command.
    #[error("No such command: '{name}'")]
    NoSuchCommand {
        /// The unresolved name.
        name: String,
    },

    /// An action failed with a non-Tenon error.
    #[error("Error while executing '{path}': {source}")]
    Execution {
        /// The action's failure.
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        /// Commands traversed up to the failing action.
        path: ExecutionPath,
    },

    /// A name or alias is already bound to another command.
    #[error("A command is already registered under '{name}'; existing={existing}, rejected={rejected}")]
    DuplicateName {
        /// The contested name or alias.
        name: String,
        /// Primary name of the command that keeps the binding.
        existing: String,
        /// Primary name of the rejected command.
        rejected: String,
    },

    /// A command's parts violate the layout rules.
    #[error("Invalid part layout for '{command}': {reason}")]
    InvalidLayout {
        /// Primary name of the malformed command.
        command: String,
        /// Which rule was broken.
        reason: String,
    },

    /// A part declares a type with no registered converter.
    #[error("No argument converter for {key}")]
    MissingConverter {
        /// The unbound key.
        key: AnyKey,
    },

    /// A bound token could not be converted when an action read it.
    #[error("Cannot convert '{argument}' for {part}: {message}")]
    Conversion {
        /// Text representation of the part.
        part: String,
        /// The raw token.
        argument: String,
        /// Converter-supplied reason.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal operation failure, such as a poisoned lock.
    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Create a usage error.
    pub fn usage(kind: UsageKind, path: ExecutionPath) -> Self {
        Self::Usage { kind, path }
    }

    /// Create an invalid-layout error.
    pub fn invalid_layout(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLayout {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// The execution path attached to a dispatch failure.
    pub fn execution_path(&self) -> Option<&ExecutionPath> {
        match self {
            Self::Usage { path, .. }
            | Self::ConditionFailed { path }
            | Self::Execution { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The usage kind, if this is a usage error.
    pub fn usage_kind(&self) -> Option<&UsageKind> {
        match self {
            Self::Usage { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Whether this error reports bad input tokens.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }

    /// Whether this error was raised while registering a command.
    pub fn is_registration(&self) -> bool {
        matches!(self, Self::DuplicateName { .. } | Self::InvalidLayout { .. })
    }
}

/// Result type alias using Tenon's Error type.
pub type Result<T> = std::result::Result<T, Error>;
