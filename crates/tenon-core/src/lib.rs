//! Tenon Core: multi-level command definition and dispatch.
//!
//! Commands are built once, registered with a [`CommandManager`], and
//! executed against token sequences such as a split command line. The
//! manager owns every piece of shared state, so a process may hold any
//! number of independent managers.
//!
//! # Modules
//!
//! - [`key`]: Typed keys for converters and injected values
//! - [`converter`]: Argument converters and the converter registry
//! - [`part`]: Positional arguments, flags and sub-command slots
//! - [`command`]: Command descriptors and execution paths
//! - [`parameters`]: Per-dispatch value binding handed to actions
//! - [`plan`]: Parse plans and the plan cache
//! - [`registry`]: Name and alias lookup for root commands
//! - [`manager`]: Registration and the dispatch entry point
//! - [`inject`]: Injected-value access
//! - [`config`]: Manager configuration
//! - [`error`]: Error types and Result alias

#![doc = include_str!("../README.md")]

pub mod command;
pub mod config;
pub mod converter;
mod dispatch;
pub mod error;
pub mod inject;
pub mod key;
pub mod manager;
pub mod parameters;
pub mod part;
pub mod plan;
pub mod registry;

// Re-export key types at crate root for convenience
pub use command::{Action, Command, CommandBuilder, CommandId, Condition, ExecutionPath};
pub use config::ManagerConfig;
pub use converter::{
    ArgumentConverter, BoolConverter, ConversionFailure, ConversionResult, ConverterRegistry,
    FromStrConverter, StringConverter,
};
pub use error::{Error, Result, UsageKind};
pub use inject::{InjectedValue, InjectedValueAccess, InjectedValueStore, MemoizingValueAccess};
pub use key::{AnyKey, Key};
pub use manager::CommandManager;
pub use parameters::{CommandMetadata, CommandParameters, CommandValue};
pub use part::{CommandArgument, CommandFlag, CommandPart, Part, PartId, SubCommandPart};
pub use plan::{CommandPlan, PlanCache};
pub use registry::CommandRegistry;
