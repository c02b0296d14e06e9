//! The command manager: registration and dispatch entry point.
//!
//! A [`CommandManager`] owns the root command registry, the converter
//! registry and the plan cache. Share it between threads behind an `Arc`;
//! every method takes `&self`.
//!
//! Both registries sit behind one reader/writer lock. Registration takes the
//! write side. A dispatch takes the read side only long enough to resolve the
//! root command and snapshot the converters, then releases it before parsing.
//! Commands are immutable and a converter registration replaces the shared
//! map instead of mutating it, so a dispatch never sees a registration half
//! applied. Actions may register on, or dispatch through, the manager that is
//! running them.
//!
//! # Example
//!
//! ```
//! use tenon_core::{Command, CommandArgument, CommandManager, InjectedValueStore, Key};
//!
//! let count = CommandArgument::builder("count", "How many")
//!     .of_type(Key::<i32>::of())
//!     .build();
//! let read = count.clone();
//! let manager = CommandManager::new();
//! manager
//!     .register(
//!         Command::builder("repeat")
//!             .part(count)
//!             .action(move |params| Ok(params.value(&read).as_single(&Key::<i32>::of())?))
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let status = manager
//!     .execute(&InjectedValueStore::new(), &["repeat", "3"])
//!     .unwrap();
//! assert_eq!(status, 3);
//! ```

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::command::Command;
use crate::config::ManagerConfig;
use crate::converter::{ArgumentConverter, ConverterRegistry};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::inject::{InjectedValueAccess, MemoizingValueAccess};
use crate::key::{AnyKey, Key};
use crate::plan::{CommandPlan, PlanCache};
use crate::registry::CommandRegistry;

#[derive(Debug)]
struct ManagerState {
    commands: CommandRegistry,
    converters: Arc<ConverterRegistry>,
}

/// Registers commands and dispatches token sequences to them.
#[derive(Debug)]
pub struct CommandManager {
    state: RwLock<ManagerState>,
    plans: PlanCache,
}

impl CommandManager {
    /// A manager with the built-in converters and default configuration.
    pub fn new() -> Self {
        Self::with_config(&ManagerConfig::default())
    }

    /// A manager with the built-in converters, configured by `config`.
    pub fn with_config(config: &ManagerConfig) -> Self {
        log::debug!(
            "Creating command manager (plan cache capacity {})",
            config.plan_cache_capacity
        );
        Self {
            state: RwLock::new(ManagerState {
                commands: CommandRegistry::new(),
                converters: Arc::new(ConverterRegistry::with_defaults()),
            }),
            plans: PlanCache::new(config.plan_cache_capacity),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ManagerState>> {
        self.state
            .read()
            .map_err(|e| Error::operation(format!("Lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ManagerState>> {
        self.state
            .write()
            .map_err(|e| Error::operation(format!("Lock poisoned: {e}")))
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a root command under its name and aliases.
    ///
    /// The plans of the command and of every nested sub-command are built
    /// first, so a malformed layout is rejected before the command becomes
    /// reachable.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] for a malformed layout anywhere in the tree,
    /// [`Error::DuplicateName`] if a name or alias is taken. Nothing is bound
    /// on error.
    pub fn register(&self, command: Arc<Command>) -> Result<()> {
        self.plans.validate_tree(&command)?;
        let mut state = self.write()?;
        state.commands.register(command)
    }

    /// Bind `converter` to `key`. The last registration for a key wins.
    pub fn register_converter<T: 'static>(
        &self,
        key: Key<T>,
        converter: impl ArgumentConverter<T> + 'static,
    ) -> Result<()> {
        let mut state = self.write()?;
        // Copy on write: in-flight dispatches keep their snapshot.
        Arc::make_mut(&mut state.converters).register(key, converter);
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// The converter bound to `key`.
    pub fn converter<T: 'static>(&self, key: &Key<T>) -> Result<Option<Arc<dyn ArgumentConverter<T>>>> {
        Ok(self.read()?.converters.get(key))
    }

    /// Every key with a bound converter.
    pub fn converter_keys(&self) -> Result<Vec<AnyKey>> {
        Ok(self.read()?.converters.keys().cloned().collect())
    }

    /// The root command bound to `name`.
    pub fn command(&self, name: &str) -> Result<Option<Arc<Command>>> {
        Ok(self.read()?.commands.get(name).cloned())
    }

    /// Every distinct root command, ordered by name.
    pub fn all_commands(&self) -> Result<Vec<Arc<Command>>> {
        Ok(self.read()?.commands.all())
    }

    // ========================================================================
    // Plans
    // ========================================================================

    /// The parse plan for `command`, built if not cached.
    pub fn plan(&self, command: &Command) -> Result<Arc<CommandPlan>> {
        self.plans.get(command)
    }

    /// Drop the cached plan of `command`. It is rebuilt on next use.
    pub fn evict_plan(&self, command: &Command) -> bool {
        self.plans.evict(command)
    }

    /// Drop every cached plan.
    pub fn clear_plan_cache(&self) {
        self.plans.clear();
    }

    /// Number of cached plans.
    pub fn cached_plans(&self) -> usize {
        self.plans.len()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Execute a token sequence. The first token selects the root command;
    /// the rest are dispatched to it.
    ///
    /// Injected-value lookups are memoized for the duration of the call.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchCommand`] if the first token is missing or unbound,
    /// otherwise whatever the dispatch raises: a usage error, a failed
    /// condition, a missing converter or the action's own failure.
    pub fn execute<S: AsRef<str>>(
        &self,
        context: &dyn InjectedValueAccess,
        args: &[S],
    ) -> Result<i32> {
        let Some((name, rest)) = args.split_first() else {
            return Err(Error::NoSuchCommand {
                name: String::new(),
            });
        };
        let name = name.as_ref();
        let rest: Vec<String> = rest.iter().map(|s| s.as_ref().to_string()).collect();

        let (root, converters) = {
            let state = self.read()?;
            let root = state.commands.get(name).cloned();
            (root, Arc::clone(&state.converters))
        };
        let root = root.ok_or_else(|| Error::NoSuchCommand {
            name: name.to_string(),
        })?;

        let context = MemoizingValueAccess::wrap(context);
        Dispatcher::new(&converters, &self.plans, &context).dispatch(name, root, &rest)
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}
