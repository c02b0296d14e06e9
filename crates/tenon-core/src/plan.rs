//! Parse plans: per-command metadata derived from the part list.
//!
//! A [`CommandPlan`] flattens a command's parts into what the dispatcher
//! needs: the ordered positional arguments, a character-indexed flag map, a
//! name-indexed sub-command map, the required-part count and the parts that
//! carry defaults. Building a plan also validates the layout:
//!
//! - at most one variable-arity argument, and only as the last argument;
//! - a sub-command slot only as the last part, with at least one command;
//! - no flag character declared twice.
//!
//! Plans are pure functions of their command. [`PlanCache`] memoizes them
//! with a bounded FIFO policy; an evicted plan is rebuilt on the next lookup
//! and compares equal to the one it replaced.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use crate::command::{Command, CommandId};
use crate::error::{Error, Result};
use crate::part::{CommandArgument, CommandFlag, CommandPart, Part, PartId};

/// A part whose default values are bound when the user omits it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefaultedPart {
    id: PartId,
    defaults: Vec<String>,
}

impl DefaultedPart {
    /// The part's id.
    pub fn id(&self) -> PartId {
        self.id
    }

    /// The default values.
    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }
}

/// Immutable parse metadata for one command.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandPlan {
    arguments: Vec<CommandArgument>,
    flags: HashMap<char, CommandFlag>,
    sub_commands: HashMap<String, Arc<Command>>,
    sub_command_names: Vec<String>,
    sub_command_required: bool,
    sub_command_slot: Option<String>,
    required_parts: usize,
    defaulted: Vec<DefaultedPart>,
}

impl CommandPlan {
    /// Derive and validate the plan for `command`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if the parts break a layout rule.
    pub fn build(command: &Command) -> Result<Self> {
        let parts = command.parts();
        let mut plan = Self {
            arguments: Vec::new(),
            flags: HashMap::new(),
            sub_commands: HashMap::new(),
            sub_command_names: Vec::new(),
            sub_command_required: false,
            sub_command_slot: None,
            required_parts: 0,
            defaulted: Vec::new(),
        };

        for (index, part) in parts.iter().enumerate() {
            match part {
                CommandPart::Argument(arg) => plan.arguments.push(arg.clone()),
                CommandPart::Flag(flag) => {
                    if plan.flags.insert(flag.name(), flag.clone()).is_some() {
                        return Err(Error::invalid_layout(
                            command.name(),
                            format!("Flag -{} is declared more than once", flag.name()),
                        ));
                    }
                }
                CommandPart::SubCommands(slot) => {
                    if index + 1 < parts.len() {
                        return Err(Error::invalid_layout(
                            command.name(),
                            "Sub-command must be last part",
                        ));
                    }
                    if slot.commands().is_empty() {
                        return Err(Error::invalid_layout(
                            command.name(),
                            format!("Sub-command part '{}' has no commands", slot.name()),
                        ));
                    }
                    for sub in slot.commands() {
                        for name in sub.names() {
                            plan.sub_commands.insert(name.to_string(), Arc::clone(sub));
                        }
                    }
                    // Only commands still reachable by some name are options.
                    let mut listed: Vec<&Arc<Command>> = Vec::new();
                    for sub in slot.commands() {
                        let reachable = plan.sub_commands.values().any(|c| Arc::ptr_eq(c, sub));
                        if reachable && !listed.iter().any(|c| Arc::ptr_eq(c, sub)) {
                            listed.push(sub);
                            plan.sub_command_names.push(sub.name().to_string());
                        }
                    }
                    plan.sub_command_required = slot.is_required();
                    plan.sub_command_slot = Some(slot.text_representation());
                }
            }
            if part.is_required() {
                plan.required_parts += 1;
            }
            if !part.defaults().is_empty() {
                plan.defaulted.push(DefaultedPart {
                    id: part.id(),
                    defaults: part.defaults().to_vec(),
                });
            }
        }

        let variable: Vec<usize> = plan
            .arguments
            .iter()
            .enumerate()
            .filter(|(_, arg)| arg.is_variable())
            .map(|(index, _)| index)
            .collect();
        if variable.len() > 1 {
            return Err(Error::invalid_layout(
                command.name(),
                "Too many variable arguments",
            ));
        }
        if let Some(&index) = variable.first() {
            if index + 1 != plan.arguments.len() {
                return Err(Error::invalid_layout(
                    command.name(),
                    "Variable argument must be the last argument",
                ));
            }
        }

        log::debug!(
            "Built plan for '{}': {} argument(s), {} flag(s), {} sub-command name(s), {} required",
            command.name(),
            plan.arguments.len(),
            plan.flags.len(),
            plan.sub_commands.len(),
            plan.required_parts
        );
        Ok(plan)
    }

    /// Positional arguments in declaration order.
    pub fn arguments(&self) -> &[CommandArgument] {
        &self.arguments
    }

    /// The flag declared for `c`.
    pub fn flag(&self, c: char) -> Option<&CommandFlag> {
        self.flags.get(&c)
    }

    /// Every declared flag, keyed by character.
    pub fn flags(&self) -> &HashMap<char, CommandFlag> {
        &self.flags
    }

    /// The nested command reached by `name` (a name or alias).
    pub fn sub_command(&self, name: &str) -> Option<&Arc<Command>> {
        self.sub_commands.get(name)
    }

    /// Whether the command has a sub-command slot.
    pub fn has_sub_commands(&self) -> bool {
        !self.sub_commands.is_empty()
    }

    /// Primary names of the nested commands still reachable by a name or
    /// alias, in declaration order.
    pub fn sub_command_names(&self) -> &[String] {
        &self.sub_command_names
    }

    /// Whether a sub-command must be selected.
    pub fn is_sub_command_required(&self) -> bool {
        self.sub_command_required
    }

    /// Text representation of the sub-command slot, e.g. `<add|remove>`.
    pub fn sub_command_slot(&self) -> Option<&str> {
        self.sub_command_slot.as_deref()
    }

    /// Required arguments plus one for a required sub-command slot.
    pub fn required_parts(&self) -> usize {
        self.required_parts
    }

    /// Parts carrying non-empty defaults.
    pub fn defaulted(&self) -> &[DefaultedPart] {
        &self.defaulted
    }

    /// Index of the variable-arity argument, if any.
    pub fn variable_position(&self) -> Option<usize> {
        self.arguments.iter().position(CommandArgument::is_variable)
    }
}

// ============================================================================
// PlanCache
// ============================================================================

/// Bounded memoizing cache of plans, keyed by command identity.
///
/// Lookups build outside the lock, so concurrent misses for one command may
/// build twice; the first insert wins and both results are equal. A
/// capacity of zero disables retention.
#[derive(Debug)]
pub struct PlanCache {
    capacity: usize,
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    plans: HashMap<CommandId, Arc<CommandPlan>>,
    order: VecDeque<CommandId>,
}

impl PlanCache {
    /// Create a cache retaining at most `capacity` plans.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Maximum number of retained plans.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The plan for `command`, built on a miss.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if the command's layout is malformed.
    pub fn get(&self, command: &Command) -> Result<Arc<CommandPlan>> {
        // Cache contents are always whole plans, so a poisoned lock is still usable.
        if let Some(plan) = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .plans
            .get(&command.id())
        {
            log::trace!("Plan cache hit for '{}'", command.name());
            return Ok(Arc::clone(plan));
        }

        let plan = Arc::new(CommandPlan::build(command)?);
        if self.capacity == 0 {
            return Ok(plan);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = state.plans.get(&command.id()) {
            return Ok(Arc::clone(existing));
        }
        while state.plans.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.plans.remove(&oldest);
            log::trace!("Evicted plan {oldest:?}");
        }
        state.plans.insert(command.id(), Arc::clone(&plan));
        state.order.push_back(command.id());
        Ok(plan)
    }

    /// Build the plan of `command` and of every command nested under it.
    ///
    /// # Errors
    ///
    /// The first [`Error::InvalidLayout`] found, depth first.
    pub fn validate_tree(&self, command: &Command) -> Result<()> {
        let mut seen = HashSet::new();
        self.validate_from(command, &mut seen)
    }

    fn validate_from(&self, command: &Command, seen: &mut HashSet<CommandId>) -> Result<()> {
        if !seen.insert(command.id()) {
            return Ok(());
        }
        self.get(command)?;
        for part in command.parts() {
            if let CommandPart::SubCommands(slot) = part {
                for sub in slot.commands() {
                    self.validate_from(sub, seen)?;
                }
            }
        }
        Ok(())
    }

    /// Drop the cached plan for `command`. Returns whether one was cached.
    pub fn evict(&self, command: &Command) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.order.retain(|id| *id != command.id());
        state.plans.remove(&command.id()).is_some()
    }

    /// Drop every cached plan.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.plans.clear();
        state.order.clear();
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .plans
            .len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
