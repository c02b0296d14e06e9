//! The demonstration command tree registered by the `tenon` binary.
//!
//! | Command              | Parts                                        |
//! |----------------------|----------------------------------------------|
//! | `greet`, `hi`        | `-l`, `-g <greeting>`, `[name]`              |
//! | `sum`                | `<numbers...>` (integers)                    |
//! | `remote add`         | `<name> <url>`                               |
//! | `remote remove`/`rm` | `<name>`, refuses to remove `origin`         |
//!
//! Actions write their output to the [`Transcript`] injected under
//! [`transcript_key`] instead of printing directly.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, anyhow};
use tenon_core::{
    Command, CommandArgument, CommandFlag, CommandManager, CommandParameters, Key, Result,
    SubCommandPart,
};

// ============================================================================
// Transcript
// ============================================================================

/// Lines written by actions during one dispatch.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line.
    pub fn push(&self, line: impl Into<String>) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.into());
    }

    /// Everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Key under which the host injects the [`Transcript`].
pub fn transcript_key() -> Key<Transcript> {
    Key::of()
}

fn transcript(params: &CommandParameters<'_>) -> anyhow::Result<Arc<Transcript>> {
    params
        .injected(&transcript_key())
        .ok_or_else(|| anyhow!("no transcript injected"))
}

// ============================================================================
// Registration
// ============================================================================

/// Register every demonstration command with `manager`.
pub fn register_all(manager: &CommandManager) -> Result<()> {
    manager.register(greet())?;
    manager.register(sum())?;
    manager.register(remote())?;
    Ok(())
}

fn greet() -> Arc<Command> {
    let loud = CommandFlag::builder('l', "Shout the greeting").build();
    let greeting = CommandFlag::builder('g', "Greeting to use")
        .argument("greeting")
        .defaults_to(["Hello"])
        .build();
    let name = CommandArgument::builder("name", "Who to greet")
        .of_type(Key::<String>::of())
        .defaults_to(["world"])
        .build();

    let (read_loud, read_greeting, read_name) = (loud.clone(), greeting.clone(), name.clone());
    Command::builder("greet")
        .alias("hi")
        .description("Print a greeting")
        .part(loud)
        .part(greeting)
        .part(name)
        .action(move |params| {
            let string = Key::<String>::of();
            let greeting = params.value(&read_greeting).as_single(&string)?;
            let name = params.value(&read_name).as_single(&string)?;
            let mut line = format!("{greeting}, {name}!");
            if params.is_present(&read_loud) {
                line = line.to_uppercase();
            }
            transcript(params)?.push(line);
            Ok(0)
        })
        .build()
}

fn sum() -> Arc<Command> {
    let numbers = CommandArgument::builder("numbers", "Integers to add")
        .of_type(Key::<i64>::of())
        .variable()
        .build();

    let read = numbers.clone();
    Command::builder("sum")
        .description("Add integers")
        .part(numbers)
        .action(move |params| {
            let values = params.value(&read).as_multiple(&Key::<i64>::of())?;
            let total = values
                .iter()
                .try_fold(0i64, |acc, n| acc.checked_add(*n))
                .context("sum overflows a 64-bit integer")?;
            transcript(params)?.push(total.to_string());
            Ok(0)
        })
        .build()
}

fn remote() -> Arc<Command> {
    let add_name = CommandArgument::builder("name", "Remote name").build();
    let add_url = CommandArgument::builder("url", "Remote URL").build();
    let (read_name, read_url) = (add_name.clone(), add_url.clone());
    let add = Command::builder("add")
        .description("Add a remote")
        .part(add_name)
        .part(add_url)
        .action(move |params| {
            let string = Key::<String>::of();
            let name = params.value(&read_name).as_single(&string)?;
            let url = params.value(&read_url).as_single(&string)?;
            transcript(params)?.push(format!("Added remote {name} -> {url}"));
            Ok(0)
        })
        .build();

    let remove_name = CommandArgument::builder("name", "Remote name").build();
    let (read_name, check_name) = (remove_name.clone(), remove_name.clone());
    let remove = Command::builder("remove")
        .alias("rm")
        .description("Remove a remote")
        .part(remove_name)
        .condition(move |params| params.raw_values(&check_name) != ["origin"])
        .action(move |params| {
            let name = params.value(&read_name).as_single(&Key::<String>::of())?;
            transcript(params)?.push(format!("Removed remote {name}"));
            Ok(0)
        })
        .build();

    Command::builder("remote")
        .description("Manage remotes")
        .part(
            SubCommandPart::builder("action", "What to do with remotes")
                .commands([add, remove])
                .build(),
        )
        .build()
}

// ============================================================================
// Tests
// ============================================================================
