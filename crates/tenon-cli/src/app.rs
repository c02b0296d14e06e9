//! The Tenon CLI application.
//!
//! Owns the loaded configuration and a [`CommandManager`] holding the
//! demonstration commands, and turns dispatch outcomes into exit codes.

use crate::cli::CliArgs;
use crate::commands::{self, Transcript, transcript_key};
use crate::config::{ConfigSource, TenonConfig};
use tenon_core::{CommandManager, Error, InjectedValueStore, Part, Result};
use tracing_subscriber::EnvFilter;

/// Exit code for a malformed command line.
pub const EXIT_USAGE: i32 = 2;

/// Exit code for every other failure.
pub const EXIT_FAILURE: i32 = 1;

// ============================================================================
// TenonApp
// ============================================================================

/// CLI application wrapping a configured command manager.
pub struct TenonApp {
    config: TenonConfig,
    manager: CommandManager,
    version: String,
}

impl TenonApp {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let source = ConfigSource::resolve(args.config.as_deref());
        let config = TenonConfig::load_from(&source)?;
        tracing::debug!(%source, "Loaded configuration");
        Self::new(config)
    }

    /// Create an application and register the demonstration commands.
    pub fn new(config: TenonConfig) -> Result<Self> {
        let manager = CommandManager::with_config(&config.manager);
        commands::register_all(&manager)?;
        Ok(Self {
            config,
            manager,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &TenonConfig {
        &self.config
    }

    /// Get a reference to the command manager.
    pub fn manager(&self) -> &CommandManager {
        &self.manager
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity
    /// flags, then the configured level. Records emitted through the `log`
    /// facade by `tenon-core` are forwarded to the subscriber.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(self.config.logging.level.as_deref().unwrap_or("info"))
        };

        // Ignore error if a subscriber is already set (e.g. in tests).
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    /// Run the CLI and return the process exit code.
    pub fn run(&self, args: &CliArgs) -> i32 {
        self.init_logging(args.verbose, args.quiet);

        if args.list {
            return match self.listing() {
                Ok(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                    0
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    EXIT_FAILURE
                }
            };
        }

        if args.tokens.is_empty() {
            println!(
                "{} {}: no command given, use --list to see commands",
                self.config.project_name, self.version
            );
            return 0;
        }

        let (result, lines) = self.execute(&args.tokens);
        for line in lines {
            println!("{line}");
        }
        if let Err(e) = &result {
            eprintln!("error: {e}");
        }
        exit_code(&result)
    }

    /// Dispatch `tokens` and collect what the actions wrote.
    pub fn execute(&self, tokens: &[String]) -> (Result<i32>, Vec<String>) {
        let transcript = Transcript::new();
        let context = InjectedValueStore::new().with(transcript_key(), transcript.clone());
        tracing::debug!(tokens = ?tokens, "Dispatching");
        let result = self.manager.execute(&context, tokens);
        (result, transcript.lines())
    }

    /// One usage line per registered command.
    pub fn listing(&self) -> Result<Vec<String>> {
        let commands = self.manager.all_commands()?;
        Ok(commands
            .iter()
            .map(|command| {
                let names: Vec<&str> = command.names().collect();
                let mut usage = names.join("|");
                for part in command.parts() {
                    usage.push(' ');
                    usage.push_str(&part.text_representation());
                }
                format!("{usage:<40} {}", command.description())
            })
            .collect())
    }
}

/// Map a dispatch outcome to a process exit code.
pub fn exit_code(result: &Result<i32>) -> i32 {
    match result {
        Ok(status) => *status,
        Err(e) if e.is_usage() || matches!(e, Error::NoSuchCommand { .. }) => EXIT_USAGE,
        Err(_) => EXIT_FAILURE,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use tenon_core::{ExecutionPath, ManagerConfig, UsageKind};

    fn app() -> TenonApp {
        TenonApp::new(TenonConfig::default()).unwrap()
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_registers_demo_commands() {
        let app = app();
        let names: Vec<String> = app
            .manager()
            .all_commands()
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["greet", "remote", "sum"]);
        assert_eq!(app.config().project_name, "tenon");
    }

    #[test]
    fn test_execute_collects_output() {
        let (result, lines) = app().execute(&tokens(&["greet", "ada"]));
        assert_eq!(result.unwrap(), 0);
        assert_eq!(lines, vec!["Hello, ada!"]);
    }

    #[test]
    fn test_listing() {
        let lines = app().listing().unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("greet|hi -l -g <greeting> [name]"));
        assert!(lines[1].starts_with("remote <add|remove>"));
        assert!(lines[2].starts_with("sum <numbers...>"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Ok(3)), 3);
        let kind = UsageKind::TooManyArguments {
            extra: vec!["x".into()],
        };
        let usage = Error::usage(kind, ExecutionPath::default());
        assert_eq!(exit_code(&Err(usage)), EXIT_USAGE);
        let missing = Error::NoSuchCommand {
            name: "nope".into(),
        };
        assert_eq!(exit_code(&Err(missing)), EXIT_USAGE);
        let condition = Error::ConditionFailed {
            path: ExecutionPath::default(),
        };
        assert_eq!(exit_code(&Err(condition)), EXIT_FAILURE);
    }

    #[test]
    fn test_run_dispatches_tokens() {
        let args = CliArgs::parse_from(["tenon", "sum", "1", "2"]);
        assert_eq!(app().run(&args), 0);
    }

    #[test]
    fn test_run_unknown_command() {
        let args = CliArgs::parse_from(["tenon", "frobnicate"]);
        assert_eq!(app().run(&args), EXIT_USAGE);
    }

    #[test]
    fn test_run_condition_failure() {
        let args = CliArgs::parse_from(["tenon", "remote", "rm", "origin"]);
        assert_eq!(app().run(&args), EXIT_FAILURE);
    }

    #[test]
    fn test_run_list() {
        let args = CliArgs::parse_from(["tenon", "--list"]);
        assert_eq!(app().run(&args), 0);
    }

    #[test]
    fn test_run_no_tokens() {
        let args = CliArgs::parse_from(["tenon"]);
        assert_eq!(app().run(&args), 0);
    }

    #[test]
    fn test_zero_capacity_config() {
        let config = TenonConfig {
            manager: ManagerConfig {
                plan_cache_capacity: 0,
            },
            ..TenonConfig::default()
        };
        let app = TenonApp::new(config).unwrap();
        let (result, _) = app.execute(&tokens(&["remote", "add", "o", "u"]));
        assert_eq!(result.unwrap(), 0);
        assert_eq!(app.manager().cached_plans(), 0);
    }

    #[test]
    fn test_init_logging_default() {
        // Should not panic
        app().init_logging(false, false);
    }

    #[test]
    fn test_init_logging_verbose() {
        app().init_logging(true, false);
    }

    #[test]
    fn test_from_args_with_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                project_name = "from-file"
                [manager]
                plan_cache_capacity = 2
            "#,
        )
        .unwrap();

        let args = CliArgs::parse_from(["tenon", "--config", path.to_str().unwrap()]);
        let app = TenonApp::from_args(&args).unwrap();
        assert_eq!(app.config().project_name, "from-file");
        assert_eq!(app.config().manager.plan_cache_capacity, 2);
    }

    #[test]
    fn test_from_args_missing_config_file() {
        let args = CliArgs::parse_from(["tenon", "--config", "/nonexistent/tenon.toml"]);
        assert!(matches!(TenonApp::from_args(&args), Err(Error::Config(_))));
    }
}
