//! Command-line host for Tenon.
//!
//! Loads configuration, initialises logging, registers a small set of
//! demonstration commands and dispatches the command-line tokens to them.
//!
//! # Modules
//!
//! - [`cli`]: clap argument definitions
//! - [`config`]: `TenonConfig` and `ConfigSource`, layered with confyg
//! - [`commands`]: The demonstration command tree
//! - [`app`]: `TenonApp`, logging setup and exit codes

#![doc = include_str!("../README.md")]

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;

pub use app::{TenonApp, exit_code};
pub use cli::CliArgs;
pub use config::{ConfigSource, TenonConfig};
