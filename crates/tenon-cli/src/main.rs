use std::process::ExitCode;

use clap::Parser;
use tenon_cli::{CliArgs, TenonApp};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let app = match TenonApp::from_args(&args) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    // Statuses outside 0..=255 cannot be reported as-is.
    let code = app.run(&args);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
