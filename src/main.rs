//! plextube - Plex library hydration from YouTube metadata
//!
//! Entry point for the plextube CLI application.

use clap::Parser;
use plextube::{
    cli::Cli,
    error::{ExitCode, StructuredError},
};

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match plextube::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;

            if json_errors {
                let structured = StructuredError::new(&err, exit_code);
                if let Ok(json) = serde_json::to_string_pretty(&structured) {
                    eprintln!("{json}");
                } else {
                    eprintln!("[{}] Error: {err:#}", exit_code.code_prefix());
                }
            } else {
                eprintln!("[{}] Error: {err:#}", exit_code.code_prefix());
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
