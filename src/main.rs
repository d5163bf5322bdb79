//! MetaCI CLI - manage MetaCI sites and build plans

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = metaci_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
