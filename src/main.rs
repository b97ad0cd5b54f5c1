//! Binary entrypoint for the `scaffold` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    // Recording is handled in commands::dispatch via SCAFFOLD_RECORD=<dir>.
    match scaffold::run(std::env::args()) {
        Ok(exit) => ExitCode::from(u8::try_from(exit.code()).unwrap_or(1)),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
