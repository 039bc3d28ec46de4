//! Kawaii interpreter CLI
//!
//! Loads a program file and runs it through the read-eval-print session.

use std::io::Write;
use std::process::ExitCode;

use kawaii::Error;

const USAGE_EXIT: u8 = 254;
const ERROR_EXIT: u8 = 255;

/// Install a stderr subscriber, only if RUST_LOG is set
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        let filter = EnvFilter::from_default_env();
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .init();
    }
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("    kawaii <file_name>");
}

fn run_file(path: &str) -> Result<(), Error> {
    let bytes =
        std::fs::read(path).map_err(|e| Error::Io(format!("cannot read '{path}': {e}")))?;
    // Source is raw bytes; invalid UTF-8 becomes U+FFFD inside tokens
    let source = String::from_utf8_lossy(&bytes);
    tracing::debug!(path, bytes = source.len(), "loaded program");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = kawaii::repl::run(&source, &mut out);
    // Keep the transcript ahead of any error message
    out.flush()?;
    result
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        print_usage();
        return ExitCode::from(USAGE_EXIT);
    };

    match run_file(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(ERROR_EXIT)
        }
    }
}
