use k5c::commands::{cli_command, PARAMETER_VERBOSE};
use tracing_subscriber::EnvFilter;

mod cli;
use cli::execute_command;

/// Main entry point for the program
#[tokio::main]
async fn main() {
    let matches = cli_command().get_matches();

    // RUST_LOG wins over --verbose
    let default_level = if matches.get_flag(PARAMETER_VERBOSE) {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = execute_command(matches).await {
        let code = e.exit_code();
        eprintln!("ERROR: {}: {}", code.message(), e);
        ::std::process::exit(code.code());
    }
}
