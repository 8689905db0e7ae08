use crate::cli::Cli;
use crate::exec::CommandOutcome;

use owo_colors::OwoColorize;

// Logger
use env_logger::Builder;

/// Build logger
pub fn set_logger(cli: &Cli) {
    // Set verbosity
    let verbosity: log::LevelFilter = cli.verbose.log_level_filter();
    let filter = format!("{},{}", verbosity.to_string().to_lowercase(), "hyper=error");
    std::env::set_var("FPND_LOG", filter);
    // Ignore a logger already set by an embedding program.
    let _ = Builder::from_env("FPND_LOG").try_init();
}

/// Print the result of a lifecycle script run.
pub fn print_outcome(tag: &str, outcome: &CommandOutcome) -> String {
    let tag = format!("[{tag}]");
    let output = outcome.output_str();
    if outcome.succeeded {
        format!("✅ {} {} ({})", tag.green(), output, outcome.code)
    } else {
        format!("⛔️ {} {} ({})", tag.red(), output, outcome.code)
    }
}
