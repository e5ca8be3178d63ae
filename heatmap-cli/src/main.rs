//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use eyre::Report;
use heatmap_cli::CliError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match heatmap_cli::run() {
        Ok(()) => {}
        // Clap renders help, version and usage errors itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("heatmap: {:?}", Report::new(err));
            std::process::exit(1);
        }
    }
}
