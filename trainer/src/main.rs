use std::env;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format;

use self::args::Args;
use self::train::run_training;

mod args;
mod train;

fn main() -> ExitCode {
    let args = Args::parse();

    set_default_logging(if args.verbose { "debug" } else { "info" });

    let event_format = format().with_target(false).without_time();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .event_format(event_format)
        .init();

    match run_training(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Training failed.");
            ExitCode::FAILURE
        }
    }
}

fn set_default_logging(level: &str) {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", level);
    }
}
