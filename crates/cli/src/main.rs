use anyhow::Context;
use clap::Parser;
use scorebook_observability::{init_tracing, TracingConfig};

mod cli;
mod commands;
mod context;
mod watch;

fn main() {
    if let Err(error) = run() {
        eprintln!("scorebook error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let mut tracing_config = TracingConfig {
        filter: cli.verbose.then(|| "warn,scorebook=debug,scorebook_core=debug".to_string()),
        json: cli.json_logs,
        log_dir: None,
    };
    if cli.log_file {
        tracing_config = tracing_config.with_default_log_dir();
    }
    let _guard = init_tracing(&tracing_config).context("failed to initialize logging")?;

    let ctx = context::AppContext::from_cli(&cli)?;
    commands::dispatch(cli.command, ctx)
}
