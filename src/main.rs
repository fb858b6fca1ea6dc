mod cli;
mod dispatcher;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use divtrack::config::Config;
use divtrack::pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = Some(dir);
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if cli.offline {
        config.offline = true;
    }

    init_tracing(cli.verbose || config.debug, cli.no_color);

    let pipeline = Pipeline::new(config)?;
    dispatcher::dispatch_command(cli.command, &pipeline).await
}

/// Logs go to stderr so stdout stays clean for the summary tables.
fn init_tracing(debug: bool, no_color: bool) {
    let default_level = if debug { "divtrack=debug" } else { "divtrack=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .init();
}
