use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "divtrack")]
#[command(version, about = "Trading 212 dividend tracker")]
#[command(
    long_about = "Fetch your Trading 212 order and dividend history, look up dividend yields, and build inventory, monthly income and top-dividend dashboards as JSON."
)]
pub struct Cli {
    /// Config file (defaults to <config dir>/divtrack/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the cache directory
    #[arg(long = "cache-dir", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Where the dashboard JSON files are written
    #[arg(long = "output-dir", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Serve every lookup from the cache, never touch the network
    #[arg(long, global = true)]
    pub offline: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Download order and dividend history from Trading 212 into the cache
    Fetch,

    /// Build inventory.json from cached orders
    Inventory,

    /// Build monthly.json from cached dividends
    Monthly,

    /// Build top-dividends.json from cached dividends and inventory.json
    TopDividends,

    /// Run inventory, monthly and top-dividends in sequence
    All,

    /// Remove expired cache entries
    Prune {
        /// Cache namespace, e.g. stock-bot or finkio
        #[arg(default_value = "stock-bot")]
        namespace: String,
    },
}
