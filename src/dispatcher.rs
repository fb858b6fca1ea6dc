//! Routes a parsed subcommand to the pipeline stage(s) it names and prints a
//! summary of what each stage produced.

use anyhow::Result;
use colored::Colorize;
use divtrack::pipeline::{Pipeline, INVENTORY_FILE, MONTHLY_FILE, TOP_DIVIDENDS_FILE};
use tracing::info;

use crate::cli::formatters::{
    format_inventory_table, format_monthly_table, format_top_dividends_table, format_written,
};
use crate::cli::Commands;

pub async fn dispatch_command(command: Commands, pipeline: &Pipeline) -> Result<()> {
    match command {
        Commands::Fetch => dispatch_fetch(pipeline).await,
        Commands::Inventory => dispatch_inventory(pipeline).await,
        Commands::Monthly => dispatch_monthly(pipeline),
        Commands::TopDividends => dispatch_top_dividends(pipeline),
        Commands::All => {
            dispatch_inventory(pipeline).await?;
            dispatch_monthly(pipeline)?;
            dispatch_top_dividends(pipeline)
        }
        Commands::Prune { namespace } => {
            let removed = pipeline.prune(&namespace)?;
            println!(
                "{} Removed {} expired entries from {}",
                "✓".green().bold(),
                removed,
                namespace
            );
            Ok(())
        }
    }
}

async fn dispatch_fetch(pipeline: &Pipeline) -> Result<()> {
    pipeline.fetch_history().await?;
    println!("{} Trading 212 history cached", "✓".green().bold());
    Ok(())
}

async fn dispatch_inventory(pipeline: &Pipeline) -> Result<()> {
    info!("Generating inventory");
    let inventory = pipeline.generate_inventory().await?;
    print!("{}", format_inventory_table(&inventory));
    println!("{}", format_written(&pipeline.artifact_path(INVENTORY_FILE)));
    Ok(())
}

fn dispatch_monthly(pipeline: &Pipeline) -> Result<()> {
    info!("Generating monthly rollup");
    let rollup = pipeline.generate_monthly()?;
    print!("{}", format_monthly_table(&rollup));
    println!("{}", format_written(&pipeline.artifact_path(MONTHLY_FILE)));
    Ok(())
}

fn dispatch_top_dividends(pipeline: &Pipeline) -> Result<()> {
    info!("Generating top dividends");
    let stats = pipeline.generate_top_dividends()?;
    print!("{}", format_top_dividends_table(&stats));
    println!("{}", format_written(&pipeline.artifact_path(TOP_DIVIDENDS_FILE)));
    Ok(())
}
