use anyhow::Result;
use clap::Parser;
use milk_sales::{Charts, CommandViewer, Dataset, NoViewer, Shell, Viewer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use std::{io, path::PathBuf};

const PREVIEW_ROWS: usize = 5;

#[derive(Parser)]
/// Explores milk sales data: summary statistics, sales trends over time, and
/// monthly comparisons between types of milk.
#[command(version, about)]
struct Args {
    /// CSV file of milk sales
    #[arg(default_value = "milkSales.csv")]
    path: PathBuf,
    /// Directory to save charts in
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Save charts without opening them
    #[arg(long)]
    no_display: bool,
    /// Command to open charts with, instead of the platform's usual one
    #[arg(long, env = "MILK_VIEWER")]
    viewer: Option<String>,
    /// Level of diagnostics written to standard error (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    println!("📊 Retail Sales Analysis - Milk Products");
    let dataset = Dataset::from_path(&args.path)?;
    println!("\n✅ Data loaded successfully.");
    println!("Preview of dataset:");
    print!("{}", dataset.preview(PREVIEW_ROWS));

    let charts = Charts::new(args.output_dir);
    let viewer: Box<dyn Viewer> = if args.no_display {
        Box::new(NoViewer)
    } else {
        Box::new(
            args.viewer
                .as_deref()
                .and_then(CommandViewer::new)
                .unwrap_or_else(CommandViewer::platform_default),
        )
    };
    info!(output_dir = %charts.output_dir().display(), "starting menu");
    let input = io::stdin().lock();
    let mut shell = Shell::new(&dataset, &charts, viewer.as_ref(), input, io::stdout());
    shell.run()
}
