use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use soil_posthoc::stats::letters::LetterScheme;
use soil_posthoc::AnalysisConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input table (.csv, .json or .parquet)
    input: Option<PathBuf>,

    /// Directory for tables, figures and the report
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON configuration file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Letter scheme: compact or sequential
    #[arg(long)]
    letters: Option<LetterScheme>,

    /// Significance level
    #[arg(long)]
    alpha: Option<f64>,

    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if let Some(letters) = args.letters {
        config.letters = letters;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }

    log::info!("Analysing {}", config.input.display());
    let summary = soil_posthoc::run(&config)?;

    println!(
        "{} samples, {} variable × factor pairs, {} significant comparisons",
        summary.samples, summary.pairs, summary.significant_pairs
    );
    for path in summary.outputs() {
        println!("  {}", path.display());
    }
    Ok(())
}
