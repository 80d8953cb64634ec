use std::path::PathBuf;

use clap::{Parser, Subcommand};

use calib_cli::commands::{
    run_all, run_backtest, run_calibration, run_concentration, run_cross_validate, run_disputes,
    run_heatmap, run_rolling, run_significance, run_summary, HeatmapArgs, SignificanceArgs,
};
use calib_cli::{AnalysisConfig, AnalysisContext};

#[derive(Parser)]
#[command(name = "calib")]
#[command(about = "Calibration bias analysis and backtesting for prediction markets", long_about = None)]
struct Cli {
    /// Config file path (TOML or JSON)
    #[arg(short, long, global = true, env = "CALIB_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured output directory
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load counts and the resolved-market breakdown
    Summary,
    /// Calibration curves, Brier score and sharpness per horizon
    Calibration,
    /// Bias heatmaps by liquidity tier, category, time to close and volume
    Heatmap(HeatmapArgs),
    /// Bootstrap, rank and permutation tests of bias and strategy returns
    Significance(SignificanceArgs),
    /// Backtest strategies on a chronological train/test split
    Backtest,
    /// Rolling-window backtest
    Rolling,
    /// Expanding, leave-one-quarter-out and blocked cross-validation
    CrossValidate,
    /// Concentration of balances and volume
    Concentration,
    /// UMA and Kleros dispute resolution summaries
    Disputes,
    /// Every step above in sequence
    RunAll,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = AnalysisConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.output_dir {
        config.data.output_dir = dir;
    }
    let ctx = AnalysisContext::load(config)?;

    match cli.command {
        Commands::Summary => {
            run_summary(&ctx)?;
        }
        Commands::Calibration => {
            run_calibration(&ctx)?;
        }
        Commands::Heatmap(args) => {
            run_heatmap(&ctx, &args)?;
        }
        Commands::Significance(args) => {
            run_significance(&ctx, &args)?;
        }
        Commands::Backtest => {
            run_backtest(&ctx)?;
        }
        Commands::Rolling => {
            run_rolling(&ctx)?;
        }
        Commands::CrossValidate => {
            run_cross_validate(&ctx)?;
        }
        Commands::Concentration => {
            run_concentration(&ctx)?;
        }
        Commands::Disputes => {
            run_disputes(&ctx)?;
        }
        Commands::RunAll => {
            run_all(&ctx)?;
        }
    }

    Ok(())
}
