//! RakSOR - command-line entry point

use clap::Parser;
use raksor::cli::{cmd_evaluate, cmd_predict, cmd_rank, cmd_score, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raksor=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { mlc, mtr, targets, output_dir, cv, config } => {
            cmd_train(&mlc, &mtr, targets, output_dir.as_deref(), cv, config.as_deref())?;
        }
        Commands::Predict { model, data, targets, output_dir } => {
            cmd_predict(&model, &data, targets, output_dir.as_deref())?;
        }
        Commands::Evaluate { mtr_test, mlc_test, model, targets, output_dir } => {
            cmd_evaluate(&mtr_test, &mlc_test, &model, targets, output_dir.as_deref())?;
        }
        Commands::Score { truth, predicted, targets, mode, label, report } => {
            cmd_score(&truth, &predicted, targets, mode, &label, &report)?;
        }
        Commands::Rank { model, features, output_dir } => {
            cmd_rank(&model, &features, output_dir.as_deref())?;
        }
    }

    Ok(())
}
