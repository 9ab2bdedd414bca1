//! NIDS Pipeline - Main Entry Point

use clap::Parser;
use nids_pipeline::cli::{cmd_info, cmd_init, cmd_predict, cmd_train, load_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nids_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Init => cmd_init(&config)?,
        Commands::Train { data, label, model, n_estimators, seed } => {
            cmd_train(&config, data, label.as_deref(), model.as_deref(), *n_estimators, *seed)?;
        }
        Commands::Predict { data, output, no_save } => {
            cmd_predict(&config, data, output.as_deref(), *no_save)?;
        }
        Commands::Info => cmd_info(&config)?,
    }

    Ok(())
}
