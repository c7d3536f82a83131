mod commands;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};

use commands::Cli;
use docs_assistant::state::AppState;
use docs_assistant::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load env
    let mut settings = Settings::from_env().context("invalid configuration")?;
    if let Some(root) = cli.docs_root {
        settings.docs.root = root;
    }

    let level: Level = settings.log_level.parse().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    for warning in settings.validate() {
        warn!("{}", warning);
    }

    let state = AppState::from_settings(settings).context("failed to initialize")?;
    info!(
        docs_root = %state.settings.docs.root.display(),
        primary = %state.settings.primary_provider,
        "docs-assistant ready"
    );

    commands::run(&state, cli.command).await
}
