use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repodeck_api::{GitHubClient, SonarClient};
use repodeck_core::providers::{GitHubProvider, SonarProvider};
use repodeck_core::{Config, FetchCoordinator};
use repodeck_tui::{run_tui, App};

#[derive(Parser)]
#[command(name = "repodeck")]
#[command(version, about = "Terminal dashboard for your GitHub repositories", long_about = None)]
struct Cli {
    /// Check SonarCloud quality gates during refresh
    #[arg(short, long)]
    sonar: bool,

    /// Path to an alternate config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging - the TUI owns the terminal, so logs go to a file
    init_logging()?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let token = config.github.resolved_token();
    if token.is_none() {
        tracing::warn!("no GitHub token found; unauthenticated rate limits are tight");
    }

    let github = GitHubClient::with_base_url(token, config.github.api_url.clone());
    let sonar = SonarClient::with_base_url(config.sonar.token.clone(), config.sonar.api_url.clone());

    let coordinator = FetchCoordinator::new(
        Arc::new(GitHubProvider::new(
            github,
            config.github.scope(),
            config.local.code_dir(),
        )),
        Arc::new(SonarProvider::new(sonar)),
        config.repos.clone(),
        config.sonar.org.clone(),
        config.fetch.batch_size,
    );

    let app = App::new(cli.sonar);
    run_tui(app, coordinator, config).await
}

fn init_logging() -> anyhow::Result<()> {
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("repodeck");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("repodeck.log"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repodeck=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false),
        )
        .init();

    Ok(())
}
