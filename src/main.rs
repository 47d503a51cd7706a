use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use civitas::{
    scenario::ScenarioLoader,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Civitas city simulation")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/forum_city.yaml")]
    scenario: PathBuf,

    /// Override tick count for headless runs (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Serve the HTTP API and run the clock instead of a headless run
    #[arg(long)]
    serve: bool,

    /// Host interface for the HTTP API
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port for the HTTP API
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let mut scenario = loader.load(&cli.scenario)?;
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }

    if cli.serve {
        return web::run(WebServerConfig {
            scenario,
            host: cli.host,
            port: cli.port,
        })
        .await;
    }

    let ticks = scenario.ticks(cli.ticks);
    let mut session = scenario.static_session()?;
    session.start();
    let summaries = session.run_ticks(ticks);
    let disasters = summaries
        .iter()
        .filter(|summary| summary.report.disaster.is_some())
        .count();
    let stats = session.city().stats();
    info!(
        scenario = %scenario.name,
        ticks,
        day = stats.day,
        treasury = stats.treasury,
        population = stats.population,
        disasters,
        news = session.city().news().total_published(),
        "headless run complete"
    );
    Ok(())
}
