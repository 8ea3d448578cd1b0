use anyhow::Context;
use buddyload::scenario::ConfigurableScenario;
use buddyload::probe::run_probe;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use sciencebuddy::cli::{Cli, Command, ProbeArgs, RunArgs};
use sciencebuddy::ScienceBuddy;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "buddyload=info,sciencebuddy=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::Probe(args) => probe(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing the Prometheus exporter")?;
        info!("Serving metrics on {addr}");
    }

    let target = args.target()?;
    info!("Target {}", target.base_url());

    let stats = ScienceBuddy::new(&target)
        .scenario()
        .config(args.scenario_config())
        .await;
    println!("{stats}");

    if let Some(path) = &args.summary_export {
        buddyload::report::export(&stats, path)
            .with_context(|| format!("writing summary to {}", path.display()))?;
    }
    Ok(())
}

async fn probe(args: ProbeArgs) -> anyhow::Result<()> {
    let config = args.probe_config()?;
    let report = run_probe(&config).await?;
    println!("{report}");
    Ok(())
}
