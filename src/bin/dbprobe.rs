//! dbprobe CLI — serve the health endpoint or run a one-shot probe.

use clap::{Parser, Subcommand};
use dbprobe::config::Config;
use dbprobe::db::ClientProvider;
use dbprobe::health::HealthProbe;
use dbprobe::telemetry::{TelemetryConfig, init_telemetry};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dbprobe", about = "Database client health probe")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the health endpoint
    Serve {
        /// Address to bind (overrides BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Probe the database once and print the report as JSON
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig::from_config(&config, "dbprobe"))?;

    let probe = Arc::new(HealthProbe::from_config(ClientProvider::global(), &config));

    match cli.command {
        Command::Serve { bind } => {
            cmd_serve(probe, bind.unwrap_or(config.bind_addr)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => cmd_check(&probe).await,
    }
}

async fn cmd_serve(probe: Arc<HealthProbe>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = dbprobe::http::router(probe);
    dbprobe::http::serve(listener, app, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;
    Ok(())
}

async fn cmd_check(probe: &HealthProbe) -> anyhow::Result<ExitCode> {
    let report = probe.check().await;
    println!("{}", serde_json::to_string_pretty(&report.body)?);
    Ok(if report.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
