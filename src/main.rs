//! wxstation - Main Entry Point
//!
//! Loads the environment configuration, wires the host sensor drivers and
//! the MQTT transport into the station agent, and runs it until SIGINT or
//! SIGTERM.

use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use wxstation::config::StationConfig;
use wxstation::error::{AgentError, AgentResult};
use wxstation::observability::init_default_logging;
use wxstation::sensors::{
    bme280::Bme280Iio, cpu::CpuThermalZone, ds18b20::Ds18b20, uptime::HostUptime, SensorReadout,
};
use wxstation::transport::mqtt::MqttClient;
use wxstation::StationAgent;

/// Weather-station telemetry agent
#[derive(Parser)]
#[command(name = "wxstation")]
#[command(about = "Periodic MQTT telemetry agent for a small weather station")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the station agent in the foreground
    Run,
    /// Validate the environment configuration
    Config {
        /// Show the resolved configuration (password redacted)
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!("Starting wxstation v{}", env!("CARGO_PKG_VERSION"));

    // Only configuration problems are fatal; abort with a clear message.
    let config = match StationConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_station(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Shutdown complete");
}

async fn run_station(config: StationConfig) -> AgentResult<()> {
    let config = Arc::new(config);
    info!(
        host = %config.host,
        port = config.port,
        user = %config.username,
        "Attempting MQTT connection"
    );

    let mut agent = build_agent(config).await?;
    agent.initialize().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_listener(shutdown_tx)?;

    agent.run(shutdown_rx).await;

    agent.shutdown().await?;
    Ok(())
}

/// Driver factory - all host wiring lives here, separate from the
/// transport-generic agent.
async fn build_agent(config: Arc<StationConfig>) -> AgentResult<StationAgent<MqttClient>> {
    let transport = MqttClient::new(&config);

    let outside = Ds18b20::discover()
        .await
        .map_err(|e| AgentError::internal(format!("outside probe discovery failed: {e}")))?;
    let readout = SensorReadout::new(
        Box::new(outside),
        Box::new(Bme280Iio::default_device()),
        Box::new(CpuThermalZone::default_zone()),
    );

    Ok(StationAgent::new(
        config,
        transport,
        readout,
        Box::new(HostUptime),
    ))
}

/// Flip the shutdown watch on SIGINT or SIGTERM.
fn spawn_signal_listener(shutdown_tx: watch::Sender<bool>) -> AgentResult<()> {
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| AgentError::internal(format!("failed to install SIGINT handler: {e}")))?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| AgentError::internal(format!("failed to install SIGTERM handler: {e}")))?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
        let _ = shutdown_tx.send(true);
    });

    Ok(())
}

fn handle_config_command(config: &StationConfig, show: bool) -> AgentResult<()> {
    if show {
        let rendered = serde_json::to_string_pretty(config)
            .map_err(|e| AgentError::internal(e.to_string()))?;
        println!("{rendered}");
    }

    info!("Configuration validation complete");
    Ok(())
}
