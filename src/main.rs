//! Stumpnet - perimeter node state and alarm coordination engine
//!
//! Polls camouflaged sensor posts over a serial head-end, classifies
//! intrusions, drives alarm sessions, and relays alerts to the control
//! center over radio with network fallback.
//!
//! Module structure:
//! - `domain/` - Core types (Post, SensorSnapshot, Commands, Errors)
//! - `io/` - External interfaces (serial head-end, relay links, listener)
//! - `services/` - Engine logic (Registry, Classifier, Alarms, Relay, Topology, Coordinator)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use std::sync::Arc;
use stumpnet::infra::{Config, Metrics};
use stumpnet::io::{
    start_command_listener, CommandListenerConfig, EspLink, LoraRadioLink, SerialAlarmActuator,
    SerialSensorReader, TcpNetworkLink,
};
use stumpnet::services::{AlarmController, CommunicationRelay, Coordinator, NodeRegistry};
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Stumpnet - perimeter intrusion detection coordinator
#[derive(Parser, Debug)]
#[command(name = "stumpnet", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("stumpnet starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        site_id = %config.site_id(),
        serial_device = %config.serial_device(),
        serial_baud = %config.serial_baud(),
        network_server_addr = %config.network_server_addr(),
        listener_port = %config.listener_port(),
        poll_interval_ms = %config.poll_interval().as_millis(),
        alarm_timed_secs = %config.alarm_timed_duration().as_secs(),
        posts = %config.posts().len(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // One serial head-end link shared by sensors, radio, and actuator
    let esp = Arc::new(EspLink::new(&config));
    let reader = Arc::new(SerialSensorReader::new(esp.clone()));
    let radio = Arc::new(LoraRadioLink::new(esp.clone()));
    let actuator = Arc::new(SerialAlarmActuator::new(esp));
    let network = Arc::new(TcpNetworkLink::new(
        config.network_server_addr().to_string(),
        config.network_timeout(),
    ));

    let metrics = Arc::new(Metrics::new());
    let registry = Arc::new(NodeRegistry::new(config.posts()));
    let alarms = AlarmController::new(actuator, config.alarm_toggle_cadence(), metrics.clone());
    let relay = CommunicationRelay::new(radio, network, config.network_timeout(), metrics.clone());

    // Operator command channel (bounded for backpressure)
    let (cmd_tx, cmd_rx) = mpsc::channel(64);

    // Start TCP command listener
    let listener_config = CommandListenerConfig {
        port: config.listener_port(),
        enabled: config.listener_enabled(),
    };
    let listener_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = start_command_listener(listener_config, cmd_tx, listener_shutdown).await {
            tracing::error!(error = %e, "command listener error");
        }
    });

    // Start metrics reporter (lock-free reads with full summary)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run coordinator - polls posts and consumes commands until shutdown
    let mut coordinator =
        Coordinator::new(config, registry, alarms, relay, reader, metrics, shutdown_tx);
    coordinator.run(cmd_rx).await;

    info!("stumpnet shutdown complete");
    Ok(())
}
