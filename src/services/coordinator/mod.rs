//! Poll/command cycle orchestration
//!
//! The Coordinator is the central loop that composes the engine:
//! - pulls a snapshot per post from the sensor reader each poll tick
//! - classifies intrusions and escalates beam loss to Destroyed
//! - starts/cancels alarm sessions via the AlarmController
//! - relays alerts over the dual-channel CommunicationRelay
//! - recomputes the route after every lifecycle change
//! - serves the operator command channel
//!
//! Poll ticks use `MissedTickBehavior::Skip`, so a slow cycle never overlaps
//! the next one. Shutdown flushes every live alarm session before returning.

mod handlers;

use crate::domain::command::CommandRequest;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::sensors::SensorReader;
use crate::services::alarm::AlarmController;
use crate::services::registry::NodeRegistry;
use crate::services::relay::CommunicationRelay;
use crate::services::topology::TopologyManager;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::info;

pub struct Coordinator {
    /// Application configuration
    pub(crate) config: Config,
    /// Authoritative post state
    pub(crate) registry: Arc<NodeRegistry>,
    /// Per-post alarm sessions
    pub(crate) alarms: AlarmController,
    /// Dual-channel outbound relay
    pub(crate) relay: CommunicationRelay,
    /// Current route over the active posts
    pub(crate) topology: TopologyManager,
    /// External sensor reader
    pub(crate) reader: Arc<dyn SensorReader>,
    /// Metrics collector
    pub(crate) metrics: Arc<Metrics>,
    /// Shutdown signal; the coordinator both observes and (on the shutdown
    /// command) raises it so sibling tasks stop too
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl Coordinator {
    pub fn new(
        config: Config,
        registry: Arc<NodeRegistry>,
        alarms: AlarmController,
        relay: CommunicationRelay,
        reader: Arc<dyn SensorReader>,
        metrics: Arc<Metrics>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            config,
            registry,
            alarms,
            relay,
            topology: TopologyManager::new(),
            reader,
            metrics,
            shutdown_tx,
        }
    }

    /// Run the poll/command loop until shutdown, then flush all alarms.
    pub async fn run(&mut self, mut cmd_rx: mpsc::Receiver<CommandRequest>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut poll = tokio::time::interval(self.config.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Establish the initial route before the first cycle
        self.recompute_topology();
        info!(posts = %self.registry.len(), "coordinator_started");

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                request = cmd_rx.recv() => {
                    match request {
                        Some(request) => {
                            if self.handle_command(request).await {
                                break;
                            }
                        }
                        None => break, // All command senders dropped
                    }
                }
                _ = poll.tick() => {
                    self.poll_cycle().await;
                }
            }
        }

        info!("coordinator_stopping");
        // Every live session ends with its actuator off
        self.alarms.shutdown().await;
        info!("coordinator_stopped");
    }
}
