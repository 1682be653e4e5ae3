//! Poll-cycle and operator-command handlers for the Coordinator

use super::Coordinator;
use crate::domain::command::{
    Command, CommandOutcome, CommandRequest, CommandResult, PostStatusEntry, StatusReport,
};
use crate::domain::error::EngineError;
use crate::domain::types::{AlarmMode, Classification, PostId, PostStatus};
use crate::services::classifier::classify;
use tracing::{debug, error, info, trace, warn};

impl Coordinator {
    /// One poll cycle over every post.
    ///
    /// Read errors leave the post's snapshot stale and the cycle continues;
    /// only Active posts escalate beam loss or intrusions.
    pub(crate) async fn poll_cycle(&mut self) {
        for (id, status) in self.registry.statuses() {
            let snapshot = match self.reader.read(&id).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(post = %id, error = %e, "sensor_read_failed");
                    self.metrics.record_read_error();
                    continue;
                }
            };
            self.metrics.record_snapshot_read();
            if let Err(e) = self.registry.record_snapshot(&id, snapshot) {
                warn!(post = %id, error = %e, "snapshot_record_failed");
                continue;
            }

            if status != PostStatus::Active {
                continue;
            }

            if snapshot.beam_loss() {
                self.escalate_beam_loss(&id).await;
                continue;
            }

            let classification = classify(&snapshot);
            if classification == Classification::FalseAlarm {
                trace!(post = %id, "poll_no_intrusion");
                continue;
            }

            warn!(post = %id, classification = %classification, "intrusion_detected");
            self.metrics.record_intrusion();
            self.alarms
                .start(id.clone(), AlarmMode::Timed(self.config.alarm_timed_duration()))
                .await;
            self.relay_notify(format!("ALERT {} {} detected", id, classification)).await;
        }

        self.metrics.record_poll_cycle();
    }

    /// Beam loss on an active post: destroyed-style escalation.
    async fn escalate_beam_loss(&mut self, id: &PostId) {
        match self.registry.destroy(id) {
            Ok((from, to)) => {
                error!(post = %id, from = %from, to = %to, "post_beam_loss");
                self.metrics.record_beam_loss();
                self.alarms.start(id.clone(), AlarmMode::Indefinite).await;
                self.relay_notify(format!("ALERT {} destroyed", id)).await;
                self.recompute_topology();
            }
            // Raced with a concurrent command; the post is no longer Active
            Err(e) => debug!(post = %id, error = %e, "beam_loss_not_escalated"),
        }
    }

    /// Handle one operator command; returns true when the engine should stop.
    pub(crate) async fn handle_command(&mut self, request: CommandRequest) -> bool {
        let CommandRequest { command, reply } = request;
        let mut stop = false;

        let result: CommandResult = match command {
            Command::Destroy(id) => match self.registry.destroy(&id) {
                Ok((from, to)) => {
                    info!(post = %id, "post_destroyed");
                    self.alarms.start(id.clone(), AlarmMode::Indefinite).await;
                    self.relay_notify(format!("ALERT {} destroyed", id)).await;
                    self.recompute_topology();
                    Ok(CommandOutcome::Transition { id, from, to })
                }
                Err(e) => Err(e),
            },
            Command::TurnOff(id) => match self.registry.turn_off(&id) {
                Ok((from, to)) => {
                    info!(post = %id, "post_turned_off");
                    self.alarms
                        .start(id.clone(), AlarmMode::Timed(self.config.alarm_timed_duration()))
                        .await;
                    self.relay_notify(format!("OFF {}", id)).await;
                    self.recompute_topology();
                    Ok(CommandOutcome::Transition { id, from, to })
                }
                Err(e) => Err(e),
            },
            Command::Restore(id) => match self.registry.restore(&id) {
                Ok((from, to)) => {
                    info!(post = %id, "post_restored");
                    self.alarms.cancel(&id).await;
                    self.relay_notify(format!("RESTORE {}", id)).await;
                    self.recompute_topology();
                    Ok(CommandOutcome::Transition { id, from, to })
                }
                Err(e) => Err(e),
            },
            Command::AlarmOff(id) => {
                if !self.registry.contains(&id) {
                    Err(EngineError::UnknownPost(id))
                } else if self.alarms.cancel(&id).await {
                    info!(post = %id, "alarm_silenced");
                    Ok(CommandOutcome::AlarmCancelled(id))
                } else {
                    Err(EngineError::NoActiveAlarm(id))
                }
            }
            Command::Status => Ok(CommandOutcome::Status(self.status_report())),
            Command::Shutdown => {
                info!("shutdown_requested");
                let _ = self.shutdown_tx.send(true);
                stop = true;
                Ok(CommandOutcome::ShuttingDown)
            }
        };

        if reply.send(result).is_err() {
            debug!("command_reply_dropped");
        }
        stop
    }

    /// Recompute the route; partition is critical but the engine keeps running.
    pub(crate) fn recompute_topology(&mut self) {
        self.metrics.record_route_recompute();
        match self.topology.recompute(&self.registry) {
            Ok(route) => info!(route = %route, "route_recomputed"),
            Err(e) => {
                self.metrics.record_route_partition();
                error!(error = %e, "route_partitioned");
            }
        }
    }

    /// Best-effort relay send; failures are logged, the cycle goes on.
    async fn relay_notify(&self, message: String) {
        if let Err(e) = self.relay.send(&message).await {
            error!(message = %message, error = %e, "relay_failed");
        }
    }

    pub(crate) fn status_report(&self) -> StatusReport {
        let posts = self
            .registry
            .posts()
            .into_iter()
            .map(|post| PostStatusEntry {
                alarm_sounding: self.alarms.is_sounding(&post.id),
                id: post.id.to_string(),
                status: post.status.as_str().to_string(),
                x: post.coordinates.x,
                y: post.coordinates.y,
            })
            .collect();
        let route = self
            .topology
            .current_route()
            .map(|route| route.hops().iter().map(|hop| hop.0.clone()).collect());
        StatusReport { site: self.config.site_id().to_string(), posts, route }
    }
}
