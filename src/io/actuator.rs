//! Alarm actuator seam (buzzer/LED at the base camp)
//!
//! The actuator is best-effort: failures are logged, never propagated, so a
//! flaky serial link cannot wedge an alarm session.

use crate::io::esp_link::EspLink;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

#[async_trait]
pub trait AlarmActuator: Send + Sync {
    async fn on(&self);
    async fn off(&self);
}

/// Drives the base-camp buzzer through the controller serial link
pub struct SerialAlarmActuator {
    link: Arc<EspLink>,
}

impl SerialAlarmActuator {
    pub fn new(link: Arc<EspLink>) -> Self {
        Self { link }
    }
}

#[async_trait]
impl AlarmActuator for SerialAlarmActuator {
    async fn on(&self) {
        if let Err(e) = self.link.command("ALARM ON").await {
            warn!(error = %e, "actuator_on_failed");
        }
    }

    async fn off(&self) {
        if let Err(e) = self.link.command("ALARM OFF").await {
            warn!(error = %e, "actuator_off_failed");
        }
    }
}
