//! Dual-channel outbound relay with failover
//!
//! Primary is the LoRa radio; the TCP network link is the standby. Each call
//! tries the primary once, and on failure lazily establishes the secondary
//! and tries it once. No retry storms: callers decide whether to re-invoke on
//! a later cycle. A secondary failure marks it down so the next call
//! re-establishes from scratch - nothing half-initialized survives.

use crate::domain::error::EngineError;
use crate::infra::metrics::Metrics;
use crate::io::links::{NetworkLink, RadioLink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Which channel carried a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Radio,
    Network,
}

impl Channel {
    pub fn as_str(&self) -> &str {
        match self {
            Channel::Radio => "radio",
            Channel::Network => "network",
        }
    }
}

pub struct CommunicationRelay {
    radio: Arc<dyn RadioLink>,
    network: Arc<dyn NetworkLink>,
    /// Whether the secondary channel is believed established
    secondary_up: AtomicBool,
    attempt_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl CommunicationRelay {
    pub fn new(
        radio: Arc<dyn RadioLink>,
        network: Arc<dyn NetworkLink>,
        attempt_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            radio,
            network,
            secondary_up: AtomicBool::new(false),
            attempt_timeout,
            metrics,
        }
    }

    /// Send a message, primary first, failing over once to the secondary.
    pub async fn send(&self, message: &str) -> Result<Channel, EngineError> {
        let primary_ok = matches!(
            tokio::time::timeout(self.attempt_timeout, self.radio.send(message)).await,
            Ok(true)
        );
        if primary_ok {
            self.metrics.record_relay_primary();
            info!(channel = "radio", message = %message, "relay_sent");
            return Ok(Channel::Radio);
        }
        warn!(message = %message, "relay_primary_failed");

        if !self.secondary_up.load(Ordering::Acquire) {
            let connected = matches!(
                tokio::time::timeout(self.attempt_timeout, self.network.connect()).await,
                Ok(true)
            );
            if !connected {
                self.metrics.record_relay_failed();
                return Err(EngineError::RelayFailed);
            }
            self.secondary_up.store(true, Ordering::Release);
        }

        let secondary_ok = matches!(
            tokio::time::timeout(self.attempt_timeout, self.network.send(message)).await,
            Ok(true)
        );
        if secondary_ok {
            self.metrics.record_relay_fallback();
            info!(channel = "network", message = %message, "relay_sent");
            Ok(Channel::Network)
        } else {
            // Drop the channel so the next call re-establishes it
            self.secondary_up.store(false, Ordering::Release);
            self.metrics.record_relay_failed();
            Err(EngineError::RelayFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct MockRadio {
        ok: AtomicBool,
        sends: AtomicUsize,
    }

    impl MockRadio {
        fn new(ok: bool) -> Arc<Self> {
            Arc::new(Self { ok: AtomicBool::new(ok), sends: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl RadioLink for MockRadio {
        async fn send(&self, _message: &str) -> bool {
            self.sends.fetch_add(1, Ordering::Relaxed);
            self.ok.load(Ordering::Relaxed)
        }
    }

    struct MockNetwork {
        connect_ok: AtomicBool,
        send_ok: AtomicBool,
        connects: AtomicUsize,
        sends: AtomicUsize,
    }

    impl MockNetwork {
        fn new(connect_ok: bool, send_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                connect_ok: AtomicBool::new(connect_ok),
                send_ok: AtomicBool::new(send_ok),
                connects: AtomicUsize::new(0),
                sends: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NetworkLink for MockNetwork {
        async fn connect(&self) -> bool {
            self.connects.fetch_add(1, Ordering::Relaxed);
            self.connect_ok.load(Ordering::Relaxed)
        }

        async fn send(&self, _message: &str) -> bool {
            self.sends.fetch_add(1, Ordering::Relaxed);
            self.send_ok.load(Ordering::Relaxed)
        }
    }

    fn relay(radio: Arc<MockRadio>, network: Arc<MockNetwork>) -> CommunicationRelay {
        CommunicationRelay::new(radio, network, Duration::from_millis(100), Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn test_primary_success_never_touches_secondary() {
        let radio = MockRadio::new(true);
        let network = MockNetwork::new(true, true);
        let relay = relay(radio.clone(), network.clone());

        assert_eq!(relay.send("ALERT x1").await.unwrap(), Channel::Radio);
        assert_eq!(network.connects.load(Ordering::Relaxed), 0);
        assert_eq!(network.sends.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_failover_to_secondary() {
        let radio = MockRadio::new(false);
        let network = MockNetwork::new(true, true);
        let relay = relay(radio.clone(), network.clone());

        assert_eq!(relay.send("ALERT x1").await.unwrap(), Channel::Network);
        assert_eq!(network.connects.load(Ordering::Relaxed), 1);

        // Established channel is reused, not reconnected
        assert_eq!(relay.send("ALERT x2").await.unwrap(), Channel::Network);
        assert_eq!(network.connects.load(Ordering::Relaxed), 1);
        assert_eq!(network.sends.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_both_fail_returns_relay_failed() {
        let radio = MockRadio::new(false);
        let network = MockNetwork::new(false, false);
        let relay = relay(radio.clone(), network.clone());

        assert_eq!(relay.send("ALERT x1").await.unwrap_err(), EngineError::RelayFailed);
        // One attempt per channel per call, no retries
        assert_eq!(radio.sends.load(Ordering::Relaxed), 1);
        assert_eq!(network.connects.load(Ordering::Relaxed), 1);
        assert_eq!(network.sends.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_secondary_failure_reestablishes_next_call() {
        let radio = MockRadio::new(false);
        let network = MockNetwork::new(true, false);
        let relay = relay(radio.clone(), network.clone());

        assert_eq!(relay.send("ALERT x1").await.unwrap_err(), EngineError::RelayFailed);
        assert_eq!(network.connects.load(Ordering::Relaxed), 1);

        // Secondary recovers; the next call reconnects from scratch
        network.send_ok.store(true, Ordering::Relaxed);
        assert_eq!(relay.send("ALERT x2").await.unwrap(), Channel::Network);
        assert_eq!(network.connects.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_primary_recovery_preferred_again() {
        let radio = MockRadio::new(false);
        let network = MockNetwork::new(true, true);
        let relay = relay(radio.clone(), network.clone());

        assert_eq!(relay.send("ALERT x1").await.unwrap(), Channel::Network);

        radio.ok.store(true, Ordering::Relaxed);
        assert_eq!(relay.send("ALERT x2").await.unwrap(), Channel::Radio);
    }
}
