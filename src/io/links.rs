//! Outbound alert channels: LoRa radio (primary) and TCP fallback (secondary)

use crate::io::esp_link::EspLink;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Primary outbound channel
#[async_trait]
pub trait RadioLink: Send + Sync {
    /// Returns true if the message was accepted by the radio
    async fn send(&self, message: &str) -> bool;
}

/// Secondary outbound channel, established lazily by the relay
#[async_trait]
pub trait NetworkLink: Send + Sync {
    async fn connect(&self) -> bool;
    async fn send(&self, message: &str) -> bool;
}

/// LoRa transmission via the controller serial link.
///
/// The controller answers `LORA_OK` when the message went out.
pub struct LoraRadioLink {
    link: Arc<EspLink>,
}

impl LoraRadioLink {
    pub fn new(link: Arc<EspLink>) -> Self {
        Self { link }
    }
}

#[async_trait]
impl RadioLink for LoraRadioLink {
    async fn send(&self, message: &str) -> bool {
        match self.link.command(&format!("LORA_SEND {}", message)).await {
            Ok(response) if response == "LORA_OK" => true,
            Ok(response) => {
                warn!(response = %response, "lora_send_rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "lora_send_failed");
                false
            }
        }
    }
}

/// TCP connection to the base server, newline-framed messages.
///
/// The stream is kept open across sends; any failure drops it so the
/// relay's next connect() re-establishes it.
pub struct TcpNetworkLink {
    addr: String,
    timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpNetworkLink {
    pub fn new(addr: String, timeout: Duration) -> Self {
        Self { addr, timeout, stream: Mutex::new(None) }
    }
}

#[async_trait]
impl NetworkLink for TcpNetworkLink {
    async fn connect(&self) -> bool {
        let mut guard = self.stream.lock().await;
        if guard.is_some() {
            return true;
        }
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => {
                info!(addr = %self.addr, "network_link_connected");
                *guard = Some(stream);
                true
            }
            Ok(Err(e)) => {
                warn!(addr = %self.addr, error = %e, "network_link_connect_failed");
                false
            }
            Err(_) => {
                warn!(addr = %self.addr, "network_link_connect_timeout");
                false
            }
        }
    }

    async fn send(&self, message: &str) -> bool {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return false;
        };

        let line = format!("{}\n", message);
        match tokio::time::timeout(self.timeout, stream.write_all(line.as_bytes())).await {
            Ok(Ok(())) => {
                debug!(addr = %self.addr, "network_link_sent");
                true
            }
            Ok(Err(e)) => {
                warn!(addr = %self.addr, error = %e, "network_link_send_failed");
                *guard = None;
                false
            }
            Err(_) => {
                warn!(addr = %self.addr, "network_link_send_timeout");
                *guard = None;
                false
            }
        }
    }
}
