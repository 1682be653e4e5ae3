//! Serial command/response link to the sensor controller
//!
//! Line protocol (115200 8N1):
//! - `READ <post>`      -> `laser,photodiode,pir,radar,seismic`
//! - `LORA_SEND <msg>`  -> `LORA_OK` on success
//! - `ALARM ON|OFF`     -> fire-and-forget acknowledgement
//!
//! Responses are newline-terminated and can arrive in chunks, so a
//! persistent buffer accumulates bytes across reads. The port is opened
//! lazily and dropped on any I/O error so the next command reopens it.

use crate::domain::error::ReadError;
use crate::infra::config::Config;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

struct LinkState {
    port: Option<SerialStream>,
    /// Partial response bytes carried over between reads
    read_buffer: Vec<u8>,
}

/// Shared client for the controller serial port.
///
/// One command/response exchange at a time; the internal mutex serializes
/// callers so request and response lines cannot interleave.
pub struct EspLink {
    device: String,
    baud: u32,
    response_timeout: Duration,
    state: Mutex<LinkState>,
}

impl EspLink {
    pub fn new(config: &Config) -> Self {
        Self {
            device: config.serial_device().to_string(),
            baud: config.serial_baud(),
            response_timeout: config.serial_response_timeout(),
            state: Mutex::new(LinkState { port: None, read_buffer: Vec::with_capacity(64) }),
        }
    }

    /// Send one command line and wait for one response line.
    pub async fn command(&self, command: &str) -> Result<String, ReadError> {
        let mut state = self.state.lock().await;

        if state.port.is_none() {
            let port = tokio_serial::new(&self.device, self.baud)
                .timeout(Duration::from_millis(100))
                .open_native_async()
                .map_err(|e| {
                    warn!(device = %self.device, error = %e, "serial_open_failed");
                    ReadError::Io(std::io::Error::new(std::io::ErrorKind::NotConnected, e))
                })?;
            info!(device = %self.device, baud = %self.baud, "serial_port_opened");
            state.port = Some(port);
            state.read_buffer.clear();
        }

        let line = format!("{}\n", command);
        // Take the buffer out so the port can be borrowed mutably alongside it
        let mut buffer = std::mem::take(&mut state.read_buffer);
        let result = {
            let port = state.port.as_mut().unwrap();
            match port.write_all(line.as_bytes()).await {
                Ok(()) => Self::read_line(port, &mut buffer, self.response_timeout).await,
                Err(e) => {
                    warn!(error = %e, "serial_write_error");
                    Err(ReadError::Io(e))
                }
            }
        };
        state.read_buffer = buffer;

        match result {
            Ok(response) => {
                debug!(command = %command, response = %response, "serial_exchange");
                Ok(response)
            }
            Err(e) => {
                if matches!(e, ReadError::Io(_)) {
                    state.port = None;
                }
                Err(e)
            }
        }
    }

    /// Accumulate bytes until a newline, bounded by the response timeout.
    async fn read_line(
        port: &mut SerialStream,
        buffer: &mut Vec<u8>,
        timeout: Duration,
    ) -> Result<String, ReadError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut chunk = [0u8; 64];

        loop {
            if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line).trim().to_string();
                return Ok(text);
            }

            let read = tokio::time::timeout_at(deadline, port.read(&mut chunk)).await;
            match read {
                Ok(Ok(0)) => {
                    // Zero-byte read, keep waiting until the deadline
                }
                Ok(Ok(n)) => buffer.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "serial_read_error");
                    return Err(ReadError::Io(e));
                }
                Err(_) => {
                    buffer.clear();
                    return Err(ReadError::Timeout);
                }
            }
        }
    }
}
