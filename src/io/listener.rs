//! Operator command TCP listener
//!
//! Line protocol, one reply line per command:
//! - `destroy <post>` / `off <post>` / `restore <post>` / `alarm_off <post>`
//! - `status`   -> JSON document with all post statuses and the current route
//! - `shutdown` -> stops the whole engine
//!
//! Replies are `ok ...` / `err <reason>`; unknown input gets a usage hint.

use crate::domain::command::{Command, CommandOutcome, CommandRequest, CommandResult};
use crate::domain::types::PostId;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Command listener configuration
#[derive(Debug, Clone)]
pub struct CommandListenerConfig {
    pub port: u16,
    pub enabled: bool,
}

impl Default for CommandListenerConfig {
    fn default() -> Self {
        Self { port: 7070, enabled: true }
    }
}

/// Start the operator command listener.
///
/// Each connection is handled on its own task; commands are forwarded to the
/// coordinator and the reply is written back as a single line.
pub async fn start_command_listener(
    config: CommandListenerConfig,
    cmd_tx: mpsc::Sender<CommandRequest>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if !config.enabled {
        info!("command_listener_disabled");
        return Ok(());
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(port = %config.port, "command_listener_started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("command_listener_shutdown");
                    return Ok(());
                }
            }
            result = listener.accept() => {
                match result {
                    Ok((socket, addr)) => {
                        let tx = cmd_tx.clone();
                        tokio::spawn(async move {
                            handle_connection(socket, addr, tx).await;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "command_listener_accept_failed");
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    socket: tokio::net::TcpStream,
    addr: SocketAddr,
    cmd_tx: mpsc::Sender<CommandRequest>,
) {
    let peer = addr.to_string();
    debug!(peer = %peer, "command_connection_accepted");

    let (read_half, mut write_half) = socket.into_split();
    let reader = BufReader::new(read_half);
    let mut lines = reader.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match parse_command(line) {
            Ok(cmd) => cmd,
            Err(usage) => {
                let _ = write_half.write_all(format!("err {}\n", usage).as_bytes()).await;
                continue;
            }
        };

        info!(peer = %peer, command = %line, "command_received");

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = CommandRequest { command, reply: reply_tx };
        if cmd_tx.send(request).await.is_err() {
            warn!(peer = %peer, "command_channel_closed");
            let _ = write_half.write_all(b"err engine stopped\n").await;
            break;
        }

        let response = match reply_rx.await {
            Ok(result) => format_reply(result),
            Err(_) => "err engine stopped".to_string(),
        };
        if write_half.write_all(format!("{}\n", response).as_bytes()).await.is_err() {
            break;
        }
    }

    debug!(peer = %peer, "command_connection_closed");
}

fn parse_command(line: &str) -> Result<Command, String> {
    const USAGE: &str =
        "usage: destroy <post> | off <post> | restore <post> | alarm_off <post> | status | shutdown";

    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(USAGE.to_string());
    }

    let with_post = |arg: Option<&str>, build: fn(PostId) -> Command| {
        arg.map(|id| build(PostId::from(id))).ok_or_else(|| USAGE.to_string())
    };

    match verb.as_str() {
        "destroy" => with_post(arg, Command::Destroy),
        "off" => with_post(arg, Command::TurnOff),
        "restore" => with_post(arg, Command::Restore),
        "alarm_off" => with_post(arg, Command::AlarmOff),
        "status" if arg.is_none() => Ok(Command::Status),
        "shutdown" if arg.is_none() => Ok(Command::Shutdown),
        _ => Err(USAGE.to_string()),
    }
}

fn format_reply(result: CommandResult) -> String {
    match result {
        Ok(CommandOutcome::Transition { id, from, to }) => {
            format!("ok {} {} -> {}", id, from, to)
        }
        Ok(CommandOutcome::AlarmCancelled(id)) => format!("ok alarm_off {}", id),
        Ok(CommandOutcome::Status(report)) => serde_json::to_string(&report)
            .unwrap_or_else(|e| format!("err status serialization: {}", e)),
        Ok(CommandOutcome::ShuttingDown) => "ok shutdown".to_string(),
        Err(e) => format!("err {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::EngineError;
    use crate::domain::types::PostStatus;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("destroy x3"), Ok(Command::Destroy(PostId::from("x3"))));
        assert_eq!(parse_command("off x1"), Ok(Command::TurnOff(PostId::from("x1"))));
        assert_eq!(parse_command("restore x2"), Ok(Command::Restore(PostId::from("x2"))));
        assert_eq!(parse_command("alarm_off x4"), Ok(Command::AlarmOff(PostId::from("x4"))));
        assert_eq!(parse_command("status"), Ok(Command::Status));
        assert_eq!(parse_command("SHUTDOWN"), Ok(Command::Shutdown));
    }

    #[test]
    fn test_parse_command_rejects_garbage() {
        assert!(parse_command("destroy").is_err());
        assert!(parse_command("status x1").is_err());
        assert!(parse_command("destroy x1 x2").is_err());
        assert!(parse_command("reboot").is_err());
    }

    #[test]
    fn test_format_reply() {
        let ok = format_reply(Ok(CommandOutcome::Transition {
            id: PostId::from("x3"),
            from: PostStatus::Active,
            to: PostStatus::Destroyed,
        }));
        assert_eq!(ok, "ok x3 active -> destroyed");

        let err = format_reply(Err(EngineError::UnknownPost(PostId::from("x9"))));
        assert_eq!(err, "err unknown post x9");
    }
}
