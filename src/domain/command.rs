//! Operator command surface
//!
//! Commands arrive over the TCP listener (or any future surface), are handed
//! to the coordinator over an mpsc channel, and each carries a oneshot reply
//! slot so the caller gets the specific success or rejection.

use crate::domain::error::EngineError;
use crate::domain::types::{PostId, PostStatus};
use serde::Serialize;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Destroy(PostId),
    TurnOff(PostId),
    Restore(PostId),
    AlarmOff(PostId),
    Status,
    Shutdown,
}

/// A command plus its reply slot
#[derive(Debug)]
pub struct CommandRequest {
    pub command: Command,
    pub reply: oneshot::Sender<CommandResult>,
}

pub type CommandResult = Result<CommandOutcome, EngineError>;

#[derive(Debug)]
pub enum CommandOutcome {
    /// A lifecycle transition was applied
    Transition { id: PostId, from: PostStatus, to: PostStatus },
    /// An alarm session was cancelled
    AlarmCancelled(PostId),
    Status(StatusReport),
    ShuttingDown,
}

/// Full state view returned by the `status` command
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub site: String,
    pub posts: Vec<PostStatusEntry>,
    /// Hop sequence of the current route, or None while partitioned
    pub route: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostStatusEntry {
    pub id: String,
    pub status: String,
    pub x: f64,
    pub y: f64,
    pub alarm_sounding: bool,
}
