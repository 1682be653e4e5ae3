//! Error taxonomy for the coordination engine
//!
//! Nothing here is globally fatal: the poll loop and command path log these
//! and continue. Operator commands surface them as the rejection reason.

use crate::domain::types::{PostId, PostStatus};
use thiserror::Error;

/// Engine-level failures shared by the registry, relay, and topology paths
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("unknown post {0}")]
    UnknownPost(PostId),

    #[error("invalid transition for {id}: {from} -> {attempted}")]
    InvalidTransition { id: PostId, from: PostStatus, attempted: PostStatus },

    #[error("no active alarm for {0}")]
    NoActiveAlarm(PostId),

    #[error("both relay channels failed")]
    RelayFailed,

    #[error("insufficient active posts for a route ({active})")]
    InsufficientTopology { active: usize },
}

/// Sensor read failures, carried by the `SensorReader` seam.
///
/// A read error leaves the post's last snapshot stale; the cycle continues.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("sensor io: {0}")]
    Io(#[from] std::io::Error),

    #[error("sensor response timed out")]
    Timeout,

    #[error("malformed sensor response: {0}")]
    Malformed(String),
}
