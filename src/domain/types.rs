//! Shared types for the perimeter engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Newtype wrapper for post identifiers ("x1", "x2", ...) to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        PostId(s.to_string())
    }
}

/// Lifecycle status of a perimeter post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Active,
    ManuallyOff,
    Destroyed,
}

impl PostStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PostStatus::Active => "active",
            PostStatus::ManuallyOff => "off",
            PostStatus::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed position of a post, set at registration and never mutated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One full reading of a post's five sensor channels.
///
/// Replaced wholesale on every poll; never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub laser: bool,
    pub photodiode: bool,
    pub pir: bool,
    pub radar: f64,
    pub seismic: f64,
}

impl SensorSnapshot {
    /// The primary laser/photodiode beam at this post is down.
    ///
    /// Treated as a destruction signal, independent of intrusion
    /// classification.
    pub fn beam_loss(&self) -> bool {
        !self.laser || !self.photodiode
    }
}

/// Intrusion category derived from a snapshot; never stored long-term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Human,
    Animal,
    Vehicle,
    FalseAlarm,
    Unknown,
}

impl Classification {
    pub fn as_str(&self) -> &str {
        match self {
            Classification::Human => "human",
            Classification::Animal => "animal",
            Classification::Vehicle => "vehicle",
            Classification::FalseAlarm => "false_alarm",
            Classification::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long an alarm session sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmMode {
    /// Auto-expires after the duration unless cancelled earlier
    Timed(Duration),
    /// Sounds until explicitly cancelled
    Indefinite,
}

impl std::fmt::Display for AlarmMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmMode::Timed(d) => write!(f, "timed({}ms)", d.as_millis()),
            AlarmMode::Indefinite => f.write_str("indefinite"),
        }
    }
}

/// A perimeter post as held by the registry
#[derive(Debug, Clone)]
pub struct Post {
    pub id: PostId,
    pub status: PostStatus,
    pub coordinates: Coordinates,
    /// Most recent reading; may be stale after a read error
    pub last_snapshot: Option<SensorSnapshot>,
}

impl Post {
    pub fn new(id: PostId, coordinates: Coordinates) -> Self {
        Self { id, status: PostStatus::Active, coordinates, last_snapshot: None }
    }
}

/// Closed loop of active posts used for signal-path planning.
///
/// The first id is repeated as the last element to close the ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    hops: Vec<PostId>,
}

impl Route {
    /// Build a route from active posts in registration order, closing the loop
    pub fn closed(active: Vec<PostId>) -> Self {
        let mut hops = active;
        if let Some(first) = hops.first().cloned() {
            hops.push(first);
        }
        Self { hops }
    }

    pub fn hops(&self) -> &[PostId] {
        &self.hops
    }

    /// Number of distinct posts on the route (excludes the closing hop)
    pub fn len(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.hops.contains(id)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for hop in &self.hops {
            if !first {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", hop)?;
            first = false;
        }
        Ok(())
    }
}
