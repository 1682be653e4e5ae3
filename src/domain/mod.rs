//! Domain models - core types of the perimeter engine
//!
//! This module contains the canonical data types used throughout the system:
//! - `Post` / `PostId` / `PostStatus` - a perimeter sensing station and its lifecycle
//! - `SensorSnapshot` - one reading of the five sensor channels
//! - `Classification` - intrusion category derived from a snapshot
//! - `AlarmMode` - timed or indefinite alarm session
//! - `Route` - the closed loop of active posts
//! - `EngineError` / `ReadError` - failure taxonomy

pub mod command;
pub mod error;
pub mod types;
