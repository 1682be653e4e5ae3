//! Sensor reading over the controller serial link
//!
//! Response format for `READ <post>`: five comma-separated fields,
//! `laser,photodiode,pir,radar,seismic` - the first three are 0/1 flags,
//! radar and seismic are continuous values.

use crate::domain::error::ReadError;
use crate::domain::types::{PostId, SensorSnapshot};
use crate::io::esp_link::EspLink;
use async_trait::async_trait;
use std::sync::Arc;

/// External sensor reader seam; the engine only depends on this trait
#[async_trait]
pub trait SensorReader: Send + Sync {
    async fn read(&self, post_id: &PostId) -> Result<SensorSnapshot, ReadError>;
}

/// Reads snapshots by querying the ESP controller over serial
pub struct SerialSensorReader {
    link: Arc<EspLink>,
}

impl SerialSensorReader {
    pub fn new(link: Arc<EspLink>) -> Self {
        Self { link }
    }
}

#[async_trait]
impl SensorReader for SerialSensorReader {
    async fn read(&self, post_id: &PostId) -> Result<SensorSnapshot, ReadError> {
        let response = self.link.command(&format!("READ {}", post_id)).await?;
        parse_snapshot(&response)
    }
}

fn parse_snapshot(response: &str) -> Result<SensorSnapshot, ReadError> {
    let fields: Vec<&str> = response.split(',').map(str::trim).collect();
    if fields.len() != 5 {
        return Err(ReadError::Malformed(format!(
            "expected 5 fields, got {}: {:?}",
            fields.len(),
            response
        )));
    }

    let flag = |s: &str| -> Result<bool, ReadError> {
        match s {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(ReadError::Malformed(format!("expected 0/1 flag, got {:?}", other))),
        }
    };
    let value = |s: &str| -> Result<f64, ReadError> {
        s.parse::<f64>()
            .map_err(|_| ReadError::Malformed(format!("expected numeric value, got {:?}", s)))
    };

    Ok(SensorSnapshot {
        laser: flag(fields[0])?,
        photodiode: flag(fields[1])?,
        pir: flag(fields[2])?,
        radar: value(fields[3])?,
        seismic: value(fields[4])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        let snapshot = parse_snapshot("1,1,0,2.5,1").unwrap();
        assert!(snapshot.laser);
        assert!(snapshot.photodiode);
        assert!(!snapshot.pir);
        assert_eq!(snapshot.radar, 2.5);
        assert_eq!(snapshot.seismic, 1.0);
    }

    #[test]
    fn test_parse_snapshot_trims_whitespace() {
        let snapshot = parse_snapshot("1, 0, 1, 4.0, 6").unwrap();
        assert!(!snapshot.photodiode);
        assert_eq!(snapshot.radar, 4.0);
    }

    #[test]
    fn test_parse_snapshot_wrong_field_count() {
        assert!(matches!(parse_snapshot("1,1,0"), Err(ReadError::Malformed(_))));
    }

    #[test]
    fn test_parse_snapshot_bad_flag() {
        assert!(matches!(parse_snapshot("2,1,0,1.0,1.0"), Err(ReadError::Malformed(_))));
    }

    #[test]
    fn test_parse_snapshot_bad_value() {
        assert!(matches!(parse_snapshot("1,1,0,high,1.0"), Err(ReadError::Malformed(_))));
    }
}
