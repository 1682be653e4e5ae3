//! Sensor-fusion intrusion classifier
//!
//! Pure, stateless decision table over one snapshot, evaluated in priority
//! order with first match winning. Beam loss (laser/photodiode down) is a
//! separate signal path handled by the coordinator, not a classification
//! outcome - see `SensorSnapshot::beam_loss`.

use crate::domain::types::{Classification, SensorSnapshot};

pub fn classify(s: &SensorSnapshot) -> Classification {
    if s.pir && (0.5..=1.5).contains(&s.radar) && s.seismic > 3.0 {
        Classification::Human
    } else if s.pir && s.radar > 1.5 && s.seismic <= 3.0 {
        Classification::Animal
    } else if s.pir && s.radar > 3.0 && s.seismic > 5.0 {
        Classification::Vehicle
    } else if !s.pir && s.radar == 0.0 && s.seismic < 2.0 {
        // Wind, insects, sensor noise
        Classification::FalseAlarm
    } else {
        Classification::Unknown
    }
}
