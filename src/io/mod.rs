//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `esp_link` - serial command/response client for the sensor controller
//! - `sensors` - `SensorReader` seam and the serial implementation
//! - `links` - `RadioLink` (LoRa) and `NetworkLink` (TCP fallback) channels
//! - `actuator` - `AlarmActuator` seam for the base-camp buzzer
//! - `listener` - TCP line-protocol operator command surface

pub mod actuator;
pub mod esp_link;
pub mod links;
pub mod listener;
pub mod sensors;

// Re-export commonly used types
pub use actuator::{AlarmActuator, SerialAlarmActuator};
pub use esp_link::EspLink;
pub use links::{LoraRadioLink, NetworkLink, RadioLink, TcpNetworkLink};
pub use listener::{start_command_listener, CommandListenerConfig};
pub use sensors::{SensorReader, SerialSensorReader};
