//! Movement sensor: emits a detection event on a randomized cadence.

use super::Tick;

/// A movement detector with a fixed field of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSensor {
    horizontal_fov: u32,
    vertical_fov: u32,
    sensor_type: String,
}

impl MoveSensor {
    #[must_use]
    pub fn new(horizontal_fov: u32, vertical_fov: u32, sensor_type: impl Into<String>) -> Self {
        Self {
            horizontal_fov,
            vertical_fov,
            sensor_type: sensor_type.into(),
        }
    }

    #[must_use]
    pub fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    pub(super) fn tick(&self) -> Tick {
        Tick::Event(format!(
            "movement detected, {} sensor, field of view {}x{}",
            self.sensor_type, self.horizontal_fov, self.vertical_fov
        ))
    }
}
