//! Device descriptors: the JSON device file and its conversion into
//! validated [`Device`]s.
//!
//! The file is a single object with one optional array per device kind:
//!
//! ```json
//! {
//!   "thermometers": [{ "topic": "home/kitchen/temp", "name": "Kitchen", "period": 5,
//!                      "min_temp": 15.0, "max_temp": 30.0, "min_step": 0.1,
//!                      "max_step": 0.5, "temp": 21.0, "unit": "°C" }],
//!   "lights": [{ "topic": "home/lamp", "name": "Lamp", "period": 10, "id": "L1",
//!                "receive_topic": "home/lights", "states": ["on", "off"] }]
//! }
//! ```
//!
//! Older files spell some keys differently (`"move sensors"`,
//! `"recieving topic"`, `"answering topic"`, `"horizontal_FOV"`); those
//! spellings are accepted as aliases.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::device::{Camera, Device, DeviceKind, DeviceModel, MoveSensor, NumericSensor, Switchable};
use crate::error::ConfigurationError;

/// Relative humidity is always simulated in percent.
const HUMIDITY_MIN: f64 = 0.0;
const HUMIDITY_MAX: f64 = 100.0;

/// Parsed device file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeviceFile {
    pub thermometers: Vec<ThermometerDescriptor>,
    pub hygrometers: Vec<HygrometerDescriptor>,
    pub wattmeters: Vec<WattmeterDescriptor>,
    #[serde(alias = "move sensors")]
    pub move_sensors: Vec<MoveSensorDescriptor>,
    pub lights: Vec<SwitchableDescriptor>,
    pub cameras: Vec<CameraDescriptor>,
    pub relays: Vec<RelayDescriptor>,
    pub valves: Vec<SwitchableDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThermometerDescriptor {
    pub topic: String,
    pub name: String,
    pub period: u64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub temp: f64,
    pub unit: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HygrometerDescriptor {
    pub topic: String,
    pub name: String,
    pub period: u64,
    pub min_step: f64,
    pub max_step: f64,
    pub humidity: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WattmeterDescriptor {
    pub topic: String,
    pub name: String,
    pub period: u64,
    pub min_val: i64,
    pub max_val: i64,
    pub min_step: i64,
    pub max_step: i64,
    pub value: i64,
    pub unit: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveSensorDescriptor {
    pub topic: String,
    pub name: String,
    pub min_period: u64,
    pub max_period: u64,
    #[serde(alias = "horizontal_FOV")]
    pub horizontal_fov: u32,
    #[serde(alias = "vertical_FOV")]
    pub vertical_fov: u32,
    #[serde(rename = "type")]
    pub sensor_type: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Light or valve: periodic publisher that also accepts commands.
#[derive(Debug, Clone, Deserialize)]
pub struct SwitchableDescriptor {
    pub topic: String,
    pub name: String,
    pub period: u64,
    pub id: String,
    #[serde(alias = "recieving topic")]
    pub receive_topic: String,
    pub states: Vec<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Relay: command-only unless a period is given.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayDescriptor {
    #[serde(alias = "answering topic")]
    pub topic: String,
    pub name: String,
    pub id: String,
    #[serde(alias = "recieving topic")]
    pub receive_topic: String,
    pub states: Vec<String>,
    #[serde(default)]
    pub period: Option<u64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraDescriptor {
    pub topic: String,
    pub name: String,
    pub min_period: u64,
    pub max_period: u64,
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl DeviceFile {
    /// Parse a device file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Parse`] when the JSON is malformed or a
    /// required field is missing.
    pub fn from_json(content: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(content).map_err(ConfigurationError::Parse)
    }

    /// Number of descriptors in the file, across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.thermometers.len()
            + self.hygrometers.len()
            + self.wattmeters.len()
            + self.move_sensors.len()
            + self.lights.len()
            + self.cameras.len()
            + self.relays.len()
            + self.valves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build and validate the devices of the `enabled` kinds (all kinds when
    /// `enabled` is empty), in device-file order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] raised by any descriptor.
    pub fn into_devices(self, enabled: &[DeviceKind]) -> Result<Vec<Device>, ConfigurationError> {
        let wants = |kind| enabled.is_empty() || enabled.contains(&kind);
        let mut devices = Vec::with_capacity(self.len());

        if wants(DeviceKind::Thermometer) {
            for d in self.thermometers {
                devices.push(d.into_device()?);
            }
        }
        if wants(DeviceKind::Hygrometer) {
            for d in self.hygrometers {
                devices.push(d.into_device()?);
            }
        }
        if wants(DeviceKind::Wattmeter) {
            for d in self.wattmeters {
                devices.push(d.into_device()?);
            }
        }
        if wants(DeviceKind::MoveSensor) {
            for d in self.move_sensors {
                devices.push(d.into_device()?);
            }
        }
        if wants(DeviceKind::Light) {
            for d in self.lights {
                devices.push(d.into_device(DeviceKind::Light)?);
            }
        }
        if wants(DeviceKind::Camera) {
            for d in self.cameras {
                devices.push(d.into_device()?);
            }
        }
        if wants(DeviceKind::Relay) {
            for d in self.relays {
                devices.push(d.into_device()?);
            }
        }
        if wants(DeviceKind::Valve) {
            for d in self.valves {
                devices.push(d.into_device(DeviceKind::Valve)?);
            }
        }

        Ok(devices)
    }
}

impl ThermometerDescriptor {
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the descriptor violates an invariant.
    pub fn into_device(self) -> Result<Device, ConfigurationError> {
        let sensor = NumericSensor::new(
            self.min_temp,
            self.max_temp,
            self.min_step,
            self.max_step,
            self.temp,
            self.unit,
        );
        Device::builder(DeviceModel::Thermometer(sensor))
            .name(self.name)
            .publish_topic(self.topic)
            .period(Duration::from_secs(self.period))
            .seed(self.seed)
            .build()
    }
}

impl HygrometerDescriptor {
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the descriptor violates an invariant.
    pub fn into_device(self) -> Result<Device, ConfigurationError> {
        let sensor = NumericSensor::new(
            HUMIDITY_MIN,
            HUMIDITY_MAX,
            self.min_step,
            self.max_step,
            self.humidity,
            "%",
        );
        Device::builder(DeviceModel::Hygrometer(sensor))
            .name(self.name)
            .publish_topic(self.topic)
            .period(Duration::from_secs(self.period))
            .seed(self.seed)
            .build()
    }
}

impl WattmeterDescriptor {
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the descriptor violates an invariant.
    pub fn into_device(self) -> Result<Device, ConfigurationError> {
        let sensor = NumericSensor::new(
            self.min_val,
            self.max_val,
            self.min_step,
            self.max_step,
            self.value,
            self.unit,
        );
        Device::builder(DeviceModel::Wattmeter(sensor))
            .name(self.name)
            .publish_topic(self.topic)
            .period(Duration::from_secs(self.period))
            .seed(self.seed)
            .build()
    }
}

impl MoveSensorDescriptor {
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the descriptor violates an invariant.
    pub fn into_device(self) -> Result<Device, ConfigurationError> {
        let sensor = MoveSensor::new(self.horizontal_fov, self.vertical_fov, self.sensor_type);
        Device::builder(DeviceModel::MoveSensor(sensor))
            .name(self.name)
            .publish_topic(self.topic)
            .period_range(
                Duration::from_secs(self.min_period),
                Duration::from_secs(self.max_period),
            )
            .seed(self.seed)
            .build()
    }
}

impl SwitchableDescriptor {
    /// Build a light or a valve.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the descriptor violates an invariant.
    pub fn into_device(self, kind: DeviceKind) -> Result<Device, ConfigurationError> {
        let switchable = Switchable::new(self.states);
        let model = match kind {
            DeviceKind::Valve => DeviceModel::Valve(switchable),
            _ => DeviceModel::Light(switchable),
        };
        Device::builder(model)
            .name(self.name)
            .publish_topic(self.topic)
            .receiver(self.receive_topic, self.id)
            .period(Duration::from_secs(self.period))
            .seed(self.seed)
            .build()
    }
}

impl RelayDescriptor {
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the descriptor violates an invariant.
    pub fn into_device(self) -> Result<Device, ConfigurationError> {
        let mut builder = Device::builder(DeviceModel::Relay(Switchable::new(self.states)))
            .name(self.name)
            .publish_topic(self.topic)
            .receiver(self.receive_topic, self.id)
            .seed(self.seed);
        if let Some(period) = self.period {
            builder = builder.period(Duration::from_secs(period));
        }
        builder.build()
    }
}

impl CameraDescriptor {
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the descriptor violates an invariant.
    pub fn into_device(self) -> Result<Device, ConfigurationError> {
        Device::builder(DeviceModel::Camera(Camera::new(self.images)))
            .name(self.name)
            .publish_topic(self.topic)
            .period_range(
                Duration::from_secs(self.min_period),
                Duration::from_secs(self.max_period),
            )
            .seed(self.seed)
            .build()
    }
}
