//! Device: a simulated endpoint with identity, cadence and mutable state.
//!
//! A [`Device`] pairs the common identity fields (name, topics, optional
//! command routing) with a [`DeviceModel`] holding the kind-specific bounds
//! and current value. Each device owns a random generator seeded once at
//! creation; every tick and every sampled period draws from it.

mod camera;
mod motion;
mod numeric;
mod switchable;

pub use camera::Camera;
pub use motion::MoveSensor;
pub use numeric::{Hygrometer, Measurement, NumericSensor, Thermometer, Wattmeter};
pub use switchable::Switchable;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, UnknownStateError};
use crate::generator;
use crate::id::RoutingKey;

/// The eight simulated device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Thermometer,
    Hygrometer,
    Wattmeter,
    MoveSensor,
    Light,
    Camera,
    Relay,
    Valve,
}

impl DeviceKind {
    /// Every kind, in device-file order.
    pub const ALL: [Self; 8] = [
        Self::Thermometer,
        Self::Hygrometer,
        Self::Wattmeter,
        Self::MoveSensor,
        Self::Light,
        Self::Camera,
        Self::Relay,
        Self::Valve,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thermometer => "thermometer",
            Self::Hygrometer => "hygrometer",
            Self::Wattmeter => "wattmeter",
            Self::MoveSensor => "move_sensor",
            Self::Light => "light",
            Self::Camera => "camera",
            Self::Relay => "relay",
            Self::Valve => "valve",
        }
    }

    /// Whether devices of this kind accept inbound commands.
    #[must_use]
    pub fn accepts_commands(self) -> bool {
        matches!(self, Self::Light | Self::Relay | Self::Valve)
    }

    /// Whether devices of this kind must publish periodically.
    #[must_use]
    pub fn requires_cadence(self) -> bool {
        !matches!(self, Self::Relay)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a device publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// A fixed period.
    Fixed(Duration),
    /// A period resampled on every tick within `[min, max]`.
    Random { min: Duration, max: Duration },
}

impl Cadence {
    fn is_valid(self) -> bool {
        match self {
            Self::Fixed(period) => !period.is_zero(),
            Self::Random { min, max } => !min.is_zero() && min <= max,
        }
    }
}

/// Kind-specific state of a device.
#[derive(Debug, Clone)]
pub enum DeviceModel {
    Thermometer(Thermometer),
    Hygrometer(Hygrometer),
    Wattmeter(Wattmeter),
    MoveSensor(MoveSensor),
    Light(Switchable),
    Camera(Camera),
    Relay(Switchable),
    Valve(Switchable),
}

impl DeviceModel {
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Thermometer(_) => DeviceKind::Thermometer,
            Self::Hygrometer(_) => DeviceKind::Hygrometer,
            Self::Wattmeter(_) => DeviceKind::Wattmeter,
            Self::MoveSensor(_) => DeviceKind::MoveSensor,
            Self::Light(_) => DeviceKind::Light,
            Self::Camera(_) => DeviceKind::Camera,
            Self::Relay(_) => DeviceKind::Relay,
            Self::Valve(_) => DeviceKind::Valve,
        }
    }

    fn switchable(&self) -> Option<&Switchable> {
        match self {
            Self::Light(s) | Self::Relay(s) | Self::Valve(s) => Some(s),
            _ => None,
        }
    }

    fn switchable_mut(&mut self) -> Option<&mut Switchable> {
        match self {
            Self::Light(s) | Self::Relay(s) | Self::Valve(s) => Some(s),
            _ => None,
        }
    }
}

/// Output of one simulation tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// A new value, and whether it differs from the previous one.
    State { value: String, changed: bool },
    /// A one-off event description (movement detection).
    Event(String),
    /// An image file whose content is the payload.
    Image(PathBuf),
}

/// A simulated device.
#[derive(Debug, Clone)]
pub struct Device {
    name: String,
    publish_topic: String,
    routing: Option<RoutingKey>,
    cadence: Option<Cadence>,
    model: DeviceModel,
    rng: StdRng,
}

impl Device {
    /// Create a builder for a device with the given model.
    #[must_use]
    pub fn builder(model: DeviceModel) -> DeviceBuilder {
        DeviceBuilder {
            model,
            name: None,
            publish_topic: None,
            routing: None,
            cadence: None,
            seed: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.model.kind()
    }

    /// Display label used in every status message.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Topic the device publishes its status to.
    #[must_use]
    pub fn publish_topic(&self) -> &str {
        &self.publish_topic
    }

    /// Inbound routing key, for devices that accept commands.
    #[must_use]
    pub fn routing_key(&self) -> Option<&RoutingKey> {
        self.routing.as_ref().filter(|_| self.kind().accepts_commands())
    }

    #[must_use]
    pub fn cadence(&self) -> Option<Cadence> {
        self.cadence
    }

    #[must_use]
    pub fn model(&self) -> &DeviceModel {
        &self.model
    }

    /// Allowed states of an enumerated-state device.
    #[must_use]
    pub fn allowed_states(&self) -> Option<&[String]> {
        self.model.switchable().map(Switchable::states)
    }

    /// Current state name of an enumerated-state device, if set.
    #[must_use]
    pub fn current_state(&self) -> Option<&str> {
        self.model.switchable().and_then(Switchable::current)
    }

    /// Duration to wait before the next tick, or `None` for command-only
    /// devices.
    pub fn next_wait(&mut self) -> Option<Duration> {
        match self.cadence? {
            Cadence::Fixed(period) => Some(period),
            Cadence::Random { min, max } => Some(generator::sample_period(min, max, &mut self.rng)),
        }
    }

    /// Compute the next simulated state.
    pub fn tick(&mut self) -> Tick {
        let rng = &mut self.rng;
        match &mut self.model {
            DeviceModel::Thermometer(sensor) | DeviceModel::Hygrometer(sensor) => sensor.tick(rng),
            DeviceModel::Wattmeter(sensor) => sensor.tick(rng),
            DeviceModel::MoveSensor(sensor) => sensor.tick(),
            DeviceModel::Camera(camera) => camera.tick(rng),
            DeviceModel::Light(s) | DeviceModel::Relay(s) | DeviceModel::Valve(s) => s.tick(rng),
        }
    }

    /// Switch an enumerated-state device to `requested`.
    ///
    /// Returns whether the state actually changed.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownStateError`] when `requested` is not an allowed
    /// state, or the device has no enumerated states at all. The current
    /// state is left untouched in that case.
    pub fn apply_state(&mut self, requested: &str) -> Result<bool, UnknownStateError> {
        let unknown = || UnknownStateError {
            device: self.name.clone(),
            state: requested.to_string(),
        };
        let Some(switchable) = self.model.switchable_mut() else {
            return Err(unknown());
        };
        switchable.apply(requested).ok_or_else(unknown)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let kind = self.kind();
        let missing = |field| ConfigurationError::MissingField {
            kind,
            name: self.name.clone(),
            field,
        };

        if self.name.is_empty() {
            return Err(missing("name"));
        }
        if self.publish_topic.is_empty() {
            return Err(missing("topic"));
        }

        if kind.accepts_commands() {
            let routing = self.routing.as_ref().ok_or_else(|| missing("receive_topic"))?;
            if routing.receive_topic.is_empty() {
                return Err(missing("receive_topic"));
            }
            if routing.id.is_empty() {
                return Err(missing("id"));
            }
        }

        match self.cadence {
            Some(cadence) if !cadence.is_valid() => {
                return Err(ConfigurationError::InvalidPeriod {
                    kind,
                    name: self.name.clone(),
                });
            }
            None if kind.requires_cadence() => {
                return Err(ConfigurationError::InvalidPeriod {
                    kind,
                    name: self.name.clone(),
                });
            }
            _ => {}
        }

        match &self.model {
            DeviceModel::Thermometer(sensor) | DeviceModel::Hygrometer(sensor) => {
                sensor.validate(kind, &self.name)
            }
            DeviceModel::Wattmeter(sensor) => sensor.validate(kind, &self.name),
            DeviceModel::MoveSensor(_) => Ok(()),
            DeviceModel::Camera(camera) => camera.validate(&self.name),
            DeviceModel::Light(s) | DeviceModel::Relay(s) | DeviceModel::Valve(s) => {
                s.validate(kind, &self.name)
            }
        }
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug)]
pub struct DeviceBuilder {
    model: DeviceModel,
    name: Option<String>,
    publish_topic: Option<String>,
    routing: Option<RoutingKey>,
    cadence: Option<Cadence>,
    seed: Option<u64>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn publish_topic(mut self, topic: impl Into<String>) -> Self {
        self.publish_topic = Some(topic.into());
        self
    }

    /// Accept commands sent on `receive_topic` with the given device `id`.
    #[must_use]
    pub fn receiver(mut self, receive_topic: impl Into<String>, id: impl Into<String>) -> Self {
        self.routing = Some(RoutingKey::new(receive_topic, id));
        self
    }

    #[must_use]
    pub fn period(mut self, period: Duration) -> Self {
        self.cadence = Some(Cadence::Fixed(period));
        self
    }

    #[must_use]
    pub fn period_range(mut self, min: Duration, max: Duration) -> Self {
        self.cadence = Some(Cadence::Random { min, max });
        self
    }

    /// Seed the device's random generator; without a seed it is drawn from
    /// OS entropy.
    #[must_use]
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if any invariant is violated.
    pub fn build(self) -> Result<Device, ConfigurationError> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let device = Device {
            name: self.name.unwrap_or_default(),
            publish_topic: self.publish_topic.unwrap_or_default(),
            routing: self.routing,
            cadence: self.cadence,
            model: self.model,
            rng,
        };
        device.validate()?;
        Ok(device)
    }
}

/// Shared helper so sub-modules can draw from any random source.
fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<(usize, &'a T)> {
    let index = generator::pick_index(items.len(), rng)?;
    Some((index, &items[index]))
}
