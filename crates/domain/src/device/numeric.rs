//! Numeric sensors: thermometer, hygrometer and wattmeter.

use rand::Rng;

use super::Tick;
use crate::error::ConfigurationError;
use crate::generator::{Reading, StepRange};

/// A reading that can be rendered in a status message.
pub trait Measurement: Reading {
    /// Render the value followed by its unit.
    fn render(self, unit: &str) -> String;

    /// Whether `self` and `other` are distinguishable readings.
    fn differs(self, other: Self) -> bool;

    /// Lossy view used in error reports.
    fn as_f64(self) -> f64;
}

impl Measurement for f64 {
    fn render(self, unit: &str) -> String {
        format!("{self:.1} {unit}")
    }

    fn differs(self, other: Self) -> bool {
        (self - other).abs() > f64::EPSILON
    }

    fn as_f64(self) -> f64 {
        self
    }
}

impl Measurement for i64 {
    fn render(self, unit: &str) -> String {
        format!("{self} {unit}")
    }

    fn differs(self, other: Self) -> bool {
        self != other
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

/// A random-walk sensor bounded to `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSensor<T> {
    range: StepRange<T>,
    value: T,
    unit: String,
}

/// Temperature in a configured unit.
pub type Thermometer = NumericSensor<f64>;
/// Relative humidity in percent, bounded to `[0, 100]`.
pub type Hygrometer = NumericSensor<f64>;
/// Power draw in whole units.
pub type Wattmeter = NumericSensor<i64>;

impl<T: Measurement> NumericSensor<T> {
    #[must_use]
    pub fn new(min: T, max: T, min_step: T, max_step: T, value: T, unit: impl Into<String>) -> Self {
        Self {
            range: StepRange {
                min,
                max,
                min_step,
                max_step,
            },
            value,
            unit: unit.into(),
        }
    }

    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }

    #[must_use]
    pub fn range(&self) -> &StepRange<T> {
        &self.range
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub(super) fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Tick {
        let next = self.range.next(self.value, rng);
        let changed = next.differs(self.value);
        self.value = next;
        Tick::State {
            value: next.render(&self.unit),
            changed,
        }
    }

    pub(super) fn validate(
        &self,
        kind: super::DeviceKind,
        name: &str,
    ) -> Result<(), ConfigurationError> {
        let StepRange {
            min,
            max,
            min_step,
            max_step,
        } = self.range;
        if min > max {
            return Err(ConfigurationError::InvalidBounds {
                kind,
                name: name.to_string(),
                min: min.as_f64(),
                max: max.as_f64(),
            });
        }
        if min_step.as_f64() < 0.0 || min_step > max_step {
            return Err(ConfigurationError::InvalidStepRange {
                kind,
                name: name.to_string(),
                min_step: min_step.as_f64(),
                max_step: max_step.as_f64(),
            });
        }
        if !self.range.contains(self.value) {
            return Err(ConfigurationError::ValueOutOfBounds {
                kind,
                name: name.to_string(),
                value: self.value.as_f64(),
                min: min.as_f64(),
                max: max.as_f64(),
            });
        }
        Ok(())
    }
}
