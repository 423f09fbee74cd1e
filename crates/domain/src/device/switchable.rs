//! Enumerated-state devices: light, relay and valve.

use rand::Rng;

use super::{DeviceKind, Tick};
use crate::error::ConfigurationError;

/// An ordered list of allowed states and the index of the current one.
///
/// `current` is `None` until the first tick or command sets it; afterwards
/// it is always a valid index into `states`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switchable {
    states: Vec<String>,
    current: Option<usize>,
}

impl Switchable {
    #[must_use]
    pub fn new<S: Into<String>>(states: impl IntoIterator<Item = S>) -> Self {
        Self {
            states: states.into_iter().map(Into::into).collect(),
            current: None,
        }
    }

    #[must_use]
    pub fn states(&self) -> &[String] {
        &self.states
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.map(|index| self.states[index].as_str())
    }

    pub(super) fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Tick {
        match super::pick(&self.states, rng) {
            Some((index, state)) => {
                let changed = self.current != Some(index);
                let value = state.clone();
                self.current = Some(index);
                Tick::State { value, changed }
            }
            // Unreachable for a validated device: the state list is non-empty.
            None => Tick::State {
                value: String::new(),
                changed: false,
            },
        }
    }

    /// Switch to `requested`. Returns `None` if the state is unknown,
    /// otherwise whether the index changed.
    pub(super) fn apply(&mut self, requested: &str) -> Option<bool> {
        let index = self.states.iter().position(|s| s == requested)?;
        let changed = self.current != Some(index);
        self.current = Some(index);
        Some(changed)
    }

    pub(super) fn validate(&self, kind: DeviceKind, name: &str) -> Result<(), ConfigurationError> {
        if self.states.is_empty() {
            return Err(ConfigurationError::EmptyStates {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn should_start_unset() {
        let switchable = Switchable::new(["on", "off"]);
        assert_eq!(switchable.current_index(), None);
        assert_eq!(switchable.current(), None);
    }

    #[test]
    fn should_report_first_tick_as_changed() {
        let mut switchable = Switchable::new(["on"]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            switchable.tick(&mut rng),
            Tick::State {
                value: "on".to_string(),
                changed: true
            }
        );
        assert_eq!(
            switchable.tick(&mut rng),
            Tick::State {
                value: "on".to_string(),
                changed: false
            }
        );
    }

    #[test]
    fn should_return_none_for_unknown_state() {
        let mut switchable = Switchable::new(["open", "closed"]);
        assert_eq!(switchable.apply("ajar"), None);
        assert_eq!(switchable.current_index(), None);
    }

    #[test]
    fn should_reject_empty_state_list() {
        let switchable = Switchable::new(Vec::<String>::new());
        assert!(matches!(
            switchable.validate(DeviceKind::Light, "Lamp"),
            Err(ConfigurationError::EmptyStates { .. })
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Tick,
        Command(String),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Tick),
            prop_oneof![Just("on"), Just("off"), Just("dim"), Just("blink")]
                .prop_map(|s| Op::Command(s.to_string())),
        ]
    }

    proptest! {
        #[test]
        fn current_index_is_unset_or_valid(
            seed in any::<u64>(),
            ops in proptest::collection::vec(arb_op(), 0..64),
        ) {
            let mut switchable = Switchable::new(["on", "off", "dim"]);
            let mut rng = StdRng::seed_from_u64(seed);
            for op in ops {
                let before = switchable.current_index();
                match op {
                    Op::Tick => { switchable.tick(&mut rng); }
                    Op::Command(state) => {
                        if switchable.apply(&state).is_none() {
                            prop_assert_eq!(switchable.current_index(), before);
                        }
                    }
                }
                prop_assert!(switchable.current_index().is_none_or(|i| i < 3));
            }
        }
    }
}
