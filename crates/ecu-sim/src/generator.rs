//! Random Signal Value Generation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use signal_db::{MessageDef, SignalDef, SignalValues};

/// Span used when a signal declares no maximum
const DEFAULT_SPAN: f64 = 100.0;

/// Samples plausible physical values for catalog signals
#[derive(Debug, Clone)]
pub struct SignalGenerator<R = StdRng> {
    rng: R,
}

impl SignalGenerator<StdRng> {
    /// Deterministic generator for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> SignalGenerator<R> {
    /// Wrap an explicit randomness source
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Sample one value consistent with the signal's constraints
    ///
    /// Enumerated signals yield one of their raw choice values. Numeric
    /// signals are drawn from `[minimum, maximum]`, falling back to
    /// `minimum = 0` and `maximum = minimum + 100`, then snapped to the raw
    /// grid and clamped to the unsigned bit width.
    pub fn sample(&mut self, signal: &SignalDef) -> f64 {
        if let Some(choice) = signal.choices.choose(&mut self.rng) {
            return choice.value as f64;
        }

        let lo = signal.minimum.unwrap_or(0.0);
        let hi = signal.maximum.unwrap_or(lo + DEFAULT_SPAN);
        let value = if hi > lo {
            self.rng.gen_range(lo..=hi)
        } else {
            lo
        };

        if signal.is_float {
            return (value * 100.0).round() / 100.0;
        }

        let max_raw = signal.raw_max() as f64;
        if signal.scale != 0.0 {
            let raw = ((value - signal.offset) / signal.scale).round().clamp(0.0, max_raw);
            raw * signal.scale + signal.offset
        } else {
            value.round().clamp(0.0, max_raw)
        }
    }

    /// Sample every signal of a message
    pub fn sample_message(&mut self, message: &MessageDef) -> SignalValues {
        message
            .signals
            .iter()
            .map(|signal| (signal.name.clone(), self.sample(signal)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use signal_db::SignalDatabase;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_choice_values_are_members() {
        let signal = SignalDef::new("TURN_SIGNAL", 6, 2)
            .choices(&[(0, "OFF"), (1, "LEFT"), (2, "RIGHT"), (3, "HAZARD")]);
        let mut generator = SignalGenerator::seeded(1);
        for _ in 0..200 {
            let value = generator.sample(&signal);
            assert!(signal.choices.iter().any(|c| c.value as f64 == value));
        }
    }

    #[test]
    fn test_choices_take_precedence_over_range() {
        let signal = SignalDef::new("MODE", 0, 4)
            .range(10.0, 15.0)
            .choices(&[(2, "ECO")]);
        let mut generator = SignalGenerator::seeded(2);
        assert_eq!(generator.sample(&signal), 2.0);
    }

    #[test]
    fn test_default_range_without_bounds() {
        let signal = SignalDef::new("COUNTER", 0, 8);
        let mut generator = SignalGenerator::seeded(3);
        for _ in 0..200 {
            let value = generator.sample(&signal);
            assert!((0.0..=100.0).contains(&value));
            assert_eq!(value.fract(), 0.0);
        }
    }

    #[test]
    fn test_float_values_rounded_to_hundredths() {
        let signal = SignalDef::new("CABIN_TEMP", 32, 32).float().range(-40.0, 85.0);
        let mut generator = SignalGenerator::seeded(4);
        for _ in 0..200 {
            let value = generator.sample(&signal);
            assert!((-40.0..=85.0).contains(&value));
            assert!(((value * 100.0).round() - value * 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_bit_width_clamps_raw_value() {
        // 4-bit raw caps the physical value at 15 despite the wider range
        let signal = SignalDef::new("NIBBLE", 0, 4).range(0.0, 1000.0);
        let mut generator = SignalGenerator::seeded(5);
        for _ in 0..200 {
            assert!(generator.sample(&signal) <= 15.0);
        }
    }

    #[test]
    fn test_seeded_generators_repeat() {
        let db = SignalDatabase::vehicle().unwrap();
        let msg = db.message_by_name("ENGINE_STATUS").unwrap();
        let a = SignalGenerator::seeded(42).sample_message(&msg);
        let b = SignalGenerator::seeded(42).sample_message(&msg);
        assert_eq!(a, b);
        assert_eq!(a.len(), msg.signals.len());
    }

    #[test]
    fn test_vehicle_samples_always_encode() {
        let db = SignalDatabase::vehicle().unwrap();
        let mut generator = SignalGenerator::seeded(6);
        for msg in db.messages() {
            for _ in 0..100 {
                let values = generator.sample_message(msg);
                assert!(msg.encode(&values).is_ok(), "{} failed to encode", msg.name);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_vehicle_values_within_declared_range(seed in any::<u64>()) {
            let db = SignalDatabase::vehicle().unwrap();
            let mut generator = SignalGenerator::seeded(seed);
            for msg in db.messages() {
                for signal in msg.signals.iter().filter(|s| !s.has_choices()) {
                    let lo = signal.minimum.unwrap_or(0.0);
                    let hi = signal.maximum.unwrap_or(lo + DEFAULT_SPAN);
                    let value = generator.sample(signal);
                    prop_assert!(value >= lo - TOLERANCE && value <= hi + TOLERANCE,
                        "{} = {} outside [{}, {}]", signal.name, value, lo, hi);
                }
            }
        }

        #[test]
        fn prop_scaled_values_sit_on_raw_grid(seed in any::<u64>(), scale in 0.01f64..2.0, offset in -50.0f64..50.0) {
            let signal = SignalDef::new("S", 0, 12).scaled(scale, offset).range(offset, offset + 100.0 * scale);
            let value = SignalGenerator::seeded(seed).sample(&signal);
            let raw = (value - offset) / scale;
            prop_assert!((raw - raw.round()).abs() < 1e-6);
            prop_assert!(raw.round() >= 0.0 && raw.round() <= 4095.0);
        }
    }
}
