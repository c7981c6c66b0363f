//! Signal Definitions and Raw Conversion

use crate::error::{CatalogError, EncodeError};
use serde::{Deserialize, Serialize};

/// Range comparisons accept this much relative slack for scaled floats
const RANGE_EPSILON: f64 = 1e-9;

fn default_scale() -> f64 {
    1.0
}

/// One named value of an enumerated signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalChoice {
    /// Raw value
    pub value: u64,
    /// Display label
    pub label: String,
}

/// A bit field inside a CAN message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDef {
    /// Signal name, unique within its message
    pub name: String,
    /// Position of the least significant bit (Intel byte order)
    pub start_bit: u8,
    /// Width in bits
    pub length: u8,
    /// Two's complement raw value
    #[serde(default)]
    pub is_signed: bool,
    /// IEEE 754 raw value (32 or 64 bits)
    #[serde(default)]
    pub is_float: bool,
    /// Physical = raw * scale + offset
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
    /// Lowest valid physical value
    #[serde(default)]
    pub minimum: Option<f64>,
    /// Highest valid physical value
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Enumerated raw values; empty for plain numeric signals
    #[serde(default, rename = "choice")]
    pub choices: Vec<SignalChoice>,
}

impl SignalDef {
    /// Create an unsigned integer signal with unit scale and no range
    pub fn new(name: &str, start_bit: u8, length: u8) -> Self {
        Self {
            name: name.to_string(),
            start_bit,
            length,
            is_signed: false,
            is_float: false,
            scale: 1.0,
            offset: 0.0,
            minimum: None,
            maximum: None,
            unit: None,
            choices: Vec::new(),
        }
    }

    pub fn scaled(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn signed(mut self) -> Self {
        self.is_signed = true;
        self
    }

    pub fn float(mut self) -> Self {
        self.is_float = true;
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn choices(mut self, choices: &[(u64, &str)]) -> Self {
        self.choices = choices
            .iter()
            .map(|(value, label)| SignalChoice {
                value: *value,
                label: label.to_string(),
            })
            .collect();
        self
    }

    /// Whether this signal is enumerated
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Label of the choice matching a physical value, if any
    pub fn choice_label(&self, value: f64) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| c.value as f64 == value)
            .map(|c| c.label.as_str())
    }

    /// Largest unsigned raw value representable in `length` bits
    pub fn raw_max(&self) -> u64 {
        self.mask()
    }

    pub(crate) fn mask(&self) -> u64 {
        if self.length >= 64 {
            u64::MAX
        } else {
            (1u64 << self.length) - 1
        }
    }

    fn effective_scale(&self) -> f64 {
        if self.scale != 0.0 {
            self.scale
        } else {
            1.0
        }
    }

    /// Reject physical values outside the declared range
    pub(crate) fn check_range(&self, value: f64) -> Result<(), EncodeError> {
        let min = self.minimum.unwrap_or(f64::MIN);
        let max = self.maximum.unwrap_or(f64::MAX);
        let below = value < min - RANGE_EPSILON * min.abs().max(1.0);
        let above = value > max + RANGE_EPSILON * max.abs().max(1.0);

        if !value.is_finite() || below || above {
            return Err(EncodeError::OutOfRange {
                signal: self.name.clone(),
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Convert a physical value to masked raw bits
    pub(crate) fn to_raw(&self, value: f64) -> Result<u64, EncodeError> {
        let scaled = (value - self.offset) / self.effective_scale();

        if self.is_float {
            return Ok(match self.length {
                32 => (scaled as f32).to_bits() as u64,
                _ => scaled.to_bits(),
            });
        }

        let raw = scaled.round() as i128;
        let (lo, hi) = if self.is_signed {
            let half = 1i128 << (self.length - 1);
            (-half, half - 1)
        } else {
            (0, self.mask() as i128)
        };

        if raw < lo || raw > hi {
            return Err(EncodeError::RawOverflow {
                signal: self.name.clone(),
                raw,
                length: self.length,
            });
        }

        Ok((raw as i64 as u64) & self.mask())
    }

    /// Convert raw bits to a physical value
    pub(crate) fn from_raw(&self, bits: u64) -> f64 {
        let raw = if self.is_float {
            match self.length {
                32 => f32::from_bits(bits as u32) as f64,
                _ => f64::from_bits(bits),
            }
        } else if self.is_signed {
            let shift = 64 - u32::from(self.length);
            (((bits << shift) as i64) >> shift) as f64
        } else {
            bits as f64
        };
        raw * self.effective_scale() + self.offset
    }

    /// Check layout constraints against the owning message
    pub(crate) fn validate(&self, message: &str, message_len: u8) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidSignal {
            message: message.to_string(),
            signal: self.name.clone(),
            reason,
        };

        if self.length == 0 || self.length > 64 {
            return Err(invalid(format!("bit length {} not in 1..=64", self.length)));
        }
        let end = u16::from(self.start_bit) + u16::from(self.length);
        if end > u16::from(message_len) * 8 {
            return Err(invalid(format!(
                "bits {}..{} exceed {}-byte message",
                self.start_bit, end, message_len
            )));
        }
        if self.is_float && !(self.length == 32 || self.length == 64) {
            return Err(invalid("float signals must be 32 or 64 bits".to_string()));
        }
        if self.is_float && self.is_signed {
            return Err(invalid("float signals cannot be marked signed".to_string()));
        }
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(invalid(format!("scale {} must be finite and non-zero", self.scale)));
        }
        if !self.offset.is_finite() {
            return Err(invalid(format!("offset {} must be finite", self.offset)));
        }
        for bound in [self.minimum, self.maximum].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(invalid(format!("range bound {} must be finite", bound)));
            }
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(invalid(format!("minimum {} > maximum {}", min, max)));
            }
            if !(max - min).is_finite() {
                return Err(invalid(format!("range {}..{} is too wide", min, max)));
            }
        }
        if let Some(choice) = self.choices.iter().find(|c| c.value > self.mask()) {
            return Err(invalid(format!(
                "choice {} does not fit in {} bits",
                choice.value, self.length
            )));
        }
        Ok(())
    }
}
