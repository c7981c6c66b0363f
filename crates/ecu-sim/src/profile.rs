//! Transmission Profiles

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One message and the period it is broadcast at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Catalog message name
    pub message: String,
    /// Seconds between transmissions
    pub period_s: f64,
}

impl ProfileEntry {
    pub fn new(message: impl Into<String>, period_s: f64) -> Self {
        Self {
            message: message.into(),
            period_s,
        }
    }

    /// Period as a `Duration`
    ///
    /// Fails for periods that are not positive or do not fit a `Duration`.
    pub fn period(&self) -> Result<Duration, SimError> {
        match Duration::try_from_secs_f64(self.period_s) {
            Ok(period) if !period.is_zero() => Ok(period),
            _ => Err(SimError::InvalidProfile(format!(
                "{}: period must be a positive number of seconds, got {}",
                self.message, self.period_s
            ))),
        }
    }
}

/// Ordered list of messages to transmit
///
/// Every period is positive and fits a `Duration`. Names are resolved against a catalog
/// only when a simulation starts.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionProfile {
    entries: Vec<ProfileEntry>,
}

#[derive(Deserialize)]
struct ProfileFile {
    #[serde(default)]
    entry: Vec<ProfileEntry>,
}

impl TransmissionProfile {
    /// Build a profile, rejecting periods [`ProfileEntry::period`] refuses
    pub fn new(entries: Vec<ProfileEntry>) -> Result<Self, SimError> {
        for entry in &entries {
            entry.period()?;
        }
        Ok(Self { entries })
    }

    /// Build from `(message, period_s)` pairs
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Result<Self, SimError> {
        Self::new(
            pairs
                .iter()
                .map(|(message, period_s)| ProfileEntry::new(*message, *period_s))
                .collect(),
        )
    }

    /// Profile for the built-in vehicle catalog
    pub fn default_vehicle() -> Self {
        Self {
            entries: vec![
                ProfileEntry::new("ENGINE_STATUS", 0.1),
                ProfileEntry::new("ABS_STATUS", 0.05),
                ProfileEntry::new("AIRBAG_STATUS", 0.5),
                ProfileEntry::new("BODY_STATUS", 1.0),
            ],
        }
    }

    /// Parse a TOML profile made of `[[entry]]` tables
    pub fn from_toml_str(text: &str) -> Result<Self, SimError> {
        let file: ProfileFile =
            toml::from_str(text).map_err(|e| SimError::InvalidProfile(e.to_string()))?;
        Self::new(file.entry)
    }

    /// Load a TOML profile from disk
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn entries(&self) -> &[ProfileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TransmissionProfile {
    fn default() -> Self {
        Self::default_vehicle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_db::SignalDatabase;

    #[test]
    fn test_default_profile_matches_vehicle_catalog() {
        let db = SignalDatabase::vehicle().unwrap();
        let profile = TransmissionProfile::default();
        assert_eq!(profile.len(), 4);
        for entry in profile.entries() {
            assert!(db.message_by_name(&entry.message).is_some(), "{}", entry.message);
        }
        assert_eq!(profile.entries()[1].period().unwrap(), Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_periods_rejected() {
        for period in [0.0, -1.0, 1e-12, 1e30, f64::NAN, f64::INFINITY] {
            let err = TransmissionProfile::from_pairs(&[("ENGINE_STATUS", period)]).unwrap_err();
            assert!(matches!(err, SimError::InvalidProfile(_)));
        }
    }

    #[test]
    fn test_parse_toml_profile() {
        let profile = TransmissionProfile::from_toml_str(
            r#"
            [[entry]]
            message = "ENGINE_STATUS"
            period_s = 0.02

            [[entry]]
            message = "BODY_STATUS"
            period_s = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(
            profile.entries(),
            &[
                ProfileEntry::new("ENGINE_STATUS", 0.02),
                ProfileEntry::new("BODY_STATUS", 2.0),
            ]
        );
    }

    #[test]
    fn test_empty_toml_profile() {
        let profile = TransmissionProfile::from_toml_str("").unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn test_toml_profile_missing_field() {
        let err = TransmissionProfile::from_toml_str("[[entry]]\nmessage = \"ABS_STATUS\"\n").unwrap_err();
        assert!(matches!(err, SimError::InvalidProfile(_)));
    }

    #[test]
    fn test_missing_profile_file() {
        let err = TransmissionProfile::from_toml_file("/nonexistent/profile.toml").unwrap_err();
        assert!(matches!(err, SimError::Io { .. }));
    }
}
