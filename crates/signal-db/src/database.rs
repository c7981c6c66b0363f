//! Message Catalog

use crate::error::CatalogError;
use crate::message::MessageDef;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "message")]
    messages: Vec<MessageDef>,
}

/// Read-only catalog of message layouts, indexed by name and frame ID
#[derive(Debug, Clone, Default)]
pub struct SignalDatabase {
    messages: Vec<Arc<MessageDef>>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<u32, usize>,
}

impl SignalDatabase {
    /// Build a catalog, validating every message layout
    pub fn new(messages: Vec<MessageDef>) -> Result<Self, CatalogError> {
        let mut db = Self::default();

        for message in messages {
            message.validate()?;
            if db.by_name.contains_key(&message.name) {
                return Err(CatalogError::DuplicateName(message.name));
            }
            if db.by_id.contains_key(&message.frame_id) {
                return Err(CatalogError::DuplicateId(message.frame_id));
            }

            debug!(
                "Registered message {} (0x{:03X}, {} signals)",
                message.name,
                message.frame_id,
                message.signals.len()
            );
            let idx = db.messages.len();
            db.by_name.insert(message.name.clone(), idx);
            db.by_id.insert(message.frame_id, idx);
            db.messages.push(Arc::new(message));
        }

        Ok(db)
    }

    /// Parse a catalog from TOML text
    ///
    /// ```toml
    /// [[message]]
    /// name = "ENGINE_STATUS"
    /// frame_id = 0x100
    /// length = 8
    ///
    /// [[message.signal]]
    /// name = "ENGINE_SPEED"
    /// start_bit = 0
    /// length = 16
    /// scale = 0.25
    /// minimum = 0.0
    /// maximum = 8000.0
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        Self::new(file.messages)
    }

    /// Load a catalog from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let db = Self::from_toml_str(&text)?;
        info!("Loaded {} messages from {}", db.len(), path.display());
        Ok(db)
    }

    /// Look up a message by name
    pub fn message_by_name(&self, name: &str) -> Option<Arc<MessageDef>> {
        self.by_name.get(name).map(|&idx| self.messages[idx].clone())
    }

    /// Look up a message by frame identifier
    pub fn message_by_id(&self, frame_id: u32) -> Option<Arc<MessageDef>> {
        self.by_id.get(&frame_id).map(|&idx| self.messages[idx].clone())
    }

    /// All messages in declaration order
    pub fn messages(&self) -> impl Iterator<Item = &MessageDef> {
        self.messages.iter().map(|m| m.as_ref())
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalDef;

    const CATALOG: &str = r#"
[[message]]
name = "GEAR_STATUS"
frame_id = 0x150
length = 2

[[message.signal]]
name = "GEAR"
start_bit = 0
length = 4

[[message.signal.choice]]
value = 0
label = "PARK"

[[message.signal.choice]]
value = 1
label = "DRIVE"

[[message.signal]]
name = "OIL_TEMP"
start_bit = 8
length = 8
offset = -40.0
minimum = -40.0
maximum = 215.0
unit = "degC"
"#;

    #[test]
    fn test_load_toml_catalog() {
        let db = SignalDatabase::from_toml_str(CATALOG).unwrap();
        assert_eq!(db.len(), 1);

        let msg = db.message_by_name("GEAR_STATUS").unwrap();
        assert_eq!(msg.frame_id, 0x150);
        assert_eq!(msg.signals.len(), 2);
        assert_eq!(msg.signals[0].choices.len(), 2);
        assert_eq!(msg.signals[1].scale, 1.0);
        assert_eq!(msg.signals[1].offset, -40.0);

        assert_eq!(db.message_by_id(0x150).unwrap().name, "GEAR_STATUS");
        assert!(db.message_by_name("NOPE").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let messages = vec![
            MessageDef::new("A", 0x10, 1).with_signal(SignalDef::new("X", 0, 8)),
            MessageDef::new("A", 0x11, 1).with_signal(SignalDef::new("X", 0, 8)),
        ];
        assert!(matches!(
            SignalDatabase::new(messages),
            Err(CatalogError::DuplicateName(name)) if name == "A"
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let messages = vec![MessageDef::new("A", 0x10, 1), MessageDef::new("B", 0x10, 1)];
        assert!(matches!(
            SignalDatabase::new(messages),
            Err(CatalogError::DuplicateId(0x10))
        ));
    }

    #[test]
    fn test_non_finite_bounds_rejected() {
        for bounds in ["minimum = -inf", "maximum = inf", "minimum = nan", "minimum = -1e308\nmaximum = 1e308", "scale = 0.0"] {
            let text = format!(
                "[[message]]\nname = \"M\"\nframe_id = 0x10\nlength = 1\n\n[[message.signal]]\nname = \"X\"\nstart_bit = 0\nlength = 8\n{}\n",
                bounds
            );
            assert!(
                matches!(
                    SignalDatabase::from_toml_str(&text),
                    Err(CatalogError::InvalidSignal { ref signal, .. }) if signal == "X"
                ),
                "accepted {}",
                bounds
            );
        }
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(
            SignalDatabase::from_toml_str("[[message]]\nname = 5"),
            Err(CatalogError::Parse(_))
        ));
    }
}
