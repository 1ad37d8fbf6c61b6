//! Listener option schema and its persisted form.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use picket_core::error::AppError;
use picket_core::result::AppResult;

/// Option holding the listener instance name.
pub const NAME: &str = "Name";
/// Option holding the callback URL (`scheme://host[:port]`).
pub const HOST: &str = "Host";
/// Option holding the bind port.
pub const PORT: &str = "Port";
/// Option holding the TLS certificate path.
pub const CERT_PATH: &str = "CertPath";
/// Option holding the staging key.
pub const STAGING_KEY: &str = "StagingKey";

/// Options every listener manifest must declare.
pub const MANDATORY: [&str; 3] = [NAME, HOST, PORT];

/// A single entry of a listener's option schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    /// Current value.
    #[serde(default)]
    pub value: String,
    /// Whether the listener refuses to start while the value is empty.
    #[serde(default)]
    pub required: bool,
    /// Operator-facing description.
    #[serde(default)]
    pub description: String,
}

impl OptionValue {
    /// Create a new option entry.
    pub fn new(value: impl Into<String>, required: bool, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            required,
            description: description.into(),
        }
    }
}

/// A listener's full option schema, keyed by option name.
///
/// Cloning produces an independent deep copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerOptions(BTreeMap<String, OptionValue>);

impl ListenerOptions {
    /// Create an empty option schema.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace a schema entry.
    pub fn insert(&mut self, name: impl Into<String>, option: OptionValue) {
        self.0.insert(name.into(), option);
    }

    /// Look up a schema entry.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    /// Whether the schema declares the option.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Current value of an option, or `""` when it is not declared.
    pub fn value(&self, name: &str) -> &str {
        self.0.get(name).map(|o| o.value.as_str()).unwrap_or("")
    }

    /// Set the value of an option, declaring it if needed.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        match self.0.get_mut(name) {
            Some(option) => option.value = value.into(),
            None => {
                self.0.insert(
                    name.to_string(),
                    OptionValue::new(value, false, String::new()),
                );
            }
        }
    }

    /// Overlay every entry of `other` onto this schema.
    ///
    /// Entries absent from `other` keep their current values.
    pub fn overlay(&mut self, other: &ListenerOptions) {
        for (name, option) in other.iter() {
            self.0.insert(name.clone(), option.clone());
        }
    }

    /// Names of required options whose value is empty.
    pub fn missing_required(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, o)| o.required && o.value.trim().is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, OptionValue> {
        self.0.iter()
    }

    /// Number of declared options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no options are declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, OptionValue)> for ListenerOptions {
    fn from_iter<T: IntoIterator<Item = (String, OptionValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Versioned option document stored in the `options` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedOptions {
    /// Document format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Option schema at the time the listener was started.
    #[serde(default)]
    pub options: ListenerOptions,
}

impl PersistedOptions {
    /// Format version written by this build.
    pub const CURRENT_VERSION: u32 = 1;

    /// Wrap an option snapshot in the current document format.
    pub fn new(options: ListenerOptions) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            options,
        }
    }

    /// Encode into the JSON stored in the `options` column.
    pub fn to_json(&self) -> AppResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a stored document, rejecting versions newer than this build.
    pub fn from_json(value: &serde_json::Value) -> AppResult<Self> {
        let document: Self = serde_json::from_value(value.clone())?;
        if document.version > Self::CURRENT_VERSION {
            return Err(AppError::serialization(format!(
                "Option document version {} is newer than supported version {}",
                document.version,
                Self::CURRENT_VERSION
            )));
        }
        Ok(document)
    }
}

fn default_version() -> u32 {
    PersistedOptions::CURRENT_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use picket_core::error::ErrorKind;
    use serde_json::json;

    fn sample() -> ListenerOptions {
        let mut options = ListenerOptions::new();
        options.insert(NAME, OptionValue::new("http", true, "Listener name"));
        options.insert(HOST, OptionValue::new("", true, "Callback host"));
        options.insert(PORT, OptionValue::new("", false, "Bind port"));
        options
    }

    #[test]
    fn test_missing_required() {
        let options = sample();
        assert_eq!(options.missing_required(), vec![HOST]);
    }

    #[test]
    fn test_set_value_declares_unknown_option() {
        let mut options = sample();
        options.set_value("Jitter", "0.2");
        assert_eq!(options.value("Jitter"), "0.2");
        assert!(!options.get("Jitter").unwrap().required);
    }

    #[test]
    fn test_overlay_keeps_absent_entries() {
        let mut live = sample();
        live.insert("DefaultDelay", OptionValue::new("5", false, "Beacon delay"));

        let mut stored = ListenerOptions::new();
        stored.insert(NAME, OptionValue::new("restored", true, "Listener name"));
        live.overlay(&stored);

        assert_eq!(live.value(NAME), "restored");
        assert_eq!(live.value("DefaultDelay"), "5");
    }

    #[test]
    fn test_clone_is_independent() {
        let original = sample();
        let mut copy = original.clone();
        copy.set_value(NAME, "changed");
        assert_eq!(original.value(NAME), "http");
    }

    #[test]
    fn test_document_without_version_defaults_to_current() {
        let value = json!({ "options": { "Name": { "value": "http" } } });
        let document = PersistedOptions::from_json(&value).unwrap();
        assert_eq!(document.version, PersistedOptions::CURRENT_VERSION);
        assert_eq!(document.options.value(NAME), "http");
        assert!(!document.options.get(NAME).unwrap().required);
    }

    #[test]
    fn test_newer_document_is_rejected() {
        let value = json!({ "version": 99, "options": {} });
        let err = PersistedOptions::from_json(&value).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
