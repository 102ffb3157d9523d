//! String-keyed operation parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{OperationKind, VolumeType};
use crate::{Error, Result};

/// Setting names understood by the precheck engine.
pub mod keys {
    pub const ENCRYPTION_OPERATION: &str = "EncryptionOperation";
    pub const VOLUME_TYPE: &str = "VolumeType";
    pub const KEY_VAULT_URL: &str = "KeyVaultURL";
    pub const KEY_VAULT_RESOURCE_ID: &str = "KeyVaultResourceId";
    pub const KEK_URL: &str = "KeyEncryptionKeyURL";
    pub const KEK_VAULT_RESOURCE_ID: &str = "KekVaultResourceId";
    pub const KEY_ENCRYPTION_ALGORITHM: &str = "KeyEncryptionAlgorithm";
}

/// Operation parameters for one activation.
///
/// Only string-valued entries are kept; the engine never interprets
/// anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, String>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a setting.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Build settings from a public-settings JSON object.
    ///
    /// # Errors
    /// - Returns `InvalidConfiguration` if the document is not a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfiguration {
                field: "settings".to_string(),
                reason: e.to_string(),
            })?;
        let object = value.as_object().ok_or_else(|| Error::InvalidConfiguration {
            field: "settings".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        let map = object
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();
        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Value for `key`, treating an empty string as absent.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|s| !s.is_empty())
    }

    /// The requested operation.
    ///
    /// # Errors
    /// - `InvalidConfiguration` when the key is missing or names no known operation
    pub fn operation(&self) -> Result<OperationKind> {
        let raw = self
            .non_empty(keys::ENCRYPTION_OPERATION)
            .ok_or_else(|| Error::InvalidConfiguration {
                field: keys::ENCRYPTION_OPERATION.to_string(),
                reason: "missing required key".to_string(),
            })?;
        raw.parse()
    }

    /// The requested operation, if any parses.
    pub fn operation_opt(&self) -> Option<OperationKind> {
        self.operation().ok()
    }

    /// The requested volume type.
    ///
    /// # Errors
    /// - `InvalidVolumeType` when the key is missing, empty or unrecognized
    pub fn volume_type(&self) -> Result<VolumeType> {
        let raw = self
            .get(keys::VOLUME_TYPE)
            .ok_or_else(|| Error::InvalidVolumeType {
                value: String::new(),
                reason: format!("{} is missing", keys::VOLUME_TYPE),
            })?;
        raw.parse()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
