//! Messenger configuration.

use parley_crypto::{DELETED_PLACEHOLDER, EnvelopeFormat};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Messenger configuration
///
/// Hosts either build it in code or load it from JSON; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Envelope format for newly written fields. Reads detect the format.
    pub envelope: EnvelopeFormat,
    /// Text encrypted into a message's `text` when it is deleted
    pub deleted_placeholder: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            envelope: EnvelopeFormat::OpenSsl,
            deleted_placeholder: DELETED_PLACEHOLDER.to_string(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// - `Config` if the document does not parse or the placeholder is blank
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// - `Config` if the deletion placeholder is blank
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.deleted_placeholder.trim().is_empty() {
            return Err(ClientError::Config("deletedPlaceholder must not be blank".to_string()));
        }
        Ok(())
    }
}
