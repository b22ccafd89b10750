//! `RegisteredKey` and `DeviceRegistration` -- the records a caller
//! stores per device and echoes back to issue sign challenges.

use serde::{Deserialize, Serialize};

use crate::attestation::Transport;
use crate::codec;
use crate::error::U2fError;

/// The subset of [`DeviceRegistration`] needed to issue a sign
/// challenge: enough to build a `registeredKeys` entry without
/// exposing the device's public key to the client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredKey {
    pub version: String,
    pub key_handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

impl RegisteredKey {
    pub fn key_handle_bytes(&self) -> Result<Vec<u8>, U2fError> {
        codec::web_safe_decode(&self.key_handle)
    }

    /// Decodes [`Self::transports`] into [`Transport`] values,
    /// ignoring any name that doesn't match a known transport.
    pub fn transport_set(&self) -> Option<Vec<Transport>> {
        self.transports
            .as_ref()
            .map(|names| names.iter().filter_map(|n| Transport::from_key(n)).collect())
    }
}

/// A registration result persisted by the caller after a successful
/// `complete_register`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub version: String,
    pub key_handle: String,
    pub app_id: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

impl DeviceRegistration {
    pub fn key_handle_bytes(&self) -> Result<Vec<u8>, U2fError> {
        codec::web_safe_decode(&self.key_handle)
    }

    pub fn public_key_bytes(&self) -> Result<Vec<u8>, U2fError> {
        codec::web_safe_decode(&self.public_key)
    }

    /// The subset of fields needed to issue a sign challenge for this
    /// device, without its public key.
    pub fn as_registered_key(&self) -> RegisteredKey {
        RegisteredKey {
            version: self.version.clone(),
            key_handle: self.key_handle.clone(),
            app_id: Some(self.app_id.clone()),
            transports: self.transports.clone(),
        }
    }
}
