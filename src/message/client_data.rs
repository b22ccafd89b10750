//! `ClientData` -- the JSON object an authenticator's browser client
//! signs over, carried web-safe-base64-encoded inside `clientData`.

use crate::codec;
use crate::error::U2fError;
use serde::{Deserialize, Serialize};

/// The two operations a `ClientData` object can attest to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientDataType {
    #[serde(rename = "navigator.id.finishEnrollment")]
    Register,
    #[serde(rename = "navigator.id.getAssertion")]
    Sign,
}

/// A parsed `clientData` object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientData {
    pub typ: ClientDataType,
    /// Web-safe base64 of the challenge, exactly as received -- kept
    /// encoded so it can be byte-compared against the challenge that
    /// was issued without a re-encoding round trip.
    pub challenge: String,
    pub origin: String,
    /// Fields present in the JSON that this type does not model.
    /// Unknown keys are tolerated, never rejected.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClientData {
    /// Decoded bytes of [`Self::challenge`].
    pub fn challenge_bytes(&self) -> Result<Vec<u8>, U2fError> {
        codec::web_safe_decode(&self.challenge)
    }

    /// Parses a `clientData` wire value, which is either a web-safe
    /// base64 encoded JSON string (the normal case) or already raw
    /// JSON text.
    pub fn from_wire(raw: &str) -> Result<ClientData, U2fError> {
        let json = match codec::web_safe_decode(raw) {
            Ok(bytes) => bytes,
            Err(_) => raw.as_bytes().to_vec(),
        };
        Ok(serde_json::from_slice(&json)?)
    }
}
