//! `RegisterRequest`/`RegisterResponse` and the `U2fRegisterRequest`
//! bundle that drives one registration round trip.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::U2fError;
use crate::message::client_data::{ClientData, ClientDataType};
use crate::message::device::{DeviceRegistration, RegisteredKey};
use crate::wire::RegistrationData;

pub const U2F_V2: &str = "U2F_V2";

/// One outstanding registration challenge, issued for a single
/// protocol version.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub version: String,
    pub challenge: String,
}

impl RegisterRequest {
    pub fn challenge_bytes(&self) -> Result<Vec<u8>, U2fError> {
        codec::web_safe_decode(&self.challenge)
    }
}

/// The authenticator's reply to a [`RegisterRequest`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub version: String,
    pub registration_data: String,
    pub client_data: String,
}

impl RegisterResponse {
    pub fn parsed_client_data(&self) -> Result<ClientData, U2fError> {
        ClientData::from_wire(&self.client_data)
    }

    pub fn parsed_registration_data(&self) -> Result<RegistrationData, U2fError> {
        let raw = codec::web_safe_decode(&self.registration_data)?;
        RegistrationData::parse(&raw)
    }

    /// `SHA-256` of the exact decoded `clientData` bytes.
    pub fn challenge_parameter(&self) -> Result<[u8; 32], U2fError> {
        let raw = codec::web_safe_decode(&self.client_data)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(codec::sha256(&raw).as_ref());
        Ok(out)
    }
}

/// The server-side state of one registration ceremony: the appId, the
/// outstanding challenge, and the devices already on file (so the
/// authenticator can refuse to re-register one of them).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct U2fRegisterRequest {
    pub app_id: String,
    pub register_requests: Vec<RegisterRequest>,
    pub registered_keys: Vec<RegisteredKey>,
}

impl U2fRegisterRequest {
    /// Starts a registration ceremony: a single `U2F_V2`
    /// [`RegisterRequest`] with a fresh challenge, plus the caller's
    /// already-registered keys echoed back.
    pub fn create(
        app_id: impl Into<String>,
        registered_keys: Vec<RegisteredKey>,
        challenge: Option<Vec<u8>>,
    ) -> U2fRegisterRequest {
        let challenge = challenge.unwrap_or_else(random_challenge);
        U2fRegisterRequest {
            app_id: app_id.into(),
            register_requests: vec![RegisterRequest {
                version: U2F_V2.to_string(),
                challenge: codec::web_safe_encode(&challenge),
            }],
            registered_keys,
        }
    }

    fn request(&self) -> Result<&RegisterRequest, U2fError> {
        self.register_requests
            .iter()
            .find(|r| r.version == U2F_V2)
            .ok_or(U2fError::UnsupportedVersion)
    }

    /// The view of this bundle sent to the client: identical to the
    /// stored form except each registered key is trimmed down to its
    /// client-facing fields.
    pub fn data_for_client(&self) -> serde_json::Value {
        serde_json::json!({
            "appId": self.app_id,
            "registerRequests": self.register_requests,
            "registeredKeys": self.registered_keys,
        })
    }

    /// Validates and verifies a [`RegisterResponse`], producing the
    /// [`DeviceRegistration`] to persist plus the attestation
    /// certificate for optional inspection or metadata resolution.
    pub fn complete(
        &self,
        response: &RegisterResponse,
        valid_facets: Option<&[String]>,
    ) -> Result<(DeviceRegistration, Vec<u8>), U2fError> {
        log::trace!("completing registration for appId={}", self.app_id);

        let request = self.request()?;
        let client_data = response.parsed_client_data()?;

        if client_data.typ != ClientDataType::Register {
            return Err(U2fError::WrongType);
        }
        if client_data.challenge_bytes()? != request.challenge_bytes()? {
            return Err(U2fError::WrongChallenge);
        }
        if let Some(facets) = valid_facets {
            if !facets.iter().any(|f| f == &client_data.origin) {
                return Err(U2fError::InvalidFacet);
            }
        }

        let app_param = codec::application_parameter(&self.app_id)?;
        let chal_param = response.challenge_parameter()?;

        let registration_data = response.parsed_registration_data()?;
        registration_data.verify_self(&app_param, &chal_param)?;

        let transports = crate::attestation::Transport::from_cert_der(&registration_data.certificate)?
            .map(|ts| ts.iter().map(|t| t.key().to_string()).collect());

        let device = DeviceRegistration {
            version: request.version.clone(),
            key_handle: registration_data.key_handle_b64(),
            app_id: self.app_id.clone(),
            public_key: registration_data.public_key_b64(),
            transports,
        };

        log::debug!("registration complete key_handle={}", device.key_handle);

        Ok((device, registration_data.certificate))
    }
}

fn random_challenge() -> Vec<u8> {
    let mut bytes = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
