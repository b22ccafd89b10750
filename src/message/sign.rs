//! `SignRequest`/`SignResponse` and the `U2fSignRequest` bundle that
//! drives one authentication round trip.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::U2fError;
use crate::message::client_data::{ClientData, ClientDataType};
use crate::message::device::DeviceRegistration;
use crate::wire::SignatureData;

/// One outstanding sign challenge, issued for a single registered
/// device.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub version: String,
    pub app_id: String,
    pub key_handle: String,
    pub challenge: String,
}

impl SignRequest {
    pub fn challenge_bytes(&self) -> Result<Vec<u8>, U2fError> {
        codec::web_safe_decode(&self.challenge)
    }
}

/// The authenticator's reply to a [`SignRequest`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub key_handle: String,
    pub signature_data: String,
    pub client_data: String,
}

impl SignResponse {
    pub fn parsed_client_data(&self) -> Result<ClientData, U2fError> {
        ClientData::from_wire(&self.client_data)
    }

    pub fn parsed_signature_data(&self) -> Result<SignatureData, U2fError> {
        let raw = codec::web_safe_decode(&self.signature_data)?;
        SignatureData::parse(&raw)
    }

    /// `SHA-256` of the exact decoded `clientData` bytes.
    pub fn challenge_parameter(&self) -> Result<[u8; 32], U2fError> {
        let raw = codec::web_safe_decode(&self.client_data)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(codec::sha256(&raw).as_ref());
        Ok(out)
    }
}

/// The server-side state of one authentication ceremony: the appId,
/// the shared challenge, and the full device records (including
/// public keys) eligible to answer it.
///
/// `registered_keys` carries the caller's persisted
/// [`DeviceRegistration`]s, not the client-facing `RegisteredKey`
/// shape -- [`Self::data_for_client`] is what strips each one down
/// before it's handed to the browser, mirroring the source library's
/// internal `registeredKeys` vs. `key_data` split.
#[derive(Clone, Debug)]
pub struct U2fSignRequest {
    pub app_id: String,
    pub challenge: String,
    pub registered_keys: Vec<DeviceRegistration>,
}

impl U2fSignRequest {
    /// Starts an authentication ceremony: one [`SignRequest`] per
    /// registered device, all sharing the same fresh challenge.
    pub fn create(
        app_id: impl Into<String>,
        devices: Vec<DeviceRegistration>,
        challenge: Option<Vec<u8>>,
    ) -> U2fSignRequest {
        let challenge = challenge.unwrap_or_else(random_challenge);
        U2fSignRequest {
            app_id: app_id.into(),
            challenge: codec::web_safe_encode(&challenge),
            registered_keys: devices,
        }
    }

    fn challenge_bytes(&self) -> Result<Vec<u8>, U2fError> {
        codec::web_safe_decode(&self.challenge)
    }

    /// The view of this bundle sent to the client: each device pared
    /// down to its `RegisteredKey` fields.
    pub fn data_for_client(&self) -> serde_json::Value {
        let registered_keys: Vec<_> = self
            .registered_keys
            .iter()
            .map(DeviceRegistration::as_registered_key)
            .collect();

        serde_json::json!({
            "appId": self.app_id,
            "challenge": self.challenge,
            "registeredKeys": registered_keys,
        })
    }

    /// Validates and verifies a [`SignResponse`], producing the
    /// authenticator's use counter and user-presence flag.
    ///
    /// Counter monotonicity is deliberately not enforced here --
    /// callers that want cloned-authenticator detection must compare
    /// the returned counter against their own stored value.
    pub fn complete(
        &self,
        response: &SignResponse,
        valid_facets: Option<&[String]>,
    ) -> Result<(u32, u8), U2fError> {
        log::trace!("completing authentication for appId={}", self.app_id);

        let client_data = response.parsed_client_data()?;
        if client_data.typ != ClientDataType::Sign {
            return Err(U2fError::WrongType);
        }
        if client_data.challenge_bytes()? != self.challenge_bytes()? {
            return Err(U2fError::WrongChallenge);
        }
        if let Some(facets) = valid_facets {
            if !facets.iter().any(|f| f == &client_data.origin) {
                return Err(U2fError::InvalidFacet);
            }
        }

        let device = self
            .registered_keys
            .iter()
            .find(|d| d.key_handle == response.key_handle)
            .ok_or(U2fError::UnknownKeyHandle)?;

        let app_param = codec::application_parameter(&device.app_id)?;
        let chal_param = response.challenge_parameter()?;

        let signature_data = response.parsed_signature_data()?;
        let public_key = device.public_key_bytes()?;
        signature_data.verify(&app_param, &chal_param, &public_key)?;

        log::debug!(
            "authentication complete key_handle={} counter={}",
            device.key_handle,
            signature_data.counter
        );

        Ok((signature_data.counter, signature_data.user_presence as u8))
    }
}

fn random_challenge() -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::web_safe_decode;

    fn sample_device() -> DeviceRegistration {
        DeviceRegistration {
            version: "U2F_V2".into(),
            public_key: "BBCcnAOknoMgokEGuTdfpNLQ-uylwlKp_xbEW8urjJsXKv9XZSL-V8C2nwcPEckav1mKZFr5K96uAoLtuxOUf-E".into(),
            key_handle: "BIarIKfyMqyf4bEI6tOqGInAfHrrQkMA2eyPJlNnInbAG1tXNpdRs48ef92_b1-mfN4VhaTWxo1SGoxT6CIanw".into(),
            app_id: "http://www.example.com/appid".into(),
            transports: None,
        }
    }

    fn fixed_response(device: &DeviceRegistration) -> SignResponse {
        SignResponse {
            key_handle: device.key_handle.clone(),
            signature_data: "AAAAAAEwRQIhAJrcBSpaDprFzXmVw60r6x-_gOZ0t-8v7DGiiKmar0SAAiAYKKEX41nWUCLLoKiBYuHYdPP1MPPNQ0cX_JIybPtThA".into(),
            client_data: "eyJvcmlnaW4iOiAiaHR0cHM6Ly93d3cuZXhhbXBsZS5jb20iLCAiY2hhbGxlbmdlIjogIm9JZXUtblB4eDlEY0Y3TF9EQ0Uza3ZZb3gtYzRVdXZGYjhsTkc2dGgxMG8iLCAidHlwIjogIm5hdmlnYXRvci5pZC5nZXRBc3NlcnRpb24ifQ".into(),
        }
    }

    #[test]
    fn fixed_authenticate_vector_succeeds() {
        let device = sample_device();
        let req = U2fSignRequest::create(
            "http://www.example.com/appid",
            vec![device.clone()],
            Some(web_safe_decode("oIeu-nPxx9DcF7L_DCE3kvYox-c4UuvFb8lNG6th10o").unwrap()),
        );

        let (counter, user_presence) = req.complete(&fixed_response(&device), None).unwrap();
        assert_eq!(counter, 1);
        assert_eq!(user_presence, 1);
    }

    #[test]
    fn unknown_key_handle_is_rejected_once_client_data_is_valid() {
        let device = sample_device();
        let req = U2fSignRequest::create("http://www.example.com/appid", vec![device], None);
        let client_data = codec::web_safe_encode(
            format!(
                r#"{{"typ":"navigator.id.getAssertion","challenge":"{}","origin":"https://www.example.com"}}"#,
                req.challenge
            )
            .as_bytes(),
        );
        let response = SignResponse {
            key_handle: "not-the-right-handle".into(),
            signature_data: "AA".into(),
            client_data,
        };
        assert!(matches!(
            req.complete(&response, None),
            Err(U2fError::UnknownKeyHandle)
        ));
    }

    #[test]
    fn wrong_challenge_is_reported_before_unknown_key_handle() {
        let device = sample_device();
        let req = U2fSignRequest::create("http://www.example.com/appid", vec![device], None);
        let client_data = codec::web_safe_encode(
            br#"{"typ":"navigator.id.getAssertion","challenge":"not-the-issued-challenge","origin":"https://www.example.com"}"#,
        );
        let response = SignResponse {
            key_handle: "not-the-right-handle".into(),
            signature_data: "AA".into(),
            client_data,
        };
        assert!(matches!(
            req.complete(&response, None),
            Err(U2fError::WrongChallenge)
        ));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let device = sample_device();
        let req = U2fSignRequest::create(
            "http://www.example.com/appid",
            vec![device.clone()],
            Some(web_safe_decode("oIeu-nPxx9DcF7L_DCE3kvYox-c4UuvFb8lNG6th10o").unwrap()),
        );

        let mut raw_sig = web_safe_decode(
            "AAAAAAEwRQIhAJrcBSpaDprFzXmVw60r6x-_gOZ0t-8v7DGiiKmar0SAAiAYKKEX41nWUCLLoKiBYuHYdPP1MPPNQ0cX_JIybPtThA",
        ).unwrap();
        let len = raw_sig.len();
        raw_sig[len - 4..].copy_from_slice(&[0, 0, 0, 0]);

        let mut response = fixed_response(&device);
        response.signature_data = codec::web_safe_encode(&raw_sig);

        assert!(matches!(
            req.complete(&response, None),
            Err(U2fError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_facet_is_rejected() {
        let device = sample_device();
        let req = U2fSignRequest::create(
            "http://www.example.com/appid",
            vec![device.clone()],
            Some(web_safe_decode("oIeu-nPxx9DcF7L_DCE3kvYox-c4UuvFb8lNG6th10o").unwrap()),
        );

        let response = fixed_response(&device);
        let facets = vec!["https://wrongfacet.com".to_string()];
        assert!(matches!(
            req.complete(&response, Some(&facets)),
            Err(U2fError::InvalidFacet)
        ));
    }
}
