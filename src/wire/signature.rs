//! `SignatureData` -- the raw byte frame returned by the authenticator
//! in a `SignResponse.signatureData` field.
//!
//! Wire layout: `userPresence(1) | counter(4, big-endian) |
//! signature(remaining)`.

use crate::error::U2fError;
use ring::signature::{self, UnparsedPublicKey};

const HEADER_LEN: usize = 5;

/// A parsed `signatureData` frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureData {
    /// `true` if the authenticator observed a test-of-user-presence
    /// gesture (the low bit of the user presence byte).
    pub user_presence: bool,
    /// Monotonic use counter maintained by the authenticator.
    pub counter: u32,
    /// DER-encoded ECDSA signature over the assertion message.
    pub signature: Vec<u8>,
}

impl SignatureData {
    /// Parses a raw `signatureData` frame.
    pub fn parse(data: &[u8]) -> Result<SignatureData, U2fError> {
        if data.len() < HEADER_LEN {
            return Err(U2fError::MalformedRegistration(
                "truncated signature data header",
            ));
        }

        let user_presence = data[0] & 0x01 == 0x01;
        let counter = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);
        let signature = data[HEADER_LEN..].to_vec();

        Ok(SignatureData {
            user_presence,
            counter,
            signature,
        })
    }

    /// Verifies the assertion signature carried by this frame.
    ///
    /// The signed message is `applicationParameter || userPresence(1)
    /// || counter(4, big-endian) || challengeParameter`, verified
    /// under the device's registered P-256 public key (raw 65-byte
    /// uncompressed point, as persisted on the `DeviceRegistration`).
    pub fn verify(
        &self,
        app_param: &[u8],
        chal_param: &[u8],
        device_public_key: &[u8],
    ) -> Result<(), U2fError> {
        let mut msg = Vec::with_capacity(app_param.len() + 5 + chal_param.len());
        msg.extend_from_slice(app_param);
        msg.push(self.user_presence as u8);
        msg.extend_from_slice(&self.counter.to_be_bytes());
        msg.extend_from_slice(chal_param);

        let key = UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_ASN1, device_public_key);
        key.verify(&msg, &self.signature)
            .map_err(|_| U2fError::InvalidSignature)
    }

    /// Re-serializes this frame back to the exact wire layout it was
    /// parsed from.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.signature.len());
        out.push(self.user_presence as u8);
        out.extend_from_slice(&self.counter.to_be_bytes());
        out.extend_from_slice(&self.signature);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::web_safe_decode;

    const SAMPLE_SIG_DATA: &str = concat!(
        "AAAAAAEwRQIhAJrcBSpaDprFzXmVw60r6x-_gOZ0t-8v7DGiiKmar0SAAiAYKKEX41nWUCLL",
        "oKiBYuHYdPP1MPPNQ0cX_JIybPtThA",
    );

    #[test]
    fn rejects_short_input() {
        assert!(SignatureData::parse(&[0u8; 4]).is_err());
    }

    #[test]
    fn round_trips() {
        let raw = web_safe_decode(SAMPLE_SIG_DATA).unwrap();
        let parsed = SignatureData::parse(&raw).unwrap();
        assert_eq!(parsed.to_bytes(), raw);
    }

    #[test]
    fn decodes_presence_and_counter() {
        let raw = web_safe_decode(SAMPLE_SIG_DATA).unwrap();
        let parsed = SignatureData::parse(&raw).unwrap();
        assert!(parsed.user_presence);
        assert_eq!(parsed.counter, 1);
    }
}
