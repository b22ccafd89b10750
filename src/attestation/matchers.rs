//! Pluggable rules for matching a leaf certificate against a
//! [`Selector`](crate::attestation::model::Selector) inside a
//! [`DeviceInfo`](crate::attestation::model::DeviceInfo).

use std::str::FromStr;

use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};
use serde_json::Value;
use x509_parser::oid_registry::Oid;
use x509_parser::prelude::*;

/// A rule that decides whether a parsed certificate satisfies a
/// selector's parameters.
pub trait DeviceMatcher {
    /// The `Selector.type` string this matcher handles.
    fn selector_type(&self) -> &'static str;
    /// Whether `cert` satisfies `parameters`.
    fn matches(&self, cert: &X509Certificate<'_>, parameters: &Value) -> bool;
}

/// Matches on the lowercase hex SHA-1 fingerprint of the certificate's
/// DER encoding.
pub struct FingerprintMatcher;

impl DeviceMatcher for FingerprintMatcher {
    fn selector_type(&self) -> &'static str {
        "fingerprint"
    }

    fn matches(&self, cert: &X509Certificate<'_>, parameters: &Value) -> bool {
        let fingerprints = match parameters.as_array() {
            Some(values) => values,
            None => return false,
        };

        let hash = digest(&SHA1_FOR_LEGACY_USE_ONLY, cert.as_ref());
        let fingerprint = hex_lower(hash.as_ref());

        fingerprints
            .iter()
            .filter_map(|v| v.as_str())
            .any(|s| s.to_ascii_lowercase() == fingerprint)
    }
}

/// Matches on the raw value of an X.509 extension identified by OID.
pub struct ExtensionMatcher;

impl DeviceMatcher for ExtensionMatcher {
    fn selector_type(&self) -> &'static str {
        "x509Extension"
    }

    fn matches(&self, cert: &X509Certificate<'_>, parameters: &Value) -> bool {
        let key = match parameters.get("key").and_then(Value::as_str) {
            Some(key) => key,
            None => return false,
        };
        let oid = match Oid::from_str(key) {
            Ok(oid) => oid,
            Err(_) => return false,
        };

        let extension_value = match cert.extensions().iter().find(|e| e.oid == oid) {
            Some(ext) => ext.value,
            None => return false,
        };

        match parameters.get("value") {
            None => true,
            Some(Value::String(s)) => extension_value == s.as_bytes(),
            Some(Value::Object(obj)) => {
                if obj.get("type").and_then(Value::as_str) != Some("hex") {
                    return false;
                }
                match obj.get("value").and_then(Value::as_str).and_then(|s| hex_decode(s)) {
                    Some(bytes) => extension_value == bytes.as_slice(),
                    None => false,
                }
            }
            Some(_) => false,
        }
    }
}

fn hex_lower(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// The matchers registered by default: fingerprint and X.509
/// extension selectors.
pub fn default_matchers() -> Vec<Box<dyn DeviceMatcher + Send + Sync>> {
    vec![Box::new(FingerprintMatcher), Box::new(ExtensionMatcher)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_lower_matches_known_value() {
        assert_eq!(hex_lower(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    }

    #[test]
    fn hex_decode_round_trips() {
        assert_eq!(hex_decode("deadbeef"), Some(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(hex_decode("xyz"), None);
    }
}
