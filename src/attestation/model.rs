//! Data types shared by the attestation metadata store: vendor trust
//! bundles, per-device selectors, and the resolved `Attestation`
//! verdict handed back to a caller.

use crate::error::U2fError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use x509_parser::oid_registry::Oid;
use x509_parser::prelude::*;

/// OID of the U2F transports extension carried by attestation
/// certificates: `1.3.6.1.4.1.45724.2.1.1`.
pub const TRANSPORTS_EXT_OID: &str = "1.3.6.1.4.1.45724.2.1.1";

/// Transport channels a device may support, as declared either by its
/// attestation certificate or by matched device metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transport {
    Bt = 0x01,
    Ble = 0x02,
    Usb = 0x04,
    Nfc = 0x08,
}

impl Transport {
    const ALL: [Transport; 4] = [Transport::Bt, Transport::Ble, Transport::Usb, Transport::Nfc];

    /// Lower-case name used on the wire (`DeviceRegistration.transports`).
    pub fn key(self) -> &'static str {
        match self {
            Transport::Bt => "bt",
            Transport::Ble => "ble",
            Transport::Usb => "usb",
            Transport::Nfc => "nfc",
        }
    }

    /// Parses a lower-case transport name as produced by [`Transport::key`].
    pub fn from_key(key: &str) -> Option<Transport> {
        match key {
            "bt" => Some(Transport::Bt),
            "ble" => Some(Transport::Ble),
            "usb" => Some(Transport::Usb),
            "nfc" => Some(Transport::Nfc),
            _ => None,
        }
    }

    /// Unpacks a bitmask into the set of transports it names.
    pub fn from_bitmask(mask: u32) -> Vec<Transport> {
        Transport::ALL
            .iter()
            .copied()
            .filter(|t| (*t as u32) & mask != 0)
            .collect()
    }

    /// Packs a set of transports back into a bitmask.
    pub fn to_bitmask(transports: &[Transport]) -> u32 {
        transports.iter().fold(0u32, |acc, t| acc | (*t as u32))
    }

    /// Reads the transports extension from a DER-encoded certificate,
    /// if present, decoding the ASN.1 BIT STRING into a transport set.
    ///
    /// The extension value is the DER encoding of a BIT STRING: byte 0
    /// is the tag, byte 1 the length, byte 2 the count of unused bits
    /// in the final content byte, and the remainder is the content,
    /// read MSB-first after reversing each byte's bit order.
    pub fn from_cert_der(der: &[u8]) -> Result<Option<Vec<Transport>>, U2fError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| U2fError::Certificate(e.to_string()))?;
        Transport::from_cert(&cert)
    }

    /// Same as [`Transport::from_cert_der`] but operating on an
    /// already-parsed certificate.
    pub fn from_cert(cert: &X509Certificate<'_>) -> Result<Option<Vec<Transport>>, U2fError> {
        let oid = Oid::from_str(TRANSPORTS_EXT_OID)
            .map_err(|_| U2fError::Certificate("invalid transports extension oid".into()))?;

        let ext = match cert.extensions().iter().find(|e| e.oid == oid) {
            Some(ext) => ext,
            None => return Ok(None),
        };

        let der_bitstring = ext.value;
        if der_bitstring.len() < 3 {
            return Err(U2fError::Certificate(
                "malformed transports extension".into(),
            ));
        }
        let unused_bits = der_bitstring[2];
        let mut content: Vec<u8> = der_bitstring[3..].to_vec();
        if let Some(last) = content.last_mut() {
            *last &= 0xffu8 << unused_bits;
        }

        let mut mask: u32 = 0;
        for byte in content {
            let mut byte = byte;
            for _ in 0..8 {
                mask = (mask << 1) | (byte & 1) as u32;
                byte >>= 1;
            }
        }

        Ok(Some(Transport::from_bitmask(mask)))
    }
}

/// Free-form vendor metadata (name, URL, etc). Unknown keys pass
/// through unexamined -- the core never interprets them.
pub type VendorInfo = serde_json::Map<String, serde_json::Value>;

/// A selector used to pick out the right [`DeviceInfo`] within a
/// [`MetadataObject`] for a given leaf certificate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Selector {
    #[serde(rename = "type")]
    pub selector_type: String,
    pub parameters: serde_json::Value,
}

/// Per-device entry within a [`MetadataObject`]: which certificates it
/// applies to and what transports it supports.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `None` means "matches any leaf issued under this vendor's
    /// trust roots".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectors: Option<Vec<Selector>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<u32>,
}

impl DeviceInfo {
    /// Decodes [`Self::transports`] into a transport set.
    pub fn transport_set(&self) -> Option<Vec<Transport>> {
        self.transports.map(Transport::from_bitmask)
    }
}

/// A vendor trust bundle: the issuer certificates trusted for a
/// vendor, plus the devices known to be issued under them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataObject {
    pub identifier: String,
    pub version: u32,
    #[serde(default)]
    pub vendor_info: VendorInfo,
    pub trusted_certificates: Vec<String>,
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

/// The verdict produced by resolving a leaf certificate against the
/// metadata store.
#[derive(Clone, Debug)]
pub struct Attestation {
    pub trusted: bool,
    pub vendor_info: Option<VendorInfo>,
    pub device_info: DeviceInfo,
    pub transports: Option<Vec<Transport>>,
}

impl Attestation {
    pub fn new(
        trusted: bool,
        vendor_info: Option<VendorInfo>,
        device_info: DeviceInfo,
        cert_transports: Option<Vec<Transport>>,
    ) -> Attestation {
        let device_transports = device_info.transport_set();
        let transports = if cert_transports.is_none() && device_transports.is_none() {
            None
        } else {
            let mask = Transport::to_bitmask(cert_transports.as_deref().unwrap_or(&[]))
                | Transport::to_bitmask(device_transports.as_deref().unwrap_or(&[]));
            Some(Transport::from_bitmask(mask))
        };

        Attestation {
            trusted,
            vendor_info,
            device_info,
            transports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_key_round_trips() {
        for t in Transport::ALL {
            assert_eq!(Transport::from_key(t.key()), Some(t));
        }
    }

    #[test]
    fn bitmask_round_trips() {
        let set = vec![Transport::Usb, Transport::Nfc];
        let mask = Transport::to_bitmask(&set);
        assert_eq!(mask, 0x04 | 0x08);
        let back = Transport::from_bitmask(mask);
        assert_eq!(back, set);
    }

    #[test]
    fn attestation_transports_are_union_of_cert_and_device() {
        let device = DeviceInfo {
            selectors: None,
            transports: Some(0x01),
        };
        let attestation = Attestation::new(true, None, device, Some(vec![Transport::Usb]));
        let mut transports = attestation.transports.unwrap();
        transports.sort_by_key(|t| *t as u32);
        assert_eq!(transports, vec![Transport::Bt, Transport::Usb]);
    }

    #[test]
    fn attestation_transports_none_when_both_absent() {
        let device = DeviceInfo::default();
        let attestation = Attestation::new(false, None, device, None);
        assert!(attestation.transports.is_none());
    }

    /// Real Yubico EE attestation cert (serial 0x2071f0a3) carrying
    /// the transports extension with the USB and NFC bits set.
    const ATTESTATION_CERT_WITH_TRANSPORT: &str = concat!(
        "MIICIjCCAQygAwIBAgIEIHHwozALBgkqhkiG9w0BAQswDzENMAsGA1UEAxMEdGVz",
        "dDAeFw0xNTA4MTEwOTAwMzNaFw0xNjA4MTAwOTAwMzNaMCkxJzAlBgNVBAMTHll1",
        "YmljbyBVMkYgRUUgU2VyaWFsIDU0NDMzODA4MzBZMBMGByqGSM49AgEGCCqGSM49",
        "AwEHA0IABPdFG1pBjBBQVhLrD39Qg1vKjuR2kRdBZnwLI/zgzztQpf4ffpkrkB/3",
        "E0TXj5zg8gN9sgMkX48geBe+tBEpvMmjOzA5MCIGCSsGAQQBgsQKAgQVMS4zLjYu",
        "MS40LjEuNDE0ODIuMS4yMBMGCysGAQQBguUcAgEBBAQDAgQwMAsGCSqGSIb3DQEB",
        "CwOCAQEAb3YpnmHHduNuWEXlLqlnww9034ZeZaojhPAYSLR8d5NPk9gc0hkjQKmI",
        "aaBM7DsaHbcHMKpXoMGTQSC++NCZTcKvZ0Lt12mp5HRnM1NNBPol8Hte5fLmvW4t",
        "Q9EzLl4gkz7LSlORxTuwTbae1eQqNdxdeB+0ilMFCEUc+3NGCNM0RWd+sP5+gzMX",
        "BDQAI1Sc9XaPIg8t3du5JChAl1ifpu/uERZ2WQgtxeBDO6z1Xoa5qz4svf5oURjP",
        "ZjxS0WUKht48Z2rIjk5lZzERSaY3RrX3UtrnZEIzCmInXOrcRPeAD4ZutpiwuHe6",
        "2ABsjuMRnKbATbOUiLdknNyPYYQz2g==",
    );

    #[test]
    fn decodes_usb_and_nfc_from_cert_transports_extension() {
        let der = base64::decode(ATTESTATION_CERT_WITH_TRANSPORT).unwrap();
        let mut transports = Transport::from_cert_der(&der).unwrap().unwrap();
        transports.sort_by_key(|t| *t as u32);
        assert_eq!(transports, vec![Transport::Usb, Transport::Nfc]);
    }
}
