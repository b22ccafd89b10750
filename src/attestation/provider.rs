//! Combines a [`MetadataResolver`] with a set of [`DeviceMatcher`]s to
//! produce an [`Attestation`] verdict for a leaf certificate.

use std::collections::HashMap;

use x509_parser::prelude::*;

use crate::attestation::matchers::{default_matchers, DeviceMatcher};
use crate::attestation::model::{Attestation, DeviceInfo, Transport};
use crate::attestation::resolver::MetadataResolver;
use crate::error::U2fError;

/// Resolves a leaf certificate's trust and device metadata, combining
/// the transport set declared by the certificate itself with the one
/// declared by whichever [`DeviceInfo`] matches.
pub struct MetadataProvider {
    resolver: MetadataResolver,
    matchers: HashMap<&'static str, Box<dyn DeviceMatcher + Send + Sync>>,
}

impl MetadataProvider {
    pub fn new(resolver: MetadataResolver) -> MetadataProvider {
        let mut provider = MetadataProvider {
            resolver,
            matchers: HashMap::new(),
        };
        for matcher in default_matchers() {
            provider.add_matcher(matcher);
        }
        provider
    }

    pub fn add_matcher(&mut self, matcher: Box<dyn DeviceMatcher + Send + Sync>) {
        self.matchers.insert(matcher.selector_type(), matcher);
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    /// Produces the attestation verdict for a DER-encoded leaf
    /// certificate.
    pub fn get_attestation(&self, cert_der: &[u8]) -> Result<Attestation, U2fError> {
        let (_, cert) = X509Certificate::from_der(cert_der)
            .map_err(|e| U2fError::Certificate(e.to_string()))?;

        let metadata = self.resolver.resolve(cert_der)?;
        let (trusted, vendor_info, device_info) = match metadata {
            Some(metadata) => {
                let device_info = self.lookup_device(&metadata, &cert);
                (true, Some(metadata.vendor_info), device_info)
            }
            None => (false, None, DeviceInfo::default()),
        };

        let cert_transports = Transport::from_cert(&cert)?;
        Ok(Attestation::new(trusted, vendor_info, device_info, cert_transports))
    }

    fn lookup_device(
        &self,
        metadata: &crate::attestation::model::MetadataObject,
        cert: &X509Certificate<'_>,
    ) -> DeviceInfo {
        for device in &metadata.devices {
            match &device.selectors {
                None => return device.clone(),
                Some(selectors) => {
                    for selector in selectors {
                        if let Some(matcher) = self.matchers.get(selector.selector_type.as_str()) {
                            if matcher.matches(cert, &selector.parameters) {
                                return device.clone();
                            }
                        }
                    }
                }
            }
        }
        DeviceInfo::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::model::MetadataObject;
    use x509_parser::pem::parse_x509_pem;

    const ISSUER_CERT_PEM: &str = include_str!("../../tests/fixtures/issuer.pem");
    const LEAF_CERT_PEM: &str = include_str!("../../tests/fixtures/leaf.pem");

    #[test]
    fn untrusted_cert_yields_untrusted_attestation() {
        let provider = MetadataProvider::new(MetadataResolver::new());
        let (_, pem) = parse_x509_pem(LEAF_CERT_PEM.as_bytes()).unwrap();

        let attestation = provider.get_attestation(&pem.contents).unwrap();
        assert!(!attestation.trusted);
        assert!(attestation.vendor_info.is_none());
    }

    #[test]
    fn trusted_cert_with_unconditional_device_resolves_vendor_info() {
        let resolver = MetadataResolver::new();
        resolver
            .add_metadata(MetadataObject {
                identifier: "test-vendor".into(),
                version: 1,
                vendor_info: Default::default(),
                trusted_certificates: vec![ISSUER_CERT_PEM.to_string()],
                devices: vec![crate::attestation::model::DeviceInfo::default()],
            })
            .unwrap();
        let provider = MetadataProvider::new(resolver);
        let (_, pem) = parse_x509_pem(LEAF_CERT_PEM.as_bytes()).unwrap();

        let attestation = provider.get_attestation(&pem.contents).unwrap();
        assert!(attestation.trusted);
    }
}
