//! Vendor trust store: maps a leaf attestation certificate to the
//! [`MetadataObject`] that vouches for it.

use std::collections::HashMap;

use parking_lot::RwLock;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

use crate::attestation::model::MetadataObject;
use crate::error::U2fError;

fn subject_cn(cert: &X509Certificate<'_>) -> Result<String, U2fError> {
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| U2fError::Certificate("certificate has no common name".into()))
}

fn issuer_cn(cert: &X509Certificate<'_>) -> Result<String, U2fError> {
    cert.issuer()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| U2fError::Certificate("certificate has no issuer common name".into()))
}

#[derive(Default)]
struct Index {
    /// Subject common name -> DER encodings of issuer certificates
    /// trusted under that name.
    certs_by_subject: HashMap<String, Vec<Vec<u8>>>,
    /// Issuer DER -> identifier of the [`MetadataObject`] it belongs to.
    metadata_by_cert: HashMap<Vec<u8>, String>,
}

/// Resolves leaf attestation certificates against a set of vendor
/// trust bundles.
///
/// Only the leaf's signature is checked against a candidate issuer's
/// public key -- chain length, expiry, key usage and revocation are
/// never consulted. Adding metadata under an already-known identifier
/// is a no-op unless the new version is strictly greater, in which
/// case the previous entry is replaced and every index is rebuilt from
/// scratch.
pub struct MetadataResolver {
    identifiers: RwLock<HashMap<String, MetadataObject>>,
    index: RwLock<Index>,
}

impl MetadataResolver {
    pub fn new() -> MetadataResolver {
        MetadataResolver {
            identifiers: RwLock::new(HashMap::new()),
            index: RwLock::new(Index::default()),
        }
    }

    /// Adds or replaces a vendor trust bundle.
    ///
    /// Silently ignored if a bundle with the same identifier and a
    /// version greater than or equal to `metadata.version` is already
    /// present.
    pub fn add_metadata(&self, metadata: MetadataObject) -> Result<(), U2fError> {
        log::debug!(
            "adding metadata identifier={} version={}",
            metadata.identifier,
            metadata.version
        );

        let mut identifiers = self.identifiers.write();
        if let Some(existing) = identifiers.get(&metadata.identifier) {
            if metadata.version <= existing.version {
                log::trace!("ignoring metadata with stale version");
                return Ok(());
            }
        }
        identifiers.insert(metadata.identifier.clone(), metadata);

        let mut index = Index::default();
        for entry in identifiers.values() {
            index_one(&mut index, entry)?;
        }
        *self.index.write() = index;

        Ok(())
    }

    /// Resolves a DER-encoded leaf certificate to the metadata that
    /// vouches for it, if any.
    pub fn resolve(&self, leaf_der: &[u8]) -> Result<Option<MetadataObject>, U2fError> {
        let (_, leaf) =
            X509Certificate::from_der(leaf_der).map_err(|e| U2fError::Certificate(e.to_string()))?;
        let issuer = issuer_cn(&leaf)?;

        let index = self.index.read();
        let candidates = match index.certs_by_subject.get(&issuer) {
            Some(candidates) => candidates,
            None => return Ok(None),
        };

        for issuer_der in candidates {
            let (_, issuer_cert) = X509Certificate::from_der(issuer_der)
                .map_err(|e| U2fError::Certificate(e.to_string()))?;
            let verified = leaf
                .verify_signature(Some(&issuer_cert.tbs_certificate.subject_pki))
                .is_ok();
            if verified {
                log::trace!("resolved leaf certificate against issuer {}", issuer);
                let identifier = &index.metadata_by_cert[issuer_der];
                return Ok(self.identifiers.read().get(identifier).cloned());
            }
        }

        Ok(None)
    }
}

impl Default for MetadataResolver {
    fn default() -> MetadataResolver {
        MetadataResolver::new()
    }
}

fn index_one(index: &mut Index, metadata: &MetadataObject) -> Result<(), U2fError> {
    for cert_pem in &metadata.trusted_certificates {
        let (_, pem) = parse_x509_pem(cert_pem.as_bytes())
            .map_err(|e| U2fError::Certificate(e.to_string()))?;
        let (_, cert) = X509Certificate::from_der(&pem.contents)
            .map_err(|e| U2fError::Certificate(e.to_string()))?;
        let subject = subject_cn(&cert)?;

        index
            .certs_by_subject
            .entry(subject)
            .or_default()
            .push(pem.contents.clone());
        index
            .metadata_by_cert
            .insert(pem.contents, metadata.identifier.clone());
    }
    Ok(())
}
