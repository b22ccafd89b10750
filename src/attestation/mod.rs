//! Attestation metadata: vendor trust bundles, certificate resolution,
//! and device matching.

pub mod matchers;
pub mod model;
pub mod provider;
pub mod resolver;

pub use model::{Attestation, DeviceInfo, MetadataObject, Selector, Transport, VendorInfo};
pub use provider::MetadataProvider;
pub use resolver::MetadataResolver;
