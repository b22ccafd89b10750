//! Relying-party (server) side core of the FIDO U2F v2 authentication
//! protocol.
//!
//! This crate is the stateless cryptographic core: it issues
//! registration and authentication challenges, validates the
//! attested device-generated responses, and classifies the
//! authenticator device that signed a registration against a vendor
//! metadata store. It performs no I/O, holds no long-lived state
//! beyond an optional in-process [`attestation::MetadataResolver`],
//! and never logs or persists anything on the caller's behalf.
//!
//! The entry points are [`begin_register`]/[`complete_register`] for
//! enrolling a new device, and [`begin_authenticate`]/
//! [`complete_authenticate`] for verifying one afterwards. A caller
//! persists the [`DeviceRegistration`] `complete_register` returns
//! and feeds it back into `begin_authenticate` on future sign-in
//! attempts.

pub mod attestation;
pub mod codec;
pub mod error;
pub mod message;
pub mod wire;

pub use error::U2fError;
pub use message::{
    ClientData, ClientDataType, DeviceRegistration, RegisterRequest, RegisterResponse,
    RegisteredKey, SignRequest, SignResponse, U2fRegisterRequest, U2fSignRequest,
};
pub use wire::{RegistrationData, SignatureData};

/// Starts a registration ceremony for `app_id`, returning a bundle to
/// serialize to the client.
///
/// `registered_keys` is echoed back unchanged so an authenticator
/// that already holds one of them can refuse to re-register. A fresh
/// 32-byte challenge is generated unless `challenge` is supplied.
pub fn begin_register(
    app_id: impl Into<String>,
    registered_keys: Vec<RegisteredKey>,
    challenge: Option<Vec<u8>>,
) -> U2fRegisterRequest {
    U2fRegisterRequest::create(app_id, registered_keys, challenge)
}

/// Validates and verifies a [`RegisterResponse`] against the
/// [`U2fRegisterRequest`] that produced it.
///
/// Returns the [`DeviceRegistration`] to persist, plus the raw DER
/// attestation certificate for optional inspection (e.g. via
/// [`attestation::MetadataProvider::get_attestation`]).
pub fn complete_register(
    request: &U2fRegisterRequest,
    response: &RegisterResponse,
    valid_facets: Option<&[String]>,
) -> Result<(DeviceRegistration, Vec<u8>), U2fError> {
    request.complete(response, valid_facets)
}

/// Starts an authentication ceremony against `devices`, one
/// [`SignRequest`] per device, all sharing a single fresh challenge
/// unless `challenge` is supplied.
pub fn begin_authenticate(
    app_id: impl Into<String>,
    devices: Vec<DeviceRegistration>,
    challenge: Option<Vec<u8>>,
) -> U2fSignRequest {
    U2fSignRequest::create(app_id, devices, challenge)
}

/// Validates and verifies a [`SignResponse`] against the
/// [`U2fSignRequest`] that produced it.
///
/// Returns the authenticator's monotonic use counter and
/// user-presence flag. Counter monotonicity is the caller's
/// responsibility: a non-increasing counter relative to the caller's
/// stored value is a cloned-authenticator signal, but detecting that
/// is out of scope here.
pub fn complete_authenticate(
    request: &U2fSignRequest,
    response: &SignResponse,
    valid_facets: Option<&[String]>,
) -> Result<(u32, u8), U2fError> {
    request.complete(response, valid_facets)
}
