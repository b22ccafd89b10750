//! Top-level error taxonomy for the U2F relying-party core
//!
//! Every fallible public operation returns `Result<T, U2fError>`. Each
//! variant below corresponds to a row of the error table in the
//! protocol specification; none are collapsed into a generic "bad
//! request" bucket. Spec's `MalformedMessage` kind (required field
//! missing, JSON unparsable, base64 invalid) is realized here as two
//! separate, more specific variants -- [`U2fError::Json`] (missing
//! required field or otherwise unparsable JSON, since serde surfaces
//! a missing `#[derive(Deserialize)]` field as a `serde_json::Error`)
//! and [`U2fError::Base64`] -- rather than a single catch-all, since
//! both are independently constructible and distinguishable by
//! callers that want to.
use thiserror::Error;

/// All failures the U2F core can surface to a caller.
///
/// All errors here are fatal to the current operation -- there are no
/// retries inside the core.
#[derive(Debug, Error)]
pub enum U2fError {
    /// The raw `registrationData` frame violated the wire format: the
    /// reserved byte wasn't `0x05`, a length prefix ran past the end
    /// of the buffer, or the frame was truncated.
    #[error("malformed registration data: {0}")]
    MalformedRegistration(&'static str),

    /// A register/sign request bundle contained no `U2F_V2` entry.
    #[error("no U2F_V2 entry present in request")]
    UnsupportedVersion,

    /// `ClientData.typ` did not match the operation being completed.
    #[error("wrong client data type")]
    WrongType,

    /// The challenge echoed back in `ClientData` did not byte-equal
    /// the one that was issued.
    #[error("challenge does not match issued value")]
    WrongChallenge,

    /// `ClientData.origin` was not among the caller-supplied facets.
    #[error("origin is not an allowed facet")]
    InvalidFacet,

    /// No registered device's key handle matched the response.
    #[error("no registered device matches the given key handle")]
    UnknownKeyHandle,

    /// ECDSA verification of the attestation or assertion signature
    /// failed.
    #[error("signature verification failed")]
    InvalidSignature,

    /// A base64 (web-safe or standard) string failed to decode.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A JSON payload could not be parsed or serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An attestation certificate (or the trust store feeding the
    /// resolver) could not be parsed as DER/PEM X.509.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// IDNA encoding of an `appId` failed.
    #[error("idna encoding error")]
    Idna,
}

impl From<idna::Errors> for U2fError {
    fn from(_: idna::Errors) -> Self {
        U2fError::Idna
    }
}
