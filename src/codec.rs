//! Low-level binary/text codec shared by the wire types and message model
//!
//! Web-safe base64, SHA-256, the fixed DER prefix that turns a raw
//! P-256 point into a `SubjectPublicKeyInfo`, and the ASN.1
//! outer-length parser used to split a `registrationData` frame
//! between its embedded certificate and trailing signature.

use crate::error::U2fError;
use ring::digest::{digest, Digest, SHA256};

/// DER encoding of the fixed `SubjectPublicKeyInfo` prefix for a P-256
/// public key. Prepending this to a 65-byte uncompressed EC point
/// yields a DER `SubjectPublicKeyInfo` any standard ASN.1 key loader
/// will accept.
pub const PUB_KEY_DER_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08, 0x2a,
    0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];

/// Decodes a web-safe (RFC 4648 §5), unpadded base64 string.
///
/// Padding is restored before decoding; any character outside
/// `[A-Za-z0-9_-]=` is rejected.
pub fn web_safe_decode(data: &str) -> Result<Vec<u8>, U2fError> {
    let mut padded = data.to_owned();
    let rem = padded.len() % 4;
    if rem != 0 {
        padded.push_str(&"=".repeat(4 - rem));
    }
    Ok(base64::decode_config(&padded, base64::URL_SAFE)?)
}

/// Encodes `data` as web-safe base64 with padding stripped.
pub fn web_safe_encode(data: impl AsRef<[u8]>) -> String {
    base64::encode_config(data.as_ref(), base64::URL_SAFE_NO_PAD)
}

/// SHA-256 of `data`.
pub fn sha256(data: impl AsRef<[u8]>) -> Digest {
    digest(&SHA256, data.as_ref())
}

/// Computes an `applicationParameter`: the SHA-256 digest of `app_id`
/// in its IDNA-encoded form.
///
/// Pure-ASCII `appId` values (the overwhelming common case, since an
/// `appId` is normally a `https://` origin) hash to the same bytes as
/// their raw form, but the IDNA step is still applied so that an
/// `appId` carrying a non-ASCII host matches other interoperable
/// implementations.
pub fn application_parameter(app_id: &str) -> Result<[u8; 32], U2fError> {
    let ascii = idna::domain_to_ascii(app_id)?;
    let mut out = [0u8; 32];
    out.copy_from_slice(sha256(ascii.as_bytes()).as_ref());
    Ok(out)
}

/// Prepends [`PUB_KEY_DER_PREFIX`] to a raw 65-byte uncompressed P-256
/// point, producing a DER-encoded `SubjectPublicKeyInfo`.
pub fn wrap_p256_public_key(raw: &[u8]) -> Vec<u8> {
    let mut der = Vec::with_capacity(PUB_KEY_DER_PREFIX.len() + raw.len());
    der.extend_from_slice(&PUB_KEY_DER_PREFIX);
    der.extend_from_slice(raw);
    der
}

/// Computes the total length (tag + length + value) of the DER TLV
/// object starting at offset 0 of `tlv`, using only the length octets
/// at `tlv[1..]` per X.690 `8.1.3`.
///
/// `tlv` must contain at least the tag byte and the first length byte.
pub fn parse_tlv_size(tlv: &[u8]) -> Result<usize, U2fError> {
    let len_byte = *tlv
        .get(1)
        .ok_or(U2fError::MalformedRegistration("truncated certificate length"))?;

    if len_byte < 0x80 {
        return Ok(2 + len_byte as usize);
    }

    let n_bytes = (len_byte & 0x7f) as usize;
    let len_octets = tlv
        .get(2..2 + n_bytes)
        .ok_or(U2fError::MalformedRegistration("truncated certificate length"))?;

    let mut length: usize = 0;
    for &b in len_octets {
        length = length * 256 + b as usize;
    }

    Ok(2 + n_bytes + length)
}
