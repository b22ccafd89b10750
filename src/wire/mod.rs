//! Raw binary wire frames exchanged with a U2F authenticator.

mod registration;
mod signature;

pub use registration::RegistrationData;
pub use signature::SignatureData;
