//! Typed JSON wire messages exchanged between server, browser client,
//! and authenticator.

pub mod client_data;
pub mod device;
pub mod register;
pub mod sign;

pub use client_data::{ClientData, ClientDataType};
pub use device::{DeviceRegistration, RegisteredKey};
pub use register::{RegisterRequest, RegisterResponse, U2fRegisterRequest};
pub use sign::{SignRequest, SignResponse, U2fSignRequest};
