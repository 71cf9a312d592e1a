// ABOUTME: Token acquisition for causeway login
// ABOUTME: Negotiates a handshake grant and drives it to a bearer credential

pub mod device;
pub mod error;
pub mod service;

pub use device::{AcquireToken, TokenAcquirer, DEFAULT_TIMEOUT};
pub use error::AuthError;
pub use service::{negotiate_grant, Grant, DEVICE_GRANT};
