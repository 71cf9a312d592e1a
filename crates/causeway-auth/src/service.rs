// ABOUTME: Capability negotiation over a host's advertised login service.
// ABOUTME: Selects the authorization grant the handshake driver will run.

use crate::error::{AuthError, Result};
use causeway_host::ServiceEndpoints;

/// RFC 8628 device-authorization grant identifier.
pub const DEVICE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Handshake variants this client knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Device-authorization flow: show a user code, poll for the token.
    DeviceCode,
}

/// Pick the handshake to run for an endpoint set.
///
/// Selection is by advertised capability: the grant types and endpoints in
/// the discovery document decide which handshake variant runs, nothing is
/// hard-coded to one protocol.
///
/// # Errors
/// Returns [`AuthError::UnsupportedHost`] when the host advertises no grant
/// this client understands.
pub fn negotiate_grant(endpoints: &ServiceEndpoints) -> Result<Grant> {
    let login = endpoints.login();
    let device_ready = login.grant_types.iter().any(|g| g == DEVICE_GRANT)
        && login.device_authorization_endpoint.is_some();
    if device_ready {
        return Ok(Grant::DeviceCode);
    }
    Err(AuthError::UnsupportedHost {
        host: endpoints.hostname().display().to_string(),
    })
}
