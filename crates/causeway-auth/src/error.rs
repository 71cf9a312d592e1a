// ABOUTME: Error types for the authorization handshake using thiserror.
// ABOUTME: Covers unsupported hosts, rejection, timeout, and interruption.

use thiserror::Error;

/// Errors that can occur during token acquisition.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The endpoint set advertises no handshake this client understands.
    #[error("host {host} does not advertise an authorization method this version of causeway supports")]
    UnsupportedHost { host: String },

    /// The remote host rejected the handshake, denied consent, or returned
    /// an unusable token.
    #[error("authorization for {host} failed: {reason}")]
    AuthorizationFailed {
        host: String,
        reason: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The handshake did not complete within the configured deadline.
    #[error("authorization for {host} timed out after {limit_secs} seconds")]
    AuthorizationTimedOut { host: String, limit_secs: u64 },

    /// The user interrupted the handshake before it completed.
    #[error("authorization for {host} was interrupted before completion")]
    Aborted { host: String },

    /// The authorization HTTP client could not be constructed.
    #[error("failed to construct the authorization HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Result type alias using AuthError.
pub type Result<T> = std::result::Result<T, AuthError>;
