// ABOUTME: Error types for hostname handling and service discovery.
// ABOUTME: Provides typed errors for normalization failures and discovery failures.

use thiserror::Error;

/// Errors that can occur while resolving a host's identity or endpoints.
#[derive(Error, Debug)]
pub enum HostError {
    /// The raw input could not be parsed as a DNS-style hostname.
    #[error("the given hostname {raw:?} is not valid: {reason}")]
    InvalidHostname { raw: String, reason: String },

    /// The host was unreachable, served a malformed discovery document, or
    /// does not advertise a usable login service.
    #[error("service discovery failed for {host}: {reason}")]
    DiscoveryFailed {
        host: String,
        reason: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The discovery HTTP client could not be constructed.
    #[error("failed to construct the discovery HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Result type alias using HostError.
pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_hostname_display() {
        let err = HostError::InvalidHostname {
            raw: "example..com".to_string(),
            reason: "the hostname contains an empty label".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("example..com"));
        assert!(display.contains("empty label"));
    }

    #[test]
    fn test_discovery_failed_display() {
        let err = HostError::DiscoveryFailed {
            host: "app.causeway.dev".to_string(),
            reason: "the host could not be reached".to_string(),
            source: None,
        };
        let display = format!("{}", err);
        assert!(display.contains("service discovery failed"));
        assert!(display.contains("app.causeway.dev"));
        assert!(display.contains("could not be reached"));
    }

    #[test]
    fn test_discovery_failed_without_source() {
        use std::error::Error;

        let err = HostError::DiscoveryFailed {
            host: "app.causeway.dev".to_string(),
            reason: "no login service".to_string(),
            source: None,
        };
        assert!(err.source().is_none());
    }
}
