// ABOUTME: Device-authorization handshake driver for causeway login.
// ABOUTME: Requests a user code, presents it, and polls for the bearer token.

use crate::error::{AuthError, Result};
use crate::service::{negotiate_grant, Grant, DEVICE_GRANT};
use async_trait::async_trait;
use causeway_credentials::Credential;
use causeway_host::ServiceEndpoints;
use colored::Colorize;
use serde::Deserialize;
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default ceiling on the whole handshake, user approval included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// RFC 8628 default poll interval when the host does not name one.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Added to the interval on a slow_down response, per RFC 8628.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Runs an authorization handshake for a discovered endpoint set.
#[async_trait]
pub trait AcquireToken {
    /// Drive the handshake to a bearer credential.
    ///
    /// The credential is bound to the host the endpoints were discovered
    /// for; implementations never substitute a different host.
    ///
    /// # Errors
    /// [`AuthError::UnsupportedHost`] when no advertised grant is
    /// understood, [`AuthError::Aborted`] when `cancel` fires,
    /// [`AuthError::AuthorizationTimedOut`] past the deadline, and
    /// [`AuthError::AuthorizationFailed`] when the host rejects the
    /// handshake or returns an unusable token.
    async fn acquire(
        &self,
        endpoints: &ServiceEndpoints,
        cancel: CancellationToken,
    ) -> Result<Credential>;
}

/// Drives the device-authorization handshake against a discovered host.
///
/// The handshake can suspend for as long as the user takes to approve the
/// login in their browser, so the whole flow races the cancellation token
/// and a configurable deadline rather than blocking uninterruptibly.
pub struct TokenAcquirer {
    http: reqwest::Client,
    timeout: Duration,
}

impl TokenAcquirer {
    /// # Errors
    /// Returns [`AuthError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(AuthError::HttpClient)?;
        Ok(Self { http, timeout })
    }

    async fn device_code_flow(&self, endpoints: &ServiceEndpoints) -> Result<Credential> {
        let host = endpoints.hostname().display().to_string();
        let login = endpoints.login();
        // negotiate_grant guarantees the endpoint for this variant.
        let device_endpoint = login
            .device_authorization_endpoint
            .clone()
            .ok_or_else(|| AuthError::UnsupportedHost { host: host.clone() })?;

        debug!(host = %host, endpoint = %device_endpoint, "requesting device authorization");
        let authorization: DeviceAuthorizationResponse = self
            .http
            .post(device_endpoint)
            .form(&[("client_id", login.client_id.as_str())])
            .send()
            .await
            .map_err(|e| request_failed(&host, "the device authorization request could not be sent", e))?
            .error_for_status()
            .map_err(|e| request_failed(&host, "the host rejected the device authorization request", e))?
            .json()
            .await
            .map_err(|e| request_failed(&host, "the device authorization response is malformed", e))?;

        present_user_code(&host, &authorization);

        let mut interval = authorization
            .interval
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        loop {
            tokio::time::sleep(interval).await;

            let response = self
                .http
                .post(login.token_endpoint.clone())
                .form(&[
                    ("grant_type", DEVICE_GRANT),
                    ("device_code", authorization.device_code.as_str()),
                    ("client_id", login.client_id.as_str()),
                ])
                .send()
                .await
                .map_err(|e| request_failed(&host, "the token request could not be sent", e))?;

            // Pending polls come back as HTTP errors with a JSON body, so
            // decode before checking the status.
            let body: TokenResponse = response
                .json()
                .await
                .map_err(|e| request_failed(&host, "the token response is malformed", e))?;

            match next_poll_step(&host, body)? {
                PollStep::Ready(credential) => {
                    println!();
                    return Ok(credential);
                }
                PollStep::Wait => progress_dot(),
                PollStep::SlowDown => {
                    interval += SLOW_DOWN_STEP;
                    progress_dot();
                }
            }
        }
    }
}

#[async_trait]
impl AcquireToken for TokenAcquirer {
    async fn acquire(
        &self,
        endpoints: &ServiceEndpoints,
        cancel: CancellationToken,
    ) -> Result<Credential> {
        let host = endpoints.hostname().display().to_string();
        let grant = negotiate_grant(endpoints)?;

        let handshake = async {
            match grant {
                Grant::DeviceCode => self.device_code_flow(endpoints).await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(AuthError::Aborted { host }),
            _ = tokio::time::sleep(self.timeout) => Err(AuthError::AuthorizationTimedOut {
                host,
                limit_secs: self.timeout.as_secs(),
            }),
            result = handshake => result,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorizationResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    verification_uri_complete: Option<String>,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Next action after one token-endpoint poll.
#[derive(Debug)]
enum PollStep {
    Ready(Credential),
    Wait,
    SlowDown,
}

fn next_poll_step(host: &str, response: TokenResponse) -> Result<PollStep> {
    if let Some(error) = response.error.as_deref() {
        return match error {
            "authorization_pending" => Ok(PollStep::Wait),
            "slow_down" => Ok(PollStep::SlowDown),
            "expired_token" => Err(auth_failed(
                host,
                "the device code expired before the login was approved".to_string(),
            )),
            "access_denied" => Err(auth_failed(host, "the login request was denied".to_string())),
            other => {
                let reason = match response.error_description {
                    Some(description) => format!("the host reported {other:?}: {description}"),
                    None => format!("the host reported {other:?}"),
                };
                Err(auth_failed(host, reason))
            }
        };
    }

    let Some(token) = response.access_token else {
        return Err(auth_failed(
            host,
            "the token response carries neither a token nor an error".to_string(),
        ));
    };
    if token.is_empty() {
        return Err(auth_failed(host, "the host returned an empty token".to_string()));
    }
    if let Some(kind) = response.token_type.as_deref() {
        if !kind.eq_ignore_ascii_case("bearer") {
            return Err(auth_failed(
                host,
                format!("the host returned an unsupported token type {kind:?}"),
            ));
        }
    }

    let mut credential = Credential::new(token);
    if let Some(refresh_token) = response.refresh_token {
        credential = credential.with_refresh_token(refresh_token);
    }
    Ok(PollStep::Ready(credential))
}

fn auth_failed(host: &str, reason: String) -> AuthError {
    AuthError::AuthorizationFailed {
        host: host.to_string(),
        reason,
        source: None,
    }
}

fn request_failed(host: &str, reason: &str, source: reqwest::Error) -> AuthError {
    AuthError::AuthorizationFailed {
        host: host.to_string(),
        reason: reason.to_string(),
        source: Some(source),
    }
}

fn present_user_code(host: &str, authorization: &DeviceAuthorizationResponse) {
    let uri = authorization
        .verification_uri_complete
        .as_deref()
        .unwrap_or(&authorization.verification_uri);

    println!();
    println!("{}", "━".repeat(50).dimmed());
    println!();
    println!("  Open this URL in your browser to authorize {}:", host.bold());
    println!();
    println!("    {}", uri.cyan());
    println!();
    println!("  Enter this code when prompted:");
    println!();
    println!(
        "  {}",
        format!("  {}  ", authorization.user_code)
            .on_white()
            .black()
            .bold()
    );
    println!();
    println!("{}", "━".repeat(50).dimmed());
    println!();
    println!("Waiting for approval...");
}

fn progress_dot() {
    print!(".");
    let _ = std::io::stdout().flush();
}
