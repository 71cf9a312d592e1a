// ABOUTME: Well-known service discovery for causeway hosts.
// ABOUTME: Fetches /.well-known/causeway.json and validates the login service.

use crate::error::{HostError, Result};
use crate::hostname::Hostname;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Conventional discovery path served by causeway-capable hosts.
pub const WELL_KNOWN_PATH: &str = "/.well-known/causeway.json";

/// Discovery service id for the login handshake.
pub const LOGIN_SERVICE_ID: &str = "login.v1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The `login.v1` service advertised by a host.
#[derive(Debug, Clone)]
pub struct LoginService {
    /// OAuth client id registered for native CLI clients.
    pub client_id: String,
    /// Token endpoint used to redeem an authorization grant.
    pub token_endpoint: Url,
    /// Device-authorization endpoint, when the host offers the device grant.
    pub device_authorization_endpoint: Option<Url>,
    /// Grant types the host is willing to negotiate.
    pub grant_types: Vec<String>,
}

/// Service endpoints advertised by one host.
///
/// Built fresh from a discovery response on every login attempt; never
/// cached across invocations.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    hostname: Hostname,
    document_url: Url,
    services: serde_json::Map<String, Value>,
    login: LoginService,
}

impl ServiceEndpoints {
    /// Assemble an endpoint set from already-validated parts.
    ///
    /// [`Discover::discover`] is the normal constructor; this exists so
    /// embedders and tests can build endpoint sets without the network.
    pub fn from_parts(
        hostname: Hostname,
        document_url: Url,
        services: serde_json::Map<String, Value>,
        login: LoginService,
    ) -> Self {
        Self {
            hostname,
            document_url,
            services,
            login,
        }
    }

    /// The host these endpoints were discovered for.
    pub fn hostname(&self) -> &Hostname {
        &self.hostname
    }

    /// The validated login service.
    pub fn login(&self) -> &LoginService {
        &self.login
    }

    /// Look up an advertised service URL by id.
    ///
    /// Relative URLs resolve against the discovery document URL, so a host
    /// can advertise `/api/v2/` and have it bind to its own authority.
    pub fn service_url(&self, id: &str) -> Option<Url> {
        let raw = self.services.get(id)?.as_str()?;
        self.document_url.join(raw).ok()
    }
}

/// Resolves a canonical host to its advertised service endpoints.
#[async_trait]
pub trait Discover {
    /// Fetch and validate the host's discovery document.
    ///
    /// # Errors
    /// Returns [`HostError::DiscoveryFailed`] when the host is unreachable,
    /// serves a malformed document, or advertises no usable login service.
    async fn discover(&self, hostname: &Hostname) -> Result<ServiceEndpoints>;
}

/// HTTP discovery client performing the well-known lookup.
///
/// A single GET per call; a failed attempt is surfaced immediately with no
/// retries or backoff.
pub struct DiscoveryClient {
    http: reqwest::Client,
}

impl DiscoveryClient {
    /// # Errors
    /// Returns [`HostError::HttpClient`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(HostError::HttpClient)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Discover for DiscoveryClient {
    async fn discover(&self, hostname: &Hostname) -> Result<ServiceEndpoints> {
        let document_url = well_known_url(hostname)?;
        debug!(host = hostname.comparison_key(), url = %document_url, "fetching discovery document");

        let response = self
            .http
            .get(document_url.clone())
            .send()
            .await
            .map_err(|e| HostError::DiscoveryFailed {
                host: hostname.display().to_string(),
                reason: "the host could not be reached".to_string(),
                source: Some(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(discovery_failed(
                hostname,
                format!("the host answered its discovery document with HTTP status {status}"),
            ));
        }

        let services: serde_json::Map<String, Value> =
            response.json().await.map_err(|e| HostError::DiscoveryFailed {
                host: hostname.display().to_string(),
                reason: "the discovery document is not a JSON object of services".to_string(),
                source: Some(e),
            })?;

        let login = parse_login_service(hostname, &document_url, &services)?;
        debug!(
            host = hostname.comparison_key(),
            services = services.len(),
            "discovery document validated"
        );

        Ok(ServiceEndpoints {
            hostname: hostname.clone(),
            document_url,
            services,
            login,
        })
    }
}

fn well_known_url(hostname: &Hostname) -> Result<Url> {
    let raw = format!("https://{}{}", hostname.comparison_key(), WELL_KNOWN_PATH);
    Url::parse(&raw).map_err(|e| {
        discovery_failed(hostname, format!("could not build the discovery URL: {e}"))
    })
}

fn discovery_failed(hostname: &Hostname, reason: impl Into<String>) -> HostError {
    HostError::DiscoveryFailed {
        host: hostname.display().to_string(),
        reason: reason.into(),
        source: None,
    }
}

/// Validate the `login.v1` service out of a discovery document.
fn parse_login_service(
    hostname: &Hostname,
    document_url: &Url,
    services: &serde_json::Map<String, Value>,
) -> Result<LoginService> {
    let Some(raw) = services.get(LOGIN_SERVICE_ID) else {
        return Err(discovery_failed(
            hostname,
            "this host does not support causeway login",
        ));
    };
    let service = raw.as_object().ok_or_else(|| {
        discovery_failed(
            hostname,
            format!("the {LOGIN_SERVICE_ID} service is malformed (expected an object)"),
        )
    })?;

    let client_id = service
        .get("client")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            discovery_failed(
                hostname,
                format!("the {LOGIN_SERVICE_ID} service is missing its client id"),
            )
        })?
        .to_string();

    let token_endpoint = endpoint_url(hostname, document_url, service, "token")?.ok_or_else(|| {
        discovery_failed(
            hostname,
            format!("the {LOGIN_SERVICE_ID} service is missing its token endpoint"),
        )
    })?;

    let device_authorization_endpoint =
        endpoint_url(hostname, document_url, service, "device_authorization")?;

    let grant_types = match service.get("grant_types") {
        None => Vec::new(),
        Some(value) => value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(String::from))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| {
                discovery_failed(
                    hostname,
                    format!("the {LOGIN_SERVICE_ID} grant_types list is malformed"),
                )
            })?,
    };

    Ok(LoginService {
        client_id,
        token_endpoint,
        device_authorization_endpoint,
        grant_types,
    })
}

/// Read an endpoint property as a URL, resolving relative references
/// against the discovery document.
fn endpoint_url(
    hostname: &Hostname,
    document_url: &Url,
    service: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Url>> {
    let Some(value) = service.get(key) else {
        return Ok(None);
    };
    let raw = value.as_str().ok_or_else(|| {
        discovery_failed(
            hostname,
            format!("the {LOGIN_SERVICE_ID} {key} endpoint is not a string"),
        )
    })?;
    let url = document_url.join(raw).map_err(|e| {
        discovery_failed(
            hostname,
            format!("the {LOGIN_SERVICE_ID} {key} endpoint is not a valid URL: {e}"),
        )
    })?;
    Ok(Some(url))
}
