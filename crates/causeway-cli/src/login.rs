// ABOUTME: Login orchestration: normalize, discover, acquire, persist.
// ABOUTME: Linear flow that turns step failures into user-facing diagnostics.

use crate::diagnostics::{error_chain, Diagnostic, Diagnostics};
use causeway_auth::{AcquireToken, AuthError};
use causeway_credentials::{default_credentials_path, CredentialsDocument, StoreError};
use causeway_host::{Discover, Hostname};
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Outcome of a successful login.
#[derive(Debug)]
pub struct LoginReport {
    /// The canonical host the credential was stored for.
    pub hostname: Hostname,
    /// The credentials file the token was written to.
    pub credentials_path: PathBuf,
}

/// Composes the login steps against injected collaborators.
///
/// The flow is strictly linear and stops at the first failure: an invalid
/// hostname or a failed discovery never reaches the authorization prompt,
/// and a store failure never modifies the existing file. Running login
/// twice for one host replaces that host's credential and nothing else.
pub struct LoginFlow<D, A> {
    discoverer: D,
    acquirer: A,
    into_file: Option<PathBuf>,
}

impl<D: Discover, A: AcquireToken> LoginFlow<D, A> {
    pub fn new(discoverer: D, acquirer: A, into_file: Option<PathBuf>) -> Self {
        Self {
            discoverer,
            acquirer,
            into_file,
        }
    }

    /// Run the flow for a raw hostname argument (empty selects the default
    /// host). Returns the canonical hostname and destination path on
    /// success, or the collected diagnostics on failure.
    pub async fn run(
        &self,
        raw_hostname: &str,
        cancel: CancellationToken,
    ) -> Result<LoginReport, Diagnostics> {
        let hostname = Hostname::normalize(raw_hostname)
            .map_err(|e| diagnostic("Invalid hostname", &e))?;

        // From here on the canonical form is what the user sees, so the
        // messages match what discovery and the store actually used.
        println!(
            "{} Discovering services on {}...",
            "[1/3]".dimmed(),
            hostname.display()
        );
        let endpoints = self
            .discoverer
            .discover(&hostname)
            .await
            .map_err(|e| diagnostic("Service discovery failed", &e))?;

        println!(
            "{} Requesting authorization from {}...",
            "[2/3]".dimmed(),
            hostname.display()
        );
        let credential = self
            .acquirer
            .acquire(&endpoints, cancel)
            .await
            .map_err(|e| diagnostic(acquire_summary(&e), &e))?;

        println!("{} Saving credentials...", "[3/3]".dimmed());
        let path = match &self.into_file {
            Some(path) => path.clone(),
            None => default_credentials_path().map_err(|e| store_diagnostic(&e))?,
        };

        // Reload fresh on every attempt so concurrent logins to other
        // hosts are never clobbered.
        let mut document =
            CredentialsDocument::load(&path).map_err(|e| store_diagnostic(&e))?;
        document.upsert(hostname.comparison_key(), &credential);
        document.save(&path).map_err(|e| store_diagnostic(&e))?;

        debug!(
            host = hostname.comparison_key(),
            path = %path.display(),
            "credential stored"
        );

        Diagnostics::from(Diagnostic::warning(
            "Credentials are stored in plain text",
            format!(
                "The token for {} is stored unencrypted in {}.",
                hostname.display(),
                path.display()
            ),
        ))
        .report();

        Ok(LoginReport {
            hostname,
            credentials_path: path,
        })
    }
}

fn diagnostic(summary: &str, error: &dyn std::error::Error) -> Diagnostics {
    Diagnostic::error(summary, error_chain(error)).into()
}

fn store_diagnostic(error: &StoreError) -> Diagnostics {
    diagnostic("Failed to update the credentials file", error)
}

fn acquire_summary(error: &AuthError) -> &'static str {
    match error {
        AuthError::UnsupportedHost { .. } => "Host does not support causeway login",
        AuthError::AuthorizationTimedOut { .. } => "Login timed out",
        AuthError::Aborted { .. } => "Login interrupted",
        _ => "Login failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use causeway_credentials::Credential;
    use causeway_host::{HostError, LoginService, ServiceEndpoints, DEFAULT_HOSTNAME};
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use url::Url;

    fn endpoints_for(hostname: &Hostname) -> ServiceEndpoints {
        let base = format!("https://{}", hostname.comparison_key());
        let document_url =
            Url::parse(&format!("{base}/.well-known/causeway.json")).expect("should parse");
        let login = LoginService {
            client_id: "causeway-cli".to_string(),
            token_endpoint: Url::parse(&format!("{base}/oauth/token")).expect("should parse"),
            device_authorization_endpoint: Some(
                Url::parse(&format!("{base}/oauth/device")).expect("should parse"),
            ),
            grant_types: vec![causeway_auth::DEVICE_GRANT.to_string()],
        };
        ServiceEndpoints::from_parts(hostname.clone(), document_url, serde_json::Map::new(), login)
    }

    struct FakeDiscoverer {
        called: Arc<AtomicBool>,
        fail: bool,
    }

    #[async_trait]
    impl Discover for FakeDiscoverer {
        async fn discover(
            &self,
            hostname: &Hostname,
        ) -> std::result::Result<ServiceEndpoints, HostError> {
            self.called.store(true, Ordering::SeqCst);
            if self.fail {
                return Err(HostError::DiscoveryFailed {
                    host: hostname.display().to_string(),
                    reason: "the host could not be reached".to_string(),
                    source: None,
                });
            }
            Ok(endpoints_for(hostname))
        }
    }

    struct FakeAcquirer {
        called: Arc<AtomicBool>,
        token: String,
    }

    #[async_trait]
    impl AcquireToken for FakeAcquirer {
        async fn acquire(
            &self,
            _endpoints: &ServiceEndpoints,
            _cancel: CancellationToken,
        ) -> std::result::Result<Credential, AuthError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Credential::new(self.token.clone()))
        }
    }

    struct Harness {
        _dir: TempDir,
        path: PathBuf,
        discover_called: Arc<AtomicBool>,
        acquire_called: Arc<AtomicBool>,
        flow: LoginFlow<FakeDiscoverer, FakeAcquirer>,
    }

    fn harness(token: &str, discovery_fails: bool) -> Harness {
        let dir = TempDir::new().expect("should create temp dir");
        let path = dir.path().join("credentials.toml");
        let discover_called = Arc::new(AtomicBool::new(false));
        let acquire_called = Arc::new(AtomicBool::new(false));
        let flow = LoginFlow::new(
            FakeDiscoverer {
                called: discover_called.clone(),
                fail: discovery_fails,
            },
            FakeAcquirer {
                called: acquire_called.clone(),
                token: token.to_string(),
            },
            Some(path.clone()),
        );
        Harness {
            _dir: dir,
            path,
            discover_called,
            acquire_called,
            flow,
        }
    }

    #[tokio::test]
    async fn test_empty_input_logs_into_the_default_host() {
        // Scenario A: no argument, no existing store file.
        let harness = harness("default-token", false);

        let report = harness
            .flow
            .run("", CancellationToken::new())
            .await
            .expect("login should succeed");

        assert_eq!(report.hostname.comparison_key(), DEFAULT_HOSTNAME);
        assert_eq!(report.credentials_path, harness.path);

        let document = CredentialsDocument::load(&harness.path).expect("should load");
        assert_eq!(
            document.get(DEFAULT_HOSTNAME),
            Some(Credential::new("default-token"))
        );
        assert_eq!(document.hosts().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_hostname_stops_before_any_collaborator() {
        // Scenario B: nothing is contacted, nothing is written.
        let harness = harness("unused", false);

        let diagnostics = harness
            .flow
            .run("example..com", CancellationToken::new())
            .await
            .expect_err("login should fail");

        assert!(diagnostics.has_errors());
        let first = diagnostics.iter().next().expect("should have a diagnostic");
        assert_eq!(first.summary, "Invalid hostname");
        assert!(first.detail.contains("example..com"));

        assert!(!harness.discover_called.load(Ordering::SeqCst));
        assert!(!harness.acquire_called.load(Ordering::SeqCst));
        assert!(!harness.path.exists());
    }

    #[tokio::test]
    async fn test_discovery_failure_leaves_the_store_untouched() {
        // Scenario C: reachable flow stops before authorization.
        let harness = harness("unused", true);
        let seeded = "# untouched\n[credentials.\"a.example.com\"]\ntoken = \"aaaa\"\n";
        fs::write(&harness.path, seeded).expect("should seed");

        let diagnostics = harness
            .flow
            .run("example.com", CancellationToken::new())
            .await
            .expect_err("login should fail");

        let first = diagnostics.iter().next().expect("should have a diagnostic");
        assert_eq!(first.summary, "Service discovery failed");
        assert!(first.detail.contains("example.com"));

        assert!(!harness.acquire_called.load(Ordering::SeqCst));
        assert_eq!(fs::read_to_string(&harness.path).expect("should read"), seeded);
    }

    #[tokio::test]
    async fn test_relogin_replaces_only_the_matching_host() {
        // Scenario D: b.example.com is replaced, a.example.com survives.
        let harness = harness("fresh-b-token", false);
        let seeded = concat!(
            "# two hosts\n",
            "[credentials.\"a.example.com\"]\n",
            "token = \"aaaa\" # keep\n",
            "\n",
            "[credentials.\"b.example.com\"]\n",
            "token = \"stale\"\n",
        );
        fs::write(&harness.path, seeded).expect("should seed");

        harness
            .flow
            .run("b.example.com", CancellationToken::new())
            .await
            .expect("login should succeed");

        let content = fs::read_to_string(&harness.path).expect("should read");
        assert!(content.contains("# two hosts"));
        assert!(content.contains("token = \"aaaa\" # keep"));
        assert!(content.contains("fresh-b-token"));
        assert!(!content.contains("stale"));

        let document = CredentialsDocument::load(&harness.path).expect("should load");
        assert_eq!(document.hosts().len(), 2);
    }

    #[tokio::test]
    async fn test_login_is_idempotent_per_host() {
        let harness = harness("same-token", false);

        for _ in 0..2 {
            harness
                .flow
                .run("example.com", CancellationToken::new())
                .await
                .expect("login should succeed");
        }

        let document = CredentialsDocument::load(&harness.path).expect("should load");
        assert_eq!(document.hosts(), vec!["example.com".to_string()]);
        assert_eq!(
            document.get("example.com"),
            Some(Credential::new("same-token"))
        );
    }

    #[tokio::test]
    async fn test_corrupt_store_aborts_without_writing() {
        let harness = harness("unused-token", false);
        fs::write(&harness.path, "this is [ not toml").expect("should seed");

        let diagnostics = harness
            .flow
            .run("example.com", CancellationToken::new())
            .await
            .expect_err("login should fail");

        let first = diagnostics.iter().next().expect("should have a diagnostic");
        assert_eq!(first.summary, "Failed to update the credentials file");
        assert_eq!(
            fs::read_to_string(&harness.path).expect("should read"),
            "this is [ not toml"
        );
    }

    #[tokio::test]
    async fn test_hostname_case_folds_before_storage() {
        let harness = harness("token-1", false);

        let report = harness
            .flow
            .run("Example.COM:443", CancellationToken::new())
            .await
            .expect("login should succeed");

        assert_eq!(report.hostname.comparison_key(), "example.com");
        let document = CredentialsDocument::load(&harness.path).expect("should load");
        assert!(document.get("example.com").is_some());
    }
}
