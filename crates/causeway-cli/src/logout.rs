// ABOUTME: Logout flow: remove one host's stored credential.
// ABOUTME: Mirrors login's persistence semantics without touching other entries.

use crate::diagnostics::{error_chain, Diagnostic, Diagnostics};
use causeway_credentials::{default_credentials_path, CredentialsDocument, StoreError};
use causeway_host::Hostname;
use std::path::PathBuf;

/// Outcome of a logout attempt.
#[derive(Debug)]
pub struct LogoutReport {
    pub hostname: Hostname,
    pub credentials_path: PathBuf,
    /// Whether a credential was actually stored for the host.
    pub removed: bool,
}

/// Remove the stored credential for a host, leaving every other entry
/// untouched. A host with no stored credential is not an error.
pub fn run(raw_hostname: &str, into_file: Option<PathBuf>) -> Result<LogoutReport, Diagnostics> {
    let hostname = Hostname::normalize(raw_hostname)
        .map_err(|e| Diagnostics::from(Diagnostic::error("Invalid hostname", error_chain(&e))))?;

    let path = match into_file {
        Some(path) => path,
        None => default_credentials_path().map_err(|e| store_diagnostic(&e))?,
    };

    let mut document = CredentialsDocument::load(&path).map_err(|e| store_diagnostic(&e))?;
    let removed = document.remove(hostname.comparison_key());
    if removed {
        document.save(&path).map_err(|e| store_diagnostic(&e))?;
    }

    Ok(LogoutReport {
        hostname,
        credentials_path: path,
        removed,
    })
}

fn store_diagnostic(error: &StoreError) -> Diagnostics {
    Diagnostic::error("Failed to update the credentials file", error_chain(error)).into()
}
