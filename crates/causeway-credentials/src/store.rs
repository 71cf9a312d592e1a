// ABOUTME: Load, merge, and atomically persist per-host credentials.
// ABOUTME: TOML document editing that preserves unrelated entries byte-for-byte.

use crate::error::{Result, StoreError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use toml_edit::{value, DocumentMut, Item, Table};
use tracing::debug;

/// File name of the credentials store inside the causeway config directory.
const CREDENTIALS_FILE: &str = "credentials.toml";

/// Top-level table holding one sub-table per host.
const CREDENTIALS_TABLE: &str = "credentials";

/// A bearer credential for exactly one canonical hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque bearer token presented to the host's API.
    pub token: String,
    /// Refresh token, when the host issued one.
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// Default location of the credentials file
/// (`~/.config/causeway/credentials.toml`).
///
/// Uses an XDG-style path on all platforms for consistency.
///
/// # Errors
/// Returns [`StoreError::NoHomeDir`] when no home directory can be found.
pub fn default_credentials_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
    Ok(home
        .join(".config")
        .join("causeway")
        .join(CREDENTIALS_FILE))
}

/// In-memory credentials document.
///
/// Backed by a formatting-preserving TOML model: entries the caller does not
/// touch — other hosts, comments, unrelated tables — round-trip byte for
/// byte. Host entries live under `[credentials."<comparison-key>"]`.
#[derive(Debug, Clone, Default)]
pub struct CredentialsDocument {
    doc: DocumentMut,
}

impl CredentialsDocument {
    /// Load the document at `path`.
    ///
    /// A missing file is an empty document, not an error; an existing file
    /// that does not parse is never overwritten blindly.
    ///
    /// # Errors
    /// Returns [`StoreError::CorruptStore`] for unparsable content,
    /// [`StoreError::MalformedStore`] when `credentials` is not a table,
    /// and [`StoreError::ReadFailed`] for other read errors.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "credentials file absent, starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let doc: DocumentMut = content.parse().map_err(|e| StoreError::CorruptStore {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(item) = doc.get(CREDENTIALS_TABLE) {
            if item.as_table_like().is_none() {
                return Err(StoreError::MalformedStore {
                    path: path.to_path_buf(),
                    reason: format!("`{CREDENTIALS_TABLE}` is not a table"),
                });
            }
        }

        Ok(Self { doc })
    }

    /// Insert or replace the credential for `comparison_key`.
    ///
    /// Every other entry and the surrounding document structure are left
    /// untouched. Upserting the same credential twice is a no-op.
    pub fn upsert(&mut self, comparison_key: &str, credential: &Credential) {
        let creds = self.doc.entry(CREDENTIALS_TABLE).or_insert_with(|| {
            let mut table = Table::new();
            table.set_implicit(true);
            Item::Table(table)
        });
        // load() guarantees a table-like item.
        let Some(table) = creds.as_table_like_mut() else {
            return;
        };

        let mut entry = Table::new();
        entry.insert("token", value(credential.token.as_str()));
        if let Some(refresh_token) = &credential.refresh_token {
            entry.insert("refresh_token", value(refresh_token.as_str()));
        }
        table.insert(comparison_key, Item::Table(entry));
    }

    /// Remove the credential for `comparison_key`, reporting whether one
    /// was stored.
    pub fn remove(&mut self, comparison_key: &str) -> bool {
        let Some(creds) = self.doc.get_mut(CREDENTIALS_TABLE) else {
            return false;
        };
        let Some(table) = creds.as_table_like_mut() else {
            return false;
        };
        table.remove(comparison_key).is_some()
    }

    /// The stored credential for `comparison_key`, if any.
    pub fn get(&self, comparison_key: &str) -> Option<Credential> {
        let table = self.doc.get(CREDENTIALS_TABLE)?.as_table_like()?;
        let entry = table.get(comparison_key)?.as_table_like()?;
        let token = entry.get("token")?.as_str()?.to_string();
        let refresh_token = entry
            .get("refresh_token")
            .and_then(|item| item.as_str())
            .map(String::from);
        Some(Credential {
            token,
            refresh_token,
        })
    }

    /// Hostnames with stored credentials, in document order.
    pub fn hosts(&self) -> Vec<String> {
        self.doc
            .get(CREDENTIALS_TABLE)
            .and_then(|item| item.as_table_like())
            .map(|table| table.iter().map(|(key, _)| key.to_string()).collect())
            .unwrap_or_default()
    }

    /// Atomically write the document to `path`.
    ///
    /// The content goes to a temporary file in the destination directory
    /// and is renamed into place, so a crash mid-write never corrupts the
    /// previous file; the temporary file is cleaned up on every exit path.
    /// Concurrent logins to different hosts compose through the caller's
    /// fresh read-modify-write per attempt; concurrent logins to the same
    /// host are last-writer-wins.
    ///
    /// # Errors
    /// Returns [`StoreError::PersistFailed`] on any I/O failure; the
    /// original file is left untouched.
    pub fn save(&self, path: &Path) -> Result<()> {
        let persist_failed = |source: std::io::Error| StoreError::PersistFailed {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(persist_failed)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(persist_failed)?;
        tmp.write_all(self.doc.to_string().as_bytes())
            .map_err(persist_failed)?;
        tmp.as_file().sync_all().map_err(persist_failed)?;
        tmp.persist(path).map_err(|e| persist_failed(e.error))?;

        // The file holds bearer tokens; keep it owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .map_err(persist_failed)?;
        }

        debug!(path = %path.display(), "credentials file written");
        Ok(())
    }
}

impl std::fmt::Display for CredentialsDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.doc)
    }
}
