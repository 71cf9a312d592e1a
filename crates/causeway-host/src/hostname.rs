// ABOUTME: Hostname canonicalization for causeway service hosts.
// ABOUTME: Produces a display form and an IDNA-mapped comparison key, no I/O.

use crate::error::{HostError, Result};

/// Hostname used when the user gives no argument to `causeway login`.
pub const DEFAULT_HOSTNAME: &str = "app.causeway.dev";

/// Port that is implied when a hostname carries no explicit port.
const DEFAULT_PORT: u16 = 443;

/// A validated service hostname.
///
/// Carries two forms of the same name: `display` keeps the friendly Unicode
/// spelling for messages, while `comparison` is the fully lower-cased,
/// punycode-mapped form used for equality checks and storage keys. Two
/// spellings of one host (case differences, an explicit `:443`) always share
/// a comparison key. A non-default port is part of the host's identity and
/// appears in both forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hostname {
    display: String,
    comparison: String,
}

impl Hostname {
    /// Normalize a raw, user-supplied hostname.
    ///
    /// An empty input (after trimming) selects [`DEFAULT_HOSTNAME`].
    /// Performs no network I/O.
    ///
    /// # Errors
    /// Returns [`HostError::InvalidHostname`] when the input cannot be
    /// parsed as a DNS-style host; the message carries the original input
    /// and the underlying reason.
    pub fn normalize(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let given = if trimmed.is_empty() {
            DEFAULT_HOSTNAME
        } else {
            trimmed
        };

        let invalid = |reason: String| HostError::InvalidHostname {
            raw: given.to_string(),
            reason,
        };

        if given.contains("://") {
            return Err(invalid("a hostname must not carry a URL scheme".to_string()));
        }
        if given.contains('/') {
            return Err(invalid("a hostname must not contain a path".to_string()));
        }
        if given.contains('@') {
            return Err(invalid("a hostname must not contain userinfo".to_string()));
        }
        if given.chars().any(char::is_whitespace) {
            return Err(invalid("a hostname must not contain whitespace".to_string()));
        }
        if given.contains('[') || given.contains(']') {
            return Err(invalid(
                "bracketed IP address literals are not supported".to_string(),
            ));
        }

        let (name, port) = split_port(given).map_err(|reason| invalid(reason.to_string()))?;

        // A single trailing dot is the DNS root label; fold it away.
        let name = name.strip_suffix('.').unwrap_or(name);
        if name.is_empty() {
            return Err(invalid("the hostname is empty".to_string()));
        }
        if name.len() > 253 {
            return Err(invalid("the hostname exceeds 253 characters".to_string()));
        }

        for label in name.split('.') {
            if label.is_empty() {
                return Err(invalid("the hostname contains an empty label".to_string()));
            }
            if label.len() > 63 {
                return Err(invalid("a hostname label exceeds 63 characters".to_string()));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(invalid(
                    "a hostname label must not start or end with a hyphen".to_string(),
                ));
            }
            if label.is_ascii() {
                if let Some(c) = label.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
                    return Err(invalid(format!(
                        "the character {c:?} is not allowed in a hostname"
                    )));
                }
            }
        }

        // idna is the final authority: it folds case, maps international
        // labels to punycode, and rejects anything the checks above missed
        // (malformed punycode in particular).
        let ascii = idna::domain_to_ascii_strict(name).map_err(|_| {
            invalid("the name is not a valid internationalized domain name".to_string())
        })?;
        let (unicode, _) = idna::domain_to_unicode(&ascii);

        let (display, comparison) = match port {
            Some(p) => (format!("{unicode}:{p}"), format!("{ascii}:{p}")),
            None => (unicode, ascii),
        };

        Ok(Self {
            display,
            comparison,
        })
    }

    /// The friendly Unicode form, for messages.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// The lower-cased punycode form used for equality and storage keys.
    pub fn comparison_key(&self) -> &str {
        &self.comparison
    }
}

impl std::fmt::Display for Hostname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

/// Split a trailing `:port`, folding away the implicit default port 443.
fn split_port(input: &str) -> std::result::Result<(&str, Option<u16>), &'static str> {
    match input.rsplit_once(':') {
        None => Ok((input, None)),
        Some((host, port)) => {
            if host.contains(':') {
                return Err("the hostname contains more than one colon");
            }
            let port: u16 = port
                .parse()
                .map_err(|_| "the port is not a decimal number between 1 and 65535")?;
            if port == 0 {
                return Err("the port is not a decimal number between 1 and 65535");
            }
            Ok((host, (port != DEFAULT_PORT).then_some(port)))
        }
    }
}
