//! Authorized key lists in the OpenSSH `authorized_keys` format.

use crate::key::is_algorithm;
use crate::{AccessControl, AccessLevel, AuthError, PublicKey, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Parses every key in an `authorized_keys` style text.
///
/// Blank lines and `#` comments are skipped. Leading options such as
/// `no-pty` or `command="..."` are allowed before the key type.
pub fn parse_authorized_keys(text: &str) -> Result<Vec<PublicKey>> {
    let mut keys = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let key = parse_line(line).map_err(|reason| AuthError::InvalidLine {
            line: idx + 1,
            reason,
        })?;
        debug!(fingerprint = %key.fingerprint(), algorithm = key.algorithm(), "adding authorized key");
        keys.push(key);
    }

    Ok(keys)
}

/// Loads keys from an `authorized_keys` file.
///
/// A missing file is an empty list, not an error.
pub async fn load_authorized_keys(path: impl AsRef<Path>) -> Result<Vec<PublicKey>> {
    let path = path.as_ref();
    match tokio::fs::read_to_string(path).await {
        Ok(text) => parse_authorized_keys(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no authorized keys file");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_line(line: &str) -> std::result::Result<PublicKey, String> {
    let tokens = fields(line);
    let pos = tokens
        .iter()
        .position(|t| is_algorithm(t))
        .ok_or_else(|| "no key type found".to_string())?;
    let encoded = tokens
        .get(pos + 1)
        .ok_or_else(|| format!("missing key data after {}", tokens[pos]))?;

    PublicKey::from_parts(tokens[pos], encoded).map_err(|e| e.to_string())
}

/// Splits a line on whitespace outside double quotes, so option values such
/// as `command="git-shell -c x"` stay one field.
fn fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = None;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if let Some(s) = start.take() {
                    fields.push(&line[s..i]);
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        fields.push(&line[s..]);
    }
    fields
}

/// Grants one access level to a fixed set of keys.
///
/// Keys outside the set, and anonymous sessions, get the default level
/// (NoAccess unless changed with [`KeyListAccess::with_default_access`]).
#[derive(Debug, Clone)]
pub struct KeyListAccess {
    keys: HashSet<PublicKey>,
    granted: AccessLevel,
    default: AccessLevel,
}

impl KeyListAccess {
    /// Creates a controller granting `granted` to every key in `keys`.
    pub fn new(keys: impl IntoIterator<Item = PublicKey>, granted: AccessLevel) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            granted,
            default: AccessLevel::NoAccess,
        }
    }

    /// Sets the level for unknown and anonymous clients.
    pub fn with_default_access(mut self, level: AccessLevel) -> Self {
        self.default = level;
        self
    }

    /// Number of distinct keys in the list.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no keys are listed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the level `key` would be granted on any repository.
    pub fn level_for(&self, key: Option<&PublicKey>) -> AccessLevel {
        match key {
            Some(key) if self.keys.contains(key) => self.granted,
            _ => self.default,
        }
    }
}

#[async_trait]
impl AccessControl for KeyListAccess {
    async fn auth_repo(&self, _repo: &str, key: Option<&PublicKey>) -> AccessLevel {
        self.level_for(key)
    }
}
