//! SSH public keys as presented by connecting clients.

use crate::{AuthError, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Key type prefixes accepted in OpenSSH public key text.
const ALGORITHM_PREFIXES: &[&str] = &["ssh-", "ecdsa-sha2-", "sk-ssh-", "sk-ecdsa-sha2-"];

/// An SSH public key: the algorithm name and its wire-format blob.
///
/// Comments are not part of the key, so two lines that differ only in their
/// comment parse to equal keys.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    algorithm: String,
    blob: Vec<u8>,
}

impl PublicKey {
    /// Builds a key from its wire-format blob.
    ///
    /// The algorithm name is read from the blob itself.
    pub fn from_blob(blob: impl Into<Vec<u8>>) -> Result<Self> {
        let blob = blob.into();
        let algorithm = embedded_algorithm(&blob)?;
        Ok(Self { algorithm, blob })
    }

    /// Parses `<algorithm> <base64> [comment]`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields = text.split_whitespace();
        let algorithm = fields
            .next()
            .ok_or_else(|| AuthError::InvalidKey("empty key".to_string()))?;
        let encoded = fields
            .next()
            .ok_or_else(|| AuthError::InvalidKey(format!("missing key data after {algorithm}")))?;
        Self::from_parts(algorithm, encoded)
    }

    /// Builds a key from its algorithm name and base64 blob.
    pub(crate) fn from_parts(algorithm: &str, encoded: &str) -> Result<Self> {
        if !is_algorithm(algorithm) {
            return Err(AuthError::InvalidKey(format!(
                "unsupported key type: {algorithm}"
            )));
        }

        let blob = STANDARD
            .decode(encoded)
            .map_err(|e| AuthError::InvalidKey(format!("bad base64: {e}")))?;
        let key = Self::from_blob(blob)?;

        if key.algorithm != algorithm {
            return Err(AuthError::InvalidKey(format!(
                "key type {algorithm} does not match encoded type {}",
                key.algorithm
            )));
        }

        Ok(key)
    }

    /// Returns the algorithm name (e.g. `ssh-ed25519`).
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the wire-format blob.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Returns the SHA-256 fingerprint in the `ssh-keygen -l` format.
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(&self.blob);
        format!("SHA256:{}", STANDARD_NO_PAD.encode(hash))
    }
}

/// Returns true if `token` names an SSH key algorithm.
pub(crate) fn is_algorithm(token: &str) -> bool {
    ALGORITHM_PREFIXES
        .iter()
        .any(|prefix| token.starts_with(prefix) && token.len() > prefix.len())
}

/// Reads the length-prefixed algorithm name at the start of a key blob.
fn embedded_algorithm(blob: &[u8]) -> Result<String> {
    let header: [u8; 4] = blob
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| AuthError::InvalidKey("key blob too short".to_string()))?;
    let len = u32::from_be_bytes(header) as usize;

    let name = blob
        .get(4..4 + len)
        .ok_or_else(|| AuthError::InvalidKey("truncated key type".to_string()))?;
    let name = std::str::from_utf8(name)
        .map_err(|_| AuthError::InvalidKey("key type is not UTF-8".to_string()))?;

    if !is_algorithm(name) {
        return Err(AuthError::InvalidKey(format!("unsupported key type: {name}")));
    }
    Ok(name.to_string())
}

impl FromStr for PublicKey {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, STANDARD.encode(&self.blob))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
