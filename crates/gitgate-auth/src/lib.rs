//! Authorization primitives for gitgate.
//!
//! This crate provides:
//! - **Access levels**: the tier a key holds on a repository
//!   (NoAccess, ReadOnly, ReadWrite, Admin)
//! - **Access control**: the pluggable [`AccessControl`] contract consulted once
//!   per git command
//! - **Public keys**: OpenSSH public key parsing and fingerprints
//! - **Authorized keys**: key-list loading and a ready-made [`KeyListAccess`]
//!
//! # Example
//!
//! ```
//! use gitgate_auth::{parse_authorized_keys, AccessLevel, KeyListAccess};
//!
//! let keys = parse_authorized_keys(
//!     "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEB alice@laptop\n",
//! )
//! .unwrap();
//!
//! let access = KeyListAccess::new(keys, AccessLevel::ReadWrite);
//! assert_eq!(access.len(), 1);
//! ```

mod access;
mod authorized_keys;
mod error;
mod key;

pub use access::{AccessControl, AccessLevel};
pub use authorized_keys::{load_authorized_keys, parse_authorized_keys, KeyListAccess};
pub use error::{AuthError, Result};
pub use key::PublicKey;
