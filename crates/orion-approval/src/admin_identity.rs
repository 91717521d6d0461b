// crates/orion-approval/src/admin_identity.rs
// ============================================================================
// Module: Admin Identity
// Description: Single-admin identity configuration and per-channel
//              verification.
// Purpose: Implement spec.md §4.8, §6: exactly one admin identity, named
//          per channel, no delegation or quorum.
// Dependencies: orion-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Orion recognizes exactly one human authority. [`AdminIdentity`] names at
//! most one identity per channel (`telegram`, `cli`); at least one channel
//! must be configured. Verification is a plain string comparison per
//! channel — there is no normalization or fuzzy matching, matching the
//! single-ADMIN model's "unknown identity is rejected, no implicit
//! defaults" invariant.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors loading an admin identity configuration.
#[derive(Debug, Error)]
pub enum AdminIdentityError {
    /// The config file could not be read.
    #[error("failed to read admin identity file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file was not valid TOML or did not match the expected shape.
    #[error("failed to parse admin identity file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// Neither channel was configured.
    #[error("at least one admin identity (telegram or cli) must be configured")]
    NoChannelConfigured,
}

/// A channel an admin can issue decisions over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Telegram chat identity.
    Telegram,
    /// CLI username/UID identity.
    Cli,
}

#[derive(Debug, Deserialize)]
struct AdminDoc {
    telegram_chat_id: Option<String>,
    cli_identity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdminIdentityDoc {
    admin: AdminDoc,
}

/// The single configured admin identity, named per channel.
///
/// # Invariants
/// - At least one of `telegram`/`cli` is `Some`.
/// - Verification is exact string equality; an unconfigured channel always
///   rejects.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    telegram: Option<String>,
    cli: Option<String>,
}

impl AdminIdentity {
    /// Builds an admin identity directly, rejecting a config with neither
    /// channel set.
    ///
    /// # Errors
    ///
    /// Returns [`AdminIdentityError::NoChannelConfigured`] if both channels
    /// are `None`.
    pub fn new(telegram: Option<String>, cli: Option<String>) -> Result<Self, AdminIdentityError> {
        if telegram.is_none() && cli.is_none() {
            return Err(AdminIdentityError::NoChannelConfigured);
        }
        Ok(Self { telegram, cli })
    }

    /// Loads an admin identity configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AdminIdentityError`] if the file cannot be read or parsed,
    /// or if neither channel is configured.
    pub fn load(path: &Path) -> Result<Self, AdminIdentityError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| AdminIdentityError::Read { path: path.display().to_string(), source })?;
        let document: AdminIdentityDoc = toml::from_str(&text)
            .map_err(|source| AdminIdentityError::Parse { path: path.display().to_string(), source })?;
        Self::new(document.admin.telegram_chat_id, document.admin.cli_identity)
    }

    /// Verifies `identity` against the configured admin for `channel`.
    /// Returns `false` (not an error) if that channel is unconfigured.
    #[must_use]
    pub fn verify(&self, channel: Channel, identity: &str) -> bool {
        let configured = match channel {
            Channel::Telegram => self.telegram.as_deref(),
            Channel::Cli => self.cli.as_deref(),
        };
        match configured {
            Some(expected) => expected == identity,
            None => {
                tracing::warn!(?channel, "admin identity channel not configured, rejecting");
                false
            }
        }
    }

    /// Returns the configured identity string for `channel`, if any.
    #[must_use]
    pub fn identity_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Telegram => self.telegram.as_deref(),
            Channel::Cli => self.cli.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn rejects_config_with_no_channel() {
        let err = AdminIdentity::new(None, None).unwrap_err();
        assert!(matches!(err, AdminIdentityError::NoChannelConfigured));
    }

    #[test]
    fn verifies_exact_match_per_channel() {
        let admin = AdminIdentity::new(Some("12345".to_string()), Some("alice".to_string())).expect("valid");
        assert!(admin.verify(Channel::Telegram, "12345"));
        assert!(!admin.verify(Channel::Telegram, "99999"));
        assert!(admin.verify(Channel::Cli, "alice"));
        assert!(!admin.verify(Channel::Cli, "mallory"));
    }

    #[test]
    fn unconfigured_channel_always_rejects() {
        let admin = AdminIdentity::new(Some("12345".to_string()), None).expect("valid");
        assert!(!admin.verify(Channel::Cli, "anyone"));
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"[admin]\ntelegram_chat_id = \"555\"\n").expect("write");
        let admin = AdminIdentity::load(file.path()).expect("load");
        assert!(admin.verify(Channel::Telegram, "555"));
    }
}
