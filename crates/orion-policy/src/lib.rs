// crates/orion-policy/src/lib.rs
// ============================================================================
// Module: Orion Policy Store
// Description: Read-only action classification and cooldown configuration,
//              loaded once at startup.
// Purpose: Give Brain and Commander a single shared snapshot of {SAFE set,
//          RISKY set, per-action cooldown} so they can never diverge.
// Dependencies: orion-core, serde, thiserror, toml, tracing
// ============================================================================

//! ## Overview
//! [`PolicyStore`] is immutable after construction (spec.md §4.3, §9's
//! "Brain/Commander split" note: both inspect the same read-only snapshot).
//! Loading is infallible from the caller's perspective: any I/O or parse
//! error clears both the SAFE and RISKY sets and all cooldowns, which the
//! spec states is equivalent to "no action becomes executable" — there is
//! no degraded-but-partial policy state.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use orion_core::contracts::SafetyClassification;
use serde::Deserialize;
use thiserror::Error;

/// Errors encountered while loading a policy document. Callers of
/// [`PolicyStore::load`] never see these directly — they are logged and the
/// store falls back to empty — but [`PolicyStore::try_load`] exposes them
/// for tooling that wants to surface a load failure explicitly (e.g. a CLI
/// `policy check` subcommand).
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The policy file was not valid TOML or did not match the expected shape.
    #[error("failed to parse policy file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// A cooldown duration string was not of the form `<number><s|m|h>`.
    #[error("invalid cooldown duration {0:?}: expected a number suffixed with s, m, or h")]
    InvalidDuration(String),
}

#[derive(Debug, Deserialize)]
struct SafeActionDoc {
    action_type: String,
    #[allow(dead_code, reason = "carried for documentation/audit fidelity, not used in logic")]
    description: String,
    reversible: bool,
    #[allow(dead_code, reason = "carried for documentation/audit fidelity, not used in logic")]
    external_side_effects: bool,
    #[allow(dead_code, reason = "reserved for a future rate-limit dimension, not yet consulted")]
    max_frequency: Option<String>,
    #[allow(dead_code, reason = "carried for documentation/audit fidelity, not used in logic")]
    justification: String,
}

#[derive(Debug, Deserialize)]
struct RiskyActionDoc {
    action_type: String,
    #[allow(dead_code, reason = "carried for documentation/audit fidelity, not used in logic")]
    description: String,
    reversible: bool,
    #[allow(dead_code, reason = "carried for documentation/audit fidelity, not used in logic")]
    external_side_effects: bool,
    #[allow(dead_code, reason = "carried for documentation/audit fidelity, not used in logic")]
    blast_radius: String,
    #[allow(dead_code, reason = "carried for documentation/audit fidelity, not used in logic")]
    justification: String,
    #[allow(dead_code, reason = "always true by construction; kept for wire fidelity")]
    requires_approval: bool,
}

#[derive(Debug, Deserialize)]
struct CooldownDoc {
    action_type: String,
    cooldown: String,
}

#[derive(Debug, Deserialize, Default)]
struct DefaultsDoc {
    cooldown: Option<String>,
    circuit_breaker_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    safe_actions: Vec<SafeActionDoc>,
    #[serde(default)]
    risky_actions: Vec<RiskyActionDoc>,
    #[serde(default)]
    cooldowns: Vec<CooldownDoc>,
    #[serde(default)]
    defaults: DefaultsDoc,
}

/// Immutable, read-only classification of action types and their cooldowns.
///
/// # Invariants
/// - An action type in neither `safe` nor `risky` classifies as
///   [`SafetyClassification::Unknown`] — callers must treat `Unknown` as
///   `Risky` (fail-closed), per spec.md §4.3.
/// - `safe` and `risky` are disjoint by construction (an action type present
///   in both is dropped from `safe` — see [`PolicyStore::from_document`]).
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    safe: BTreeSet<String>,
    risky: BTreeSet<String>,
    reversible: BTreeSet<String>,
    cooldowns: BTreeMap<String, Duration>,
    default_cooldown: Duration,
    circuit_breaker_enabled: bool,
}

impl PolicyStore {
    /// Returns an empty store: no SAFE actions, no RISKY actions, no
    /// cooldowns. Every action type classifies `Unknown`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a policy store from a TOML file, logging and falling back to
    /// [`PolicyStore::empty`] on any failure.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(store) => store,
            Err(err) => {
                tracing::error!(error = %err, path = %path.display(), "policy load failed; no action is executable");
                Self::empty()
            }
        }
    }

    /// Loads a policy store from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the file cannot be read or parsed, or if
    /// any cooldown duration string is malformed.
    pub fn try_load(path: &Path) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| PolicyError::Read { path: path.display().to_string(), source })?;
        let document: PolicyDocument = toml::from_str(&text)
            .map_err(|source| PolicyError::Parse { path: path.display().to_string(), source })?;
        Self::from_document(document)
    }

    fn from_document(document: PolicyDocument) -> Result<Self, PolicyError> {
        let risky: BTreeSet<String> =
            document.risky_actions.iter().map(|entry| entry.action_type.clone()).collect();
        let safe: BTreeSet<String> = document
            .safe_actions
            .iter()
            .map(|entry| entry.action_type.clone())
            .filter(|action_type| !risky.contains(action_type))
            .collect();

        let reversible: BTreeSet<String> = document
            .safe_actions
            .iter()
            .filter(|entry| entry.reversible)
            .map(|entry| entry.action_type.clone())
            .chain(document.risky_actions.iter().filter(|entry| entry.reversible).map(|entry| entry.action_type.clone()))
            .collect();

        let mut cooldowns = BTreeMap::new();
        for entry in &document.cooldowns {
            let duration = parse_duration(&entry.cooldown)?;
            cooldowns.insert(entry.action_type.clone(), duration);
        }

        let default_cooldown = match &document.defaults.cooldown {
            Some(raw) => parse_duration(raw)?,
            None => Duration::ZERO,
        };

        Ok(Self {
            safe,
            risky,
            reversible,
            cooldowns,
            default_cooldown,
            circuit_breaker_enabled: document.defaults.circuit_breaker_enabled.unwrap_or(true),
        })
    }

    /// Classifies an action type.
    #[must_use]
    pub fn classify(&self, action_type: &str) -> SafetyClassification {
        if self.safe.contains(action_type) {
            SafetyClassification::Safe
        } else if self.risky.contains(action_type) {
            SafetyClassification::Risky
        } else {
            SafetyClassification::Unknown
        }
    }

    /// Returns `true` iff `action_type` is declared in the SAFE listing.
    #[must_use]
    pub fn is_safe(&self, action_type: &str) -> bool {
        self.safe.contains(action_type)
    }

    /// Returns the cooldown configured for `action_type`, falling back to
    /// the global default (zero if none was configured).
    #[must_use]
    pub fn cooldown_for(&self, action_type: &str) -> Duration {
        self.cooldowns.get(action_type).copied().unwrap_or(self.default_cooldown)
    }

    /// Whether the circuit breaker is enabled per the loaded defaults.
    #[must_use]
    pub const fn circuit_breaker_enabled(&self) -> bool {
        self.circuit_breaker_enabled
    }

    /// Returns `true` iff `action_type` is declared `reversible` in either
    /// listing. Commander uses this to decide whether a rollback routine is
    /// registered for an action.
    #[must_use]
    pub fn is_reversible(&self, action_type: &str) -> bool {
        self.reversible.contains(action_type)
    }
}

fn parse_duration(raw: &str) -> Result<Duration, PolicyError> {
    let raw = raw.trim();
    let (digits, unit) = raw.split_at(raw.len().saturating_sub(1));
    let value: u64 = digits.parse().map_err(|_| PolicyError::InvalidDuration(raw.to_string()))?;
    let seconds = match unit {
        "s" => value,
        "m" => value.saturating_mul(60),
        "h" => value.saturating_mul(3600),
        _ => return Err(PolicyError::InvalidDuration(raw.to_string())),
    };
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_policy(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    const SAMPLE: &str = r#"
        [[safe_actions]]
        action_type = "acknowledge_incident"
        description = "ack"
        reversible = true
        external_side_effects = false
        justification = "low risk"

        [[risky_actions]]
        action_type = "restart_service"
        description = "restart"
        reversible = true
        external_side_effects = true
        blast_radius = "single service"
        justification = "can cause brief downtime"
        requires_approval = true

        [[cooldowns]]
        action_type = "acknowledge_incident"
        cooldown = "60s"

        [defaults]
        cooldown = "30s"
        circuit_breaker_enabled = true
    "#;

    #[test]
    fn classifies_safe_and_risky_and_unknown() {
        let file = write_policy(SAMPLE);
        let store = PolicyStore::try_load(file.path()).expect("load");
        assert_eq!(store.classify("acknowledge_incident"), SafetyClassification::Safe);
        assert_eq!(store.classify("restart_service"), SafetyClassification::Risky);
        assert_eq!(store.classify("never_declared"), SafetyClassification::Unknown);
    }

    #[test]
    fn cooldown_falls_back_to_default() {
        let file = write_policy(SAMPLE);
        let store = PolicyStore::try_load(file.path()).expect("load");
        assert_eq!(store.cooldown_for("acknowledge_incident"), Duration::from_secs(60));
        assert_eq!(store.cooldown_for("restart_service"), Duration::from_secs(30));
    }

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("60s").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn load_failure_empties_everything() {
        let store = PolicyStore::load(Path::new("/nonexistent/policy.toml"));
        assert_eq!(store.classify("acknowledge_incident"), SafetyClassification::Unknown);
        assert_eq!(store.cooldown_for("anything"), Duration::ZERO);
    }

    #[test]
    fn reversible_flag_is_tracked_across_both_listings() {
        let file = write_policy(SAMPLE);
        let store = PolicyStore::try_load(file.path()).expect("load");
        assert!(store.is_reversible("acknowledge_incident"));
        assert!(store.is_reversible("restart_service"));
        assert!(!store.is_reversible("never_declared"));
    }

    #[test]
    fn an_action_in_both_listings_is_treated_as_risky() {
        let doc = r#"
            [[safe_actions]]
            action_type = "dual"
            description = "d"
            reversible = true
            external_side_effects = false
            justification = "j"

            [[risky_actions]]
            action_type = "dual"
            description = "d"
            reversible = true
            external_side_effects = true
            blast_radius = "b"
            justification = "j"
            requires_approval = true
        "#;
        let file = write_policy(doc);
        let store = PolicyStore::try_load(file.path()).expect("load");
        assert_eq!(store.classify("dual"), SafetyClassification::Risky);
    }
}
